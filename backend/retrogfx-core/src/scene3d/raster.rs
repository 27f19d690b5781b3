//! Scanline quad rasterizer
//!
//! Quads are scan converted by walking all six vertex pairs and keeping, for every row, the
//! leftmost and rightmost edge crossing together with the texture coordinate at each. Rows are
//! then filled from `start` up to (not including) `end`. This is exact for convex quads only.

use crate::blit::BlitTarget;
use crate::framebuffer::FrameBuffer;
use crate::ink::InkEffect;
use crate::sheet::SpriteSheet;
use std::ops::Range;

/// Projected quad corner: screen position and texel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenVertex {
    pub x: i32,
    pub y: i32,
    pub u: i32,
    pub v: i32,
}

impl ScreenVertex {
    #[must_use]
    pub fn new(x: i32, y: i32, u: i32, v: i32) -> Self {
        Self { x, y, u, v }
    }
}

// Sentinels chosen outside any screen coordinate
const NO_START: i64 = 100_000;
const NO_END: i64 = -100_000;

#[derive(Debug, Clone, Copy)]
struct Span {
    start: i64,
    end: i64,
    start_u: i64,
    start_v: i64,
    end_u: i64,
    end_v: i64,
}

impl Span {
    const EMPTY: Self = Self { start: NO_START, end: NO_END, start_u: 0, start_v: 0, end_u: 0, end_v: 0 };
}

/// Per-row edge buffer shared by every quad of a frame.
#[derive(Debug, Clone)]
pub struct ScanBuffer {
    width: i32,
    height: i32,
    spans: Vec<Span>,
}

impl ScanBuffer {
    #[must_use]
    pub fn new(frame_buffer: &FrameBuffer) -> Self {
        Self {
            width: frame_buffer.width(),
            height: frame_buffer.height(),
            spans: vec![Span::EMPTY; frame_buffer.height().max(0) as usize],
        }
    }

    /// Scan convert a quad, returning the screen rows it covers. Quads entirely off one side of
    /// the screen, or collapsed to a vertical or horizontal line, return `None`.
    fn scan(&mut self, quad: &[ScreenVertex; 4]) -> Option<Range<i32>> {
        if self.rejects(quad) {
            return None;
        }

        let [a, b, c, d] = sort_by_y(quad);
        let top = a.y.max(0);
        let bottom = d.y.min(self.height);
        if top >= bottom {
            return None;
        }

        for span in &mut self.spans[top as usize..bottom as usize] {
            *span = Span::EMPTY;
        }

        let rows = top..bottom;
        for (from, to) in [(a, b), (a, c), (a, d), (b, c), (c, d), (b, d)] {
            self.scan_edge(from, to, &rows);
        }

        Some(rows)
    }

    fn rejects(&self, quad: &[ScreenVertex; 4]) -> bool {
        let all = |f: &dyn Fn(&ScreenVertex) -> bool| quad.iter().all(f);
        all(&|v| v.x < 0)
            || all(&|v| v.x > self.width)
            || all(&|v| v.y < 0)
            || all(&|v| v.y > self.height)
            || all(&|v| v.x == quad[0].x)
            || all(&|v| v.y == quad[0].y)
    }

    fn scan_edge(&mut self, from: ScreenVertex, to: ScreenVertex, rows: &Range<i32>) {
        if from.y == to.y {
            return;
        }
        let (upper, lower) = if from.y < to.y { (from, to) } else { (to, from) };

        let delta = |a: i32, b: i32| i64::from(b) - i64::from(a);
        let dy = delta(upper.y, lower.y);
        let delta_x = (delta(upper.x, lower.x) << 16) / dy;
        let delta_u = (delta(upper.u, lower.u) << 16) / dy;
        let delta_v = (delta(upper.v, lower.v) << 16) / dy;

        let top = upper.y.max(rows.start);
        let bottom = lower.y.saturating_add(1).min(rows.end);
        if top >= bottom {
            return;
        }

        let skipped = delta(upper.y, top);
        let mut x = (i64::from(upper.x) << 16) + skipped * delta_x;
        let mut u = (i64::from(upper.u) << 16) + skipped * delta_u;
        let mut v = (i64::from(upper.v) << 16) + skipped * delta_v;

        for span in &mut self.spans[top as usize..bottom as usize] {
            let column = x >> 16;
            if column < span.start {
                span.start = column;
                span.start_u = u;
                span.start_v = v;
            }
            if column > span.end {
                span.end = column;
                span.end_u = u;
                span.end_v = v;
            }

            x += delta_x;
            u += delta_u;
            v += delta_v;
        }
    }

    /// Screen-clipped fill range of a scanned row, with the texel position and per-pixel step at
    /// the first filled column.
    fn row(&self, row: i32) -> Option<RowFill> {
        let span = self.spans.get(usize::try_from(row).ok()?)?;
        if span.start >= i64::from(self.width) || span.end <= 0 || span.start >= span.end {
            return None;
        }

        let length = span.end - span.start;
        let du = (span.end_u - span.start_u) / length;
        let dv = (span.end_v - span.start_v) / length;

        let start = span.start.max(0);
        let skipped = start - span.start;
        Some(RowFill {
            columns: start as i32..span.end.min(i64::from(self.width)) as i32,
            u: span.start_u + skipped * du,
            v: span.start_v + skipped * dv,
            du,
            dv,
        })
    }
}

struct RowFill {
    columns: Range<i32>,
    u: i64,
    v: i64,
    du: i64,
    dv: i64,
}

// Stable ordering by y through the fixed sequence of swaps used for quads
fn sort_by_y(quad: &[ScreenVertex; 4]) -> [ScreenVertex; 4] {
    let mut order = *quad;
    for (i, j) in [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)] {
        if order[j].y < order[i].y {
            order.swap(i, j);
        }
    }
    order
}

#[inline]
fn texel(position: i64) -> i32 {
    i32::try_from(position >> 16).unwrap_or(i32::MAX)
}

/// Draw a quad textured from `sheet`, resolving each row through that row's palette bank.
pub fn draw_textured_quad(
    target: &mut BlitTarget<'_>,
    scan: &mut ScanBuffer,
    quad: &[ScreenVertex; 4],
    sheet: &SpriteSheet,
    ink: InkEffect,
) {
    let Some(rows) = scan.scan(quad) else {
        log::trace!("Skipping off-screen or degenerate textured quad {quad:?}");
        return;
    };

    for row in rows {
        let Some(RowFill { columns, mut u, mut v, du, dv }) = scan.row(row) else {
            continue;
        };

        for column in columns {
            u = u.max(0);
            v = v.max(0);
            let index = sheet.pixel_clamped(texel(u), texel(v));
            target.plot(column, row, index, ink, u8::MAX);

            u += du;
            v += dv;
        }
    }
}

/// Fill a quad with a direct color using alpha ink.
pub fn draw_colored_quad(
    frame_buffer: &mut FrameBuffer,
    scan: &mut ScanBuffer,
    quad: &[ScreenVertex; 4],
    color: u16,
    alpha: u8,
) {
    if alpha == 0 {
        return;
    }

    let Some(rows) = scan.scan(quad) else {
        log::trace!("Skipping off-screen or degenerate colored quad {quad:?}");
        return;
    };

    for row in rows {
        if let Some(fill) = scan.row(row) {
            for column in fill.columns {
                frame_buffer.blend(column, row, color, InkEffect::Alpha, alpha);
            }
        }
    }
}
