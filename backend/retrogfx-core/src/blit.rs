//! Sprite blit primitives: flipped rectangular copies, rotate/scale blits, and filled rectangles

use crate::framebuffer::FrameBuffer;
use crate::ink::InkEffect;
use crate::palette::PaletteBanks;
use crate::sheet::SpriteSheet;
use crate::tiles::Flip;
use crate::trig;

/// 1.0 in rotozoom scale units
pub const SCALE_ONE: i32 = 0x200;

/// Framebuffer plus the palette that resolves indexed pixels, one bank per screen row.
pub struct BlitTarget<'a> {
    pub frame_buffer: &'a mut FrameBuffer,
    pub palette: &'a PaletteBanks,
}

impl BlitTarget<'_> {
    /// Draw one indexed pixel. Index 0 is transparent and never written.
    #[inline]
    pub fn plot(&mut self, x: i32, y: i32, index: u8, ink: InkEffect, alpha: u8) {
        if index == 0 {
            return;
        }

        let color = self.palette.for_line(y)[index as usize];
        self.frame_buffer.blend(x, y, color, ink, alpha);
    }
}

/// Screen-clipped iteration bounds for a `width` x `height` rectangle at `(x, y)`, returned as
/// the first and one-past-last local coordinates on each axis.
fn clip_rect(frame_buffer: &FrameBuffer, x: i32, y: i32, width: i32, height: i32) -> Option<[i32; 4]> {
    let (x, y) = (i64::from(x), i64::from(y));
    let left = (-x).max(0);
    let top = (-y).max(0);
    let right = i64::from(width).min(i64::from(frame_buffer.width()) - x);
    let bottom = i64::from(height).min(i64::from(frame_buffer.height()) - y);

    // Both ranges now lie within 0..=width and 0..=height
    (left < right && top < bottom)
        .then_some([left as i32, right as i32, top as i32, bottom as i32])
}

/// Copy a `width` x `height` block of `sheet` starting at `(sprite_x, sprite_y)` to the screen at
/// `(x, y)`, mirrored according to `flip`.
pub fn draw_sprite_flipped(
    target: &mut BlitTarget<'_>,
    sheet: &SpriteSheet,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    sprite_x: i32,
    sprite_y: i32,
    flip: Flip,
    ink: InkEffect,
    alpha: u8,
) {
    if ink != InkEffect::None && ink != InkEffect::Blend && ink != InkEffect::Tint && alpha == 0 {
        return;
    }

    let Some([left, right, top, bottom]) = clip_rect(target.frame_buffer, x, y, width, height)
    else {
        return;
    };

    for local_y in top..bottom {
        let src_y = sprite_y.wrapping_add(if flip.vertical() { height - 1 - local_y } else { local_y });
        for local_x in left..right {
            let src_x =
                sprite_x.wrapping_add(if flip.horizontal() { width - 1 - local_x } else { local_x });
            let index = sheet.pixel(src_x, src_y);
            target.plot(x + local_x, y + local_y, index, ink, alpha);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotozoom {
    /// Screen position of the rotation center
    pub x: i32,
    pub y: i32,
    /// Offset from the rotation center to the sprite's top-left corner, before rotation
    pub pivot_x: i32,
    pub pivot_y: i32,
    pub width: i32,
    pub height: i32,
    pub sprite_x: i32,
    pub sprite_y: i32,
    /// [`SCALE_ONE`] = 1.0
    pub scale_x: i32,
    pub scale_y: i32,
    pub flip: Flip,
    /// 512ths of a turn
    pub rotation: i32,
}

impl Rotozoom {
    #[must_use]
    pub fn unscaled(x: i32, y: i32, pivot_x: i32, pivot_y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            pivot_x,
            pivot_y,
            width,
            height,
            sprite_x: 0,
            sprite_y: 0,
            scale_x: SCALE_ONE,
            scale_y: SCALE_ONE,
            flip: Flip::None,
            rotation: 0,
        }
    }
}

// Forward transform denominators: trig scale (512) times scale units (512)
const FORWARD_SHIFT: u32 = 18;

fn floor_shift(value: i64) -> i64 {
    value >> FORWARD_SHIFT
}

fn ceil_shift(value: i64) -> i64 {
    -((-value) >> FORWARD_SHIFT)
}

/// Rotate and scale a sprite about `(params.x, params.y)`.
///
/// Every screen pixel in the bounding box of the transformed rectangle is mapped back into the
/// sprite in 16.16 fixed point; pixels that land outside the source rectangle or on index 0 are
/// skipped.
pub fn draw_sprite_rotozoom(
    target: &mut BlitTarget<'_>,
    sheet: &SpriteSheet,
    params: &Rotozoom,
    ink: InkEffect,
    alpha: u8,
) {
    let Rotozoom { x, y, pivot_x, pivot_y, width, height, scale_x, scale_y, .. } = *params;
    if width <= 0 || height <= 0 || scale_x == 0 || scale_y == 0 {
        log::trace!("Skipping degenerate rotozoom blit {params:?}");
        return;
    }

    let sin = i64::from(trig::sin512(params.rotation));
    let cos = i64::from(trig::cos512(params.rotation));
    let (sx, sy) = (i64::from(scale_x), i64::from(scale_y));

    let corners = [
        (pivot_x, pivot_y),
        (pivot_x + width, pivot_y),
        (pivot_x, pivot_y + height),
        (pivot_x + width, pivot_y + height),
    ]
    .map(|(px, py)| {
        let (px, py) = (i64::from(px) * sx, i64::from(py) * sy);
        (cos * px - sin * py, sin * px + cos * py)
    });

    let min_x = corners.iter().map(|&(fx, _)| floor_shift(fx)).min().unwrap_or(0);
    let max_x = corners.iter().map(|&(fx, _)| ceil_shift(fx)).max().unwrap_or(0);
    let min_y = corners.iter().map(|&(_, fy)| floor_shift(fy)).min().unwrap_or(0);
    let max_y = corners.iter().map(|&(_, fy)| ceil_shift(fy)).max().unwrap_or(0);

    // One pixel of margin on each side absorbs rounding in the forward transform
    let left = (i64::from(x) + min_x - 1).max(0);
    let right = (i64::from(x) + max_x + 1).min(i64::from(target.frame_buffer.width()));
    let top = (i64::from(y) + min_y - 1).max(0);
    let bottom = (i64::from(y) + max_y + 1).min(i64::from(target.frame_buffer.height()));
    if left >= right || top >= bottom {
        return;
    }

    let du_dx = (cos << 16) / sx;
    let du_dy = (sin << 16) / sx;
    let dv_dx = (-sin << 16) / sy;
    let dv_dy = (cos << 16) / sy;

    let (pivot_x, pivot_y) = (i64::from(pivot_x), i64::from(pivot_y));
    let (width64, height64) = (i64::from(width), i64::from(height));

    for screen_y in top..bottom {
        let dx = left - i64::from(x);
        let dy = screen_y - i64::from(y);
        let mut u = dx * du_dx + dy * du_dy;
        let mut v = dx * dv_dx + dy * dv_dy;

        for screen_x in left..right {
            let local_x = (u >> 16) - pivot_x;
            let local_y = (v >> 16) - pivot_y;
            u += du_dx;
            v += dv_dx;

            if !(0..width64).contains(&local_x) || !(0..height64).contains(&local_y) {
                continue;
            }

            let local_x = if params.flip.horizontal() { width64 - 1 - local_x } else { local_x };
            let local_y = if params.flip.vertical() { height64 - 1 - local_y } else { local_y };
            let index = sheet
                .pixel(params.sprite_x + local_x as i32, params.sprite_y + local_y as i32);
            target.plot(screen_x as i32, screen_y as i32, index, ink, alpha);
        }
    }
}

/// Fill a rectangle with a direct color. Alpha ink is used unless `alpha` is 255.
pub fn fill_rectangle(
    frame_buffer: &mut FrameBuffer,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    color: u16,
    ink: InkEffect,
    alpha: u8,
) {
    let Some([left, right, top, bottom]) = clip_rect(frame_buffer, x, y, width, height) else {
        return;
    };

    for local_y in top..bottom {
        for local_x in left..right {
            frame_buffer.blend(x + local_x, y + local_y, color, ink, alpha);
        }
    }
}
