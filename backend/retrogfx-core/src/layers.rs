//! Tile layer renderers
//!
//! Scroll layers are drawn one screen line at a time: each row (horizontal scroll) or column
//! (vertical scroll) resolves its starting layer position from the parallax bands and the
//! deformation rings, then walks the layer a tile span at a time. The rotozoom family (floor, sky,
//! and flat affine layers) instead maps every screen pixel back into the layer.

mod hscroll;
mod projection;
mod vscroll;

use crate::deform::DeformationTables;
use crate::framebuffer::FrameBuffer;
use crate::layer::{LayerType, TileLayer};
use crate::palette::{PaletteBank, PaletteBanks};
use crate::tiles::{ChunkTable, TILE_MASK, TILE_SIZE, TileCursor, Tileset, VisualPlane};
use bincode::{Decode, Encode};

pub use projection::{draw_affine, draw_floor, draw_sky};

/// Global camera state shared by every layer drawn in a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct ScreenScroll {
    pub x: i32,
    pub y: i32,
    /// First screen row drawn with the underwater deformation rings
    pub water_line: i32,
}

pub struct LayerContext<'a> {
    pub frame_buffer: &'a mut FrameBuffer,
    pub palette: &'a PaletteBanks,
    pub tileset: &'a Tileset,
    pub chunks: &'a ChunkTable,
    pub deformation: &'a DeformationTables,
    pub scroll: ScreenScroll,
    /// Tiles drawn by this layer slot
    pub plane: VisualPlane,
    /// Stage layer 0 follows the camera directly and uses the foreground deformation rings
    pub foreground: bool,
    /// First screen row of the floor and sky projections
    pub horizon: i32,
}

/// Draw a layer according to its type.
pub fn draw_layer(ctx: &mut LayerContext<'_>, layer: &mut TileLayer) {
    if layer.is_empty() {
        return;
    }

    match layer.layer_type {
        LayerType::HScroll => hscroll::draw(ctx, layer),
        LayerType::VScroll => vscroll::draw(ctx, layer),
        LayerType::Floor3D => draw_floor(ctx, layer),
        LayerType::Sky3D => draw_sky(ctx, layer),
        LayerType::Basic => draw_affine(ctx, layer),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

/// Draw a full screen row (horizontal) or column (vertical) from a scroll layer.
///
/// `along` is the layer coordinate under the first screen pixel on the walking axis and `across`
/// the fixed layer coordinate on the other axis; both must already be wrapped into the layer.
fn draw_layer_line(
    ctx: &mut LayerContext<'_>,
    layer: &TileLayer,
    palette: &PaletteBank,
    axis: Axis,
    screen_line: i32,
    along: i32,
    across: i32,
) {
    let (length, along_mask) = match axis {
        Axis::Horizontal => (ctx.frame_buffer.width(), layer.pixel_width() - 1),
        Axis::Vertical => (ctx.frame_buffer.height(), layer.pixel_height() - 1),
    };
    let across_fine = (across & TILE_MASK) as usize;

    let mut drawn = 0;
    let mut position = along;
    while drawn < length {
        let fine = (position & TILE_MASK) as usize;
        let span = ((TILE_SIZE - fine) as i32).min(length - drawn);

        let (layer_x, layer_y) = match axis {
            Axis::Horizontal => (position, across),
            Axis::Vertical => (across, position),
        };

        if let Some(tile) = layer.tile_at(ctx.chunks, layer_x, layer_y) {
            if tile.plane == ctx.plane {
                let cursor = match axis {
                    Axis::Horizontal => TileCursor::row(tile, across_fine),
                    Axis::Vertical => TileCursor::column(tile, across_fine),
                };

                for i in 0..span {
                    let index = cursor.pixel(ctx.tileset, fine + i as usize);
                    if index == 0 {
                        continue;
                    }

                    let (x, y) = match axis {
                        Axis::Horizontal => (drawn + i, screen_line),
                        Axis::Vertical => (screen_line, drawn + i),
                    };
                    ctx.frame_buffer.set(x, y, palette[index as usize]);
                }
            }
        }

        drawn += span;
        position = (position + span) & along_mask;
    }
}

/// Indexed pixel at layer position `(x, y)`, or 0 outside the layer.
#[inline]
fn sample_layer(ctx: &LayerContext<'_>, layer: &TileLayer, x: i32, y: i32) -> u8 {
    if x < 0 || y < 0 || x >= layer.pixel_width() || y >= layer.pixel_height() {
        return 0;
    }

    match layer.tile_at(ctx.chunks, x, y) {
        Some(tile) => {
            ctx.tileset.sample(tile, (x & TILE_MASK) as usize, (y & TILE_MASK) as usize)
        }
        None => 0,
    }
}
