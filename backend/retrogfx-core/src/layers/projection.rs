//! Mode-7 style floor and sky projections, plus the flat rotate/zoom layer
//!
//! Positions use 12 bits of fraction per pixel inside the projection loops. No floating point is
//! used per pixel.

use super::{LayerContext, sample_layer};
use crate::layer::TileLayer;
use crate::trig;

// Projection step of the first floor row and the first sky step
const FLOOR_FIRST_STEP: i32 = 4;
const SKY_FIRST_STEP: i32 = 8;

/// Draw a perspective floor from the horizon to the bottom of the screen.
pub fn draw_floor(ctx: &mut LayerContext<'_>, layer: &TileLayer) {
    if layer.is_empty() {
        return;
    }

    let sin = trig::sin_projection(layer.angle);
    let cos = trig::cos_projection(layer.angle);
    let center_x = ctx.frame_buffer.width() / 2;
    let x_base = layer.x_pos >> 4;
    let z_base = layer.z_pos >> 4;
    let palettes = ctx.palette;

    for row in ctx.horizon.max(0)..ctx.frame_buffer.height() {
        let step = row - ctx.horizon + FLOOR_FIRST_STEP;
        let palette = palettes.for_line(ctx.horizon + (step - FLOOR_FIRST_STEP) / 2);

        let distance = layer.y_pos / (step << 9);
        let dx = distance.wrapping_mul(-cos) >> 8;
        let dy = sin.wrapping_mul(distance) >> 8;
        let mut x = x_base
            .wrapping_add(3_i32.wrapping_mul(sin).wrapping_mul(distance) >> 2)
            .wrapping_sub(dx.wrapping_mul(center_x));
        let mut y = z_base
            .wrapping_add(3_i32.wrapping_mul(cos).wrapping_mul(distance) >> 2)
            .wrapping_sub(dy.wrapping_mul(center_x));

        for column in 0..ctx.frame_buffer.width() {
            let index = sample_layer(ctx, layer, x >> 12, y >> 12);
            if index != 0 {
                ctx.frame_buffer.set(column, row, palette[index as usize]);
            }

            x = x.wrapping_add(dx);
            y = y.wrapping_add(dy);
        }
    }
}

/// Draw a perspective ceiling. Each screen row takes two projection steps and each screen pixel
/// two samples; later samples overwrite earlier ones.
pub fn draw_sky(ctx: &mut LayerContext<'_>, layer: &TileLayer) {
    if layer.is_empty() {
        return;
    }

    let sin = trig::sin_projection(layer.angle);
    let cos = trig::cos_projection(layer.angle);
    let line_size = ctx.frame_buffer.width();
    let x_base = layer.x_pos >> 4;
    let z_base = layer.z_pos >> 4;
    let palettes = ctx.palette;

    let rows = (ctx.frame_buffer.height() - ctx.horizon.max(0)).max(0);
    for pass in 0..2 * rows {
        let step = pass + SKY_FIRST_STEP;
        let row = ctx.horizon.max(0) + pass / 2;
        let palette = palettes.for_line(row);

        let distance = layer.y_pos / (step << 8);
        let dx = distance.wrapping_mul(-cos) >> 9;
        let dy = sin.wrapping_mul(distance) >> 9;
        let mut x = x_base
            .wrapping_add(3_i32.wrapping_mul(sin).wrapping_mul(distance) >> 2)
            .wrapping_sub(dx.wrapping_mul(line_size));
        let mut y = z_base
            .wrapping_add(3_i32.wrapping_mul(cos).wrapping_mul(distance) >> 2)
            .wrapping_sub(dy.wrapping_mul(line_size));

        for sample in 0..2 * line_size {
            let index = sample_layer(ctx, layer, x >> 12, y >> 12);
            if index != 0 {
                ctx.frame_buffer.set(sample / 2, row, palette[index as usize]);
            }

            x = x.wrapping_add(dx);
            y = y.wrapping_add(dy);
        }
    }
}

/// Draw a flat layer rotated by `angle` and zoomed by `z_pos` (8.8, 0 meaning 1.0) around the
/// screen center. `x_pos` and `y_pos` are the 16.16 layer position shown at the screen center,
/// and samples wrap around the layer.
pub fn draw_affine(ctx: &mut LayerContext<'_>, layer: &TileLayer) {
    if layer.is_empty() {
        return;
    }

    let zoom = i64::from(if layer.z_pos > 0 { layer.z_pos } else { 0x100 });
    let sin = i64::from(trig::sin_projection(layer.angle));
    let cos = i64::from(trig::cos_projection(layer.angle));

    // 4096-scaled trig to 16.16, divided by the 8.8 zoom
    let du_dx = (cos << 12) / zoom;
    let dv_dx = (sin << 12) / zoom;
    let du_dy = -dv_dx;
    let dv_dy = du_dx;

    let width_mask = layer.pixel_width() - 1;
    let height_mask = layer.pixel_height() - 1;
    let center_x = i64::from(ctx.frame_buffer.width() / 2);
    let center_y = i64::from(ctx.frame_buffer.height() / 2);
    let palettes = ctx.palette;

    for row in 0..ctx.frame_buffer.height() {
        let palette = palettes.for_line(row);
        let dy = i64::from(row) - center_y;
        let mut u = i64::from(layer.x_pos) - center_x * du_dx + dy * du_dy;
        let mut v = i64::from(layer.y_pos) - center_x * dv_dx + dy * dv_dy;

        for column in 0..ctx.frame_buffer.width() {
            let x = (u >> 16) as i32 & width_mask;
            let y = (v >> 16) as i32 & height_mask;
            let index = sample_layer(ctx, layer, x, y);
            if index != 0 {
                ctx.frame_buffer.set(column, row, palette[index as usize]);
            }

            u += du_dx;
            v += dv_dx;
        }
    }
}
