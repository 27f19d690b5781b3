use super::{Axis, LayerContext, draw_layer_line};
use crate::deform::DeformationTarget;
use crate::layer::{TileLayer, advance_scroll};

// Columns have no underwater split; the whole layer uses the above-water ring and the line 0 bank
pub(super) fn draw(ctx: &mut LayerContext<'_>, layer: &mut TileLayer) {
    let width = layer.pixel_width();
    let height = layer.pixel_height();

    let x_offset = if ctx.foreground {
        ctx.scroll.x
    } else {
        layer.scroll_pos = advance_scroll(layer.scroll_pos, layer.scroll_speed, width);
        (ctx.scroll.x.wrapping_mul(layer.parallax_factor) >> 8) + (layer.scroll_pos >> 16)
    }
    .rem_euclid(width);

    for band in &mut layer.scroll_info {
        if ctx.foreground {
            band.line_pos = ctx.scroll.y.rem_euclid(height);
        } else {
            band.update(ctx.scroll.y, height);
        }
    }

    let palette = ctx.palette.for_line(0);
    let deformation = ctx.deformation;
    let ring = DeformationTarget::for_region(ctx.foreground, false);
    for column in 0..ctx.frame_buffer.width() {
        let src_x = (x_offset + column) & (width - 1);
        let band = layer.scroll_info.get(layer.line_scroll_at(src_x)).copied().unwrap_or_default();

        let mut y = band.line_pos;
        if band.deform {
            let position = x_offset.wrapping_add(layer.deformation_offset).wrapping_add(column);
            y = y.wrapping_add(deformation.sample(ring, position));
        }

        draw_layer_line(ctx, layer, palette, Axis::Vertical, column, y.rem_euclid(height), src_x);
    }
}
