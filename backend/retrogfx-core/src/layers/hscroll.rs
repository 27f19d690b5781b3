use super::{Axis, LayerContext, draw_layer_line};
use crate::deform::DeformationTarget;
use crate::layer::{TileLayer, advance_scroll};

pub(super) fn draw(ctx: &mut LayerContext<'_>, layer: &mut TileLayer) {
    let width = layer.pixel_width();
    let height = layer.pixel_height();

    let y_offset = if ctx.foreground {
        ctx.scroll.y
    } else {
        layer.scroll_pos = advance_scroll(layer.scroll_pos, layer.scroll_speed, height);
        (ctx.scroll.y.wrapping_mul(layer.parallax_factor) >> 8) + (layer.scroll_pos >> 16)
    }
    .rem_euclid(height);

    for band in &mut layer.scroll_info {
        if ctx.foreground {
            band.line_pos = ctx.scroll.x.rem_euclid(width);
        } else {
            band.update(ctx.scroll.x, width);
        }
    }

    let palettes = ctx.palette;
    let deformation = ctx.deformation;
    for row in 0..ctx.frame_buffer.height() {
        let src_y = (y_offset + row) & (height - 1);
        let band = layer.scroll_info.get(layer.line_scroll_at(src_y)).copied().unwrap_or_default();

        let mut x = band.line_pos;
        if band.deform {
            let underwater = row >= ctx.scroll.water_line;
            let offset = if underwater {
                layer.deformation_offset_water
            } else {
                layer.deformation_offset
            };
            let ring = DeformationTarget::for_region(ctx.foreground, underwater);
            let position = y_offset.wrapping_add(offset).wrapping_add(row);
            x = x.wrapping_add(deformation.sample(ring, position));
        }

        draw_layer_line(
            ctx,
            layer,
            palettes.for_line(row),
            Axis::Horizontal,
            row,
            x.rem_euclid(width),
            src_y,
        );
    }
}
