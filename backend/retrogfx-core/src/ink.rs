//! RGB565 compositing functions

use retrogfx_common::frontend::{pack_rgb565, unpack_rgb565};
use std::sync::LazyLock;

pub use retrogfx_config::InkEffect;

// Clears the low bit of each channel so that halving can't carry into the next channel
const BLEND_MASK: u16 = 0xF7DE;

static TINT_TABLE: LazyLock<Box<[u16]>> = LazyLock::new(|| {
    (0..=u16::MAX)
        .map(|color| {
            let (r, g, b) = unpack_rgb565(color);
            let luma = ((u16::from(r) + u16::from(g) + u16::from(b)) / 3) as u8;
            pack_rgb565(luma, luma, luma)
        })
        .collect()
});

/// 50/50 average of two colors.
#[inline]
#[must_use]
pub fn blend(src: u16, dst: u16) -> u16 {
    ((src & BLEND_MASK) >> 1) + ((dst & BLEND_MASK) >> 1)
}

/// Grayscale version of a color.
#[inline]
#[must_use]
pub fn tint(color: u16) -> u16 {
    TINT_TABLE[color as usize]
}

#[inline]
fn map_channels(src: u16, dst: u16, f: impl Fn(u32, u32) -> u32) -> u16 {
    let (sr, sg, sb) = unpack_rgb565(src);
    let (dr, dg, db) = unpack_rgb565(dst);
    let channel = |s: u8, d: u8| f(u32::from(s), u32::from(d)).min(255) as u8;
    pack_rgb565(channel(sr, dr), channel(sg, dg), channel(sb, db))
}

/// Composite `src` onto `dst`. `alpha` ranges from 0 (no effect) to 255 (full effect) and is
/// ignored by [`InkEffect::None`], [`InkEffect::Blend`], and [`InkEffect::Tint`].
#[inline]
#[must_use]
pub fn composite(ink: InkEffect, src: u16, dst: u16, alpha: u8) -> u16 {
    let alpha = u32::from(alpha);
    match ink {
        InkEffect::None => src,
        InkEffect::Blend => blend(src, dst),
        InkEffect::Alpha => match alpha {
            0 => dst,
            255 => src,
            _ => map_channels(src, dst, |s, d| (s * alpha + d * (255 - alpha)) / 255),
        },
        InkEffect::Add => map_channels(src, dst, |s, d| d + s * alpha / 255),
        InkEffect::Sub => map_channels(src, dst, |s, d| d.saturating_sub(s * alpha / 255)),
        InkEffect::Tint => tint(dst),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    const WHITE: u16 = 0xFFFF;
    const RED: u16 = 0xF800;
    const BLUE: u16 = 0x001F;

    #[test]
    fn blend_averages() {
        assert_eq!(0x7BEF, blend(WHITE, 0));
        assert_eq!(blend(RED, BLUE), blend(BLUE, RED));
        assert_eq!(WHITE & BLEND_MASK, blend(WHITE, WHITE));
    }

    #[test]
    fn alpha_endpoints() {
        assert_eq!(RED, composite(InkEffect::Alpha, RED, BLUE, 255));
        assert_eq!(BLUE, composite(InkEffect::Alpha, RED, BLUE, 0));
        assert_eq!(pack_rgb565(128, 0, 127), composite(InkEffect::Alpha, RED, BLUE, 128));
    }

    #[test]
    fn add_and_sub_saturate() {
        assert_eq!(RED | BLUE, composite(InkEffect::Add, RED, BLUE, 255));
        assert_eq!(WHITE, composite(InkEffect::Add, WHITE, WHITE, 255));
        assert_eq!(BLUE, composite(InkEffect::Sub, RED, RED | BLUE, 255));
        assert_eq!(0, composite(InkEffect::Sub, WHITE, RED, 255));
        assert_eq!(RED, composite(InkEffect::Sub, WHITE, RED, 0));
    }

    #[test]
    fn tint_is_gray_and_ignores_source() {
        let (r, g, b) = unpack_rgb565(composite(InkEffect::Tint, BLUE, RED, 255));
        assert_eq!(r >> 3, b >> 3);
        assert_eq!(r >> 3, 85 >> 3);
        assert!(g.abs_diff(r) <= 4);
        assert_eq!(tint(RED), composite(InkEffect::Tint, WHITE, RED, 0));
    }
}
