use bincode::{Decode, Encode};
use std::fmt::{Display, Formatter};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable, Encode, Decode)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    #[must_use]
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Expand a packed RGB565 color to 8 bits per channel, replicating the high bits into the low
    /// bits so that full intensity maps to 255.
    #[must_use]
    #[inline]
    pub const fn from_rgb565(color: u16) -> Self {
        let (r, g, b) = unpack_rgb565(color);
        Self::rgb(r, g, b)
    }
}

impl Default for Color {
    #[inline]
    fn default() -> Self {
        Self::BLACK
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    #[must_use]
    #[inline]
    pub fn len(self) -> usize {
        (self.width * self.height) as usize
    }

    #[must_use]
    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Display for FrameSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[must_use]
#[inline]
pub const fn pack_rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3)
}

#[must_use]
#[inline]
pub const fn unpack_rgb565(color: u16) -> (u8, u8, u8) {
    let r = ((color >> 11) & 0x1F) as u8;
    let g = ((color >> 5) & 0x3F) as u8;
    let b = (color & 0x1F) as u8;
    ((r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2))
}

/// Convert packed RGB565 pixels to RGBA8 for presentation.
pub fn rgb565_to_colors(pixels: &[u16], out: &mut Vec<Color>) {
    out.clear();
    out.extend(pixels.iter().copied().map(Color::from_rgb565));
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn rgb565_extremes() {
        assert_eq!(0xFFFF, pack_rgb565(255, 255, 255));
        assert_eq!(0x0000, pack_rgb565(7, 3, 7));
        assert_eq!(0xF800, pack_rgb565(255, 0, 0));
        assert_eq!(0x07E0, pack_rgb565(0, 255, 0));
        assert_eq!(0x001F, pack_rgb565(0, 0, 255));

        assert_eq!(Color::rgb(255, 255, 255), Color::from_rgb565(0xFFFF));
        assert_eq!(Color::rgb(255, 0, 0), Color::from_rgb565(0xF800));
        assert_eq!(Color::BLACK, Color::from_rgb565(0x0000));
    }

    #[test]
    fn rgb565_unpack_repack_is_stable() {
        for color in [0x1234_u16, 0xF7DE, 0x0821, 0xABCD] {
            let (r, g, b) = unpack_rgb565(color);
            assert_eq!(color, pack_rgb565(r, g, b), "color {color:04X}");
        }
    }
}
