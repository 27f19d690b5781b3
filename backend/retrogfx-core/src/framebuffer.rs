use crate::ink::{self, InkEffect};
use bincode::{Decode, Encode};
use retrogfx_common::frontend::{Color, FrameSize};

#[derive(Debug, Clone, Encode, Decode)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u16>,
}

impl FrameBuffer {
    #[must_use]
    pub fn new(size: FrameSize) -> Self {
        Self { width: size.width, height: size.height, pixels: vec![0; size.len()] }
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> FrameSize {
        FrameSize { width: self.width, height: self.height }
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> i32 {
        self.width as i32
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> i32 {
        self.height as i32
    }

    /// Whether the pixel data holds exactly one frame.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.pixels.len() == self.size().len()
    }

    #[must_use]
    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    #[must_use]
    pub fn row(&self, y: u32) -> Option<&[u16]> {
        if y >= self.height {
            return None;
        }

        let start = y as usize * self.width as usize;
        self.pixels.get(start..start + self.width as usize)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Option<u16> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    pub fn fill(&mut self, color: u16) {
        self.pixels.fill(color);
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        (x >= 0 && y >= 0 && x < self.width() && y < self.height())
            .then(|| (y as usize) * (self.width as usize) + (x as usize))
    }

    /// Write a color, ignoring coordinates outside the screen.
    #[inline]
    pub fn set(&mut self, x: i32, y: i32, color: u16) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    /// Composite a color onto the pixel at `(x, y)`, ignoring coordinates outside the screen.
    #[inline]
    pub fn blend(&mut self, x: i32, y: i32, color: u16, ink: InkEffect, alpha: u8) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = ink::composite(ink, color, self.pixels[i], alpha);
        }
    }

    /// Convert the frame to RGBA8 for presentation.
    pub fn to_colors(&self, out: &mut Vec<Color>) {
        retrogfx_common::frontend::rgb565_to_colors(&self.pixels, out);
    }
}
