//! Sprite sheets and the per-script animation frame tables that index into them

use bincode::{Decode, Encode};
use thiserror::Error;

pub const MAX_SHEETS: usize = 24;
pub const MAX_SHEET_WIDTH_SHIFT: u8 = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SheetError {
    #[error("Sheet width {width} does not fit in a row stride of {stride}")]
    WidthExceedsStride { width: u32, stride: u32 },
    #[error("Sheet width shift {0} is larger than {MAX_SHEET_WIDTH_SHIFT}")]
    WidthShiftTooLarge(u8),
    #[error("Sheet pixel data has length {actual}, expected {expected}")]
    PixelLength { expected: usize, actual: usize },
    #[error("Sheet slot {0} is out of range (max {max})", max = MAX_SHEETS - 1)]
    SlotOutOfRange(usize),
}

/// Indexed-color sprite sheet whose rows are `1 << width_shift` pixels apart.
#[derive(Debug, Clone, Encode, Decode)]
pub struct SpriteSheet {
    width: u32,
    height: u32,
    width_shift: u8,
    pixels: Vec<u8>,
}

impl SpriteSheet {
    /// # Errors
    ///
    /// Returns an error if the width does not fit in the row stride or if `pixels` does not hold
    /// exactly `height` rows.
    pub fn new(width: u32, height: u32, width_shift: u8, pixels: Vec<u8>) -> Result<Self, SheetError> {
        let sheet = Self { width, height, width_shift, pixels };
        sheet.validate()?;
        Ok(sheet)
    }

    /// Check that the dimensions, row stride, and pixel data agree.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`SpriteSheet::new`].
    pub fn validate(&self) -> Result<(), SheetError> {
        if self.width_shift > MAX_SHEET_WIDTH_SHIFT {
            return Err(SheetError::WidthShiftTooLarge(self.width_shift));
        }

        let stride = 1_u32 << self.width_shift;
        if self.width > stride {
            return Err(SheetError::WidthExceedsStride { width: self.width, stride });
        }

        let expected = (self.height as usize) << self.width_shift;
        if self.pixels.len() != expected {
            return Err(SheetError::PixelLength { expected, actual: self.pixels.len() });
        }

        Ok(())
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

    #[inline]
    #[must_use]
    pub fn width_shift(&self) -> u8 {
        self.width_shift
    }

    /// Pixel at `(x, y)`, or 0 (transparent) outside the sheet.
    #[inline]
    #[must_use]
    pub fn pixel(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width() || y >= self.height() {
            return 0;
        }
        self.pixels[((y as usize) << self.width_shift) + x as usize]
    }

    /// Pixel at `(x, y)` with both coordinates clamped into the sheet.
    #[inline]
    #[must_use]
    pub fn pixel_clamped(&self, x: i32, y: i32) -> u8 {
        if self.width == 0 || self.height == 0 {
            return 0;
        }
        let x = x.clamp(0, self.width() - 1);
        let y = y.clamp(0, self.height() - 1);
        self.pixels[((y as usize) << self.width_shift) + x as usize]
    }
}

/// Source rectangle and pivot of one animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct SpriteFrame {
    pub sprite_x: i32,
    pub sprite_y: i32,
    pub width: i32,
    pub height: i32,
    /// Offset from the draw position to the frame's top-left corner
    pub pivot_x: i32,
    pub pivot_y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct SpriteScript {
    pub sheet_id: u8,
    /// Index of this script's first frame in the shared frame table
    pub frame_list_offset: usize,
}
