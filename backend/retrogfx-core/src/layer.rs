//! Tile layer records and their scroll state

use crate::tiles::{CHUNK_SIZE, ChunkTable, ChunkTile};
use bincode::{Decode, Encode};
use thiserror::Error;

// 128 chunks = 16384 pixels, which keeps `pixels << 16` inside an i32
pub const MAX_LAYER_CHUNKS: u32 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub enum LayerType {
    #[default]
    HScroll,
    VScroll,
    Floor3D,
    Sky3D,
    Basic,
}

impl LayerType {
    #[must_use]
    pub fn is_rotozoom(self) -> bool {
        matches!(self, Self::Floor3D | Self::Sky3D | Self::Basic)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayerError {
    #[error("Layer dimensions must be 0 or a power of two up to {MAX_LAYER_CHUNKS} chunks, was {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Layout has {actual} chunk entries, expected {expected}")]
    LayoutLength { expected: usize, actual: usize },
    #[error("Stage layer {0} does not exist")]
    InvalidStageLayer(usize),
    #[error("Draw slot {0} does not exist")]
    InvalidDrawSlot(usize),
}

/// One parallax band. Rows (or columns) of a layer pick a band through the layer's line scroll
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct ScrollInfo {
    /// 8.8 multiplier applied to the global scroll
    pub parallax_factor: i32,
    /// 16.16 auto-scroll speed per frame
    pub scroll_speed: i32,
    /// 16.16 auto-scroll position
    pub scroll_pos: i32,
    pub deform: bool,
    /// Resolved pixel offset for the current frame
    pub line_pos: i32,
}

impl ScrollInfo {
    #[must_use]
    pub fn new(parallax_factor: i32, scroll_speed: i32, deform: bool) -> Self {
        Self { parallax_factor, scroll_speed, scroll_pos: 0, deform, line_pos: 0 }
    }

    /// Advance the auto-scroll and resolve this frame's pixel offset within a layer axis of
    /// `length` pixels.
    pub fn update(&mut self, global_scroll: i32, length: i32) {
        self.scroll_pos = advance_scroll(self.scroll_pos, self.scroll_speed, length);
        self.line_pos = ((global_scroll.wrapping_mul(self.parallax_factor) >> 8)
            + (self.scroll_pos >> 16))
            .rem_euclid(length.max(1));
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), LayerError> {
    let valid = |n: u32| n.is_power_of_two() && n <= MAX_LAYER_CHUNKS;
    let empty = width == 0 && height == 0;
    if empty || (valid(width) && valid(height)) {
        Ok(())
    } else {
        Err(LayerError::InvalidDimensions { width, height })
    }
}

/// `(pos + speed) mod (length << 16)`, always non-negative.
#[inline]
#[must_use]
pub fn advance_scroll(pos: i32, speed: i32, length: i32) -> i32 {
    let modulus = i64::from(length.max(1)) << 16;
    (i64::from(pos) + i64::from(speed)).rem_euclid(modulus) as i32
}

#[derive(Debug, Clone, Default, Encode, Decode)]
pub struct TileLayer {
    pub layer_type: LayerType,
    width: u32,
    height: u32,
    width_shift: u8,
    layout: Vec<u16>,
    /// One band index per source pixel row (HScroll) or column (VScroll)
    pub line_scroll: Vec<u8>,
    pub scroll_info: Vec<ScrollInfo>,
    /// 8.8 multiplier applied to the global scroll along the layer's secondary axis
    pub parallax_factor: i32,
    pub scroll_speed: i32,
    pub scroll_pos: i32,
    pub deformation_offset: i32,
    pub deformation_offset_water: i32,
    pub angle: i32,
    pub x_pos: i32,
    pub y_pos: i32,
    pub z_pos: i32,
}

impl TileLayer {
    /// Create a layer of `width` x `height` chunks with an all-zero layout.
    ///
    /// # Errors
    ///
    /// Returns an error unless both dimensions are powers of two no larger than
    /// [`MAX_LAYER_CHUNKS`], or both are zero.
    pub fn new(layer_type: LayerType, width: u32, height: u32) -> Result<Self, LayerError> {
        check_dimensions(width, height)?;

        let line_len = (width.max(height) as usize) * CHUNK_SIZE;

        Ok(Self {
            layer_type,
            width,
            height,
            width_shift: width.trailing_zeros() as u8,
            layout: vec![0; (width * height) as usize],
            line_scroll: vec![0; line_len],
            scroll_info: vec![ScrollInfo::new(0x100, 0, false)],
            parallax_factor: 0x100,
            ..Self::default()
        })
    }

    /// Check the invariants [`TileLayer::new`] and [`TileLayer::set_layout`] establish, for layers
    /// that were decoded rather than constructed.
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensions are invalid, the stored width shift disagrees with the
    /// width, or the layout does not hold one entry per chunk.
    pub fn validate(&self) -> Result<(), LayerError> {
        check_dimensions(self.width, self.height)?;

        if u32::from(self.width_shift) != self.width.trailing_zeros() {
            return Err(LayerError::InvalidDimensions { width: self.width, height: self.height });
        }

        let expected = (self.width * self.height) as usize;
        if self.layout.len() != expected {
            return Err(LayerError::LayoutLength { expected, actual: self.layout.len() });
        }

        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if `layout` does not hold exactly one entry per chunk.
    pub fn set_layout(&mut self, layout: Vec<u16>) -> Result<(), LayerError> {
        if layout.len() != self.layout.len() {
            return Err(LayerError::LayoutLength { expected: self.layout.len(), actual: layout.len() });
        }
        self.layout = layout;
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    #[must_use]
    pub fn pixel_width(&self) -> i32 {
        (self.width as usize * CHUNK_SIZE) as i32
    }

    #[inline]
    #[must_use]
    pub fn pixel_height(&self) -> i32 {
        (self.height as usize * CHUNK_SIZE) as i32
    }

    #[inline]
    #[must_use]
    pub fn chunk_at(&self, chunk_x: u32, chunk_y: u32) -> Option<u16> {
        if chunk_x >= self.width || chunk_y >= self.height {
            return None;
        }
        self.layout.get(((chunk_y << self.width_shift) + chunk_x) as usize).copied()
    }

    pub fn set_chunk_at(&mut self, chunk_x: u32, chunk_y: u32, chunk: u16) {
        if chunk_x < self.width && chunk_y < self.height {
            self.layout[((chunk_y << self.width_shift) + chunk_x) as usize] = chunk;
        }
    }

    /// Resolve the 16x16 tile covering pixel `(x, y)` of the layer, which must already be
    /// wrapped into the layer.
    #[inline]
    #[must_use]
    pub fn tile_at(&self, chunks: &ChunkTable, x: i32, y: i32) -> Option<ChunkTile> {
        let chunk = self.chunk_at((x >> 7) as u32, (y >> 7) as u32)?;
        let tile_x = ((x & 0x7F) >> 4) as usize;
        let tile_y = ((y & 0x7F) >> 4) as usize;
        chunks.tile(chunk, tile_x, tile_y)
    }

    /// Band index for a source row or column, defaulting to band 0.
    #[inline]
    #[must_use]
    pub fn line_scroll_at(&self, line: i32) -> usize {
        usize::try_from(line)
            .ok()
            .and_then(|line| self.line_scroll.get(line).copied())
            .unwrap_or(0) as usize
    }

    /// Copy a `width` x `height` block of chunk entries from `src` at `(src_x, src_y)` to `self`
    /// at `(dst_x, dst_y)`, clipped to both layers.
    pub fn copy_chunks_from(
        &mut self,
        src: &TileLayer,
        src_x: u32,
        src_y: u32,
        dst_x: u32,
        dst_y: u32,
        width: u32,
        height: u32,
    ) {
        let width = clip_extent(width, src_x, src.width).min(clip_extent(width, dst_x, self.width));
        let height =
            clip_extent(height, src_y, src.height).min(clip_extent(height, dst_y, self.height));

        for y in 0..height {
            for x in 0..width {
                if let Some(chunk) = src.chunk_at(src_x + x, src_y + y) {
                    self.set_chunk_at(dst_x + x, dst_y + y, chunk);
                }
            }
        }
    }
}

fn clip_extent(extent: u32, start: u32, limit: u32) -> u32 {
    extent.min(limit.saturating_sub(start))
}
