//! 16x16 tileset pixels and the 128x128 chunk table that arranges them

use bincode::{Decode, Encode};
use thiserror::Error;

pub const TILE_SIZE: usize = 16;
pub const TILE_LEN: usize = TILE_SIZE * TILE_SIZE;
pub const TILE_MASK: i32 = TILE_SIZE as i32 - 1;

pub const CHUNK_SIZE: usize = 128;
pub const CHUNK_TILES: usize = CHUNK_SIZE / TILE_SIZE;
pub const CHUNK_LEN: usize = CHUNK_TILES * CHUNK_TILES;

pub const MAX_TILES: usize = 1024;
pub const MAX_CHUNKS: usize = 0x10000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub enum Flip {
    #[default]
    None,
    X,
    Y,
    XY,
}

impl Flip {
    /// Decode the low two bits of a direction value: bit 0 flips horizontally and bit 1 flips
    /// vertically.
    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        match (bits & 1 != 0, bits & 2 != 0) {
            (false, false) => Self::None,
            (true, false) => Self::X,
            (false, true) => Self::Y,
            (true, true) => Self::XY,
        }
    }

    #[inline]
    #[must_use]
    pub fn horizontal(self) -> bool {
        matches!(self, Self::X | Self::XY)
    }

    #[inline]
    #[must_use]
    pub fn vertical(self) -> bool {
        matches!(self, Self::Y | Self::XY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub enum VisualPlane {
    #[default]
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct ChunkTile {
    pub pixel_offset: u32,
    pub flip: Flip,
    pub plane: VisualPlane,
}

impl ChunkTile {
    #[must_use]
    pub fn new(tile: u16, flip: Flip, plane: VisualPlane) -> Self {
        Self { pixel_offset: u32::from(tile) * TILE_LEN as u32, flip, plane }
    }
}

/// Walks one row or one column of a tile with the tile's flip already applied, so that the
/// caller can always step forward from 0 to 15.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCursor {
    start: usize,
    step: isize,
}

impl TileCursor {
    /// Cursor over row `y` (0-15) of the tile as it appears on screen.
    #[inline]
    #[must_use]
    pub fn row(tile: ChunkTile, y: usize) -> Self {
        let offset = tile.pixel_offset as usize;
        let y = if tile.flip.vertical() { TILE_SIZE - 1 - y } else { y };
        if tile.flip.horizontal() {
            Self { start: offset + TILE_SIZE * y + TILE_SIZE - 1, step: -1 }
        } else {
            Self { start: offset + TILE_SIZE * y, step: 1 }
        }
    }

    /// Cursor over column `x` (0-15) of the tile as it appears on screen.
    #[inline]
    #[must_use]
    pub fn column(tile: ChunkTile, x: usize) -> Self {
        let offset = tile.pixel_offset as usize;
        let x = if tile.flip.horizontal() { TILE_SIZE - 1 - x } else { x };
        if tile.flip.vertical() {
            Self { start: offset + TILE_SIZE * (TILE_SIZE - 1) + x, step: -(TILE_SIZE as isize) }
        } else {
            Self { start: offset + x, step: TILE_SIZE as isize }
        }
    }

    /// Pixel `i` (0-15) along the cursor, or 0 if the tile lies outside the tileset.
    #[inline]
    #[must_use]
    pub fn pixel(self, tileset: &Tileset, i: usize) -> u8 {
        let index = self.start.wrapping_add_signed(self.step * i as isize);
        tileset.pixels.get(index).copied().unwrap_or(0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TilesetError {
    #[error("Tileset pixel data length {0} is not a multiple of {TILE_LEN}")]
    PartialTile(usize),
    #[error("Tileset has {0} tiles, max is {MAX_TILES}")]
    TooManyTiles(usize),
}

#[derive(Debug, Clone, Default, Encode, Decode)]
pub struct Tileset {
    pixels: Vec<u8>,
}

impl Tileset {
    /// # Errors
    ///
    /// Returns an error if the pixel data does not hold a whole number of tiles or holds more
    /// than [`MAX_TILES`] tiles.
    pub fn from_pixels(pixels: Vec<u8>) -> Result<Self, TilesetError> {
        let tileset = Self { pixels };
        tileset.validate()?;
        Ok(tileset)
    }

    /// # Errors
    ///
    /// Returns the same errors as [`Tileset::from_pixels`].
    pub fn validate(&self) -> Result<(), TilesetError> {
        if self.pixels.len() % TILE_LEN != 0 {
            return Err(TilesetError::PartialTile(self.pixels.len()));
        }

        let tile_count = self.pixels.len() / TILE_LEN;
        if tile_count > MAX_TILES {
            return Err(TilesetError::TooManyTiles(tile_count));
        }

        Ok(())
    }

    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.pixels.len() / TILE_LEN
    }

    /// Sample screen-space pixel `(x, y)` of a tile, with `x` and `y` in `0..16`.
    #[inline]
    #[must_use]
    pub fn sample(&self, tile: ChunkTile, x: usize, y: usize) -> u8 {
        TileCursor::row(tile, y).pixel(self, x)
    }
}

#[derive(Debug, Clone, Default, Encode, Decode)]
pub struct ChunkTable {
    tiles: Vec<ChunkTile>,
}

impl ChunkTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.tiles.len() / CHUNK_LEN
    }

    /// Store the 8x8 tile grid of a chunk, in row-major order.
    pub fn set_chunk(&mut self, chunk: u16, tiles: &[ChunkTile; CHUNK_LEN]) {
        let start = chunk as usize * CHUNK_LEN;
        if self.tiles.len() < start + CHUNK_LEN {
            self.tiles.resize(start + CHUNK_LEN, ChunkTile::default());
        }
        self.tiles[start..start + CHUNK_LEN].copy_from_slice(tiles);
    }

    #[inline]
    #[must_use]
    pub fn tile(&self, chunk: u16, tile_x: usize, tile_y: usize) -> Option<ChunkTile> {
        if tile_x >= CHUNK_TILES || tile_y >= CHUNK_TILES {
            return None;
        }
        self.tiles.get(chunk as usize * CHUNK_LEN + tile_y * CHUNK_TILES + tile_x).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn numbered_tileset() -> Tileset {
        // Pixel (x, y) of tile 0 holds x + 16 * y, truncated to u8
        let pixels = (0..TILE_LEN).map(|i| i as u8).collect();
        Tileset::from_pixels(pixels).unwrap()
    }

    #[test]
    fn flip_cursors_match_mirrored_coordinates() {
        let tileset = numbered_tileset();
        for flip in [Flip::None, Flip::X, Flip::Y, Flip::XY] {
            let tile = ChunkTile::new(0, flip, VisualPlane::Low);
            let unflipped = ChunkTile::new(0, Flip::None, VisualPlane::Low);
            for y in 0..TILE_SIZE {
                for x in 0..TILE_SIZE {
                    let src_x = if flip.horizontal() { 15 - x } else { x };
                    let src_y = if flip.vertical() { 15 - y } else { y };
                    let expected = tileset.sample(unflipped, src_x, src_y);

                    assert_eq!(expected, tileset.sample(tile, x, y), "{flip:?} ({x}, {y})");
                    assert_eq!(expected, TileCursor::column(tile, x).pixel(&tileset, y));
                }
            }
        }
    }

    #[test]
    fn flipping_twice_is_identity() {
        let tileset = numbered_tileset();
        for flip in [Flip::None, Flip::X, Flip::Y, Flip::XY] {
            let tile = ChunkTile::new(0, flip, VisualPlane::Low);
            for y in 0..TILE_SIZE {
                for x in 0..TILE_SIZE {
                    let mx = if flip.horizontal() { 15 - x } else { x };
                    let my = if flip.vertical() { 15 - y } else { y };
                    assert_eq!((x + 16 * y) as u8, tileset.sample(tile, mx, my));
                }
            }
        }
    }

    #[test]
    fn flip_from_bits() {
        assert_eq!(Flip::None, Flip::from_bits(0));
        assert_eq!(Flip::X, Flip::from_bits(1));
        assert_eq!(Flip::Y, Flip::from_bits(2));
        assert_eq!(Flip::XY, Flip::from_bits(7));
    }

    #[test]
    fn out_of_range_lookups() {
        let tileset = numbered_tileset();
        let missing = ChunkTile::new(5, Flip::None, VisualPlane::Low);
        assert_eq!(0, tileset.sample(missing, 3, 3));

        let mut chunks = ChunkTable::new();
        chunks.set_chunk(2, &[ChunkTile::new(0, Flip::X, VisualPlane::High); CHUNK_LEN]);
        assert_eq!(3, chunks.chunk_count());
        assert_eq!(Some(Flip::X), chunks.tile(2, 7, 7).map(|tile| tile.flip));
        assert_eq!(None, chunks.tile(3, 0, 0));
        assert_eq!(None, chunks.tile(0, 8, 0));
    }

    #[test]
    fn rejects_bad_tilesets() {
        assert_eq!(Err(TilesetError::PartialTile(255)), Tileset::from_pixels(vec![0; 255]).map(|_| ()));
        assert_eq!(
            Err(TilesetError::TooManyTiles(MAX_TILES + 1)),
            Tileset::from_pixels(vec![0; (MAX_TILES + 1) * TILE_LEN]).map(|_| ())
        );
    }
}
