//! Renderer entry points
//!
//! [`RenderState`] owns every buffer a frame reads or writes. Stage data (palettes, tiles, chunks,
//! layers, sprite sheets) is loaded once and the scene buffers are refilled every frame; draw calls
//! take `&mut self` and never fail, skipping anything that refers to missing data.

use crate::blit::{self, BlitTarget, Rotozoom};
use crate::deform::{DeformationTables, DeformationTarget, WaveType};
use crate::framebuffer::FrameBuffer;
use crate::ink::InkEffect;
use crate::layer::{LayerError, TileLayer};
use crate::layers::{self, LayerContext, ScreenScroll};
use crate::palette::{PaletteBanks, PaletteError};
use crate::scene3d::{self, Projection, Scene3D, SceneContext, SceneError};
use crate::sheet::{MAX_SHEETS, SheetError, SpriteFrame, SpriteScript, SpriteSheet};
use crate::tiles::{CHUNK_LEN, ChunkTable, ChunkTile, Flip, Tileset, TilesetError, VisualPlane};
use bincode::{Decode, Encode};
use retrogfx_common::frontend::{Color, pack_rgb565};
use retrogfx_config::{ConfigError, RenderConfig};
use thiserror::Error;

pub const STAGE_LAYER_COUNT: usize = 9;
pub const DRAW_SLOT_COUNT: usize = 4;

#[derive(Debug, Error)]
pub enum RenderStateError {
    #[error("Invalid render config: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Layer(#[from] LayerError),
    #[error(transparent)]
    Tileset(#[from] TilesetError),
    #[error(transparent)]
    Sheet(#[from] SheetError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Palette(#[from] PaletteError),
    #[error("Frame buffer does not match the configured {width}x{height} screen")]
    FrameBufferSize { width: u32, height: u32 },
    #[error("Expected {expected} {table} entries, found {actual}")]
    TableLength { table: &'static str, expected: usize, actual: usize },
}

pub type RenderResult<T> = Result<T, RenderStateError>;

fn lookup_sheet(sheets: &[Option<SpriteSheet>], sheet_id: usize) -> Option<&SpriteSheet> {
    let sheet = sheets.get(sheet_id).and_then(Option::as_ref);
    if sheet.is_none() {
        log::debug!("Sprite sheet {sheet_id} is not loaded");
    }
    sheet
}

fn check_table_length(table: &'static str, expected: usize, actual: usize) -> RenderResult<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(RenderStateError::TableLength { table, expected, actual })
    }
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct RenderState {
    config: RenderConfig,
    frame_buffer: FrameBuffer,
    palette: PaletteBanks,
    tileset: Tileset,
    chunks: ChunkTable,
    stage_layers: Vec<TileLayer>,
    active_layers: [Option<u8>; DRAW_SLOT_COUNT],
    deformation: DeformationTables,
    scroll: ScreenScroll,
    sheets: Vec<Option<SpriteSheet>>,
    frames: Vec<SpriteFrame>,
    scripts: Vec<SpriteScript>,
    scene: Scene3D,
}

impl RenderState {
    /// # Errors
    ///
    /// Returns an error if the config fails validation.
    pub fn new(config: RenderConfig) -> RenderResult<Self> {
        config.validate()?;

        log::info!("Creating {}x{} renderer", config.line_size, config.screen_height);

        Ok(Self {
            config,
            frame_buffer: FrameBuffer::new(config.frame_size()),
            palette: PaletteBanks::new(config.screen_height),
            tileset: Tileset::default(),
            chunks: ChunkTable::new(),
            stage_layers: vec![TileLayer::default(); STAGE_LAYER_COUNT],
            active_layers: [None; DRAW_SLOT_COUNT],
            deformation: DeformationTables::default(),
            scroll: ScreenScroll { x: 0, y: 0, water_line: config.screen_height as i32 },
            sheets: vec![None; MAX_SHEETS],
            frames: Vec::new(),
            scripts: Vec::new(),
            scene: Scene3D::new(),
        })
    }

    /// Check the invariants the constructor and setters maintain. Decoded states only hold them if
    /// the encoded data was produced by this renderer, so callers restoring a state should run this
    /// before drawing with it.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> RenderResult<()> {
        self.config.validate()?;

        let size = self.config.frame_size();
        if self.frame_buffer.size() != size || !self.frame_buffer.is_consistent() {
            return Err(RenderStateError::FrameBufferSize { width: size.width, height: size.height });
        }

        check_table_length("stage layer", STAGE_LAYER_COUNT, self.stage_layers.len())?;
        check_table_length("sprite sheet", MAX_SHEETS, self.sheets.len())?;

        for layer in &self.stage_layers {
            layer.validate()?;
        }
        for (slot, layer) in self.active_layers.iter().enumerate() {
            if let Some(index) = layer.map(usize::from).filter(|&index| index >= STAGE_LAYER_COUNT) {
                log::warn!("Draw slot {slot} refers to stage layer {index}");
                return Err(LayerError::InvalidStageLayer(index).into());
            }
        }

        self.tileset.validate()?;
        for sheet in self.sheets.iter().flatten() {
            sheet.validate()?;
        }
        self.scene.validate()?;

        Ok(())
    }

    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    #[must_use]
    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.frame_buffer
    }

    #[must_use]
    pub fn palette(&self) -> &PaletteBanks {
        &self.palette
    }

    pub fn palette_mut(&mut self) -> &mut PaletteBanks {
        &mut self.palette
    }

    #[must_use]
    pub fn scene(&self) -> &Scene3D {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene3D {
        &mut self.scene
    }

    #[must_use]
    pub fn deformation(&self) -> &DeformationTables {
        &self.deformation
    }

    #[must_use]
    pub fn scroll(&self) -> ScreenScroll {
        self.scroll
    }

    /// Convert the frame to RGBA8.
    pub fn to_rgba(&self, out: &mut Vec<Color>) {
        self.frame_buffer.to_colors(out);
    }

    // Stage data

    /// Replace the 16x16 tile pixel data.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not a whole number of tiles or holds too many tiles.
    pub fn load_tileset(&mut self, pixels: Vec<u8>) -> RenderResult<()> {
        self.tileset = Tileset::from_pixels(pixels)?;
        log::debug!("Loaded {} tiles", self.tileset.tile_count());
        Ok(())
    }

    pub fn set_chunk(&mut self, chunk: u16, tiles: &[ChunkTile; CHUNK_LEN]) {
        self.chunks.set_chunk(chunk, tiles);
    }

    #[must_use]
    pub fn chunks(&self) -> &ChunkTable {
        &self.chunks
    }

    /// # Errors
    ///
    /// Returns an error if `index` is not a stage layer slot.
    pub fn set_stage_layer(&mut self, index: usize, layer: TileLayer) -> RenderResult<()> {
        let slot = self.stage_layers.get_mut(index).ok_or(LayerError::InvalidStageLayer(index))?;
        log::debug!(
            "Stage layer {index}: {:?} {}x{} chunks",
            layer.layer_type,
            layer.width(),
            layer.height()
        );
        *slot = layer;
        Ok(())
    }

    #[must_use]
    pub fn stage_layer(&self, index: usize) -> Option<&TileLayer> {
        self.stage_layers.get(index)
    }

    pub fn stage_layer_mut(&mut self, index: usize) -> Option<&mut TileLayer> {
        self.stage_layers.get_mut(index)
    }

    /// Choose which stage layer a draw slot shows, or `None` to leave the slot empty.
    ///
    /// # Errors
    ///
    /// Returns an error if either the slot or the stage layer does not exist.
    pub fn set_active_layer(&mut self, slot: usize, stage_layer: Option<usize>) -> RenderResult<()> {
        if slot >= DRAW_SLOT_COUNT {
            log::warn!("Rejected draw slot {slot}");
            return Err(LayerError::InvalidDrawSlot(slot).into());
        }

        let stage_layer = match stage_layer {
            Some(index) if index < STAGE_LAYER_COUNT => Some(index as u8),
            Some(index) => {
                log::warn!("Rejected stage layer {index} for draw slot {slot}");
                return Err(LayerError::InvalidStageLayer(index).into());
            }
            None => None,
        };

        self.active_layers[slot] = stage_layer;
        Ok(())
    }

    #[must_use]
    pub fn active_layer(&self, slot: usize) -> Option<usize> {
        self.active_layers.get(slot).copied().flatten().map(usize::from)
    }

    pub fn set_scroll(&mut self, x: i32, y: i32) {
        self.scroll.x = x;
        self.scroll.y = y;
    }

    pub fn set_water_line(&mut self, line: i32) {
        self.scroll.water_line = line;
    }

    pub fn set_layer_deformation(
        &mut self,
        target: DeformationTarget,
        wave_length: i32,
        wave_width: i32,
        wave_type: WaveType,
        offset: usize,
        count: usize,
    ) {
        self.deformation.set_wave(target, wave_length, wave_width, wave_type, offset, count);
    }

    /// Copy a block of chunk entries between stage layers, clipped to both layers.
    ///
    /// # Errors
    ///
    /// Returns an error if either stage layer does not exist.
    pub fn copy_tile_layer(
        &mut self,
        dst: usize,
        dst_x: u32,
        dst_y: u32,
        src: usize,
        src_x: u32,
        src_y: u32,
        width: u32,
        height: u32,
    ) -> RenderResult<()> {
        for index in [dst, src] {
            if index >= STAGE_LAYER_COUNT {
                return Err(LayerError::InvalidStageLayer(index).into());
            }
        }

        if dst == src {
            let source = self.stage_layers[src].clone();
            self.stage_layers[dst].copy_chunks_from(&source, src_x, src_y, dst_x, dst_y, width, height);
        } else if dst < src {
            let (left, right) = self.stage_layers.split_at_mut(src);
            left[dst].copy_chunks_from(&right[0], src_x, src_y, dst_x, dst_y, width, height);
        } else {
            let (left, right) = self.stage_layers.split_at_mut(dst);
            right[0].copy_chunks_from(&left[src], src_x, src_y, dst_x, dst_y, width, height);
        }

        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if `slot` is not a sheet slot.
    pub fn register_sheet(&mut self, slot: usize, sheet: SpriteSheet) -> RenderResult<()> {
        let entry = self.sheets.get_mut(slot).ok_or(SheetError::SlotOutOfRange(slot))?;
        log::debug!("Sheet {slot}: {}x{}", sheet.width(), sheet.height());
        *entry = Some(sheet);
        Ok(())
    }

    pub fn set_sprite_frames(&mut self, frames: Vec<SpriteFrame>) {
        self.frames = frames;
    }

    pub fn set_sprite_scripts(&mut self, scripts: Vec<SpriteScript>) {
        self.scripts = scripts;
    }

    // Palette

    /// # Errors
    ///
    /// Returns an error if `bank` is out of range.
    pub fn set_palette_entry(&mut self, bank: usize, index: u8, r: u8, g: u8, b: u8) -> RenderResult<()> {
        Ok(self.palette.set_entry(bank, index, r, g, b)?)
    }

    /// # Errors
    ///
    /// Returns an error if `bank` is out of range.
    pub fn set_palette_entry_packed(&mut self, bank: usize, index: u8, rgb: u32) -> RenderResult<()> {
        Ok(self.palette.set_entry_packed(bank, index, rgb)?)
    }

    /// # Errors
    ///
    /// Returns an error if `bank` is out of range.
    pub fn palette_entry_packed(&self, bank: usize, index: u8) -> RenderResult<u32> {
        Ok(self.palette.entry_packed(bank, index)?)
    }

    /// # Errors
    ///
    /// Returns an error if either bank is out of range.
    pub fn copy_palette(
        &mut self,
        src_bank: usize,
        src_start: u8,
        dst_bank: usize,
        dst_start: u8,
        count: usize,
    ) -> RenderResult<()> {
        Ok(self.palette.copy(src_bank, src_start, dst_bank, dst_start, count)?)
    }

    /// # Errors
    ///
    /// Returns an error if `bank` is out of range.
    pub fn rotate_palette(&mut self, bank: usize, start: u8, end: u8, right: bool) -> RenderResult<()> {
        Ok(self.palette.rotate(bank, start, end, right)?)
    }

    /// # Errors
    ///
    /// Returns an error if `bank` is out of range.
    pub fn set_active_palette(&mut self, bank: usize, start_line: u32, end_line: u32) -> RenderResult<()> {
        Ok(self.palette.set_active(bank, start_line, end_line)?)
    }

    /// # Errors
    ///
    /// Returns an error if any bank is out of range.
    pub fn set_palette_fade(
        &mut self,
        dst: usize,
        src_a: usize,
        src_b: usize,
        amount: u16,
        start: u8,
        end: u8,
    ) -> RenderResult<()> {
        Ok(self.palette.fade(dst, src_a, src_b, amount, start, end)?)
    }

    /// # Errors
    ///
    /// Returns an error if `bank` is out of range.
    pub fn set_limited_fade(
        &mut self,
        bank: usize,
        r: u8,
        g: u8,
        b: u8,
        amount: u16,
        start: u8,
        end: u8,
    ) -> RenderResult<()> {
        Ok(self.palette.limited_fade(bank, r, g, b, amount, start, end)?)
    }

    // Scene buffers

    pub fn clear_scene(&mut self) {
        self.scene.clear();
    }

    /// Set the fog color (`0xRRGGBB`) and the maximum fog alpha applied to fog-faded faces.
    pub fn set_fog(&mut self, color: u32, strength: i32) {
        self.scene.fog_color = color;
        self.scene.fog_strength = strength;
    }

    pub fn set_projection(&mut self, projection_x: i32, projection_y: i32) {
        self.config.projection_x = projection_x;
        self.config.projection_y = projection_y;
    }

    // Layer drawing

    fn layer_context(&mut self, plane: VisualPlane, foreground: bool) -> (LayerContext<'_>, &mut [TileLayer]) {
        let ctx = LayerContext {
            frame_buffer: &mut self.frame_buffer,
            palette: &self.palette,
            tileset: &self.tileset,
            chunks: &self.chunks,
            deformation: &self.deformation,
            scroll: self.scroll,
            plane,
            foreground,
            horizon: self.config.horizon_line() as i32,
        };
        (ctx, &mut self.stage_layers)
    }

    /// Draw the stage layer shown in a draw slot. Slots at or above the configured mid point draw
    /// high-plane tiles, the others low-plane tiles.
    pub fn draw_tile_layer(&mut self, slot: usize) {
        let Some(index) = self.active_layer(slot) else {
            log::trace!("Draw slot {slot} is empty");
            return;
        };

        let plane = if slot >= usize::from(self.config.tile_layer_mid_point) {
            VisualPlane::High
        } else {
            VisualPlane::Low
        };

        let (mut ctx, stage_layers) = self.layer_context(plane, index == 0);
        if let Some(layer) = stage_layers.get_mut(index) {
            layers::draw_layer(&mut ctx, layer);
        }
    }

    /// Draw every draw slot in order.
    pub fn draw_active_layers(&mut self) {
        for slot in 0..DRAW_SLOT_COUNT {
            self.draw_tile_layer(slot);
        }
    }

    /// Draw the stage layer shown in a draw slot as a perspective floor regardless of its type.
    pub fn draw_3d_floor_layer(&mut self, slot: usize) {
        let Some(index) = self.active_layer(slot) else {
            log::trace!("Draw slot {slot} is empty");
            return;
        };

        let (mut ctx, stage_layers) = self.layer_context(VisualPlane::Low, false);
        if let Some(layer) = stage_layers.get(index) {
            layers::draw_floor(&mut ctx, layer);
        }
    }

    /// Draw the stage layer shown in a draw slot as a perspective sky regardless of its type.
    pub fn draw_3d_sky_layer(&mut self, slot: usize) {
        let Some(index) = self.active_layer(slot) else {
            log::trace!("Draw slot {slot} is empty");
            return;
        };

        let (mut ctx, stage_layers) = self.layer_context(VisualPlane::Low, false);
        if let Some(layer) = stage_layers.get(index) {
            layers::draw_sky(&mut ctx, layer);
        }
    }

    /// Transform, sort, and rasterize the scene buffers. Textured faces sample `sheet_id`.
    pub fn draw_3d_scene(&mut self, sheet_id: usize) {
        self.scene.transform();
        self.scene.sort();

        let mut ctx = SceneContext {
            frame_buffer: &mut self.frame_buffer,
            palette: &self.palette,
            sheets: &self.sheets,
            frames: &self.frames,
            scripts: &self.scripts,
            projection: Projection::from_config(&self.config),
            fog_threshold: self.config.fog_threshold,
        };
        scene3d::draw_scene(&mut ctx, &self.scene, sheet_id);
    }

    // Screen helpers

    /// Fill the screen with one palette index, resolved per row through the row's bank.
    pub fn clear_screen(&mut self, index: u8) {
        for y in 0..self.frame_buffer.height() {
            let color = self.palette.for_line(y)[index as usize];
            for x in 0..self.frame_buffer.width() {
                self.frame_buffer.set(x, y, color);
            }
        }
    }

    /// Fill a rectangle with a direct color at alpha `a`; 255 and above is opaque.
    pub fn draw_rectangle(&mut self, x: i32, y: i32, width: i32, height: i32, r: u8, g: u8, b: u8, a: i32) {
        if a <= 0 {
            return;
        }

        let (ink, alpha) = if a >= 0xFF { (InkEffect::None, 0xFF) } else { (InkEffect::Alpha, a as u8) };
        blit::fill_rectangle(&mut self.frame_buffer, x, y, width, height, pack_rgb565(r, g, b), ink, alpha);
    }

    /// Replace a rectangle of the screen with its grayscale tint.
    pub fn draw_tint_rectangle(&mut self, x: i32, y: i32, width: i32, height: i32) {
        blit::fill_rectangle(&mut self.frame_buffer, x, y, width, height, 0, InkEffect::Tint, 0xFF);
    }

    // Sprites

    fn draw_sprite_ink(
        &mut self,
        sheet_id: usize,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        sprite_x: i32,
        sprite_y: i32,
        flip: Flip,
        ink: InkEffect,
        alpha: u8,
    ) {
        let Some(sheet) = lookup_sheet(&self.sheets, sheet_id) else {
            return;
        };

        let mut target = BlitTarget { frame_buffer: &mut self.frame_buffer, palette: &self.palette };
        blit::draw_sprite_flipped(&mut target, sheet, x, y, width, height, sprite_x, sprite_y, flip, ink, alpha);
    }

    pub fn draw_sprite(
        &mut self,
        sheet_id: usize,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        sprite_x: i32,
        sprite_y: i32,
    ) {
        self.draw_sprite_ink(sheet_id, x, y, width, height, sprite_x, sprite_y, Flip::None, InkEffect::None, 0xFF);
    }

    pub fn draw_sprite_flipped(
        &mut self,
        sheet_id: usize,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        sprite_x: i32,
        sprite_y: i32,
        flip: Flip,
    ) {
        self.draw_sprite_ink(sheet_id, x, y, width, height, sprite_x, sprite_y, flip, InkEffect::None, 0xFF);
    }

    /// Draw a sprite as a 50/50 blend with the screen.
    pub fn draw_blended_sprite(
        &mut self,
        sheet_id: usize,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        sprite_x: i32,
        sprite_y: i32,
    ) {
        self.draw_sprite_ink(sheet_id, x, y, width, height, sprite_x, sprite_y, Flip::None, InkEffect::Blend, 0xFF);
    }

    pub fn draw_alpha_blended_sprite(
        &mut self,
        sheet_id: usize,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        sprite_x: i32,
        sprite_y: i32,
        alpha: u8,
    ) {
        self.draw_sprite_ink(sheet_id, x, y, width, height, sprite_x, sprite_y, Flip::None, InkEffect::Alpha, alpha);
    }

    pub fn draw_additive_blended_sprite(
        &mut self,
        sheet_id: usize,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        sprite_x: i32,
        sprite_y: i32,
        alpha: u8,
    ) {
        self.draw_sprite_ink(sheet_id, x, y, width, height, sprite_x, sprite_y, Flip::None, InkEffect::Add, alpha);
    }

    pub fn draw_subtractive_blended_sprite(
        &mut self,
        sheet_id: usize,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        sprite_x: i32,
        sprite_y: i32,
        alpha: u8,
    ) {
        self.draw_sprite_ink(sheet_id, x, y, width, height, sprite_x, sprite_y, Flip::None, InkEffect::Sub, alpha);
    }

    /// Rotate and scale a sprite about `(params.x, params.y)`.
    pub fn draw_sprite_rotozoom(&mut self, sheet_id: usize, params: &Rotozoom, ink: InkEffect, alpha: u8) {
        let Some(sheet) = lookup_sheet(&self.sheets, sheet_id) else {
            return;
        };

        let mut target = BlitTarget { frame_buffer: &mut self.frame_buffer, palette: &self.palette };
        blit::draw_sprite_rotozoom(&mut target, sheet, params, ink, alpha);
    }

    /// Scale a sprite about `(x, y)`, where `(pivot_x, pivot_y)` is the offset from that point to
    /// the sprite's top-left corner at 1:1 scale.
    pub fn draw_sprite_scaled(
        &mut self,
        sheet_id: usize,
        flip: Flip,
        x: i32,
        y: i32,
        pivot_x: i32,
        pivot_y: i32,
        scale_x: i32,
        scale_y: i32,
        width: i32,
        height: i32,
        sprite_x: i32,
        sprite_y: i32,
    ) {
        let params = Rotozoom {
            sprite_x,
            sprite_y,
            scale_x,
            scale_y,
            flip,
            ..Rotozoom::unscaled(x, y, pivot_x, pivot_y, width, height)
        };
        self.draw_sprite_rotozoom(sheet_id, &params, InkEffect::None, 0xFF);
    }

    /// Rotate a sprite about `(x, y)` by `rotation` 512ths of a turn.
    pub fn draw_sprite_rotated(
        &mut self,
        sheet_id: usize,
        flip: Flip,
        x: i32,
        y: i32,
        pivot_x: i32,
        pivot_y: i32,
        sprite_x: i32,
        sprite_y: i32,
        width: i32,
        height: i32,
        rotation: i32,
    ) {
        let params = Rotozoom {
            sprite_x,
            sprite_y,
            flip,
            rotation,
            ..Rotozoom::unscaled(x, y, pivot_x, pivot_y, width, height)
        };
        self.draw_sprite_rotozoom(sheet_id, &params, InkEffect::None, 0xFF);
    }

    /// Replace the screen under the opaque pixels of a scaled sprite with its grayscale tint.
    pub fn draw_scaled_tint_mask(
        &mut self,
        sheet_id: usize,
        flip: Flip,
        x: i32,
        y: i32,
        pivot_x: i32,
        pivot_y: i32,
        scale_x: i32,
        scale_y: i32,
        width: i32,
        height: i32,
        sprite_x: i32,
        sprite_y: i32,
    ) {
        let params = Rotozoom {
            sprite_x,
            sprite_y,
            scale_x,
            scale_y,
            flip,
            ..Rotozoom::unscaled(x, y, pivot_x, pivot_y, width, height)
        };
        self.draw_sprite_rotozoom(sheet_id, &params, InkEffect::Tint, 0xFF);
    }
}

#[cfg(test)]
mod tests;
