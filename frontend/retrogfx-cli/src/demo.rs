//! Procedurally generated demo stage
//!
//! Sky background with two parallax bands, a rotating perspective floor, a brick foreground strip
//! below a rippling water line, and a small 3D scene of billboards, fogged floor tiles, and
//! translucent panels.

use retrogfx_core::blit::Rotozoom;
use retrogfx_core::deform::{DeformationTarget, WaveType};
use retrogfx_core::layer::{LayerType, ScrollInfo, TileLayer};
use retrogfx_core::scene3d::{Face, FaceFlag, Matrix, Vertex};
use retrogfx_core::sheet::{SpriteFrame, SpriteScript, SpriteSheet};
use retrogfx_core::tiles::{CHUNK_LEN, CHUNK_TILES, ChunkTile, Flip, TILE_LEN, TILE_SIZE, VisualPlane};
use retrogfx_core::trig;
use retrogfx_core::{InkEffect, RenderResult, RenderState};

const FOREGROUND_LAYER: usize = 0;
const BACKGROUND_LAYER: usize = 1;
const FLOOR_LAYER: usize = 2;

const FLOOR_SLOT: usize = 2;

const SKY_COLORS: u8 = 1;
const GROUND_COLORS: u8 = 16;
const FLOOR_COLORS: u8 = 32;
const SPRITE_COLORS: u8 = 48;
const TEXTURE_COLORS: u8 = 64;

const WATER_BANK: usize = 1;
const WATER_TINT_BANK: usize = 2;

const SHEET_WIDTH_SHIFT: u8 = 6;
const SHEET_WIDTH: u32 = 1 << SHEET_WIDTH_SHIFT;
const SHEET_HEIGHT: u32 = 32;

// Camera distance from the scene origin; far enough that distant floor tiles pass the fog threshold
const CAMERA_DISTANCE: i32 = 0x6000;
const BILLBOARD_RADIUS: i32 = 0x3000;
const BILLBOARD_COUNT: i32 = 6;

fn gradient(from: (u8, u8, u8), to: (u8, u8, u8), i: u8, steps: u8) -> u32 {
    let lerp = |a: u8, b: u8| {
        let (a, b) = (i32::from(a), i32::from(b));
        (a + (b - a) * i32::from(i) / i32::from(steps.max(1))) as u32
    };
    (lerp(from.0, to.0) << 16) | (lerp(from.1, to.1) << 8) | lerp(from.2, to.2)
}

fn load_palettes(state: &mut RenderState) -> RenderResult<()> {
    for i in 0..15 {
        state.set_palette_entry_packed(0, SKY_COLORS + i, gradient((40, 90, 200), (170, 210, 250), i, 14))?;
    }
    for i in 0..16 {
        state.set_palette_entry_packed(0, GROUND_COLORS + i, gradient((70, 40, 20), (180, 120, 60), i, 15))?;
        state.set_palette_entry_packed(0, FLOOR_COLORS + i, gradient((20, 80, 30), (110, 200, 90), i, 15))?;
        state.set_palette_entry_packed(0, SPRITE_COLORS + i, gradient((120, 0, 0), (255, 230, 80), i, 15))?;
        state.set_palette_entry_packed(0, TEXTURE_COLORS + i, gradient((60, 0, 90), (240, 160, 255), i, 15))?;
    }

    for i in 0..=255 {
        state.set_palette_entry_packed(WATER_TINT_BANK, i, 0x10_30_80)?;
    }

    Ok(())
}

/// Indexed pixel of one of the demo's 16x16 tiles.
fn tile_pixel(tile: usize, x: usize, y: usize) -> u8 {
    match tile {
        // Sky: diagonal bands
        1 => SKY_COLORS + ((x + 2 * y) / 3 % 15) as u8,
        // Bricks with mortar lines, rows offset by half a brick
        2 => {
            let brick_x = if (y / 4) % 2 == 0 { x } else { (x + 4) % TILE_SIZE };
            if y % 4 == 3 || brick_x % 8 == 7 {
                GROUND_COLORS
            } else {
                GROUND_COLORS + 4 + ((x / 8 + y / 4) % 4) as u8 * 3
            }
        }
        // Grass over transparent sky
        3 => {
            if y < 4 + (x * 7 % 5) / 2 { 0 } else { FLOOR_COLORS + 8 + ((x + y) % 5) as u8 }
        }
        // Floor checker halves
        4 | 5 => {
            let base = if tile == 4 { 2 } else { 10 };
            let border = x == 0 || y == 0;
            FLOOR_COLORS + base + if border { 4 } else { ((x ^ y) & 1) as u8 }
        }
        _ => 0,
    }
}

fn load_tiles(state: &mut RenderState) -> RenderResult<()> {
    const TILE_COUNT: usize = 6;

    let mut pixels = vec![0; TILE_COUNT * TILE_LEN];
    for tile in 0..TILE_COUNT {
        for y in 0..TILE_SIZE {
            for x in 0..TILE_SIZE {
                pixels[tile * TILE_LEN + y * TILE_SIZE + x] = tile_pixel(tile, x, y);
            }
        }
    }
    state.load_tileset(pixels)?;

    let chunk = |tile_at: &dyn Fn(usize, usize) -> ChunkTile| {
        let mut tiles = [ChunkTile::default(); CHUNK_LEN];
        for (i, tile) in tiles.iter_mut().enumerate() {
            *tile = tile_at(i % CHUNK_TILES, i / CHUNK_TILES);
        }
        tiles
    };

    state.set_chunk(0, &chunk(&|_, _| ChunkTile::new(0, Flip::None, VisualPlane::Low)));
    state.set_chunk(
        1,
        &chunk(&|x, y| ChunkTile::new(1, if (x + y) % 2 == 0 { Flip::None } else { Flip::X }, VisualPlane::Low)),
    );
    // Grass draws with the high group so that it covers the feet of the billboards
    state.set_chunk(
        2,
        &chunk(&|_, y| match y {
            0..=5 => ChunkTile::new(0, Flip::None, VisualPlane::Low),
            6 => ChunkTile::new(3, Flip::None, VisualPlane::High),
            _ => ChunkTile::new(2, Flip::None, VisualPlane::Low),
        }),
    );
    state.set_chunk(
        3,
        &chunk(&|x, y| ChunkTile::new(if (x + y) % 2 == 0 { 4 } else { 5 }, Flip::None, VisualPlane::Low)),
    );

    Ok(())
}

fn load_layers(state: &mut RenderState) -> RenderResult<()> {
    // Bottom chunk row holds the ground strip; the top row is empty
    let mut foreground = TileLayer::new(LayerType::HScroll, 4, 2)?;
    foreground.set_layout(vec![0, 0, 0, 0, 2, 2, 2, 2])?;
    state.set_stage_layer(FOREGROUND_LAYER, foreground)?;

    // Upper half drifts slowly, lower half scrolls faster and ripples
    let mut background = TileLayer::new(LayerType::HScroll, 2, 2)?;
    background.set_layout(vec![1; 4])?;
    background.scroll_info = vec![ScrollInfo::new(0x40, 0x4000, false), ScrollInfo::new(0x80, 0, true)];
    background.line_scroll[128..].fill(1);
    background.parallax_factor = 0x80;
    state.set_stage_layer(BACKGROUND_LAYER, background)?;

    let mut floor = TileLayer::new(LayerType::Floor3D, 8, 8)?;
    floor.set_layout(vec![3; 64])?;
    floor.y_pos = 0x20_0000;
    floor.x_pos = 0x200 << 16;
    floor.z_pos = 0x200 << 16;
    state.set_stage_layer(FLOOR_LAYER, floor)?;

    state.set_active_layer(0, Some(BACKGROUND_LAYER))?;
    state.set_active_layer(1, Some(FOREGROUND_LAYER))?;
    state.set_active_layer(FLOOR_SLOT, Some(FLOOR_LAYER))?;
    state.set_active_layer(3, Some(FOREGROUND_LAYER))?;

    Ok(())
}

/// 32x32 ball at the left of the sheet, 32x32 texture at the right.
fn load_sprites(state: &mut RenderState) -> RenderResult<()> {
    let mut pixels = vec![0; (SHEET_WIDTH * SHEET_HEIGHT) as usize];
    for y in 0..SHEET_HEIGHT as i32 {
        for x in 0..SHEET_WIDTH as i32 {
            let index = if x < 32 {
                let (dx, dy) = (x - 16, y - 16);
                let distance_sq = dx * dx + dy * dy;
                if distance_sq >= 15 * 15 { 0 } else { SPRITE_COLORS + 15 - (distance_sq / 15).min(15) as u8 }
            } else {
                let (u, v) = (x - 32, y);
                TEXTURE_COLORS + (((u / 8 + v / 8) % 2) * 8 + (u + v) % 8) as u8
            };
            pixels[(y as u32 * SHEET_WIDTH + x as u32) as usize] = index;
        }
    }

    state.register_sheet(0, SpriteSheet::new(SHEET_WIDTH, SHEET_HEIGHT, SHEET_WIDTH_SHIFT, pixels)?)?;
    state.set_sprite_frames(vec![
        SpriteFrame { sprite_x: 0, sprite_y: 0, width: 32, height: 32, pivot_x: -16, pivot_y: -16 },
        SpriteFrame { sprite_x: 8, sprite_y: 8, width: 16, height: 16, pivot_x: -8, pivot_y: -8 },
    ]);
    state.set_sprite_scripts(vec![SpriteScript { sheet_id: 0, frame_list_offset: 0 }]);

    Ok(())
}

/// Load palettes, tiles, layers, and sprites for the demo stage.
///
/// # Errors
///
/// Propagates any rejected stage data.
pub fn build_stage(state: &mut RenderState) -> RenderResult<()> {
    load_palettes(state)?;
    load_tiles(state)?;
    load_layers(state)?;
    load_sprites(state)?;

    let height = state.config().screen_height as i32;
    let water_line = height * 3 / 4;
    state.set_water_line(water_line);
    state.set_active_palette(WATER_BANK, water_line as u32, height as u32)?;
    state.set_layer_deformation(DeformationTarget::BackgroundWater, 128, 6, WaveType::Full, 0, 0);
    state.set_layer_deformation(DeformationTarget::ForegroundWater, 64, 3, WaveType::Full, 0, 0);
    state.set_fog(0x80_90_A0, 0xC0);

    log::info!("Built demo stage, water line at row {water_line}");

    Ok(())
}

fn push_quad(state: &mut RenderState, corners: [Vertex; 4], color: u32, flag: FaceFlag) -> RenderResult<()> {
    let scene = state.scene_mut();
    let mut indices = [0; 4];
    for (index, vertex) in indices.iter_mut().zip(corners) {
        *index = scene.push_vertex(vertex)?;
    }
    scene.push_face(Face::new(indices, color, flag))?;
    Ok(())
}

fn build_scene(state: &mut RenderState, frame: u32) -> RenderResult<()> {
    let angle = (frame * 2) as i32;

    state.clear_scene();
    let scene = state.scene_mut();
    scene.world = Matrix::IDENTITY;
    scene.view = Matrix::rotation_y(angle).then(&Matrix::translation(0, 0, CAMERA_DISTANCE << 8));

    // Fogged floor tiles
    let tile = 0x2000;
    for z in -2..2 {
        for x in -2..2 {
            let (x0, z0) = (x * tile, z * tile);
            let corner = |dx: i32, dz: i32| Vertex::new(x0 + dx, -0x1000, z0 + dz, 0, 0);
            let color = if (x + z) % 2 == 0 { 0x30_60_30 } else { 0x50_80_40 };
            push_quad(state, [corner(0, tile), corner(tile, tile), corner(tile, 0), corner(0, 0)], color, FaceFlag::Faded)?;
        }
    }

    // Ring of ball billboards alternating between plain scaling and rotozoom
    for i in 0..BILLBOARD_COUNT {
        let ring_angle = i * 512 / BILLBOARD_COUNT;
        let x = (BILLBOARD_RADIUS * trig::cos512(ring_angle)) >> 9;
        let z = (BILLBOARD_RADIUS * trig::sin512(ring_angle)) >> 9;
        let effect = if i % 2 == 0 { 0 } else { 2 };
        let scale = 0x180 + 0x40 * (i % 3);
        let corners = [
            Vertex::new(x, -0x800, z, 0, effect),
            Vertex::new(0, 0, 0, i % 2, i & 1),
            Vertex::new(0, 0, 0, scale, angle * 3),
            Vertex::new(x, -0x800, z, 0, 0),
        ];
        push_quad(state, corners, 0, FaceFlag::Sprite3D)?;
    }

    // Glowing textured panel above the center
    let center = Vertex::new(0, 0x1400, 0, 48, 16);
    let corners = [center, Vertex::new(0, 0, 0, 0x800, 0x800), Vertex::new(0, 0, 0, 15, 15), center];
    push_quad(state, corners, 0, FaceFlag::TexturedCBlend)?;

    // Translucent red pane
    let pane = |x: i32, y: i32| Vertex::new(x, y, -0x2800, 0, 0);
    push_quad(
        state,
        [pane(-0xC00, 0x600), pane(0xC00, 0x600), pane(0xC00, -0x600), pane(-0xC00, -0x600)],
        0x30_FF_40_40,
        FaceFlag::Colored3D,
    )?;

    Ok(())
}

/// Advance the demo by one frame and draw it.
///
/// # Errors
///
/// Propagates scene buffer overflows and rejected palette banks.
pub fn render_frame(state: &mut RenderState, frame: u32, overlay_ink: InkEffect) -> RenderResult<()> {
    let width = state.config().line_size as i32;
    let height = state.config().screen_height as i32;

    if frame % 4 == 0 {
        state.rotate_palette(0, SKY_COLORS, SKY_COLORS + 14, true)?;
    }
    state.set_palette_fade(WATER_BANK, 0, WATER_TINT_BANK, 0x60, 0, 255)?;

    // Foreground is 256 pixels tall; keep the ground strip at the bottom of the screen
    state.set_scroll((frame * 3) as i32, 256 - height);

    if let Some(floor) = state.stage_layer_mut(FLOOR_LAYER) {
        floor.angle = (frame as i32) & 0x1FF;
        floor.z_pos = floor.z_pos.wrapping_add(0x2_0000);
    }
    if let Some(background) = state.stage_layer_mut(BACKGROUND_LAYER) {
        background.deformation_offset_water = frame as i32;
    }

    state.clear_screen(SKY_COLORS);
    state.draw_tile_layer(0);
    state.draw_3d_floor_layer(FLOOR_SLOT);
    state.draw_tile_layer(1);

    build_scene(state, frame)?;
    state.draw_3d_scene(0);

    state.draw_tile_layer(3);

    // Overlays: status bar, mirrored icon, spinning ball, greyscale inset
    state.draw_rectangle(0, 0, width, 14, 0, 0, 0, 0x80);
    state.draw_sprite_flipped(0, 4, 1, 12, 12, 10, 10, Flip::X);
    state.draw_blended_sprite(0, 20, 1, 12, 12, 10, 10);
    let params = Rotozoom {
        rotation: (frame * 5) as i32,
        scale_x: 0x200 + (trig::sin512((frame * 8) as i32) >> 2),
        scale_y: 0x200,
        ..Rotozoom::unscaled(width - 28, 40, -16, -16, 32, 32)
    };
    state.draw_sprite_rotozoom(0, &params, overlay_ink, 0xC0);
    state.draw_tint_rectangle(width - 56, height - 40, 48, 32);

    Ok(())
}
