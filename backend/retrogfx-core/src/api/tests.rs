use super::*;
use crate::layer::LayerType;
use crate::scene3d::{Face, FaceFlag, Matrix, Vertex};
use crate::tiles::TILE_LEN;
use retrogfx_common::frontend::FrameSize;
use test_log::test;

const RED: u16 = 0xF800;
const BLUE: u16 = 0x001F;
const GRAY: u16 = 0x8410;

fn config() -> RenderConfig {
    RenderConfig { line_size: 64, screen_height: 48, ..RenderConfig::default() }
}

/// 64x48 renderer cleared to gray, with index 1 gray, index 2 red, and index 3 blue in bank 0.
fn new_state() -> RenderState {
    let mut state = RenderState::new(config()).unwrap();
    state.set_palette_entry_packed(0, 1, 0x80_80_80).unwrap();
    state.set_palette_entry_packed(0, 2, 0xFF_00_00).unwrap();
    state.set_palette_entry_packed(0, 3, 0x00_00_FF).unwrap();
    state.clear_screen(1);
    state
}

fn count_pixels(state: &RenderState, color: u16) -> usize {
    state.frame_buffer().pixels().iter().filter(|&&pixel| pixel == color).count()
}

/// Single-chunk stage where every pixel is index 2 on the given plane.
fn load_solid_stage(state: &mut RenderState, plane: VisualPlane) {
    state.load_tileset(vec![2; TILE_LEN]).unwrap();
    state.set_chunk(0, &[ChunkTile::new(0, Flip::None, plane); CHUNK_LEN]);
    state.set_stage_layer(0, TileLayer::new(LayerType::HScroll, 1, 1).unwrap()).unwrap();
}

#[test]
fn invalid_config_is_rejected() {
    let result = RenderState::new(RenderConfig { line_size: 0, ..config() });
    assert!(matches!(result, Err(RenderStateError::Config(ConfigError::InvalidLineSize(0)))));
}

#[test]
fn draw_slots_are_validated() {
    let mut state = new_state();

    state.set_active_layer(2, Some(8)).unwrap();
    assert_eq!(Some(8), state.active_layer(2));

    assert!(matches!(
        state.set_active_layer(DRAW_SLOT_COUNT, Some(0)),
        Err(RenderStateError::Layer(LayerError::InvalidDrawSlot(4)))
    ));
    assert!(matches!(
        state.set_active_layer(0, Some(STAGE_LAYER_COUNT)),
        Err(RenderStateError::Layer(LayerError::InvalidStageLayer(9)))
    ));

    state.set_active_layer(2, None).unwrap();
    assert_eq!(None, state.active_layer(2));
}

/// Decode a 1x1 layer whose header was rewritten to claim 2x1 chunks, leaving one layout entry.
fn truncated_layout_layer() -> TileLayer {
    let config = bincode::config::standard().with_fixed_int_encoding();
    let layer = TileLayer::new(LayerType::HScroll, 1, 1).unwrap();
    let mut encoded = bincode::encode_to_vec(layer, config).unwrap();
    // layer type (u32), then width (u32), height (u32), width shift (u8)
    encoded[4..8].copy_from_slice(&2_u32.to_le_bytes());
    encoded[12] = 1;
    let (layer, _): (TileLayer, usize) = bincode::decode_from_slice(&encoded, config).unwrap();
    layer
}

#[test]
fn decoded_state_is_validated() {
    let config = bincode::config::standard();
    let state = new_state();
    let encoded = bincode::encode_to_vec(&state, config).unwrap();
    let (restored, _): (RenderState, usize) = bincode::decode_from_slice(&encoded, config).unwrap();
    restored.validate().unwrap();

    let mut state = restored.clone();
    state.stage_layers[3] = truncated_layout_layer();
    assert!(matches!(
        state.validate(),
        Err(RenderStateError::Layer(LayerError::LayoutLength { expected: 2, actual: 1 }))
    ));

    let mut state = restored.clone();
    state.stage_layers.truncate(4);
    assert!(matches!(
        state.validate(),
        Err(RenderStateError::TableLength { expected: STAGE_LAYER_COUNT, actual: 4, .. })
    ));

    let mut state = restored.clone();
    state.active_layers[1] = Some(STAGE_LAYER_COUNT as u8);
    assert!(matches!(
        state.validate(),
        Err(RenderStateError::Layer(LayerError::InvalidStageLayer(9)))
    ));

    let mut state = restored;
    state.frame_buffer = FrameBuffer::new(FrameSize { width: 64, height: 32 });
    assert!(matches!(
        state.validate(),
        Err(RenderStateError::FrameBufferSize { width: 64, height: 48 })
    ));
}

#[test]
fn clear_screen_resolves_each_row_through_its_bank() {
    let mut state = new_state();
    state.set_palette_entry_packed(1, 1, 0xFF_00_00).unwrap();
    state.set_active_palette(1, 10, 20).unwrap();

    state.clear_screen(1);

    for y in 0..48 {
        let expected = if (10..20).contains(&y) { RED } else { GRAY };
        assert_eq!(Some(expected), state.frame_buffer().get(30, y), "row {y}");
    }
}

#[test]
fn tile_layers_draw_only_their_plane() {
    let mut state = new_state();
    load_solid_stage(&mut state, VisualPlane::Low);

    // Slot 3 is at the default mid point and draws high-plane tiles
    state.set_active_layer(3, Some(0)).unwrap();
    state.draw_active_layers();
    assert_eq!(64 * 48, count_pixels(&state, GRAY));

    state.set_active_layer(0, Some(0)).unwrap();
    state.draw_active_layers();
    assert_eq!(64 * 48, count_pixels(&state, RED));
}

#[test]
fn empty_draw_slots_draw_nothing() {
    let mut state = new_state();
    load_solid_stage(&mut state, VisualPlane::Low);

    state.draw_tile_layer(1);

    assert_eq!(64 * 48, count_pixels(&state, GRAY));
}

#[test]
fn floor_layers_resolve_through_draw_slots() {
    let mut state = new_state();
    load_solid_stage(&mut state, VisualPlane::Low);
    let mut floor = TileLayer::new(LayerType::Floor3D, 1, 1).unwrap();
    floor.x_pos = 5 << 16;
    floor.z_pos = 5 << 16;
    state.set_stage_layer(4, floor).unwrap();

    // Neither slot 0 nor slot 4 shows the floor
    state.draw_3d_floor_layer(4);
    state.draw_3d_floor_layer(0);
    state.draw_3d_sky_layer(4);
    assert_eq!(64 * 48, count_pixels(&state, GRAY));

    state.set_active_layer(1, Some(4)).unwrap();
    state.draw_3d_floor_layer(1);

    // Horizon at 48 / 2 + 12
    assert_eq!(12 * 64, count_pixels(&state, RED));
    assert_eq!(Some(GRAY), state.frame_buffer().get(0, 35));
    assert_eq!(Some(RED), state.frame_buffer().get(0, 36));
}

#[test]
fn copy_tile_layer_clips_and_handles_same_layer() {
    let mut state = new_state();
    let mut source = TileLayer::new(LayerType::HScroll, 2, 2).unwrap();
    source.set_layout(vec![1, 2, 3, 4]).unwrap();
    state.set_stage_layer(1, source).unwrap();
    state.set_stage_layer(2, TileLayer::new(LayerType::HScroll, 2, 2).unwrap()).unwrap();

    state.copy_tile_layer(2, 0, 1, 1, 1, 0, 1, 2).unwrap();
    let copied = state.stage_layer(2).unwrap();
    assert_eq!(Some(2), copied.chunk_at(0, 1));
    assert_eq!(Some(0), copied.chunk_at(0, 0));

    state.copy_tile_layer(1, 1, 1, 1, 0, 0, 1, 1).unwrap();
    assert_eq!(Some(1), state.stage_layer(1).unwrap().chunk_at(1, 1));

    assert!(state.copy_tile_layer(STAGE_LAYER_COUNT, 0, 0, 1, 0, 0, 1, 1).is_err());
}

#[test]
fn rectangles_honor_alpha() {
    let mut state = new_state();

    state.draw_rectangle(4, 4, 8, 8, 255, 0, 0, 0);
    assert_eq!(64 * 48, count_pixels(&state, GRAY));

    state.draw_rectangle(4, 4, 8, 8, 255, 0, 0, 300);
    assert_eq!(64, count_pixels(&state, RED));
    assert_eq!(Some(RED), state.frame_buffer().get(11, 11));
    assert_eq!(Some(GRAY), state.frame_buffer().get(12, 11));

    state.draw_rectangle(-4, -4, 8, 8, 0, 0, 255, 128);
    let blended = state.frame_buffer().get(0, 0).unwrap();
    assert_ne!(GRAY, blended);
    assert_ne!(BLUE, blended);
    assert_eq!(Some(GRAY), state.frame_buffer().get(4, 0));
}

#[test]
fn sprites_skip_unloaded_sheets() {
    let mut state = new_state();
    state.register_sheet(2, SpriteSheet::new(4, 4, 2, vec![3; 16]).unwrap()).unwrap();

    state.draw_sprite(7, 5, 6, 4, 4, 0, 0);
    state.draw_sprite(MAX_SHEETS + 1, 5, 6, 4, 4, 0, 0);
    assert_eq!(64 * 48, count_pixels(&state, GRAY));

    state.draw_sprite(2, 5, 6, 4, 4, 0, 0);
    assert_eq!(16, count_pixels(&state, BLUE));
    assert_eq!(Some(BLUE), state.frame_buffer().get(8, 9));

    assert!(matches!(
        state.register_sheet(MAX_SHEETS, SpriteSheet::new(4, 4, 2, vec![3; 16]).unwrap()),
        Err(RenderStateError::Sheet(SheetError::SlotOutOfRange(24)))
    ));
}

#[test]
fn zero_alpha_sprites_are_invisible() {
    let mut state = new_state();
    state.register_sheet(0, SpriteSheet::new(4, 4, 2, vec![3; 16]).unwrap()).unwrap();

    state.draw_alpha_blended_sprite(0, 5, 6, 4, 4, 0, 0, 0);
    state.draw_additive_blended_sprite(0, 5, 6, 4, 4, 0, 0, 0);

    assert_eq!(64 * 48, count_pixels(&state, GRAY));
}

#[test]
fn scene_draws_after_transform_and_sort() {
    let mut state = new_state();
    let scene = state.scene_mut();
    let corners = [(10, 10), (20, 10), (20, 20), (10, 20)];
    let indices = corners.map(|(x, y)| scene.push_vertex(Vertex::new(x, y, 0, 0, 0)).unwrap());
    scene.push_face(Face::new(indices, 0x7FFF_0000, FaceFlag::Colored2D)).unwrap();
    scene.world = Matrix::translation(5 << 8, 0, 0);

    state.draw_3d_scene(0);

    assert_eq!(100, count_pixels(&state, RED));
    assert_eq!(Some(RED), state.frame_buffer().get(15, 10));
    assert_eq!(Some(GRAY), state.frame_buffer().get(10, 10));
    assert_eq!(1, state.scene().draw_list().len());

    state.clear_scene();
    assert!(state.scene().faces().is_empty());
    assert_eq!(Matrix::translation(5 << 8, 0, 0), state.scene().world);
}

#[test]
fn save_state_round_trip() {
    let mut state = new_state();
    load_solid_stage(&mut state, VisualPlane::High);
    state.set_active_layer(3, Some(0)).unwrap();
    state.set_scroll(17, -3);
    state.set_fog(0x20_40_60, 0x80);

    let config = bincode::config::standard();
    let bytes = bincode::encode_to_vec(&state, config).unwrap();
    let (mut restored, _): (RenderState, _) = bincode::decode_from_slice(&bytes, config).unwrap();

    assert_eq!(state.frame_buffer().pixels(), restored.frame_buffer().pixels());
    assert_eq!(Some(0), restored.active_layer(3));
    assert_eq!(state.scroll(), restored.scroll());
    assert_eq!(0x20_40_60, restored.scene().fog_color);

    state.draw_active_layers();
    restored.draw_active_layers();
    assert_eq!(state.frame_buffer().pixels(), restored.frame_buffer().pixels());
    assert_eq!(64 * 48, count_pixels(&restored, RED));
}
