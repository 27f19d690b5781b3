use super::*;
use crate::blit::draw_sprite_flipped;
use crate::ink;
use crate::tiles::Flip;
use retrogfx_common::frontend::FrameSize;
use test_log::test;

const SCREEN: FrameSize = FrameSize { width: 64, height: 48 };
const BACKGROUND: u16 = 0xFFFF;
const OPAQUE_RED: u32 = 0x7FFF_0000;
const OPAQUE_BLUE: u32 = 0x7F00_00FF;

const PROJECTION: Projection =
    Projection { center_x: 32, center_y: 24, projection_x: 64, projection_y: 64 };

struct Fixture {
    frame_buffer: FrameBuffer,
    palette: PaletteBanks,
    sheets: Vec<Option<SpriteSheet>>,
    frames: Vec<SpriteFrame>,
    scripts: Vec<SpriteScript>,
    scene: Scene3D,
}

impl Fixture {
    fn new(texture: SpriteSheet) -> Self {
        let mut palette = PaletteBanks::new(SCREEN.height);
        let bank: Vec<u16> = (0..256).map(|i| 0x1000 + i).collect();
        palette.load_bank(0, &bank).unwrap();

        let mut frame_buffer = FrameBuffer::new(SCREEN);
        frame_buffer.fill(BACKGROUND);

        Self {
            frame_buffer,
            palette,
            sheets: vec![Some(texture)],
            frames: Vec::new(),
            scripts: Vec::new(),
            scene: Scene3D::new(),
        }
    }

    fn with_solid_texture() -> Self {
        Self::new(SpriteSheet::new(16, 16, 4, vec![5; 256]).unwrap())
    }

    fn quad(&mut self, corners: [(i32, i32, i32, i32, i32); 4], color: u32, flag: FaceFlag) -> u16 {
        let indices = corners.map(|(x, y, z, u, v)| self.scene.push_vertex(Vertex::new(x, y, z, u, v)).unwrap());
        self.scene.push_face(Face::new(indices, color, flag)).unwrap()
    }

    fn render(&mut self) {
        self.scene.transform();
        self.scene.sort();

        let mut ctx = SceneContext {
            frame_buffer: &mut self.frame_buffer,
            palette: &self.palette,
            sheets: &self.sheets,
            frames: &self.frames,
            scripts: &self.scripts,
            projection: PROJECTION,
            fog_threshold: 0x8000,
        };
        draw_scene(&mut ctx, &self.scene, 0);
    }

    fn untouched(&self) -> bool {
        self.frame_buffer.pixels().iter().all(|&pixel| pixel == BACKGROUND)
    }

    fn filled_region(&self, color: u16) -> Vec<(i32, i32)> {
        let mut pixels = Vec::new();
        for y in 0..SCREEN.height as i32 {
            for x in 0..SCREEN.width as i32 {
                if self.frame_buffer.get(x, y) == Some(color) {
                    pixels.push((x, y));
                }
            }
        }
        pixels
    }
}

fn rect(left: i32, top: i32, right: i32, bottom: i32) -> Vec<(i32, i32)> {
    (top..bottom).flat_map(|y| (left..right).map(move |x| (x, y))).collect()
}

#[test]
fn flat_textured_quad_fills_exact_rows_and_columns() {
    let mut fixture = Fixture::with_solid_texture();
    fixture.quad(
        [(10, 10, 0, 0, 0), (20, 10, 0, 16, 0), (20, 20, 0, 16, 16), (10, 20, 0, 0, 16)],
        0,
        FaceFlag::Textured2D,
    );

    fixture.render();

    assert_eq!(rect(10, 10, 20, 20), fixture.filled_region(0x1005));
    assert_eq!(100, fixture.frame_buffer.pixels().iter().filter(|&&pixel| pixel != BACKGROUND).count());
}

#[test]
fn texture_coordinates_interpolate_across_the_quad() {
    let pixels = (0..256).map(|i| if (i % 16 + i / 16) % 2 == 0 { 0 } else { 3 }).collect();
    let mut fixture = Fixture::new(SpriteSheet::new(16, 16, 4, pixels).unwrap());
    fixture.quad(
        [(0, 0, 0, 0, 0), (16, 0, 0, 16, 0), (16, 16, 0, 16, 16), (0, 16, 0, 0, 16)],
        0,
        FaceFlag::Textured2D,
    );

    fixture.render();

    // Transparent texels leave the background untouched
    for y in 0..16 {
        for x in 0..16 {
            let expected = if (x + y) % 2 == 0 { BACKGROUND } else { 0x1003 };
            assert_eq!(Some(expected), fixture.frame_buffer.get(x, y), "pixel ({x}, {y})");
        }
    }
}

#[test]
fn faces_behind_the_camera_are_not_drawn() {
    let mut fixture = Fixture::with_solid_texture();
    let corners = |z: i32| [(-8, 8, z, 0, 0), (8, 8, z, 16, 0), (8, -8, z, 16, 16), (-8, -8, z, 0, 16)];

    fixture.quad(corners(0), 0, FaceFlag::Textured3D);
    fixture.quad(corners(-10), OPAQUE_RED, FaceFlag::Colored3D);
    fixture.quad(corners(0), OPAQUE_RED, FaceFlag::Faded);
    fixture.quad(
        [(10, 10, -1, 0, 0), (20, 10, -1, 16, 0), (20, 20, -1, 16, 16), (10, 20, -1, 0, 16)],
        OPAQUE_RED,
        FaceFlag::Colored2D,
    );
    fixture.quad(corners(-5), 0, FaceFlag::TexturedC);

    fixture.render();

    assert!(fixture.untouched());
}

#[test]
fn perspective_projection() {
    let mut fixture = Fixture::with_solid_texture();
    fixture.quad(
        [(-8, 8, 64, 0, 0), (8, 8, 64, 0, 0), (8, -8, 64, 0, 0), (-8, -8, 64, 0, 0)],
        OPAQUE_RED,
        FaceFlag::Colored3D,
    );

    fixture.render();

    assert_eq!(rect(24, 16, 40, 32), fixture.filled_region(0xF800));
}

#[test]
fn sort_orders_deepest_first_and_keeps_ties_stable() {
    let mut scene = Scene3D::new();
    let depths = [10, 300, 10, -20, 300];
    for (i, &z) in depths.iter().enumerate() {
        let base = scene.push_vertex(Vertex::new(0, 0, z, 0, 0)).unwrap();
        assert_eq!(i as u16, base);
        scene.push_face(Face::new([base; 4], 0, FaceFlag::Colored2D)).unwrap();
    }

    scene.transform();
    scene.sort();

    let order: Vec<(u16, i32)> = scene.draw_list().iter().map(|entry| (entry.face_id, entry.depth)).collect();
    assert_eq!(vec![(1, 300), (4, 300), (0, 10), (2, 10), (3, -20)], order);
}

#[test]
fn nearer_faces_are_painted_over_deeper_ones() {
    let mut fixture = Fixture::with_solid_texture();
    let square = |left: i32, z: i32| {
        [(left, 0, z, 0, 0), (left + 20, 0, z, 0, 0), (left + 20, 20, z, 0, 0), (left, 20, z, 0, 0)]
    };

    // Pushed nearest first so that buffer order alone would get it wrong
    fixture.quad(square(10, 5), OPAQUE_BLUE, FaceFlag::Colored2D);
    fixture.quad(square(0, 50), OPAQUE_RED, FaceFlag::Colored2D);

    fixture.render();

    assert_eq!(Some(0xF800), fixture.frame_buffer.get(5, 5));
    assert_eq!(Some(0x001F), fixture.frame_buffer.get(15, 5));
    assert_eq!(Some(0x001F), fixture.frame_buffer.get(25, 5));
}

#[test]
fn colored_faces_use_seven_bit_alpha() {
    let mut fixture = Fixture::with_solid_texture();
    fixture.frame_buffer.fill(0);
    let square = [(0, 0, 0, 0, 0), (10, 0, 0, 0, 0), (10, 10, 0, 0, 0), (0, 10, 0, 0, 0)];
    fixture.quad(square, 0x40FF_FFFF, FaceFlag::Colored2D);

    fixture.render();

    let expected = ink::composite(InkEffect::Alpha, 0xFFFF, 0, 0x81);
    assert_eq!(Some(expected), fixture.frame_buffer.get(3, 3));

    // Fully transparent faces draw nothing
    let mut fixture = Fixture::with_solid_texture();
    fixture.quad(square, 0x00FF_FFFF, FaceFlag::Colored2D);
    fixture.render();
    assert!(fixture.untouched());
}

#[test]
fn faded_faces_blend_toward_fog_with_depth() {
    let mut fixture = Fixture::with_solid_texture();
    fixture.scene.fog_color = 0x0000FF;
    fixture.scene.fog_strength = 0xFF;

    // Depth 0xC000 is 0x40 past the fog threshold
    let z = 0xC000;
    let half = z / 8;
    fixture.quad(
        [(-half, half, z, 0, 0), (half, half, z, 0, 0), (half, -half, z, 0, 0), (-half, -half, z, 0, 0)],
        OPAQUE_RED,
        FaceFlag::Faded,
    );

    fixture.render();

    let expected = ink::composite(InkEffect::Alpha, 0x001F, 0xF800, 0x40);
    assert_eq!(Some(expected), fixture.frame_buffer.get(32, 24));
    assert_eq!(Some(BACKGROUND), fixture.frame_buffer.get(40, 24));

    // Fog strength caps the fog alpha
    let mut capped = Fixture::with_solid_texture();
    capped.scene = fixture.scene.clone();
    capped.scene.fog_strength = 0x10;
    capped.render();
    let expected = ink::composite(InkEffect::Alpha, 0x001F, 0xF800, 0x10);
    assert_eq!(Some(expected), capped.frame_buffer.get(32, 24));
}

#[test]
fn faded_faces_keep_the_face_alpha() {
    let z = 0xC000;
    let half = z / 8;
    let square = [(-half, half, z, 0, 0), (half, half, z, 0, 0), (half, -half, z, 0, 0), (-half, -half, z, 0, 0)];

    let mut fixture = Fixture::with_solid_texture();
    fixture.scene.fog_strength = 0;
    fixture.quad(square, 0x40FF_0000, FaceFlag::Faded);
    fixture.render();

    let expected = ink::composite(InkEffect::Alpha, 0xF800, BACKGROUND, 0x81);
    assert_eq!(Some(expected), fixture.frame_buffer.get(32, 24));

    let mut fixture = Fixture::with_solid_texture();
    fixture.scene.fog_strength = 0;
    fixture.quad(square, 0x00FF_0000, FaceFlag::Faded);
    fixture.render();
    assert!(fixture.untouched());
}

#[test]
fn centered_billboard_is_axis_aligned_around_anchor() {
    let pixels = (0..256).map(|i| (i % 16 + 1) as u8).collect();
    let mut fixture = Fixture::new(SpriteSheet::new(16, 16, 4, pixels).unwrap());

    // Anchor at the screen center; 4 camera units either side at z = 64 project to 4 pixels
    fixture.quad(
        [(0, 0, 64, 8, 8), (0, 0, 0, 4, 4), (0, 0, 0, 4, 4), (0, 0, 0, 0, 0)],
        0,
        FaceFlag::TexturedC,
    );

    fixture.render();

    let drawn: Vec<(i32, i32)> =
        rect(0, 0, 64, 48).into_iter().filter(|&(x, y)| fixture.frame_buffer.get(x, y) != Some(BACKGROUND)).collect();
    assert_eq!(rect(28, 20, 36, 28), drawn);

    // The left edge samples the left of the texture window
    assert_eq!(Some(0x1000 + 4 + 1), fixture.frame_buffer.get(28, 24));
}

#[test]
fn blended_billboard_averages_with_the_background() {
    let mut fixture = Fixture::with_solid_texture();
    fixture.frame_buffer.fill(0);
    fixture.quad(
        [(0, 0, 64, 8, 8), (0, 0, 0, 4, 4), (0, 0, 0, 4, 4), (0, 0, 0, 0, 0)],
        0,
        FaceFlag::TexturedCBlend,
    );

    fixture.render();

    assert_eq!(Some(ink::blend(0x1005, 0)), fixture.frame_buffer.get(32, 24));
}

#[test]
fn sprite_billboard_matches_flipped_blit_at_unit_scale() {
    let pixels = (0..256).map(|i| if i % 5 == 0 { 0 } else { (i % 200) as u8 }).collect();
    let sheet = SpriteSheet::new(16, 16, 4, pixels).unwrap();

    let mut fixture = Fixture::with_solid_texture();
    fixture.sheets.push(Some(sheet.clone()));
    fixture.frames = vec![
        SpriteFrame::default(),
        SpriteFrame { sprite_x: 2, sprite_y: 3, width: 6, height: 5, pivot_x: -3, pivot_y: -2 },
    ];
    fixture.scripts = vec![SpriteScript { sheet_id: 1, frame_list_offset: 1 }];

    // Script 0, scale effect, frame 0 of the script, horizontal flip, scale 1.0
    fixture.quad(
        [(0, 0, 64, 0, 0), (0, 0, 64, 0, 1), (0, 0, 64, SCALE_ONE, 0), (0, 0, 64, 0, 0)],
        0,
        FaceFlag::Sprite3D,
    );

    fixture.render();

    let mut expected = FrameBuffer::new(SCREEN);
    expected.fill(BACKGROUND);
    let mut target = BlitTarget { frame_buffer: &mut expected, palette: &fixture.palette };
    draw_sprite_flipped(&mut target, &sheet, 32 - 3, 24 - 2, 6, 5, 2, 3, Flip::X, InkEffect::None, 0xFF);

    assert_eq!(expected.pixels(), fixture.frame_buffer.pixels());
    assert!(!fixture.untouched());
}

#[test]
fn invalid_references_skip_the_face() {
    let mut fixture = Fixture::with_solid_texture();
    fixture.scripts = vec![
        SpriteScript { sheet_id: 7, frame_list_offset: 0 },
        SpriteScript { sheet_id: 0, frame_list_offset: 0 },
    ];
    fixture.frames = vec![SpriteFrame { sprite_x: 0, sprite_y: 0, width: 4, height: 4, pivot_x: 0, pivot_y: 0 }];

    // Vertex index past the buffer
    let vertex = fixture.scene.push_vertex(Vertex::new(10, 10, 0, 0, 0)).unwrap();
    fixture.scene.push_face(Face::new([vertex, vertex, vertex, 99], OPAQUE_RED, FaceFlag::Colored2D)).unwrap();

    // Unknown script, unloaded sheet, unknown frame, unknown effect
    for (script, frame, effect) in [(3, 0, 0), (0, 0, 0), (1, 5, 0), (1, 0, 9)] {
        fixture.quad(
            [(0, 0, 64, script, effect), (0, 0, 64, frame, 0), (0, 0, 64, SCALE_ONE, 0), (0, 0, 64, 0, 0)],
            0,
            FaceFlag::Sprite3D,
        );
    }

    fixture.render();
    assert!(fixture.untouched());

    // The same billboard with valid references draws
    fixture.quad(
        [(0, 0, 64, 1, 0), (0, 0, 64, 0, 0), (0, 0, 64, SCALE_ONE, 0), (0, 0, 64, 0, 0)],
        0,
        FaceFlag::Sprite3D,
    );
    fixture.render();
    assert_eq!(rect(32, 24, 36, 28), fixture.filled_region(0x1005));
}

#[test]
fn concave_quads_fill_between_outermost_edges() {
    let mut fixture = Fixture::with_solid_texture();
    // Dart with its notch at (8, 10)
    fixture.quad(
        [(0, 0, 0, 0, 0), (20, 10, 0, 0, 0), (0, 20, 0, 0, 0), (8, 10, 0, 0, 0)],
        OPAQUE_RED,
        FaceFlag::Colored2D,
    );

    fixture.render();

    // Min/max scan conversion covers the notch as well
    assert_eq!(Some(0xF800), fixture.frame_buffer.get(4, 10));
    assert_eq!(Some(0xF800), fixture.frame_buffer.get(19, 10));
    assert_eq!(Some(BACKGROUND), fixture.frame_buffer.get(20, 10));
}

#[test]
fn buffers_have_fixed_capacity() {
    let mut scene = Scene3D::new();
    for _ in 0..MAX_VERTICES {
        scene.push_vertex(Vertex::default()).unwrap();
    }
    assert_eq!(Err(SceneError::VertexBufferFull), scene.push_vertex(Vertex::default()));

    for _ in 0..MAX_FACES {
        scene.push_face(Face::default()).unwrap();
    }
    assert_eq!(Err(SceneError::FaceBufferFull), scene.push_face(Face::default()));

    scene.clear();
    assert_eq!(Ok(0), scene.push_vertex(Vertex::default()));
    assert!(scene.faces().is_empty());
}

#[test]
fn transform_uses_world_then_view() {
    let mut scene = Scene3D::new();
    scene.push_vertex(Vertex::new(10, 0, 0, 3, 4)).unwrap();
    scene.world = Matrix::rotation_z(128);
    scene.view = Matrix::translation(0, 0, 100 << 8);

    scene.transform();

    assert_eq!(Vertex::new(0, 10, 100, 3, 4), scene.transformed()[0]);
    assert_eq!(Vertex::new(10, 0, 0, 3, 4), scene.vertices()[0]);
}

#[test]
fn transform_vertices_rewrites_a_range_in_place() {
    let mut scene = Scene3D::new();
    for i in 0..4 {
        scene.push_vertex(Vertex::new(i, i, i, 0, 0)).unwrap();
    }

    scene.transform_vertices(&Matrix::translation(5 << 8, 0, 0), 1, 3);
    scene.transform_vertices(&Matrix::translation(5 << 8, 0, 0), 3, 100);
    scene.transform_vertices(&Matrix::translation(5 << 8, 0, 0), 10, 20);

    let xs: Vec<i32> = scene.vertices().iter().map(|vertex| vertex.x).collect();
    assert_eq!(vec![0, 6, 7, 8], xs);
}

#[test]
fn face_flags_decode_from_codes() {
    for (code, flag) in FaceFlag::ALL.iter().enumerate() {
        assert_eq!(Ok(*flag), FaceFlag::try_from(code as u8));
    }
    assert_eq!(Err(8), FaceFlag::try_from(8));
}
