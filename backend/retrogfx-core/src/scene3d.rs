//! Quad-based 3D scene: vertex and face buffers, transform, painter's sort, and rasterization

mod face;
mod matrix;
mod raster;

#[cfg(test)]
mod tests;

use crate::blit::{self, BlitTarget, Rotozoom, SCALE_ONE};
use crate::framebuffer::FrameBuffer;
use crate::ink::InkEffect;
use crate::palette::PaletteBanks;
use crate::sheet::{SpriteFrame, SpriteScript, SpriteSheet};
use bincode::{Decode, Encode};
use retrogfx_common::frontend::pack_rgb565;
use thiserror::Error;

pub use face::{DecodedFace, Projection, SpriteBillboard, SpriteEffect};
pub use matrix::{FIXED_ONE, Matrix};
pub use raster::{ScanBuffer, ScreenVertex, draw_colored_quad, draw_textured_quad};

pub const MAX_VERTICES: usize = 0x1000;
pub const MAX_FACES: usize = 0x400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct Vertex {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub u: i32,
    pub v: i32,
}

impl Vertex {
    #[must_use]
    pub fn new(x: i32, y: i32, z: i32, u: i32, v: i32) -> Self {
        Self { x, y, z, u, v }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub enum FaceFlag {
    #[default]
    Textured3D,
    Textured2D,
    Colored3D,
    Colored2D,
    Faded,
    TexturedC,
    TexturedCBlend,
    Sprite3D,
}

impl FaceFlag {
    pub const ALL: [Self; 8] = [
        Self::Textured3D,
        Self::Textured2D,
        Self::Colored3D,
        Self::Colored2D,
        Self::Faded,
        Self::TexturedC,
        Self::TexturedCBlend,
        Self::Sprite3D,
    ];
}

impl TryFrom<u8> for FaceFlag {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL.get(value as usize).copied().ok_or(value)
    }
}

/// Four vertex indices plus an ARGB color whose alpha is the 7 bits at 24..=30.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct Face {
    pub a: u16,
    pub b: u16,
    pub c: u16,
    pub d: u16,
    pub color: u32,
    pub flag: FaceFlag,
}

impl Face {
    #[must_use]
    pub fn new(vertices: [u16; 4], color: u32, flag: FaceFlag) -> Self {
        let [a, b, c, d] = vertices;
        Self { a, b, c, d, color, flag }
    }

    #[must_use]
    pub fn indices(&self) -> [u16; 4] {
        [self.a, self.b, self.c, self.d]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct DrawListEntry {
    pub face_id: u16,
    pub depth: i32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("Vertex buffer is full ({MAX_VERTICES} vertices)")]
    VertexBufferFull,
    #[error("Face buffer is full ({MAX_FACES} faces)")]
    FaceBufferFull,
}

#[derive(Debug, Clone, Default, Encode, Decode)]
pub struct Scene3D {
    vertices: Vec<Vertex>,
    transformed: Vec<Vertex>,
    faces: Vec<Face>,
    draw_list: Vec<DrawListEntry>,
    pub world: Matrix,
    pub view: Matrix,
    /// RGB888
    pub fog_color: u32,
    /// Maximum fog alpha, 0..=255
    pub fog_strength: i32,
}

impl Scene3D {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a vertex, returning its index.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer already holds [`MAX_VERTICES`] vertices.
    pub fn push_vertex(&mut self, vertex: Vertex) -> Result<u16, SceneError> {
        if self.vertices.len() >= MAX_VERTICES {
            return Err(SceneError::VertexBufferFull);
        }
        self.vertices.push(vertex);
        Ok((self.vertices.len() - 1) as u16)
    }

    /// Append a face, returning its index.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer already holds [`MAX_FACES`] faces.
    pub fn push_face(&mut self, face: Face) -> Result<u16, SceneError> {
        if self.faces.len() >= MAX_FACES {
            return Err(SceneError::FaceBufferFull);
        }
        self.faces.push(face);
        Ok((self.faces.len() - 1) as u16)
    }

    /// # Errors
    ///
    /// Returns an error if either buffer holds more than its fixed capacity.
    pub fn validate(&self) -> Result<(), SceneError> {
        if self.vertices.len() > MAX_VERTICES {
            return Err(SceneError::VertexBufferFull);
        }
        if self.faces.len() > MAX_FACES {
            return Err(SceneError::FaceBufferFull);
        }
        Ok(())
    }

    /// Empty the vertex and face buffers. Matrices and fog settings are kept.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.transformed.clear();
        self.faces.clear();
        self.draw_list.clear();
    }

    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertices_mut(&mut self) -> &mut [Vertex] {
        &mut self.vertices
    }

    #[must_use]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn faces_mut(&mut self) -> &mut [Face] {
        &mut self.faces
    }

    #[must_use]
    pub fn transformed(&self) -> &[Vertex] {
        &self.transformed
    }

    #[must_use]
    pub fn draw_list(&self) -> &[DrawListEntry] {
        &self.draw_list
    }

    /// Transform the source vertices in `start..end` in place.
    pub fn transform_vertices(&mut self, matrix: &Matrix, start: usize, end: usize) {
        let end = end.min(self.vertices.len());
        let Some(vertices) = self.vertices.get_mut(start..end) else {
            log::trace!("Ignoring empty vertex range {start}..{end}");
            return;
        };

        for vertex in vertices {
            [vertex.x, vertex.y, vertex.z] = matrix.transform_point(vertex.x, vertex.y, vertex.z);
        }
    }

    /// Fill the transformed buffer by applying the world matrix and then the view matrix to every
    /// vertex. Texture coordinates are copied unchanged.
    pub fn transform(&mut self) {
        let matrix = self.world.then(&self.view);
        self.transformed.clear();
        self.transformed.extend(self.vertices.iter().map(|vertex| {
            let [x, y, z] = matrix.transform_point(vertex.x, vertex.y, vertex.z);
            Vertex { x, y, z, ..*vertex }
        }));
    }

    /// Rebuild the draw list ordered from the deepest face to the nearest. Faces of equal depth
    /// keep their buffer order.
    pub fn sort(&mut self) {
        let transformed = &self.transformed;
        let depth_of = |face: &Face| {
            let sum: i64 = face
                .indices()
                .iter()
                .map(|&i| transformed.get(i as usize).map_or(0, |vertex| i64::from(vertex.z)))
                .sum();
            (sum >> 2) as i32
        };

        self.draw_list.clear();
        self.draw_list.extend(
            self.faces
                .iter()
                .enumerate()
                .map(|(i, face)| DrawListEntry { face_id: i as u16, depth: depth_of(face) }),
        );
        self.draw_list.sort_by(|a, b| b.depth.cmp(&a.depth));
    }
}

/// Everything a scene draw reads besides the scene itself.
pub struct SceneContext<'a> {
    pub frame_buffer: &'a mut FrameBuffer,
    pub palette: &'a PaletteBanks,
    pub sheets: &'a [Option<SpriteSheet>],
    pub frames: &'a [SpriteFrame],
    pub scripts: &'a [SpriteScript],
    pub projection: Projection,
    pub fog_threshold: i32,
}

/// Rasterize the draw list in order. Textured faces sample `sheet_id`; sprite billboards use the
/// sheet of their sprite script.
pub fn draw_scene(ctx: &mut SceneContext<'_>, scene: &Scene3D, sheet_id: usize) {
    let sheets = ctx.sheets;
    let texture = sheets.get(sheet_id).and_then(Option::as_ref);
    let mut scan = ScanBuffer::new(ctx.frame_buffer);

    for entry in scene.draw_list() {
        let Some(face) = scene.faces().get(entry.face_id as usize) else {
            continue;
        };
        let Some(decoded) = face::decode(face, entry.depth, scene, &ctx.projection, ctx.fog_threshold)
        else {
            continue;
        };

        match decoded {
            DecodedFace::Textured { quad, ink } => {
                let Some(sheet) = texture else {
                    log::trace!("Skipping textured face {}, sheet {sheet_id} is not loaded", entry.face_id);
                    continue;
                };
                let mut target = BlitTarget { frame_buffer: ctx.frame_buffer, palette: ctx.palette };
                draw_textured_quad(&mut target, &mut scan, &quad, sheet, ink);
            }
            DecodedFace::Colored { quad, color, alpha } => {
                draw_colored_quad(ctx.frame_buffer, &mut scan, &quad, color, alpha);
            }
            DecodedFace::Faded { quad, color, alpha, fog_alpha } => {
                draw_colored_quad(ctx.frame_buffer, &mut scan, &quad, color, alpha);
                let fog = rgb888_to_565(scene.fog_color);
                draw_colored_quad(ctx.frame_buffer, &mut scan, &quad, fog, fog_alpha);
            }
            DecodedFace::Sprite(billboard) => draw_billboard(ctx, &billboard),
        }
    }
}

fn draw_billboard(ctx: &mut SceneContext<'_>, billboard: &SpriteBillboard) {
    let Some(script) = ctx.scripts.get(billboard.script) else {
        log::trace!("Skipping billboard with unknown sprite script {}", billboard.script);
        return;
    };
    let frame_id = script.frame_list_offset.checked_add(billboard.frame);
    let Some(frame) = frame_id.and_then(|frame_id| ctx.frames.get(frame_id)) else {
        log::trace!("Skipping billboard with unknown frame {}", billboard.frame);
        return;
    };
    let Some(sheet) = ctx.sheets.get(script.sheet_id as usize).and_then(Option::as_ref) else {
        log::trace!("Skipping billboard with unloaded sheet {}", script.sheet_id);
        return;
    };

    let (scale, rotation) = match billboard.effect {
        SpriteEffect::Scale => (billboard.scale, 0),
        SpriteEffect::Rotate => (SCALE_ONE, billboard.rotation),
        SpriteEffect::Rotozoom => (billboard.scale, billboard.rotation),
    };
    let params = Rotozoom {
        x: billboard.x,
        y: billboard.y,
        pivot_x: frame.pivot_x,
        pivot_y: frame.pivot_y,
        width: frame.width,
        height: frame.height,
        sprite_x: frame.sprite_x,
        sprite_y: frame.sprite_y,
        scale_x: scale,
        scale_y: scale,
        flip: billboard.flip,
        rotation,
    };

    let mut target = BlitTarget { frame_buffer: ctx.frame_buffer, palette: ctx.palette };
    blit::draw_sprite_rotozoom(&mut target, sheet, &params, InkEffect::None, u8::MAX);
}

fn rgb888_to_565(rgb: u32) -> u16 {
    pack_rgb565((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}
