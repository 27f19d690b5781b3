//! Per-flag interpretation of faces into drawable shapes

use super::raster::ScreenVertex;
use super::{Face, FaceFlag, Scene3D, Vertex};
use crate::ink::InkEffect;
use crate::tiles::Flip;
use retrogfx_common::frontend::pack_rgb565;
use retrogfx_config::RenderConfig;

// Keeps projected coordinates far enough from the i32 limits for the scan converter
const SCREEN_LIMIT: i64 = 1 << 24;

/// Perspective projection onto the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    pub center_x: i32,
    pub center_y: i32,
    pub projection_x: i32,
    pub projection_y: i32,
}

impl Projection {
    #[must_use]
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            center_x: config.center_x(),
            center_y: config.center_y(),
            projection_x: config.projection_x,
            projection_y: config.projection_y,
        }
    }

    /// Project a camera-space point with `z > 0`.
    #[must_use]
    pub fn project(&self, x: i32, y: i32, z: i32) -> (i32, i32) {
        let z = i64::from(z.max(1));
        let sx = i64::from(self.center_x) + i64::from(self.projection_x) * i64::from(x) / z;
        let sy = i64::from(self.center_y) - i64::from(self.projection_y) * i64::from(y) / z;
        (
            sx.clamp(-SCREEN_LIMIT, SCREEN_LIMIT) as i32,
            sy.clamp(-SCREEN_LIMIT, SCREEN_LIMIT) as i32,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteEffect {
    Scale,
    Rotate,
    Rotozoom,
}

impl SpriteEffect {
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Scale),
            1 => Some(Self::Rotate),
            2 => Some(Self::Rotozoom),
            _ => None,
        }
    }
}

/// A sprite frame drawn at a projected anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteBillboard {
    pub x: i32,
    pub y: i32,
    pub script: usize,
    pub effect: SpriteEffect,
    pub frame: usize,
    pub flip: Flip,
    pub scale: i32,
    pub rotation: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedFace {
    Textured { quad: [ScreenVertex; 4], ink: InkEffect },
    Colored { quad: [ScreenVertex; 4], color: u16, alpha: u8 },
    /// Face color at `alpha` followed by the scene's fog color at `fog_alpha`
    Faded { quad: [ScreenVertex; 4], color: u16, alpha: u8, fog_alpha: u8 },
    Sprite(SpriteBillboard),
}

struct FaceVertices<'a> {
    source: [&'a Vertex; 4],
    transformed: [&'a Vertex; 4],
}

fn lookup<'a>(face: &Face, scene: &'a Scene3D) -> Option<FaceVertices<'a>> {
    let source = face.indices().map(|i| scene.vertices().get(i as usize));
    let transformed = face.indices().map(|i| scene.transformed().get(i as usize));
    let [Some(s0), Some(s1), Some(s2), Some(s3)] = source else {
        return None;
    };
    let [Some(t0), Some(t1), Some(t2), Some(t3)] = transformed else {
        return None;
    };
    Some(FaceVertices { source: [s0, s1, s2, s3], transformed: [t0, t1, t2, t3] })
}

impl FaceVertices<'_> {
    fn all_in_front(&self) -> bool {
        self.transformed.iter().all(|vertex| vertex.z > 0)
    }

    fn none_behind(&self) -> bool {
        self.transformed.iter().all(|vertex| vertex.z >= 0)
    }

    fn projected(&self, projection: &Projection) -> [ScreenVertex; 4] {
        std::array::from_fn(|i| {
            let vertex = self.transformed[i];
            let (x, y) = projection.project(vertex.x, vertex.y, vertex.z);
            ScreenVertex::new(x, y, self.source[i].u, self.source[i].v)
        })
    }

    fn flat(&self) -> [ScreenVertex; 4] {
        std::array::from_fn(|i| {
            let vertex = self.transformed[i];
            ScreenVertex::new(vertex.x, vertex.y, self.source[i].u, self.source[i].v)
        })
    }

    /// Axis-aligned quad around the projected first vertex. The second vertex's texture
    /// coordinates hold the half extents in camera units and the third's the half extents in
    /// texels.
    fn centered(&self, projection: &Projection) -> [ScreenVertex; 4] {
        let anchor = self.transformed[0];
        let (center_u, center_v) = (self.source[0].u, self.source[0].v);
        let (half_w, half_h) = (self.source[1].u, self.source[1].v);
        let (half_u, half_v) = (self.source[2].u, self.source[2].v);

        let corner = |dx: i32, dy: i32, du: i32, dv: i32| {
            let (x, y) = projection.project(
                anchor.x.wrapping_add(half_w.wrapping_mul(dx)),
                anchor.y.wrapping_add(half_h.wrapping_mul(dy)),
                anchor.z,
            );
            ScreenVertex::new(
                x,
                y,
                center_u.wrapping_add(half_u.wrapping_mul(du)),
                center_v.wrapping_add(half_v.wrapping_mul(dv)),
            )
        };

        [corner(-1, 1, -1, -1), corner(1, 1, 1, -1), corner(-1, -1, -1, 1), corner(1, -1, 1, 1)]
    }
}

fn color_565(color: u32) -> u16 {
    pack_rgb565((color >> 16) as u8, (color >> 8) as u8, color as u8)
}

// 7-bit alpha widened to 8 bits
fn color_alpha(color: u32) -> u8 {
    let alpha = ((color >> 24) & 0x7F) as u8;
    (alpha << 1) | (alpha >> 6)
}

/// Interpret a face according to its flag. Faces referencing missing vertices or failing their
/// depth test decode to `None`.
#[must_use]
pub fn decode(
    face: &Face,
    depth: i32,
    scene: &Scene3D,
    projection: &Projection,
    fog_threshold: i32,
) -> Option<DecodedFace> {
    let Some(vertices) = lookup(face, scene) else {
        log::trace!("Skipping face {face:?} with out-of-range vertex indices");
        return None;
    };

    let decoded = match face.flag {
        FaceFlag::Textured3D if vertices.all_in_front() => DecodedFace::Textured {
            quad: vertices.projected(projection),
            ink: InkEffect::None,
        },
        FaceFlag::Textured2D if vertices.none_behind() => {
            DecodedFace::Textured { quad: vertices.flat(), ink: InkEffect::None }
        }
        FaceFlag::Colored3D if vertices.all_in_front() => DecodedFace::Colored {
            quad: vertices.projected(projection),
            color: color_565(face.color),
            alpha: color_alpha(face.color),
        },
        FaceFlag::Colored2D if vertices.none_behind() => DecodedFace::Colored {
            quad: vertices.flat(),
            color: color_565(face.color),
            alpha: color_alpha(face.color),
        },
        FaceFlag::Faded if vertices.all_in_front() => {
            let fog_strength = scene.fog_strength.clamp(0, 0xFF);
            let fog = (depth.saturating_sub(fog_threshold) >> 8).clamp(0, fog_strength);
            DecodedFace::Faded {
                quad: vertices.projected(projection),
                color: color_565(face.color),
                alpha: color_alpha(face.color),
                fog_alpha: fog as u8,
            }
        }
        FaceFlag::TexturedC if vertices.transformed[0].z > 0 => {
            DecodedFace::Textured { quad: vertices.centered(projection), ink: InkEffect::None }
        }
        FaceFlag::TexturedCBlend if vertices.transformed[0].z > 0 => {
            DecodedFace::Textured { quad: vertices.centered(projection), ink: InkEffect::Blend }
        }
        FaceFlag::Sprite3D if vertices.transformed[0].z > 0 => {
            let anchor = vertices.transformed[0];
            let (x, y) = projection.project(anchor.x, anchor.y, anchor.z);
            let [a, b, c, _] = vertices.source;

            let Some(effect) = SpriteEffect::from_code(a.v) else {
                log::trace!("Skipping billboard with unknown effect {}", a.v);
                return None;
            };
            let (Ok(script), Ok(frame)) = (usize::try_from(a.u), usize::try_from(b.u)) else {
                log::trace!("Skipping billboard with negative script or frame id");
                return None;
            };

            DecodedFace::Sprite(SpriteBillboard {
                x,
                y,
                script,
                effect,
                frame,
                flip: Flip::from_bits((b.v & 3) as u8),
                scale: c.u,
                rotation: c.v,
            })
        }
        _ => {
            log::trace!("Skipping face {face:?} behind the camera");
            return None;
        }
    };

    Some(decoded)
}
