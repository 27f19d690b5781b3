//! Fixed-point sine/cosine lookup tables
//!
//! Angles are in 512ths of a full turn and are always masked to `0..512`. Two scales are provided:
//! the projection tables scaled by 4096 used by the floor/sky/affine layer renderers, and the
//! 512-scaled tables used by sprite rotation, matrix rotation, and deformation waves.

use std::f64::consts::PI;
use std::sync::LazyLock;

pub const ANGLE_STEPS: usize = 512;
pub const ANGLE_MASK: i32 = (ANGLE_STEPS - 1) as i32;

const PROJECTION_SCALE: f64 = 4096.0;
const ROTATION_SCALE: f64 = 512.0;

struct TrigTables {
    sin_projection: [i32; ANGLE_STEPS],
    cos_projection: [i32; ANGLE_STEPS],
    sin_rotation: [i32; ANGLE_STEPS],
    cos_rotation: [i32; ANGLE_STEPS],
}

impl TrigTables {
    fn new() -> Self {
        let mut tables = Self {
            sin_projection: [0; ANGLE_STEPS],
            cos_projection: [0; ANGLE_STEPS],
            sin_rotation: [0; ANGLE_STEPS],
            cos_rotation: [0; ANGLE_STEPS],
        };

        for i in 0..ANGLE_STEPS {
            let radians = (i as f64) * 2.0 * PI / (ANGLE_STEPS as f64);
            let (sin, cos) = radians.sin_cos();

            tables.sin_projection[i] = (sin * PROJECTION_SCALE).round() as i32;
            tables.cos_projection[i] = (cos * PROJECTION_SCALE).round() as i32;
            tables.sin_rotation[i] = (sin * ROTATION_SCALE).round() as i32;
            tables.cos_rotation[i] = (cos * ROTATION_SCALE).round() as i32;
        }

        tables
    }
}

static TABLES: LazyLock<TrigTables> = LazyLock::new(TrigTables::new);

#[inline]
fn index(angle: i32) -> usize {
    (angle & ANGLE_MASK) as usize
}

/// Sine scaled by 4096
#[inline]
#[must_use]
pub fn sin_projection(angle: i32) -> i32 {
    TABLES.sin_projection[index(angle)]
}

/// Cosine scaled by 4096
#[inline]
#[must_use]
pub fn cos_projection(angle: i32) -> i32 {
    TABLES.cos_projection[index(angle)]
}

/// Sine scaled by 512
#[inline]
#[must_use]
pub fn sin512(angle: i32) -> i32 {
    TABLES.sin_rotation[index(angle)]
}

/// Cosine scaled by 512
#[inline]
#[must_use]
pub fn cos512(angle: i32) -> i32 {
    TABLES.cos_rotation[index(angle)]
}
