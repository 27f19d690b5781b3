//! 4x4 transform matrices in 8-bit fixed point
//!
//! Matrices act on column vectors: `x' = m[0][0]*x + m[0][1]*y + m[0][2]*z + m[0][3]`, with every
//! product shifted right by 8 before summing. Translation lives in column 3.

use crate::trig;
use bincode::{Decode, Encode};

pub const FIXED_ONE: i32 = 0x100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct Matrix {
    pub values: [[i32; 4]; 4],
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Self = Self {
        values: [
            [FIXED_ONE, 0, 0, 0],
            [0, FIXED_ONE, 0, 0],
            [0, 0, FIXED_ONE, 0],
            [0, 0, 0, FIXED_ONE],
        ],
    };

    /// Translation by `(x, y, z)` given with 8 extra bits of fraction.
    #[must_use]
    pub fn translation(x: i32, y: i32, z: i32) -> Self {
        let mut matrix = Self::IDENTITY;
        matrix.values[0][3] = x >> 8;
        matrix.values[1][3] = y >> 8;
        matrix.values[2][3] = z >> 8;
        matrix
    }

    /// Scale by 8.8 factors along each axis.
    #[must_use]
    pub fn scale(x: i32, y: i32, z: i32) -> Self {
        let mut matrix = Self::IDENTITY;
        matrix.values[0][0] = x;
        matrix.values[1][1] = y;
        matrix.values[2][2] = z;
        matrix
    }

    /// Rotation about the X axis by `angle` 512ths of a turn.
    #[must_use]
    pub fn rotation_x(angle: i32) -> Self {
        let (sin, cos) = sin_cos(angle);
        let mut matrix = Self::IDENTITY;
        matrix.values[1][1] = cos;
        matrix.values[1][2] = -sin;
        matrix.values[2][1] = sin;
        matrix.values[2][2] = cos;
        matrix
    }

    #[must_use]
    pub fn rotation_y(angle: i32) -> Self {
        let (sin, cos) = sin_cos(angle);
        let mut matrix = Self::IDENTITY;
        matrix.values[0][0] = cos;
        matrix.values[0][2] = sin;
        matrix.values[2][0] = -sin;
        matrix.values[2][2] = cos;
        matrix
    }

    #[must_use]
    pub fn rotation_z(angle: i32) -> Self {
        let (sin, cos) = sin_cos(angle);
        let mut matrix = Self::IDENTITY;
        matrix.values[0][0] = cos;
        matrix.values[0][1] = -sin;
        matrix.values[1][0] = sin;
        matrix.values[1][1] = cos;
        matrix
    }

    /// Rotation about X, then Y, then Z.
    #[must_use]
    pub fn rotation_xyz(x: i32, y: i32, z: i32) -> Self {
        Self::rotation_x(x).then(&Self::rotation_y(y)).then(&Self::rotation_z(z))
    }

    /// The matrix that applies `self` first and then `next`.
    #[must_use]
    pub fn then(&self, next: &Self) -> Self {
        let mut values = [[0; 4]; 4];
        for (row, out_row) in values.iter_mut().enumerate() {
            for (col, out) in out_row.iter_mut().enumerate() {
                *out = (0..4)
                    .map(|k| next.values[row][k].wrapping_mul(self.values[k][col]) >> 8)
                    .fold(0_i32, i32::wrapping_add);
            }
        }
        Self { values }
    }

    /// Inverse transform, or `None` if the matrix is singular.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let mut work = [[0.0_f64; 8]; 4];
        for (row, work_row) in work.iter_mut().enumerate() {
            for col in 0..4 {
                work_row[col] = f64::from(self.values[row][col]) / f64::from(FIXED_ONE);
            }
            work_row[4 + row] = 1.0;
        }

        // Gauss-Jordan with partial pivoting
        for col in 0..4 {
            let pivot = (col..4).max_by(|&a, &b| work[a][col].abs().total_cmp(&work[b][col].abs()))?;
            if work[pivot][col].abs() < 1e-9 {
                return None;
            }
            work.swap(col, pivot);

            let divisor = work[col][col];
            for value in &mut work[col] {
                *value /= divisor;
            }

            for row in 0..4 {
                if row == col {
                    continue;
                }
                let factor = work[row][col];
                if factor == 0.0 {
                    continue;
                }
                for k in 0..8 {
                    work[row][k] -= factor * work[col][k];
                }
            }
        }

        let mut values = [[0; 4]; 4];
        for (row, out_row) in values.iter_mut().enumerate() {
            for (col, out) in out_row.iter_mut().enumerate() {
                *out = (work[row][4 + col] * f64::from(FIXED_ONE)).round() as i32;
            }
        }
        Some(Self { values })
    }

    /// Apply the matrix to a point.
    #[inline]
    #[must_use]
    pub fn transform_point(&self, x: i32, y: i32, z: i32) -> [i32; 3] {
        let row = |r: &[i32; 4]| {
            (x.wrapping_mul(r[0]) >> 8)
                .wrapping_add(y.wrapping_mul(r[1]) >> 8)
                .wrapping_add(z.wrapping_mul(r[2]) >> 8)
                .wrapping_add(r[3])
        };
        [row(&self.values[0]), row(&self.values[1]), row(&self.values[2])]
    }
}

// 512-scaled trig halved to 8-bit fixed point
fn sin_cos(angle: i32) -> (i32, i32) {
    (trig::sin512(angle) >> 1, trig::cos512(angle) >> 1)
}
