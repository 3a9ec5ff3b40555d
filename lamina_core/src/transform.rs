// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal column-major 4×4 transform.
//!
//! Covers what layer placement and raycasting need (identity, multiply,
//! affine inverse, point and vector transforms) without pulling in a full
//! linear-algebra crate.

use core::ops::Mul;

/// A column-major 4×4 affine transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column* of the matrix, matching the memory layout
/// used by GPU APIs and most scene graphs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Transform3d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a transform from four column arrays.
    #[inline]
    #[must_use]
    pub const fn from_cols(col0: [f64; 4], col1: [f64; 4], col2: [f64; 4], col3: [f64; 4]) -> Self {
        Self {
            cols: [col0, col1, col2, col3],
        }
    }

    /// Returns column `i` (0-based).
    ///
    /// # Panics
    ///
    /// Panics if `i >= 4`.
    #[inline]
    #[must_use]
    pub const fn col(self, i: usize) -> [f64; 4] {
        self.cols[i]
    }

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Returns the translation part.
    #[inline]
    #[must_use]
    pub const fn translation(&self) -> [f64; 3] {
        [self.cols[3][0], self.cols[3][1], self.cols[3][2]]
    }

    /// Transforms a point (w = 1).
    #[inline]
    #[must_use]
    pub fn transform_point(&self, p: [f64; 3]) -> [f64; 3] {
        let v = self.transform_vector(p);
        let t = self.translation();
        [v[0] + t[0], v[1] + t[1], v[2] + t[2]]
    }

    /// Transforms a direction (w = 0), ignoring translation.
    #[inline]
    #[must_use]
    pub fn transform_vector(&self, v: [f64; 3]) -> [f64; 3] {
        let c = &self.cols;
        [
            c[0][0] * v[0] + c[1][0] * v[1] + c[2][0] * v[2],
            c[0][1] * v[0] + c[1][1] * v[1] + c[2][1] * v[2],
            c[0][2] * v[0] + c[1][2] * v[1] + c[2][2] * v[2],
        ]
    }

    /// Inverts an affine transform.
    ///
    /// The bottom row is assumed to be `[0, 0, 0, 1]`. Returns `None` when the
    /// linear part is singular, which happens for zero-scaled layers.
    #[must_use]
    pub fn inverse_affine(&self) -> Option<Self> {
        let c = &self.cols;
        // Rows of the 3x3 linear part.
        let (a, b, cc) = (c[0][0], c[1][0], c[2][0]);
        let (d, e, f) = (c[0][1], c[1][1], c[2][1]);
        let (g, h, i) = (c[0][2], c[1][2], c[2][2]);

        let co00 = e * i - f * h;
        let co01 = f * g - d * i;
        let co02 = d * h - e * g;
        let det = a * co00 + b * co01 + cc * co02;
        if det.abs() < 1e-12 || !det.is_finite() {
            return None;
        }
        let inv_det = 1.0 / det;

        // Inverse of the linear part, stored by rows.
        let r0 = [co00 * inv_det, (cc * h - b * i) * inv_det, (b * f - cc * e) * inv_det];
        let r1 = [co01 * inv_det, (a * i - cc * g) * inv_det, (cc * d - a * f) * inv_det];
        let r2 = [co02 * inv_det, (b * g - a * h) * inv_det, (a * e - b * d) * inv_det];

        let t = self.translation();
        let it = [
            -(r0[0] * t[0] + r0[1] * t[1] + r0[2] * t[2]),
            -(r1[0] * t[0] + r1[1] * t[1] + r1[2] * t[2]),
            -(r2[0] * t[0] + r2[1] * t[1] + r2[2] * t[2]),
        ];

        Some(Self::from_cols(
            [r0[0], r1[0], r2[0], 0.0],
            [r0[1], r1[1], r2[1], 0.0],
            [r0[2], r1[2], r2[2], 0.0],
            [it[0], it[1], it[2], 1.0],
        ))
    }

    /// Is this transform [finite]?
    ///
    /// [finite]: f64::is_finite
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().flatten().all(|v| v.is_finite())
    }
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        let mut j = 0;
        while j < 4 {
            let mut i = 0;
            while i < 4 {
                out[j][i] =
                    a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
                i += 1;
            }
            j += 1;
        }
        Self { cols: out }
    }
}
