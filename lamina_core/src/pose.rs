// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Position, rotation and scale of a layer panel or its content quad.
//!
//! Layout produces target [`Pose`]s; each frame the live pose moves toward
//! its target with [`Pose::lerp`].

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use crate::transform::Transform3d;

/// A unit quaternion `(x, y, z, w)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quat {
    /// Vector part, x.
    pub x: f64,
    /// Vector part, y.
    pub y: f64,
    /// Vector part, z.
    pub z: f64,
    /// Scalar part.
    pub w: f64,
}

impl Quat {
    /// No rotation.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Rotation of `radians` around a unit `axis`.
    #[must_use]
    pub fn from_axis_angle(axis: [f64; 3], radians: f64) -> Self {
        let half = radians * 0.5;
        let (s, c) = (half.sin(), half.cos());
        Self {
            x: axis[0] * s,
            y: axis[1] * s,
            z: axis[2] * s,
            w: c,
        }
        .normalize()
    }

    /// Returns the quaternion scaled to unit length, or identity if it is
    /// degenerate.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        if len < 1e-12 || !len.is_finite() {
            return Self::IDENTITY;
        }
        Self {
            x: self.x / len,
            y: self.y / len,
            z: self.z / len,
            w: self.w / len,
        }
    }

    /// Normalized linear interpolation along the shortest arc.
    #[must_use]
    pub fn nlerp(self, to: Self, t: f64) -> Self {
        let dot = self.x * to.x + self.y * to.y + self.z * to.z + self.w * to.w;
        let sign = if dot < 0.0 { -1.0 } else { 1.0 };
        Self {
            x: self.x + (to.x * sign - self.x) * t,
            y: self.y + (to.y * sign - self.y) * t,
            z: self.z + (to.z * sign - self.z) * t,
            w: self.w + (to.w * sign - self.w) * t,
        }
        .normalize()
    }

    /// Rotation matrix columns.
    fn to_cols(self) -> [[f64; 3]; 3] {
        let Self { x, y, z, w } = self;
        [
            [
                1.0 - 2.0 * (y * y + z * z),
                2.0 * (x * y + z * w),
                2.0 * (x * z - y * w),
            ],
            [
                2.0 * (x * y - z * w),
                1.0 - 2.0 * (x * x + z * z),
                2.0 * (y * z + x * w),
            ],
            [
                2.0 * (x * z + y * w),
                2.0 * (y * z - x * w),
                1.0 - 2.0 * (x * x + y * y),
            ],
        ]
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Position, rotation and scale relative to the parent panel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// Translation in world units.
    pub position: [f64; 3],
    /// Orientation.
    pub rotation: Quat,
    /// Per-axis scale.
    pub scale: [f64; 3],
}

impl Pose {
    /// No translation, no rotation, unit scale.
    pub const IDENTITY: Self = Self {
        position: [0.0; 3],
        rotation: Quat::IDENTITY,
        scale: [1.0; 3],
    };

    /// A pose that only translates.
    #[must_use]
    pub const fn from_position(position: [f64; 3]) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            scale: [1.0; 3],
        }
    }

    /// Moves `self` toward `target` by `alpha` (1 snaps, 0 holds).
    #[must_use]
    pub fn lerp(&self, target: &Self, alpha: f64) -> Self {
        let mix = |a: [f64; 3], b: [f64; 3]| {
            [
                a[0] + (b[0] - a[0]) * alpha,
                a[1] + (b[1] - a[1]) * alpha,
                a[2] + (b[2] - a[2]) * alpha,
            ]
        };
        if alpha >= 1.0 {
            return *target;
        }
        Self {
            position: mix(self.position, target.position),
            rotation: self.rotation.nlerp(target.rotation, alpha),
            scale: mix(self.scale, target.scale),
        }
    }

    /// Composes translation × rotation × scale.
    #[must_use]
    pub fn to_transform(&self) -> Transform3d {
        let r = self.rotation.to_cols();
        let s = self.scale;
        let p = self.position;
        Transform3d::from_cols(
            [r[0][0] * s[0], r[0][1] * s[0], r[0][2] * s[0], 0.0],
            [r[1][0] * s[1], r[1][1] * s[1], r[1][2] * s[1], 0.0],
            [r[2][0] * s[2], r[2][1] * s[2], r[2][2] * s[2], 0.0],
            [p[0], p[1], p[2], 1.0],
        )
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_pose_is_identity_transform() {
        assert_eq!(Pose::IDENTITY.to_transform(), Transform3d::IDENTITY);
    }

    #[test]
    fn lerp_halfway_and_snap() {
        let from = Pose::IDENTITY;
        let to = Pose {
            position: [2.0, -4.0, 0.0],
            rotation: Quat::IDENTITY,
            scale: [3.0, 1.0, 1.0],
        };
        let half = from.lerp(&to, 0.5);
        assert_eq!(half.position, [1.0, -2.0, 0.0]);
        assert_eq!(half.scale, [2.0, 1.0, 1.0]);
        assert_eq!(from.lerp(&to, 1.0), to);
        assert_eq!(from.lerp(&to, 0.0), from);
    }

    #[test]
    fn rotation_about_z_maps_x_to_y() {
        let pose = Pose {
            position: [0.0; 3],
            rotation: Quat::from_axis_angle([0.0, 0.0, 1.0], core::f64::consts::FRAC_PI_2),
            scale: [1.0; 3],
        };
        let p = pose.to_transform().transform_point([1.0, 0.0, 0.0]);
        assert!(p[0].abs() < 1e-9);
        assert!((p[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_quat_normalizes_to_identity() {
        let q = Quat {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 0.0,
        };
        assert_eq!(q.normalize(), Quat::IDENTITY);
    }
}
