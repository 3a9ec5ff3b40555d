// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ray intersection against layer content quads.
//!
//! Every layer's content is a unit quad in its local XY plane, centred on
//! the origin, placed by [`LayerStore::content_world_transform`]. A hit
//! reports the distance along the ray, the world-space point and the `uv`
//! position on the quad (origin top-left, matching page coordinates).

use alloc::boxed::Box;
use core::fmt;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::Point;

use crate::layer::{LayerId, LayerStore};
use crate::transform::Transform3d;

/// A ray with a unit-length direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    /// World-space origin.
    pub origin: [f64; 3],
    /// World-space direction, normalized. Zero for a degenerate ray, which
    /// hits nothing.
    pub direction: [f64; 3],
}

impl Ray {
    /// Creates a ray, normalizing `direction`.
    #[must_use]
    pub fn new(origin: [f64; 3], direction: [f64; 3]) -> Self {
        let [x, y, z] = direction;
        let len = (x * x + y * y + z * z).sqrt();
        let direction = if len > 1e-12 && len.is_finite() {
            [x / len, y / len, z / len]
        } else {
            [0.0; 3]
        };
        Self { origin, direction }
    }

    /// The point at distance `t` along the ray.
    #[must_use]
    pub fn at(&self, t: f64) -> [f64; 3] {
        [
            self.origin[0] + self.direction[0] * t,
            self.origin[1] + self.direction[1] * t,
            self.origin[2] + self.direction[2] * t,
        ]
    }
}

/// Where an interaction ray comes from each frame.
pub enum RaySource {
    /// A fixed ray.
    Ray(Ray),
    /// A ray derived from another object's world transform: origin at its
    /// translation, pointing down its local −Z axis. `None` skips the ray
    /// for this frame.
    Follow(Box<dyn Fn() -> Option<Transform3d>>),
}

impl fmt::Debug for RaySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ray(ray) => f.debug_tuple("Ray").field(ray).finish(),
            Self::Follow(_) => f.debug_tuple("Follow").finish_non_exhaustive(),
        }
    }
}

impl RaySource {
    /// The ray for this frame.
    #[must_use]
    pub fn resolve(&self) -> Option<Ray> {
        match self {
            Self::Ray(ray) => Some(*ray),
            Self::Follow(world) => {
                let world = world()?;
                Some(Ray::new(
                    world.translation(),
                    world.transform_vector([0.0, 0.0, -1.0]),
                ))
            }
        }
    }
}

/// The nearest layer hit by a ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerHit {
    /// The layer hit.
    pub layer: LayerId,
    /// Distance from the ray origin.
    pub distance: f64,
    /// Position on the content quad, `(0, 0)` top-left to `(1, 1)`
    /// bottom-right.
    pub uv: Point,
    /// World-space hit point.
    pub point: [f64; 3],
}

/// Intersects `ray` with the unit quad placed by `world`.
///
/// Returns the distance, `uv` and world point. Back faces count; rays
/// parallel to the quad and quads with a singular transform never hit.
#[must_use]
pub fn intersect_quad(ray: &Ray, world: &Transform3d) -> Option<(f64, Point, [f64; 3])> {
    let inverse = world.inverse_affine()?;
    let o = inverse.transform_point(ray.origin);
    let d = inverse.transform_vector(ray.direction);
    if d[2].abs() < 1e-12 {
        return None;
    }
    let s = -o[2] / d[2];
    if s < 0.0 {
        return None;
    }
    let x = o[0] + d[0] * s;
    let y = o[1] + d[1] * s;
    if x.abs() > 0.5 || y.abs() > 0.5 {
        return None;
    }
    let point = world.transform_point([x, y, 0.0]);
    let delta = [
        point[0] - ray.origin[0],
        point[1] - ray.origin[1],
        point[2] - ray.origin[2],
    ];
    let distance = (delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2]).sqrt();
    Some((distance, Point::new(x + 0.5, 0.5 - y), point))
}

impl LayerStore {
    /// The nearest hit among `root`'s subtree, counting only layers that
    /// are not fading out (non-zero target opacity).
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn raycast(&self, root: LayerId, ray: &Ray) -> Option<LayerHit> {
        let mut nearest: Option<LayerHit> = None;
        for id in self.subtree(root) {
            if self.target_opacity(id) <= 0.0 {
                continue;
            }
            let Some((distance, uv, point)) =
                intersect_quad(ray, &self.content_world_transform(id))
            else {
                continue;
            };
            if nearest.is_none_or(|n| distance < n.distance) {
                nearest = Some(LayerHit {
                    layer: id,
                    distance,
                    uv,
                    point,
                });
            }
        }
        nearest
    }
}
