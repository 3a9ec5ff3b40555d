// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mapping from page-pixel boxes to 3D poses.
//!
//! A layer's panel sits at the offset of its box centre from the parent
//! box centre, converted to world units with
//! [`SceneConfig::pixel_size`](crate::config::SceneConfig::pixel_size) and
//! with the y axis flipped (page y grows down, world y grows up). Child panels
//! sit [`layer_separation`](crate::config::SceneConfig::layer_separation) in
//! front of their parent. The content quad is a unit quad scaled to the box
//! size.

use kurbo::Rect;

use crate::config::SceneConfig;
use crate::markup::Bounds;
use crate::pose::Pose;
use crate::transform::Transform3d;

/// Target panel and content poses for a measured box.
///
/// `parent` is the parent layer's box, or the viewport for roots. Returns
/// `None` for a zero-area box; the previous targets should then be kept.
#[must_use]
pub fn target_layout(
    bounds: &Bounds,
    parent: Rect,
    has_layer_parent: bool,
    config: &SceneConfig,
) -> Option<(Pose, Pose)> {
    if bounds.is_empty_area() {
        return None;
    }
    let px = config.pixel_size;
    let center = bounds.rect.center();
    let parent_center = parent.center();
    let z = if has_layer_parent {
        config.layer_separation
    } else {
        0.0
    };
    let panel = Pose::from_position([
        (center.x - parent_center.x) * px,
        -(center.y - parent_center.y) * px,
        z,
    ]);
    let content = Pose {
        scale: [bounds.rect.width() * px, bounds.rect.height() * px, 1.0],
        ..Pose::IDENTITY
    };
    Some((panel, content))
}

/// Camera distance at which one page pixel covers `pixel_size` world units.
///
/// `projection` is a perspective projection whose `[1][1]` element is
/// `1 / tan(fov_y / 2)`.
#[must_use]
pub fn natural_distance(projection: &Transform3d, viewport_height: f64, pixel_size: f64) -> f64 {
    viewport_height * pixel_size / 2.0 * projection.cols[1][1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_is_offset_from_parent_centre() {
        let cfg = SceneConfig::new().with_pixel_size(0.01);
        let parent = Rect::new(0.0, 0.0, 200.0, 100.0);
        let bounds = Bounds::new(Rect::new(150.0, 0.0, 200.0, 20.0));
        let (panel, content) = target_layout(&bounds, parent, true, &cfg).unwrap();
        // centre (175, 10) vs parent centre (100, 50)
        assert!((panel.position[0] - 0.75).abs() < 1e-12);
        assert!((panel.position[1] - 0.40).abs() < 1e-12);
        assert_eq!(panel.position[2], 0.001);
        assert!((content.scale[0] - 0.5).abs() < 1e-12);
        assert!((content.scale[1] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn roots_sit_on_the_viewport_plane() {
        let cfg = SceneConfig::new();
        let viewport = Rect::new(0.0, 0.0, 100.0, 100.0);
        let bounds = Bounds::new(viewport);
        let (panel, _) = target_layout(&bounds, viewport, false, &cfg).unwrap();
        assert_eq!(panel.position, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn zero_area_has_no_target() {
        let cfg = SceneConfig::new();
        let bounds = Bounds::new(Rect::new(10.0, 10.0, 10.0, 50.0));
        assert!(target_layout(&bounds, Rect::ZERO, false, &cfg).is_none());
    }

    #[test]
    fn natural_distance_matches_fov() {
        // 90 degree vertical fov: 1 / tan(45deg) = 1.
        let mut projection = Transform3d::IDENTITY;
        projection.cols[1][1] = 1.0;
        let d = natural_distance(&projection, 1000.0, 0.001);
        // Visible height at distance d is 2 * d * tan(45deg) = 1.0 = 1000 px.
        assert!((d - 0.5).abs() < 1e-12);
    }
}
