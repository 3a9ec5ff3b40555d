// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame layout, opacity and texture binding.
//!
//! [`LayerStore::update_layout`] walks one root's subtree parents-first and,
//! for each layer:
//!
//! 1. Resolves the measured box for the selected state and hover level and
//!    derives target panel and content poses from it.
//! 2. Moves the live poses toward the targets (snapping the first time a box
//!    is known) according to the layer's
//!    [`LayoutPolicy`](crate::config::LayoutPolicy).
//! 3. Fades the live opacity toward 1, or toward 0 when removal is requested
//!    or the box is empty or unmeasured.
//! 4. Binds the bitmap resolved from the cache and recomputes visibility and
//!    the world transform.
//!
//! [`FrameChanges`] uses raw slot indices (`u32`) rather than
//! [`LayerId`] handles so that presenters can index directly into the
//! store's SoA arrays via the `*_at()` accessors.

use alloc::vec::Vec;

use kurbo::Rect;

use super::id::{INVALID, LayerId};
use super::store::LayerStore;
use crate::config::{OPACITY_EPSILON, SceneConfig};
use crate::layout::target_layout;
use crate::transform::Transform3d;

/// The set of changes produced by one update.
///
/// Each field contains the raw slot indices of layers that changed in the
/// corresponding category. Presenters use these to apply incremental updates.
#[derive(Clone, Debug, Default)]
pub struct FrameChanges {
    /// Layers whose panel or content world transform changed.
    pub transforms: Vec<u32>,
    /// Layers whose live opacity changed.
    pub opacities: Vec<u32>,
    /// Layers whose bound bitmap changed.
    pub content: Vec<u32>,
    /// Layers that became invisible.
    pub hidden: Vec<u32>,
    /// Layers that became visible.
    pub unhidden: Vec<u32>,
    /// Layers created since the last update.
    pub added: Vec<u32>,
    /// Layers disposed since the last update.
    pub removed: Vec<u32>,
    /// Whether the layer tree changed shape.
    pub topology_changed: bool,
}

impl FrameChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.transforms.clear();
        self.opacities.clear();
        self.content.clear();
        self.hidden.clear();
        self.unhidden.clear();
        self.added.clear();
        self.removed.clear();
        self.topology_changed = false;
    }

    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
            && self.opacities.is_empty()
            && self.content.is_empty()
            && self.hidden.is_empty()
            && self.unhidden.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
            && !self.topology_changed
    }
}

impl LayerStore {
    /// Advances layout, opacity and texture binding for the subtree of
    /// `root` by one frame.
    ///
    /// `lerp` is the interpolation factor toward targets (1 snaps). Changes
    /// are appended to `changes`. Returns the layers whose removal was
    /// requested and whose opacity has dropped below
    /// [`OPACITY_EPSILON`], parents before children.
    pub fn update_layout(
        &mut self,
        root: LayerId,
        viewport: Rect,
        config: &SceneConfig,
        lerp: f64,
        changes: &mut FrameChanges,
    ) -> Vec<LayerId> {
        if self.traversal_dirty {
            self.rebuild_traversal_order();
            changes.topology_changed = true;
            self.traversal_dirty = false;
        }

        let lerp = lerp.clamp(0.0, 1.0);
        let mut expired = Vec::new();
        for id in self.subtree(root) {
            let i = id.idx as usize;
            let parent = self.parent[i];
            let has_parent = parent != INVALID;

            let state = &self.state[i];
            let hover = self.hover[i];
            let bounds = self.cache[i].resolve_bounds(state, hover);
            let texture = self.cache[i].resolve_texture(state, hover);

            let parent_rect = if has_parent {
                let p = parent as usize;
                self.cache[p]
                    .resolve_bounds(&self.state[p], self.hover[p])
                    .map_or(viewport, |b| b.rect)
            } else {
                viewport
            };

            let target = bounds.and_then(|b| target_layout(&b, parent_rect, has_parent, config));
            if let Some((panel, content)) = target {
                self.target_pose[i] = panel;
                self.content_target[i] = content;
            }

            let follows = self.policy[i].follows(has_parent);
            let prev_content = self.content_pose[i];
            if target.is_some() && !self.laid_out[i] {
                if follows {
                    self.pose[i] = self.target_pose[i];
                }
                self.content_pose[i] = self.content_target[i];
                self.laid_out[i] = true;
            } else {
                if follows {
                    self.pose[i] = self.pose[i].lerp(&self.target_pose[i], lerp);
                }
                self.content_pose[i] = self.content_pose[i].lerp(&self.content_target[i], lerp);
            }

            self.target_opacity[i] = if self.removal[i] || target.is_none() {
                0.0
            } else {
                1.0
            };
            let old_opacity = self.opacity[i];
            let mut opacity = old_opacity + (self.target_opacity[i] - old_opacity) * lerp;
            if (opacity - self.target_opacity[i]).abs() < OPACITY_EPSILON * 0.01 {
                opacity = self.target_opacity[i];
            }
            self.opacity[i] = opacity;
            if opacity != old_opacity {
                changes.opacities.push(id.idx);
            }

            if self.bound[i] != texture {
                self.bound[i] = texture;
                changes.content.push(id.idx);
            }

            let visible = opacity > OPACITY_EPSILON && texture.is_some();
            if visible != self.visible[i] {
                self.visible[i] = visible;
                if visible {
                    changes.unhidden.push(id.idx);
                } else {
                    changes.hidden.push(id.idx);
                }
            }

            let parent_world = if has_parent {
                self.world_transform[parent as usize]
            } else {
                Transform3d::IDENTITY
            };
            let world = parent_world * self.pose[i].to_transform();
            if world != self.world_transform[i] || self.content_pose[i] != prev_content {
                self.world_transform[i] = world;
                changes.transforms.push(id.idx);
            }

            if self.removal[i] && opacity < OPACITY_EPSILON {
                expired.push(id);
            }
        }

        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);
        expired
    }

    /// Returns the current traversal order (depth-first pre-order over all
    /// roots).
    #[must_use]
    pub fn traversal_order(&self) -> &[u32] {
        &self.traversal_order
    }

    /// Rebuilds the depth-first pre-order traversal of all live layers.
    fn rebuild_traversal_order(&mut self) {
        self.traversal_order.clear();
        for idx in 0..self.len {
            if self.parent[idx as usize] == INVALID && !self.free_list.contains(&idx) {
                let order = self.subtree(self.id_at(idx));
                self.traversal_order.extend(order.iter().map(|id| id.idx));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use kurbo::Rect;

    use super::*;
    use crate::config::{LayerConfig, LayoutPolicy};
    use crate::layer::SurfaceId;
    use crate::markup::{Bounds, NodeKey};

    const VIEWPORT: Rect = Rect::new(0.0, 0.0, 1000.0, 1000.0);

    fn configured(store: &mut LayerStore, n: u64, policy: LayoutPolicy, rect: Rect) -> LayerId {
        let id = store.create_layer(NodeKey(n), policy);
        let _ = store.set_config(id, LayerConfig::default());
        store.cache_mut(id).set_bounds("", 0, Bounds::new(rect));
        id
    }

    fn step(store: &mut LayerStore, root: LayerId, lerp: f64) -> (FrameChanges, Vec<LayerId>) {
        let mut changes = FrameChanges::default();
        let expired = store.update_layout(root, VIEWPORT, &SceneConfig::new(), lerp, &mut changes);
        (changes, expired)
    }

    #[test]
    fn first_layout_snaps_then_eases() {
        let mut store = LayerStore::new();
        let root = configured(&mut store, 1, LayoutPolicy::Auto, VIEWPORT);
        let child = configured(
            &mut store,
            2,
            LayoutPolicy::Auto,
            Rect::new(0.0, 0.0, 100.0, 100.0),
        );
        store.add_child(root, child);

        let (changes, _) = step(&mut store, root, 0.5);
        assert!(changes.topology_changed);
        assert_eq!(changes.added, vec![root.idx, child.idx]);
        // centre (50, 50) vs (500, 500), pixel size 0.001
        assert_eq!(store.pose(child), store.target_pose(child));
        assert!((store.pose(child).position[0] + 0.45).abs() < 1e-12);
        assert!((store.pose(child).position[1] - 0.45).abs() < 1e-12);
        assert!((store.content_pose(child).scale[0] - 0.1).abs() < 1e-12);
        // Opacity fades in rather than snapping.
        assert_eq!(store.opacity(child), 0.5);

        // Resize: the target moves at once, the live pose eases toward it.
        store
            .cache_mut(child)
            .set_bounds("", 0, Bounds::new(Rect::new(0.0, 0.0, 200.0, 50.0)));
        let (changes, _) = step(&mut store, root, 0.5);
        assert!(changes.transforms.contains(&child.idx));
        assert!((store.content_target(child).scale[0] - 0.2).abs() < 1e-12);
        assert!((store.content_pose(child).scale[0] - 0.15).abs() < 1e-12);
        assert!((store.content_pose(child).scale[1] - 0.075).abs() < 1e-12);
    }

    #[test]
    fn auto_policy_leaves_roots_in_place() {
        let mut store = LayerStore::new();
        let auto = configured(&mut store, 1, LayoutPolicy::Auto, Rect::new(0.0, 0.0, 100.0, 100.0));
        let _ = step(&mut store, auto, 1.0);
        assert_eq!(store.pose(auto).position, [0.0, 0.0, 0.0]);
        assert!(store.target_pose(auto).position[0] < 0.0);

        let always = configured(
            &mut store,
            2,
            LayoutPolicy::Always,
            Rect::new(0.0, 0.0, 100.0, 100.0),
        );
        let _ = step(&mut store, always, 1.0);
        assert_eq!(store.pose(always), store.target_pose(always));
    }

    #[test]
    fn zero_area_fades_out_and_keeps_scale() {
        let mut store = LayerStore::new();
        let root = configured(&mut store, 1, LayoutPolicy::Auto, Rect::new(0.0, 0.0, 100.0, 40.0));
        let _ = step(&mut store, root, 1.0);
        assert_eq!(store.opacity(root), 1.0);
        let scale = store.content_target(root).scale;

        store
            .cache_mut(root)
            .set_bounds("", 0, Bounds::new(Rect::new(0.0, 0.0, 0.0, 40.0)));
        let _ = step(&mut store, root, 1.0);
        assert_eq!(store.target_opacity(root), 0.0);
        assert_eq!(store.opacity(root), 0.0);
        assert_eq!(store.content_target(root).scale, scale);
    }

    #[test]
    fn bound_texture_drives_visibility() {
        let mut store = LayerStore::new();
        let root = configured(&mut store, 1, LayoutPolicy::Auto, Rect::new(0.0, 0.0, 10.0, 10.0));
        let (changes, _) = step(&mut store, root, 1.0);
        assert!(!store.is_visible(root));
        assert!(changes.unhidden.is_empty());

        store.cache_mut(root).swap_texture("", 0, SurfaceId(7)).unwrap();
        let (changes, _) = step(&mut store, root, 1.0);
        assert_eq!(store.texture(root), Some(SurfaceId(7)));
        assert_eq!(changes.content, vec![root.idx]);
        assert_eq!(changes.unhidden, vec![root.idx]);

        let (changes, _) = step(&mut store, root, 1.0);
        assert!(changes.is_empty());
    }

    #[test]
    fn removal_expires_only_after_fade() {
        let mut store = LayerStore::new();
        let root = configured(&mut store, 1, LayoutPolicy::Auto, Rect::new(0.0, 0.0, 10.0, 10.0));
        let _ = step(&mut store, root, 1.0);
        store.request_removal(root);

        let mut frames = 0;
        loop {
            let (_, expired) = step(&mut store, root, 0.5);
            frames += 1;
            if expired.is_empty() {
                assert!(store.opacity(root) >= OPACITY_EPSILON);
            } else {
                assert_eq!(expired, vec![root]);
                assert!(store.opacity(root) < OPACITY_EPSILON);
                break;
            }
            assert!(frames < 32, "layer never expired");
        }
        assert!(frames > 1);
    }
}
