// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays layer storage with allocation, topology, and property management.

use alloc::string::String;
use alloc::vec::Vec;

use understory_dirty::{CycleHandling, DirtyTracker};

use super::id::{INVALID, LayerId, SurfaceId};
use super::state::StateCache;
use super::traverse::Children;
use crate::config::{LayerConfig, LayoutPolicy};
use crate::dirty;
use crate::markup::NodeKey;
use crate::pose::Pose;
use crate::transform::Transform3d;

/// Struct-of-arrays storage for all layers.
///
/// Layers are addressed by [`LayerId`] handles. Internally, each layer occupies
/// a slot in parallel arrays. Disposed layers are recycled via a free list,
/// and generation counters prevent stale handle access.
#[derive(Debug)]
pub struct LayerStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Identity and configuration --
    pub(crate) node: Vec<NodeKey>,
    pub(crate) config: Vec<LayerConfig>,
    pub(crate) cache: Vec<StateCache>,
    pub(crate) state: Vec<String>,
    pub(crate) hover: Vec<u32>,
    pub(crate) policy: Vec<LayoutPolicy>,
    pub(crate) video: Vec<bool>,

    // -- Layout (written by update_layout) --
    pub(crate) pose: Vec<Pose>,
    pub(crate) target_pose: Vec<Pose>,
    pub(crate) content_pose: Vec<Pose>,
    pub(crate) content_target: Vec<Pose>,
    pub(crate) opacity: Vec<f64>,
    pub(crate) target_opacity: Vec<f64>,
    pub(crate) laid_out: Vec<bool>,
    pub(crate) world_transform: Vec<Transform3d>,
    pub(crate) visible: Vec<bool>,
    pub(crate) bound: Vec<Option<SurfaceId>>,

    // -- Lifecycle --
    pub(crate) removal: Vec<bool>,
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Traversal cache --
    pub(crate) traversal_order: Vec<u32>,
    pub(crate) traversal_dirty: bool,
}

impl Default for LayerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStore {
    /// Creates an empty layer store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            node: Vec::new(),
            config: Vec::new(),
            cache: Vec::new(),
            state: Vec::new(),
            hover: Vec::new(),
            policy: Vec::new(),
            video: Vec::new(),
            pose: Vec::new(),
            target_pose: Vec::new(),
            content_pose: Vec::new(),
            content_target: Vec::new(),
            opacity: Vec::new(),
            target_opacity: Vec::new(),
            laid_out: Vec::new(),
            world_transform: Vec::new(),
            visible: Vec::new(),
            bound: Vec::new(),
            removal: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            traversal_order: Vec::new(),
            traversal_dirty: true,
        }
    }

    // -- Allocation API --

    /// Creates a layer for `node` and returns its handle.
    ///
    /// The layer starts unconfigured, transparent, with an empty cache and no
    /// parent. It is marked dirty on both channels so the next refresh reads
    /// its configuration, walks its children and rasterizes it.
    pub fn create_layer(&mut self, node: NodeKey, policy: LayoutPolicy) -> LayerId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.node[i] = node;
            self.config[i] = LayerConfig::default();
            self.cache[i] = StateCache::new();
            self.state[i] = String::new();
            self.hover[i] = 0;
            self.policy[i] = policy;
            self.video[i] = false;
            self.pose[i] = Pose::IDENTITY;
            self.target_pose[i] = Pose::IDENTITY;
            self.content_pose[i] = Pose::IDENTITY;
            self.content_target[i] = Pose::IDENTITY;
            self.opacity[i] = 0.0;
            self.target_opacity[i] = 0.0;
            self.laid_out[i] = false;
            self.world_transform[i] = Transform3d::IDENTITY;
            self.visible[i] = false;
            self.bound[i] = None;
            self.removal[i] = false;
            idx
        } else {
            // Allocate a new slot.
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.node.push(node);
            self.config.push(LayerConfig::default());
            self.cache.push(StateCache::new());
            self.state.push(String::new());
            self.hover.push(0);
            self.policy.push(policy);
            self.video.push(false);
            self.pose.push(Pose::IDENTITY);
            self.target_pose.push(Pose::IDENTITY);
            self.content_pose.push(Pose::IDENTITY);
            self.content_target.push(Pose::IDENTITY);
            self.opacity.push(0.0);
            self.target_opacity.push(0.0);
            self.laid_out.push(false);
            self.world_transform.push(Transform3d::IDENTITY);
            self.visible.push(false);
            self.bound.push(None);
            self.removal.push(false);
            self.generation.push(0);
            idx
        };

        self.traversal_dirty = true;
        self.pending_added.push(idx);
        self.dirty.mark(idx, dirty::RASTER);
        self.dirty.mark(idx, dirty::TOPOLOGY);

        self.id_at(idx)
    }

    /// Destroys a layer, freeing its slot for reuse.
    ///
    /// Bitmaps still held in the layer's cache are dropped with it; take them
    /// out first with [`StateCache::drain_textures`].
    ///
    /// # Panics
    ///
    /// Panics if the layer has children (destroy them first) or if the handle
    /// is stale.
    pub fn destroy_layer(&mut self, id: LayerId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy layer with children"
        );

        if self.parent[idx as usize] != INVALID {
            self.unlink_from_parent(idx);
        }

        self.dirty.remove_key(idx);
        self.cache[idx as usize] = StateCache::new();

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;

        self.free_list.push(idx);
        self.traversal_dirty = true;
        self.pending_removed.push(idx);
    }

    /// Returns whether the given handle refers to a live layer.
    #[must_use]
    pub fn is_alive(&self, id: LayerId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    /// Number of live layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    /// Returns `true` if there are no live layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, or if `child` already has a parent.
    pub fn add_child(&mut self, parent: LayerId, child: LayerId) {
        self.validate(parent);
        self.validate(child);
        assert!(
            self.parent[child.idx as usize] == INVALID,
            "child already has a parent"
        );
        self.link_last(parent.idx, child.idx);
    }

    /// Removes `child` from its current parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the layer has no parent.
    pub fn remove_from_parent(&mut self, child: LayerId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "layer has no parent");
        self.unlink_from_parent(c);
        self.traversal_dirty = true;
    }

    /// Moves `child` to the end of `new_parent`'s children.
    ///
    /// If `child` already has a parent, it is removed first.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, or if `child` is `new_parent` or one
    /// of its ancestors.
    pub fn reparent(&mut self, child: LayerId, new_parent: LayerId) {
        self.validate(child);
        self.validate(new_parent);
        assert!(
            !self.is_ancestor_or_self(child, new_parent),
            "reparenting would create a cycle"
        );
        if self.parent[child.idx as usize] != INVALID {
            self.unlink_from_parent(child.idx);
        }
        self.link_last(new_parent.idx, child.idx);
    }

    /// Returns the parent of a layer, if any.
    #[must_use]
    pub fn parent(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// Returns an iterator over the direct children of a layer.
    #[must_use]
    pub fn children(&self, id: LayerId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns the topmost ancestor of `id` (or `id` itself).
    #[must_use]
    pub fn root_of(&self, id: LayerId) -> LayerId {
        self.validate(id);
        let mut idx = id.idx;
        while self.parent[idx as usize] != INVALID {
            idx = self.parent[idx as usize];
        }
        self.id_at(idx)
    }

    /// Returns `true` if `ancestor` is `id` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: LayerId, id: LayerId) -> bool {
        self.validate(ancestor);
        self.validate(id);
        let mut idx = id.idx;
        loop {
            if idx == ancestor.idx {
                return true;
            }
            idx = self.parent[idx as usize];
            if idx == INVALID {
                return false;
            }
        }
    }

    /// Number of layer ancestors.
    #[must_use]
    pub fn depth(&self, id: LayerId) -> u32 {
        self.validate(id);
        let mut depth = 0;
        let mut idx = self.parent[id.idx as usize];
        while idx != INVALID {
            depth += 1;
            idx = self.parent[idx as usize];
        }
        depth
    }

    // -- Identity and configuration --

    /// The element this layer wraps.
    #[must_use]
    pub fn node(&self, id: LayerId) -> NodeKey {
        self.validate(id);
        self.node[id.idx as usize]
    }

    /// The configuration read at the last refresh.
    #[must_use]
    pub fn config(&self, id: LayerId) -> &LayerConfig {
        self.validate(id);
        &self.config[id.idx as usize]
    }

    /// Stores a freshly read configuration and reconciles the cache with it.
    ///
    /// Returns the bitmaps of purged cache entries, which the caller must
    /// release.
    pub fn set_config(&mut self, id: LayerId, config: LayerConfig) -> Vec<SurfaceId> {
        self.validate(id);
        let i = id.idx as usize;
        let released = self.cache[i].configure(&config.states, config.hover_depth);
        self.config[i] = config;
        released
    }

    /// The layer's bitmap cache.
    #[must_use]
    pub fn cache(&self, id: LayerId) -> &StateCache {
        self.validate(id);
        &self.cache[id.idx as usize]
    }

    /// Mutable access to the layer's bitmap cache.
    #[must_use]
    pub fn cache_mut(&mut self, id: LayerId) -> &mut StateCache {
        self.validate(id);
        &mut self.cache[id.idx as usize]
    }

    /// The state selected at the last update.
    #[must_use]
    pub fn selected_state(&self, id: LayerId) -> &str {
        self.validate(id);
        &self.state[id.idx as usize]
    }

    /// Sets the selected state.
    pub fn set_selected_state(&mut self, id: LayerId, state: String) {
        self.validate(id);
        self.state[id.idx as usize] = state;
    }

    /// Current hover level (0 = not hovered).
    #[must_use]
    pub fn hover_level(&self, id: LayerId) -> u32 {
        self.validate(id);
        self.hover[id.idx as usize]
    }

    /// Sets the hover level.
    pub fn set_hover_level(&mut self, id: LayerId, level: u32) {
        self.validate(id);
        self.hover[id.idx as usize] = level;
    }

    /// The layout policy for the panel pose.
    #[must_use]
    pub fn layout_policy(&self, id: LayerId) -> LayoutPolicy {
        self.validate(id);
        self.policy[id.idx as usize]
    }

    /// Sets the layout policy for the panel pose.
    pub fn set_layout_policy(&mut self, id: LayerId, policy: LayoutPolicy) {
        self.validate(id);
        self.policy[id.idx as usize] = policy;
    }

    /// Whether the layer shows a live video surface instead of rasterized
    /// markup.
    #[must_use]
    pub fn is_video(&self, id: LayerId) -> bool {
        self.validate(id);
        self.video[id.idx as usize]
    }

    /// Marks the layer as video-backed.
    pub fn set_video(&mut self, id: LayerId, video: bool) {
        self.validate(id);
        self.video[id.idx as usize] = video;
    }

    // -- Layout getters --

    /// Live panel pose relative to the parent panel.
    #[must_use]
    pub fn pose(&self, id: LayerId) -> Pose {
        self.validate(id);
        self.pose[id.idx as usize]
    }

    /// Panel pose computed from the layer's box.
    #[must_use]
    pub fn target_pose(&self, id: LayerId) -> Pose {
        self.validate(id);
        self.target_pose[id.idx as usize]
    }

    /// Live pose of the content quad relative to the panel.
    #[must_use]
    pub fn content_pose(&self, id: LayerId) -> Pose {
        self.validate(id);
        self.content_pose[id.idx as usize]
    }

    /// Content quad pose computed from the layer's box.
    #[must_use]
    pub fn content_target(&self, id: LayerId) -> Pose {
        self.validate(id);
        self.content_target[id.idx as usize]
    }

    /// Sets the live panel pose.
    ///
    /// Meant for panels that do not follow layout (roots under
    /// [`LayoutPolicy::Auto`], or [`LayoutPolicy::Never`]); a following panel
    /// keeps moving toward its target.
    pub fn set_pose(&mut self, id: LayerId, pose: Pose) {
        self.validate(id);
        self.pose[id.idx as usize] = pose;
    }

    /// Live opacity.
    #[must_use]
    pub fn opacity(&self, id: LayerId) -> f64 {
        self.validate(id);
        self.opacity[id.idx as usize]
    }

    /// Opacity the layer is fading toward.
    #[must_use]
    pub fn target_opacity(&self, id: LayerId) -> f64 {
        self.validate(id);
        self.target_opacity[id.idx as usize]
    }

    /// Whether the layer is shown: opaque enough and with a bitmap bound.
    #[must_use]
    pub fn is_visible(&self, id: LayerId) -> bool {
        self.validate(id);
        self.visible[id.idx as usize]
    }

    /// The bitmap currently bound to the content quad.
    #[must_use]
    pub fn texture(&self, id: LayerId) -> Option<SurfaceId> {
        self.validate(id);
        self.bound[id.idx as usize]
    }

    /// World transform of the panel, as of the last update.
    #[must_use]
    pub fn world_transform(&self, id: LayerId) -> Transform3d {
        self.validate(id);
        self.world_transform[id.idx as usize]
    }

    /// World transform of the unit content quad.
    #[must_use]
    pub fn content_world_transform(&self, id: LayerId) -> Transform3d {
        self.validate(id);
        self.content_world_at(id.idx)
    }

    // -- Lifecycle --

    /// Flags the layer for removal once it has faded out.
    ///
    /// Returns `true` if the flag was newly set.
    pub fn request_removal(&mut self, id: LayerId) -> bool {
        self.validate(id);
        !core::mem::replace(&mut self.removal[id.idx as usize], true)
    }

    /// Clears a pending removal. Returns `true` if one was pending.
    pub fn cancel_removal(&mut self, id: LayerId) -> bool {
        self.validate(id);
        core::mem::replace(&mut self.removal[id.idx as usize], false)
    }

    /// Whether removal has been requested.
    #[must_use]
    pub fn removal_requested(&self, id: LayerId) -> bool {
        self.validate(id);
        self.removal[id.idx as usize]
    }

    // -- Dirty tracking --

    /// Marks the layer's pixels stale.
    pub fn mark_dirty(&mut self, id: LayerId) {
        self.validate(id);
        self.dirty.mark(id.idx, dirty::RASTER);
    }

    /// Marks the layer's child set for a re-walk.
    pub fn mark_topology(&mut self, id: LayerId) {
        self.validate(id);
        self.dirty.mark(id.idx, dirty::TOPOLOGY);
    }

    /// Drains a dirty channel, returning live layers in slot order.
    pub(crate) fn drain_dirty(&mut self, channel: understory_dirty::Channel) -> Vec<LayerId> {
        let mut drained: Vec<u32> = self.dirty.drain(channel).deterministic().run().collect();
        drained.sort_unstable();
        drained.dedup();
        drained
            .into_iter()
            .filter(|&idx| idx < self.len && !self.free_list.contains(&idx))
            .map(|idx| self.id_at(idx))
            .collect()
    }

    // -- Raw-index accessors for presenters --
    //
    // These accept raw slot indices (as found in `FrameChanges`) rather than
    // `LayerId` handles, skipping generation validation.

    /// Returns the panel world transform at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn world_transform_at(&self, idx: u32) -> Transform3d {
        self.check_index(idx);
        self.world_transform[idx as usize]
    }

    /// Returns the content quad world transform at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn content_world_at(&self, idx: u32) -> Transform3d {
        self.check_index(idx);
        self.world_transform[idx as usize] * self.content_pose[idx as usize].to_transform()
    }

    /// Returns the live opacity at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn opacity_at(&self, idx: u32) -> f64 {
        self.check_index(idx);
        self.opacity[idx as usize]
    }

    /// Returns the bound bitmap at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn texture_at(&self, idx: u32) -> Option<SurfaceId> {
        self.check_index(idx);
        self.bound[idx as usize]
    }

    /// Returns the wrapped element at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn node_at(&self, idx: u32) -> NodeKey {
        self.check_index(idx);
        self.node[idx as usize]
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: LayerId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale LayerId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    fn check_index(&self, idx: u32) {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
    }

    /// Handle for the current occupant of slot `idx`.
    pub(crate) fn id_at(&self, idx: u32) -> LayerId {
        LayerId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    fn link_last(&mut self, p: u32, c: u32) {
        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }
        self.traversal_dirty = true;
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }
}
