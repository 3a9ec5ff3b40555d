// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-scene driver tying the pieces together.
//!
//! A [`LayerScene`] owns the layer store, the identity registry, the
//! rasterization pipeline, the render context and the host's paint engine
//! and resource loader. The host calls [`update`](LayerScene::update) once
//! per frame and [`rasterize`](LayerScene::rasterize) whenever it has idle
//! time.
//!
//! One update runs these steps in order:
//!
//! 1. Route the document events queued since the previous update and mark
//!    the owning layers dirty.
//! 2. Select each layer's state from its class list.
//! 3. Cast the root's interaction rays, assign hover levels and move the
//!    `hover` class.
//! 4. Advance layout, opacity and texture binding.
//! 5. Dispose layers whose fade-out completed.
//! 6. Refresh dirty layers (configuration, child walk) and queue the ones
//!    whose pixels are stale.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::ToString;
use alloc::vec::Vec;

use kurbo::Point;

use crate::config::{LayerConfig, SceneConfig, attr, is_layer_element, is_video};
use crate::context::RenderContext;
use crate::dirty;
use crate::error::{LayerError, Result};
use crate::invalidate::{Invalidation, route_event};
use crate::layer::{FrameChanges, LayerId, LayerRegistry, LayerStore};
use crate::markup::{Document, NodeKey};
use crate::raster::{Budget, PaintEngine, RasterPipeline, RasterReport, ResourceLoader};
use crate::raycast::{LayerHit, Ray, RaySource};
use crate::trace::{
    EnqueueEvent, FrameSummary, InvalidationEvent, InvalidationSource, LayerLifecycleEvent,
    LifecycleKind, Tracer,
};

/// Layers projected from one document, with their caches and scheduling.
pub struct LayerScene<P: PaintEngine, L: ResourceLoader> {
    store: LayerStore,
    registry: LayerRegistry,
    pipeline: RasterPipeline<P::Commands>,
    ctx: RenderContext,
    config: SceneConfig,
    rays: BTreeMap<LayerId, Vec<RaySource>>,
    engine: P,
    loader: L,
    frame_index: u64,
}

impl<P: PaintEngine, L: ResourceLoader> core::fmt::Debug for LayerScene<P, L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LayerScene")
            .field("layers", &self.store.len())
            .field("pipeline", &self.pipeline)
            .field("ctx", &self.ctx)
            .field("config", &self.config)
            .field("frame_index", &self.frame_index)
            .finish_non_exhaustive()
    }
}

impl<P: PaintEngine, L: ResourceLoader> LayerScene<P, L> {
    /// Creates an empty scene.
    #[must_use]
    pub fn new(engine: P, loader: L, config: SceneConfig) -> Self {
        Self {
            store: LayerStore::new(),
            registry: LayerRegistry::new(),
            pipeline: RasterPipeline::new(),
            ctx: RenderContext::new(config.device_pixel_ratio),
            config,
            rays: BTreeMap::new(),
            engine,
            loader,
            frame_index: 0,
        }
    }

    // -- Accessors --

    /// The layer store, for presenters.
    #[must_use]
    pub fn store(&self) -> &LayerStore {
        &self.store
    }

    /// Mutable access to the store, e.g. to position root panels.
    pub fn store_mut(&mut self) -> &mut LayerStore {
        &mut self.store
    }

    /// The element-to-layer registry.
    #[must_use]
    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    /// The layer backed by `node`.
    #[must_use]
    pub fn layer_for(&self, node: NodeKey) -> Option<LayerId> {
        self.registry.get(node)
    }

    /// The rasterization pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &RasterPipeline<P::Commands> {
        &self.pipeline
    }

    /// The render context.
    #[must_use]
    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    /// Scene settings.
    #[must_use]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// The paint engine.
    #[must_use]
    pub fn engine(&self) -> &P {
        &self.engine
    }

    /// Mutable access to the paint engine.
    pub fn engine_mut(&mut self) -> &mut P {
        &mut self.engine
    }

    /// The resource loader.
    #[must_use]
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Mutable access to the resource loader.
    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    /// Number of completed updates.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    // -- Roots --

    /// Makes `node` a root layer and discovers every layer below it.
    ///
    /// The root and its descendants are configured right away and queued for
    /// rasterization.
    pub fn create_root(&mut self, doc: &mut dyn Document, node: NodeKey) -> Result<LayerId> {
        self.create_root_traced(doc, node, &mut Tracer::none())
    }

    /// [`create_root`](Self::create_root) with tracing.
    pub fn create_root_traced(
        &mut self,
        doc: &mut dyn Document,
        node: NodeKey,
        tracer: &mut Tracer<'_>,
    ) -> Result<LayerId> {
        if !doc.contains(node) {
            return Err(LayerError::UnknownNode(node));
        }
        if let Some(layer) = self.registry.get(node) {
            return Err(LayerError::AlreadyLayer { node, layer });
        }
        let root = self.store.create_layer(node, self.config.layout_policy);
        self.registry.insert(node, root);
        doc.set_attribute(node, attr::LAYER, &root.index().to_string());
        tracer.lifecycle(&LayerLifecycleEvent {
            layer_index: root.index(),
            node,
            kind: LifecycleKind::Created,
        });
        self.refresh_dirty(doc, tracer);
        Ok(root)
    }

    /// Replaces the interaction rays cast from `root` each update.
    pub fn set_interaction_rays(&mut self, root: LayerId, rays: Vec<RaySource>) -> Result<()> {
        self.check_root(root)?;
        self.rays.insert(root, rays);
        Ok(())
    }

    /// The nearest layer below `root` hit by `ray`.
    pub fn hit_test(&self, root: LayerId, ray: &Ray) -> Result<Option<LayerHit>> {
        self.check_root(root)?;
        Ok(self.store.raycast(root, ray))
    }

    /// Changes the device pixel ratio and queues every layer to be drawn at
    /// the new resolution.
    ///
    /// Zero, negative and non-finite ratios are rejected and change nothing.
    pub fn set_device_pixel_ratio(&mut self, ratio: f64) -> Result<()> {
        if !(ratio.is_finite() && ratio > 0.0) {
            return Err(LayerError::InvalidPixelRatio);
        }
        self.config.device_pixel_ratio = ratio;
        self.ctx.set_device_pixel_ratio(ratio);
        let live: Vec<LayerId> = self.registry.iter().map(|(_, l)| l).collect();
        for layer in live {
            if self.store.is_alive(layer) {
                self.store.mark_dirty(layer);
            }
        }
        Ok(())
    }

    // -- Frame update --

    /// Advances the scene under `root` by one frame.
    ///
    /// `lerp` is the interpolation factor toward target poses and opacities
    /// (1 snaps). Returns the changes to hand to a
    /// [`Presenter`](crate::backend::Presenter).
    pub fn update(
        &mut self,
        root: LayerId,
        doc: &mut dyn Document,
        lerp: f64,
    ) -> Result<FrameChanges> {
        self.update_traced(root, doc, lerp, &mut Tracer::none())
    }

    /// [`update`](Self::update) with tracing.
    pub fn update_traced(
        &mut self,
        root: LayerId,
        doc: &mut dyn Document,
        lerp: f64,
        tracer: &mut Tracer<'_>,
    ) -> Result<FrameChanges> {
        self.check_root(root)?;

        for event in doc.take_events() {
            let Some(routed) = route_event(&*doc, &self.registry, &self.store, &event) else {
                continue;
            };
            let structural = routed.invalidation == Invalidation::Structure;
            self.store.mark_dirty(routed.layer);
            if structural {
                self.store.mark_topology(routed.layer);
            }
            tracer.invalidation(&InvalidationEvent {
                layer_index: routed.layer.index(),
                target: routed.target,
                source: routed.source,
                structural,
            });
        }

        for id in self.store.subtree(root) {
            let classes = doc.classes(self.store.node(id));
            let state = self.store.config(id).select_state(&classes);
            self.store.set_selected_state(id, state);
        }

        self.update_hover(root, doc);

        let mut changes = FrameChanges::default();
        let expired =
            self.store
                .update_layout(root, doc.viewport(), &self.config, lerp, &mut changes);
        for layer in &expired {
            if self.store.is_alive(*layer) {
                for id in self.store.subtree_children_first(*layer) {
                    self.dispose(id, tracer);
                }
            }
        }
        if !expired.is_empty() {
            changes.removed.append(&mut self.store.pending_removed);
            changes.topology_changed = true;
        }

        let dirty = self.refresh_dirty(doc, tracer);

        let hovered = self
            .store
            .subtree(root)
            .into_iter()
            .filter(|id| self.store.hover_level(*id) > 0)
            .count();
        tracer.frame_summary(&FrameSummary {
            frame_index: self.frame_index,
            layers: count_u32(self.store.len()),
            hovered: count_u32(hovered),
            dirty,
            expired: count_u32(expired.len()),
            queue_len: count_u32(self.pipeline.queue().len()),
            in_flight_batches: count_u32(self.pipeline.in_flight_batches()),
        });
        self.frame_index += 1;
        Ok(changes)
    }

    // -- Rasterization --

    /// Measures queued layers while `budget` has time left and runs draws
    /// whose resources have settled.
    pub fn rasterize(&mut self, doc: &mut dyn Document, budget: &dyn Budget) -> RasterReport {
        self.rasterize_traced(doc, budget, &mut Tracer::none())
    }

    /// [`rasterize`](Self::rasterize) with tracing.
    pub fn rasterize_traced(
        &mut self,
        doc: &mut dyn Document,
        budget: &dyn Budget,
        tracer: &mut Tracer<'_>,
    ) -> RasterReport {
        self.pipeline.rasterize(
            &mut self.store,
            doc,
            &mut self.ctx,
            &mut self.engine,
            &mut self.loader,
            budget,
            tracer,
        )
    }

    // -- Teardown --

    /// Disposes every layer, releases every bitmap and removes the hover
    /// classes this scene wrote.
    ///
    /// Draws still in flight run on the next [`rasterize`](Self::rasterize)
    /// call and release their bitmaps right away.
    pub fn teardown(&mut self, doc: &mut dyn Document) {
        self.ctx.teardown(doc);
        self.rays.clear();
        let roots: Vec<LayerId> = self
            .registry
            .iter()
            .map(|(_, l)| l)
            .filter(|l| self.store.is_alive(*l) && self.store.parent(*l).is_none())
            .collect();
        let mut tracer = Tracer::none();
        for root in roots {
            for id in self.store.subtree_children_first(root) {
                self.dispose(id, &mut tracer);
            }
        }
    }

    // -- Internals --

    fn check_root(&self, root: LayerId) -> Result<()> {
        if !self.store.is_alive(root) {
            return Err(LayerError::StaleLayer(root));
        }
        if self.store.parent(root).is_some() {
            return Err(LayerError::NotRoot(root));
        }
        Ok(())
    }

    /// Drains both dirty channels until no layer is left dirty, refreshing
    /// each drained layer. Returns how many layers were refreshed.
    fn refresh_dirty(&mut self, doc: &mut dyn Document, tracer: &mut Tracer<'_>) -> u32 {
        let mut refreshed = 0;
        loop {
            let raster = self.store.drain_dirty(dirty::RASTER);
            let topology = self.store.drain_dirty(dirty::TOPOLOGY);
            if raster.is_empty() && topology.is_empty() {
                break;
            }
            let layers: BTreeSet<LayerId> = raster.iter().chain(&topology).copied().collect();
            for layer in layers {
                if !self.store.is_alive(layer) {
                    continue;
                }
                refreshed += 1;
                let walk = topology.contains(&layer);
                if self.refresh(doc, layer, walk, tracer)
                    && raster.contains(&layer)
                    && self.pipeline.enqueue(layer)
                {
                    tracer.enqueue(&EnqueueEvent {
                        layer_index: layer.index(),
                        queue_len: count_u32(self.pipeline.queue().len()),
                    });
                }
            }
        }
        refreshed
    }

    /// Re-reads a layer's configuration and, with `walk`, its child layers.
    ///
    /// Returns `false` if the layer is fading out and should not be drawn.
    fn refresh(
        &mut self,
        doc: &mut dyn Document,
        layer: LayerId,
        walk: bool,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        let node = self.store.node(layer);
        if let Some(parent) = self.store.parent(layer)
            && (!doc.contains(node) || !is_layer_element(&*doc, node))
        {
            if self.store.request_removal(layer) {
                tracer.lifecycle(&LayerLifecycleEvent {
                    layer_index: layer.index(),
                    node,
                    kind: LifecycleKind::RemovalRequested,
                });
                self.store.mark_dirty(parent);
                tracer.invalidation(&InvalidationEvent {
                    layer_index: parent.index(),
                    target: node,
                    source: InvalidationSource::Topology,
                    structural: false,
                });
            }
            return false;
        }
        if self.store.removal_requested(layer) {
            return false;
        }

        for surface in self.store.set_config(layer, LayerConfig::read(&*doc, node)) {
            self.engine.release(surface);
        }
        self.store.set_video(layer, is_video(&*doc, node));

        if walk {
            let sync =
                self.registry
                    .sync_children(&mut self.store, doc, layer, self.config.layout_policy);
            for id in &sync.created {
                tracer.lifecycle(&LayerLifecycleEvent {
                    layer_index: id.index(),
                    node: self.store.node(*id),
                    kind: LifecycleKind::Created,
                });
            }
            for id in &sync.orphaned {
                tracer.lifecycle(&LayerLifecycleEvent {
                    layer_index: id.index(),
                    node: self.store.node(*id),
                    kind: LifecycleKind::RemovalRequested,
                });
            }
        }
        true
    }

    /// Casts the root's rays and assigns hover levels and hover classes.
    fn update_hover(&mut self, root: LayerId, doc: &mut dyn Document) {
        let subtree = self.store.subtree(root);
        for id in &subtree {
            self.store.set_hover_level(*id, 0);
        }

        let mut hovered = BTreeSet::new();
        let rays: Vec<Ray> = self
            .rays
            .get(&root)
            .map(|sources| sources.iter().filter_map(RaySource::resolve).collect())
            .unwrap_or_default();
        for ray in rays {
            let Some(hit) = self.store.raycast(root, &ray) else {
                continue;
            };

            let mut level = 1;
            let mut current = Some(hit.layer);
            while let Some(layer) = current {
                if level <= self.store.config(layer).hover_depth
                    && level > self.store.hover_level(layer)
                {
                    self.store.set_hover_level(layer, level);
                }
                level += 1;
                current = self.store.parent(layer);
            }

            let leaf = hit.layer;
            let bounds = self
                .store
                .cache(leaf)
                .resolve_bounds(self.store.selected_state(leaf), self.store.hover_level(leaf));
            let Some(bounds) = bounds else {
                continue;
            };
            let point = bounds.point_at(hit.uv);
            let mut node = Some(self.deepest_element_at(&*doc, self.store.node(leaf), point));
            while let Some(n) = node {
                hovered.insert(n);
                node = doc.parent(n);
            }
        }
        self.ctx.reconcile_hover(doc, root, hovered);
    }

    /// The deepest element below `start` whose box contains `point`, not
    /// entering nested layers. Later siblings win, as they paint on top.
    fn deepest_element_at(&self, doc: &dyn Document, start: NodeKey, point: Point) -> NodeKey {
        let options = self.ctx.measure_options();
        let mut current = start;
        'descend: loop {
            for child in doc.children(current).into_iter().rev() {
                if is_layer_element(doc, child) {
                    continue;
                }
                if let Some(b) = doc.measure(child, options)
                    && b.rect.contains(point)
                {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// Destroys one childless layer and everything that refers to it.
    fn dispose(&mut self, layer: LayerId, tracer: &mut Tracer<'_>) {
        let node = self.store.node(layer);
        if self.registry.get(node) == Some(layer) {
            self.registry.remove(node);
        }
        self.pipeline.forget(layer);
        self.rays.remove(&layer);
        for surface in self.store.cache_mut(layer).drain_textures() {
            self.engine.release(surface);
        }
        tracer.lifecycle(&LayerLifecycleEvent {
            layer_index: layer.index(),
            node,
            kind: LifecycleKind::Disposed,
        });
        self.store.destroy_layer(layer);
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "layer and queue counts are far below u32::MAX"
)]
fn count_u32(n: usize) -> u32 {
    n as u32
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec;

    use kurbo::Rect;

    use super::*;
    use crate::config::HOVER_CLASS;
    use crate::markup::{MemoryDocument, RefreshCause};
    use crate::raster::{
        FixedSlice, PixelSize, ResourceHandle, ResourceKey, ResourceState, Unbounded,
    };
    use crate::testing::{FakeLoader, FakePaint};
    use crate::time::{Duration, HostTime, ManualClock};

    type Scene = LayerScene<FakePaint, FakeLoader>;

    const VIEWPORT: Rect = Rect::new(0.0, 0.0, 800.0, 600.0);

    fn scene_with(engine: FakePaint) -> Scene {
        LayerScene::new(engine, FakeLoader::new(), SceneConfig::new().with_pixel_size(0.01))
    }

    fn layer_el(doc: &mut MemoryDocument, parent: NodeKey, rect: Rect) -> NodeKey {
        let n = doc.create_element(parent, "div", rect);
        doc.set_attribute(n, attr::LAYER, "");
        n
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| String::from(*s)).collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// A body root with one child layer `card` at the top-left corner.
    fn card_scene(
        engine: impl FnOnce(NodeKey) -> FakePaint,
    ) -> (MemoryDocument, Scene, LayerId, LayerId, NodeKey) {
        let mut doc = MemoryDocument::new(VIEWPORT);
        let body = doc.root();
        let card = layer_el(&mut doc, body, Rect::new(0.0, 0.0, 200.0, 100.0));
        doc.take_events();
        let mut scene = scene_with(engine(card));
        let root = scene.create_root(&mut doc, body).unwrap();
        let layer = scene.layer_for(card).unwrap();
        (doc, scene, root, layer, card)
    }

    #[test]
    fn declared_states_are_drawn_once_and_selected_by_class() {
        let mut doc = MemoryDocument::new(VIEWPORT);
        let body = doc.root();
        let panel = layer_el(&mut doc, body, Rect::new(0.0, 0.0, 200.0, 100.0));
        doc.set_attribute(panel, attr::STATES, "near far");
        doc.set_class_rect(panel, "far", Rect::new(0.0, 0.0, 100.0, 50.0));
        doc.take_events();

        let mut scene = scene_with(FakePaint::new());
        let root = scene.create_root(&mut doc, panel).unwrap();
        let keys: Vec<(&str, u32)> = scene.store().cache(root).keys().collect();
        assert_eq!(keys, vec![("", 0), ("far", 0), ("near", 0)]);
        assert_eq!(scene.pipeline().queue().len(), 1);

        let report = scene.rasterize(&mut doc, &Unbounded);
        assert_eq!(report.measured, 1);
        assert_eq!(report.jobs, 3);
        assert_eq!(report.drawn, 3);
        assert!(scene.pipeline().is_idle());
        let seen: Vec<Vec<String>> = scene
            .engine()
            .painted
            .iter()
            .map(|s| s.classes.clone())
            .collect();
        assert_eq!(seen, vec![strings(&[]), strings(&["near"]), strings(&["far"])]);
        // The element's own classes are back in place.
        assert!(doc.classes(panel).is_empty());

        scene.update(root, &mut doc, 1.0).unwrap();
        let default = scene.store().texture(root).unwrap();
        assert!(scene.engine().classes_of(default).unwrap().is_empty());
        assert!(close(scene.store().content_pose(root).scale[0], 2.0));

        doc.set_classes(panel, &strings(&["far"]));
        let changes = scene.update(root, &mut doc, 1.0).unwrap();
        assert_eq!(scene.store().selected_state(root), "far");
        let far = scene.store().texture(root).unwrap();
        assert_ne!(far, default);
        assert_eq!(scene.engine().classes_of(far).unwrap().to_vec(), strings(&["far"]));
        assert!(changes.content.contains(&root.index()));
        assert!(close(scene.store().content_pose(root).scale[0], 1.0));

        // Selecting a cached state does not rasterize again.
        assert!(scene.pipeline().queue().is_empty());
        assert_eq!(scene.engine().paints_of(panel), 3);
    }

    #[test]
    fn resize_keeps_old_picture_until_redrawn_then_eases() {
        let (mut doc, mut scene, root, layer, card) = card_scene(|_| FakePaint::new());
        scene.rasterize(&mut doc, &Unbounded);
        scene.update(root, &mut doc, 0.5).unwrap();
        assert!(close(scene.store().content_pose(layer).scale[0], 2.0));
        let first = scene.store().texture(layer).unwrap();

        doc.set_rect(card, Rect::new(0.0, 0.0, 400.0, 100.0));
        scene.update(root, &mut doc, 0.5).unwrap();
        assert_eq!(scene.store().texture(layer), Some(first));
        assert!(close(scene.store().content_pose(layer).scale[0], 2.0));
        assert!(scene.pipeline().queue().contains(layer));

        scene.rasterize(&mut doc, &Unbounded);
        let changes = scene.update(root, &mut doc, 0.5).unwrap();
        assert!(close(scene.store().content_target(layer).scale[0], 4.0));
        assert!(close(scene.store().content_pose(layer).scale[0], 3.0));
        assert!(changes.transforms.contains(&layer.index()));

        let second = scene.store().texture(layer).unwrap();
        assert_ne!(second, first);
        assert_eq!(scene.engine().released, vec![first]);

        for _ in 0..60 {
            scene.update(root, &mut doc, 0.5).unwrap();
        }
        assert!(close(scene.store().content_pose(layer).scale[0], 4.0));
    }

    #[test]
    fn hover_reaches_ancestors_within_their_depth() {
        let mut doc = MemoryDocument::new(VIEWPORT);
        let body = doc.root();
        doc.set_attribute(body, attr::HOVER_DEPTH, "2");
        let outer = layer_el(&mut doc, body, Rect::new(0.0, 0.0, 400.0, 300.0));
        doc.set_attribute(outer, attr::HOVER_DEPTH, "2");
        let inner = layer_el(&mut doc, outer, Rect::new(100.0, 100.0, 200.0, 200.0));
        doc.set_attribute(inner, attr::HOVER_DEPTH, "2");
        let button = doc.create_element(inner, "button", Rect::new(120.0, 120.0, 180.0, 180.0));
        let label = doc.create_element(outer, "span", Rect::new(300.0, 0.0, 400.0, 50.0));
        doc.take_events();

        let mut scene = scene_with(FakePaint::new());
        let root = scene.create_root(&mut doc, body).unwrap();
        let l_outer = scene.layer_for(outer).unwrap();
        let l_inner = scene.layer_for(inner).unwrap();
        let report = scene.rasterize(&mut doc, &Unbounded);
        assert_eq!(report.jobs, 9);
        scene.update(root, &mut doc, 1.0).unwrap();

        // Inner's content quad is centred at (-2.5, 1.5) in front of outer.
        let ray = Ray::new([-2.5, 1.5, 5.0], [0.0, 0.0, -1.0]);
        assert_eq!(scene.hit_test(root, &ray).unwrap().map(|h| h.layer), Some(l_inner));
        scene
            .set_interaction_rays(root, vec![RaySource::Ray(ray)])
            .unwrap();
        scene.update(root, &mut doc, 1.0).unwrap();

        assert_eq!(scene.store().hover_level(l_inner), 1);
        assert_eq!(scene.store().hover_level(l_outer), 2);
        assert_eq!(scene.store().hover_level(root), 0);
        for node in [button, inner, outer, body] {
            assert!(doc.has_class(node, HOVER_CLASS), "{node:?} should be hovered");
        }
        assert!(!doc.has_class(label, HOVER_CLASS));

        let tex = scene.store().texture(l_inner).unwrap();
        assert_eq!(scene.engine().classes_of(tex).unwrap().to_vec(), strings(&[HOVER_CLASS]));

        scene.set_interaction_rays(root, Vec::new()).unwrap();
        scene.update(root, &mut doc, 1.0).unwrap();
        assert_eq!(scene.store().hover_level(l_inner), 0);
        assert!(!doc.has_class(button, HOVER_CLASS));
        assert!(!doc.has_class(body, HOVER_CLASS));

        // Writing and removing the hover class never dirties a layer.
        scene.update(root, &mut doc, 1.0).unwrap();
        assert!(scene.pipeline().queue().is_empty());
    }

    #[test]
    fn hover_levels_take_the_highest_across_rays_and_skip_siblings() {
        let mut doc = MemoryDocument::new(VIEWPORT);
        let body = doc.root();
        doc.set_attribute(body, attr::HOVER_DEPTH, "2");
        let outer = layer_el(&mut doc, body, Rect::new(0.0, 0.0, 400.0, 300.0));
        doc.set_attribute(outer, attr::HOVER_DEPTH, "2");
        let left = layer_el(&mut doc, outer, Rect::new(0.0, 0.0, 100.0, 100.0));
        doc.set_attribute(left, attr::HOVER_DEPTH, "2");
        let right = layer_el(&mut doc, outer, Rect::new(300.0, 200.0, 400.0, 300.0));
        doc.set_attribute(right, attr::HOVER_DEPTH, "2");
        doc.take_events();

        let mut scene = scene_with(FakePaint::new());
        let root = scene.create_root(&mut doc, body).unwrap();
        let l_outer = scene.layer_for(outer).unwrap();
        let l_left = scene.layer_for(left).unwrap();
        let l_right = scene.layer_for(right).unwrap();
        scene.rasterize(&mut doc, &Unbounded);
        scene.update(root, &mut doc, 1.0).unwrap();

        // One ray on the left leaf, one on a bare part of outer.
        let on_left = Ray::new([-3.5, 2.5, 5.0], [0.0, 0.0, -1.0]);
        let on_outer = Ray::new([-1.0, 2.5, 5.0], [0.0, 0.0, -1.0]);
        assert_eq!(scene.hit_test(root, &on_left).unwrap().map(|h| h.layer), Some(l_left));
        assert_eq!(scene.hit_test(root, &on_outer).unwrap().map(|h| h.layer), Some(l_outer));
        scene
            .set_interaction_rays(root, vec![RaySource::Ray(on_left), RaySource::Ray(on_outer)])
            .unwrap();
        scene.update(root, &mut doc, 1.0).unwrap();

        assert_eq!(scene.store().hover_level(l_left), 1);
        assert_eq!(scene.store().hover_level(l_outer), 2);
        assert_eq!(scene.store().hover_level(root), 2);
        assert_eq!(scene.store().hover_level(l_right), 0);
        assert!(doc.has_class(left, HOVER_CLASS));
        assert!(doc.has_class(outer, HOVER_CLASS));
        assert!(!doc.has_class(right, HOVER_CLASS));

        // With only the bare-outer ray, outer drops to level 1.
        scene
            .set_interaction_rays(root, vec![RaySource::Ray(on_outer)])
            .unwrap();
        scene.update(root, &mut doc, 1.0).unwrap();
        assert_eq!(scene.store().hover_level(l_outer), 1);
        assert_eq!(scene.store().hover_level(l_left), 0);
        assert!(!doc.has_class(left, HOVER_CLASS));
    }

    #[test]
    fn roots_keep_their_own_hover_classes() {
        let mut doc = MemoryDocument::new(VIEWPORT);
        let body = doc.root();
        let a = doc.create_element(body, "div", Rect::new(0.0, 0.0, 200.0, 100.0));
        let span = doc.create_element(a, "span", Rect::new(50.0, 25.0, 150.0, 75.0));
        let b = doc.create_element(body, "div", Rect::new(400.0, 300.0, 600.0, 400.0));
        doc.take_events();

        let mut scene = scene_with(FakePaint::new());
        let root_a = scene.create_root(&mut doc, a).unwrap();
        let root_b = scene.create_root(&mut doc, b).unwrap();
        scene.rasterize(&mut doc, &Unbounded);
        scene.update(root_a, &mut doc, 1.0).unwrap();
        scene.update(root_b, &mut doc, 1.0).unwrap();

        // Each root's content quad is centred on its own origin.
        let centre = Ray::new([0.0, 0.0, 5.0], [0.0, 0.0, -1.0]);
        scene
            .set_interaction_rays(root_a, vec![RaySource::Ray(centre)])
            .unwrap();
        for _ in 0..3 {
            scene.update(root_a, &mut doc, 1.0).unwrap();
            scene.update(root_b, &mut doc, 1.0).unwrap();
            for node in [span, a, body] {
                assert!(doc.has_class(node, HOVER_CLASS), "{node:?} should stay hovered");
            }
            assert!(!doc.has_class(b, HOVER_CLASS));
        }

        // The shared body keeps the class while the other root still holds it.
        scene
            .set_interaction_rays(root_b, vec![RaySource::Ray(centre)])
            .unwrap();
        scene.update(root_b, &mut doc, 1.0).unwrap();
        scene.set_interaction_rays(root_a, Vec::new()).unwrap();
        scene.update(root_a, &mut doc, 1.0).unwrap();
        assert!(!doc.has_class(span, HOVER_CLASS));
        assert!(!doc.has_class(a, HOVER_CLASS));
        assert!(doc.has_class(b, HOVER_CLASS));
        assert!(doc.has_class(body, HOVER_CLASS));

        scene.teardown(&mut doc);
        assert!(!doc.has_class(b, HOVER_CLASS));
        assert!(!doc.has_class(body, HOVER_CLASS));
    }

    #[test]
    fn failed_resource_still_draws() {
        let key = ResourceKey(7);
        let (mut doc, mut scene, root, layer, card) =
            card_scene(|card| FakePaint::new().with_resources(card, &[key]));
        scene.loader_mut().set(key, ResourceState::Pending);

        let report = scene.rasterize(&mut doc, &Unbounded);
        assert_eq!(report.measured, 2);
        assert_eq!(report.drawn, 0);
        assert_eq!(report.in_flight_batches, 1);
        assert!(scene.pipeline().is_busy(layer));
        assert_eq!(scene.loader().requests.get(&key), Some(&1));

        // A busy layer keeps its place in the queue.
        doc.dispatch(card, RefreshCause::Focus);
        scene.update(root, &mut doc, 1.0).unwrap();
        let report = scene.rasterize(&mut doc, &Unbounded);
        assert_eq!(report.measured, 0);
        assert_eq!(report.queued, 1);

        scene.loader_mut().set(key, ResourceState::Failed);
        let report = scene.rasterize(&mut doc, &Unbounded);
        assert_eq!(report.measured, 1);
        assert_eq!(report.drawn, 3);
        assert!(scene.pipeline().is_idle());

        scene.update(root, &mut doc, 1.0).unwrap();
        let tex = scene.store().texture(layer).unwrap();
        assert_eq!(scene.engine().drawn[&tex].failed, vec![key]);
        assert!(scene.store().is_visible(layer));
    }

    #[test]
    fn draw_for_removed_layer_is_discarded() {
        let key = ResourceKey(1);
        let (mut doc, mut scene, root, layer, card) =
            card_scene(|card| FakePaint::new().with_resources(card, &[key]));
        scene.loader_mut().set(key, ResourceState::Pending);
        scene.rasterize(&mut doc, &Unbounded);
        scene.update(root, &mut doc, 1.0).unwrap();

        doc.remove(card);
        scene.update(root, &mut doc, 1.0).unwrap();
        assert!(scene.store().removal_requested(layer));
        assert_eq!(scene.layer_for(card), Some(layer));

        let changes = scene.update(root, &mut doc, 1.0).unwrap();
        assert!(!scene.store().is_alive(layer));
        assert!(changes.removed.contains(&layer.index()));
        assert!(changes.topology_changed);
        assert_eq!(scene.layer_for(card), None);

        scene
            .loader_mut()
            .set(key, ResourceState::Ready(ResourceHandle(1)));
        let report = scene.rasterize(&mut doc, &Unbounded);
        assert_eq!(report.discarded, 1);
        assert_eq!(scene.engine().live().len(), 1);
        assert!(scene.pipeline().is_idle());
    }

    #[test]
    fn repeated_invalidations_queue_a_layer_once() {
        let (mut doc, mut scene, root, layer, card) = card_scene(|_| FakePaint::new());
        let text = doc.create_element(card, "p", Rect::new(0.0, 0.0, 100.0, 20.0));
        scene.rasterize(&mut doc, &Unbounded);
        scene.update(root, &mut doc, 1.0).unwrap();
        scene.rasterize(&mut doc, &Unbounded);
        assert!(scene.pipeline().is_idle());

        doc.set_text(text, "a");
        doc.set_text(text, "b");
        doc.dispatch(text, RefreshCause::Input);
        doc.set_attribute(card, "title", "x");
        scene.update(root, &mut doc, 1.0).unwrap();
        assert_eq!(scene.pipeline().queue().iter().collect::<Vec<_>>(), vec![layer]);

        let report = scene.rasterize(&mut doc, &Unbounded);
        assert_eq!(report.measured, 1);
    }

    #[test]
    fn zero_budget_measures_nothing_but_lands_settled_draws() {
        let key = ResourceKey(3);
        let (mut doc, mut scene, root, layer, card) =
            card_scene(|card| FakePaint::new().with_resources(card, &[key]));
        scene.loader_mut().set(key, ResourceState::Pending);
        scene.rasterize(&mut doc, &Unbounded);

        doc.dispatch(card, RefreshCause::Change);
        scene.update(root, &mut doc, 1.0).unwrap();
        scene
            .loader_mut()
            .set(key, ResourceState::Ready(ResourceHandle(3)));

        let clock = ManualClock::new(HostTime(0));
        let report = scene.rasterize(&mut doc, &FixedSlice::new(&clock, Duration::ZERO));
        assert_eq!(report.measured, 0);
        assert_eq!(report.drawn, 2);
        assert_eq!(report.queued, 1);
        assert!(scene.pipeline().queue().contains(layer));
    }

    #[test]
    fn root_only_operations_reject_children_and_stale_layers() {
        let (mut doc, mut scene, root, layer, card) = card_scene(|_| FakePaint::new());

        assert_eq!(
            scene.update(layer, &mut doc, 1.0).unwrap_err(),
            LayerError::NotRoot(layer)
        );
        assert_eq!(
            scene.set_interaction_rays(layer, Vec::new()),
            Err(LayerError::NotRoot(layer))
        );
        assert_eq!(
            scene.create_root(&mut doc, card).unwrap_err(),
            LayerError::AlreadyLayer { node: card, layer }
        );
        assert_eq!(
            scene.create_root(&mut doc, NodeKey(999)).unwrap_err(),
            LayerError::UnknownNode(NodeKey(999))
        );

        scene.teardown(&mut doc);
        assert_eq!(
            scene.update(root, &mut doc, 1.0).unwrap_err(),
            LayerError::StaleLayer(root)
        );
    }

    #[test]
    fn teardown_releases_bitmaps_and_hover_classes() {
        let (mut doc, mut scene, root, _, card) = card_scene(|_| FakePaint::new());
        scene.rasterize(&mut doc, &Unbounded);
        scene.update(root, &mut doc, 1.0).unwrap();

        // Card centre (100, 50) sits at (-3, 2.5) relative to the viewport centre.
        let ray = Ray::new([-3.0, 2.5, 5.0], [0.0, 0.0, -1.0]);
        scene
            .set_interaction_rays(root, vec![RaySource::Ray(ray)])
            .unwrap();
        scene.update(root, &mut doc, 1.0).unwrap();
        assert!(doc.has_class(card, HOVER_CLASS));
        assert_eq!(scene.engine().live().len(), 2);

        scene.teardown(&mut doc);
        assert!(!doc.has_class(card, HOVER_CLASS));
        assert!(scene.engine().live().is_empty());
        assert!(scene.store().is_empty());
        assert!(scene.registry().is_empty());
    }

    #[test]
    fn dropping_a_state_purges_its_bitmap() {
        let mut doc = MemoryDocument::new(VIEWPORT);
        let body = doc.root();
        let panel = layer_el(&mut doc, body, Rect::new(0.0, 0.0, 200.0, 100.0));
        doc.set_attribute(panel, attr::STATES, "near far");
        doc.take_events();
        let mut scene = scene_with(FakePaint::new());
        let root = scene.create_root(&mut doc, panel).unwrap();
        scene.rasterize(&mut doc, &Unbounded);
        scene.update(root, &mut doc, 1.0).unwrap();
        let far = scene
            .store()
            .cache(root)
            .entry("far", 0)
            .and_then(|e| e.texture)
            .unwrap();

        doc.set_attribute(panel, attr::STATES, "near");
        scene.update(root, &mut doc, 1.0).unwrap();
        assert!(!scene.store().cache(root).contains("far", 0));
        assert!(scene.store().cache(root).contains("near", 0));
        assert_eq!(scene.engine().released, vec![far]);
        assert!(scene.pipeline().queue().contains(root));
    }

    #[test]
    fn video_elements_bind_a_live_surface_without_painting() {
        let mut doc = MemoryDocument::new(VIEWPORT);
        let body = doc.root();
        let video = doc.create_element(body, "video", Rect::new(0.0, 0.0, 320.0, 180.0));
        doc.take_events();
        let mut scene = scene_with(FakePaint::new());
        let root = scene.create_root(&mut doc, body).unwrap();
        let layer = scene.layer_for(video).unwrap();
        assert!(scene.store().is_video(layer));

        scene.rasterize(&mut doc, &Unbounded);
        assert_eq!(scene.engine().paints_of(video), 0);
        scene.update(root, &mut doc, 1.0).unwrap();
        let tex = scene.store().texture(layer).unwrap();
        assert_eq!(scene.engine().videos.get(&tex), Some(&video));
        assert!(scene.store().is_visible(layer));

        // The body is painted with the video's subtree left out.
        let body_paint = scene.engine().painted.iter().find(|s| s.node == body).unwrap();
        assert_eq!(body_paint.hidden, vec![video]);
    }

    #[test]
    fn pixel_ratio_change_redraws_at_new_resolution() {
        let (mut doc, mut scene, root, layer, card) = card_scene(|_| FakePaint::new());
        doc.set_attribute(card, attr::PIXEL_RATIO, "1.5");
        scene.update(root, &mut doc, 1.0).unwrap();
        scene.rasterize(&mut doc, &Unbounded);
        let drawn = scene.engine().drawn.values().last().unwrap();
        assert!(close(drawn.sketch.pixel_ratio, 1.5));

        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert_eq!(
                scene.set_device_pixel_ratio(bad),
                Err(LayerError::InvalidPixelRatio)
            );
        }
        assert_eq!(scene.context().device_pixel_ratio(), 1.0);
        scene.update(root, &mut doc, 1.0).unwrap();
        assert!(scene.pipeline().queue().is_empty());

        scene.set_device_pixel_ratio(2.0).unwrap();
        scene.update(root, &mut doc, 1.0).unwrap();
        assert_eq!(scene.pipeline().queue().len(), 2);
        scene.rasterize(&mut doc, &Unbounded);

        scene.update(root, &mut doc, 1.0).unwrap();
        let tex = scene.store().texture(layer).unwrap();
        let drawn = &scene.engine().drawn[&tex];
        assert!(close(drawn.sketch.pixel_ratio, 3.0));
        assert_eq!(
            drawn.size,
            PixelSize {
                width: 600,
                height: 300
            }
        );
    }

    #[cfg(feature = "trace")]
    #[test]
    fn traced_update_reports_lifecycle_and_summary() {
        use crate::trace::{FrameSummary, TraceSink};

        #[derive(Default)]
        struct Sink {
            lifecycle: Vec<(u32, LifecycleKind)>,
            summaries: Vec<FrameSummary>,
        }
        impl TraceSink for Sink {
            fn on_lifecycle(&mut self, e: &LayerLifecycleEvent) {
                self.lifecycle.push((e.layer_index, e.kind));
            }
            fn on_frame_summary(&mut self, s: &FrameSummary) {
                self.summaries.push(*s);
            }
        }

        let mut doc = MemoryDocument::new(VIEWPORT);
        let body = doc.root();
        let card = layer_el(&mut doc, body, Rect::new(0.0, 0.0, 200.0, 100.0));
        doc.take_events();
        let mut scene = scene_with(FakePaint::new());
        let mut sink = Sink::default();

        let root = scene
            .create_root_traced(&mut doc, body, &mut Tracer::new(&mut sink))
            .unwrap();
        let layer = scene.layer_for(card).unwrap();
        assert_eq!(
            sink.lifecycle,
            vec![
                (root.index(), LifecycleKind::Created),
                (layer.index(), LifecycleKind::Created)
            ]
        );

        doc.remove(card);
        scene
            .update_traced(root, &mut doc, 1.0, &mut Tracer::new(&mut sink))
            .unwrap();
        scene
            .update_traced(root, &mut doc, 1.0, &mut Tracer::new(&mut sink))
            .unwrap();
        assert_eq!(
            &sink.lifecycle[2..],
            &[
                (layer.index(), LifecycleKind::RemovalRequested),
                (layer.index(), LifecycleKind::Disposed)
            ]
        );
        assert_eq!(sink.summaries.len(), 2);
        assert_eq!(sink.summaries[1].frame_index, 1);
        assert_eq!(sink.summaries[1].expired, 1);
        assert_eq!(sink.summaries[1].layers, 1);
    }
}
