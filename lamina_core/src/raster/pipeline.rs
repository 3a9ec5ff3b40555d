// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Two-phase rasterization: a synchronous measure pass, then deferred draws.
//!
//! The measure pass runs per dequeued layer inside a short critical section.
//! It sets the element's classes to each (state, hover level) in turn,
//! measures, records the box in the cache and asks the paint engine for
//! drawing commands. The original classes are restored before the pass ends.
//!
//! Draw jobs collect in an open batch together with the resources they
//! reference. At the end of a [`RasterPipeline::rasterize`] call the batch is
//! sealed. A sealed batch draws once every one of its resources has settled;
//! failed resources are simply absent. Each finished bitmap replaces its
//! cache entry's previous one in a single swap.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;

use super::budget::{Budget, Ema, should_continue};
use super::paint::{
    PaintEngine, PaintRequest, PixelSize, ResolvedResources, ResourceKey, ResourceLoader,
    ResourceState,
};
use super::queue::RasterQueue;
use crate::config::HOVER_CLASS;
use crate::context::RenderContext;
use crate::layer::{LayerId, LayerStore};
use crate::markup::Document;
use crate::trace::{DrawEvent, MeasureEvent, ResourceFailureEvent, Tracer};

/// Smoothing factor for the per-layer cost average.
const COST_ALPHA: f64 = 0.2;

/// One deferred draw.
struct DrawJob<C> {
    layer: LayerId,
    state: String,
    level: u32,
    commands: C,
    size: PixelSize,
}

/// Draw jobs that wait on a common set of resources.
struct DrawBatch<C> {
    jobs: Vec<DrawJob<C>>,
    resources: BTreeSet<ResourceKey>,
}

impl<C> Default for DrawBatch<C> {
    fn default() -> Self {
        Self {
            jobs: Vec::new(),
            resources: BTreeSet::new(),
        }
    }
}

impl<C> DrawBatch<C> {
    fn is_empty(&self) -> bool {
        self.jobs.is_empty() && self.resources.is_empty()
    }
}

/// What one [`RasterPipeline::rasterize`] call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RasterReport {
    /// Layers that went through the measure pass.
    pub measured: u32,
    /// Draw jobs produced by those passes.
    pub jobs: u32,
    /// Bitmaps swapped into cache entries.
    pub drawn: u32,
    /// Bitmaps released because their layer or entry was gone.
    pub discarded: u32,
    /// Layers still queued.
    pub queued: u32,
    /// Sealed batches still waiting on resources.
    pub in_flight_batches: u32,
}

/// Queue, open batch and in-flight batches for one scene.
pub struct RasterPipeline<C> {
    queue: RasterQueue,
    open: DrawBatch<C>,
    in_flight: Vec<DrawBatch<C>>,
    /// Outstanding draw jobs per layer.
    busy: BTreeMap<LayerId, u32>,
    cost: Ema,
}

impl<C> core::fmt::Debug for RasterPipeline<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RasterPipeline")
            .field("queue", &self.queue)
            .field("open_jobs", &self.open.jobs.len())
            .field("in_flight", &self.in_flight.len())
            .field("busy", &self.busy)
            .finish_non_exhaustive()
    }
}

impl<C> Default for RasterPipeline<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> RasterPipeline<C> {
    /// Creates an idle pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: RasterQueue::new(),
            open: DrawBatch::default(),
            in_flight: Vec::new(),
            busy: BTreeMap::new(),
            cost: Ema::new(COST_ALPHA),
        }
    }

    /// Queues `layer` for rasterization. Returns `false` if it was already
    /// queued.
    pub fn enqueue(&mut self, layer: LayerId) -> bool {
        self.queue.push(layer)
    }

    /// Drops `layer` from the queue. Draws already in flight still run.
    pub fn forget(&mut self, layer: LayerId) -> bool {
        self.queue.remove(layer)
    }

    /// The rasterization queue.
    #[must_use]
    pub fn queue(&self) -> &RasterQueue {
        &self.queue
    }

    /// Number of sealed batches waiting on resources.
    #[must_use]
    pub fn in_flight_batches(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns `true` while draws for `layer` are outstanding.
    #[must_use]
    pub fn is_busy(&self, layer: LayerId) -> bool {
        self.busy.contains_key(&layer)
    }

    /// Returns `true` when nothing is queued or in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.in_flight.is_empty() && self.open.is_empty()
    }

    /// Runs settled draws, then measures queued layers while `budget` allows,
    /// then seals the new batch and runs whatever already settled.
    ///
    /// Layers with outstanding draws keep their queue position until those
    /// draws land.
    pub fn rasterize<P, L>(
        &mut self,
        store: &mut LayerStore,
        doc: &mut dyn Document,
        ctx: &mut RenderContext,
        engine: &mut P,
        loader: &mut L,
        budget: &dyn Budget,
        tracer: &mut Tracer<'_>,
    ) -> RasterReport
    where
        P: PaintEngine<Commands = C>,
        L: ResourceLoader,
    {
        let mut report = RasterReport::default();
        self.poll(store, engine, loader, tracer, &mut report);

        let mut processed = 0_usize;
        loop {
            let before = budget.remaining();
            if !should_continue(before, processed, &self.cost) {
                break;
            }
            let busy = &self.busy;
            let Some(layer) = self.queue.pop_where(|l| !busy.contains_key(&l)) else {
                break;
            };
            if !store.is_alive(layer) {
                continue;
            }

            let pass = self.measure(store, doc, ctx, engine, loader, layer);
            let spent = before.saturating_sub(budget.remaining());
            self.cost.update(spent.ticks() as f64);
            processed += 1;
            report.measured += 1;
            report.jobs += pass.jobs;
            tracer.measure(&MeasureEvent {
                layer_index: layer.index(),
                jobs: pass.jobs,
                skipped: pass.skipped,
                resources: pass.resources,
                cost_ticks: spent.ticks(),
            });
        }

        if !self.open.is_empty() {
            self.in_flight.push(core::mem::take(&mut self.open));
        }
        self.poll(store, engine, loader, tracer, &mut report);

        report.queued = len_u32(self.queue.len());
        report.in_flight_batches = len_u32(self.in_flight.len());
        report
    }

    /// The measure pass for one layer.
    fn measure<P, L>(
        &mut self,
        store: &mut LayerStore,
        doc: &mut dyn Document,
        ctx: &mut RenderContext,
        engine: &mut P,
        loader: &mut L,
        layer: LayerId,
    ) -> MeasurePass
    where
        P: PaintEngine<Commands = C>,
        L: ResourceLoader,
    {
        let mut pass = MeasurePass::default();
        let node = store.node(layer);
        if !doc.contains(node) {
            return pass;
        }

        if store.is_video(layer) {
            if let Some(bounds) = doc.measure(node, ctx.measure_options()) {
                store.cache_mut(layer).set_bounds("", 0, bounds);
            }
            let bound = store.cache(layer).entry("", 0).and_then(|e| e.texture);
            if bound.is_none()
                && let Some(surface) = engine.video_surface(&*doc, node)
            {
                match store.cache_mut(layer).swap_texture("", 0, surface) {
                    Ok(Some(old)) => engine.release(old),
                    Ok(None) => {}
                    Err(unused) => engine.release(unused),
                }
            }
            return pass;
        }

        let config = store.config(layer).clone();
        let hidden: Vec<_> = store.children(layer).map(|c| store.node(c)).collect();
        let original = doc.classes(node);
        let base: Vec<String> = original
            .iter()
            .filter(|c| *c != HOVER_CLASS && !config.declares(c))
            .cloned()
            .collect();
        let pixel_ratio = config.effective_pixel_ratio(ctx.device_pixel_ratio());
        let states: Vec<String> = config.all_states().map(String::from).collect();
        let mut referenced = BTreeSet::new();

        ctx.freeze();
        for state in &states {
            for level in 0..=config.hover_depth {
                let mut classes = base.clone();
                if !state.is_empty() {
                    classes.push(state.clone());
                }
                if level > 0 {
                    classes.push(String::from(HOVER_CLASS));
                }
                doc.set_classes(node, &classes);

                let Some(bounds) = doc.measure(node, ctx.measure_options()) else {
                    pass.skipped += 1;
                    continue;
                };
                store.cache_mut(layer).set_bounds(state, level, bounds);
                if bounds.is_empty_area() {
                    pass.skipped += 1;
                    continue;
                }

                let request = PaintRequest {
                    bounds,
                    pixel_ratio,
                    hidden: &hidden,
                };
                let painted = engine.paint(&*doc, node, &request);
                for key in painted.resources {
                    referenced.insert(key);
                    if self.open.resources.insert(key) {
                        loader.request(key);
                    }
                }
                self.open.jobs.push(DrawJob {
                    layer,
                    state: state.clone(),
                    level,
                    commands: painted.commands,
                    size: PixelSize::for_bounds(&bounds, pixel_ratio),
                });
                pass.jobs += 1;
            }
        }
        doc.set_classes(node, &original);
        ctx.thaw();

        if pass.jobs > 0 {
            *self.busy.entry(layer).or_default() += pass.jobs;
        }
        pass.resources = len_u32(referenced.len());
        pass
    }

    /// Draws every sealed batch whose resources have all settled.
    fn poll<P, L>(
        &mut self,
        store: &mut LayerStore,
        engine: &mut P,
        loader: &mut L,
        tracer: &mut Tracer<'_>,
        report: &mut RasterReport,
    ) where
        P: PaintEngine<Commands = C>,
        L: ResourceLoader,
    {
        let mut waiting = Vec::new();
        for batch in core::mem::take(&mut self.in_flight) {
            let mut resolved = ResolvedResources::new();
            let mut settled = true;
            for key in &batch.resources {
                match loader.poll(*key) {
                    ResourceState::Pending => {
                        settled = false;
                        break;
                    }
                    ResourceState::Ready(handle) => resolved.insert(*key, Some(handle)),
                    ResourceState::Failed => resolved.insert(*key, None),
                }
            }
            if !settled {
                waiting.push(batch);
                continue;
            }

            for key in &batch.resources {
                if resolved.failed(*key) {
                    tracer.resource_failure(&ResourceFailureEvent { key: *key });
                }
            }
            for job in batch.jobs {
                let surface = engine.draw(&job.commands, &resolved, job.size);
                let swapped = if store.is_alive(job.layer) {
                    store
                        .cache_mut(job.layer)
                        .swap_texture(&job.state, job.level, surface)
                } else {
                    Err(surface)
                };
                let discarded = match swapped {
                    Ok(previous) => {
                        if let Some(old) = previous {
                            engine.release(old);
                        }
                        report.drawn += 1;
                        false
                    }
                    Err(unused) => {
                        engine.release(unused);
                        report.discarded += 1;
                        true
                    }
                };
                if let Some(n) = self.busy.get_mut(&job.layer) {
                    *n -= 1;
                    if *n == 0 {
                        self.busy.remove(&job.layer);
                    }
                }
                tracer.draw(&DrawEvent {
                    layer_index: job.layer.index(),
                    surface,
                    discarded,
                });
            }
        }
        self.in_flight = waiting;
    }
}

/// Counters for one measure pass.
#[derive(Clone, Copy, Debug, Default)]
struct MeasurePass {
    jobs: u32,
    skipped: u32,
    resources: u32,
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "queue and batch counts are far below u32::MAX"
)]
fn len_u32(n: usize) -> u32 {
    n as u32
}
