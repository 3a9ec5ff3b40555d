// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the layer pipeline.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! [`LayerScene`](crate::scene::LayerScene) calls at each stage: layer
//! lifecycle, invalidation, queueing, the measure pass, deferred draws and a
//! per-frame summary. All method bodies default to no-ops, so implementing
//! only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).

use crate::layer::SurfaceId;
use crate::markup::NodeKey;
use crate::raster::ResourceKey;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which lifecycle transition a layer went through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleKind {
    /// The layer was created by a root registration or a child walk.
    Created,
    /// The layer's element disappeared; it is fading out.
    RemovalRequested,
    /// The layer faded out and was disposed.
    Disposed,
}

/// What invalidated a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InvalidationSource {
    /// An attribute, text or child-list mutation.
    Mutation,
    /// The element's box changed size.
    Resize,
    /// A forced-refresh event.
    Refresh,
    /// A child walk or self-check changed the layer tree.
    Topology,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a layer is created, starts fading out, or is disposed.
#[derive(Clone, Copy, Debug)]
pub struct LayerLifecycleEvent {
    /// Slot index of the layer.
    pub layer_index: u32,
    /// The element the layer wraps.
    pub node: NodeKey,
    /// What happened.
    pub kind: LifecycleKind,
}

/// Emitted when a document event dirties a layer.
#[derive(Clone, Copy, Debug)]
pub struct InvalidationEvent {
    /// Slot index of the dirtied layer.
    pub layer_index: u32,
    /// The element the event targeted.
    pub target: NodeKey,
    /// Kind of event.
    pub source: InvalidationSource,
    /// Whether the child set will be walked again.
    pub structural: bool,
}

/// Emitted when a layer joins the rasterization queue.
#[derive(Clone, Copy, Debug)]
pub struct EnqueueEvent {
    /// Slot index of the queued layer.
    pub layer_index: u32,
    /// Queue length after the push.
    pub queue_len: u32,
}

/// Emitted after the measure pass of one layer.
#[derive(Clone, Copy, Debug)]
pub struct MeasureEvent {
    /// Slot index of the layer.
    pub layer_index: u32,
    /// Draw jobs produced.
    pub jobs: u32,
    /// (state, level) pairs skipped for a zero-area box.
    pub skipped: u32,
    /// Distinct resources referenced by the jobs.
    pub resources: u32,
    /// Budget consumed by the pass, in ticks.
    pub cost_ticks: u64,
}

/// Emitted when a deferred draw completes.
#[derive(Clone, Copy, Debug)]
pub struct DrawEvent {
    /// Slot index of the layer the draw was for.
    pub layer_index: u32,
    /// The produced bitmap.
    pub surface: SurfaceId,
    /// `true` if the layer or cache entry was gone and the bitmap was
    /// released instead of swapped in.
    pub discarded: bool,
}

/// Emitted when a resource settles as failed. The draw proceeds without it.
#[derive(Clone, Copy, Debug)]
pub struct ResourceFailureEvent {
    /// The failed resource.
    pub key: ResourceKey,
}

/// Per-frame summary emitted at the end of an update.
#[derive(Clone, Copy, Debug)]
pub struct FrameSummary {
    /// Update counter.
    pub frame_index: u64,
    /// Live layers after the update.
    pub layers: u32,
    /// Layers with a non-zero hover level.
    pub hovered: u32,
    /// Layers drained from the dirty channels.
    pub dirty: u32,
    /// Layers disposed this frame.
    pub expired: u32,
    /// Rasterization queue length after the update.
    pub queue_len: u32,
    /// Sealed batches waiting on resources.
    pub in_flight_batches: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the layer pipeline.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called on layer creation, removal request and disposal.
    fn on_lifecycle(&mut self, e: &LayerLifecycleEvent) {
        _ = e;
    }

    /// Called when a document event dirties a layer.
    fn on_invalidation(&mut self, e: &InvalidationEvent) {
        _ = e;
    }

    /// Called when a layer is queued for rasterization.
    fn on_enqueue(&mut self, e: &EnqueueEvent) {
        _ = e;
    }

    /// Called after a layer's measure pass.
    fn on_measure(&mut self, e: &MeasureEvent) {
        _ = e;
    }

    /// Called when a deferred draw completes.
    fn on_draw(&mut self, e: &DrawEvent) {
        _ = e;
    }

    /// Called when a resource fails to load.
    fn on_resource_failure(&mut self, e: &ResourceFailureEvent) {
        _ = e;
    }

    /// Called with a per-frame summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`LayerLifecycleEvent`].
    #[inline]
    pub fn lifecycle(&mut self, e: &LayerLifecycleEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_lifecycle(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`InvalidationEvent`].
    #[inline]
    pub fn invalidation(&mut self, e: &InvalidationEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_invalidation(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`EnqueueEvent`].
    #[inline]
    pub fn enqueue(&mut self, e: &EnqueueEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_enqueue(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`MeasureEvent`].
    #[inline]
    pub fn measure(&mut self, e: &MeasureEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_measure(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DrawEvent`].
    #[inline]
    pub fn draw(&mut self, e: &DrawEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_draw(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ResourceFailureEvent`].
    #[inline]
    pub fn resource_failure(&mut self, e: &ResourceFailureEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_resource_failure(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_frame_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_lifecycle() -> LayerLifecycleEvent {
        LayerLifecycleEvent {
            layer_index: 3,
            node: NodeKey(9),
            kind: LifecycleKind::Created,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_lifecycle(&sample_lifecycle());
        sink.on_enqueue(&EnqueueEvent {
            layer_index: 0,
            queue_len: 1,
        });
        sink.on_frame_summary(&FrameSummary {
            frame_index: 0,
            layers: 0,
            hovered: 0,
            dirty: 0,
            expired: 0,
            queue_len: 0,
            in_flight_batches: 0,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.lifecycle(&sample_lifecycle());
        tracer.resource_failure(&ResourceFailureEvent {
            key: ResourceKey(1),
        });
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            created: Vec<u32>,
        }
        impl TraceSink for RecordingSink {
            fn on_lifecycle(&mut self, e: &LayerLifecycleEvent) {
                self.created.push(e.layer_index);
            }
        }

        let mut sink = RecordingSink {
            created: Vec::new(),
        };
        let mut tracer = Tracer::new(&mut sink);
        tracer.lifecycle(&sample_lifecycle());
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(sink.created, &[3]);
    }
}
