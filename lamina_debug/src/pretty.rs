// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Measure-pass
//! costs are converted to microseconds using a [`Timebase`].

use std::io::Write;

use lamina_core::time::Timebase;
use lamina_core::trace::{
    DrawEvent, EnqueueEvent, FrameSummary, InvalidationEvent, InvalidationSource,
    LayerLifecycleEvent, LifecycleKind, MeasureEvent, ResourceFailureEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    timebase: Timebase,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("timebase", &self.timebase)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr(timebase: Timebase) -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            timebase,
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }

    /// Consumes the sink and returns the destination.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn ticks_to_us(&self, ticks: u64) -> f64 {
        self.timebase.ticks_to_nanos(ticks) as f64 / 1000.0
    }
}

fn lifecycle_name(kind: LifecycleKind) -> &'static str {
    match kind {
        LifecycleKind::Created => "created",
        LifecycleKind::RemovalRequested => "fading",
        LifecycleKind::Disposed => "disposed",
    }
}

fn source_name(source: InvalidationSource) -> &'static str {
    match source {
        InvalidationSource::Mutation => "mutation",
        InvalidationSource::Resize => "resize",
        InvalidationSource::Refresh => "refresh",
        InvalidationSource::Topology => "topology",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_lifecycle(&mut self, e: &LayerLifecycleEvent) {
        let _ = writeln!(
            self.writer,
            "[layer] #{} {} node={}",
            e.layer_index,
            lifecycle_name(e.kind),
            e.node.0,
        );
    }

    fn on_invalidation(&mut self, e: &InvalidationEvent) {
        let walk = if e.structural { " +walk" } else { "" };
        let _ = writeln!(
            self.writer,
            "[dirty] #{} {} target={}{walk}",
            e.layer_index,
            source_name(e.source),
            e.target.0,
        );
    }

    fn on_enqueue(&mut self, e: &EnqueueEvent) {
        let _ = writeln!(
            self.writer,
            "[queue] #{} len={}",
            e.layer_index, e.queue_len,
        );
    }

    fn on_measure(&mut self, e: &MeasureEvent) {
        let _ = writeln!(
            self.writer,
            "[measure] #{} jobs={} skipped={} resources={} cost={:.1}µs",
            e.layer_index,
            e.jobs,
            e.skipped,
            e.resources,
            self.ticks_to_us(e.cost_ticks),
        );
    }

    fn on_draw(&mut self, e: &DrawEvent) {
        let outcome = if e.discarded { "DISCARDED" } else { "swapped" };
        let _ = writeln!(
            self.writer,
            "[draw] #{} surface={} {outcome}",
            e.layer_index, e.surface.0,
        );
    }

    fn on_resource_failure(&mut self, e: &ResourceFailureEvent) {
        let _ = writeln!(self.writer, "[resource] key={} FAILED", e.key.0);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] frame={} layers={} hovered={} dirty={} expired={} \
             queued={} in_flight={}",
            s.frame_index,
            s.layers,
            s.hovered,
            s.dirty,
            s.expired,
            s.queue_len,
            s.in_flight_batches,
        );
    }
}

#[cfg(test)]
mod tests {
    use lamina_core::layer::SurfaceId;
    use lamina_core::markup::NodeKey;

    use super::*;

    fn printed(f: impl FnOnce(&mut PrettyPrintSink<Vec<u8>>)) -> String {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new(), Timebase::MICROS);
        f(&mut sink);
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn pretty_print_lifecycle() {
        let output = printed(|sink| {
            sink.on_lifecycle(&LayerLifecycleEvent {
                layer_index: 4,
                node: NodeKey(17),
                kind: LifecycleKind::RemovalRequested,
            });
        });
        assert!(output.starts_with("[layer] #4 fading"), "got: {output}");
        assert!(output.contains("node=17"), "got: {output}");
    }

    #[test]
    fn pretty_print_measure_cost_in_micros() {
        let output = printed(|sink| {
            sink.on_measure(&MeasureEvent {
                layer_index: 1,
                jobs: 3,
                skipped: 0,
                resources: 2,
                cost_ticks: 250,
            });
        });
        assert!(output.contains("jobs=3"), "got: {output}");
        assert!(output.contains("cost=250.0µs"), "got: {output}");
    }

    #[test]
    fn pretty_print_discarded_draw() {
        let output = printed(|sink| {
            sink.on_draw(&DrawEvent {
                layer_index: 2,
                surface: SurfaceId(9),
                discarded: true,
            });
        });
        assert!(output.contains("surface=9 DISCARDED"), "got: {output}");
    }
}
