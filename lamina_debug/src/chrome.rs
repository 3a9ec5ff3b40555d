// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Recorded events carry no wall-clock timestamps. The exporter lays them out
//! on a synthetic timeline: each measure pass becomes a complete (`"X"`) slice
//! whose duration is its budget cost, and advances the cursor. Every other
//! event is an instant at the current cursor. Update-side events go on thread
//! 0, rasterization events on thread 1.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use lamina_core::time::Timebase;

use crate::recorder::{RecordedEvent, decode};

const UPDATE_TID: u32 = 0;
const RASTER_TID: u32 = 1;

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Measure costs are converted to microseconds using the provided
/// [`Timebase`].
pub fn export(bytes: &[u8], timebase: Timebase, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut cursor: u64 = 0;

    for recorded in decode(bytes) {
        let ts = ticks_to_us(cursor, timebase);
        match recorded {
            RecordedEvent::Lifecycle(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("Layer{:?}", e.kind),
                    "cat": "Lifecycle",
                    "ts": ts,
                    "pid": 0,
                    "tid": UPDATE_TID,
                    "s": "t",
                    "args": {
                        "layer": e.layer_index,
                        "node": e.node.0,
                    }
                }));
            }
            RecordedEvent::Invalidation(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Invalidate",
                    "cat": "Dirty",
                    "ts": ts,
                    "pid": 0,
                    "tid": UPDATE_TID,
                    "s": "t",
                    "args": {
                        "layer": e.layer_index,
                        "target": e.target.0,
                        "source": format!("{:?}", e.source),
                        "structural": e.structural,
                    }
                }));
            }
            RecordedEvent::Enqueue(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Enqueue",
                    "cat": "Queue",
                    "ts": ts,
                    "pid": 0,
                    "tid": UPDATE_TID,
                    "s": "t",
                    "args": {
                        "layer": e.layer_index,
                        "queue_len": e.queue_len,
                    }
                }));
            }
            RecordedEvent::Measure(e) => {
                events.push(json!({
                    "ph": "X",
                    "name": "Measure",
                    "cat": "Raster",
                    "ts": ts,
                    "dur": ticks_to_us(e.cost_ticks, timebase),
                    "pid": 0,
                    "tid": RASTER_TID,
                    "args": {
                        "layer": e.layer_index,
                        "jobs": e.jobs,
                        "skipped": e.skipped,
                        "resources": e.resources,
                    }
                }));
                cursor = cursor.saturating_add(e.cost_ticks);
            }
            RecordedEvent::Draw(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": if e.discarded { "DrawDiscarded" } else { "Draw" },
                    "cat": "Raster",
                    "ts": ts,
                    "pid": 0,
                    "tid": RASTER_TID,
                    "s": "t",
                    "args": {
                        "layer": e.layer_index,
                        "surface": e.surface.0,
                    }
                }));
            }
            RecordedEvent::ResourceFailure(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "ResourceFailed",
                    "cat": "Raster",
                    "ts": ts,
                    "pid": 0,
                    "tid": RASTER_TID,
                    "s": "t",
                    "args": {
                        "key": e.key.0,
                    }
                }));
            }
            RecordedEvent::FrameSummary(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FrameSummary",
                    "cat": "Summary",
                    "ts": ts,
                    "pid": 0,
                    "tid": UPDATE_TID,
                    "s": "g",
                    "args": {
                        "frame_index": s.frame_index,
                        "layers": s.layers,
                        "hovered": s.hovered,
                        "dirty": s.dirty,
                        "expired": s.expired,
                        "queue_len": s.queue_len,
                        "in_flight_batches": s.in_flight_batches,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn ticks_to_us(ticks: u64, timebase: Timebase) -> f64 {
    timebase.ticks_to_nanos(ticks) as f64 / 1000.0
}
