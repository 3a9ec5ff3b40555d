// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].

use lamina_core::layer::SurfaceId;
use lamina_core::markup::NodeKey;
use lamina_core::raster::ResourceKey;
use lamina_core::trace::{
    DrawEvent, EnqueueEvent, FrameSummary, InvalidationEvent, InvalidationSource,
    LayerLifecycleEvent, LifecycleKind, MeasureEvent, ResourceFailureEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_LIFECYCLE: u8 = 1;
const TAG_INVALIDATION: u8 = 2;
const TAG_ENQUEUE: u8 = 3;
const TAG_MEASURE: u8 = 4;
const TAG_DRAW: u8 = 5;
const TAG_RESOURCE_FAILURE: u8 = 6;
const TAG_FRAME_SUMMARY: u8 = 7;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_lifecycle(&mut self, k: LifecycleKind) {
        self.write_u8(match k {
            LifecycleKind::Created => 0,
            LifecycleKind::RemovalRequested => 1,
            LifecycleKind::Disposed => 2,
        });
    }

    fn write_source(&mut self, s: InvalidationSource) {
        self.write_u8(match s {
            InvalidationSource::Mutation => 0,
            InvalidationSource::Resize => 1,
            InvalidationSource::Refresh => 2,
            InvalidationSource::Topology => 3,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_lifecycle(&mut self, e: &LayerLifecycleEvent) {
        self.write_u8(TAG_LIFECYCLE);
        self.write_u32(e.layer_index);
        self.write_u64(e.node.0);
        self.write_lifecycle(e.kind);
    }

    fn on_invalidation(&mut self, e: &InvalidationEvent) {
        self.write_u8(TAG_INVALIDATION);
        self.write_u32(e.layer_index);
        self.write_u64(e.target.0);
        self.write_source(e.source);
        self.write_u8(u8::from(e.structural));
    }

    fn on_enqueue(&mut self, e: &EnqueueEvent) {
        self.write_u8(TAG_ENQUEUE);
        self.write_u32(e.layer_index);
        self.write_u32(e.queue_len);
    }

    fn on_measure(&mut self, e: &MeasureEvent) {
        self.write_u8(TAG_MEASURE);
        self.write_u32(e.layer_index);
        self.write_u32(e.jobs);
        self.write_u32(e.skipped);
        self.write_u32(e.resources);
        self.write_u64(e.cost_ticks);
    }

    fn on_draw(&mut self, e: &DrawEvent) {
        self.write_u8(TAG_DRAW);
        self.write_u32(e.layer_index);
        self.write_u32(e.surface.0);
        self.write_u8(u8::from(e.discarded));
    }

    fn on_resource_failure(&mut self, e: &ResourceFailureEvent) {
        self.write_u8(TAG_RESOURCE_FAILURE);
        self.write_u64(e.key.0);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_u32(s.layers);
        self.write_u32(s.hovered);
        self.write_u32(s.dirty);
        self.write_u32(s.expired);
        self.write_u32(s.queue_len);
        self.write_u32(s.in_flight_batches);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`LayerLifecycleEvent`].
    Lifecycle(LayerLifecycleEvent),
    /// An [`InvalidationEvent`].
    Invalidation(InvalidationEvent),
    /// An [`EnqueueEvent`].
    Enqueue(EnqueueEvent),
    /// A [`MeasureEvent`].
    Measure(MeasureEvent),
    /// A [`DrawEvent`].
    Draw(DrawEvent),
    /// A [`ResourceFailureEvent`].
    ResourceFailure(ResourceFailureEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_lifecycle(&mut self) -> Option<LifecycleKind> {
        Some(match self.read_u8()? {
            0 => LifecycleKind::Created,
            1 => LifecycleKind::RemovalRequested,
            _ => LifecycleKind::Disposed,
        })
    }

    fn read_source(&mut self) -> Option<InvalidationSource> {
        Some(match self.read_u8()? {
            0 => InvalidationSource::Mutation,
            1 => InvalidationSource::Resize,
            2 => InvalidationSource::Refresh,
            _ => InvalidationSource::Topology,
        })
    }

    fn decode_lifecycle(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Lifecycle(LayerLifecycleEvent {
            layer_index: self.read_u32()?,
            node: NodeKey(self.read_u64()?),
            kind: self.read_lifecycle()?,
        }))
    }

    fn decode_invalidation(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Invalidation(InvalidationEvent {
            layer_index: self.read_u32()?,
            target: NodeKey(self.read_u64()?),
            source: self.read_source()?,
            structural: self.read_u8()? != 0,
        }))
    }

    fn decode_enqueue(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Enqueue(EnqueueEvent {
            layer_index: self.read_u32()?,
            queue_len: self.read_u32()?,
        }))
    }

    fn decode_measure(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Measure(MeasureEvent {
            layer_index: self.read_u32()?,
            jobs: self.read_u32()?,
            skipped: self.read_u32()?,
            resources: self.read_u32()?,
            cost_ticks: self.read_u64()?,
        }))
    }

    fn decode_draw(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Draw(DrawEvent {
            layer_index: self.read_u32()?,
            surface: SurfaceId(self.read_u32()?),
            discarded: self.read_u8()? != 0,
        }))
    }

    fn decode_resource_failure(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ResourceFailure(ResourceFailureEvent {
            key: ResourceKey(self.read_u64()?),
        }))
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame_index: self.read_u64()?,
            layers: self.read_u32()?,
            hovered: self.read_u32()?,
            dirty: self.read_u32()?,
            expired: self.read_u32()?,
            queue_len: self.read_u32()?,
            in_flight_batches: self.read_u32()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_LIFECYCLE => self.decode_lifecycle(),
            TAG_INVALIDATION => self.decode_invalidation(),
            TAG_ENQUEUE => self.decode_enqueue(),
            TAG_MEASURE => self.decode_measure(),
            TAG_DRAW => self.decode_draw(),
            TAG_RESOURCE_FAILURE => self.decode_resource_failure(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
