// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collaborator traits for the paint engine and the resource loader.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::layer::SurfaceId;
use crate::markup::{Bounds, Document, NodeKey};

/// Identifies an external resource (image, nested canvas) referenced by
/// drawing commands. Equal keys are fetched once per batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKey(pub u64);

/// A loaded resource, owned by the loader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceHandle(pub u64);

/// Progress of one resource load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceState {
    /// Still loading.
    Pending,
    /// Loaded.
    Ready(ResourceHandle),
    /// Failed. The draw proceeds without it.
    Failed,
}

impl ResourceState {
    /// Returns `true` once the load has succeeded or failed.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// What the pipeline asks the paint engine to record.
#[derive(Clone, Copy, Debug)]
pub struct PaintRequest<'a> {
    /// The box measured for this state and hover level.
    pub bounds: Bounds,
    /// Device pixels per page pixel.
    pub pixel_ratio: f64,
    /// Child layer elements. Their subtrees are painted by their own layers
    /// and must be left out.
    pub hidden: &'a [NodeKey],
}

/// Output of [`PaintEngine::paint`].
#[derive(Clone, Debug)]
pub struct Painted<C> {
    /// Recorded drawing commands.
    pub commands: C,
    /// External resources the commands reference.
    pub resources: Vec<ResourceKey>,
}

/// Bitmap size in device pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelSize {
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl PixelSize {
    /// Device-pixel size of a box at a pixel ratio, rounded up.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "box sizes are far below u32::MAX device pixels"
    )]
    pub fn for_bounds(bounds: &Bounds, pixel_ratio: f64) -> Self {
        #[cfg(not(feature = "std"))]
        use kurbo::common::FloatFuncs as _;

        Self {
            width: (bounds.rect.width() * pixel_ratio).ceil().max(0.0) as u32,
            height: (bounds.rect.height() * pixel_ratio).ceil().max(0.0) as u32,
        }
    }
}

/// Settled resources of a batch. Failed loads map to `None`.
#[derive(Clone, Debug, Default)]
pub struct ResolvedResources {
    entries: BTreeMap<ResourceKey, Option<ResourceHandle>>,
}

impl ResolvedResources {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a settled resource.
    pub fn insert(&mut self, key: ResourceKey, handle: Option<ResourceHandle>) {
        self.entries.insert(key, handle);
    }

    /// The loaded handle, `None` if the load failed or the key is unknown.
    #[must_use]
    pub fn get(&self, key: ResourceKey) -> Option<ResourceHandle> {
        self.entries.get(&key).copied().flatten()
    }

    /// Returns `true` if the load of `key` failed.
    #[must_use]
    pub fn failed(&self, key: ResourceKey) -> bool {
        matches!(self.entries.get(&key), Some(None))
    }

    /// Number of settled resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no resource was referenced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Turns elements into drawing commands and commands into bitmaps.
///
/// `paint` runs while the element's classes are toggled to the state being
/// rendered, so it must read everything it needs from the document right
/// away. `draw` runs later, once the batch's resources have settled.
pub trait PaintEngine {
    /// Recorded drawing commands.
    type Commands;

    /// Records the drawing commands for `node` at its current classes.
    fn paint(
        &mut self,
        doc: &dyn Document,
        node: NodeKey,
        request: &PaintRequest<'_>,
    ) -> Painted<Self::Commands>;

    /// Executes commands into a new offscreen bitmap.
    fn draw(
        &mut self,
        commands: &Self::Commands,
        resources: &ResolvedResources,
        size: PixelSize,
    ) -> SurfaceId;

    /// A surface that shows the live frames of a video element.
    fn video_surface(&mut self, doc: &dyn Document, node: NodeKey) -> Option<SurfaceId>;

    /// Frees a bitmap no cache entry refers to any more.
    fn release(&mut self, surface: SurfaceId);
}

/// Fetches external resources.
pub trait ResourceLoader {
    /// Starts loading `key`. Requests for a key already loading or loaded are
    /// no-ops.
    fn request(&mut self, key: ResourceKey);

    /// Current state of `key`.
    fn poll(&mut self, key: ResourceKey) -> ResourceState;
}
