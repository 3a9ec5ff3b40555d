// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scripted paint engine and resource loader for tests.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;

use crate::layer::SurfaceId;
use crate::markup::{Document, NodeKey};
use crate::raster::{
    PaintEngine, PaintRequest, Painted, PixelSize, ResolvedResources, ResourceHandle, ResourceKey,
    ResourceLoader, ResourceState,
};

/// What the engine saw when asked to paint.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Sketch {
    pub(crate) node: NodeKey,
    pub(crate) classes: Vec<String>,
    pub(crate) hidden: Vec<NodeKey>,
    pub(crate) pixel_ratio: f64,
    pub(crate) resources: Vec<ResourceKey>,
}

/// A finished bitmap.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Drawn {
    pub(crate) sketch: Sketch,
    pub(crate) size: PixelSize,
    pub(crate) failed: Vec<ResourceKey>,
}

/// Paint engine that records every call and hands out numbered surfaces.
#[derive(Debug, Default)]
pub(crate) struct FakePaint {
    next_surface: u32,
    resources: BTreeMap<NodeKey, Vec<ResourceKey>>,
    pub(crate) painted: Vec<Sketch>,
    pub(crate) drawn: BTreeMap<SurfaceId, Drawn>,
    pub(crate) videos: BTreeMap<SurfaceId, NodeKey>,
    pub(crate) released: Vec<SurfaceId>,
}

impl FakePaint {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Makes every paint of `node` reference `keys`.
    pub(crate) fn with_resources(mut self, node: NodeKey, keys: &[ResourceKey]) -> Self {
        self.resources.insert(node, keys.to_vec());
        self
    }

    /// Classes the element had when `surface` was painted.
    pub(crate) fn classes_of(&self, surface: SurfaceId) -> Option<&[String]> {
        self.drawn.get(&surface).map(|d| d.sketch.classes.as_slice())
    }

    /// Surfaces handed out and not yet released.
    pub(crate) fn live(&self) -> BTreeSet<SurfaceId> {
        let released: BTreeSet<_> = self.released.iter().copied().collect();
        self.drawn
            .keys()
            .chain(self.videos.keys())
            .copied()
            .filter(|s| !released.contains(s))
            .collect()
    }

    /// Number of paint calls for `node`.
    pub(crate) fn paints_of(&self, node: NodeKey) -> usize {
        self.painted.iter().filter(|s| s.node == node).count()
    }

    fn allocate(&mut self) -> SurfaceId {
        self.next_surface += 1;
        SurfaceId(self.next_surface)
    }
}

impl PaintEngine for FakePaint {
    type Commands = Sketch;

    fn paint(
        &mut self,
        doc: &dyn Document,
        node: NodeKey,
        request: &PaintRequest<'_>,
    ) -> Painted<Sketch> {
        let sketch = Sketch {
            node,
            classes: doc.classes(node),
            hidden: request.hidden.to_vec(),
            pixel_ratio: request.pixel_ratio,
            resources: self.resources.get(&node).cloned().unwrap_or_default(),
        };
        self.painted.push(sketch.clone());
        Painted {
            resources: sketch.resources.clone(),
            commands: sketch,
        }
    }

    fn draw(
        &mut self,
        commands: &Sketch,
        resources: &ResolvedResources,
        size: PixelSize,
    ) -> SurfaceId {
        let surface = self.allocate();
        let failed = commands
            .resources
            .iter()
            .copied()
            .filter(|k| resources.failed(*k))
            .collect();
        self.drawn.insert(
            surface,
            Drawn {
                sketch: commands.clone(),
                size,
                failed,
            },
        );
        surface
    }

    fn video_surface(&mut self, _doc: &dyn Document, node: NodeKey) -> Option<SurfaceId> {
        let surface = self.allocate();
        self.videos.insert(surface, node);
        Some(surface)
    }

    fn release(&mut self, surface: SurfaceId) {
        self.released.push(surface);
    }
}

/// Loader whose answers are set by the test. Unscripted keys are ready.
#[derive(Debug, Default)]
pub(crate) struct FakeLoader {
    states: BTreeMap<ResourceKey, ResourceState>,
    pub(crate) requests: BTreeMap<ResourceKey, u32>,
}

impl FakeLoader {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&mut self, key: ResourceKey, state: ResourceState) {
        self.states.insert(key, state);
    }
}

impl ResourceLoader for FakeLoader {
    fn request(&mut self, key: ResourceKey) {
        *self.requests.entry(key).or_default() += 1;
    }

    fn poll(&mut self, key: ResourceKey) -> ResourceState {
        self.states
            .get(&key)
            .copied()
            .unwrap_or(ResourceState::Ready(ResourceHandle(key.0)))
    }
}
