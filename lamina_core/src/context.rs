// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render context shared by the rasterization pipeline and the raycaster.
//!
//! Holds the state that would otherwise be ambient: whether measurement
//! currently ignores CSS transforms, the device pixel ratio, and the set of
//! elements carrying the synthesized [`HOVER_CLASS`], kept per root layer. One context belongs to
//! one [`LayerScene`](crate::scene::LayerScene) and is threaded through every
//! update and rasterization call.

use alloc::collections::{BTreeMap, BTreeSet};

use crate::config::HOVER_CLASS;
use crate::layer::LayerId;
use crate::markup::{Document, MeasureOptions, NodeKey};

/// Explicit replacement for document-wide rendering flags.
#[derive(Clone, Debug)]
pub struct RenderContext {
    device_pixel_ratio: f64,
    transforms_disabled: bool,
    hovered: BTreeMap<LayerId, BTreeSet<NodeKey>>,
}

impl RenderContext {
    /// Creates a context for a display with the given device pixel ratio.
    #[must_use]
    pub fn new(device_pixel_ratio: f64) -> Self {
        Self {
            device_pixel_ratio,
            transforms_disabled: false,
            hovered: BTreeMap::new(),
        }
    }

    /// Device pixels per page pixel.
    #[must_use]
    pub fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    /// Changes the device pixel ratio used by later rasterization passes.
    pub fn set_device_pixel_ratio(&mut self, ratio: f64) {
        self.device_pixel_ratio = ratio;
    }

    /// Starts a measurement critical section: transforms are ignored until
    /// [`thaw`](Self::thaw).
    pub fn freeze(&mut self) {
        self.transforms_disabled = true;
    }

    /// Ends the critical section started by [`freeze`](Self::freeze).
    pub fn thaw(&mut self) {
        self.transforms_disabled = false;
    }

    /// Returns `true` inside a measurement critical section.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.transforms_disabled
    }

    /// Options to pass to [`Document::measure`].
    #[must_use]
    pub fn measure_options(&self) -> MeasureOptions {
        MeasureOptions {
            transforms_disabled: self.transforms_disabled,
        }
    }

    /// Elements the rays of `root` put the hover class on.
    #[must_use]
    pub fn hovered(&self, root: LayerId) -> Option<&BTreeSet<NodeKey>> {
        self.hovered.get(&root)
    }

    /// Returns `true` if any root currently holds the hover class on `node`.
    #[must_use]
    pub fn is_hovered(&self, node: NodeKey) -> bool {
        self.hovered.values().any(|set| set.contains(&node))
    }

    /// Moves the hover class of `root` from its previous set of elements to
    /// `next`.
    ///
    /// Only elements whose membership changed are written. An element shared
    /// with another root's set (a common ancestor) keeps the class until no
    /// root holds it.
    pub fn reconcile_hover(
        &mut self,
        doc: &mut dyn Document,
        root: LayerId,
        next: BTreeSet<NodeKey>,
    ) {
        let previous = self.hovered.remove(&root).unwrap_or_default();
        for node in previous.difference(&next) {
            if !self.is_hovered(*node) && doc.contains(*node) {
                doc.remove_class(*node, HOVER_CLASS);
            }
        }
        for node in next.difference(&previous) {
            if !self.is_hovered(*node) {
                doc.add_class(*node, HOVER_CLASS);
            }
        }
        if !next.is_empty() {
            self.hovered.insert(root, next);
        }
    }

    /// Removes every hover class written by this context and leaves any
    /// critical section.
    pub fn teardown(&mut self, doc: &mut dyn Document) {
        let all: BTreeSet<NodeKey> = core::mem::take(&mut self.hovered)
            .into_values()
            .flatten()
            .collect();
        for node in all {
            if doc.contains(node) {
                doc.remove_class(node, HOVER_CLASS);
            }
        }
        self.thaw();
    }
}
