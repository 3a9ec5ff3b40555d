// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! FIFO rasterization queue with set semantics.

use alloc::collections::{BTreeSet, VecDeque};

use crate::layer::LayerId;

/// Layers waiting to be rasterized, oldest first. A layer is never queued
/// twice.
#[derive(Clone, Debug, Default)]
pub struct RasterQueue {
    order: VecDeque<LayerId>,
    members: BTreeSet<LayerId>,
}

impl RasterQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `layer` unless it is already queued. Returns `true` if added.
    pub fn push(&mut self, layer: LayerId) -> bool {
        if self.members.insert(layer) {
            self.order.push_back(layer);
            true
        } else {
            false
        }
    }

    /// Removes and returns the oldest layer accepted by `ready`. Layers it
    /// rejects keep their place.
    pub fn pop_where(&mut self, mut ready: impl FnMut(LayerId) -> bool) -> Option<LayerId> {
        let pos = self.order.iter().position(|l| ready(*l))?;
        let layer = self.order.remove(pos)?;
        self.members.remove(&layer);
        Some(layer)
    }

    /// Drops `layer` from the queue. Returns `true` if it was queued.
    pub fn remove(&mut self, layer: LayerId) -> bool {
        if self.members.remove(&layer) {
            self.order.retain(|l| *l != layer);
            true
        } else {
            false
        }
    }

    /// Returns `true` if `layer` is queued.
    #[must_use]
    pub fn contains(&self, layer: LayerId) -> bool {
        self.members.contains(&layer)
    }

    /// Number of queued layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Queued layers, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.order.iter().copied()
    }
}
