// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use alloc::vec::Vec;

use super::id::{INVALID, LayerId};
use super::store::LayerStore;

/// An iterator over the direct children of a layer.
///
/// Created by [`LayerStore::children`].
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a LayerStore,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a LayerStore, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = LayerId;

    fn next(&mut self) -> Option<LayerId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_sibling[idx as usize];
        Some(self.store.id_at(idx))
    }
}

impl LayerStore {
    /// Returns `id` and all its descendants in depth-first pre-order, so every
    /// parent comes before its children.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn subtree(&self, id: LayerId) -> Vec<LayerId> {
        self.validate(id);
        let mut out = Vec::new();
        let mut stack = alloc::vec![id.idx];
        while let Some(idx) = stack.pop() {
            out.push(self.id_at(idx));
            let mut child = self.first_child[idx as usize];
            let mut kids = Vec::new();
            while child != INVALID {
                kids.push(child);
                child = self.next_sibling[child as usize];
            }
            stack.extend(kids.into_iter().rev());
        }
        out
    }

    /// Returns `id` and all its descendants ordered so every child comes
    /// before its parent. `id` itself is last.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn subtree_children_first(&self, id: LayerId) -> Vec<LayerId> {
        let mut order = self.subtree(id);
        order.reverse();
        order
    }
}
