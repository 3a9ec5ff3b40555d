// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element-to-layer identity and the child-layer walk.
//!
//! Every element that backs a layer is entered in a [`LayerRegistry`] keyed by
//! its [`NodeKey`]. Entries are inserted when a layer is created and removed
//! when it is disposed; nothing depends on the element's own lifetime.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::ToString;
use alloc::vec::Vec;

use super::id::LayerId;
use super::store::LayerStore;
use crate::config::{LayoutPolicy, attr, is_layer_element};
use crate::markup::{Document, NodeKey};

/// One-to-one map from elements to their layers.
#[derive(Clone, Debug, Default)]
pub struct LayerRegistry {
    by_node: BTreeMap<NodeKey, LayerId>,
}

/// Outcome of [`LayerRegistry::sync_children`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChildSync {
    /// Layers created for newly found elements, in document order.
    pub created: Vec<LayerId>,
    /// Existing layers moved under the walked layer or brought back from a
    /// pending removal.
    pub adopted: Vec<LayerId>,
    /// Previous children that were not found and now fade out.
    pub orphaned: Vec<LayerId>,
}

impl LayerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The layer backed by `node`.
    #[must_use]
    pub fn get(&self, node: NodeKey) -> Option<LayerId> {
        self.by_node.get(&node).copied()
    }

    /// Returns `true` if `node` backs a layer.
    #[must_use]
    pub fn contains(&self, node: NodeKey) -> bool {
        self.by_node.contains_key(&node)
    }

    /// Records that `node` backs `layer`, returning a previous entry.
    pub fn insert(&mut self, node: NodeKey, layer: LayerId) -> Option<LayerId> {
        self.by_node.insert(node, layer)
    }

    /// Forgets `node`.
    pub fn remove(&mut self, node: NodeKey) -> Option<LayerId> {
        self.by_node.remove(&node)
    }

    /// Number of registered elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }

    /// All entries, ordered by element key.
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, LayerId)> + '_ {
        self.by_node.iter().map(|(n, l)| (*n, *l))
    }

    /// Re-walks the child layers of `parent` and brings the layer tree in line.
    ///
    /// Registered elements keep their layer and are moved under `parent` if
    /// they currently sit elsewhere (unless that would create a cycle). A
    /// pending removal on a found layer is cancelled. New elements get a layer
    /// whose slot index is written to their [`attr::LAYER`] attribute.
    /// Children of `parent` that were not found are flagged for removal.
    pub fn sync_children(
        &mut self,
        store: &mut LayerStore,
        doc: &mut dyn Document,
        parent: LayerId,
        policy: LayoutPolicy,
    ) -> ChildSync {
        let node = store.node(parent);
        let found = walk_child_layers(&*doc, node, |n| is_layer_element(&*doc, n));

        let mut sync = ChildSync::default();
        let mut seen = BTreeSet::new();
        for child_node in found {
            if let Some(id) = self.get(child_node) {
                let mut adopted = false;
                if store.parent(id) != Some(parent) {
                    if store.is_ancestor_or_self(id, parent) {
                        continue;
                    }
                    store.reparent(id, parent);
                    adopted = true;
                }
                adopted |= store.cancel_removal(id);
                if adopted {
                    store.mark_dirty(id);
                    sync.adopted.push(id);
                }
                seen.insert(id);
            } else {
                let id = store.create_layer(child_node, policy);
                store.add_child(parent, id);
                self.insert(child_node, id);
                doc.set_attribute(child_node, attr::LAYER, &id.index().to_string());
                sync.created.push(id);
                seen.insert(id);
            }
        }

        let previous: Vec<LayerId> = store.children(parent).collect();
        for child in previous {
            if !seen.contains(&child) && store.request_removal(child) {
                sync.orphaned.push(child);
            }
        }
        sync
    }
}

/// Finds the layer elements below `node`, in document order.
///
/// The walk is depth-first and never descends into an element for which
/// `is_boundary` returns `true`: such an element is reported and its subtree
/// belongs to it. `node` itself is not tested.
pub fn walk_child_layers(
    doc: &dyn Document,
    node: NodeKey,
    is_boundary: impl Fn(NodeKey) -> bool,
) -> Vec<NodeKey> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeKey> = doc.children(node).into_iter().rev().collect();
    while let Some(n) = stack.pop() {
        if is_boundary(n) {
            out.push(n);
        } else {
            stack.extend(doc.children(n).into_iter().rev());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use kurbo::Rect;

    use super::*;
    use crate::markup::MemoryDocument;

    const R: Rect = Rect::new(0.0, 0.0, 10.0, 10.0);

    fn layer_el(doc: &mut MemoryDocument, parent: NodeKey) -> NodeKey {
        let n = doc.create_element(parent, "div", R);
        doc.set_attribute(n, attr::LAYER, "");
        n
    }

    #[test]
    fn walk_stops_at_boundaries() {
        let mut doc = MemoryDocument::new(R);
        let body = doc.root();
        let a = layer_el(&mut doc, body);
        let a_inner = layer_el(&mut doc, a);
        let wrapper = doc.create_element(body, "section", R);
        let b = layer_el(&mut doc, wrapper);
        let video = doc.create_element(wrapper, "video", R);

        let found = walk_child_layers(&doc, body, |n| is_layer_element(&doc, n));
        assert_eq!(found, vec![a, b, video]);
        assert!(!found.contains(&a_inner));

        let inside_a = walk_child_layers(&doc, a, |n| is_layer_element(&doc, n));
        assert_eq!(inside_a, vec![a_inner]);
    }

    #[test]
    fn sync_reuses_layers_across_walks() {
        let mut doc = MemoryDocument::new(R);
        let body = doc.root();
        let a = layer_el(&mut doc, body);
        let mut store = LayerStore::new();
        let mut registry = LayerRegistry::new();
        let root = store.create_layer(body, LayoutPolicy::Auto);
        registry.insert(body, root);

        let first = registry.sync_children(&mut store, &mut doc, root, LayoutPolicy::Auto);
        assert_eq!(first.created.len(), 1);
        let layer_a = first.created[0];
        assert_eq!(registry.get(a), Some(layer_a));
        assert_eq!(doc.attribute(a, attr::LAYER), Some(layer_a.index().to_string()));

        let second = registry.sync_children(&mut store, &mut doc, root, LayoutPolicy::Auto);
        assert_eq!(second, ChildSync::default());
        assert_eq!(registry.get(a), Some(layer_a));
        assert_eq!(store.children(root).collect::<Vec<_>>(), vec![layer_a]);
    }

    #[test]
    fn sync_flags_missing_children_and_revives_returning_ones() {
        let mut doc = MemoryDocument::new(R);
        let body = doc.root();
        let holder = doc.create_element(body, "div", R);
        let a = layer_el(&mut doc, holder);
        let mut store = LayerStore::new();
        let mut registry = LayerRegistry::new();
        let root = store.create_layer(body, LayoutPolicy::Auto);
        registry.insert(body, root);
        let layer_a = registry
            .sync_children(&mut store, &mut doc, root, LayoutPolicy::Auto)
            .created[0];

        doc.remove_attribute(a, attr::LAYER);
        let gone = registry.sync_children(&mut store, &mut doc, root, LayoutPolicy::Auto);
        assert_eq!(gone.orphaned, vec![layer_a]);
        assert!(store.removal_requested(layer_a));

        // A second walk does not report the same orphan again.
        let again = registry.sync_children(&mut store, &mut doc, root, LayoutPolicy::Auto);
        assert!(again.orphaned.is_empty());

        doc.set_attribute(a, attr::LAYER, "");
        let back = registry.sync_children(&mut store, &mut doc, root, LayoutPolicy::Auto);
        assert_eq!(back.adopted, vec![layer_a]);
        assert!(!store.removal_requested(layer_a));
    }

    #[test]
    fn sync_moves_layers_between_parents() {
        let mut doc = MemoryDocument::new(R);
        let body = doc.root();
        let a = layer_el(&mut doc, body);
        let b = layer_el(&mut doc, body);
        let c = layer_el(&mut doc, a);
        let mut store = LayerStore::new();
        let mut registry = LayerRegistry::new();
        let root = store.create_layer(body, LayoutPolicy::Auto);
        registry.insert(body, root);
        let created = registry
            .sync_children(&mut store, &mut doc, root, LayoutPolicy::Auto)
            .created;
        let (layer_a, layer_b) = (created[0], created[1]);
        let layer_c = registry
            .sync_children(&mut store, &mut doc, layer_a, LayoutPolicy::Auto)
            .created[0];
        assert_eq!(registry.get(c), Some(layer_c));

        doc.move_element(c, b);
        let moved = registry.sync_children(&mut store, &mut doc, layer_b, LayoutPolicy::Auto);
        assert_eq!(moved.adopted, vec![layer_c]);
        assert_eq!(store.parent(layer_c), Some(layer_b));
        assert_eq!(store.children(layer_a).count(), 0);
    }
}
