// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory [`Document`] for headless runs and tests.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use kurbo::{Rect, Vec2};

use super::{
    Bounds, Document, DomEvent, MeasureOptions, MutationKind, MutationRecord, NodeKey,
    RefreshCause,
};

#[derive(Clone, Debug)]
struct Element {
    tag: String,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
    attributes: BTreeMap<String, String>,
    text: String,
    rect: Rect,
    scroll: Vec2,
    /// Boxes that replace `rect` while the element carries a class.
    class_rects: Vec<(String, Rect)>,
    /// Offset applied by a CSS transform, ignored while transforms are disabled.
    transform_offset: Vec2,
}

impl Element {
    fn new(tag: &str, parent: Option<NodeKey>, rect: Rect) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            parent,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            text: String::new(),
            rect,
            scroll: Vec2::ZERO,
            class_rects: Vec::new(),
            transform_offset: Vec2::ZERO,
        }
    }
}

/// A document held entirely in memory.
///
/// Every structural or attribute write is recorded as a [`DomEvent`], the
/// same way a browser's mutation and resize observers would report it, so the
/// invalidation path can be exercised without a browser.
///
/// Layout is explicit: each element has a fixed box set with
/// [`set_rect`](Self::set_rect), optionally replaced while the element has a
/// given class ([`set_class_rect`](Self::set_class_rect)).
#[derive(Clone, Debug)]
pub struct MemoryDocument {
    elements: BTreeMap<NodeKey, Element>,
    root: NodeKey,
    next_key: u64,
    viewport: Rect,
    events: Vec<DomEvent>,
}

impl MemoryDocument {
    /// Creates a document whose `body` element fills `viewport`.
    #[must_use]
    pub fn new(viewport: Rect) -> Self {
        let root = NodeKey(0);
        let mut elements = BTreeMap::new();
        elements.insert(root, Element::new("body", None, viewport));
        Self {
            elements,
            root,
            next_key: 1,
            viewport,
            events: Vec::new(),
        }
    }

    /// The `body` element.
    #[must_use]
    pub const fn root(&self) -> NodeKey {
        self.root
    }

    /// Number of attached elements, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Always `false`; the root element cannot be removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of events waiting for [`take_events`](Document::take_events).
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Appends a new element under `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is not attached.
    pub fn create_element(&mut self, parent: NodeKey, tag: &str, rect: Rect) -> NodeKey {
        let key = NodeKey(self.next_key);
        self.next_key += 1;
        let Some(p) = self.elements.get_mut(&parent) else {
            panic!("parent {parent:?} is not attached");
        };
        p.children.push(key);
        self.elements.insert(key, Element::new(tag, Some(parent), rect));
        self.record_child_list(parent);
        key
    }

    /// Detaches `node` and its subtree. The root cannot be removed.
    pub fn remove(&mut self, node: NodeKey) {
        if node == self.root {
            return;
        }
        let Some(parent) = self.elements.get(&node).and_then(|e| e.parent) else {
            return;
        };
        if let Some(p) = self.elements.get_mut(&parent) {
            p.children.retain(|&c| c != node);
        }
        let mut stack = alloc::vec![node];
        while let Some(n) = stack.pop() {
            if let Some(e) = self.elements.remove(&n) {
                stack.extend(e.children);
            }
        }
        self.record_child_list(parent);
    }

    /// Moves `node` to the end of `new_parent`'s children.
    pub fn move_element(&mut self, node: NodeKey, new_parent: NodeKey) {
        if node == self.root || !self.elements.contains_key(&new_parent) {
            return;
        }
        let Some(old_parent) = self.elements.get(&node).and_then(|e| e.parent) else {
            return;
        };
        if let Some(p) = self.elements.get_mut(&old_parent) {
            p.children.retain(|&c| c != node);
        }
        if let Some(p) = self.elements.get_mut(&new_parent) {
            p.children.push(node);
        }
        if let Some(e) = self.elements.get_mut(&node) {
            e.parent = Some(new_parent);
        }
        self.record_child_list(old_parent);
        self.record_child_list(new_parent);
    }

    /// Replaces the element's text content.
    pub fn set_text(&mut self, node: NodeKey, text: &str) {
        if let Some(e) = self.elements.get_mut(&node)
            && e.text != text
        {
            e.text = String::from(text);
            self.events.push(DomEvent::Mutation(MutationRecord {
                target: node,
                kind: MutationKind::CharacterData,
            }));
        }
    }

    /// The element's text content.
    #[must_use]
    pub fn text(&self, node: NodeKey) -> Option<&str> {
        self.elements.get(&node).map(|e| e.text.as_str())
    }

    /// Sets the element's box. Records a resize when the size changes.
    pub fn set_rect(&mut self, node: NodeKey, rect: Rect) {
        if let Some(e) = self.elements.get_mut(&node) {
            let resized = e.rect.size() != rect.size();
            e.rect = rect;
            if resized {
                self.events.push(DomEvent::Resize(node));
            }
        }
    }

    /// Sets the element's scroll offset.
    pub fn set_scroll(&mut self, node: NodeKey, scroll: Vec2) {
        if let Some(e) = self.elements.get_mut(&node) {
            e.scroll = scroll;
        }
    }

    /// Uses `rect` as the element's box whenever it has `class`.
    ///
    /// When several overrides match, the last one registered wins.
    pub fn set_class_rect(&mut self, node: NodeKey, class: &str, rect: Rect) {
        if let Some(e) = self.elements.get_mut(&node) {
            e.class_rects.retain(|(c, _)| c != class);
            e.class_rects.push((String::from(class), rect));
        }
    }

    /// Offsets the measured box as a CSS transform would.
    pub fn set_transform_offset(&mut self, node: NodeKey, offset: Vec2) {
        if let Some(e) = self.elements.get_mut(&node) {
            e.transform_offset = offset;
        }
    }

    /// Queues a forced refresh on `node`, as an input or focus event would.
    pub fn dispatch(&mut self, node: NodeKey, cause: RefreshCause) {
        if self.elements.contains_key(&node) {
            self.events.push(DomEvent::Refresh {
                target: node,
                cause,
            });
        }
    }

    fn record_child_list(&mut self, parent: NodeKey) {
        self.events.push(DomEvent::Mutation(MutationRecord {
            target: parent,
            kind: MutationKind::ChildList,
        }));
    }
}

impl Document for MemoryDocument {
    fn contains(&self, node: NodeKey) -> bool {
        self.elements.contains_key(&node)
    }

    fn parent(&self, node: NodeKey) -> Option<NodeKey> {
        self.elements.get(&node).and_then(|e| e.parent)
    }

    fn children(&self, node: NodeKey) -> Vec<NodeKey> {
        self.elements
            .get(&node)
            .map(|e| e.children.clone())
            .unwrap_or_default()
    }

    fn tag_name(&self, node: NodeKey) -> Option<String> {
        self.elements.get(&node).map(|e| e.tag.clone())
    }

    fn attribute(&self, node: NodeKey, name: &str) -> Option<String> {
        self.elements
            .get(&node)
            .and_then(|e| e.attributes.get(name).cloned())
    }

    fn set_attribute(&mut self, node: NodeKey, name: &str, value: &str) {
        if let Some(e) = self.elements.get_mut(&node) {
            let old_value = e.attributes.insert(String::from(name), String::from(value));
            self.events.push(DomEvent::Mutation(MutationRecord {
                target: node,
                kind: MutationKind::Attributes {
                    name: String::from(name),
                    old_value,
                },
            }));
        }
    }

    fn remove_attribute(&mut self, node: NodeKey, name: &str) {
        if let Some(e) = self.elements.get_mut(&node)
            && let Some(old) = e.attributes.remove(name)
        {
            self.events.push(DomEvent::Mutation(MutationRecord {
                target: node,
                kind: MutationKind::Attributes {
                    name: String::from(name),
                    old_value: Some(old),
                },
            }));
        }
    }

    fn measure(&self, node: NodeKey, options: MeasureOptions) -> Option<Bounds> {
        let e = self.elements.get(&node)?;
        let classes = self.classes(node);
        let mut rect = e.rect;
        for (class, r) in &e.class_rects {
            if classes.iter().any(|c| c == class) {
                rect = *r;
            }
        }
        if !options.transforms_disabled {
            rect = rect + e.transform_offset;
        }
        Some(Bounds {
            rect,
            scroll: e.scroll,
        })
    }

    fn viewport(&self) -> Rect {
        self.viewport
    }

    fn take_events(&mut self) -> Vec<DomEvent> {
        core::mem::take(&mut self.events)
    }
}
