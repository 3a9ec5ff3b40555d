// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The markup document the layers are built from.
//!
//! Lamina never owns the document. It reads the element tree, attributes and
//! box model through the [`Document`] trait, writes only class lists and the
//! layer marker attribute, and consumes change notifications as a queue of
//! [`DomEvent`]s drained once per frame with [`Document::take_events`].
//!
//! [`MemoryDocument`] is a complete in-memory implementation used for headless
//! runs and tests.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use kurbo::{Point, Rect, Vec2};

mod memory;

pub use memory::MemoryDocument;

/// Stable identifier of an element for as long as it is part of a document.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey(pub u64);

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeKey({})", self.0)
    }
}

/// A measured box in page pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    /// Border box relative to the page origin.
    pub rect: Rect,
    /// Scroll offset of the element's content.
    pub scroll: Vec2,
}

impl Bounds {
    /// Creates bounds with no scroll offset.
    #[must_use]
    pub const fn new(rect: Rect) -> Self {
        Self {
            rect,
            scroll: Vec2::ZERO,
        }
    }

    /// Returns `true` when the box has no width or no height.
    #[must_use]
    pub fn is_empty_area(&self) -> bool {
        !(self.rect.width() > 0.0 && self.rect.height() > 0.0)
    }

    /// Maps normalized `(u, v)` coordinates (origin top-left) to a page point.
    #[must_use]
    pub fn point_at(&self, uv: Point) -> Point {
        Point::new(
            self.rect.x0 + uv.x * self.rect.width(),
            self.rect.y0 + uv.y * self.rect.height(),
        )
    }
}

/// Options for [`Document::measure`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeasureOptions {
    /// Measure as if no CSS transforms were applied anywhere in the document.
    pub transforms_disabled: bool,
}

/// Why an element asked to be re-rasterized without producing a mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshCause {
    /// A form control's value is being edited.
    Input,
    /// A form control's value was committed.
    Change,
    /// The element gained focus.
    Focus,
    /// The element lost focus.
    Blur,
    /// A CSS transition finished.
    TransitionEnd,
}

/// The kind of change a [`MutationRecord`] describes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationKind {
    /// An attribute was written.
    Attributes {
        /// Attribute name.
        name: String,
        /// Value before the write, `None` if the attribute was absent.
        old_value: Option<String>,
    },
    /// Text content changed.
    CharacterData,
    /// Children were added or removed.
    ChildList,
}

/// One observed change to the document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    /// The element the change happened on. For [`MutationKind::ChildList`]
    /// this is the parent whose children changed.
    pub target: NodeKey,
    /// What changed.
    pub kind: MutationKind,
}

/// A change notification queued by the document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomEvent {
    /// Attribute, text or child-list mutation.
    Mutation(MutationRecord),
    /// The element's box changed size.
    Resize(NodeKey),
    /// The element asked to be redrawn.
    Refresh {
        /// Element the event was dispatched on.
        target: NodeKey,
        /// Event that triggered the refresh.
        cause: RefreshCause,
    },
}

/// Read access to a live element tree plus the few writes layers need.
///
/// Methods taking a [`NodeKey`] that is not part of the document return
/// `None`, an empty list, or do nothing.
pub trait Document {
    /// Returns `true` if the element is attached to the document.
    fn contains(&self, node: NodeKey) -> bool;

    /// Parent element, `None` for the document root.
    fn parent(&self, node: NodeKey) -> Option<NodeKey>;

    /// Child elements in document order.
    fn children(&self, node: NodeKey) -> Vec<NodeKey>;

    /// Lower-case tag name.
    fn tag_name(&self, node: NodeKey) -> Option<String>;

    /// Current value of an attribute.
    fn attribute(&self, node: NodeKey, name: &str) -> Option<String>;

    /// Writes an attribute.
    fn set_attribute(&mut self, node: NodeKey, name: &str, value: &str);

    /// Removes an attribute.
    fn remove_attribute(&mut self, node: NodeKey, name: &str);

    /// Measures the element's border box in page pixels.
    fn measure(&self, node: NodeKey, options: MeasureOptions) -> Option<Bounds>;

    /// The page viewport in page pixels.
    fn viewport(&self) -> Rect;

    /// Returns and clears the change notifications queued since the last call.
    fn take_events(&mut self) -> Vec<DomEvent>;

    /// Class list, in attribute order.
    fn classes(&self, node: NodeKey) -> Vec<String> {
        self.attribute(node, "class")
            .map(|v| v.split_whitespace().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Replaces the class list.
    fn set_classes(&mut self, node: NodeKey, classes: &[String]) {
        self.set_attribute(node, "class", &classes.join(" "));
    }

    /// Returns `true` if the class list contains `class`.
    fn has_class(&self, node: NodeKey, class: &str) -> bool {
        self.classes(node).iter().any(|c| c == class)
    }

    /// Adds `class` unless it is already present.
    fn add_class(&mut self, node: NodeKey, class: &str) {
        let mut classes = self.classes(node);
        if classes.iter().all(|c| c != class) {
            classes.push(String::from(class));
            self.set_classes(node, &classes);
        }
    }

    /// Removes every occurrence of `class`.
    fn remove_class(&mut self, node: NodeKey, class: &str) {
        let mut classes = self.classes(node);
        let before = classes.len();
        classes.retain(|c| c != class);
        if classes.len() != before {
            self.set_classes(node, &classes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_width_or_height_is_empty() {
        assert!(Bounds::new(Rect::new(0.0, 0.0, 0.0, 10.0)).is_empty_area());
        assert!(Bounds::new(Rect::new(0.0, 0.0, 10.0, 0.0)).is_empty_area());
        assert!(!Bounds::new(Rect::new(0.0, 0.0, 10.0, 10.0)).is_empty_area());
    }

    #[test]
    fn point_at_maps_uv_into_box() {
        let b = Bounds::new(Rect::new(100.0, 50.0, 300.0, 150.0));
        assert_eq!(b.point_at(Point::new(0.5, 0.5)), Point::new(200.0, 100.0));
        assert_eq!(b.point_at(Point::new(0.0, 1.0)), Point::new(100.0, 150.0));
    }
}
