// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Which document changes invalidate which layer.
//!
//! Events drained from [`Document::take_events`] are routed to the nearest
//! enclosing layer and classified:
//!
//! - Attribute writes count only when the recorded old value differs from the
//!   value observed now. A `class` change is ignored when every added or
//!   removed class is [`HOVER_CLASS`] or one of the owning layer's declared
//!   states, since those bitmaps are already cached.
//! - Text changes repaint. Child-list changes repaint and re-walk child
//!   layers, as do changes to the [`attr::LAYER`] opt-in.
//! - Resizes and forced refreshes always repaint.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::config::{HOVER_CLASS, attr};
use crate::layer::{LayerId, LayerRegistry, LayerStore};
use crate::markup::{Document, DomEvent, MutationKind, MutationRecord, NodeKey};
use crate::trace::InvalidationSource;

/// What an event requires of its layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Invalidation {
    /// Nothing.
    Ignore,
    /// Rasterize again.
    Raster,
    /// Rasterize again and re-walk the child layers.
    Structure,
}

/// The layer a mutation is checked against.
#[derive(Clone, Copy, Debug)]
pub struct Owner<'a> {
    /// Declared states of the owning layer.
    pub states: &'a [String],
    /// The value Lamina itself wrote to [`attr::LAYER`] on the record's target,
    /// when the target is a layer element.
    pub marker: Option<&'a str>,
}

/// A document event resolved to the layer it invalidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Routed {
    /// The owning layer.
    pub layer: LayerId,
    /// The element the event targeted.
    pub target: NodeKey,
    /// Kind of event.
    pub source: InvalidationSource,
    /// What the layer needs.
    pub invalidation: Invalidation,
}

/// Classifies one mutation record against its owning layer.
#[must_use]
pub fn classify_mutation(
    doc: &dyn Document,
    record: &MutationRecord,
    owner: &Owner<'_>,
) -> Invalidation {
    match &record.kind {
        MutationKind::CharacterData => Invalidation::Raster,
        MutationKind::ChildList => Invalidation::Structure,
        MutationKind::Attributes { name, old_value } => {
            let current = doc.attribute(record.target, name);
            if current == *old_value {
                return Invalidation::Ignore;
            }
            if name == "class" {
                let changed = class_delta(
                    old_value.as_deref().unwrap_or(""),
                    current.as_deref().unwrap_or(""),
                );
                let inert = changed
                    .iter()
                    .all(|c| *c == HOVER_CLASS || owner.states.iter().any(|s| s == c));
                if inert {
                    Invalidation::Ignore
                } else {
                    Invalidation::Raster
                }
            } else if name == attr::LAYER {
                if owner.marker.is_some() && current.as_deref() == owner.marker {
                    Invalidation::Ignore
                } else {
                    Invalidation::Structure
                }
            } else {
                Invalidation::Raster
            }
        }
    }
}

/// Classes present in exactly one of two class attribute values.
fn class_delta<'s>(old: &'s str, new: &'s str) -> Vec<&'s str> {
    let old: Vec<&str> = old.split_whitespace().collect();
    let new: Vec<&str> = new.split_whitespace().collect();
    let mut delta: Vec<&str> = old
        .iter()
        .filter(|c| !new.contains(*c))
        .chain(new.iter().filter(|c| !old.contains(*c)))
        .copied()
        .collect();
    delta.sort_unstable();
    delta.dedup();
    delta
}

/// The layer of `node` or of its nearest ancestor that backs one.
#[must_use]
pub fn owning_layer(
    doc: &dyn Document,
    registry: &LayerRegistry,
    node: NodeKey,
) -> Option<LayerId> {
    let mut current = Some(node);
    while let Some(n) = current {
        if let Some(id) = registry.get(n) {
            return Some(id);
        }
        current = doc.parent(n);
    }
    None
}

/// Routes and classifies one event.
///
/// Returns `None` when no layer encloses the target or the event changes
/// nothing the layer depends on.
#[must_use]
pub fn route_event(
    doc: &dyn Document,
    registry: &LayerRegistry,
    store: &LayerStore,
    event: &DomEvent,
) -> Option<Routed> {
    let (target, source) = match event {
        DomEvent::Mutation(record) => (record.target, InvalidationSource::Mutation),
        DomEvent::Resize(node) => (*node, InvalidationSource::Resize),
        DomEvent::Refresh { target, .. } => (*target, InvalidationSource::Refresh),
    };
    let layer = owning_layer(doc, registry, target).filter(|l| store.is_alive(*l))?;

    let invalidation = match event {
        DomEvent::Mutation(record) => {
            let marker = (store.node(layer) == target).then(|| layer.index().to_string());
            let owner = Owner {
                states: &store.config(layer).states,
                marker: marker.as_deref(),
            };
            classify_mutation(doc, record, &owner)
        }
        DomEvent::Resize(_) | DomEvent::Refresh { .. } => Invalidation::Raster,
    };
    (invalidation != Invalidation::Ignore).then_some(Routed {
        layer,
        target,
        source,
        invalidation,
    })
}
