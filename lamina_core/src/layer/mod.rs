// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer tree data model.
//!
//! A *layer* is a panel in 3D space that displays one element's rendering.
//! Each layer has:
//!
//! - An identity ([`LayerId`]), a generational handle that becomes stale when
//!   the layer is disposed.
//! - Topology: parent, first-child, and sibling links mirroring the nesting
//!   of layer elements in the document.
//! - A [`StateCache`] of bitmaps and measured boxes keyed by (state, hover
//!   level), filled by [`raster`](crate::raster).
//! - **Computed properties** produced by
//!   [`update_layout`](LayerStore::update_layout): live and target poses,
//!   opacity, visibility and the bound bitmap.
//!
//! Layers are stored in struct-of-arrays layout with index-based handles.
//! The [`LayerRegistry`] maps elements to their layers.
//!
//! # Dirty tracking
//!
//! Mutations mark the channels in [`dirty`](crate::dirty):
//!
//! - **RASTER**: the layer's content must be measured and drawn again.
//! - **TOPOLOGY**: the layer's child layers must be re-walked. A structural
//!   change also marks RASTER, since its box may have moved.

mod evaluate;
mod id;
mod registry;
mod state;
mod store;
mod traverse;

pub use evaluate::FrameChanges;
pub use id::{INVALID, LayerId, SurfaceId};
pub use registry::{ChildSync, LayerRegistry, walk_child_layers};
pub use state::{CacheEntry, StateCache};
pub use store::LayerStore;
pub use traverse::Children;
