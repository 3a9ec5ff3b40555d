// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Invalidation marks layers in an [`understory_dirty`] tracker owned by the
//! [`LayerStore`](crate::layer::LayerStore). Both channels are local-only:
//! a layer's pixels and child set do not depend on its ancestors.
//!
//! - [`RASTER`] is marked by content mutations, resizes and forced refreshes.
//!   Draining it sends the layer to the rasterization queue.
//! - [`TOPOLOGY`] is marked by child-list changes and by changes to the layer
//!   marker attribute. Draining it re-walks the layer's child layers.
//!
//! Both are drained once per [`LayerScene::update`](crate::scene::LayerScene::update).

use understory_dirty::Channel;

/// Pixels are stale; the layer must be rasterized again.
pub const RASTER: Channel = Channel::new(0);

/// The set of child layers may have changed.
pub const TOPOLOGY: Channel = Channel::new(1);
