// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rasterization scheduling.
//!
//! Dirty layers wait in a deduplicated [`RasterQueue`]. During idle time the
//! [`RasterPipeline`] dequeues layers while the [`Budget`] allows, measures
//! every (state, hover level) variant of each, and asks the host's
//! [`PaintEngine`] for drawing commands. Draws run later, once every resource
//! the commands reference has settled through the [`ResourceLoader`].

mod budget;
mod paint;
mod pipeline;
mod queue;

pub use budget::{Budget, FixedSlice, IdleDeadline, Unbounded};
pub use paint::{
    PaintEngine, PaintRequest, Painted, PixelSize, ResolvedResources, ResourceHandle, ResourceKey,
    ResourceLoader, ResourceState,
};
pub use pipeline::{RasterPipeline, RasterReport};
pub use queue::RasterQueue;
