// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contract for the scene graph that displays layers.
//!
//! Lamina computes poses, opacities and bitmap bindings but does not own any
//! meshes or textures. A host integration provides:
//!
//! - **Paint engine** — Implements
//!   [`PaintEngine`](crate::raster::PaintEngine) to turn elements into
//!   drawing commands and bitmaps.
//!
//! - **Resource loader** — Implements
//!   [`ResourceLoader`](crate::raster::ResourceLoader) for images and other
//!   external content referenced while painting.
//!
//! - **Presenter** — Implements the [`Presenter`] trait to apply frame
//!   changes to its scene graph: one panel node per layer, a textured unit
//!   quad under it, and a material opacity.
//!
//! - **Clock** — Implements [`Clock`](crate::time::Clock) when rasterization
//!   is sliced with [`FixedSlice`](crate::raster::FixedSlice).

use crate::layer::{FrameChanges, LayerStore};

/// Applies per-frame layer changes to a scene graph.
///
/// # Frame loop pseudocode
///
/// ```rust,ignore
/// fn on_frame(lerp: f64) {
///     // Consume document events, resolve hover, advance layout.
///     let changes = scene.update(root, &mut doc, lerp)?;
///
///     // Present: move panels, fade materials, bind textures.
///     presenter.apply(scene.store(), &changes);
/// }
///
/// fn on_idle(deadline: &dyn Budget) {
///     // Measure queued layers and run settled draws.
///     scene.rasterize(&mut doc, deadline);
/// }
/// ```
pub trait Presenter {
    /// Applies the given [`FrameChanges`] to the scene graph, reading current
    /// values from `store` through its `*_at()` accessors.
    fn apply(&mut self, store: &LayerStore, changes: &FrameChanges);
}
