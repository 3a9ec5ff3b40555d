// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer caching, invalidation and rasterization scheduling for projecting
//! markup onto panels in 3D space.
//!
//! `lamina_core` turns marked elements of a [`Document`](markup::Document)
//! into a tree of layers. Each layer caches one bitmap per (state, hover
//! level), follows its element's measured box through layout, fades in and
//! out, and is rasterized again only when its content changes. It is
//! `no_std` compatible (with `alloc`) and stores layers in struct-of-arrays
//! form addressed by generational handles.
//!
//! # Architecture
//!
//! The crate is organized around two host callbacks: a per-frame update and
//! an idle-time rasterization slice.
//!
//! ```text
//!   Document events ──► invalidate::route_event() ──► dirty channels
//!                                                          │
//!        ┌─────────────────────────────────────────────────┘
//!        ▼
//!   LayerScene::update() ──► FrameChanges ──► Presenter::apply()
//!        │
//!        ▼
//!   RasterQueue ──► LayerScene::rasterize(budget)
//!                        │
//!                        ├─► measure pass ──► PaintEngine::paint()
//!                        └─► settled batch ──► PaintEngine::draw() ──► StateCache
//! ```
//!
//! **[`scene`]**: The [`LayerScene`](scene::LayerScene) driver that owns
//! every other piece and runs the update steps in order.
//!
//! **[`layer`]**: Struct-of-arrays layer tree, the element registry, the
//! per-layer bitmap cache and per-frame layout evaluation.
//!
//! **[`markup`]**: The [`Document`](markup::Document) trait the host's
//! markup tree implements, plus an in-memory document.
//!
//! **[`invalidate`]**: Classifies document mutations and routes events to
//! the nearest owning layer.
//!
//! **[`raster`]**: Deduplicated queue, time budgets and the two-phase
//! measure-then-draw pipeline.
//!
//! **[`dirty`]**: RASTER and TOPOLOGY channels via `understory_dirty`.
//!
//! **[`config`]**: Attribute names and the per-layer and per-scene
//! configuration read from the document.
//!
//! **[`layout`]**: Box-to-pose mapping in pixel-sized world units.
//!
//! **[`raycast`]**: Ray/quad intersection for hit testing and hover.
//!
//! **[`context`]**: Device pixel ratio, the transform freeze used while
//! measuring, and hover bookkeeping.
//!
//! **[`backend`]**: The [`Presenter`](backend::Presenter) trait and the
//! host contract.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types,
//! with zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! **[`pose`]**, **[`transform`]**, **[`time`]**: Math and time primitives.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod backend;
pub mod config;
pub mod context;
pub mod dirty;
pub mod error;
pub mod invalidate;
pub mod layer;
pub mod layout;
pub mod markup;
pub mod pose;
pub mod raster;
pub mod raycast;
pub mod scene;
pub mod time;
pub mod trace;
pub mod transform;

#[cfg(test)]
mod testing;
