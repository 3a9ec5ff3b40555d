// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported for configuration misuse.

use thiserror::Error;

use crate::layer::LayerId;
use crate::markup::NodeKey;

/// Misuse of the [`LayerScene`](crate::scene::LayerScene) API.
///
/// These are programmer errors, reported synchronously. Runtime conditions
/// such as failed resource loads or zero-area boxes are never errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LayerError {
    /// A root-only operation was called on a child layer.
    #[error("layer {0:?} is not a root layer")]
    NotRoot(LayerId),
    /// The layer has been disposed.
    #[error("layer {0:?} has been disposed")]
    StaleLayer(LayerId),
    /// The element is not attached to the document.
    #[error("element {0:?} is not attached to the document")]
    UnknownNode(NodeKey),
    /// The element already backs a layer.
    #[error("element {node:?} already backs layer {layer:?}")]
    AlreadyLayer {
        /// The element.
        node: NodeKey,
        /// Its existing layer.
        layer: LayerId,
    },
    /// A device pixel ratio that is not a positive finite number.
    #[error("device pixel ratio must be positive and finite")]
    InvalidPixelRatio,
}

/// Result alias for [`LayerError`].
pub type Result<T, E = LayerError> = core::result::Result<T, E>;
