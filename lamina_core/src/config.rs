// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene-wide settings and the per-layer markup configuration protocol.

use alloc::string::String;
use alloc::vec::Vec;

use crate::markup::{Document, NodeKey};

/// Attribute names read and written on markup elements.
pub mod attr {
    /// Opts an element into being a layer. Set to the layer's slot index once
    /// the layer exists.
    pub const LAYER: &str = "data-layer";
    /// Multiplies the device pixel ratio for this layer's bitmaps.
    pub const PIXEL_RATIO: &str = "data-layer-pixel-ratio";
    /// Space-separated declared state names.
    pub const STATES: &str = "data-layer-states";
    /// How many ancestor levels a hover on this layer's subtree reaches.
    pub const HOVER_DEPTH: &str = "data-layer-hover-depth";
    /// Document-level marker a [`Document`](crate::markup::Document) may set
    /// while measuring with transforms disabled.
    pub const DISABLE_TRANSFORMS: &str = "data-layers-disable-transforms";
}

/// Class written by the raycaster on hovered elements.
pub const HOVER_CLASS: &str = "hover";

/// The implicit state every layer has.
pub const DEFAULT_STATE: &str = "";

/// Largest accepted [`attr::HOVER_DEPTH`]. Every level costs one bitmap per
/// state, so larger values are clamped to this.
pub const MAX_HOVER_DEPTH: u32 = 8;

/// Opacity below which a layer counts as hidden.
pub const OPACITY_EPSILON: f64 = 0.005;

/// Returns `true` if `node` should become a layer.
///
/// Elements opt in with [`attr::LAYER`]; `video` elements are always layers.
#[must_use]
pub fn is_layer_element(doc: &dyn Document, node: NodeKey) -> bool {
    doc.attribute(node, attr::LAYER).is_some() || is_video(doc, node)
}

/// Returns `true` for `video` elements.
#[must_use]
pub fn is_video(doc: &dyn Document, node: NodeKey) -> bool {
    doc.tag_name(node)
        .is_some_and(|t| t.eq_ignore_ascii_case("video"))
}

/// Per-layer configuration read from markup attributes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerConfig {
    /// Multiplier on the device pixel ratio, `None` when not overridden.
    pub pixel_ratio: Option<f64>,
    /// Highest hover level that gets its own bitmap.
    pub hover_depth: u32,
    /// Declared states, excluding the implicit default state.
    pub states: Vec<String>,
}

impl LayerConfig {
    /// Reads the configuration attributes of `node`.
    ///
    /// Malformed values fall back to defaults and the hover depth is clamped
    /// to [`MAX_HOVER_DEPTH`]. State names are deduplicated,
    /// and the default state and [`HOVER_CLASS`] are never treated as
    /// declared states.
    #[must_use]
    pub fn read(doc: &dyn Document, node: NodeKey) -> Self {
        let pixel_ratio = doc
            .attribute(node, attr::PIXEL_RATIO)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|r| r.is_finite() && *r > 0.0);
        let hover_depth = doc
            .attribute(node, attr::HOVER_DEPTH)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .map_or(0, |d| d.min(MAX_HOVER_DEPTH));
        let mut states: Vec<String> = Vec::new();
        if let Some(list) = doc.attribute(node, attr::STATES) {
            for name in list.split_whitespace() {
                if name != HOVER_CLASS && !states.iter().any(|s| s == name) {
                    states.push(String::from(name));
                }
            }
        }
        Self {
            pixel_ratio,
            hover_depth,
            states,
        }
    }

    /// The default state followed by the declared states.
    pub fn all_states(&self) -> impl Iterator<Item = &str> + '_ {
        core::iter::once(DEFAULT_STATE).chain(self.states.iter().map(String::as_str))
    }

    /// Returns `true` if `class` is one of the declared states.
    #[must_use]
    pub fn declares(&self, class: &str) -> bool {
        self.states.iter().any(|s| s == class)
    }

    /// The state selected by a class list: the first declared state present,
    /// or the default state.
    #[must_use]
    pub fn select_state(&self, classes: &[String]) -> String {
        classes
            .iter()
            .find(|c| self.declares(c))
            .cloned()
            .unwrap_or_default()
    }

    /// Bitmap resolution for a given device pixel ratio.
    #[must_use]
    pub fn effective_pixel_ratio(&self, device_pixel_ratio: f64) -> f64 {
        device_pixel_ratio * self.pixel_ratio.unwrap_or(1.0)
    }
}

/// Whether a layer's panel pose follows the layout computed from its box.
///
/// The content quad always follows its layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LayoutPolicy {
    /// Follow layout only while the layer has a layer parent. Roots stay where
    /// the application put them.
    #[default]
    Auto,
    /// Always follow layout, roots included.
    Always,
    /// Never follow layout; the application positions the panel.
    Never,
}

impl LayoutPolicy {
    /// Returns `true` if the panel pose should track its target.
    #[must_use]
    pub const fn follows(self, has_layer_parent: bool) -> bool {
        match self {
            Self::Auto => has_layer_parent,
            Self::Always => true,
            Self::Never => false,
        }
    }
}

/// Scene-wide settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneConfig {
    /// World units per page pixel.
    pub pixel_size: f64,
    /// Distance along the panel normal between a layer and its parent.
    pub layer_separation: f64,
    /// Device pixels per page pixel.
    pub device_pixel_ratio: f64,
    /// Policy given to newly created layers.
    pub layout_policy: LayoutPolicy,
}

impl SceneConfig {
    /// The default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pixel_size: 0.001,
            layer_separation: 0.001,
            device_pixel_ratio: 1.0,
            layout_policy: LayoutPolicy::Auto,
        }
    }

    /// Sets the world units per page pixel.
    #[must_use]
    pub const fn with_pixel_size(mut self, pixel_size: f64) -> Self {
        self.pixel_size = pixel_size;
        self
    }

    /// Sets the per-level separation.
    #[must_use]
    pub const fn with_layer_separation(mut self, separation: f64) -> Self {
        self.layer_separation = separation;
        self
    }

    /// Sets the device pixel ratio.
    #[must_use]
    pub const fn with_device_pixel_ratio(mut self, ratio: f64) -> Self {
        self.device_pixel_ratio = ratio;
        self
    }

    /// Sets the policy given to new layers.
    #[must_use]
    pub const fn with_layout_policy(mut self, policy: LayoutPolicy) -> Self {
        self.layout_policy = policy;
        self
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::new()
    }
}
