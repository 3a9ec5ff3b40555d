// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-layer bitmap cache keyed by (state, hover level).

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use super::id::SurfaceId;
use crate::config::DEFAULT_STATE;
use crate::markup::Bounds;

/// One cached rendering of a layer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CacheEntry {
    /// The bitmap, once drawn.
    pub texture: Option<SurfaceId>,
    /// The box measured for this state and hover level.
    pub bounds: Option<Bounds>,
}

/// Bitmaps and measured boxes for every declared state × hover level.
///
/// After [`configure`](Self::configure) the cache holds exactly one entry per
/// state (the default state included) and per hover level `0..=depth`.
#[derive(Clone, Debug, Default)]
pub struct StateCache {
    entries: BTreeMap<(String, u32), CacheEntry>,
}

impl StateCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Brings the entry set in line with a configuration.
    ///
    /// Entries for states or levels no longer configured are dropped and
    /// their bitmaps returned for release. Missing entries are added as empty
    /// placeholders. Existing entries are left untouched.
    pub fn configure(&mut self, states: &[String], hover_depth: u32) -> Vec<SurfaceId> {
        let wanted = |state: &str, level: u32| {
            level <= hover_depth && (state == DEFAULT_STATE || states.iter().any(|s| s == state))
        };

        let mut released = Vec::new();
        self.entries.retain(|(state, level), entry| {
            let keep = wanted(state, *level);
            if !keep && let Some(texture) = entry.texture {
                released.push(texture);
            }
            keep
        });

        for state in core::iter::once(DEFAULT_STATE).chain(states.iter().map(String::as_str)) {
            for level in 0..=hover_depth {
                self.entries
                    .entry((String::from(state), level))
                    .or_default();
            }
        }
        released
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` before the first [`configure`](Self::configure).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if an entry exists for `(state, level)`.
    #[must_use]
    pub fn contains(&self, state: &str, level: u32) -> bool {
        self.entry(state, level).is_some()
    }

    /// The entry for `(state, level)`.
    #[must_use]
    pub fn entry(&self, state: &str, level: u32) -> Option<&CacheEntry> {
        // BTreeMap<(String, u32), _> cannot be queried with a borrowed tuple.
        self.entries
            .iter()
            .find(|((s, l), _)| s == state && *l == level)
            .map(|(_, e)| e)
    }

    fn entry_mut(&mut self, state: &str, level: u32) -> Option<&mut CacheEntry> {
        self.entries
            .iter_mut()
            .find(|((s, l), _)| s == state && *l == level)
            .map(|(_, e)| e)
    }

    /// All `(state, level)` keys in order.
    pub fn keys(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.entries.keys().map(|(s, l)| (s.as_str(), *l))
    }

    /// Records a measured box. Returns `false` if the entry does not exist.
    pub fn set_bounds(&mut self, state: &str, level: u32, bounds: Bounds) -> bool {
        match self.entry_mut(state, level) {
            Some(entry) => {
                entry.bounds = Some(bounds);
                true
            }
            None => false,
        }
    }

    /// Replaces the bitmap of an entry in one step.
    ///
    /// Returns the previous bitmap, or gives `texture` back as `Err` if the
    /// entry was purged in the meantime so the caller can release it.
    pub fn swap_texture(
        &mut self,
        state: &str,
        level: u32,
        texture: SurfaceId,
    ) -> Result<Option<SurfaceId>, SurfaceId> {
        match self.entry_mut(state, level) {
            Some(entry) => Ok(entry.texture.replace(texture)),
            None => Err(texture),
        }
    }

    /// Removes every bitmap, returning them for release.
    pub fn drain_textures(&mut self) -> Vec<SurfaceId> {
        self.entries
            .values_mut()
            .filter_map(|e| e.texture.take())
            .collect()
    }

    /// The bitmap to show for a selected state and hover level.
    ///
    /// Lookup order: `(state, hover)`, `("", hover)`, `(state, 0)`, `("", 0)`.
    /// The later steps keep the previous picture visible while the bitmap for
    /// a new state or hover level is still being drawn.
    #[must_use]
    pub fn resolve_texture(&self, state: &str, hover: u32) -> Option<SurfaceId> {
        self.resolve(state, hover, |e| e.texture)
    }

    /// The measured box for a selected state and hover level, with the same
    /// fallback order as [`resolve_texture`](Self::resolve_texture).
    #[must_use]
    pub fn resolve_bounds(&self, state: &str, hover: u32) -> Option<Bounds> {
        self.resolve(state, hover, |e| e.bounds)
    }

    fn resolve<T>(
        &self,
        state: &str,
        hover: u32,
        get: impl Fn(&CacheEntry) -> Option<T>,
    ) -> Option<T> {
        [
            (state, hover),
            (DEFAULT_STATE, hover),
            (state, 0),
            (DEFAULT_STATE, 0),
        ]
        .into_iter()
        .find_map(|(s, l)| self.entry(s, l).and_then(&get))
    }
}
