// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Time budgets for cooperative rasterization.
//!
//! [`rasterize`](crate::scene::LayerScene::rasterize) keeps taking layers
//! from the queue while its [`Budget`] reports time left. After the first
//! layer of a call it only starts another one when the remaining time covers
//! the moving average of recent per-layer costs, so a slow layer does not
//! push the pass past its slice.

use crate::time::{Clock, Duration, HostTime};

/// Remaining time for the current rasterization call.
pub trait Budget {
    /// Time left. Zero means stop.
    fn remaining(&self) -> Duration;
}

/// A budget backed by a platform idle callback's deadline.
pub struct IdleDeadline<F: Fn() -> Duration> {
    time_remaining: F,
}

impl<F: Fn() -> Duration> core::fmt::Debug for IdleDeadline<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdleDeadline").finish_non_exhaustive()
    }
}

impl<F: Fn() -> Duration> IdleDeadline<F> {
    /// Wraps the idle callback's `timeRemaining`-style query.
    #[must_use]
    pub const fn new(time_remaining: F) -> Self {
        Self { time_remaining }
    }
}

impl<F: Fn() -> Duration> Budget for IdleDeadline<F> {
    fn remaining(&self) -> Duration {
        (self.time_remaining)()
    }
}

/// A fixed slice measured against a [`Clock`], for hosts without an idle
/// hook.
#[derive(Debug)]
pub struct FixedSlice<'a, C: Clock> {
    clock: &'a C,
    deadline: HostTime,
}

impl<'a, C: Clock> FixedSlice<'a, C> {
    /// A budget ending `slice` after the clock's current time.
    #[must_use]
    pub fn new(clock: &'a C, slice: Duration) -> Self {
        let deadline = clock.now().saturating_add(slice);
        Self { clock, deadline }
    }
}

impl<C: Clock> Budget for FixedSlice<'_, C> {
    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(self.clock.now())
    }
}

/// Never runs out. Drains the whole queue in one call.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unbounded;

impl Budget for Unbounded {
    fn remaining(&self) -> Duration {
        Duration::MAX
    }
}

/// Exponential moving average of per-layer rasterization cost, in ticks.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Ema {
    value: f64,
    alpha: f64,
    initialized: bool,
}

impl Ema {
    pub(crate) const fn new(alpha: f64) -> Self {
        Self {
            value: 0.0,
            alpha,
            initialized: false,
        }
    }

    pub(crate) fn update(&mut self, sample: f64) {
        if self.initialized {
            self.value = self.alpha * sample + (1.0 - self.alpha) * self.value;
        } else {
            self.value = sample;
            self.initialized = true;
        }
    }

    pub(crate) const fn get(&self) -> f64 {
        self.value
    }
}

/// Whether another layer fits in `remaining`, given `processed` layers done
/// so far in this call.
pub(crate) fn should_continue(remaining: Duration, processed: usize, cost: &Ema) -> bool {
    !remaining.is_zero() && (processed == 0 || remaining.ticks() as f64 >= cost.get())
}
