//! Exponentially-weighted moving average of an event rate.
//!
//! Events are accumulated into a pending counter by `update` and only folded
//! into the rate when `tick` runs, once per `interval`. The decay factor
//! `1 - exp(-interval / window)` gives the same smoothing as the 1/5/15
//! minute load averages in `top`.

use std::time::Duration;

use crate::atomic::{AtomicCounter, AtomicF64};
use crate::time_unit::TimeUnit;

/// Tick cadence used by meters.
pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct Ewma {
    alpha: f64,
    interval_secs: f64,
    pending: AtomicCounter,
    // events per second
    rate: AtomicF64,
}

impl Ewma {
    pub fn new(window: Duration, interval: Duration) -> Self {
        let interval_secs = interval.as_secs_f64();
        let alpha = 1.0 - (-interval_secs / window.as_secs_f64()).exp();
        Self {
            alpha,
            interval_secs,
            pending: AtomicCounter::default(),
            rate: AtomicF64::default(),
        }
    }

    pub fn one_minute() -> Self {
        Self::new(Duration::from_secs(60), TICK_INTERVAL)
    }

    pub fn five_minute() -> Self {
        Self::new(Duration::from_secs(5 * 60), TICK_INTERVAL)
    }

    pub fn fifteen_minute() -> Self {
        Self::new(Duration::from_secs(15 * 60), TICK_INTERVAL)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Record `n` events; visible in `rate` after the next tick.
    pub fn update(&self, n: i64) {
        self.pending.add_and_get(n);
    }

    /// Fold pending events into the decayed rate.
    pub fn tick(&self) {
        let count = self.pending.take();
        let instant = count as f64 / self.interval_secs;
        loop {
            let old_bits = self.rate.bits();
            let old = f64::from_bits(old_bits);
            let new = old + self.alpha * (instant - old);
            if self.rate.compare_and_set_bits(old_bits, new.to_bits()) {
                break;
            }
        }
    }

    /// Current rate expressed as events per `unit`.
    pub fn rate(&self, unit: TimeUnit) -> f64 {
        self.rate.get() * (unit.nanos() as f64 / 1e9)
    }

    pub fn clear(&self) {
        self.pending.set(0);
        self.rate.set(0.0);
    }
}
