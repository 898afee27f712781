//! Monotonic time source shared by meters and decaying samples.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic nanosecond clock. Only differences between readings are meaningful.
pub trait Clock: Send + Sync {
    fn now_nanos(&self) -> u64;

    fn now_secs(&self) -> f64 {
        self.now_nanos() as f64 / 1e9
    }
}

/// Wall-independent clock anchored at construction.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_nanos(&self) -> u64 {
        // u64 nanoseconds covers ~584 years of uptime.
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Hand-driven clock for deterministic tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::AcqRel);
    }

    pub fn set(&self, nanos: u64) {
        self.nanos.store(nanos, Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> u64 {
        self.nanos.load(Ordering::Acquire)
    }
}

/// Shared handle used by every clock consumer.
pub type SharedClock = Arc<dyn Clock>;

/// Default clock for metrics created without an explicit one.
pub fn default_clock() -> SharedClock {
    Arc::new(MonotonicClock::new())
}
