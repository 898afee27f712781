//! Throughput: total events, mean rate since creation, and 1/5/15 minute
//! exponentially-weighted rates.
//!
//! The EWMAs only move when ticked. `start` registers the meter with the
//! process-wide [`Ticker`], which ticks it every
//! [`TICK_INTERVAL`](crate::ewma::TICK_INTERVAL). The ticker holds a weak
//! reference, so it never keeps a meter alive on its own.

use std::sync::{Arc, OnceLock, Weak};

use serde::Serialize;

use crate::atomic::AtomicCounter;
use crate::clock::{default_clock, SharedClock};
use crate::error::Result;
use crate::ewma::Ewma;
use crate::tick::{Tick, TickHandle, Ticker};
use crate::time_unit::TimeUnit;

pub struct Meter {
    count: AtomicCounter,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
    start_nanos: u64,
    clock: SharedClock,
    event_type: String,
    rate_unit: TimeUnit,
    ticker: OnceLock<TickHandle>,
}

impl Meter {
    /// Unstarted meter; rates stay at zero until `start` or manual `tick`s.
    pub fn new(event_type: impl Into<String>, rate_unit: TimeUnit) -> Self {
        Self::with_clock(event_type, rate_unit, default_clock())
    }

    pub fn with_clock(event_type: impl Into<String>, rate_unit: TimeUnit, clock: SharedClock) -> Self {
        Self {
            count: AtomicCounter::default(),
            m1: Ewma::one_minute(),
            m5: Ewma::five_minute(),
            m15: Ewma::fifteen_minute(),
            start_nanos: clock.now_nanos(),
            clock,
            event_type: event_type.into(),
            rate_unit,
            ticker: OnceLock::new(),
        }
    }

    /// Build and start ticking in one step.
    pub fn started(event_type: impl Into<String>, rate_unit: TimeUnit) -> Result<Arc<Self>> {
        let meter = Arc::new(Self::new(event_type, rate_unit));
        meter.start()?;
        Ok(meter)
    }

    /// Register with the global ticker. Calling it again is a no-op.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        self.start_on(Ticker::global())
    }

    pub fn start_on(self: &Arc<Self>, ticker: &Ticker) -> Result<()> {
        if self.ticker.get().is_some() {
            return Ok(());
        }
        let weak: Weak<dyn Tick> = Arc::<Self>::downgrade(self);
        let handle = ticker.register(weak)?;
        if let Err(extra) = self.ticker.set(handle) {
            // lost a race with another start()
            extra.cancel();
        }
        Ok(())
    }

    /// Unregister from the ticker; rates freeze at their last values.
    pub fn stop(&self) {
        if let Some(handle) = self.ticker.get() {
            handle.cancel();
        }
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.get().is_some_and(TickHandle::is_active)
    }

    pub fn mark(&self) {
        self.mark_n(1);
    }

    pub fn mark_n(&self, n: i64) {
        self.count.add_and_get(n);
        self.m1.update(n);
        self.m5.update(n);
        self.m15.update(n);
    }

    /// Fold pending marks into the moving averages.
    pub fn tick(&self) {
        self.m1.tick();
        self.m5.tick();
        self.m15.tick();
    }

    pub fn count(&self) -> i64 {
        self.count.get()
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn rate_unit(&self) -> TimeUnit {
        self.rate_unit
    }

    pub fn one_minute_rate(&self) -> f64 {
        self.m1.rate(self.rate_unit)
    }

    pub fn five_minute_rate(&self) -> f64 {
        self.m5.rate(self.rate_unit)
    }

    pub fn fifteen_minute_rate(&self) -> f64 {
        self.m15.rate(self.rate_unit)
    }

    pub fn mean_rate(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        let elapsed = self.clock.now_nanos().saturating_sub(self.start_nanos);
        if elapsed == 0 {
            return 0.0;
        }
        count as f64 / elapsed as f64 * self.rate_unit.nanos() as f64
    }

    pub fn snapshot(&self) -> MeterSnapshot {
        MeterSnapshot {
            count: self.count(),
            rate_unit: self.rate_unit,
            fifteen_minute_rate: self.fifteen_minute_rate(),
            five_minute_rate: self.five_minute_rate(),
            one_minute_rate: self.one_minute_rate(),
            mean_rate: self.mean_rate(),
            event_type: self.event_type.clone(),
        }
    }
}

impl Tick for Meter {
    fn tick(&self) {
        Meter::tick(self);
    }
}

impl std::fmt::Debug for Meter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Meter")
            .field("event_type", &self.event_type)
            .field("count", &self.count())
            .field("rate_unit", &self.rate_unit)
            .field("ticking", &self.is_ticking())
            .finish()
    }
}

/// Frozen meter readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeterSnapshot {
    pub count: i64,
    pub rate_unit: TimeUnit,
    pub fifteen_minute_rate: f64,
    pub five_minute_rate: f64,
    pub one_minute_rate: f64,
    pub mean_rate: f64,
    #[serde(skip)]
    pub event_type: String,
}
