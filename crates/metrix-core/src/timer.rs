//! Duration distribution plus throughput.
//!
//! Durations are recorded in nanoseconds into a forward-decaying histogram
//! and reported in the timer's duration unit. Every recorded duration also
//! marks the internal meter once.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::histogram::{Histogram, HistogramSnapshot};
use crate::meter::{Meter, MeterSnapshot};
use crate::sample::SampleType;
use crate::time_unit::TimeUnit;

/// Meter event label used by timers.
pub const TIMER_EVENT_TYPE: &str = "updates";

#[derive(Debug)]
pub struct Timer {
    histogram: Histogram,
    meter: Arc<Meter>,
    duration_unit: TimeUnit,
}

impl Timer {
    /// Unstarted timer; see [`Timer::start`].
    pub fn new(duration_unit: TimeUnit, rate_unit: TimeUnit) -> Self {
        Self::with_meter(duration_unit, Arc::new(Meter::new(TIMER_EVENT_TYPE, rate_unit)))
    }

    pub fn with_meter(duration_unit: TimeUnit, meter: Arc<Meter>) -> Self {
        Self {
            histogram: Histogram::new(SampleType::Decaying),
            meter,
            duration_unit,
        }
    }

    /// Start the throughput meter's tick task.
    pub fn start(&self) -> Result<()> {
        self.meter.start()
    }

    pub fn stop(&self) {
        self.meter.stop();
    }

    pub fn duration_unit(&self) -> TimeUnit {
        self.duration_unit
    }

    pub fn rate_unit(&self) -> TimeUnit {
        self.meter.rate_unit()
    }

    pub fn event_type(&self) -> &str {
        self.meter.event_type()
    }

    /// Record `duration` expressed in `unit`.
    pub fn update(&self, duration: i64, unit: TimeUnit) {
        self.update_nanos(unit.to_nanos(duration));
    }

    /// Record a nanosecond duration. Negative values are clock skew and ignored.
    pub fn update_nanos(&self, nanos: i64) {
        if nanos < 0 {
            return;
        }
        self.histogram.update(nanos);
        self.meter.mark();
    }

    pub fn record(&self, elapsed: Duration) {
        self.update_nanos(i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX));
    }

    /// Run `op` and record how long it took, however it exits.
    ///
    /// The duration is recorded before a panic continues unwinding; for
    /// `Result`-returning operations the error is handed back inside
    /// [`Timed::value`] after being recorded like any other outcome.
    pub fn time<T>(&self, op: impl FnOnce() -> T) -> Timed<T> {
        let started_at = Utc::now();
        let guard = RecordOnDrop::new(self);
        let value = op();
        let elapsed = guard.finish();
        Timed {
            value,
            started_at,
            stopped_at: Utc::now(),
            elapsed,
        }
    }

    /// Like [`Timer::time`] for a future. A future dropped before completion
    /// is recorded with the time it ran.
    pub async fn time_async<F: Future>(&self, fut: F) -> Timed<F::Output> {
        let started_at = Utc::now();
        let guard = RecordOnDrop::new(self);
        let value = fut.await;
        let elapsed = guard.finish();
        Timed {
            value,
            started_at,
            stopped_at: Utc::now(),
            elapsed,
        }
    }

    pub fn count(&self) -> i64 {
        self.histogram.count()
    }

    pub fn max(&self) -> f64 {
        self.from_nanos(self.histogram.max() as f64)
    }

    pub fn min(&self) -> f64 {
        self.from_nanos(self.histogram.min() as f64)
    }

    pub fn mean(&self) -> f64 {
        self.from_nanos(self.histogram.mean())
    }

    pub fn std_dev(&self) -> f64 {
        self.from_nanos(self.histogram.std_dev())
    }

    pub fn percentiles(&self, ps: &[f64]) -> Vec<f64> {
        self.histogram
            .percentiles(ps)
            .into_iter()
            .map(|v| self.from_nanos(v))
            .collect()
    }

    /// Recorded durations in the duration unit.
    pub fn values(&self) -> Vec<f64> {
        self.histogram
            .values()
            .into_iter()
            .map(|v| self.from_nanos(v as f64))
            .collect()
    }

    pub fn one_minute_rate(&self) -> f64 {
        self.meter.one_minute_rate()
    }

    pub fn five_minute_rate(&self) -> f64 {
        self.meter.five_minute_rate()
    }

    pub fn fifteen_minute_rate(&self) -> f64 {
        self.meter.fifteen_minute_rate()
    }

    pub fn mean_rate(&self) -> f64 {
        self.meter.mean_rate()
    }

    /// Fold pending marks into the throughput averages.
    pub fn tick(&self) {
        self.meter.tick();
    }

    pub fn clear(&self) {
        self.histogram.clear();
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            duration_unit: self.duration_unit,
            durations: self.histogram.snapshot(),
            throughput: self.meter.snapshot(),
        }
    }

    fn from_nanos(&self, nanos: f64) -> f64 {
        self.duration_unit.from_nanos_f64(nanos)
    }
}

/// Records the elapsed time on drop unless `finish` already did.
struct RecordOnDrop<'a> {
    timer: &'a Timer,
    start: Instant,
    armed: bool,
}

impl<'a> RecordOnDrop<'a> {
    fn new(timer: &'a Timer) -> Self {
        Self {
            timer,
            start: Instant::now(),
            armed: true,
        }
    }

    fn finish(mut self) -> Duration {
        let elapsed = self.start.elapsed();
        self.armed = false;
        self.timer.record(elapsed);
        elapsed
    }
}

impl Drop for RecordOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.timer.record(self.start.elapsed());
        }
    }
}

/// Outcome of a timed operation with its timing metadata.
#[derive(Debug, Clone)]
pub struct Timed<T> {
    pub value: T,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl<T> Timed<T> {
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Frozen timer readings. Durations are kept in nanoseconds and converted
/// through `duration_unit` on access.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerSnapshot {
    pub duration_unit: TimeUnit,
    pub durations: HistogramSnapshot,
    pub throughput: MeterSnapshot,
}

impl TimerSnapshot {
    pub fn count(&self) -> i64 {
        self.durations.count
    }

    pub fn max(&self) -> f64 {
        self.duration_unit.from_nanos_f64(self.durations.max as f64)
    }

    pub fn min(&self) -> f64 {
        self.duration_unit.from_nanos_f64(self.durations.min as f64)
    }

    pub fn mean(&self) -> f64 {
        self.duration_unit.from_nanos_f64(self.durations.mean)
    }

    pub fn std_dev(&self) -> f64 {
        self.duration_unit.from_nanos_f64(self.durations.std_dev)
    }

    pub fn percentiles(&self, ps: &[f64]) -> Vec<f64> {
        self.durations
            .percentiles(ps)
            .into_iter()
            .map(|v| self.duration_unit.from_nanos_f64(v))
            .collect()
    }
}

/// Wire shape of a timer: distribution fields first, then throughput.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerView {
    pub count: i64,
    pub max: f64,
    pub min: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub percentiles: Vec<f64>,
    pub duration_unit: TimeUnit,
    pub rate_unit: TimeUnit,
    pub fifteen_minute_rate: f64,
    pub five_minute_rate: f64,
    pub one_minute_rate: f64,
    pub mean_rate: f64,
}

impl TimerSnapshot {
    pub fn view(&self, ps: &[f64]) -> TimerView {
        TimerView {
            count: self.count(),
            max: self.max(),
            min: self.min(),
            mean: self.mean(),
            std_dev: self.std_dev(),
            percentiles: self.percentiles(ps),
            duration_unit: self.duration_unit,
            rate_unit: self.throughput.rate_unit,
            fifteen_minute_rate: self.throughput.fifteen_minute_rate,
            five_minute_rate: self.throughput.five_minute_rate,
            one_minute_rate: self.throughput.one_minute_rate,
            mean_rate: self.throughput.mean_rate,
        }
    }
}
