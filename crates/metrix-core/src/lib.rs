//! metrix core: the metric engine.
//!
//! Lock-free primitives (atomic cells, EWMA, reservoir samples) and the five
//! metric kinds built on them: counter, gauge, histogram, meter and timer.
//! Nothing here knows about naming, ownership or output formats; that lives
//! in `metrix-host`.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Recording paths
//! never allocate a lock and never fail; the only fallible operations are
//! starting background ticks and parsing names.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod atomic;
pub mod clock;
pub mod counter;
pub mod error;
pub mod ewma;
pub mod gauge;
pub mod histogram;
pub mod meter;
pub mod sample;
pub mod tick;
pub mod time_unit;
pub mod timer;

pub use counter::Counter;
/// Shared result type.
pub use error::{MetrixError, Result};
pub use gauge::{Gauge, GaugeShape, GaugeValue};
pub use histogram::{Histogram, HistogramSnapshot, DEFAULT_PERCENTILES};
pub use meter::{Meter, MeterSnapshot};
pub use sample::{Sample, SampleType};
pub use time_unit::TimeUnit;
pub use timer::{Timed, Timer, TimerSnapshot, TimerView};
