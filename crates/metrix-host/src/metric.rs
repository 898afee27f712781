//! The stored metric handle and kind filters.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use metrix_core::error::{MetrixError, Result};
use metrix_core::{Counter, Gauge, Histogram, Meter, Timer};

use crate::identity::MetricIdentity;
use crate::snapshot::MetricSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Counter,
    Meter,
    Histogram,
    Timer,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Gauge,
        MetricKind::Counter,
        MetricKind::Meter,
        MetricKind::Histogram,
        MetricKind::Timer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
            MetricKind::Meter => "meter",
            MetricKind::Histogram => "histogram",
            MetricKind::Timer => "timer",
        }
    }

    fn bit(self) -> u8 {
        match self {
            MetricKind::Gauge => 1 << 0,
            MetricKind::Counter => 1 << 1,
            MetricKind::Meter => 1 << 2,
            MetricKind::Histogram => 1 << 3,
            MetricKind::Timer => 1 << 4,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = MetrixError;

    fn from_str(s: &str) -> Result<Self> {
        MetricKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| MetrixError::BadConfig(format!("unknown metric kind: {s}")))
    }
}

/// Set of metric kinds to include in a sample.
///
/// An empty filter selects every kind, as does [`MetricFilter::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MetricFilter(u8);

impl MetricFilter {
    pub const NONE: MetricFilter = MetricFilter(0);
    pub const GAUGE: MetricFilter = MetricFilter(1 << 0);
    pub const COUNTER: MetricFilter = MetricFilter(1 << 1);
    pub const METER: MetricFilter = MetricFilter(1 << 2);
    pub const HISTOGRAM: MetricFilter = MetricFilter(1 << 3);
    pub const TIMER: MetricFilter = MetricFilter(1 << 4);
    pub const ALL: MetricFilter = MetricFilter(0xFF);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn includes(self, kind: MetricKind) -> bool {
        self.is_empty() || self.0 & kind.bit() != 0
    }

    pub fn from_kinds<I: IntoIterator<Item = MetricKind>>(kinds: I) -> Self {
        kinds
            .into_iter()
            .fold(MetricFilter::NONE, |acc, k| acc | MetricFilter::from(k))
    }
}

impl From<MetricKind> for MetricFilter {
    fn from(kind: MetricKind) -> Self {
        MetricFilter(kind.bit())
    }
}

impl BitOr for MetricFilter {
    type Output = MetricFilter;

    fn bitor(self, rhs: Self) -> Self {
        MetricFilter(self.0 | rhs.0)
    }
}

impl BitOrAssign for MetricFilter {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// A live metric as held by a store. Cloning clones the handle, not the data.
#[derive(Debug, Clone)]
pub enum Metric {
    Gauge(Gauge),
    Counter(Arc<Counter>),
    Meter(Arc<Meter>),
    Histogram(Arc<Histogram>),
    Timer(Arc<Timer>),
}

impl Metric {
    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Gauge(_) => MetricKind::Gauge,
            Metric::Counter(_) => MetricKind::Counter,
            Metric::Meter(_) => MetricKind::Meter,
            Metric::Histogram(_) => MetricKind::Histogram,
            Metric::Timer(_) => MetricKind::Timer,
        }
    }

    /// Point-in-time copy. Gauges keep their evaluator; every other kind is
    /// a value copy.
    pub fn snapshot(&self) -> MetricSnapshot {
        match self {
            Metric::Gauge(g) => MetricSnapshot::Gauge(g.clone()),
            Metric::Counter(c) => MetricSnapshot::Counter(c.count()),
            Metric::Meter(m) => MetricSnapshot::Meter(m.snapshot()),
            Metric::Histogram(h) => MetricSnapshot::Histogram(h.snapshot()),
            Metric::Timer(t) => MetricSnapshot::Timer(t.snapshot()),
        }
    }

    /// Stop any background work owned by the metric.
    pub fn stop(&self) {
        match self {
            Metric::Meter(m) => m.stop(),
            Metric::Timer(t) => t.stop(),
            Metric::Gauge(_) | Metric::Counter(_) | Metric::Histogram(_) => {}
        }
    }

    pub fn into_gauge(self, id: &MetricIdentity) -> Result<Gauge> {
        match self {
            Metric::Gauge(g) => Ok(g),
            other => Err(other.mismatch(id, MetricKind::Gauge)),
        }
    }

    pub fn into_counter(self, id: &MetricIdentity) -> Result<Arc<Counter>> {
        match self {
            Metric::Counter(c) => Ok(c),
            other => Err(other.mismatch(id, MetricKind::Counter)),
        }
    }

    pub fn into_meter(self, id: &MetricIdentity) -> Result<Arc<Meter>> {
        match self {
            Metric::Meter(m) => Ok(m),
            other => Err(other.mismatch(id, MetricKind::Meter)),
        }
    }

    pub fn into_histogram(self, id: &MetricIdentity) -> Result<Arc<Histogram>> {
        match self {
            Metric::Histogram(h) => Ok(h),
            other => Err(other.mismatch(id, MetricKind::Histogram)),
        }
    }

    pub fn into_timer(self, id: &MetricIdentity) -> Result<Arc<Timer>> {
        match self {
            Metric::Timer(t) => Ok(t),
            other => Err(other.mismatch(id, MetricKind::Timer)),
        }
    }

    fn mismatch(&self, id: &MetricIdentity, expected: MetricKind) -> MetrixError {
        MetrixError::KindMismatch {
            identity: id.cache_key(),
            expected: expected.as_str(),
            actual: self.kind().as_str(),
        }
    }
}
