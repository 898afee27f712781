//! Immutable, identity-ordered copies of a store's contents.

use std::collections::BTreeMap;

use metrix_core::{Gauge, HistogramSnapshot, MeterSnapshot, TimerSnapshot};

use crate::identity::MetricIdentity;
use crate::metric::MetricKind;

#[derive(Debug, Clone)]
pub enum MetricSnapshot {
    /// Shares the live evaluator; reads happen at render time.
    Gauge(Gauge),
    Counter(i64),
    Meter(MeterSnapshot),
    Histogram(HistogramSnapshot),
    Timer(TimerSnapshot),
}

impl MetricSnapshot {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricSnapshot::Gauge(_) => MetricKind::Gauge,
            MetricSnapshot::Counter(_) => MetricKind::Counter,
            MetricSnapshot::Meter(_) => MetricKind::Meter,
            MetricSnapshot::Histogram(_) => MetricKind::Histogram,
            MetricSnapshot::Timer(_) => MetricKind::Timer,
        }
    }
}

/// One host's metrics at a point in time, sorted by identity.
#[derive(Debug, Clone, Default)]
pub struct Sample {
    entries: Vec<(MetricIdentity, MetricSnapshot)>,
}

impl Sample {
    pub fn new(mut entries: Vec<(MetricIdentity, MetricSnapshot)>) -> Self {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &MetricIdentity) -> Option<&MetricSnapshot> {
        self.entries
            .binary_search_by(|(k, _)| k.cmp(id))
            .ok()
            .map(|i| &self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MetricIdentity, &MetricSnapshot)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Merge another sample in, keeping identity order.
    pub fn extend(&mut self, other: Sample) {
        self.entries.extend(other.entries);
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
    }

    /// Entries grouped by owner short name, then by metric name.
    pub fn by_owner(&self) -> BTreeMap<&str, BTreeMap<&str, &MetricSnapshot>> {
        let mut grouped: BTreeMap<&str, BTreeMap<&str, &MetricSnapshot>> = BTreeMap::new();
        for (id, snap) in &self.entries {
            grouped
                .entry(id.owner().short_name())
                .or_default()
                .insert(id.name(), snap);
        }
        grouped
    }
}

impl IntoIterator for Sample {
    type Item = (MetricIdentity, MetricSnapshot);
    type IntoIter = std::vec::IntoIter<(MetricIdentity, MetricSnapshot)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
