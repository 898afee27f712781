//! Concurrent identity → metric storage.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use metrix_core::error::Result;

use crate::identity::MetricIdentity;
use crate::metric::{Metric, MetricFilter};
use crate::snapshot::Sample;

/// Backing storage for a [`crate::host::MetricHost`].
pub trait MetricStore: Send + Sync {
    fn get(&self, id: &MetricIdentity) -> Option<Metric>;

    /// Insert `candidate` unless the identity is taken; returns whichever
    /// metric ends up stored. A losing candidate is dropped untouched.
    fn get_or_add(&self, id: MetricIdentity, candidate: Metric) -> Metric;

    /// Like `get_or_add`, but `make` only runs when the identity is vacant,
    /// and at most once per identity across all callers.
    fn get_or_insert_with(
        &self,
        id: MetricIdentity,
        make: &mut dyn FnMut() -> Result<Metric>,
    ) -> Result<Metric>;

    /// Copy every metric whose kind passes `filter`.
    fn sample(&self, filter: MetricFilter) -> Sample;

    /// Remove everything, stopping background work. Returns false when the
    /// store does not support clearing.
    fn clear(&self) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct InMemoryMetricStore {
    map: DashMap<MetricIdentity, Metric>,
}

impl InMemoryMetricStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricStore for InMemoryMetricStore {
    fn get(&self, id: &MetricIdentity) -> Option<Metric> {
        self.map.get(id).map(|m| m.value().clone())
    }

    fn get_or_add(&self, id: MetricIdentity, candidate: Metric) -> Metric {
        self.map.entry(id).or_insert(candidate).value().clone()
    }

    fn get_or_insert_with(
        &self,
        id: MetricIdentity,
        make: &mut dyn FnMut() -> Result<Metric>,
    ) -> Result<Metric> {
        if let Some(existing) = self.get(&id) {
            return Ok(existing);
        }
        // The shard stays write-locked while `make` runs.
        match self.map.entry(id) {
            Entry::Occupied(e) => Ok(e.get().clone()),
            Entry::Vacant(v) => {
                let metric = make()?;
                tracing::trace!(identity = %v.key(), kind = %metric.kind(), "metric created");
                v.insert(metric.clone());
                Ok(metric)
            }
        }
    }

    fn sample(&self, filter: MetricFilter) -> Sample {
        // Clone handles first so no shard lock is held while copying data.
        let live: Vec<(MetricIdentity, Metric)> = self
            .map
            .iter()
            .filter(|e| filter.includes(e.value().kind()))
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        Sample::new(
            live.into_iter()
                .map(|(id, metric)| {
                    let snap = metric.snapshot();
                    (id, snap)
                })
                .collect(),
        )
    }

    fn clear(&self) -> bool {
        let mut removed = 0usize;
        self.map.retain(|_, metric| {
            metric.stop();
            removed += 1;
            false
        });
        tracing::debug!(removed, "metric store cleared");
        true
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use metrix_core::{Counter, Gauge, Histogram, SampleType};

    use super::*;
    use crate::identity::Owner;
    use crate::metric::MetricKind;
    use crate::snapshot::MetricSnapshot;

    fn id(name: &str) -> MetricIdentity {
        MetricIdentity::new(Owner::of::<InMemoryMetricStore>(), name)
    }

    #[test]
    fn existing_entry_wins() {
        let store = InMemoryMetricStore::new();
        let first = Arc::new(Counter::new());
        first.increment_by(7);
        store.get_or_add(id("c"), Metric::Counter(Arc::clone(&first)));
        let got = store.get_or_add(id("c"), Metric::Counter(Arc::new(Counter::new())));
        let c = got.into_counter(&id("c")).unwrap();
        assert!(Arc::ptr_eq(&c, &first));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn insert_with_skips_factory_when_present() {
        let store = InMemoryMetricStore::new();
        let calls = AtomicUsize::new(0);
        let mut make = || -> Result<Metric> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Metric::Counter(Arc::new(Counter::new())))
        };
        store.get_or_insert_with(id("c"), &mut make).unwrap();
        store.get_or_insert_with(id("c"), &mut make).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn factory_error_leaves_identity_vacant() {
        let store = InMemoryMetricStore::new();
        let res = store.get_or_insert_with(id("c"), &mut || -> Result<Metric> {
            Err(metrix_core::MetrixError::Internal("nope".into()))
        });
        assert!(res.is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn sample_filters_and_orders() {
        let store = InMemoryMetricStore::new();
        store.get_or_add(id("b"), Metric::Counter(Arc::new(Counter::new())));
        store.get_or_add(id("a"), Metric::Gauge(Gauge::new(|| 1)));
        store.get_or_add(
            id("c"),
            Metric::Histogram(Arc::new(Histogram::new(SampleType::Uniform))),
        );

        let all = store.sample(MetricFilter::NONE);
        let names: Vec<_> = all.iter().map(|(k, _)| k.name().to_string()).collect();
        assert_eq!(names, ["a", "b", "c"]);

        let counters = store.sample(MetricFilter::COUNTER);
        assert_eq!(counters.len(), 1);
        assert!(counters.iter().all(|(_, s)| s.kind() == MetricKind::Counter));
    }

    #[test]
    fn sample_is_detached_from_live_metric() {
        let store = InMemoryMetricStore::new();
        let c = store
            .get_or_add(id("c"), Metric::Counter(Arc::new(Counter::new())))
            .into_counter(&id("c"))
            .unwrap();
        c.increment_by(3);
        let sample = store.sample(MetricFilter::ALL);
        c.increment_by(100);
        assert!(matches!(sample.get(&id("c")), Some(MetricSnapshot::Counter(3))));
    }

    #[test]
    fn clear_empties_store() {
        let store = InMemoryMetricStore::new();
        store.get_or_add(id("a"), Metric::Counter(Arc::new(Counter::new())));
        assert!(store.clear());
        assert!(store.is_empty());
        assert!(store.sample(MetricFilter::NONE).is_empty());
    }
}
