//! Hosts keyed by origin, for adapters that report across hosts.

use std::sync::Arc;

use dashmap::DashMap;

use crate::host::MetricHost;
use crate::metric::MetricFilter;
use crate::snapshot::Sample;

#[derive(Debug, Default)]
pub struct MetricRegistry {
    hosts: DashMap<String, Arc<MetricHost>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `host` under `key`. The first registration for a key wins;
    /// returns false when the key was already taken.
    pub fn add(&self, key: impl Into<String>, host: Arc<MetricHost>) -> bool {
        let key = key.into();
        let mut added = false;
        self.hosts.entry(key.clone()).or_insert_with(|| {
            added = true;
            host
        });
        if added {
            tracing::info!(origin = %key, "metric host registered");
        } else {
            tracing::debug!(origin = %key, "metric host already registered, keeping existing");
        }
        added
    }

    pub fn get(&self, key: &str) -> Option<Arc<MetricHost>> {
        self.hosts.get(key).map(|h| Arc::clone(h.value()))
    }

    /// All hosts, ordered by key.
    pub fn hosts(&self) -> Vec<Arc<MetricHost>> {
        self.manifest().into_iter().map(|(_, h)| h).collect()
    }

    /// `(origin key, host)` pairs, ordered by key.
    pub fn manifest(&self) -> Vec<(String, Arc<MetricHost>)> {
        let mut out: Vec<_> = self
            .hosts
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// One sample merged across every host.
    pub fn sample(&self, filter: MetricFilter) -> Sample {
        let mut merged = Sample::default();
        for host in self.hosts() {
            merged.extend(host.sample(filter));
        }
        merged
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
