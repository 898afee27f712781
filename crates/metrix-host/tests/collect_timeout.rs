#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use metrix_core::{MetrixError, Result};
use metrix_host::config::{self, MetricsOptions};
use metrix_host::report::collect_json;
use metrix_host::{
    InMemoryMetricStore, Metric, MetricFilter, MetricHost, MetricIdentity, MetricRegistry,
    MetricStore, Sample,
};

/// Store whose sampling stalls, standing in for a wedged host.
struct StalledStore {
    inner: InMemoryMetricStore,
    stall: Duration,
}

impl MetricStore for StalledStore {
    fn get(&self, id: &MetricIdentity) -> Option<Metric> {
        self.inner.get(id)
    }

    fn get_or_add(&self, id: MetricIdentity, candidate: Metric) -> Metric {
        self.inner.get_or_add(id, candidate)
    }

    fn get_or_insert_with(
        &self,
        id: MetricIdentity,
        make: &mut dyn FnMut() -> Result<Metric>,
    ) -> Result<Metric> {
        self.inner.get_or_insert_with(id, make)
    }

    fn sample(&self, filter: MetricFilter) -> Sample {
        std::thread::sleep(self.stall);
        self.inner.sample(filter)
    }

    fn clear(&self) -> bool {
        self.inner.clear()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

fn options(yaml: &str) -> MetricsOptions {
    config::load_from_str(yaml).unwrap()
}

#[tokio::test]
async fn collects_json_across_hosts() {
    let registry = Arc::new(MetricRegistry::new());
    let host = Arc::new(MetricHost::new());
    host.counter("orders").unwrap().increment_by(5);
    host.gauge("healthy", || true).unwrap();
    registry.add("api", host);

    let json = collect_json(Arc::clone(&registry), &options("{}")).await.unwrap();
    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(v[0]["name"], "healthy");
    assert_eq!(v[0]["metric"]["value"], true);
    assert_eq!(v[1]["metric"]["count"], 5);
}

#[tokio::test]
async fn type_filter_applies_to_collection() {
    let registry = Arc::new(MetricRegistry::new());
    let host = Arc::new(MetricHost::new());
    host.counter("orders").unwrap();
    host.gauge("healthy", || true).unwrap();
    registry.add("api", host);

    let json = collect_json(registry, &options("type_filter: [counter]")).await.unwrap();
    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(v.as_array().unwrap().len(), 1);
    assert_eq!(v[0]["name"], "orders");
}

#[tokio::test]
async fn stalled_sample_times_out() {
    let registry = Arc::new(MetricRegistry::new());
    let store = Arc::new(StalledStore {
        inner: InMemoryMetricStore::new(),
        stall: Duration::from_millis(2_500),
    });
    registry.add("stalled", Arc::new(MetricHost::with_store(store)));

    let err = collect_json(Arc::clone(&registry), &options("sample_timeout_seconds: 1"))
        .await
        .expect_err("must time out");
    assert!(matches!(err, MetrixError::SampleTimeout(d) if d == Duration::from_secs(1)));
    assert_eq!(registry.len(), 1);
}
