//! metrix host: naming, storage and output for metrix metrics.
//!
//! Wires the engine's metric kinds into owner-scoped, get-or-create hosts
//! backed by a concurrent store, groups hosts in a registry, and renders
//! samples for exposition and reporting. Consumed by the demo binary
//! (`main.rs`) and by integration tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod host;
pub mod identity;
pub mod metric;
pub mod registry;
pub mod report;
pub mod snapshot;
pub mod store;

pub use host::{MetricHost, ScopedHost};
pub use identity::{MetricIdentity, Owner};
pub use metric::{Metric, MetricFilter, MetricKind};
pub use registry::MetricRegistry;
pub use snapshot::{MetricSnapshot, Sample};
pub use store::{InMemoryMetricStore, MetricStore};
