//! Top-level facade crate for metrix.
//!
//! Re-exports the engine and the host layer so users can depend on a single crate.

pub mod core {
    pub use metrix_core::*;
}

pub mod host {
    pub use metrix_host::*;
}

pub use metrix_core::{
    Counter, Gauge, Histogram, Meter, MetrixError, Result, SampleType, TimeUnit, Timer,
};
pub use metrix_host::{MetricFilter, MetricHost, MetricRegistry, ScopedHost};
