//! Text report emitted through `tracing`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;

use metrix_core::error::Result;

use super::periodic::Reporter;
use super::text;
use crate::metric::MetricFilter;
use crate::registry::MetricRegistry;

/// Renders every host in the registry and logs the result at `info` under
/// the `metrix::report` target.
pub struct LogReporter {
    registry: Arc<MetricRegistry>,
    filter: MetricFilter,
}

impl LogReporter {
    pub fn new(registry: Arc<MetricRegistry>, filter: MetricFilter) -> Self {
        Self { registry, filter }
    }

    pub fn render(&self) -> String {
        let samples: Vec<_> = self
            .registry
            .hosts()
            .iter()
            .map(|h| h.sample(self.filter))
            .collect();
        text::render(&samples, Local::now())
    }
}

#[async_trait]
impl Reporter for LogReporter {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn report(&self) -> Result<()> {
        let report = self.render();
        tracing::info!(target: "metrix::report", hosts = self.registry.len(), "\n{report}");
        Ok(())
    }
}
