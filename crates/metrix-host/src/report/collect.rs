//! Bounded-time snapshot collection for exposition endpoints.

use std::sync::Arc;

use metrix_core::error::{MetrixError, Result};

use super::json;
use crate::config::MetricsOptions;
use crate::registry::MetricRegistry;
use crate::snapshot::Sample;

/// Sample every host under `options.type_filter`, giving up after
/// `options.sample_timeout_seconds`. A timeout fails only this call.
pub async fn collect_sample(registry: Arc<MetricRegistry>, options: &MetricsOptions) -> Result<Sample> {
    let filter = options.filter();
    let limit = options.sample_timeout();
    let task = tokio::task::spawn_blocking(move || registry.sample(filter));
    match tokio::time::timeout(limit, task).await {
        Ok(Ok(sample)) => Ok(sample),
        Ok(Err(e)) => Err(MetrixError::Internal(format!("sample task failed: {e}"))),
        Err(_) => {
            tracing::warn!(timeout_secs = limit.as_secs(), "metric sample timed out");
            Err(MetrixError::SampleTimeout(limit))
        }
    }
}

/// [`collect_sample`] rendered as the JSON exposition payload.
pub async fn collect_json(registry: Arc<MetricRegistry>, options: &MetricsOptions) -> Result<String> {
    let sample = collect_sample(registry, options).await?;
    json::to_json(&sample)
}
