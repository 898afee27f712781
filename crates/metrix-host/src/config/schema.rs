use std::time::Duration;

use serde::Deserialize;

use metrix_core::error::{MetrixError, Result};

use crate::metric::{MetricFilter, MetricKind};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsOptions {
    /// Kinds to include in exposed samples; empty means all.
    #[serde(default)]
    pub type_filter: Vec<MetricKind>,

    #[serde(default = "default_sample_timeout_seconds")]
    pub sample_timeout_seconds: u64,

    #[serde(default = "default_enable_server_timing")]
    pub enable_server_timing: bool,

    #[serde(default)]
    pub reporter: ReporterOptions,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        Self {
            type_filter: Vec::new(),
            sample_timeout_seconds: default_sample_timeout_seconds(),
            enable_server_timing: default_enable_server_timing(),
            reporter: ReporterOptions::default(),
        }
    }
}

impl MetricsOptions {
    pub fn validate(&self) -> Result<()> {
        if !(1..=300).contains(&self.sample_timeout_seconds) {
            return Err(MetrixError::BadConfig(
                "sample_timeout_seconds must be between 1 and 300".into(),
            ));
        }
        self.reporter.validate()?;
        Ok(())
    }

    pub fn filter(&self) -> MetricFilter {
        MetricFilter::from_kinds(self.type_filter.iter().copied())
    }

    pub fn sample_timeout(&self) -> Duration {
        Duration::from_secs(self.sample_timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReporterOptions {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// End the reporting loop after the first failed report.
    #[serde(default)]
    pub stop_on_error: bool,
}

impl Default for ReporterOptions {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            stop_on_error: false,
        }
    }
}

impl ReporterOptions {
    pub fn validate(&self) -> Result<()> {
        if !(100..=3_600_000).contains(&self.interval_ms) {
            return Err(MetrixError::BadConfig(
                "reporter.interval_ms must be between 100 and 3600000".into(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_sample_timeout_seconds() -> u64 {
    5
}
fn default_enable_server_timing() -> bool {
    true
}
fn default_interval_ms() -> u64 {
    5000
}
