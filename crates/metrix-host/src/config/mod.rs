//! Metrics config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use metrix_core::error::{MetrixError, Result};

pub use schema::{MetricsOptions, ReporterOptions};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<MetricsOptions> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)
        .map_err(|e| MetrixError::BadConfig(format!("read {} failed: {e}", path.display())))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<MetricsOptions> {
    let cfg: MetricsOptions = serde_yaml::from_str(s)
        .map_err(|e| MetrixError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
