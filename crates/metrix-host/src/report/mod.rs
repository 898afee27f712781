//! Output adapters: JSON payload, text report, and periodic reporters.

pub mod collect;
pub mod json;
pub mod log;
pub mod periodic;
pub mod text;

pub use collect::{collect_json, collect_sample};
pub use log::LogReporter;
pub use periodic::{PeriodicReporter, Reporter};
