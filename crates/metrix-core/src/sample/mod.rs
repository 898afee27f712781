//! Bounded reservoirs used by histograms for percentile estimation.
//!
//! Both variants accept updates from any number of threads without locking
//! and never fail: a reservoir that is full either replaces an existing slot
//! or drops the new value.

pub mod decaying;
pub mod uniform;

use std::str::FromStr;

pub use decaying::DecayingSample;
pub use uniform::UniformSample;

use crate::error::MetrixError;

/// Reservoir size used by histograms and timers.
pub const DEFAULT_SAMPLE_SIZE: usize = 1028;

/// Forward-decay factor; with 1028 slots this keeps roughly the last five
/// minutes of observations significant.
pub const DEFAULT_ALPHA: f64 = 0.015;

/// A statistically representative sample of a stream of values.
pub trait Sample: Send + Sync {
    /// Offer a new value. Never blocks.
    fn update(&self, value: i64);

    /// Copy of the retained values, in no particular order.
    fn values(&self) -> Vec<i64>;

    /// Number of retained values.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self);
}

/// Reservoir selection for a histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleType {
    /// Uniform over the whole stream history.
    Uniform,
    /// Forward-decayed, biased toward recent values.
    #[default]
    Decaying,
}

impl SampleType {
    pub fn build(self) -> Box<dyn Sample> {
        match self {
            SampleType::Uniform => Box::new(UniformSample::new(DEFAULT_SAMPLE_SIZE)),
            SampleType::Decaying => {
                Box::new(DecayingSample::new(DEFAULT_SAMPLE_SIZE, DEFAULT_ALPHA))
            }
        }
    }
}

impl FromStr for SampleType {
    type Err = MetrixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uniform" => Ok(SampleType::Uniform),
            "decaying" | "biased" => Ok(SampleType::Decaying),
            other => Err(MetrixError::UnsupportedSample(other.to_string())),
        }
    }
}
