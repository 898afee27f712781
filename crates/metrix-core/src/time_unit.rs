use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MetrixError;

/// Granularity for durations and rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Nanoseconds in one unit.
    pub const fn nanos(self) -> i64 {
        match self {
            TimeUnit::Nanoseconds => 1,
            TimeUnit::Microseconds => 1_000,
            TimeUnit::Milliseconds => 1_000_000,
            TimeUnit::Seconds => 1_000_000_000,
            TimeUnit::Minutes => 60 * 1_000_000_000,
            TimeUnit::Hours => 60 * 60 * 1_000_000_000,
            TimeUnit::Days => 24 * 60 * 60 * 1_000_000_000,
        }
    }

    pub fn abbreviate(self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Microseconds => "us",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "m",
            TimeUnit::Hours => "h",
            TimeUnit::Days => "d",
        }
    }

    /// Convert `duration` expressed in `self` into `target`, truncating toward
    /// zero and saturating at the i64 bounds.
    pub fn convert(self, duration: i64, target: TimeUnit) -> i64 {
        let nanos = duration as i128 * self.nanos() as i128;
        let out = nanos / target.nanos() as i128;
        out.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub fn to_nanos(self, duration: i64) -> i64 {
        self.convert(duration, TimeUnit::Nanoseconds)
    }

    pub fn to_millis(self, duration: i64) -> i64 {
        self.convert(duration, TimeUnit::Milliseconds)
    }

    pub fn to_seconds(self, duration: i64) -> i64 {
        self.convert(duration, TimeUnit::Seconds)
    }

    /// Express a nanosecond quantity in this unit without truncation.
    pub fn from_nanos_f64(self, nanos: f64) -> f64 {
        nanos / self.nanos() as f64
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "Nanoseconds",
            TimeUnit::Microseconds => "Microseconds",
            TimeUnit::Milliseconds => "Milliseconds",
            TimeUnit::Seconds => "Seconds",
            TimeUnit::Minutes => "Minutes",
            TimeUnit::Hours => "Hours",
            TimeUnit::Days => "Days",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = MetrixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.to_ascii_lowercase().as_str() {
            "ns" | "nanoseconds" => TimeUnit::Nanoseconds,
            "us" | "microseconds" => TimeUnit::Microseconds,
            "ms" | "milliseconds" => TimeUnit::Milliseconds,
            "s" | "seconds" => TimeUnit::Seconds,
            "m" | "minutes" => TimeUnit::Minutes,
            "h" | "hours" => TimeUnit::Hours,
            "d" | "days" => TimeUnit::Days,
            other => return Err(MetrixError::BadConfig(format!("unknown time unit: {other}"))),
        };
        Ok(unit)
    }
}
