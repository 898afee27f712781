//! JSON exposition payload.
//!
//! A sample renders as an array of `{"scope"?, "name", "metric"}` entries in
//! identity order. `scope` is the owner's short name and is left out for
//! metrics registered under the host's default owner.

use serde::Serialize;

use metrix_core::error::{MetrixError, Result};
use metrix_core::{GaugeValue, HistogramSnapshot, MeterSnapshot, TimerView, DEFAULT_PERCENTILES};

use crate::host::MetricHost;
use crate::snapshot::{MetricSnapshot, Sample};

#[derive(Serialize)]
struct Entry<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<&'a str>,
    name: &'a str,
    metric: MetricView<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MetricView<'a> {
    Counter { count: i64 },
    Gauge { value: GaugeValue },
    Histogram(HistogramView),
    Meter(&'a MeterSnapshot),
    Timer(TimerView),
}

#[derive(Serialize)]
struct HistogramView {
    count: i64,
    max: i64,
    min: i64,
    mean: f64,
    std_dev: f64,
    percentiles: Vec<f64>,
}

impl From<&HistogramSnapshot> for HistogramView {
    fn from(h: &HistogramSnapshot) -> Self {
        Self {
            count: h.count,
            max: h.max,
            min: h.min,
            mean: h.mean,
            std_dev: h.std_dev,
            percentiles: h.percentiles(&DEFAULT_PERCENTILES),
        }
    }
}

fn view(snap: &MetricSnapshot) -> MetricView<'_> {
    match snap {
        MetricSnapshot::Counter(count) => MetricView::Counter { count: *count },
        MetricSnapshot::Gauge(g) => MetricView::Gauge { value: g.value() },
        MetricSnapshot::Histogram(h) => MetricView::Histogram(h.into()),
        MetricSnapshot::Meter(m) => MetricView::Meter(m),
        MetricSnapshot::Timer(t) => MetricView::Timer(t.view(&DEFAULT_PERCENTILES)),
    }
}

fn entries(sample: &Sample) -> Vec<Entry<'_>> {
    let default_owner = MetricHost::default_owner();
    sample
        .iter()
        .map(|(id, snap)| Entry {
            scope: (id.owner() != default_owner).then(|| id.owner().short_name()),
            name: id.name(),
            metric: view(snap),
        })
        .collect()
}

pub fn to_json(sample: &Sample) -> Result<String> {
    serde_json::to_string(&entries(sample))
        .map_err(|e| MetrixError::Internal(format!("serialize sample failed: {e}")))
}

pub fn to_value(sample: &Sample) -> Result<serde_json::Value> {
    serde_json::to_value(entries(sample))
        .map_err(|e| MetrixError::Internal(format!("serialize sample failed: {e}")))
}
