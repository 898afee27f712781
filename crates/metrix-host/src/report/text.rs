//! Human-readable report, grouped by owner and then by metric name.

use std::io::{self, Write};

use chrono::{DateTime, Local};

use metrix_core::{HistogramSnapshot, MeterSnapshot, TimeUnit};

use crate::snapshot::{MetricSnapshot, Sample};

const REPORT_WIDTH: usize = 80;

/// Write one report for `samples` (one per host) stamped with `now`.
pub fn write_report<W: Write>(out: &mut W, samples: &[Sample], now: DateTime<Local>) -> io::Result<()> {
    let stamp = now.format("%Y-%m-%d %H:%M").to_string();
    let rule = REPORT_WIDTH.saturating_sub(stamp.len() + 1);
    writeln!(out, "{stamp} {}", "=".repeat(rule))?;

    for sample in samples {
        for (owner, metrics) in sample.by_owner() {
            writeln!(out, "{owner}:")?;
            for (name, snap) in metrics {
                writeln!(out, "  {name}:")?;
                write_metric(out, snap)?;
                writeln!(out)?;
            }
            writeln!(out)?;
        }
    }
    out.flush()
}

/// Render to a string; used by the log reporter.
pub fn render(samples: &[Sample], now: DateTime<Local>) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_report(&mut buf, samples, now);
    String::from_utf8_lossy(&buf).into_owned()
}

fn write_metric<W: Write>(out: &mut W, snap: &MetricSnapshot) -> io::Result<()> {
    match snap {
        MetricSnapshot::Gauge(g) => writeln!(out, "    value = {}", g.value()),
        MetricSnapshot::Counter(count) => writeln!(out, "    count = {count}"),
        MetricSnapshot::Meter(m) => write_metered(out, m),
        MetricSnapshot::Histogram(h) => write_distribution(out, h, None),
        MetricSnapshot::Timer(t) => {
            write_metered(out, &t.throughput)?;
            write_distribution(out, &t.durations, Some(t.duration_unit))
        }
    }
}

fn write_metered<W: Write>(out: &mut W, m: &MeterSnapshot) -> io::Result<()> {
    let unit = m.rate_unit.abbreviate();
    let ev = &m.event_type;
    writeln!(out, "             count = {}", m.count)?;
    writeln!(out, "         mean rate = {:.2} {ev}/{unit}", m.mean_rate)?;
    writeln!(out, "     1-minute rate = {:.2} {ev}/{unit}", m.one_minute_rate)?;
    writeln!(out, "     5-minute rate = {:.2} {ev}/{unit}", m.five_minute_rate)?;
    writeln!(out, "    15-minute rate = {:.2} {ev}/{unit}", m.fifteen_minute_rate)
}

/// Histogram values are raw; timer values are nanoseconds scaled to `unit`.
fn write_distribution<W: Write>(
    out: &mut W,
    h: &HistogramSnapshot,
    unit: Option<TimeUnit>,
) -> io::Result<()> {
    let scale = |v: f64| unit.map_or(v, |u| u.from_nanos_f64(v));
    let suffix = unit.map(|u| format!(" {}", u.abbreviate())).unwrap_or_default();
    let p = h.default_percentiles();
    let rows = [
        ("min", h.min as f64),
        ("max", h.max as f64),
        ("mean", h.mean),
        ("stddev", h.std_dev),
        ("median", p[0]),
        ("75% <=", p[1]),
        ("95% <=", p[2]),
        ("98% <=", p[3]),
        ("99% <=", p[4]),
        ("99.9% <=", p[5]),
    ];
    for (label, value) in rows {
        let lead = if label.ends_with("<=") { "" } else { " =" };
        writeln!(out, "{label:>18}{lead} {:.2}{suffix}", scale(value))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::TimeZone;
    use metrix_core::SampleType;

    use super::*;
    use crate::host::MetricHost;
    use crate::metric::MetricFilter;

    struct Queue;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap()
    }

    #[test]
    fn header_is_padded_to_width() {
        let text = render(&[], fixed_now());
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("2024-03-09 14:05 ="));
        assert_eq!(header.len(), REPORT_WIDTH);
    }

    #[test]
    fn groups_by_owner_then_name() {
        let host = MetricHost::new();
        host.counter_for::<Queue>("pushed").unwrap().increment_by(4);
        host.counter("b-total").unwrap();
        host.counter("a-total").unwrap();
        let text = render(&[host.sample(MetricFilter::NONE)], fixed_now());

        let a = text.find("  a-total:").unwrap();
        let b = text.find("  b-total:").unwrap();
        let host_owner = text.find("MetricHost:").unwrap();
        let queue = text.find("Queue:").unwrap();
        assert!(host_owner < a && a < b);
        assert!(b < queue);
        assert!(text.contains("    count = 4"));
    }

    #[test]
    fn histogram_rows() {
        let host = MetricHost::new();
        let h = host.histogram("sizes", SampleType::Uniform).unwrap();
        for v in 1..=5 {
            h.update(v);
        }
        let text = render(&[host.sample(MetricFilter::HISTOGRAM)], fixed_now());
        assert!(text.contains("               min = 1.00\n"));
        assert!(text.contains("            median = 3.00\n"));
        assert!(text.contains("          99.9% <= 5.00\n"));
    }
}
