//! metrix demo
//!
//! Registers a handful of metrics, drives them from a background workload,
//! and logs a text report every `reporter.interval_ms` until Ctrl-C.
//! Reads `metrix.yaml` from the working directory when present.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

use metrix_core::{SampleType, TimeUnit};
use metrix_host::config::{self, MetricsOptions};
use metrix_host::report::{collect_json, LogReporter, PeriodicReporter};
use metrix_host::{MetricHost, MetricRegistry, ScopedHost};

const CONFIG_PATH: &str = "metrix.yaml";

struct Worker;

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let options = if Path::new(CONFIG_PATH).exists() {
        config::load_from_file(CONFIG_PATH).expect("config load failed")
    } else {
        MetricsOptions::default()
    };

    let registry = Arc::new(MetricRegistry::new());
    let host = Arc::new(MetricHost::new());
    registry.add("demo", Arc::clone(&host));

    let worker: ScopedHost<Worker> = ScopedHost::new(Arc::clone(&host));
    let jobs = worker.counter("jobs").expect("counter");
    let sizes = worker.histogram("payload-bytes", SampleType::Decaying).expect("histogram");
    let requests = host.meter("requests", "requests", TimeUnit::Seconds).expect("meter");
    let latency = host
        .timer("latency", TimeUnit::Milliseconds, TimeUnit::Seconds)
        .expect("timer");
    let in_flight = Arc::new(AtomicU64::new(0));
    let gauge_src = Arc::clone(&in_flight);
    host.gauge("in-flight", move || gauge_src.load(Ordering::Relaxed))
        .expect("gauge");

    let workload = tokio::spawn(async move {
        let mut n: i64 = 0;
        loop {
            n += 1;
            in_flight.fetch_add(1, Ordering::Relaxed);
            latency
                .time_async(tokio::time::sleep(Duration::from_millis((n % 7 + 1) as u64)))
                .await;
            in_flight.fetch_sub(1, Ordering::Relaxed);
            jobs.increment();
            sizes.update(128 * (n % 16 + 1));
            requests.mark();
        }
    });

    let reporter = Arc::new(LogReporter::new(Arc::clone(&registry), options.filter()));
    let periodic = PeriodicReporter::spawn(reporter, &options.reporter).expect("reporter start failed");

    tracing::info!("metrix demo running; Ctrl-C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "ctrl-c handler failed");
    }

    workload.abort();
    periodic.shutdown().await;
    match collect_json(Arc::clone(&registry), &options).await {
        Ok(json) => tracing::info!(%json, "final sample"),
        Err(e) => tracing::warn!(code = e.code(), error = %e, "final sample failed"),
    }
    host.clear();
}
