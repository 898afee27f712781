#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::{Arc, Barrier};
use std::thread;

use metrix_core::{MetrixError, SampleType, TimeUnit};
use metrix_host::{MetricFilter, MetricHost, MetricSnapshot};

#[test]
fn concurrent_get_or_add_yields_one_instance() {
    let host = Arc::new(MetricHost::new());
    let barrier = Arc::new(Barrier::new(16));
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let host = Arc::clone(&host);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let c = host.counter("shared").unwrap();
                c.increment();
                c
            })
        })
        .collect();
    let counters: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(counters.iter().all(|c| Arc::ptr_eq(c, &counters[0])));
    assert_eq!(counters[0].count(), 16);
    assert_eq!(host.len(), 1);
}

#[test]
fn concurrent_meter_creation_starts_one_ticker() {
    let host = Arc::new(MetricHost::new());
    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let host = Arc::clone(&host);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                host.meter("hits", "requests", TimeUnit::Seconds).unwrap()
            })
        })
        .collect();
    let meters: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(meters.iter().all(|m| Arc::ptr_eq(m, &meters[0])));
    assert!(meters[0].is_ticking());
    host.clear();
    assert!(!meters[0].is_ticking());
}

#[test]
fn kind_mismatch_returns_error() {
    let host = MetricHost::new();
    host.timer("work", TimeUnit::Milliseconds, TimeUnit::Seconds)
        .unwrap();
    match host.counter("work") {
        Err(MetrixError::KindMismatch {
            expected, actual, ..
        }) => {
            assert_eq!(expected, "counter");
            assert_eq!(actual, "timer");
        }
        other => panic!("expected kind mismatch, got {other:?}"),
    }
    host.clear();
}

#[test]
fn snapshot_is_independent_of_later_updates() {
    let host = MetricHost::new();
    let h = host.histogram("sizes", SampleType::Uniform).unwrap();
    for v in [10, 20, 30] {
        h.update(v);
    }
    let sample = host.sample(MetricFilter::ALL);
    for _ in 0..100 {
        h.update(1_000);
    }
    let (_, snap) = sample.iter().next().unwrap();
    match snap {
        MetricSnapshot::Histogram(s) => {
            assert_eq!(s.count, 3);
            assert_eq!(s.max, 30);
            assert_eq!(s.values, vec![10, 20, 30]);
        }
        other => panic!("unexpected snapshot {other:?}"),
    }
}

#[test]
fn filter_selects_kinds() {
    let host = MetricHost::new();
    host.counter("c").unwrap();
    host.gauge("g", || true).unwrap();
    host.histogram("h", SampleType::Decaying).unwrap();

    assert_eq!(host.sample(MetricFilter::NONE).len(), 3);
    assert_eq!(host.sample(MetricFilter::ALL).len(), 3);
    let only = host.sample(MetricFilter::GAUGE | MetricFilter::COUNTER);
    let names: Vec<_> = only.iter().map(|(id, _)| id.name().to_string()).collect();
    assert_eq!(names, ["c", "g"]);
}
