//! Distribution of a stream of values: running count/min/max/sum, a
//! Welford running variance, and a reservoir for percentiles.
//!
//! All state is atomic. Min and max converge through CAS retry loops; the
//! mean (`M`) and sum of squared deviations (`S`) live in two bit-pattern
//! atomics that are each advanced by their own CAS loop. The two loops are
//! not a single transaction, so under heavy contention `S` may be computed
//! from a mean another writer has already moved past. That approximation is
//! accepted; `count`, `sum`, `min` and `max` are always exact.

use serde::Serialize;

use crate::atomic::{AtomicCounter, AtomicF64};
use crate::sample::{Sample, SampleType};

/// Percentiles reported by every snapshot and adapter, in this order.
pub const DEFAULT_PERCENTILES: [f64; 6] = [0.5, 0.75, 0.95, 0.98, 0.99, 0.999];

// Marks `M` as not yet seeded. A NaN pattern the arithmetic below never produces.
const VARIANCE_UNSET: u64 = u64::MAX;

pub struct Histogram {
    sample: Box<dyn Sample>,
    count: AtomicCounter,
    min: AtomicCounter,
    max: AtomicCounter,
    sum: AtomicCounter,
    variance_m: AtomicF64,
    variance_s: AtomicF64,
}

impl Histogram {
    pub fn new(sample_type: SampleType) -> Self {
        Self::with_sample(sample_type.build())
    }

    pub fn with_sample(sample: Box<dyn Sample>) -> Self {
        Self {
            sample,
            count: AtomicCounter::new(0),
            min: AtomicCounter::new(i64::MAX),
            max: AtomicCounter::new(i64::MIN),
            sum: AtomicCounter::new(0),
            variance_m: AtomicF64::from_bits(VARIANCE_UNSET),
            variance_s: AtomicF64::new(0.0),
        }
    }

    /// Record a value.
    pub fn update(&self, value: i64) {
        // Bounds land before the count, so a reader that sees `count > 0`
        // never sees a sentinel.
        self.sample.update(value);
        self.set_max(value);
        self.set_min(value);
        self.count.increment_and_get();
        self.sum.get_and_add(value);
        self.update_variance(value);
    }

    fn set_max(&self, candidate: i64) {
        loop {
            let current = self.max.get();
            if current >= candidate || self.max.compare_and_set(current, candidate) {
                return;
            }
        }
    }

    fn set_min(&self, candidate: i64) {
        loop {
            let current = self.min.get();
            if current <= candidate || self.min.compare_and_set(current, candidate) {
                return;
            }
        }
    }

    fn update_variance(&self, value: i64) {
        let v = value as f64;
        if self
            .variance_m
            .compare_and_set_bits(VARIANCE_UNSET, v.to_bits())
        {
            return;
        }

        let (old_m, new_m) = loop {
            let old_bits = self.variance_m.bits();
            if old_bits == VARIANCE_UNSET {
                // Seeded concurrently by a writer that has not landed yet.
                if self.variance_m.compare_and_set_bits(VARIANCE_UNSET, v.to_bits()) {
                    return;
                }
                continue;
            }
            let old_m = f64::from_bits(old_bits);
            let count = self.count.get().max(1) as f64;
            let new_m = old_m + (v - old_m) / count;
            if self.variance_m.compare_and_set_bits(old_bits, new_m.to_bits()) {
                break (old_m, new_m);
            }
        };

        loop {
            let old_bits = self.variance_s.bits();
            let old_s = f64::from_bits(old_bits);
            let new_s = old_s + (v - old_m) * (v - new_m);
            if self.variance_s.compare_and_set_bits(old_bits, new_s.to_bits()) {
                return;
            }
        }
    }

    pub fn count(&self) -> i64 {
        self.count.get()
    }

    pub fn max(&self) -> i64 {
        if self.count() > 0 {
            self.max.get()
        } else {
            0
        }
    }

    pub fn min(&self) -> i64 {
        if self.count() > 0 {
            self.min.get()
        } else {
            0
        }
    }

    pub fn sum(&self) -> i64 {
        self.sum.get()
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count > 0 {
            self.sum() as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Sample variance `S / (n - 1)`; zero until two values are recorded.
    pub fn variance(&self) -> f64 {
        let count = self.count();
        if count <= 1 {
            return 0.0;
        }
        self.variance_s.get() / (count - 1) as f64
    }

    pub fn std_dev(&self) -> f64 {
        if self.count() > 0 {
            self.variance().sqrt()
        } else {
            0.0
        }
    }

    /// Copy of the reservoir contents.
    pub fn values(&self) -> Vec<i64> {
        self.sample.values()
    }

    pub fn percentiles(&self, ps: &[f64]) -> Vec<f64> {
        if self.count() == 0 {
            return vec![0.0; ps.len()];
        }
        let mut values = self.sample.values();
        values.sort_unstable();
        percentiles_of_sorted(&values, ps)
    }

    pub fn percentile(&self, p: f64) -> f64 {
        self.percentiles(&[p])[0]
    }

    pub fn clear(&self) {
        self.sample.clear();
        self.count.set(0);
        self.max.set(i64::MIN);
        self.min.set(i64::MAX);
        self.sum.set(0);
        self.variance_m.set_bits(VARIANCE_UNSET);
        self.variance_s.set(0.0);
    }

    /// Point-in-time copy, independent of later updates.
    pub fn snapshot(&self) -> HistogramSnapshot {
        let mut values = self.sample.values();
        values.sort_unstable();
        HistogramSnapshot {
            count: self.count(),
            max: self.max(),
            min: self.min(),
            mean: self.mean(),
            std_dev: self.std_dev(),
            values,
        }
    }
}

impl std::fmt::Debug for Histogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Histogram")
            .field("count", &self.count())
            .field("min", &self.min())
            .field("max", &self.max())
            .field("mean", &self.mean())
            .finish()
    }
}

/// Percentiles over ascending `values` using `pos = p * (n + 1)` with linear
/// interpolation between the neighbouring ranks. Empty input yields zeros;
/// a NaN `p` reads as the lowest rank.
pub fn percentiles_of_sorted(values: &[i64], ps: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return vec![0.0; ps.len()];
    }
    ps.iter()
        .map(|&p| {
            let p = if p.is_nan() { 0.0 } else { p };
            let pos = p * (n as f64 + 1.0);
            if pos < 1.0 {
                values[0] as f64
            } else if pos >= n as f64 {
                values[n - 1] as f64
            } else {
                let lower = values[pos as usize - 1] as f64;
                let upper = values[pos as usize] as f64;
                lower + (pos - pos.floor()) * (upper - lower)
            }
        })
        .collect()
}

/// Frozen histogram statistics with the sorted reservoir.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramSnapshot {
    pub count: i64,
    pub max: i64,
    pub min: i64,
    pub mean: f64,
    pub std_dev: f64,
    #[serde(skip)]
    pub values: Vec<i64>,
}

impl HistogramSnapshot {
    pub fn percentiles(&self, ps: &[f64]) -> Vec<f64> {
        if self.count == 0 {
            return vec![0.0; ps.len()];
        }
        percentiles_of_sorted(&self.values, ps)
    }

    pub fn default_percentiles(&self) -> [f64; 6] {
        let mut out = [0.0; 6];
        for (slot, v) in out.iter_mut().zip(self.percentiles(&DEFAULT_PERCENTILES)) {
            *slot = v;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;
    use std::thread;

    use proptest::prelude::*;

    use super::*;

    fn uniform() -> Histogram {
        Histogram::new(SampleType::Uniform)
    }

    #[test]
    fn empty_histogram_reports_zeros() {
        let h = uniform();
        assert_eq!(h.count(), 0);
        assert_eq!(h.max(), 0);
        assert_eq!(h.min(), 0);
        assert_eq!(h.mean(), 0.0);
        assert_eq!(h.std_dev(), 0.0);
        assert_eq!(h.percentiles(&DEFAULT_PERCENTILES), vec![0.0; 6]);
    }

    #[test]
    fn median_of_one_to_five_is_three() {
        let h = uniform();
        for v in 1..=5 {
            h.update(v);
        }
        assert_eq!(h.percentile(0.5), 3.0);
    }

    #[test]
    fn percentile_edges_clamp_to_extremes() {
        let h = uniform();
        for v in [10, 20, 30, 40] {
            h.update(v);
        }
        assert_eq!(h.percentile(0.1), 10.0);
        assert_eq!(h.percentile(0.999), 40.0);
        // pos = 0.75 * 5 = 3.75 -> 30 + 0.75 * 10
        assert!((h.percentile(0.75) - 37.5).abs() < 1e-9);
    }

    #[test]
    fn non_finite_percentiles_clamp() {
        let h = uniform();
        h.update(1);
        h.update(2);
        assert_eq!(h.percentile(f64::NAN), 1.0);
        assert_eq!(h.percentile(f64::NEG_INFINITY), 1.0);
        assert_eq!(h.percentile(f64::INFINITY), 2.0);
        assert_eq!(h.snapshot().percentiles(&[f64::NAN]), vec![1.0]);
    }

    #[test]
    fn single_value_has_zero_deviation() {
        let h = uniform();
        h.update(42);
        assert_eq!(h.std_dev(), 0.0);
        assert_eq!(h.mean(), 42.0);
        assert_eq!(h.min(), 42);
        assert_eq!(h.max(), 42);
    }

    #[test]
    fn known_variance() {
        let h = uniform();
        for v in [2, 4, 4, 4, 5, 5, 7, 9] {
            h.update(v);
        }
        assert_eq!(h.mean(), 5.0);
        // sum of squared deviations = 32, n - 1 = 7
        assert!((h.variance() - 32.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn clear_restores_sentinels() {
        let h = uniform();
        h.update(-3);
        h.update(8);
        h.clear();
        assert_eq!(h.count(), 0);
        assert_eq!(h.min(), 0);
        h.update(5);
        assert_eq!(h.min(), 5);
        assert_eq!(h.max(), 5);
        assert_eq!(h.mean(), 5.0);
    }

    #[test]
    fn snapshot_is_detached() {
        let h = uniform();
        h.update(1);
        let snap = h.snapshot();
        h.update(100);
        assert_eq!(snap.count, 1);
        assert_eq!(snap.max, 1);
        assert_eq!(snap.percentiles(&[0.5]), vec![1.0]);
    }

    #[test]
    fn concurrent_bounds_are_exact() {
        let h = Arc::new(Histogram::new(SampleType::Decaying));
        let handles: Vec<_> = (0..8i64)
            .map(|t| {
                let h = Arc::clone(&h);
                thread::spawn(move || {
                    for v in 0..1_000i64 {
                        h.update(t * 1_000 + v - 3_000);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(h.count(), 8_000);
        assert_eq!(h.min(), -3_000);
        assert_eq!(h.max(), 4_999);
        assert_eq!(h.sum(), (-3_000..5_000i64).sum::<i64>());
    }

    #[test]
    fn snapshots_never_expose_sentinels() {
        for _ in 0..200 {
            let h = Arc::new(uniform());
            let writer = {
                let h = Arc::clone(&h);
                thread::spawn(move || {
                    for v in 0..50 {
                        h.update(v);
                    }
                })
            };
            while !writer.is_finished() {
                let snap = h.snapshot();
                if snap.count > 0 {
                    assert!((0..50).contains(&snap.max));
                    assert!((0..50).contains(&snap.min));
                }
            }
            writer.join().unwrap();
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_bounds_and_moments(values in prop::collection::vec(-1_000_000i64..1_000_000, 1..300)) {
            let h = uniform();
            for &v in &values {
                h.update(v);
            }
            let n = values.len() as f64;
            let mean = values.iter().sum::<i64>() as f64 / n;

            prop_assert_eq!(h.max(), *values.iter().max().unwrap());
            prop_assert_eq!(h.min(), *values.iter().min().unwrap());
            prop_assert!((h.mean() - mean).abs() < 1e-6);

            let ss: f64 = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum();
            let expected = if values.len() > 1 { (ss / (n - 1.0)).sqrt() } else { 0.0 };
            prop_assert!((h.std_dev() - expected).abs() <= 1e-6 * expected.max(1.0));
        }

        #[test]
        fn prop_percentiles_are_monotonic(values in prop::collection::vec(any::<i32>(), 1..200)) {
            let h = uniform();
            for &v in &values {
                h.update(v as i64);
            }
            let ps = h.percentiles(&DEFAULT_PERCENTILES);
            for w in ps.windows(2) {
                prop_assert!(w[0] <= w[1]);
            }
            prop_assert!(ps[0] >= h.min() as f64);
            prop_assert!(ps[5] <= h.max() as f64);
        }
    }
}
