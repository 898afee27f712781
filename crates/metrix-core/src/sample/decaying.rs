//! Forward-decaying reservoir.
//!
//! Each value gets priority `exp(alpha * (t - landmark)) / u` with `u` drawn
//! uniformly from (0, 1]. Newer values therefore tend to outrank older ones,
//! and a full reservoir evicts its lowest-priority entry. Priorities grow
//! without bound as `t` moves away from the landmark, so once an hour the
//! landmark is moved forward and every entry re-based on it.
//!
//! Slots are `ArcSwapOption`s replaced by compare-and-swap. Every entry
//! records the landmark its weight is relative to, which keeps comparisons
//! exact while a rescale pass races with inserts.
//!
//! See Cormode et al., "Forward Decay: A Practical Time Decay Model for
//! Streaming Systems" (ICDE 2009).

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use rand::Rng;

use super::Sample;
use crate::atomic::AtomicF64;
use crate::clock::{default_clock, SharedClock};

const RESCALE_THRESHOLD: Duration = Duration::from_secs(60 * 60);

#[derive(Debug)]
struct Entry {
    value: i64,
    weight: f64,
    // seconds on the sample clock
    landmark: f64,
}

impl Entry {
    fn priority_at(&self, landmark: f64, alpha: f64) -> f64 {
        if self.landmark == landmark {
            self.weight
        } else {
            self.weight * (-alpha * (landmark - self.landmark)).exp()
        }
    }
}

pub struct DecayingSample {
    alpha: f64,
    slots: Box<[ArcSwapOption<Entry>]>,
    filled: AtomicUsize,
    landmark: AtomicF64,
    next_rescale: AtomicU64,
    clock: SharedClock,
}

impl DecayingSample {
    pub fn new(capacity: usize, alpha: f64) -> Self {
        Self::with_clock(capacity, alpha, default_clock())
    }

    pub fn with_clock(capacity: usize, alpha: f64, clock: SharedClock) -> Self {
        let now = clock.now_nanos();
        let slots = (0..capacity.max(1)).map(|_| ArcSwapOption::empty()).collect();
        Self {
            alpha,
            slots,
            filled: AtomicUsize::new(0),
            landmark: AtomicF64::new(nanos_to_secs(now)),
            next_rescale: AtomicU64::new(now + RESCALE_THRESHOLD.as_nanos() as u64),
            clock,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Current landmark in seconds on the sample clock.
    pub fn landmark(&self) -> f64 {
        self.landmark.get()
    }

    /// Insert with an explicit weight relative to the current landmark.
    pub(crate) fn update_weighted(&self, value: i64, weight: f64) {
        let landmark = self.landmark.get();
        self.insert(Entry {
            value,
            weight,
            landmark,
        });
    }

    fn insert(&self, entry: Entry) {
        let entry = Arc::new(entry);
        let capacity = self.slots.len();

        let claimed = self
            .filled
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < capacity).then_some(n + 1)
            });
        if let Ok(idx) = claimed {
            let empty: Option<Arc<Entry>> = None;
            let prev = self.slots[idx].compare_and_swap(&empty, Some(Arc::clone(&entry)));
            if prev.is_none() {
                return;
            }
            // An evictor filled this slot first; compete like everyone else.
        }

        loop {
            let landmark = self.landmark.get();
            let candidate = entry.priority_at(landmark, self.alpha);

            let mut lowest_idx = 0;
            let mut lowest = f64::INFINITY;
            for (i, slot) in self.slots.iter().enumerate() {
                let p = peek(slot, |e| e.priority_at(landmark, self.alpha))
                    .unwrap_or(f64::NEG_INFINITY);
                if p < lowest {
                    lowest = p;
                    lowest_idx = i;
                }
            }

            let current = self.slots[lowest_idx].load_full();
            let current_priority = current
                .as_ref()
                .map_or(f64::NEG_INFINITY, |e| e.priority_at(landmark, self.alpha));
            if current_priority != lowest {
                // Slot moved under us; rescan.
                continue;
            }
            if current.is_some() && candidate <= lowest {
                // The newcomer is the lowest priority of all: it is the one evicted.
                return;
            }

            let prev = self.slots[lowest_idx].compare_and_swap(&current, Some(Arc::clone(&entry)));
            if same_entry(&prev, &current) {
                return;
            }
        }
    }

    fn rescale_if_due(&self, now: u64) {
        let next = self.next_rescale.load(Ordering::Acquire);
        if now < next {
            return;
        }
        if self
            .next_rescale
            .compare_exchange(
                next,
                now + RESCALE_THRESHOLD.as_nanos() as u64,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }
        self.rescale(nanos_to_secs(now));
    }

    fn rescale(&self, new_landmark: f64) {
        self.landmark.set(new_landmark);
        for slot in self.slots.iter() {
            loop {
                let current = slot.load_full();
                let rebased = match current.as_ref() {
                    None => break,
                    Some(e) if e.landmark == new_landmark => break,
                    Some(e) => Entry {
                        value: e.value,
                        weight: e.priority_at(new_landmark, self.alpha),
                        landmark: new_landmark,
                    },
                };
                let prev = slot.compare_and_swap(&current, Some(Arc::new(rebased)));
                if same_entry(&prev, &current) {
                    break;
                }
            }
        }
        tracing::trace!(landmark = new_landmark, "decaying sample rescaled");
    }

    /// Retained values paired with their priority at the current landmark.
    pub fn weighted_values(&self) -> Vec<(i64, f64)> {
        let landmark = self.landmark.get();
        self.slots
            .iter()
            .filter_map(|s| peek(s, |e| (e.value, e.priority_at(landmark, self.alpha))))
            .collect()
    }
}

impl Sample for DecayingSample {
    fn update(&self, value: i64) {
        let now = self.clock.now_nanos();
        self.rescale_if_due(now);

        let landmark = self.landmark.get();
        let draw = 1.0 - rand::thread_rng().gen::<f64>();
        let weight = (self.alpha * (nanos_to_secs(now) - landmark)).exp() / draw;
        self.insert(Entry {
            value,
            weight,
            landmark,
        });
    }

    fn values(&self) -> Vec<i64> {
        self.slots
            .iter()
            .filter_map(|s| peek(s, |e| e.value))
            .collect()
    }

    fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.load().is_some()).count()
    }

    fn clear(&self) {
        for slot in self.slots.iter() {
            slot.store(None);
        }
        self.filled.store(0, Ordering::Release);
        let now = self.clock.now_nanos();
        self.landmark.set(nanos_to_secs(now));
        self.next_rescale
            .store(now + RESCALE_THRESHOLD.as_nanos() as u64, Ordering::Release);
    }
}

impl fmt::Debug for DecayingSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecayingSample")
            .field("alpha", &self.alpha)
            .field("capacity", &self.slots.len())
            .field("len", &self.len())
            .field("landmark", &self.landmark.get())
            .finish()
    }
}

fn peek<R>(slot: &ArcSwapOption<Entry>, f: impl FnOnce(&Entry) -> R) -> Option<R> {
    let guard = slot.load();
    Option::as_ref(&*guard).map(|e| f(e))
}

fn same_entry(a: &Option<Arc<Entry>>, b: &Option<Arc<Entry>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

fn nanos_to_secs(nanos: u64) -> f64 {
    nanos as f64 / 1e9
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::clock::ManualClock;

    fn manual(capacity: usize) -> (Arc<ManualClock>, DecayingSample) {
        let clock = Arc::new(ManualClock::new());
        let sample = DecayingSample::with_clock(capacity, 0.015, clock.clone());
        (clock, sample)
    }

    #[test]
    fn never_exceeds_capacity() {
        let (_, s) = manual(100);
        for v in 0..5_000 {
            s.update(v);
        }
        assert_eq!(s.len(), 100);
        assert_eq!(s.values().len(), 100);
    }

    #[test]
    fn evicts_lowest_weight() {
        let (_, s) = manual(3);
        s.update_weighted(10, 1.0);
        s.update_weighted(20, 5.0);
        s.update_weighted(30, 3.0);

        s.update_weighted(40, 4.0);
        let mut values = s.values();
        values.sort();
        assert_eq!(values, vec![20, 30, 40]);

        s.update_weighted(50, 3.5);
        let mut values = s.values();
        values.sort();
        assert_eq!(values, vec![20, 40, 50]);
    }

    #[test]
    fn lowest_newcomer_is_dropped() {
        let (_, s) = manual(2);
        s.update_weighted(1, 2.0);
        s.update_weighted(2, 3.0);
        s.update_weighted(3, 0.5);
        let mut values = s.values();
        values.sort();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn favours_recent_values() {
        let (clock, s) = manual(50);
        for v in 0..1_000 {
            s.update(v);
        }
        clock.advance(Duration::from_secs(600));
        for v in 10_000..11_000 {
            s.update(v);
        }
        // exp(0.015 * 600) ~ 8100x boost for the second batch.
        let recent = s.values().into_iter().filter(|&v| v >= 10_000).count();
        assert!(recent >= 45, "only {recent} recent values retained");
    }

    #[test]
    fn rescale_moves_landmark_and_keeps_order() {
        let (clock, s) = manual(4);
        s.update_weighted(1, 1.0);
        s.update_weighted(2, 2.0);
        s.update_weighted(3, 3.0);
        let before: Vec<i64> = {
            let mut w = s.weighted_values();
            w.sort_by(|a, b| a.1.total_cmp(&b.1));
            w.into_iter().map(|(v, _)| v).collect()
        };

        clock.advance(RESCALE_THRESHOLD + Duration::from_secs(1));
        s.update(4);
        assert!(s.landmark() > 3_600.0);

        let mut after = s.weighted_values();
        after.sort_by(|a, b| a.1.total_cmp(&b.1));
        let order: Vec<i64> = after.iter().map(|(v, _)| *v).filter(|v| *v != 4).collect();
        assert_eq!(order, before);
        assert!(after.iter().all(|(_, w)| w.is_finite()));
    }

    #[test]
    fn concurrent_inserts_stay_bounded() {
        let s = Arc::new(DecayingSample::new(128, 0.015));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let s = Arc::clone(&s);
                thread::spawn(move || {
                    for v in 0..2_000 {
                        s.update(t * 100_000 + v);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(s.len() <= 128);
        assert!(s.values().iter().all(|&v| v < 400_000));
    }

    #[test]
    fn clear_resets() {
        let (_, s) = manual(8);
        s.update(1);
        s.clear();
        assert!(s.is_empty());
        s.update(2);
        assert_eq!(s.values(), vec![2]);
    }
}
