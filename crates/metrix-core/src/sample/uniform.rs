use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use rand::Rng;

use super::Sample;

/// Reservoir sampling (Vitter's Algorithm R) over fixed atomic slots.
///
/// A slot is published only after its first value is stored, so a reader
/// racing the fill phase skips slots whose writer has not landed yet.
pub struct UniformSample {
    slots: Box<[AtomicI64]>,
    ready: Box<[AtomicBool]>,
    seen: AtomicU64,
}

impl UniformSample {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| AtomicI64::new(0)).collect(),
            ready: (0..capacity).map(|_| AtomicBool::new(false)).collect(),
            seen: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl Sample for UniformSample {
    fn update(&self, value: i64) {
        let seen = self.seen.fetch_add(1, Ordering::AcqRel) + 1;
        let capacity = self.slots.len() as u64;
        if seen <= capacity {
            let idx = (seen - 1) as usize;
            self.slots[idx].store(value, Ordering::Release);
            self.ready[idx].store(true, Ordering::Release);
            return;
        }
        let r = rand::thread_rng().gen_range(0..seen);
        if r < capacity {
            self.slots[r as usize].store(value, Ordering::Release);
        }
    }

    fn values(&self) -> Vec<i64> {
        let n = self.len();
        self.slots[..n]
            .iter()
            .zip(self.ready[..n].iter())
            .filter(|(_, ready)| ready.load(Ordering::Acquire))
            .map(|(slot, _)| slot.load(Ordering::Acquire))
            .collect()
    }

    /// Claimed slots; during the fill phase this can briefly run ahead of
    /// `values().len()`.
    fn len(&self) -> usize {
        let seen = self.seen.load(Ordering::Acquire);
        seen.min(self.slots.len() as u64) as usize
    }

    fn clear(&self) {
        for (slot, ready) in self.slots.iter().zip(self.ready.iter()) {
            ready.store(false, Ordering::Release);
            slot.store(0, Ordering::Release);
        }
        self.seen.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn fills_in_order_until_capacity() {
        let s = UniformSample::new(4);
        for v in 1..=3 {
            s.update(v);
        }
        assert_eq!(s.values(), vec![1, 2, 3]);
    }

    #[test]
    fn never_exceeds_capacity_and_keeps_only_inputs() {
        let s = UniformSample::new(1028);
        for v in 0..10_000 {
            s.update(v + 1_000_000);
        }
        let values = s.values();
        assert_eq!(values.len(), 1028);
        assert!(values.iter().all(|v| (1_000_000..1_010_000).contains(v)));
    }

    #[test]
    fn late_values_get_a_chance() {
        // With 100 slots and 10k values, the chance no value above 5k survives is negligible.
        let s = UniformSample::new(100);
        for v in 0..10_000 {
            s.update(v);
        }
        assert!(s.values().iter().any(|&v| v >= 5_000));
    }

    #[test]
    fn concurrent_updates_stay_bounded() {
        let s = Arc::new(UniformSample::new(64));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let s = Arc::clone(&s);
                thread::spawn(move || {
                    for v in 0..5_000 {
                        s.update(t * 10_000 + v + 1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let values: HashSet<i64> = s.values().into_iter().collect();
        assert!(values.len() <= 64);
        assert!(values.iter().all(|&v| v > 0 && v < 40_000));
    }

    #[test]
    fn readers_racing_the_fill_only_see_inputs() {
        for _ in 0..100 {
            let s = Arc::new(UniformSample::new(256));
            let writers: Vec<_> = (0..4)
                .map(|t| {
                    let s = Arc::clone(&s);
                    thread::spawn(move || {
                        for v in 0..64 {
                            s.update(t * 1_000 + v + 1);
                        }
                    })
                })
                .collect();
            while !writers.iter().all(|w| w.is_finished()) {
                assert!(s.values().iter().all(|&v| v > 0));
            }
            for w in writers {
                w.join().unwrap();
            }
            assert_eq!(s.values().len(), 256);
        }
    }

    #[test]
    fn clear_empties() {
        let s = UniformSample::new(8);
        s.update(7);
        s.clear();
        assert!(s.is_empty());
        assert!(s.values().is_empty());
    }
}
