//! Lock-free numeric cells.
//!
//! Every mutation in the engine bottoms out here: plain fetch-add for
//! integer accumulation and compare-and-set retry loops for anything that
//! has to read before it writes. Floating point values are stored as their
//! IEEE-754 bit pattern in an `AtomicU64` so they can take part in CAS.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// 64-bit signed integer with atomic get/set/add/CAS.
#[derive(Debug, Default)]
pub struct AtomicCounter {
    value: AtomicI64,
}

impl AtomicCounter {
    pub fn new(value: i64) -> Self {
        Self {
            value: AtomicI64::new(value),
        }
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Add `delta` and return the updated value.
    pub fn add_and_get(&self, delta: i64) -> i64 {
        self.value.fetch_add(delta, Ordering::AcqRel).wrapping_add(delta)
    }

    /// Add `delta` and return the previous value.
    pub fn get_and_add(&self, delta: i64) -> i64 {
        self.value.fetch_add(delta, Ordering::AcqRel)
    }

    pub fn increment_and_get(&self) -> i64 {
        self.add_and_get(1)
    }

    /// Store `new` only if the current value is `expected`.
    pub fn compare_and_set(&self, expected: i64, new: i64) -> bool {
        self.value
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Read and reset to zero in one step.
    pub fn take(&self) -> i64 {
        self.value.swap(0, Ordering::AcqRel)
    }
}

/// `f64` stored as raw bits so it can be compared-and-swapped.
#[derive(Debug)]
pub struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self::from_bits(value.to_bits())
    }

    /// Build from a raw pattern. Used for sentinels that are not meaningful floats.
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            bits: AtomicU64::new(bits),
        }
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits())
    }

    pub fn bits(&self) -> u64 {
        self.bits.load(Ordering::Acquire)
    }

    pub fn set(&self, value: f64) {
        self.set_bits(value.to_bits());
    }

    pub fn set_bits(&self, bits: u64) {
        self.bits.store(bits, Ordering::Release);
    }

    /// CAS on the raw pattern; comparing bits sidesteps NaN != NaN.
    pub fn compare_and_set_bits(&self, expected: u64, new: u64) -> bool {
        self.bits
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for AtomicF64 {
    fn default() -> Self {
        Self::new(0.0)
    }
}
