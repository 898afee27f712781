use crate::atomic::AtomicCounter;

/// Signed atomic counter.
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicCounter,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> i64 {
        self.count.get()
    }

    pub fn increment(&self) -> i64 {
        self.increment_by(1)
    }

    pub fn increment_by(&self, amount: i64) -> i64 {
        self.count.add_and_get(amount)
    }

    pub fn decrement(&self) -> i64 {
        self.decrement_by(1)
    }

    pub fn decrement_by(&self, amount: i64) -> i64 {
        self.count.add_and_get(amount.wrapping_neg())
    }

    pub fn clear(&self) {
        self.count.set(0);
    }
}
