//! Shared fixed-interval ticker.
//!
//! A [`Ticker`] owns one worker thread running its own single-threaded tokio
//! runtime, and that worker drives every registered target. Starting a meter
//! therefore costs a map entry, not a task or a thread, and ticking does not
//! depend on whatever runtime the caller happened to be inside: targets keep
//! ticking after that runtime shuts down.
//!
//! Targets are held weakly. An entry goes away when its [`TickHandle`] is
//! cancelled or dropped, or on the next pass after its owner is dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::thread;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::{MetrixError, Result};
use crate::ewma::TICK_INTERVAL;

/// Something a [`Ticker`] calls once per interval.
pub trait Tick: Send + Sync {
    fn tick(&self);
}

struct Entry {
    target: Weak<dyn Tick>,
    cancelled: Arc<AtomicBool>,
}

#[derive(Default)]
struct Targets {
    next_id: u64,
    entries: HashMap<u64, Entry>,
}

struct Shared {
    name: &'static str,
    targets: Mutex<Targets>,
}

impl Shared {
    fn targets(&self) -> MutexGuard<'_, Targets> {
        self.targets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Live targets for one pass; cancelled and dropped entries are pruned.
    fn due(&self) -> Vec<(Arc<dyn Tick>, Arc<AtomicBool>)> {
        let mut targets = self.targets();
        let mut live = Vec::with_capacity(targets.entries.len());
        targets.entries.retain(|_, e| {
            if e.cancelled.load(Ordering::Acquire) {
                return false;
            }
            match e.target.upgrade() {
                Some(target) => {
                    live.push((target, Arc::clone(&e.cancelled)));
                    true
                }
                None => false,
            }
        });
        live
    }
}

pub struct Ticker {
    shared: Arc<Shared>,
    interval: Duration,
    // Set once the worker is running; cancelling it ends the worker.
    worker: Mutex<Option<CancellationToken>>,
}

static GLOBAL: OnceLock<Ticker> = OnceLock::new();

impl Ticker {
    /// A ticker with no worker yet; the worker starts on first registration.
    pub fn new(name: &'static str, interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                name,
                targets: Mutex::new(Targets::default()),
            }),
            interval,
            worker: Mutex::new(None),
        }
    }

    /// Process-wide ticker used by meters, firing every [`TICK_INTERVAL`].
    pub fn global() -> &'static Ticker {
        GLOBAL.get_or_init(|| Ticker::new("meter-tick", TICK_INTERVAL))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Registered targets, including ones whose owner was dropped since the
    /// last pass.
    pub fn len(&self) -> usize {
        self.shared.targets().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tick `target` every interval from now on. The first tick lands at the
    /// worker's next pass, at most one interval away.
    pub fn register(&self, target: Weak<dyn Tick>) -> Result<TickHandle> {
        self.ensure_worker()?;
        let cancelled = Arc::new(AtomicBool::new(false));
        let id = {
            let mut targets = self.shared.targets();
            let id = targets.next_id;
            targets.next_id += 1;
            targets.entries.insert(
                id,
                Entry {
                    target,
                    cancelled: Arc::clone(&cancelled),
                },
            );
            id
        };
        Ok(TickHandle {
            id,
            cancelled,
            shared: Arc::downgrade(&self.shared),
        })
    }

    fn ensure_worker(&self) -> Result<()> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() {
            return Ok(());
        }
        let name = self.shared.name;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| MetrixError::Internal(format!("build {name} runtime: {e}")))?;
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let shared = Arc::clone(&self.shared);
        let every = self.interval;
        thread::Builder::new()
            .name(format!("metrix-{name}"))
            .spawn(move || runtime.block_on(run(shared, every, token)))
            .map_err(|e| MetrixError::Internal(format!("spawn {name} worker: {e}")))?;
        tracing::debug!(ticker = name, interval_ms = every.as_millis() as u64, "ticker started");
        *worker = Some(shutdown);
        Ok(())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        let worker = self.worker.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = worker.take() {
            token.cancel();
        }
    }
}

impl std::fmt::Debug for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticker")
            .field("name", &self.shared.name)
            .field("interval", &self.interval)
            .field("targets", &self.len())
            .finish()
    }
}

/// Registration of one target. Dropping it unregisters the target.
pub struct TickHandle {
    id: u64,
    cancelled: Arc<AtomicBool>,
    shared: Weak<Shared>,
}

impl TickHandle {
    /// Stop ticking the target. A pass already past its cancellation check
    /// may still tick it once.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            shared.targets().entries.remove(&self.id);
            tracing::debug!(ticker = shared.name, id = self.id, "tick target removed");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Registered and the owning ticker still exists.
    pub fn is_active(&self) -> bool {
        !self.is_cancelled() && self.shared.strong_count() > 0
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for TickHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickHandle")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

async fn run(shared: Arc<Shared>, every: Duration, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::trace!(ticker = shared.name, "ticker worker running");
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }
        for (target, cancelled) in shared.due() {
            if !cancelled.load(Ordering::Acquire) {
                target.tick();
            }
        }
    }
    tracing::trace!(ticker = shared.name, "ticker worker finished");
}
