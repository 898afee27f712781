//! Run a [`Reporter`] on a fixed interval until cancelled.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use metrix_core::error::{MetrixError, Result};

use crate::config::ReporterOptions;

/// One reporting pass over the registry.
#[async_trait]
pub trait Reporter: Send + Sync {
    fn name(&self) -> &'static str;
    async fn report(&self) -> Result<()>;
}

pub struct PeriodicReporter {
    name: &'static str,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicReporter {
    /// Spawn the loop on the current tokio runtime. The first report runs one
    /// interval after the call.
    pub fn spawn(reporter: Arc<dyn Reporter>, options: &ReporterOptions) -> Result<Self> {
        let rt = Handle::try_current()
            .map_err(|e| MetrixError::Internal(format!("reporter needs a tokio runtime: {e}")))?;
        let name = reporter.name();
        let cancel = CancellationToken::new();
        let handle = rt.spawn(run(
            reporter,
            options.interval(),
            options.stop_on_error,
            cancel.clone(),
        ));
        tracing::info!(reporter = name, interval_ms = options.interval_ms, "reporter started");
        Ok(Self {
            name,
            cancel,
            handle: Some(handle),
        })
    }

    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            self.cancel.cancel();
            tracing::info!(reporter = self.name, "reporter stopped");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop and wait for the loop to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for PeriodicReporter {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    reporter: Arc<dyn Reporter>,
    every: std::time::Duration,
    stop_on_error: bool,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        if cancel.is_cancelled() {
            break;
        }
        if let Err(e) = reporter.report().await {
            tracing::warn!(reporter = reporter.name(), code = e.code(), error = %e, "report failed");
            if stop_on_error {
                tracing::warn!(reporter = reporter.name(), "stopping after failed report");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    struct Flaky {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Reporter for Flaky {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn report(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(MetrixError::Internal("sink unavailable".into()))
            } else {
                Ok(())
            }
        }
    }

    fn opts(stop_on_error: bool) -> ReporterOptions {
        ReporterOptions {
            interval_ms: 1_000,
            stop_on_error,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reports_each_interval_until_stopped() {
        let r = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let p = PeriodicReporter::spawn(r.clone(), &opts(false)).unwrap();
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(r.calls.load(Ordering::SeqCst), 3);
        p.shutdown().await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(r.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_going_after_errors_by_default() {
        let r = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let p = PeriodicReporter::spawn(r.clone(), &opts(false)).unwrap();
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(r.calls.load(Ordering::SeqCst), 3);
        assert!(!p.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_on_error_ends_loop() {
        let r = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let p = PeriodicReporter::spawn(r.clone(), &opts(true)).unwrap();
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(r.calls.load(Ordering::SeqCst), 1);
        assert!(p.is_finished());
    }

    #[test]
    fn spawn_without_runtime_fails() {
        let r = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        assert!(PeriodicReporter::spawn(r, &opts(false)).is_err());
    }
}
