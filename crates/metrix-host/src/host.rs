//! Get-or-create facade over a metric store.
//!
//! Every accessor comes in three forms: `<kind>(name)` registers under the
//! host's own owner, `<kind>_for::<O>(name)` under type `O`, and
//! `<kind>_with(owner, name)` under an explicit [`Owner`]. Asking for an
//! identity that already holds another kind fails with
//! [`MetrixError::KindMismatch`].
//!
//! Meters and timers start ticking inside the store's creation path, so
//! only the instance that is actually stored ever gets a tick task.

use std::marker::PhantomData;
use std::sync::Arc;

use metrix_core::error::{MetrixError, Result};
use metrix_core::gauge::GaugeReading;
use metrix_core::{Counter, Gauge, Histogram, Meter, SampleType, TimeUnit, Timer};

use crate::identity::{MetricIdentity, Owner};
use crate::metric::{Metric, MetricFilter};
use crate::snapshot::Sample;
use crate::store::{InMemoryMetricStore, MetricStore};

pub struct MetricHost {
    store: Arc<dyn MetricStore>,
}

impl Default for MetricHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricHost {
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryMetricStore::new()))
    }

    pub fn with_store(store: Arc<dyn MetricStore>) -> Self {
        Self { store }
    }

    /// Owner used by the plain accessors.
    pub fn default_owner() -> Owner {
        Owner::of::<MetricHost>()
    }

    pub fn store(&self) -> &Arc<dyn MetricStore> {
        &self.store
    }

    // gauge

    pub fn gauge<T, F>(&self, name: &str, evaluator: F) -> Result<Gauge>
    where
        T: GaugeReading,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.gauge_with(Self::default_owner(), name, evaluator)
    }

    pub fn gauge_for<O, T, F>(&self, name: &str, evaluator: F) -> Result<Gauge>
    where
        O: ?Sized + 'static,
        T: GaugeReading,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.gauge_with(Owner::of::<O>(), name, evaluator)
    }

    pub fn gauge_with<T, F>(&self, owner: Owner, name: &str, evaluator: F) -> Result<Gauge>
    where
        T: GaugeReading,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let id = MetricIdentity::new(owner, name);
        self.store
            .get_or_add(id.clone(), Metric::Gauge(Gauge::new(evaluator)))
            .into_gauge(&id)
    }

    // counter

    pub fn counter(&self, name: &str) -> Result<Arc<Counter>> {
        self.counter_with(Self::default_owner(), name)
    }

    pub fn counter_for<O: ?Sized + 'static>(&self, name: &str) -> Result<Arc<Counter>> {
        self.counter_with(Owner::of::<O>(), name)
    }

    pub fn counter_with(&self, owner: Owner, name: &str) -> Result<Arc<Counter>> {
        let id = MetricIdentity::new(owner, name);
        self.store
            .get_or_add(id.clone(), Metric::Counter(Arc::new(Counter::new())))
            .into_counter(&id)
    }

    // histogram

    pub fn histogram(&self, name: &str, sample_type: SampleType) -> Result<Arc<Histogram>> {
        self.histogram_with(Self::default_owner(), name, sample_type)
    }

    pub fn histogram_for<O: ?Sized + 'static>(
        &self,
        name: &str,
        sample_type: SampleType,
    ) -> Result<Arc<Histogram>> {
        self.histogram_with(Owner::of::<O>(), name, sample_type)
    }

    pub fn histogram_with(
        &self,
        owner: Owner,
        name: &str,
        sample_type: SampleType,
    ) -> Result<Arc<Histogram>> {
        let id = MetricIdentity::new(owner, name);
        self.store
            .get_or_insert_with(id.clone(), &mut || -> Result<Metric> {
                Ok(Metric::Histogram(Arc::new(Histogram::new(sample_type))))
            })?
            .into_histogram(&id)
    }

    // meter

    pub fn meter(&self, name: &str, event_type: &str, rate_unit: TimeUnit) -> Result<Arc<Meter>> {
        self.meter_with(Self::default_owner(), name, event_type, rate_unit)
    }

    pub fn meter_for<O: ?Sized + 'static>(
        &self,
        name: &str,
        event_type: &str,
        rate_unit: TimeUnit,
    ) -> Result<Arc<Meter>> {
        self.meter_with(Owner::of::<O>(), name, event_type, rate_unit)
    }

    pub fn meter_with(
        &self,
        owner: Owner,
        name: &str,
        event_type: &str,
        rate_unit: TimeUnit,
    ) -> Result<Arc<Meter>> {
        let id = MetricIdentity::new(owner, name);
        self.store
            .get_or_insert_with(id.clone(), &mut || -> Result<Metric> {
                Meter::started(event_type, rate_unit).map(Metric::Meter)
            })?
            .into_meter(&id)
    }

    // timer

    pub fn timer(&self, name: &str, duration_unit: TimeUnit, rate_unit: TimeUnit) -> Result<Arc<Timer>> {
        self.timer_with(Self::default_owner(), name, duration_unit, rate_unit)
    }

    pub fn timer_for<O: ?Sized + 'static>(
        &self,
        name: &str,
        duration_unit: TimeUnit,
        rate_unit: TimeUnit,
    ) -> Result<Arc<Timer>> {
        self.timer_with(Owner::of::<O>(), name, duration_unit, rate_unit)
    }

    pub fn timer_with(
        &self,
        owner: Owner,
        name: &str,
        duration_unit: TimeUnit,
        rate_unit: TimeUnit,
    ) -> Result<Arc<Timer>> {
        let id = MetricIdentity::new(owner, name);
        self.store
            .get_or_insert_with(id.clone(), &mut || -> Result<Metric> {
                let timer = Arc::new(Timer::new(duration_unit, rate_unit));
                timer.start()?;
                Ok(Metric::Timer(timer))
            })?
            .into_timer(&id)
    }

    /// Identity-ordered copy of the metrics whose kind passes `filter`.
    pub fn sample(&self, filter: MetricFilter) -> Sample {
        self.store.sample(filter)
    }

    /// Drop every metric and stop their tick tasks.
    pub fn clear(&self) -> bool {
        self.store.clear()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl std::fmt::Debug for MetricHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricHost").field("metrics", &self.len()).finish()
    }
}

/// A host view that registers everything under owner type `O`.
pub struct ScopedHost<O: ?Sized> {
    host: Arc<MetricHost>,
    _owner: PhantomData<fn(&O)>,
}

impl<O: ?Sized + 'static> ScopedHost<O> {
    pub fn new(host: Arc<MetricHost>) -> Self {
        Self {
            host,
            _owner: PhantomData,
        }
    }

    pub fn owner(&self) -> Owner {
        Owner::of::<O>()
    }

    pub fn host(&self) -> &Arc<MetricHost> {
        &self.host
    }

    pub fn gauge<T, F>(&self, name: &str, evaluator: F) -> Result<Gauge>
    where
        T: GaugeReading,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.host.gauge_with(self.owner(), name, evaluator)
    }

    pub fn counter(&self, name: &str) -> Result<Arc<Counter>> {
        self.host.counter_with(self.owner(), name)
    }

    pub fn histogram(&self, name: &str, sample_type: SampleType) -> Result<Arc<Histogram>> {
        self.host.histogram_with(self.owner(), name, sample_type)
    }

    pub fn meter(&self, name: &str, event_type: &str, rate_unit: TimeUnit) -> Result<Arc<Meter>> {
        self.host.meter_with(self.owner(), name, event_type, rate_unit)
    }

    pub fn timer(&self, name: &str, duration_unit: TimeUnit, rate_unit: TimeUnit) -> Result<Arc<Timer>> {
        self.host.timer_with(self.owner(), name, duration_unit, rate_unit)
    }

    pub fn sample(&self, filter: MetricFilter) -> Sample {
        self.host.sample(filter)
    }

    pub fn clear(&self) -> bool {
        self.host.clear()
    }
}

impl<O: ?Sized> Clone for ScopedHost<O> {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
            _owner: PhantomData,
        }
    }
}

/// True when `err` is a kind mismatch.
pub fn is_kind_mismatch(err: &MetrixError) -> bool {
    matches!(err, MetrixError::KindMismatch { .. })
}
