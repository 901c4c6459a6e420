// Thread-safe collector facade over the registration ledger
//
// One Mutex guards the ledger and the enabled flag together, so a snapshot
// never sees a reference-count change without its interval boundary.

use super::ledger::{Ledger, Unregister};
use super::metrics::SensorMetrics;
use super::source::{Source, SourceKey, SourceVariant, SubscriberId};
use crate::clock::{Clock, MonotonicClock};
use crate::config::CollectorConfig;
use crate::metrics::SystemMetricsCollector;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct CollectorState {
    enabled: bool,
    ledger: Ledger,
}

/// Attributes sensor active time and energy across subscribers
///
/// Subscribers sharing a source are counted once per overlapping window;
/// different sources add up. Register and unregister keep the ledger
/// consistent whether or not the collector is enabled; only snapshots are
/// refused while disabled.
///
/// # Example
///
/// ```
/// use sensor_ledger::clock::ManualClock;
/// use sensor_ledger::metrics::SystemMetricsCollector;
/// use sensor_ledger::sensor::{SensorMetrics, SensorMetricsCollector, Source, SourceKey, SubscriberId};
/// use std::sync::Arc;
///
/// let clock = Arc::new(ManualClock::with_value(1));
/// let collector = SensorMetricsCollector::with_clock(Arc::clone(&clock));
/// let accel = Source::new(SourceKey::new(1), 10.0);
///
/// collector.register(SubscriberId(1), &accel);
/// clock.set(10);
/// collector.register(SubscriberId(2), &accel);
/// clock.set(20);
///
/// let mut snapshot = SensorMetrics::new();
/// assert!(collector.get_snapshot(&mut snapshot));
/// assert_eq!(snapshot.total.active_time_ms, 19);
/// ```
#[derive(Debug)]
pub struct SensorMetricsCollector<C: Clock = MonotonicClock> {
    clock: C,
    attribution_by_default: bool,
    state: Mutex<CollectorState>,
}

impl SensorMetricsCollector<MonotonicClock> {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }
}

impl Default for SensorMetricsCollector<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> SensorMetricsCollector<C> {
    pub fn with_clock(clock: C) -> Self {
        Self::with_config(&CollectorConfig::default(), clock)
    }

    pub fn with_config(config: &CollectorConfig, clock: C) -> Self {
        Self {
            clock,
            attribution_by_default: config.attribution,
            state: Mutex::new(CollectorState {
                enabled: config.start_enabled,
                ledger: Ledger::new(),
            }),
        }
    }

    // A panic elsewhere while holding the lock can't leave the ledger
    // half-updated: every mutation completes before the guard drops.
    fn lock(&self) -> MutexGuard<'_, CollectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind `subscriber` to `source`; a repeated pair is ignored
    pub fn register(&self, subscriber: SubscriberId, source: &Source) -> bool {
        let mut state = self.lock();
        let now_ms = self.clock.now_ms();
        state.ledger.register(subscriber, source, now_ms)
    }

    /// Bind `subscriber` to the given variant of `source`
    pub fn register_variant(
        &self,
        subscriber: SubscriberId,
        source: &Source,
        variant: SourceVariant,
    ) -> bool {
        self.register(subscriber, &source.with_variant(variant))
    }

    /// Release one binding, or every binding of `subscriber` when `source`
    /// is `None`. Returns how many bindings were released.
    pub fn unregister(&self, subscriber: SubscriberId, source: Option<SourceKey>) -> usize {
        self.release(subscriber, Unregister::from(source))
    }

    pub fn unregister_all(&self, subscriber: SubscriberId) -> usize {
        self.release(subscriber, Unregister::All)
    }

    pub fn release(&self, subscriber: SubscriberId, which: Unregister) -> usize {
        let mut state = self.lock();
        let now_ms = self.clock.now_ms();
        state.ledger.unregister(subscriber, which, now_ms)
    }

    pub fn enable(&self) {
        self.lock().enabled = true;
        tracing::info!("sensor collector enabled");
    }

    /// Refuse snapshots until re-enabled; accrued state is kept
    pub fn disable(&self) {
        self.lock().enabled = false;
        tracing::info!("sensor collector disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    /// Forget accrued history; live bindings keep running from now
    pub fn reset(&self) {
        let mut state = self.lock();
        let now_ms = self.clock.now_ms();
        state.ledger.reset(now_ms);
        tracing::info!(now_ms, "sensor collector reset");
    }

    pub fn active_sources(&self) -> Vec<SourceKey> {
        self.lock().ledger.active_sources()
    }

    /// Number of live bindings held by `subscriber`
    pub fn binding_count(&self, subscriber: SubscriberId) -> usize {
        self.lock().ledger.bindings_of(subscriber).len()
    }
}

impl<C: Clock> SystemMetricsCollector for SensorMetricsCollector<C> {
    type Metrics = SensorMetrics;

    fn get_snapshot(&self, snapshot: &mut SensorMetrics) -> bool {
        let state = self.lock();
        if !state.enabled {
            return false;
        }
        let now_ms = self.clock.now_ms();
        state.ledger.snapshot_into(snapshot, now_ms);
        true
    }

    fn create_metrics(&self) -> SensorMetrics {
        SensorMetrics {
            attribution_enabled: self.attribution_by_default,
            ..SensorMetrics::default()
        }
    }
}
