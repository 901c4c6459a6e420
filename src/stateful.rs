//! Baseline-tracking wrapper for collectors
//!
//! Collectors report cumulative readings. Reporters usually want usage since
//! the last report, so [`StatefulCollector`] keeps the previous reading as a
//! baseline and hands out `current - baseline`.
//!
//! # Example
//!
//! ```
//! use sensor_ledger::clock::ManualClock;
//! use sensor_ledger::sensor::{SensorMetricsCollector, Source, SourceKey, SubscriberId};
//! use sensor_ledger::stateful::StatefulCollector;
//! use std::sync::Arc;
//!
//! let clock = Arc::new(ManualClock::new());
//! let collector = SensorMetricsCollector::with_clock(Arc::clone(&clock));
//! collector.register(SubscriberId(1), &Source::new(SourceKey::new(1), 5.0));
//!
//! let mut stateful = StatefulCollector::new(collector);
//! clock.set(40);
//! let diff = stateful.latest_diff_and_reset().unwrap();
//! assert_eq!(diff.total.active_time_ms, 40);
//!
//! clock.set(50);
//! let diff = stateful.latest_diff().unwrap();
//! assert_eq!(diff.total.active_time_ms, 10);
//! ```

use crate::metrics::{SystemMetrics, SystemMetricsCollector};

/// Wraps a collector and reports readings relative to a moving baseline
///
/// Once any underlying snapshot fails the wrapper stays invalid: a missing
/// reading would make every later diff meaningless.
#[derive(Debug)]
pub struct StatefulCollector<C: SystemMetricsCollector> {
    collector: C,
    curr: C::Metrics,
    prev: C::Metrics,
    diff: C::Metrics,
    is_valid: bool,
}

impl<C: SystemMetricsCollector> StatefulCollector<C> {
    /// Wrap `collector`, taking the initial baseline immediately
    pub fn new(collector: C) -> Self {
        let curr = collector.create_metrics();
        let prev = collector.create_metrics();
        let diff = collector.create_metrics();
        let mut stateful = Self::with_metrics(collector, curr, prev, diff);
        stateful.is_valid &= stateful.collector.get_snapshot(&mut stateful.prev);
        stateful
    }

    /// Wrap `collector` with caller-provided metrics objects
    ///
    /// No snapshot is taken: `prev` is used as the baseline as given.
    pub fn with_metrics(collector: C, curr: C::Metrics, prev: C::Metrics, diff: C::Metrics) -> Self {
        Self {
            collector,
            curr,
            prev,
            diff,
            is_valid: true,
        }
    }

    pub fn collector(&self) -> &C {
        &self.collector
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Usage since the baseline; the baseline is unchanged
    pub fn latest_diff(&mut self) -> Option<&C::Metrics> {
        self.is_valid &= self.collector.get_snapshot(&mut self.curr);
        if !self.is_valid {
            return None;
        }

        self.curr.diff_into(&self.prev, &mut self.diff);
        Some(&self.diff)
    }

    /// Usage since the baseline; the current reading becomes the new baseline
    pub fn latest_diff_and_reset(&mut self) -> Option<&C::Metrics> {
        self.latest_diff()?;
        std::mem::swap(&mut self.prev, &mut self.curr);
        Some(&self.diff)
    }
}
