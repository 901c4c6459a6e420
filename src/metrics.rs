//! Snapshot algebra shared by metric value objects
//!
//! A metrics value is a point-in-time reading. Two readings can be added
//! (combining independent collectors) or subtracted (usage over a window
//! between two snapshots). Collectors write readings into caller-owned
//! values so a long-running reporter can reuse its allocations.

use std::fmt::Debug;

/// Value object supporting sum / diff / set
///
/// `sum_into` and `diff_into` never modify `self` or `other`; the result is
/// written to `output`, which may carry configuration of its own (for example
/// whether a per-source breakdown is wanted).
pub trait SystemMetrics: Clone + Default + PartialEq + Debug {
    /// `output = self + other`
    fn sum_into(&self, other: &Self, output: &mut Self);

    /// `output = self - other`
    fn diff_into(&self, other: &Self, output: &mut Self);

    /// Deep copy of `other` into `self`
    fn set(&mut self, other: &Self) {
        self.clone_from(other);
    }

    /// Allocating wrapper over [`SystemMetrics::sum_into`]
    fn sum(&self, other: &Self) -> Self {
        let mut output = self.clone();
        self.sum_into(other, &mut output);
        output
    }

    /// Allocating wrapper over [`SystemMetrics::diff_into`]
    fn diff(&self, other: &Self) -> Self {
        let mut output = self.clone();
        self.diff_into(other, &mut output);
        output
    }
}

/// Anything that can materialize a [`SystemMetrics`] reading on demand
pub trait SystemMetricsCollector {
    type Metrics: SystemMetrics;

    /// Write the current reading into `snapshot`
    ///
    /// Returns `false` (leaving `snapshot` untouched) when no valid reading
    /// is available, e.g. because the collector is disabled.
    fn get_snapshot(&self, snapshot: &mut Self::Metrics) -> bool;

    /// Empty value suitable for passing to [`SystemMetricsCollector::get_snapshot`]
    fn create_metrics(&self) -> Self::Metrics;
}
