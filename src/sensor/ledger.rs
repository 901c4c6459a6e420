// Registration ledger and per-source interval union accumulator
//
// Each SourceKey owns one SourceState. Bindings only move the reference
// count; the interval opens on the 0 -> 1 edge and closes on the 1 -> 0 edge,
// so overlapping subscribers of one source are counted once (union), while
// distinct sources add up independently.

use super::metrics::{Consumption, SensorMetrics};
use super::source::{energy_consumed_mah, Source, SourceKey, SubscriberId};
use fnv::FnvHashMap;
use std::collections::BTreeMap;

/// Which bindings an unregister call releases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unregister {
    Specific(SourceKey),
    All,
}

impl From<Option<SourceKey>> for Unregister {
    fn from(source: Option<SourceKey>) -> Self {
        match source {
            Some(key) => Unregister::Specific(key),
            None => Unregister::All,
        }
    }
}

/// A live (subscriber, source) relation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binding {
    pub source: SourceKey,
    pub bound_at_ms: u64,
}

/// Accounting for one source, kept for the life of the ledger
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceState {
    pub ref_count: u32,
    pub interval_start_ms: Option<u64>,
    /// Most recently supplied draw; applied when the open interval closes
    pub power_ma: f64,
    /// Folded in from closed intervals only
    pub accrued: Consumption,
}

impl SourceState {
    /// Add one binding. Returns true when this opened the interval.
    fn acquire(&mut self, now_ms: u64, power_ma: f64) -> bool {
        self.power_ma = power_ma;
        self.ref_count += 1;
        if self.ref_count == 1 {
            self.interval_start_ms = Some(now_ms);
            true
        } else {
            false
        }
    }

    /// Drop one binding. Returns the closed interval's length when this was
    /// the last one.
    fn release(&mut self, key: &SourceKey, now_ms: u64) -> Option<u64> {
        match self.ref_count {
            0 => None,
            1 => {
                self.ref_count = 0;
                let start = self.interval_start_ms.take()?;
                let elapsed = elapsed_ms(key, start, now_ms);
                self.accrued.accumulate(&interval_consumption(key, self.power_ma, elapsed));
                Some(elapsed)
            }
            _ => {
                self.ref_count -= 1;
                None
            }
        }
    }

    /// Accrued totals plus the open interval measured against `now_ms`
    ///
    /// Read-only: the open interval keeps its start.
    pub fn as_of(&self, key: &SourceKey, now_ms: u64) -> Consumption {
        let mut total = self.accrued;
        if let Some(start) = self.interval_start_ms.filter(|_| self.ref_count > 0) {
            let elapsed = elapsed_ms(key, start, now_ms);
            total.accumulate(&interval_consumption(key, self.power_ma, elapsed));
        }
        total
    }

    pub fn is_active(&self) -> bool {
        self.ref_count > 0
    }
}

fn elapsed_ms(key: &SourceKey, start_ms: u64, now_ms: u64) -> u64 {
    if now_ms < start_ms {
        tracing::warn!(
            source = %key,
            start_ms,
            now_ms,
            "clock went backwards during an open interval; counting it as zero"
        );
    }
    now_ms.saturating_sub(start_ms)
}

fn interval_consumption(key: &SourceKey, power_ma: f64, elapsed_ms: u64) -> Consumption {
    let elapsed = i64::try_from(elapsed_ms).unwrap_or(i64::MAX);
    Consumption {
        power_mah: energy_consumed_mah(power_ma, elapsed_ms),
        active_time_ms: elapsed,
        wake_up_time_ms: if key.is_wake_up() { elapsed } else { 0 },
    }
}

fn sanitize_power(source: &Source) -> f64 {
    if source.power_ma.is_finite() && source.power_ma >= 0.0 {
        source.power_ma
    } else {
        tracing::warn!(
            source = %source.key,
            power_ma = source.power_ma,
            "invalid power draw, accruing no energy for this source"
        );
        0.0
    }
}

/// Subscriber bindings plus the per-source state table
///
/// Not synchronized; the collector guards the whole ledger with one lock.
#[derive(Debug, Default)]
pub struct Ledger {
    bindings: FnvHashMap<SubscriberId, Vec<Binding>>,
    sources: BTreeMap<SourceKey, SourceState>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `subscriber` to `source`. Returns false if the pair was already
    /// bound (no change).
    pub fn register(&mut self, subscriber: SubscriberId, source: &Source, now_ms: u64) -> bool {
        let held = self.bindings.entry(subscriber).or_default();
        if held.iter().any(|binding| binding.source == source.key) {
            return false;
        }
        held.push(Binding {
            source: source.key,
            bound_at_ms: now_ms,
        });

        let power_ma = sanitize_power(source);
        let state = self.sources.entry(source.key).or_default();
        if state.acquire(now_ms, power_ma) {
            tracing::debug!(source = %source.key, %subscriber, now_ms, "interval opened");
        }
        true
    }

    /// Release the selected bindings of `subscriber`. Returns how many were
    /// released; unbound pairs are ignored.
    pub fn unregister(&mut self, subscriber: SubscriberId, which: Unregister, now_ms: u64) -> usize {
        let Some(held) = self.bindings.get_mut(&subscriber) else {
            return 0;
        };

        let released: Vec<Binding> = match which {
            Unregister::All => std::mem::take(held),
            Unregister::Specific(key) => match held.iter().position(|b| b.source == key) {
                Some(index) => vec![held.swap_remove(index)],
                None => Vec::new(),
            },
        };
        if held.is_empty() {
            self.bindings.remove(&subscriber);
        }

        for binding in &released {
            let Some(state) = self.sources.get_mut(&binding.source) else {
                continue;
            };
            if let Some(elapsed) = state.release(&binding.source, now_ms) {
                tracing::debug!(
                    source = %binding.source,
                    %subscriber,
                    elapsed_ms = elapsed,
                    "interval closed"
                );
            }
        }

        released.len()
    }

    /// Fold every source, as of `now_ms`, into `snapshot`
    pub fn snapshot_into(&self, snapshot: &mut SensorMetrics, now_ms: u64) {
        snapshot.total = Consumption::ZERO;
        snapshot.sources.clear();

        for (key, state) in &self.sources {
            let consumption = state.as_of(key, now_ms);
            snapshot.total.accumulate(&consumption);
            if snapshot.attribution_enabled {
                snapshot.sources.insert(*key, consumption);
            }
        }
    }

    /// Discard history. Bound sources restart their interval at `now_ms`;
    /// unbound sources are forgotten.
    pub fn reset(&mut self, now_ms: u64) {
        self.sources.retain(|_, state| state.is_active());
        for state in self.sources.values_mut() {
            state.accrued = Consumption::ZERO;
            state.interval_start_ms = Some(now_ms);
        }
        for binding in self.bindings.values_mut().flatten() {
            binding.bound_at_ms = now_ms;
        }
    }

    pub fn source_state(&self, key: &SourceKey) -> Option<&SourceState> {
        self.sources.get(key)
    }

    /// Keys with at least one live binding
    pub fn active_sources(&self) -> Vec<SourceKey> {
        self.sources
            .iter()
            .filter(|(_, state)| state.is_active())
            .map(|(key, _)| *key)
            .collect()
    }

    /// Live bindings of one subscriber, in registration order
    pub fn bindings_of(&self, subscriber: SubscriberId) -> &[Binding] {
        self.bindings
            .get(&subscriber)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
