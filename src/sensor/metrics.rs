// Sensor usage value objects
//
// SensorMetrics is what a snapshot materializes: a grand total across all
// sources plus, when the caller asks for it, a per-source breakdown.

use super::source::{SourceKey, SourceKind};
use crate::metrics::SystemMetrics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Active time and energy attributed to one source (or to all of them)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Consumption {
    pub power_mah: f64,
    pub active_time_ms: i64,
    pub wake_up_time_ms: i64,
}

impl Consumption {
    pub const ZERO: Consumption = Consumption {
        power_mah: 0.0,
        active_time_ms: 0,
        wake_up_time_ms: 0,
    };

    pub const fn new(power_mah: f64, active_time_ms: i64, wake_up_time_ms: i64) -> Self {
        Self {
            power_mah,
            active_time_ms,
            wake_up_time_ms,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Add in place
    pub(crate) fn accumulate(&mut self, other: &Consumption) {
        self.power_mah += other.power_mah;
        self.active_time_ms = self.active_time_ms.saturating_add(other.active_time_ms);
        self.wake_up_time_ms = self.wake_up_time_ms.saturating_add(other.wake_up_time_ms);
    }
}

impl SystemMetrics for Consumption {
    fn sum_into(&self, other: &Self, output: &mut Self) {
        output.power_mah = self.power_mah + other.power_mah;
        output.active_time_ms = self.active_time_ms.saturating_add(other.active_time_ms);
        output.wake_up_time_ms = self.wake_up_time_ms.saturating_add(other.wake_up_time_ms);
    }

    // Every field subtracts the same way: `(a - b) + b == a`.
    fn diff_into(&self, other: &Self, output: &mut Self) {
        output.power_mah = self.power_mah - other.power_mah;
        output.active_time_ms = self.active_time_ms.saturating_sub(other.active_time_ms);
        output.wake_up_time_ms = self.wake_up_time_ms.saturating_sub(other.wake_up_time_ms);
    }
}

impl fmt::Display for Consumption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.6} mAh, active {} ms, wake-up {} ms",
            self.power_mah, self.active_time_ms, self.wake_up_time_ms
        )
    }
}

/// Snapshot of sensor usage
///
/// `attribution_enabled` is configuration carried by the value itself: when
/// it is off, snapshots and algebra only touch `total` and `sources` stays
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorMetrics {
    pub attribution_enabled: bool,
    pub total: Consumption,
    #[serde(with = "source_entries", default)]
    pub sources: BTreeMap<SourceKey, Consumption>,
}

impl SensorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribution() -> Self {
        Self {
            attribution_enabled: true,
            ..Self::default()
        }
    }

    /// Breakdown for one source, if it has been attributed
    pub fn source(&self, key: &SourceKey) -> Option<&Consumption> {
        self.sources.get(key)
    }

    /// Per-category breakdown: variants of the same kind summed together
    pub fn by_kind(&self) -> BTreeMap<SourceKind, Consumption> {
        let mut kinds: BTreeMap<SourceKind, Consumption> = BTreeMap::new();
        for (key, consumption) in &self.sources {
            kinds.entry(key.kind).or_default().accumulate(consumption);
        }
        kinds
    }

    fn combine(
        a: &BTreeMap<SourceKey, Consumption>,
        b: &BTreeMap<SourceKey, Consumption>,
        subtract: bool,
        output: &mut BTreeMap<SourceKey, Consumption>,
    ) {
        output.clear();

        for (key, left) in a {
            let right = b.get(key).unwrap_or(&Consumption::ZERO);
            let result = if subtract {
                left.diff(right)
            } else {
                left.sum(right)
            };
            if !result.is_zero() {
                output.insert(*key, result);
            }
        }

        for (key, right) in b.iter().filter(|(key, _)| !a.contains_key(*key)) {
            let result = if subtract {
                Consumption::ZERO.diff(right)
            } else {
                *right
            };
            if !result.is_zero() {
                output.insert(*key, result);
            }
        }
    }
}

impl SystemMetrics for SensorMetrics {
    fn sum_into(&self, other: &Self, output: &mut Self) {
        output.total = self.total.sum(&other.total);
        if output.attribution_enabled {
            Self::combine(&self.sources, &other.sources, false, &mut output.sources);
        }
    }

    fn diff_into(&self, other: &Self, output: &mut Self) {
        output.total = self.total.diff(&other.total);
        if output.attribution_enabled {
            Self::combine(&self.sources, &other.sources, true, &mut output.sources);
        }
    }

    fn set(&mut self, other: &Self) {
        self.total = other.total;
        if self.attribution_enabled && other.attribution_enabled {
            self.sources.clone_from(&other.sources);
        }
    }
}

impl fmt::Display for SensorMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "total: {}", self.total)?;
        if self.attribution_enabled {
            for (key, consumption) in &self.sources {
                write!(f, "\n  {}: {}", key, consumption)?;
            }
        }
        Ok(())
    }
}

/// JSON object keys must be strings, so the breakdown is written as a list
/// of `{ key, consumption }` entries.
mod source_entries {
    use super::{Consumption, SourceKey};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    #[derive(Serialize, Deserialize)]
    struct Entry {
        key: SourceKey,
        consumption: Consumption,
    }

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<SourceKey, Consumption>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(map.iter().map(|(key, consumption)| Entry {
            key: *key,
            consumption: *consumption,
        }))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<SourceKey, Consumption>, D::Error> {
        let entries = Vec::<Entry>::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|entry| (entry.key, entry.consumption))
            .collect())
    }
}
