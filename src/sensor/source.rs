// Source and subscriber identities
//
// A source is a shared physical resource (one sensor). Every subscriber bound
// to the same SourceKey shares the one powered-on resource, so the ledger
// counts its active time once.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sensor category (platform sensor type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceKind(pub i32);

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which physical variant of a kind is bound
///
/// Platforms expose wake-up and non-wake-up flavours of the same sensor type
/// as distinct hardware, so they are distinct ledger keys.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceVariant {
    #[default]
    Standard,
    WakeUp,
}

/// Ledger key for one shared source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceKey {
    pub kind: SourceKind,
    #[serde(default)]
    pub variant: SourceVariant,
}

impl SourceKey {
    pub const fn new(kind: i32) -> Self {
        Self {
            kind: SourceKind(kind),
            variant: SourceVariant::Standard,
        }
    }

    pub const fn wake_up(kind: i32) -> Self {
        Self {
            kind: SourceKind(kind),
            variant: SourceVariant::WakeUp,
        }
    }

    pub fn is_wake_up(&self) -> bool {
        self.variant == SourceVariant::WakeUp
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant {
            SourceVariant::Standard => write!(f, "{}", self.kind),
            SourceVariant::WakeUp => write!(f, "{}/wake", self.kind),
        }
    }
}

/// Source descriptor handed to `register`: the key plus its current draw
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub key: SourceKey,
    /// Current draw in milliamps while the source is powered
    pub power_ma: f64,
}

impl Source {
    pub const fn new(key: SourceKey, power_ma: f64) -> Self {
        Self { key, power_ma }
    }

    /// Same physical kind and draw, other variant
    pub fn with_variant(self, variant: SourceVariant) -> Self {
        Self {
            key: SourceKey {
                variant,
                ..self.key
            },
            ..self
        }
    }
}

/// Opaque registrant identity; only compared and hashed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Energy in mAh drawn by `power_ma` over `active_ms`
pub fn energy_consumed_mah(power_ma: f64, active_ms: u64) -> f64 {
    power_ma * active_ms as f64 / 3600.0 / 1000.0
}
