//! Collector configuration and source catalog
//!
//! Loaded from TOML:
//!
//! ```toml
//! [collector]
//! start_enabled = true
//! attribution = true
//!
//! [[sources]]
//! kind = 1
//! name = "accelerometer"
//! power_ma = 0.25
//! wake_up_capable = true
//! ```
//!
//! The catalog plays the platform's role of describing each sensor: given a
//! kind and a variant it supplies the [`Source`] (key plus draw) that
//! registration needs.

use crate::sensor::{Source, SourceKey, SourceKind, SourceVariant};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Source kind {kind} has invalid power draw {power_ma} mA")]
    InvalidPower { kind: i32, power_ma: f64 },

    #[error("Source kind {0} is declared more than once")]
    DuplicateKind(i32),
}

/// Collector behaviour switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Whether snapshots succeed before the first `enable()`
    ///
    /// Default: true
    pub start_enabled: bool,

    /// Attribution flag on metrics objects from `create_metrics()`
    ///
    /// The collector always keeps per-source totals; this only decides
    /// whether snapshots materialize the breakdown by default.
    ///
    /// Default: false
    pub attribution: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            start_enabled: true,
            attribution: false,
        }
    }
}

/// Static description of one sensor kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub kind: i32,
    #[serde(default)]
    pub name: String,
    pub power_ma: f64,
    #[serde(default)]
    pub wake_up_capable: bool,
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub collector: CollectorConfig,
    pub sources: Vec<SourceSpec>,
}

impl LedgerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: LedgerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::BTreeSet::new();
        for spec in &self.sources {
            if !spec.power_ma.is_finite() || spec.power_ma < 0.0 {
                return Err(ConfigError::InvalidPower {
                    kind: spec.kind,
                    power_ma: spec.power_ma,
                });
            }
            if !seen.insert(spec.kind) {
                return Err(ConfigError::DuplicateKind(spec.kind));
            }
        }
        Ok(())
    }

    pub fn catalog(&self) -> SourceCatalog {
        SourceCatalog::new(self.sources.iter().cloned())
    }
}

/// Lookup from sensor kind to its descriptor
#[derive(Debug, Clone, Default)]
pub struct SourceCatalog {
    specs: BTreeMap<SourceKind, SourceSpec>,
}

impl SourceCatalog {
    pub fn new(specs: impl IntoIterator<Item = SourceSpec>) -> Self {
        Self {
            specs: specs
                .into_iter()
                .map(|spec| (SourceKind(spec.kind), spec))
                .collect(),
        }
    }

    pub fn spec(&self, kind: SourceKind) -> Option<&SourceSpec> {
        self.specs.get(&kind)
    }

    /// Descriptor for `kind` in the requested variant
    ///
    /// Kinds that are not wake-up capable only exist as the standard
    /// variant, so asking for their wake-up variant yields `None`.
    pub fn resolve(&self, kind: SourceKind, variant: SourceVariant) -> Option<Source> {
        let spec = self.spec(kind)?;
        if variant == SourceVariant::WakeUp && !spec.wake_up_capable {
            return None;
        }
        Some(Source::new(SourceKey { kind, variant }, spec.power_ma))
    }

    /// Display name for `kind`, falling back to the number
    pub fn name(&self, kind: SourceKind) -> String {
        match self.spec(kind) {
            Some(spec) if !spec.name.is_empty() => spec.name.clone(),
            _ => kind.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [collector]
        attribution = true

        [[sources]]
        kind = 1
        name = "accelerometer"
        power_ma = 0.25
        wake_up_capable = true

        [[sources]]
        kind = 5
        power_ma = 3.0
    "#;

    #[test]
    fn test_default_config() {
        let config = CollectorConfig::default();
        assert!(config.start_enabled);
        assert!(!config.attribution);
    }

    #[test]
    fn test_parse_sample() {
        let config = LedgerConfig::from_toml_str(SAMPLE).unwrap();
        assert!(config.collector.start_enabled);
        assert!(config.collector.attribution);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[1].name, "");
        assert!(!config.sources[1].wake_up_capable);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = LedgerConfig::from_toml_str("").unwrap();
        assert_eq!(config, LedgerConfig::default());
    }

    #[test]
    fn test_rejects_negative_power() {
        let err = LedgerConfig::from_toml_str("[[sources]]\nkind = 2\npower_ma = -1.0\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPower { kind: 2, .. }));
    }

    #[test]
    fn test_rejects_duplicate_kind() {
        let text = "[[sources]]\nkind = 2\npower_ma = 1.0\n[[sources]]\nkind = 2\npower_ma = 2.0\n";
        let err = LedgerConfig::from_toml_str(text).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateKind(2)));
    }

    #[test]
    fn test_rejects_bad_toml() {
        let err = LedgerConfig::from_toml_str("[collector\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_catalog_resolves_variants() {
        let catalog = LedgerConfig::from_toml_str(SAMPLE).unwrap().catalog();

        let accel = catalog
            .resolve(SourceKind(1), SourceVariant::WakeUp)
            .unwrap();
        assert_eq!(accel.key, SourceKey::wake_up(1));
        assert_eq!(accel.power_ma, 0.25);

        assert!(catalog.resolve(SourceKind(5), SourceVariant::WakeUp).is_none());
        assert!(catalog.resolve(SourceKind(9), SourceVariant::Standard).is_none());
        assert_eq!(catalog.name(SourceKind(1)), "accelerometer");
        assert_eq!(catalog.name(SourceKind(5)), "5");
        assert_eq!(catalog.len(), 2);
        assert!(catalog.spec(SourceKind(1)).is_some_and(|spec| spec.wake_up_capable));
    }

    #[test]
    fn test_load_missing_file() {
        let err = LedgerConfig::load(Path::new("/nonexistent/sensor-ledger.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
