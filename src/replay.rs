//! Deterministic replay of recorded register/unregister traces
//!
//! A trace is a JSON document of timestamped operations:
//!
//! ```json
//! { "events": [
//!     { "at_ms": 1,  "op": "register",   "subscriber": 1, "kind": 1337 },
//!     { "at_ms": 10, "op": "register",   "subscriber": 1, "kind": 2, "power_ma": 20.0 },
//!     { "at_ms": 15, "op": "unregister", "subscriber": 1, "kind": 2 },
//!     { "at_ms": 20, "op": "snapshot" }
//! ] }
//! ```
//!
//! Events run against a [`SensorMetricsCollector`] driven by a
//! [`ManualClock`]. They are ordered by timestamp; at the same timestamp
//! registers go before unregisters, so handing a source from one
//! subscriber to another never opens a gap in its active time.

use crate::clock::{Clock, ManualClock};
use crate::config::{CollectorConfig, SourceCatalog};
use crate::metrics::SystemMetricsCollector;
use crate::sensor::{
    SensorMetrics, SensorMetricsCollector, Source, SourceKey, SourceKind, SourceVariant,
    SubscriberId,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Failed to read trace {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid trace JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown source kind {kind} ({variant:?}) at {at_ms} ms")]
    UnknownSource {
        at_ms: u64,
        kind: SourceKind,
        variant: SourceVariant,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TraceOp {
    Register {
        subscriber: SubscriberId,
        kind: SourceKind,
        #[serde(default)]
        variant: SourceVariant,
        /// Overrides the catalog's draw for this registration
        #[serde(default, skip_serializing_if = "Option::is_none")]
        power_ma: Option<f64>,
    },
    Unregister {
        subscriber: SubscriberId,
        /// Absent: release every binding of the subscriber
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<SourceKind>,
        #[serde(default)]
        variant: SourceVariant,
    },
    Enable,
    Disable,
    Snapshot,
}

impl TraceOp {
    fn order_rank(&self) -> u8 {
        match self {
            TraceOp::Unregister { .. } => 1,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub at_ms: u64,
    #[serde(flatten)]
    pub op: TraceOp,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub events: Vec<TraceEvent>,
}

impl Trace {
    pub fn from_json(text: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let text = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Events in application order
    pub fn ordered(&self) -> Vec<&TraceEvent> {
        let mut events: Vec<&TraceEvent> = self.events.iter().collect();
        events.sort_by_key(|event| (event.at_ms, event.op.order_rank()));
        events
    }
}

/// One snapshot taken during replay; `metrics` is `None` when the collector
/// was disabled at that point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub at_ms: u64,
    pub metrics: Option<SensorMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Frames for every `snapshot` event, then a final frame at the last
    /// event's timestamp
    pub frames: Vec<ReplayFrame>,
}

impl ReplayReport {
    pub fn final_frame(&self) -> Option<&ReplayFrame> {
        self.frames.last()
    }
}

/// Replays traces against a fresh collector per run
#[derive(Debug, Clone)]
pub struct Replayer {
    catalog: SourceCatalog,
    config: CollectorConfig,
}

impl Replayer {
    pub fn new(catalog: SourceCatalog, config: CollectorConfig) -> Self {
        Self { catalog, config }
    }

    pub fn run(&self, trace: &Trace) -> Result<ReplayReport, ReplayError> {
        let clock = Arc::new(ManualClock::new());
        let collector = SensorMetricsCollector::with_config(&self.config, Arc::clone(&clock));
        let mut frames = Vec::new();

        for event in trace.ordered() {
            clock.set(event.at_ms);
            match &event.op {
                TraceOp::Register {
                    subscriber,
                    kind,
                    variant,
                    power_ma,
                } => {
                    let source = self.resolve(event.at_ms, *kind, *variant, *power_ma)?;
                    collector.register(*subscriber, &source);
                }
                TraceOp::Unregister {
                    subscriber,
                    kind,
                    variant,
                } => {
                    let key = kind.map(|kind| SourceKey {
                        kind,
                        variant: *variant,
                    });
                    collector.unregister(*subscriber, key);
                }
                TraceOp::Enable => collector.enable(),
                TraceOp::Disable => collector.disable(),
                TraceOp::Snapshot => frames.push(Self::frame(&collector, event.at_ms)),
            }
        }

        let end_ms = trace.events.iter().map(|e| e.at_ms).max().unwrap_or(0);
        clock.set(end_ms);
        frames.push(Self::frame(&collector, end_ms));

        tracing::debug!(
            events = trace.events.len(),
            frames = frames.len(),
            end_ms,
            "trace replayed"
        );
        Ok(ReplayReport { frames })
    }

    fn resolve(
        &self,
        at_ms: u64,
        kind: SourceKind,
        variant: SourceVariant,
        power_ma: Option<f64>,
    ) -> Result<Source, ReplayError> {
        if let Some(power_ma) = power_ma {
            return Ok(Source::new(SourceKey { kind, variant }, power_ma));
        }
        self.catalog
            .resolve(kind, variant)
            .ok_or(ReplayError::UnknownSource {
                at_ms,
                kind,
                variant,
            })
    }

    fn frame<C: Clock>(collector: &SensorMetricsCollector<C>, at_ms: u64) -> ReplayFrame {
        let mut metrics = collector.create_metrics();
        let ok = collector.get_snapshot(&mut metrics);
        ReplayFrame {
            at_ms,
            metrics: ok.then_some(metrics),
        }
    }
}
