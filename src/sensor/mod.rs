// Shared-source sensor usage attribution
//
// Many subscribers listen to a handful of physical sensors. A sensor draws
// power once no matter how many listeners it has, so its active time is the
// union of its subscribers' windows, not their sum. Totals across different
// sensors are additive.

mod collector;
mod ledger;
mod metrics;
mod source;

pub use collector::SensorMetricsCollector;
pub use ledger::{Binding, Ledger, SourceState, Unregister};
pub use metrics::{Consumption, SensorMetrics};
pub use source::{energy_consumed_mah, Source, SourceKey, SourceKind, SourceVariant, SubscriberId};
