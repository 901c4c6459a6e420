#![no_main]

use libfuzzer_sys::fuzz_target;
use sensor_ledger::config::{CollectorConfig, SourceCatalog, SourceSpec};
use sensor_ledger::replay::{Replayer, Trace};

fuzz_target!(|data: &[u8]| {
    // Any trace that parses must replay without panicking
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(trace) = Trace::from_json(input) {
            let catalog = SourceCatalog::new((0..4).map(|kind| SourceSpec {
                kind,
                name: String::new(),
                power_ma: 1.0,
                wake_up_capable: kind % 2 == 0,
            }));
            let config = CollectorConfig {
                attribution: true,
                ..CollectorConfig::default()
            };
            let _ = Replayer::new(catalog, config).run(&trace);
        }
    }
});
