use anyhow::{Context, Result};
use clap::Parser;
use sensor_ledger::cli::{Cli, OutputFormat};
use sensor_ledger::config::{LedgerConfig, SourceCatalog};
use sensor_ledger::replay::{ReplayFrame, ReplayReport, Replayer, Trace};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn print_frame(frame: &ReplayFrame, catalog: &SourceCatalog, by_kind: bool) {
    let Some(metrics) = &frame.metrics else {
        println!("[{} ms] collector disabled, no snapshot", frame.at_ms);
        return;
    };

    if by_kind {
        println!("[{} ms] total: {}", frame.at_ms, metrics.total);
        for (kind, consumption) in metrics.by_kind() {
            println!("  {}: {}", catalog.name(kind), consumption);
        }
    } else {
        println!("[{} ms] {}", frame.at_ms, metrics);
    }
}

fn print_text(report: &ReplayReport, catalog: &SourceCatalog, by_kind: bool) {
    println!("=== Sensor Ledger Replay ===");
    for frame in &report.frames {
        print_frame(frame, catalog, by_kind);
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let config = match &args.catalog {
        Some(path) => LedgerConfig::load(path)
            .with_context(|| format!("loading catalog {}", path.display()))?,
        None => LedgerConfig::default(),
    };
    let mut collector_config = config.collector.clone();
    collector_config.attribution |= args.attribution;

    let catalog = config.catalog();
    let trace = Trace::load(&args.trace)
        .with_context(|| format!("loading trace {}", args.trace.display()))?;
    tracing::info!(
        events = trace.events.len(),
        sources = catalog.len(),
        "replaying trace"
    );

    let report = Replayer::new(catalog.clone(), collector_config)
        .run(&trace)
        .context("replaying trace")?;

    match args.format {
        OutputFormat::Text => print_text(&report, &catalog, args.by_kind),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}
