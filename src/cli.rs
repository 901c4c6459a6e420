//! CLI argument parsing for sensor-ledger

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for replay reports
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "sensor-ledger")]
#[command(version)]
#[command(about = "Replay sensor register/unregister traces and attribute active time and energy", long_about = None)]
pub struct Cli {
    /// JSON trace of register/unregister/snapshot events
    #[arg(value_name = "TRACE")]
    pub trace: PathBuf,

    /// TOML file with collector settings and the source catalog
    #[arg(short = 'c', long = "catalog", value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Include the per-source breakdown in every snapshot
    #[arg(short = 'a', long = "attribution")]
    pub attribution: bool,

    /// Group the breakdown by sensor kind instead of by source (text output)
    #[arg(long = "by-kind", requires = "attribution")]
    pub by_kind: bool,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
