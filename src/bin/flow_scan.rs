//! Options Flow scan CLI
//!
//! Runs one scan cycle over a JSON snapshot and prints the ranked signals as
//! JSON lines on stdout. Logs go to stderr.
//!
//! Usage:
//!   flow_scan --snapshot cycle.json --config flow.json --memory memory.json --top 10

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use options_flow::memory::snapshot::load_or_empty;
use options_flow::prelude::*;

#[derive(Parser)]
#[command(name = "flow_scan")]
#[command(about = "Score one options-flow scan cycle")]
struct Args {
    /// Cycle snapshot (JSON)
    #[arg(long)]
    snapshot: PathBuf,

    /// Engine configuration (JSON); built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Memory store snapshot (JSON); neutral weights when omitted
    #[arg(long)]
    memory: Option<PathBuf>,

    /// Number of signals to print
    #[arg(long, default_value = "20")]
    top: usize,

    /// Include suppressed signals
    #[arg(long, default_value = "false")]
    all: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn setup_logging(level: &str) {
    let level = match level.to_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "WARN" | "WARNING" => Level::WARN,
        "ERROR" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(LevelFilter::from_level(level).into());

    tracing_subscriber::fmt()
        .with_target(true)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_level);

    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let json = fs::read_to_string(&args.snapshot)
        .with_context(|| format!("reading snapshot {}", args.snapshot.display()))?;
    let snapshot: CycleSnapshot = serde_json::from_str(&json)
        .with_context(|| format!("parsing snapshot {}", args.snapshot.display()))?;

    let engine = ScanEngine::new(config.clone()).context("invalid engine configuration")?;

    let report = match &args.memory {
        Some(path) => {
            let store = load_or_empty(path)
                .with_context(|| format!("loading memory {}", path.display()))?;
            let memory = MemoryIndex::new(store, config.memory.clone());
            engine.run_cycle(&snapshot, &memory)
        }
        None => engine.run_cycle(&snapshot, &NeutralMemory),
    }
    .context("scan cycle failed")?;

    tracing::info!(
        "Regime {} | {} scored, {} alerts, {} rejected",
        report.regime.state.label(),
        report.signals.len(),
        report.alerts().count(),
        report.rejections.len()
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let selected: Vec<&ScoredSignal> = if args.all {
        report.top(args.top).iter().collect()
    } else {
        report.alerts().take(args.top).collect()
    };
    for signal in selected {
        writeln!(out, "{}", serde_json::to_string(signal)?)?;
    }

    Ok(())
}
