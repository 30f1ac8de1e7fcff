//! # execmon CLI
//!
//! Opens a trace log, loads its first tick into the monitor views and reads
//! view commands from stdin.

mod commands;

use anyhow::Context;
use clap::Parser;
use execmon_core::{MonitorConfig, ViewCoordinator};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "execmon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Trace log directory
    #[arg(default_value = ".")]
    log_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Reports go to stdout, so logs go to stderr
    let subscriber = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = MonitorConfig::for_log_path(&cli.log_path);
    let mut coordinator = ViewCoordinator::open(config)
        .with_context(|| format!("Failed to open trace log at {}", cli.log_path.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    // Only opening the log is fatal; a bad first tick is reported like any
    // failed command
    match coordinator.start() {
        Ok(Some(set)) => writeln!(out, "{}", commands::describe_set(&set, &coordinator))?,
        Ok(None) => writeln!(out, "no recorded ticks in {}", cli.log_path.display())?,
        Err(err) => {
            tracing::warn!(error = %err, "first tick not loaded");
            writeln!(out, "error: Failed to load the first tick: {}", err)?;
        }
    }

    commands::run(&mut coordinator, io::stdin().lock(), &mut out)
}
