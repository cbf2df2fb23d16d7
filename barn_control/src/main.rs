//! # Barn Control
//!
//! Runs one reconciliation actor per configured equipment against a field
//! I/O driver until interrupted.
//!
//! Loads `config.toml`, `equipment.toml` and the optional `io.toml` from
//! `--config-dir`, builds the driver, wires interlock rules and the event
//! log, starts every actor under the supervisor, and periodically reports
//! equipment status.

use barn_common::config::{FullConfig, LogLevel, load_config_dir};
use barn_common::consts::DEFAULT_CONFIG_PATH;
use barn_control::Directory;
use barn_control::events::{ChannelEventLog, TracingEventLog};
use barn_control::interlock::RuleInterlocks;
use barn_control::supervisor::Supervisor;
use barn_hal::{SIMULATION_DRIVER, create_driver};
use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Barn Control: equipment reconciliation service
#[derive(Parser, Debug)]
#[command(name = "barn_control")]
#[command(version)]
#[command(about = "Keeps barn equipment in the commanded state over the field bus")]
struct Args {
    /// Config directory (config.toml + equipment.toml + optional io.toml).
    #[arg(long, value_name = "DIR", default_value = DEFAULT_CONFIG_PATH)]
    config_dir: PathBuf,

    /// Field I/O driver.
    #[arg(long, default_value = SIMULATION_DRIVER)]
    driver: String,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // The config carries the default log level, so it is read first.
    let loaded = load_config_dir(&args.config_dir);
    let level = loaded
        .as_ref()
        .map(|full| full.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level);

    let full = match loaded {
        Ok(full) => full,
        Err(e) => {
            error!("FATAL: {e}");
            process::exit(1);
        }
    };
    info!(
        "{} v{} starting ({} equipment)",
        full.shared.service_name,
        env!("CARGO_PKG_VERSION"),
        full.equipment.len()
    );

    if args.check {
        info!("Configuration in {} is valid", args.config_dir.display());
        return;
    }

    if let Err(e) = run(&args, full).await {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Barn Control shutdown complete");
}

async fn run(args: &Args, full: FullConfig) -> Result<(), Box<dyn std::error::Error>> {
    let gateway = Arc::new(create_driver(&args.driver, full.io.as_ref(), &full.equipment)?);
    info!("Driver '{}' ready ({} points)", args.driver, gateway.point_count());

    let (events, event_task) = ChannelEventLog::spawn(Arc::new(TracingEventLog));
    let directory = Directory::new();
    let interlocks = Arc::new(RuleInterlocks::new(&full.interlocks, directory.clone()));
    let supervisor = Supervisor::new(
        gateway,
        interlocks,
        Arc::new(events),
        full.control.clone(),
        directory.clone(),
    );

    let failures = supervisor.start_all(&full.equipment);
    if !failures.is_empty() {
        warn!(
            "{} of {} equipment failed to start",
            failures.len(),
            full.equipment.len()
        );
    }
    info!("{} actors running", directory.len());

    let reporter = full
        .control
        .status_report_interval()
        .map(|period| tokio::spawn(report_status(directory.clone(), period)));

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, shutting down");

    if let Some(reporter) = reporter {
        reporter.abort();
    }
    supervisor.shutdown().await;
    drop(supervisor);
    // The channel closes once the last actor's event sink is dropped.
    if let Err(e) = event_task.await {
        warn!("Event log task ended abnormally: {}", e);
    }
    Ok(())
}

/// Log every equipment status as JSON once per `period`.
async fn report_status(directory: Directory, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        for status in directory.statuses() {
            match serde_json::to_string(&status) {
                Ok(json) => info!(target: "barn::status", equipment = %status.name, "{}", json),
                Err(e) => warn!(equipment = %status.name, "Status not serializable: {}", e),
            }
        }
    }
}

fn setup_tracing(args: &Args, level: LogLevel) {
    let filter = if args.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_directive()))
    };

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
