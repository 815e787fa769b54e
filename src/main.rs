//! # InfluxDB Stress - Main Entry Point
//!
//! Command-line front end for the load-generation engine. The main function:
//!
//! 1. **Parses arguments**: backend URL, database, and the pool/cadence knobs
//! 2. **Initializes logging**: colorized tracing, level from `--log-level`
//!    (or `RUST_LOG` when set)
//! 3. **Validates configuration**: missing or empty required parameters abort
//!    here, before any worker exists
//! 4. **Runs the pool**: spawns the simulated hosts and blocks until the run
//!    duration has elapsed and every worker has drained
//!
//! The process exits non-zero only for configuration errors. Backend
//! failures during the run are logged by the workers and never change the
//! exit status.

use anyhow::{Context, Result};
use clap::Parser;
use influx_stress::{
    cli::Args,
    logging,
    sink::HttpSinkFactory,
    stress::{StressConfig, StressRunner},
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level)?;

    info!("influx-stress v{}", influx_stress::VERSION);

    // Fail fast on bad configuration before any worker is created.
    let config = StressConfig::from(&args);
    config.validate().context("invalid configuration")?;

    info!(
        "stressing {} (db {:?}) with {} hosts, {} points per batch, every {:?} for {:?}",
        config.url,
        config.database,
        config.num_hosts,
        config.points_per_batch,
        config.interval,
        config.duration
    );

    StressRunner::new(config, HttpSinkFactory).run().await
}
