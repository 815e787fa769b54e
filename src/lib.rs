//! # InfluxDB Stress Library
//!
//! A synthetic load generator that stresses an InfluxDB-compatible time-series
//! backend by simulating many independent hosts, each concurrently emitting
//! metric batches at a fixed cadence.
//!
//! ## Architecture Overview
//!
//! The library is organized into several key modules:
//!
//! - `stress`: Worker-pool coordinator that spawns simulated hosts, runs the
//!   global test timer, and coordinates a clean bounded-time shutdown
//! - `worker`: The per-host lifecycle: jittered start, submit/sleep loop,
//!   cancellation-driven drain
//! - `sample`: Synthetic measurement generation and batch construction
//! - `sink`: The metrics-backend capability (trait seam) and its HTTP
//!   line-protocol implementation
//! - `cli`: Command-line interface parsing and configuration management
//! - `logging`: Colorized tracing output driven by the `--log-level` flag
//!
//! ## Concurrency Model
//!
//! Each simulated host runs as an independent Tokio task. The coordinator
//! sleeps on the global run timer, then broadcasts cancellation through a
//! capacity-1 signal slot per worker and blocks on a completion barrier until
//! every created worker has drained. Cancellation is only ever observed
//! between submission cycles, so an in-flight write always completes (or times
//! out) before a worker begins draining.
//!
//! ## Failure Containment
//!
//! Only configuration errors abort the run. A sink that cannot be opened drops
//! that one worker; failed writes and failed closes are logged and the cadence
//! continues. The process runs for the full configured duration and exits
//! cleanly no matter how many individual submissions failed.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use influx_stress::sink::HttpSinkFactory;
//! use influx_stress::stress::{StressConfig, StressRunner};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = StressConfig {
//!         url: "http://localhost:8086".to_string(),
//!         database: "stress".to_string(),
//!         host_prefix: "fakehost".to_string(),
//!         num_hosts: 64,
//!         points_per_batch: 64,
//!         interval: Duration::from_millis(100),
//!         write_timeout: Duration::from_secs(5),
//!         duration: Duration::from_secs(5),
//!         start_jitter: Duration::from_secs(1),
//!     };
//!
//!     StressRunner::new(config, HttpSinkFactory).run().await
//! }
//! ```

/// Command-line interface and configuration
///
/// Provides argument parsing using clap: backend URL, database, hostname
/// prefix, worker count, batch size, and the three fractional-second timings
/// (interval, run duration, write timeout).
pub mod cli;

/// Colorized tracing output
///
/// A custom event formatter that colors each log line by severity, plus the
/// subscriber initialization that maps the `--log-level` flag onto an
/// `EnvFilter` (with `RUST_LOG` taking precedence when set).
pub mod logging;

/// Synthetic measurement generation
///
/// Contains the `Sample` and `Batch` data model and the generator/builder
/// functions. Every sample carries a host identity, a region tag drawn from a
/// fixed catalog, and a complementary `idle`/`busy` field pair that always
/// sums to 100.0.
pub mod sample;

/// Metrics-backend capability
///
/// The `MetricSink` trait is the seam between the load-generation engine and
/// the backend: submit a batch, observe success or failure, close on drain.
/// `HttpSinkClient` implements it with InfluxDB line protocol over a plain
/// TCP stream.
pub mod sink;

/// Worker-pool coordination
///
/// The `StressRunner` creates one worker per simulated host (skipping hosts
/// whose sink cannot be opened), runs the global duration timer, broadcasts
/// cancellation, and waits for exactly one completion signal per created
/// worker before returning.
pub mod stress;

/// Per-host worker lifecycle
///
/// One worker loops forever alternating "build and submit a batch" with
/// "sleep for the interval" until it observes cancellation, at which point it
/// closes its sink and acknowledges termination exactly once.
pub mod worker;

// Re-export key types for convenient library usage

/// Pool coordinator and its run parameters
pub use stress::{StressConfig, StressRunner};

/// Command-line argument structure
pub use cli::Args;

/// The sink capability seam and its HTTP implementation
pub use sink::{HttpSinkClient, HttpSinkFactory, MetricSink, SinkFactory};

/// Synthetic measurement types
pub use sample::{Batch, Sample};

/// The current version of the stress tool
///
/// Automatically populated from Cargo.toml and echoed at startup.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
///
/// Sensible defaults for all configurable parameters, chosen to put real
/// pressure on a local backend without melting it on the first run.
pub mod defaults {
    use std::time::Duration;

    /// Default prefix for generated hostnames
    ///
    /// Hostnames are derived as `{prefix}-{index:05}`, so the default yields
    /// `fakehost-00000` through `fakehost-00063`.
    pub const HOST_PREFIX: &str = "fakehost";

    /// Default number of simulated hosts
    ///
    /// 64 concurrent writers is enough to exercise the backend's ingest path
    /// without requiring a large client machine.
    pub const NUM_HOSTS: usize = 64;

    /// Default number of points per batch
    ///
    /// Batches of 64 points keep individual write requests small while still
    /// amortizing the per-request overhead.
    pub const POINTS_PER_BATCH: usize = 64;

    /// Default interval between batches from each simulated host
    ///
    /// 100 ms per host works out to roughly 640 writes/second at the default
    /// host count.
    pub const INTERVAL: Duration = Duration::from_millis(100);

    /// Default total run duration
    pub const RUN_DURATION: Duration = Duration::from_secs(5);

    /// Default per-write timeout
    ///
    /// Bounds a single submission so a hung backend cannot stall a worker past
    /// the global shutdown.
    pub const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Upper bound on the randomized worker start delay
    ///
    /// Staggering starts across one second avoids a synchronized write burst
    /// when the pool comes up.
    pub const START_JITTER: Duration = Duration::from_secs(1);
}
