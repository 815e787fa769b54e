//! Worker-pool coordination.
//!
//! The `StressRunner` owns the whole lifecycle of a run: validate the
//! parameters, create one worker per simulated host, start them all, sleep on
//! the global run timer, broadcast cancellation, and hold the completion
//! barrier until every created worker has drained.
//!
//! ## Signaling
//!
//! Cancellation uses one capacity-1 channel per worker, delivered with
//! `try_send`: the slot guarantees delivery to a listening worker and
//! guarantees the broadcaster never blocks on one that already exited.
//! Completions flow back over a single channel sized to the created-worker
//! count, so a worker's final send can never block either. The barrier counts
//! created workers, not configured ones; a host whose sink failed to open was
//! never started and must not be awaited, or the barrier would never clear.

use crate::cli::Args;
use crate::sink::SinkFactory;
use crate::worker::{Worker, WorkerConfig};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Parameters for one stress run.
///
/// Immutable for the duration of the run and validated before any worker
/// starts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StressConfig {
    /// Backend write endpoint, e.g. `http://localhost:8086`
    pub url: String,
    /// Database every batch is bound to
    pub database: String,
    /// Prefix for derived hostnames
    pub host_prefix: String,
    /// Number of simulated hosts
    pub num_hosts: usize,
    /// Samples per submitted batch
    pub points_per_batch: usize,
    /// Pause between batches from each host
    pub interval: Duration,
    /// Timeout applied to each individual write
    pub write_timeout: Duration,
    /// Total run duration before cancellation is broadcast
    pub duration: Duration,
    /// Upper bound on each worker's randomized start delay
    pub start_jitter: Duration,
}

impl From<&Args> for StressConfig {
    fn from(args: &Args) -> Self {
        Self {
            url: args.url.clone(),
            database: args.db.clone(),
            host_prefix: args.host_prefix.clone(),
            num_hosts: args.num_hosts,
            points_per_batch: args.points_per_batch,
            interval: args.interval,
            write_timeout: args.write_timeout,
            duration: args.duration,
            start_jitter: crate::defaults::START_JITTER,
        }
    }
}

impl StressConfig {
    /// Fail fast on configuration that could never produce a meaningful run.
    ///
    /// This is the only error class that halts the process; everything later
    /// is contained and logged.
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            bail!("backend URL must not be empty");
        }
        if self.database.is_empty() {
            bail!("database name must not be empty");
        }
        if self.num_hosts == 0 {
            bail!("num-hosts must be at least 1");
        }
        if self.points_per_batch == 0 {
            bail!("points-per-batch must be at least 1");
        }
        Ok(())
    }
}

/// Derive the synthetic hostname for a worker index.
///
/// Zero-padded to five digits so hostnames sort in creation order; indices
/// beyond 99999 simply widen.
pub fn worker_hostname(prefix: &str, index: usize) -> String {
    format!("{}-{:05}", prefix, index)
}

/// Coordinates a pool of simulated-host workers for one bounded run.
pub struct StressRunner<F: SinkFactory> {
    config: StressConfig,
    factory: F,
}

impl<F: SinkFactory> StressRunner<F> {
    pub fn new(config: StressConfig, factory: F) -> Self {
        Self { config, factory }
    }

    /// Execute one full run: spawn, wait out the duration, cancel, drain.
    ///
    /// Returns only after at least the configured duration has elapsed and
    /// every created worker has acknowledged termination. An error here is
    /// always a configuration error; backend trouble never propagates.
    pub async fn run(&self) -> Result<()> {
        self.config.validate()?;

        let mut cancels = Vec::with_capacity(self.config.num_hosts);
        let mut handles = Vec::with_capacity(self.config.num_hosts);
        let (done_tx, mut done_rx) = mpsc::channel(self.config.num_hosts);

        for index in 0..self.config.num_hosts {
            let hostname = worker_hostname(&self.config.host_prefix, index);
            let sink = match self.factory.open(&self.config.url, self.config.write_timeout) {
                Ok(sink) => sink,
                Err(e) => {
                    // The pool proceeds with fewer hosts; this worker is
                    // never started and never awaited.
                    error!("error creating worker {:?}: {:#}", hostname, e);
                    continue;
                }
            };

            let (cancel_tx, cancel_rx) = mpsc::channel(1);
            let worker = Worker::new(
                sink,
                WorkerConfig {
                    hostname,
                    database: self.config.database.clone(),
                    points_per_batch: self.config.points_per_batch,
                    interval: self.config.interval,
                    start_jitter: self.config.start_jitter,
                },
                cancel_rx,
                done_tx.clone(),
            );

            cancels.push(cancel_tx);
            handles.push(tokio::spawn(worker.run()));
        }
        drop(done_tx);

        let created = cancels.len();
        if created == 0 {
            warn!("no workers could be created; idling for the configured duration");
        } else {
            info!(
                "started {} of {} workers for {:?}",
                created, self.config.num_hosts, self.config.duration
            );
        }

        sleep(self.config.duration).await;

        debug!("run duration elapsed, cancelling {} workers", created);
        for cancel in &cancels {
            // Capacity-1 slot: always deliverable, and a worker that already
            // exited just leaves the signal unread.
            let _ = cancel.try_send(());
        }

        // Hard barrier: exactly one acknowledgement per created worker.
        for _ in 0..created {
            if done_rx.recv().await.is_none() {
                break;
            }
        }
        for handle in handles {
            let _ = handle.await;
        }

        info!("all workers drained");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> StressConfig {
        StressConfig {
            url: "http://localhost:8086".to_string(),
            database: "stress".to_string(),
            host_prefix: "fakehost".to_string(),
            num_hosts: 4,
            points_per_batch: 8,
            interval: Duration::from_millis(100),
            write_timeout: Duration::from_secs(5),
            duration: Duration::from_millis(500),
            start_jitter: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_worker_hostname() {
        assert_eq!(worker_hostname("fakehost", 0), "fakehost-00000");
        assert_eq!(worker_hostname("fakehost", 63), "fakehost-00063");
        assert_eq!(worker_hostname("node", 99999), "node-99999");
        assert_eq!(worker_hostname("node", 123456), "node-123456");
    }

    #[test]
    fn test_hostnames_are_unique() {
        let names: std::collections::HashSet<_> =
            (0..256).map(|i| worker_hostname("fakehost", i)).collect();
        assert_eq!(names.len(), 256);
    }

    #[test]
    fn test_validate_accepts_sane_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_required_fields() {
        let mut config = valid_config();
        config.url = String::new();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.database = String::new();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.num_hosts = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.points_per_batch = 0;
        assert!(config.validate().is_err());
    }
}
