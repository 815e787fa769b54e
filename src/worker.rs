//! Per-host worker lifecycle.
//!
//! A worker is one simulated host. After a randomized start delay it loops
//! forever: check for cancellation, build and submit one batch, sleep for the
//! configured interval. Backend failures are logged and the cadence continues;
//! the only way a worker stops is the coordinator's cancellation signal. On
//! cancellation it drains: the sink is closed and exactly one completion
//! signal is sent back to the coordinator.

use crate::sample::build_batch;
use crate::sink::MetricSink;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::sleep;
use tracing::{debug, error};

/// Identity and cadence parameters for one worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Synthetic hostname, unique within the pool
    pub hostname: String,
    /// Target database for every batch this worker submits
    pub database: String,
    /// Samples per batch
    pub points_per_batch: usize,
    /// Pause between submission cycles
    pub interval: Duration,
    /// Upper bound on the randomized start delay
    pub start_jitter: Duration,
}

/// One simulated host emitting metric batches at a fixed cadence.
///
/// The worker exclusively owns its sink and its random generator; nothing
/// here is shared across workers.
pub struct Worker<S: MetricSink> {
    sink: S,
    config: WorkerConfig,
    cancel: mpsc::Receiver<()>,
    done: mpsc::Sender<()>,
    rng: StdRng,
}

impl<S: MetricSink> Worker<S> {
    pub fn new(
        sink: S,
        config: WorkerConfig,
        cancel: mpsc::Receiver<()>,
        done: mpsc::Sender<()>,
    ) -> Self {
        Self {
            sink,
            config,
            cancel,
            done,
            rng: StdRng::from_entropy(),
        }
    }

    /// Run the worker until cancellation, then drain.
    ///
    /// Cancellation is only checked between iterations, never mid-submission,
    /// so an in-flight write always completes (or hits the sink's own write
    /// timeout) before the drain begins. The completion signal is sent
    /// unconditionally, exactly once, no matter what failed along the way.
    pub async fn run(mut self) {
        // Stagger the start so the pool does not open with a synchronized
        // write burst.
        if !self.config.start_jitter.is_zero() {
            let max = self.config.start_jitter.as_secs_f64();
            let jitter = Duration::from_secs_f64(self.rng.gen_range(0.0..max));
            debug!(
                "worker {:?} starting after {:?} of jitter",
                self.config.hostname, jitter
            );
            sleep(jitter).await;
        }

        loop {
            match self.cancel.try_recv() {
                // A dropped coordinator counts as cancellation too; without it
                // a worker could outlive a failed run forever.
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            debug!(
                "worker {:?} writing {} points",
                self.config.hostname, self.config.points_per_batch
            );
            if let Err(e) = self.submit_batch().await {
                error!("worker {:?} error: {:#}", self.config.hostname, e);
            }

            debug!(
                "worker {:?} sleeping for {:?}",
                self.config.hostname, self.config.interval
            );
            sleep(self.config.interval).await;
        }

        debug!(
            "worker {:?} got quit signal, draining",
            self.config.hostname
        );
        if let Err(e) = self.sink.close().await {
            error!("worker {:?} close error: {:#}", self.config.hostname, e);
        }
        // The coordinator counts these; failure here only means it stopped
        // listening, which already implies the barrier is gone.
        let _ = self.done.send(()).await;
    }

    async fn submit_batch(&mut self) -> Result<()> {
        let batch = build_batch(
            &mut self.rng,
            &self.config.database,
            self.config.points_per_batch,
            &self.config.hostname,
        )?;
        self.sink.submit(&batch).await
    }
}
