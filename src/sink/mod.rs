//! The metrics-backend capability.
//!
//! The load-generation engine never inspects the wire format or transport; it
//! only reacts to the success or failure of three operations: open a sink,
//! submit a batch, close the sink. `MetricSink` is that seam. Production runs
//! use [`HttpSinkClient`]; tests substitute counting mocks through the
//! [`SinkFactory`] trait.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub mod http;

pub use http::{HttpSinkClient, HttpSinkFactory};

use crate::sample::Batch;

/// Errors surfaced by sink implementations.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The backend address could not be parsed into something connectable
    #[error("invalid backend address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// A single write exceeded the configured per-write timeout
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    /// The backend answered, but with a non-success status
    #[error("backend rejected write: {0}")]
    Rejected(String),

    /// Transport-level failure (connect, send, receive)
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Write-side capability of the metrics backend.
///
/// Each worker exclusively owns one sink instance, so implementations need no
/// internal locking. A failed `submit` must leave the sink usable for the
/// next cycle.
#[async_trait]
pub trait MetricSink: Send {
    /// Transmit one batch to the backend
    async fn submit(&mut self, batch: &Batch) -> Result<()>;

    /// Release the underlying connection; called exactly once during drain
    async fn close(&mut self) -> Result<()>;
}

/// Opens one sink per simulated host.
///
/// Construction is synchronous and cheap (address parsing, no I/O); the
/// connection itself is established lazily on the first submit. A failed
/// `open` drops that one worker from the pool, never the whole run.
pub trait SinkFactory: Send + Sync {
    type Sink: MetricSink + 'static;

    fn open(&self, address: &str, write_timeout: Duration) -> Result<Self::Sink>;
}
