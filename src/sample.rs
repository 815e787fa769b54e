//! Synthetic measurement generation.
//!
//! Every sample models the CPU usage of one simulated host: a `cpu_usage`
//! measurement tagged with the host identity, a fixed `cpu-total` category,
//! and a region drawn uniformly from a small fixed catalog. The two numeric
//! fields are complementary: `idle` is drawn uniformly in `[0, 100)` and
//! `busy` is whatever remains, so the pair always sums to exactly 100.0.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use rand::Rng;

/// Measurement name applied to every generated sample.
pub const MEASUREMENT: &str = "cpu_usage";

/// The complementary `idle`/`busy` fields always sum to this value.
pub const FIELD_MAX: f64 = 100.0;

/// Region labels drawn uniformly at random, one per sample.
pub const REGIONS: [&str; 4] = ["eu-west-1", "eu-west-2", "us-east-1", "us-east-2"];

/// One synthetic, timestamped measurement for a simulated host.
///
/// Immutable once generated; workers build a fresh batch of these for every
/// submission cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub measurement: &'static str,
    pub host: String,
    pub cpu: &'static str,
    pub region: &'static str,
    pub idle: f64,
    pub busy: f64,
    pub timestamp: DateTime<Utc>,
}

/// Timestamp precision attached to every batch.
///
/// The backend is always asked to store millisecond timestamps; finer
/// precision buys nothing for synthetic load and inflates the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Milliseconds,
}

impl Precision {
    /// The query-parameter value understood by the InfluxDB write API
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Milliseconds => "ms",
        }
    }
}

/// An ordered collection of samples bound to a target database.
///
/// Built fresh for every submission and never reused or mutated after being
/// handed to the sink.
#[derive(Debug, Clone)]
pub struct Batch {
    pub database: String,
    pub precision: Precision,
    pub samples: Vec<Sample>,
}

/// Generate one synthetic measurement for the given host identity.
///
/// Pure aside from consuming randomness; each worker passes its own generator
/// so concurrent calls never touch shared state.
pub fn generate_sample<R: Rng>(rng: &mut R, host: &str) -> Sample {
    let region = REGIONS[rng.gen_range(0..REGIONS.len())];
    let idle = rng.gen_range(0.0..FIELD_MAX);

    Sample {
        measurement: MEASUREMENT,
        host: host.to_string(),
        cpu: "cpu-total",
        region,
        idle,
        busy: FIELD_MAX - idle,
        timestamp: Utc::now(),
    }
}

/// Build a batch of `sample_count` fresh samples bound to `database`.
///
/// Construction only fails on an empty database name. The failure channel
/// exists so a worker can log and skip one submission cycle instead of
/// crashing.
pub fn build_batch<R: Rng>(
    rng: &mut R,
    database: &str,
    sample_count: usize,
    host: &str,
) -> Result<Batch> {
    if database.is_empty() {
        bail!("batch requires a database name");
    }

    let mut samples = Vec::with_capacity(sample_count);
    for _ in 0..sample_count {
        samples.push(generate_sample(rng, host));
    }

    Ok(Batch {
        database: database.to_string(),
        precision: Precision::Milliseconds,
        samples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fields_are_complementary() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10_000 {
            let sample = generate_sample(&mut rng, "fakehost-00000");
            assert_eq!(sample.idle + sample.busy, FIELD_MAX);
            assert!(sample.idle >= 0.0 && sample.idle < FIELD_MAX);
        }
    }

    #[test]
    fn test_sample_tags() {
        let mut rng = StdRng::seed_from_u64(7);
        let sample = generate_sample(&mut rng, "fakehost-00003");

        assert_eq!(sample.measurement, MEASUREMENT);
        assert_eq!(sample.host, "fakehost-00003");
        assert_eq!(sample.cpu, "cpu-total");
        assert!(REGIONS.contains(&sample.region));
    }

    #[test]
    fn test_build_batch() {
        let mut rng = StdRng::seed_from_u64(1);
        let batch = build_batch(&mut rng, "stress", 64, "fakehost-00001").unwrap();

        assert_eq!(batch.database, "stress");
        assert_eq!(batch.precision, Precision::Milliseconds);
        assert_eq!(batch.samples.len(), 64);
        assert!(batch.samples.iter().all(|s| s.host == "fakehost-00001"));
    }

    #[test]
    fn test_build_batch_rejects_empty_database() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(build_batch(&mut rng, "", 4, "fakehost-00000").is_err());
    }

    #[test]
    fn test_build_batch_zero_samples() {
        let mut rng = StdRng::seed_from_u64(1);
        let batch = build_batch(&mut rng, "stress", 0, "fakehost-00000").unwrap();
        assert!(batch.samples.is_empty());
    }
}
