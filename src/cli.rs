use clap::Parser;
use std::time::Duration;

/// InfluxDB Stress - simulate many hosts hammering a time-series backend
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Full URL (with port) of the InfluxDB write endpoint
    #[clap(short = 'u', long)]
    pub url: String,

    /// Name of the database to write to
    #[clap(long)]
    pub db: String,

    /// Prefix for generated hostnames
    #[clap(long, default_value = crate::defaults::HOST_PREFIX)]
    pub host_prefix: String,

    /// Number of hosts to simulate traffic from
    #[clap(short = 'n', long, default_value_t = crate::defaults::NUM_HOSTS)]
    pub num_hosts: usize,

    /// Number of points per batch
    #[clap(short = 'p', long, default_value_t = crate::defaults::POINTS_PER_BATCH)]
    pub points_per_batch: usize,

    /// Seconds between batches from each simulated host (fractions allowed)
    #[clap(short = 'i', long, value_parser = parse_seconds, default_value = "0.1")]
    pub interval: Duration,

    /// Seconds to run the test (fractions allowed)
    #[clap(short = 'd', long, value_parser = parse_seconds, default_value = "5")]
    pub duration: Duration,

    /// Per-write timeout in seconds (fractions allowed)
    #[clap(short = 't', long, value_parser = parse_seconds, default_value = "5")]
    pub write_timeout: Duration,

    /// Log level (options: trace, debug, info, warn, error)
    #[clap(short = 'l', long, default_value = "error")]
    pub log_level: String,
}

/// Parse a positive, possibly fractional, number of seconds (e.g. "0.1", "5")
fn parse_seconds(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("duration cannot be empty".to_string());
    }

    let secs: f64 = s
        .parse()
        .map_err(|_| format!("invalid number of seconds: {}", s))?;

    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("seconds must be a positive number, got {}", s));
    }

    Ok(Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("5").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_seconds("0.1").unwrap(), Duration::from_millis(100));
        assert_eq!(parse_seconds("2.5").unwrap(), Duration::from_millis(2500));
        assert_eq!(parse_seconds(" 1 ").unwrap(), Duration::from_secs(1));

        assert!(parse_seconds("").is_err());
        assert!(parse_seconds("abc").is_err());
        assert!(parse_seconds("0").is_err());
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("inf").is_err());
        assert!(parse_seconds("NaN").is_err());
    }

    #[test]
    fn test_required_flags() {
        // url and db have no defaults, so parsing without them must fail
        assert!(Args::try_parse_from(["influx-stress"]).is_err());
        assert!(Args::try_parse_from(["influx-stress", "-u", "http://localhost:8086"]).is_err());

        let args = Args::try_parse_from([
            "influx-stress",
            "-u",
            "http://localhost:8086",
            "--db",
            "stress",
        ])
        .unwrap();
        assert_eq!(args.host_prefix, crate::defaults::HOST_PREFIX);
        assert_eq!(args.num_hosts, crate::defaults::NUM_HOSTS);
        assert_eq!(args.interval, Duration::from_millis(100));
    }
}
