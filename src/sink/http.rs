//! InfluxDB HTTP sink.
//!
//! A deliberately small HTTP/1.1 client: every submission becomes one
//! `POST /write?db=<db>&precision=ms` carrying the batch encoded as line
//! protocol. The TCP connection is established lazily on the first write and
//! reused across writes; any transport error or timeout drops it so the next
//! cycle reconnects from a clean state.

use super::{MetricSink, SinkError, SinkFactory};
use crate::sample::{Batch, Sample};
use anyhow::Result;
use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Port assumed when the backend address does not name one.
const DEFAULT_PORT: u16 = 8086;

/// Upper bound on the error-body bytes drained to keep a connection reusable.
const MAX_RESPONSE_BODY: usize = 64 * 1024;

/// Line-protocol writer for a single simulated host.
///
/// Exclusively owned by one worker; no internal locking.
pub struct HttpSinkClient {
    host: String,
    port: u16,
    write_timeout: Duration,
    stream: Option<TcpStream>,
}

impl HttpSinkClient {
    /// Parse `address` and prepare a client bound to it.
    ///
    /// No I/O happens here; a malformed address is the only failure, and it
    /// surfaces before the worker for this host ever starts.
    pub fn open(address: &str, write_timeout: Duration) -> Result<Self> {
        let (host, port) = parse_address(address)?;
        Ok(Self {
            host,
            port,
            write_timeout,
            stream: None,
        })
    }

    fn build_request(&self, batch: &Batch, body: &str) -> Vec<u8> {
        format!(
            "POST /write?db={}&precision={} HTTP/1.1\r\n\
             Host: {}:{}\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             Content-Length: {}\r\n\
             Connection: keep-alive\r\n\
             \r\n\
             {}",
            batch.database,
            batch.precision.as_str(),
            self.host,
            self.port,
            body.len(),
            body
        )
        .into_bytes()
    }

    /// Write one request and read the response status, connecting if needed.
    async fn exchange(&mut self, request: &[u8]) -> Result<u16, SinkError> {
        if self.stream.is_none() {
            debug!("connecting to {}:{}", self.host, self.port);
            let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
            stream.set_nodelay(true)?;
            self.stream = Some(stream);
        }
        let stream = self.stream.as_mut().ok_or_else(|| {
            SinkError::Io(io::Error::new(io::ErrorKind::NotConnected, "no connection"))
        })?;

        stream.write_all(request).await?;
        stream.flush().await?;
        read_response(stream).await
    }
}

#[async_trait]
impl MetricSink for HttpSinkClient {
    async fn submit(&mut self, batch: &Batch) -> Result<()> {
        let body = encode_batch(batch);
        let request = self.build_request(batch, &body);
        let write_timeout = self.write_timeout;

        let outcome = timeout(write_timeout, self.exchange(&request)).await;
        match outcome {
            Ok(Ok(status)) if (200..300).contains(&status) => Ok(()),
            // The response was well-formed and drained, so the connection
            // stays usable for the next cycle.
            Ok(Ok(status)) => Err(SinkError::Rejected(format!("HTTP status {}", status)).into()),
            Ok(Err(e)) => {
                self.stream = None;
                Err(e.into())
            }
            Err(_) => {
                self.stream = None;
                Err(SinkError::WriteTimeout(write_timeout).into())
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await?;
        }
        Ok(())
    }
}

/// Factory used by production runs: one [`HttpSinkClient`] per simulated host.
pub struct HttpSinkFactory;

impl SinkFactory for HttpSinkFactory {
    type Sink = HttpSinkClient;

    fn open(&self, address: &str, write_timeout: Duration) -> Result<HttpSinkClient> {
        HttpSinkClient::open(address, write_timeout)
    }
}

/// Split a backend address into host and port.
///
/// Accepts `http://host:port`, `http://host`, or a bare `host[:port]`; TLS
/// endpoints are out of scope for this tool.
fn parse_address(address: &str) -> Result<(String, u16), SinkError> {
    let invalid = |reason: &str| SinkError::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    if address.starts_with("https://") {
        return Err(invalid("TLS endpoints are not supported"));
    }

    let rest = address.strip_prefix("http://").unwrap_or(address);
    let rest = rest.trim_end_matches('/');
    if rest.is_empty() {
        return Err(invalid("address is empty"));
    }

    match rest.rsplit_once(':') {
        Some((host, port)) => {
            if host.is_empty() {
                return Err(invalid("missing host"));
            }
            let port = port
                .parse()
                .map_err(|_| invalid("port is not a number"))?;
            Ok((host.to_string(), port))
        }
        None => Ok((rest.to_string(), DEFAULT_PORT)),
    }
}

/// Encode a whole batch as newline-separated line protocol.
fn encode_batch(batch: &Batch) -> String {
    let mut body = String::new();
    for sample in &batch.samples {
        body.push_str(&encode_sample(sample));
        body.push('\n');
    }
    body
}

/// Encode one sample as a line-protocol point with a millisecond timestamp.
fn encode_sample(sample: &Sample) -> String {
    format!(
        "{},cpu={},host={},region={} busy={},idle={} {}",
        sample.measurement,
        escape_tag(sample.cpu),
        escape_tag(&sample.host),
        escape_tag(sample.region),
        sample.busy,
        sample.idle,
        sample.timestamp.timestamp_millis()
    )
}

/// Escape the characters line protocol treats as delimiters in tag values.
fn escape_tag(value: &str) -> String {
    value
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

/// Read one HTTP response, returning its status code.
///
/// The body (error detail, if any) is drained by Content-Length so the
/// connection can carry the next request.
async fn read_response(stream: &mut TcpStream) -> Result<u16, SinkError> {
    let mut reader = BufReader::new(stream);

    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(SinkError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before response",
        )));
    }
    let status = parse_status_line(&line)?;

    let mut content_length = 0usize;
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(SinkError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed inside response headers",
            )));
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if let Some(value) = header_value(trimmed, "content-length") {
            content_length = value.parse().unwrap_or(0);
        }
    }

    if content_length > MAX_RESPONSE_BODY {
        return Err(SinkError::Rejected(format!(
            "oversized response body ({} bytes)",
            content_length
        )));
    }
    if content_length > 0 {
        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).await?;
    }

    Ok(status)
}

/// Extract a header value by case-insensitive name, if this line carries it.
fn header_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let (key, value) = line.split_once(':')?;
    if key.trim().eq_ignore_ascii_case(name) {
        Some(value.trim())
    } else {
        None
    }
}

fn parse_status_line(line: &str) -> Result<u16, SinkError> {
    line.split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| SinkError::Rejected(format!("malformed status line {:?}", line.trim_end())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{Precision, MEASUREMENT};
    use chrono::TimeZone;

    #[test]
    fn test_parse_address() {
        assert_eq!(
            parse_address("http://localhost:8086").unwrap(),
            ("localhost".to_string(), 8086)
        );
        assert_eq!(
            parse_address("http://influx.example.com").unwrap(),
            ("influx.example.com".to_string(), DEFAULT_PORT)
        );
        assert_eq!(
            parse_address("10.0.0.7:9999").unwrap(),
            ("10.0.0.7".to_string(), 9999)
        );
        assert_eq!(
            parse_address("http://localhost:8086/").unwrap(),
            ("localhost".to_string(), 8086)
        );

        assert!(parse_address("").is_err());
        assert!(parse_address("http://").is_err());
        assert!(parse_address("https://localhost:8086").is_err());
        assert!(parse_address("http://localhost:notaport").is_err());
        assert!(parse_address("http://:8086").is_err());
    }

    #[test]
    fn test_escape_tag() {
        assert_eq!(escape_tag("plain"), "plain");
        assert_eq!(escape_tag("a b"), "a\\ b");
        assert_eq!(escape_tag("a,b=c"), "a\\,b\\=c");
    }

    #[test]
    fn test_encode_sample() {
        let timestamp = chrono::Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let sample = Sample {
            measurement: MEASUREMENT,
            host: "fakehost-00002".to_string(),
            cpu: "cpu-total",
            region: "eu-west-1",
            idle: 87.5,
            busy: 12.5,
            timestamp,
        };

        assert_eq!(
            encode_sample(&sample),
            "cpu_usage,cpu=cpu-total,host=fakehost-00002,region=eu-west-1 \
             busy=12.5,idle=87.5 1700000000123"
        );
    }

    #[test]
    fn test_encode_batch_one_line_per_sample() {
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        let batch = crate::sample::build_batch(&mut rng, "stress", 3, "fakehost-00000").unwrap();
        assert_eq!(batch.precision, Precision::Milliseconds);

        let body = encode_batch(&batch);
        assert_eq!(body.lines().count(), 3);
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn test_parse_status_line() {
        assert_eq!(parse_status_line("HTTP/1.1 204 No Content\r\n").unwrap(), 204);
        assert_eq!(parse_status_line("HTTP/1.1 400 Bad Request\r\n").unwrap(), 400);
        assert!(parse_status_line("garbage\r\n").is_err());
        assert!(parse_status_line("").is_err());
    }

    #[test]
    fn test_header_value() {
        assert_eq!(
            header_value("Content-Length: 42", "content-length"),
            Some("42")
        );
        assert_eq!(header_value("X-Other: 1", "content-length"), None);
        assert_eq!(header_value("no colon here", "content-length"), None);
    }
}
