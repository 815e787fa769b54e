use anyhow::{anyhow, Result};
use colored::*;
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// A custom tracing event formatter for colorizing log output based on level.
///
/// Provides clean, user-facing output where the entire log line is colored
/// according to its severity level, without timestamps or other metadata. The
/// tool logs a line per submission cycle at debug level, so terse output
/// matters when running with many simulated hosts.
pub struct ColorizedFormatter;

impl<S, N> FormatEvent<S, N> for ColorizedFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        // Buffer the formatted fields so the color applies to the whole line.
        let mut buffer = String::new();
        let mut buf_writer = Writer::new(&mut buffer);
        ctx.format_fields(buf_writer.by_ref(), event)?;

        let colored_output = match *event.metadata().level() {
            Level::INFO => buffer.white(),
            Level::WARN => buffer.yellow(),
            Level::ERROR => buffer.red(),
            Level::DEBUG => buffer.blue(),
            Level::TRACE => buffer.purple(),
        };

        writeln!(writer, "{}", colored_output)
    }
}

/// Initialize the global tracing subscriber.
///
/// The `--log-level` flag supplies the default filter; a `RUST_LOG`
/// environment variable, when present, takes precedence so operators can
/// enable per-module directives without touching the command line.
pub fn init(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| anyhow!("invalid log level {:?}: {}", level, e))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(ColorizedFormatter)
        .init();

    Ok(())
}
