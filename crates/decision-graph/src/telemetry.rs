use crate::config::{LogFormat, TelemetryConfig};
use std::fmt;
use std::io::IsTerminal;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(f, "invalid log level/filter '{value}'")
            }
            TelemetryError::Subscriber(err) => write!(f, "unable to install subscriber: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Build the event filter: `RUST_LOG` wins, the configured level is the fallback.
pub fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|source| {
            TelemetryError::EnvFilter {
                value: config.log_level.clone(),
                source,
            }
        }),
    }
}

/// Span lifecycle events worth printing for a format.
///
/// Pretty output closes the `evaluate` span with its busy and idle time so a slow stage shows
/// up next to the report; compact output stays one line per event.
pub fn span_events(format: LogFormat) -> FmtSpan {
    match format {
        LogFormat::Compact => FmtSpan::NONE,
        LogFormat::Pretty => FmtSpan::CLOSE,
    }
}

/// Install a stderr subscriber in the configured format; stdout is reserved for reports.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config)?)
        .with_writer(std::io::stderr)
        .with_span_events(span_events(config.format));

    match config.format {
        LogFormat::Compact => builder.with_target(false).compact().with_ansi(false).try_init(),
        LogFormat::Pretty => builder
            .pretty()
            .with_ansi(std::io::stderr().is_terminal())
            .try_init(),
    }
    .map_err(TelemetryError::Subscriber)
}
