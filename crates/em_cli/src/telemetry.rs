//! Subscriber set-up for the `em` binary.
//!
//! Filter precedence: `RUST_LOG`, then `--log-level`, then `EM_LOG_LEVEL`,
//! then `info`. Events go to stderr so stdout stays machine-readable.

use std::fmt;

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

pub const LEVEL_ENV: &str = "EM_LOG_LEVEL";
const DEFAULT_LEVEL: &str = "info";

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
            TelemetryError::Subscriber(err) => write!(f, "telemetry error: {err}"),
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

/// Filter string used when `RUST_LOG` is absent.
fn fallback_level(flag: Option<&str>, env: Option<String>) -> String {
    flag.map(str::to_string)
        .or(env)
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

fn build_filter(rust_log: Option<String>, flag: Option<&str>, env: Option<String>) -> Result<EnvFilter, TelemetryError> {
    let value = match rust_log {
        Some(v) => v,
        None => fallback_level(flag, env),
    };
    EnvFilter::try_new(&value).map_err(|source| TelemetryError::EnvFilter { value, source })
}

pub fn init(log_level: Option<&str>) -> Result<(), TelemetryError> {
    let filter = build_filter(
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
        log_level,
        std::env::var(LEVEL_ENV).ok(),
    )?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}
