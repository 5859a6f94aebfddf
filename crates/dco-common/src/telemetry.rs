//! Logging initialization
//!
//! Installs a global `tracing` subscriber with an `EnvFilter` and either a
//! JSON or a human-readable `fmt` layer. Library code only emits events; the
//! binary hosting the admission and synthesis functions calls [`init_logging`]
//! once at startup.

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variable selecting the log output format
pub const LOG_FORMAT_ENV: &str = "DCO_LOG_FORMAT";

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info,dco=debug";

/// Errors that can occur during logging initialization
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize tracing subscriber
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event
    Json,
    /// Multi-line human-readable output for local development
    Pretty,
}

impl LogFormat {
    /// Parse a format name, falling back to JSON for anything unrecognized
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Self::Pretty,
            _ => Self::Json,
        }
    }
}

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Filter directives used when `RUST_LOG` is unset
    pub default_filter: String,

    /// Output format of emitted events
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_filter: DEFAULT_FILTER.to_string(),
            format: std::env::var(LOG_FORMAT_ENV)
                .map(|name| LogFormat::from_name(&name))
                .unwrap_or(LogFormat::Json),
        }
    }
}

/// Initialize the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `config.default_filter`. Fails if a global
/// subscriber has already been installed.
pub fn init_logging(config: TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))
        .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    let json_layer = (config.format == LogFormat::Json).then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
    });
    let pretty_layer = (config.format == LogFormat::Pretty)
        .then(|| tracing_subscriber::fmt::layer().pretty().with_target(true));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(pretty_layer)
        .try_init()
        .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_unknown_format_names_fall_back_to_json() {
        assert_eq!(LogFormat::from_name("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_name(" TEXT "), LogFormat::Pretty);
        assert_eq!(LogFormat::from_name("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_name("yaml"), LogFormat::Json);
    }

    #[test]
    fn story_second_initialization_is_rejected() {
        let config = TelemetryConfig {
            default_filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::Json,
        };

        let _ = init_logging(config.clone());
        let second = init_logging(config);

        assert!(matches!(second, Err(TelemetryError::SubscriberInit(_))));
    }
}
