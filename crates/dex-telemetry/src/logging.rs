//! Structured logging initialization.

use std::str::FromStr;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{TelemetryError, TelemetryResult};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,dex=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    /// `Json` when `RUST_ENV=production`.
    pub fn from_env() -> Self {
        let is_production = std::env::var("RUST_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);
        if is_production {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(TelemetryError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    /// Explicit filter directive; takes precedence over `RUST_LOG`.
    pub filter: Option<String>,
    /// Output format; derived from `RUST_ENV` when unset.
    pub format: Option<LogFormat>,
}

impl LoggingOptions {
    fn env_filter(&self) -> TelemetryResult<EnvFilter> {
        match &self.filter {
            Some(filter) => parse_filter(filter),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
        }
    }
}

fn parse_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })
}

/// Install the global subscriber. Unset options fall back to `RUST_LOG`
/// and `RUST_ENV`.
///
/// # Errors
/// Fails on an invalid filter or if a global subscriber is already set.
pub fn init_logging(options: LoggingOptions) -> TelemetryResult<()> {
    let env_filter = options.env_filter()?;
    let format = options.format.unwrap_or_else(LogFormat::from_env);
    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_target(true))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(false))
            .try_init(),
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}
