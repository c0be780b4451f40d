//! # Structured Logging
//!
//! Installs the global `tracing` subscriber used by the `srv-discover` binary and by
//! embedding applications that don't bring their own.
//!
//! The library itself only emits events; nothing is printed until a subscriber is
//! installed. `RUST_LOG` directives are honoured on top of the configured level.

use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::core::error::{DiscoveryError, DiscoveryResult};
use crate::observability::config::{LogConfig, LogFormat};

/// Parse a textual log level
pub fn parse_level(level: &str) -> DiscoveryResult<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(DiscoveryError::config(format!("Unknown log level '{}'", other))),
    }
}

/// Initialize the global tracing subscriber
///
/// A subscriber that is already installed (by the host application or an earlier
/// call) is left in place.
pub fn init_logging(config: &LogConfig) -> DiscoveryResult<()> {
    let level = parse_level(&config.level)?;

    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    let result = match config.format {
        LogFormat::Json => Registry::default()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init(),
        LogFormat::Text => Registry::default()
            .with(env_filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .try_init(),
    };

    if result.is_err() {
        warn!("Tracing subscriber already initialized, skipping initialization");
        return Ok(());
    }

    info!(level = %level, format = ?config.format, "Structured logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG").unwrap(), Level::DEBUG);
        assert_eq!(parse_level("warn").unwrap(), Level::WARN);
        assert!(parse_level("verbose").is_err());
    }

    #[test]
    fn test_init_logging_twice_is_tolerated() {
        let config = LogConfig::default();
        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_init_logging_rejects_bad_level() {
        let config = LogConfig {
            level: "loud".to_string(),
            ..LogConfig::default()
        };
        assert!(matches!(
            init_logging(&config),
            Err(DiscoveryError::Configuration { .. })
        ));
    }
}
