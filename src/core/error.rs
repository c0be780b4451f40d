//! # Error Handling Module
//!
//! This module defines every error the discovery engine can surface, using the
//! `thiserror` crate to derive `Display` and `std::error::Error`.
//!
//! ## Rust Error Handling Concepts
//!
//! - `Result<T, E>` replaces exceptions: `Ok(value)` on success, `Err(error)` on failure
//! - The `?` operator propagates an error to the caller, converting it through `From`
//! - Errors are plain data. `DiscoveryError` is `Clone + PartialEq` so the background
//!   refresh loop can keep a log of them and tests can compare them directly
//!
//! Only resolution failures ever reach a caller of the session. Liveness failures are
//! folded into "unhealthy" inside `choose()`, and "no eligible server" is not an error.

use thiserror::Error;

/// Main result type used throughout the crate
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Error types for SRV discovery
///
/// Variants carry owned strings rather than source errors so the whole enum stays
/// `Clone`, which the asynchronous error log depends on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// Configuration-related errors (invalid config, missing files, bad overrides)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// SRV lookup failed (name not found, transport error, ...)
    #[error("Resolution failed for {name}: {message}")]
    Resolution { name: String, message: String },

    /// The liveness probe was asked to use a protocol it does not speak
    #[error("Unknown network: {protocol}")]
    UnknownNetwork { protocol: String },

    /// The liveness probe could not reach the endpoint
    #[error("Health check failed for {target}:{port}: {message}")]
    HealthCheck {
        target: String,
        port: u16,
        message: String,
    },

    /// An operation exceeded its deadline
    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Internal errors for unexpected failures
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// I/O errors (file operations, sockets, ...)
    #[error("I/O error: {message}")]
    Io { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json { message: String },

    /// YAML parsing errors for configuration files
    #[error("YAML error: {message}")]
    Yaml { message: String },
}

impl DiscoveryError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a resolution error for the queried name
    pub fn resolution<N: Into<String>, S: Into<String>>(name: N, message: S) -> Self {
        Self::Resolution {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an unknown network error
    pub fn unknown_network<S: Into<String>>(protocol: S) -> Self {
        Self::UnknownNetwork {
            protocol: protocol.into(),
        }
    }

    /// Create a health check error for an endpoint
    pub fn health_check<T: Into<String>, S: Into<String>>(target: T, port: u16, message: S) -> Self {
        Self::HealthCheck {
            target: target.into(),
            port,
            message: message.into(),
        }
    }

    /// Create an internal error with a custom message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable label for this error kind, used as a log and metrics field
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration_error",
            Self::Resolution { .. } => "resolution_error",
            Self::UnknownNetwork { .. } => "unknown_network",
            Self::HealthCheck { .. } => "health_check_error",
            Self::Timeout { .. } => "timeout",
            Self::Internal { .. } => "internal_error",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
            Self::Yaml { .. } => "yaml_error",
        }
    }

    /// Check if this error is transient
    ///
    /// The background refresh loop retries everything on the next tick anyway; this
    /// is for embedding applications deciding whether a synchronous `refresh()` is
    /// worth repeating.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Resolution { .. } | Self::Timeout { .. } | Self::HealthCheck { .. } | Self::Io { .. }
        )
    }
}

/// Implement conversion from std::io::Error
impl From<std::io::Error> for DiscoveryError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

/// Implement conversion from serde_json::Error
impl From<serde_json::Error> for DiscoveryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}

/// Implement conversion from serde_yaml::Error
impl From<serde_yaml::Error> for DiscoveryError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml {
            message: err.to_string(),
        }
    }
}
