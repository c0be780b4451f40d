//! # Configuration Module
//!
//! Configuration for one discovery session: what to resolve, how long health-check
//! results stay valid, and how often the background loop refreshes.
//!
//! ## Key Features
//! - YAML/JSON configuration parsing with serde
//! - Human-readable durations (`"5s"`, `"250ms"`) via `humantime-serde`
//! - Environment variable overrides with the `SRV_DISCOVERY_` prefix
//! - Validation with error messages naming the offending field

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::error::{DiscoveryError, DiscoveryResult};
use crate::observability::config::LogConfig;

/// How long a liveness result is reused before the server is probed again
pub const DEFAULT_HEALTH_CHECK_TTL: Duration = Duration::from_secs(5);

/// Connect timeout of the default liveness probe
pub const DEFAULT_HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration of a discovery session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Service name, without the leading underscore (e.g. "jabber")
    pub service: String,

    /// Transport protocol, "tcp" or "udp"
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Domain that publishes the SRV records
    pub domain: String,

    /// Health-check result reuse window
    #[serde(default = "default_health_check_ttl", with = "humantime_serde")]
    pub health_check_ttl: Duration,

    /// Connect timeout used by the default liveness probe
    #[serde(default = "default_health_check_timeout", with = "humantime_serde")]
    pub health_check_timeout: Duration,

    /// Background refresh interval; no background loop when absent
    #[serde(default, with = "humantime_serde")]
    pub refresh_interval: Option<Duration>,

    /// Fixed endpoint used instead of DNS in environments without SRV records
    #[serde(default)]
    pub development: Option<DevelopmentTarget>,

    /// Logging settings for the `srv-discover` binary
    #[serde(default)]
    pub logging: LogConfig,
}

/// Single endpoint served by the static resolver in development mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevelopmentTarget {
    #[serde(default = "default_dev_target")]
    pub target: String,
    #[serde(default = "default_dev_port")]
    pub port: u16,
}

fn default_protocol() -> String {
    "tcp".to_string()
}

fn default_health_check_ttl() -> Duration {
    DEFAULT_HEALTH_CHECK_TTL
}

fn default_health_check_timeout() -> Duration {
    DEFAULT_HEALTH_CHECK_TIMEOUT
}

fn default_dev_target() -> String {
    "localhost".to_string()
}

fn default_dev_port() -> u16 {
    80
}

impl Default for DevelopmentTarget {
    fn default() -> Self {
        Self {
            target: default_dev_target(),
            port: default_dev_port(),
        }
    }
}

impl DiscoveryConfig {
    /// Create a configuration with default timings for the given triple
    pub fn new<S: Into<String>>(service: S, protocol: S, domain: S) -> Self {
        Self {
            service: service.into(),
            protocol: protocol.into(),
            domain: domain.into(),
            health_check_ttl: DEFAULT_HEALTH_CHECK_TTL,
            health_check_timeout: DEFAULT_HEALTH_CHECK_TIMEOUT,
            refresh_interval: None,
            development: None,
            logging: LogConfig::default(),
        }
    }

    /// Load configuration from a YAML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> DiscoveryResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DiscoveryError::config(format!("Failed to read config file: {}", e)))?;

        let mut config: DiscoveryConfig = serde_yaml::from_str(&content)?;

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub async fn load_from_json<P: AsRef<Path>>(path: P) -> DiscoveryResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DiscoveryError::config(format!("Failed to read config file: {}", e)))?;

        let mut config: DiscoveryConfig = serde_json::from_str(&content)?;

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    ///
    /// Variables follow the pattern `SRV_DISCOVERY_<FIELD>`, for example
    /// `SRV_DISCOVERY_HEALTH_CHECK_TTL=10s`.
    pub fn apply_env_overrides(&mut self) -> DiscoveryResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup function
    ///
    /// `apply_env_overrides` delegates here; tests pass a map lookup so they don't
    /// have to mutate the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> DiscoveryResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(service) = lookup("SRV_DISCOVERY_SERVICE") {
            self.service = service;
        }

        if let Some(protocol) = lookup("SRV_DISCOVERY_PROTOCOL") {
            self.protocol = protocol;
        }

        if let Some(domain) = lookup("SRV_DISCOVERY_DOMAIN") {
            self.domain = domain;
        }

        if let Some(ttl) = lookup("SRV_DISCOVERY_HEALTH_CHECK_TTL") {
            self.health_check_ttl = humantime::parse_duration(&ttl).map_err(|e| {
                DiscoveryError::config(format!("Invalid SRV_DISCOVERY_HEALTH_CHECK_TTL: {}", e))
            })?;
        }

        if let Some(timeout) = lookup("SRV_DISCOVERY_HEALTH_CHECK_TIMEOUT") {
            self.health_check_timeout = humantime::parse_duration(&timeout).map_err(|e| {
                DiscoveryError::config(format!("Invalid SRV_DISCOVERY_HEALTH_CHECK_TIMEOUT: {}", e))
            })?;
        }

        if let Some(interval) = lookup("SRV_DISCOVERY_REFRESH_INTERVAL") {
            let interval = humantime::parse_duration(&interval).map_err(|e| {
                DiscoveryError::config(format!("Invalid SRV_DISCOVERY_REFRESH_INTERVAL: {}", e))
            })?;
            self.refresh_interval = Some(interval);
        }

        if let Some(target) = lookup("SRV_DISCOVERY_DEV_TARGET") {
            self.development.get_or_insert_with(DevelopmentTarget::default).target = target;
        }

        if let Some(port) = lookup("SRV_DISCOVERY_DEV_PORT") {
            let port = port.parse::<u16>().map_err(|e| {
                DiscoveryError::config(format!("Invalid SRV_DISCOVERY_DEV_PORT: {}", e))
            })?;
            self.development.get_or_insert_with(DevelopmentTarget::default).port = port;
        }

        if let Some(level) = lookup("SRV_DISCOVERY_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(format) = lookup("SRV_DISCOVERY_LOG_FORMAT") {
            self.logging.format = format.parse().map_err(|e| {
                DiscoveryError::config(format!("Invalid SRV_DISCOVERY_LOG_FORMAT: {}", e))
            })?;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> DiscoveryResult<()> {
        if self.domain.trim().is_empty() {
            return Err(DiscoveryError::config("domain must not be empty"));
        }

        if self.service.is_empty() != self.protocol.is_empty() {
            return Err(DiscoveryError::config(
                "service and protocol must either both be set or both be empty",
            ));
        }

        if self.health_check_timeout.is_zero() {
            return Err(DiscoveryError::config("health_check_timeout must be greater than zero"));
        }

        if let Some(interval) = self.refresh_interval {
            if interval.is_zero() {
                return Err(DiscoveryError::config("refresh_interval must be greater than zero"));
            }
        }

        if let Some(dev) = &self.development {
            if dev.target.trim().is_empty() {
                return Err(DiscoveryError::config("development.target must not be empty"));
            }
        }

        Ok(())
    }
}
