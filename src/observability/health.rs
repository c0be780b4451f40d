//! # Liveness Probing
//!
//! Liveness strategies decide whether one SRV target is currently reachable. The
//! discovery session calls them from `choose()` for every server whose cached result
//! has expired.
//!
//! An `Err` from a probe is treated exactly like `Ok(false)`: the server is marked
//! unhealthy and the error never reaches the caller of `choose()`.
//!
//! ## Rust Concepts Used
//! - `async_trait` for async methods in traits
//! - `tokio::time::timeout` to bound each connection attempt

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tracing::debug;

use crate::core::config::DEFAULT_HEALTH_CHECK_TIMEOUT;
use crate::core::error::{DiscoveryError, DiscoveryResult};

/// Liveness strategy trait
#[async_trait]
pub trait LivenessStrategy: Send + Sync {
    /// Probe `target:port` over `protocol`
    async fn check(&self, target: &str, port: u16, protocol: &str) -> DiscoveryResult<bool>;
}

/// Adapter turning a synchronous closure into a liveness strategy
pub struct LivenessFn<F>(pub F);

#[async_trait]
impl<F> LivenessStrategy for LivenessFn<F>
where
    F: Fn(&str, u16, &str) -> DiscoveryResult<bool> + Send + Sync,
{
    async fn check(&self, target: &str, port: u16, protocol: &str) -> DiscoveryResult<bool> {
        (self.0)(target, port, protocol)
    }
}

/// Default probe: a plain connection attempt
///
/// For "tcp" a connection is opened and closed immediately. For "udp" an ephemeral
/// socket is connected to the target, which only proves that the name resolves and a
/// route exists. Any other protocol is rejected with `UnknownNetwork`.
#[derive(Debug, Clone)]
pub struct ConnectLivenessCheck {
    timeout: Duration,
}

impl ConnectLivenessCheck {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn connect_tcp(target: &str, port: u16) -> std::io::Result<()> {
        let stream = TcpStream::connect((target, port)).await?;
        drop(stream);
        Ok(())
    }

    async fn connect_udp(target: &str, port: u16) -> std::io::Result<()> {
        let addr = lookup_host((target, port)).await?.next().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found")
        })?;

        let bind_addr = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(addr).await
    }
}

impl Default for ConnectLivenessCheck {
    fn default() -> Self {
        Self::new(DEFAULT_HEALTH_CHECK_TIMEOUT)
    }
}

#[async_trait]
impl LivenessStrategy for ConnectLivenessCheck {
    async fn check(&self, target: &str, port: u16, protocol: &str) -> DiscoveryResult<bool> {
        let attempt = match protocol {
            "tcp" => tokio::time::timeout(self.timeout, Self::connect_tcp(target, port)).await,
            "udp" => tokio::time::timeout(self.timeout, Self::connect_udp(target, port)).await,
            other => return Err(DiscoveryError::unknown_network(other)),
        };

        match attempt {
            Ok(Ok(())) => {
                debug!(target_host = %target, port, protocol, "Liveness probe succeeded");
                Ok(true)
            }
            Ok(Err(e)) => Err(DiscoveryError::health_check(target, port, e.to_string())),
            Err(_) => Err(DiscoveryError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}
