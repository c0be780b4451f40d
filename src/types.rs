//! # Core Types Module
//!
//! Data structures shared by the discovery session and the selection strategies.
//!
//! ## Rust Ownership Concepts in This Module
//!
//! - `Clone` lets the session hand out copies of the server set (`servers()`) while
//!   it keeps ownership of the live one
//! - `PartialEq` gives value equality, used to check that a server slot still holds
//!   the same server after the lock was released and reacquired
//! - `Option<Instant>` models "never probed" without a sentinel timestamp

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Immutable facts about one DNS SRV record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SrvCandidate {
    /// Target host name, as published in the record
    pub target: String,

    /// Port the service listens on
    pub port: u16,

    /// Priority of the record; lower values are tried first
    #[serde(default)]
    pub priority: u16,

    /// Relative share within a priority tier
    #[serde(default)]
    pub weight: u16,
}

impl SrvCandidate {
    /// Create a new candidate
    pub fn new<S: Into<String>>(target: S, port: u16, priority: u16, weight: u16) -> Self {
        Self {
            target: target.into(),
            port,
            priority,
            weight,
        }
    }
}

impl fmt::Display for SrvCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} (priority {}, weight {})",
            self.target, self.port, self.priority, self.weight
        )
    }
}

/// One SRV candidate plus the state a discovery session keeps about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedServer {
    /// The record this server was built from
    pub candidate: SrvCandidate,

    /// Result of the most recent liveness probe
    pub last_health_check_result: bool,

    /// When the most recent liveness probe finished (`None` until the first one)
    pub last_health_check_at: Option<Instant>,

    /// Number of times this server was chosen since the refresh that created it
    pub used_count: u64,
}

impl TrackedServer {
    /// Start tracking a freshly resolved candidate with no health or usage history
    pub fn new(candidate: SrvCandidate) -> Self {
        Self {
            candidate,
            last_health_check_result: false,
            last_health_check_at: None,
            used_count: 0,
        }
    }

    pub fn target(&self) -> &str {
        &self.candidate.target
    }

    pub fn port(&self) -> u16 {
        self.candidate.port
    }

    pub fn priority(&self) -> u16 {
        self.candidate.priority
    }

    pub fn weight(&self) -> u16 {
        self.candidate.weight
    }

    /// Whether the last liveness probe succeeded
    pub fn is_healthy(&self) -> bool {
        self.last_health_check_result
    }

    /// Whether the cached health result is missing or older than `ttl` at `now`
    pub fn needs_health_check(&self, now: Instant, ttl: Duration) -> bool {
        match self.last_health_check_at {
            None => true,
            Some(at) => now.saturating_duration_since(at) >= ttl,
        }
    }

    /// Store a probe result
    pub fn record_health_check(&mut self, healthy: bool, at: Instant) {
        self.last_health_check_result = healthy;
        self.last_health_check_at = Some(at);
    }

    /// Count one selection of this server
    pub fn mark_used(&mut self) {
        self.used_count = self.used_count.saturating_add(1);
    }
}

impl From<SrvCandidate> for TrackedServer {
    fn from(candidate: SrvCandidate) -> Self {
        Self::new(candidate)
    }
}

/// The endpoint returned by `choose()`
///
/// An empty target with port 0 means no server qualified; callers should treat
/// that as "try again later".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub target: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new<S: Into<String>>(target: S, port: u16) -> Self {
        Self {
            target: target.into(),
            port,
        }
    }

    /// True for the "no eligible server" result
    pub fn is_empty(&self) -> bool {
        self.target.is_empty() && self.port == 0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.target, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_server_needs_health_check() {
        let server = TrackedServer::new(SrvCandidate::new("a.example.com.", 80, 10, 5));
        assert!(server.needs_health_check(Instant::now(), Duration::from_secs(5)));
        assert!(!server.is_healthy());
        assert_eq!(server.used_count, 0);
    }

    #[test]
    fn test_health_check_ttl_window() {
        let mut server = TrackedServer::new(SrvCandidate::new("a.example.com.", 80, 10, 5));
        let checked_at = Instant::now();
        server.record_health_check(true, checked_at);

        let ttl = Duration::from_secs(5);
        assert!(!server.needs_health_check(checked_at, ttl));
        assert!(!server.needs_health_check(checked_at + Duration::from_secs(4), ttl));
        assert!(server.needs_health_check(checked_at + Duration::from_secs(5), ttl));

        // A zero TTL disables caching
        assert!(server.needs_health_check(checked_at, Duration::ZERO));
    }

    #[test]
    fn test_used_count_saturates() {
        let mut server = TrackedServer::new(SrvCandidate::new("a.example.com.", 80, 10, 5));
        server.used_count = u64::MAX;
        server.mark_used();
        assert_eq!(server.used_count, u64::MAX);
    }

    #[test]
    fn test_endpoint_empty() {
        assert!(Endpoint::default().is_empty());
        assert!(!Endpoint::new("a.example.com.", 80).is_empty());
        assert_eq!(Endpoint::new("a.example.com.", 80).to_string(), "a.example.com.:80");
    }
}
