//! # Discovery Session
//!
//! A `DiscoverySession` owns the server set for one (service, protocol, domain)
//! triple and ties the three strategies together:
//!
//! - `refresh()` asks the resolution strategy for records and replaces the set
//! - `choose()` re-probes servers whose health result expired, lets the selection
//!   strategy pick one, counts the pick and returns the endpoint
//! - `refresh_async()` runs `refresh()` on a fixed interval in a background task
//!
//! ## Locking
//!
//! The server set sits behind one `parking_lot::Mutex`. It is only held for in-memory
//! work: swapping the vector on refresh, copying stale entries before probing, writing
//! one probe result back, and the select-and-count step of `choose()`. Resolution and
//! liveness calls always run with the lock released, so a slow probe never blocks a
//! concurrent refresh or choose.
//!
//! ## Rust Concepts Used
//!
//! - `Arc<dyn Trait>` for injected strategies shared with the background task
//! - `CancellationToken` from `tokio-util` as the stop signal of the refresh loop
//! - `tokio::select!` to wait for either the next tick or cancellation

use chrono::{DateTime, Utc};
use metrics::counter;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::core::config::{DiscoveryConfig, DEFAULT_HEALTH_CHECK_TTL};
use crate::core::error::{DiscoveryError, DiscoveryResult};
use crate::types::{Endpoint, SrvCandidate, TrackedServer};
use crate::discovery::resolver::{DnsSrvResolver, ResolutionStrategy, StaticResolver};
use crate::load_balancing::{PrioritySelector, SelectionStrategy};
use crate::observability::health::{ConnectLivenessCheck, LivenessStrategy};

/// Resolve `_service._protocol.domain` and return one healthy endpoint
///
/// Builds a session with every default strategy (system DNS resolver, connection
/// probe, weighted priority selection), refreshes it once and chooses. A failed
/// lookup is returned as an error; an empty endpoint means no record was reachable.
pub async fn discover(service: &str, protocol: &str, domain: &str) -> DiscoveryResult<Endpoint> {
    let session = DiscoverySession::new(service, protocol, domain);
    session.refresh().await?;
    Ok(session.choose().await)
}

/// Builder for [`DiscoverySession`]
///
/// Strategies left unset fall back to the defaults when `build()` is called.
pub struct DiscoverySessionBuilder {
    service: String,
    protocol: String,
    domain: String,
    health_check_ttl: Duration,
    resolver: Option<Arc<dyn ResolutionStrategy>>,
    liveness: Option<Arc<dyn LivenessStrategy>>,
    selector: Option<Arc<dyn SelectionStrategy>>,
}

impl DiscoverySessionBuilder {
    pub fn health_check_ttl(mut self, ttl: Duration) -> Self {
        self.health_check_ttl = ttl;
        self
    }

    pub fn resolver<R: ResolutionStrategy + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn liveness<L: LivenessStrategy + 'static>(mut self, liveness: L) -> Self {
        self.liveness = Some(Arc::new(liveness));
        self
    }

    pub fn selector<S: SelectionStrategy + 'static>(mut self, selector: S) -> Self {
        self.selector = Some(Arc::new(selector));
        self
    }

    /// Use a strategy instance that is shared with other sessions
    pub fn shared_selector(mut self, selector: Arc<dyn SelectionStrategy>) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn build(self) -> DiscoverySession {
        DiscoverySession {
            resolver: self
                .resolver
                .unwrap_or_else(|| Arc::new(DnsSrvResolver::system())),
            liveness: self
                .liveness
                .unwrap_or_else(|| Arc::new(ConnectLivenessCheck::default())),
            selector: self
                .selector
                .unwrap_or_else(|| Arc::new(PrioritySelector::new())),
            service: self.service,
            protocol: self.protocol,
            domain: self.domain,
            health_check_ttl: self.health_check_ttl,
            servers: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            last_refresh: Mutex::new(None),
            total_selections: AtomicU64::new(0),
            selection_misses: AtomicU64::new(0),
        }
    }
}

/// Server discovery for one SRV name
pub struct DiscoverySession {
    service: String,
    protocol: String,
    domain: String,
    health_check_ttl: Duration,
    resolver: Arc<dyn ResolutionStrategy>,
    liveness: Arc<dyn LivenessStrategy>,
    selector: Arc<dyn SelectionStrategy>,
    servers: Mutex<Vec<TrackedServer>>,
    /// Failures of background refreshes, oldest first
    errors: Mutex<Vec<DiscoveryError>>,
    last_refresh: Mutex<Option<DateTime<Utc>>>,
    total_selections: AtomicU64,
    selection_misses: AtomicU64,
}

impl DiscoverySession {
    /// Create a session with the default strategies
    pub fn new<S: Into<String>>(service: S, protocol: S, domain: S) -> Self {
        Self::builder(service, protocol, domain).build()
    }

    pub fn builder<S: Into<String>>(service: S, protocol: S, domain: S) -> DiscoverySessionBuilder {
        DiscoverySessionBuilder {
            service: service.into(),
            protocol: protocol.into(),
            domain: domain.into(),
            health_check_ttl: DEFAULT_HEALTH_CHECK_TTL,
            resolver: None,
            liveness: None,
            selector: None,
        }
    }

    /// Create a session from a configuration
    ///
    /// The liveness probe uses the configured timeout. In development mode the DNS
    /// resolver is replaced by a static resolver serving the configured endpoint.
    pub fn from_config(config: &DiscoveryConfig) -> DiscoveryResult<Self> {
        config.validate()?;

        let mut builder = Self::builder(
            config.service.as_str(),
            config.protocol.as_str(),
            config.domain.as_str(),
        )
        .health_check_ttl(config.health_check_ttl)
        .liveness(ConnectLivenessCheck::new(config.health_check_timeout));

        if let Some(dev) = &config.development {
            info!(target_host = %dev.target, port = dev.port, "Development mode, DNS resolution disabled");
            builder = builder.resolver(StaticResolver::single(dev.target.clone(), dev.port));
        }

        Ok(builder.build())
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn health_check_ttl(&self) -> Duration {
        self.health_check_ttl
    }

    /// Fetch the records and replace the server set
    ///
    /// On failure the current server set, with its health and usage state, is kept
    /// and the resolution error is returned as produced by the strategy.
    pub async fn refresh(&self) -> DiscoveryResult<()> {
        let records = match self
            .resolver
            .resolve(&self.service, &self.protocol, &self.domain)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                counter!("srv_discovery_refresh_failures", "error_type" => e.error_type()).increment(1);
                return Err(e);
            }
        };

        let count = records.len();
        self.replace_servers(records);
        *self.last_refresh.lock() = Some(Utc::now());

        counter!("srv_discovery_refreshes").increment(1);
        debug!(
            service = %self.service,
            protocol = %self.protocol,
            domain = %self.domain,
            servers = count,
            "Refreshed server set"
        );
        Ok(())
    }

    fn replace_servers(&self, records: Vec<SrvCandidate>) {
        let servers: Vec<TrackedServer> = records.into_iter().map(TrackedServer::new).collect();
        *self.servers.lock() = servers;
    }

    /// Refresh in a background task every `interval`
    ///
    /// The first refresh happens one interval from now; call `refresh()` first when
    /// the set is needed immediately. Failures are appended to [`errors`] and the
    /// previous server set stays in use until a later tick succeeds.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// [`errors`]: DiscoverySession::errors
    pub fn refresh_async(self: &Arc<Self>, interval: Duration) -> DiscoveryResult<RefreshHandle> {
        if interval.is_zero() {
            return Err(DiscoveryError::config("refresh interval must be greater than zero"));
        }

        let token = CancellationToken::new();
        let session = Arc::clone(self);
        let task_token = token.clone();
        let task = tokio::spawn(async move {
            session.run_refresh_loop(interval, task_token).await;
        });

        info!(
            service = %self.service,
            domain = %self.domain,
            interval = ?interval,
            "Started background refresh"
        );

        Ok(RefreshHandle {
            token,
            task: Some(task),
        })
    }

    async fn run_refresh_loop(&self, period: Duration, token: CancellationToken) {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            // Cancellation is only observed between ticks; a refresh in flight completes
            if let Err(e) = self.refresh().await {
                warn!(
                    service = %self.service,
                    domain = %self.domain,
                    error = %e,
                    error_type = e.error_type(),
                    "Background refresh failed, keeping previous server set"
                );
                self.errors.lock().push(e);
            }
        }

        info!(service = %self.service, domain = %self.domain, "Stopped background refresh");
    }

    /// Choose an endpoint
    ///
    /// Servers whose health result is missing or older than the TTL are probed first,
    /// one after another. Returns the empty endpoint when nothing qualifies.
    pub async fn choose(&self) -> Endpoint {
        self.run_health_checks().await;

        let chosen = {
            let mut servers = self.servers.lock();
            match self.selector.select(&servers) {
                Some(index) if index < servers.len() => {
                    let server = &mut servers[index];
                    server.mark_used();
                    Some(Endpoint::new(server.target(), server.port()))
                }
                Some(index) => {
                    warn!(
                        index,
                        servers = servers.len(),
                        selector = self.selector.name(),
                        "Selection strategy returned an out-of-range index"
                    );
                    None
                }
                None => None,
            }
        };

        match chosen {
            Some(endpoint) => {
                self.total_selections.fetch_add(1, Ordering::Relaxed);
                counter!("srv_discovery_selections").increment(1);
                endpoint
            }
            None => {
                self.selection_misses.fetch_add(1, Ordering::Relaxed);
                counter!("srv_discovery_selection_misses").increment(1);
                debug!(service = %self.service, domain = %self.domain, "No eligible server");
                Endpoint::default()
            }
        }
    }

    async fn run_health_checks(&self) {
        let now = Instant::now();
        let stale: Vec<(usize, SrvCandidate)> = {
            let servers = self.servers.lock();
            servers
                .iter()
                .enumerate()
                .filter(|(_, server)| server.needs_health_check(now, self.health_check_ttl))
                .map(|(index, server)| (index, server.candidate.clone()))
                .collect()
        };

        for (index, candidate) in stale {
            let healthy = match self
                .liveness
                .check(&candidate.target, candidate.port, &self.protocol)
                .await
            {
                Ok(healthy) => healthy,
                Err(e) => {
                    debug!(
                        target_host = %candidate.target,
                        port = candidate.port,
                        error = %e,
                        "Liveness probe failed, marking server unhealthy"
                    );
                    false
                }
            };
            counter!("srv_discovery_health_checks").increment(1);

            let mut servers = self.servers.lock();
            match servers.get_mut(index) {
                Some(server) if server.candidate == candidate => {
                    server.record_health_check(healthy, Instant::now());
                }
                _ => trace!(
                    target_host = %candidate.target,
                    port = candidate.port,
                    "Server set replaced during probe, discarding result"
                ),
            }
        }
    }

    /// Background refresh failures, oldest first
    pub fn errors(&self) -> Vec<DiscoveryError> {
        self.errors.lock().clone()
    }

    /// Drain the background refresh failures
    pub fn take_errors(&self) -> Vec<DiscoveryError> {
        std::mem::take(&mut *self.errors.lock())
    }

    pub fn clear_errors(&self) {
        self.errors.lock().clear();
    }

    /// Copy of the current server set
    pub fn servers(&self) -> Vec<TrackedServer> {
        self.servers.lock().clone()
    }

    pub fn stats(&self) -> SessionStats {
        let (total_servers, healthy_servers, unchecked_servers) = {
            let servers = self.servers.lock();
            (
                servers.len(),
                servers.iter().filter(|s| s.is_healthy()).count(),
                servers.iter().filter(|s| s.last_health_check_at.is_none()).count(),
            )
        };

        SessionStats {
            service: self.service.clone(),
            protocol: self.protocol.clone(),
            domain: self.domain.clone(),
            selector: self.selector.name().to_string(),
            total_servers,
            healthy_servers,
            unchecked_servers,
            total_selections: self.total_selections.load(Ordering::Relaxed),
            selection_misses: self.selection_misses.load(Ordering::Relaxed),
            recorded_errors: self.errors.lock().len(),
            last_refresh: *self.last_refresh.lock(),
        }
    }
}

impl std::fmt::Debug for DiscoverySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoverySession")
            .field("service", &self.service)
            .field("protocol", &self.protocol)
            .field("domain", &self.domain)
            .field("health_check_ttl", &self.health_check_ttl)
            .field("selector", &self.selector.name())
            .finish_non_exhaustive()
    }
}

/// Session statistics for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub service: String,
    pub protocol: String,
    pub domain: String,
    pub selector: String,
    pub total_servers: usize,
    pub healthy_servers: usize,
    pub unchecked_servers: usize,
    pub total_selections: u64,
    /// `choose()` calls that returned the empty endpoint
    pub selection_misses: u64,
    pub recorded_errors: usize,
    pub last_refresh: Option<DateTime<Utc>>,
}

/// Stop handle of a background refresh loop
///
/// Dropping the handle also stops the loop.
pub struct RefreshHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Signal the loop to stop before its next tick
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Cancel the loop and wait for it to exit
    pub async fn shutdown(mut self) -> DiscoveryResult<()> {
        self.token.cancel();
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| DiscoveryError::internal(format!("Refresh task failed: {}", e))),
            None => Ok(()),
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::resolver::ResolverFn;
    use crate::observability::health::LivenessFn;
    use std::sync::atomic::AtomicUsize;

    fn two_records() -> Vec<SrvCandidate> {
        vec![
            SrvCandidate::new("server1.example.com.", 1111, 10, 20),
            SrvCandidate::new("server2.example.com.", 2222, 10, 10),
        ]
    }

    #[tokio::test]
    async fn test_choose_before_refresh_is_empty() {
        let session = DiscoverySession::builder("jabber", "tcp", "registro.br")
            .resolver(StaticResolver::new(two_records()))
            .liveness(LivenessFn(|_: &str, _: u16, _: &str| -> DiscoveryResult<bool> { Ok(true) }))
            .build();

        assert!(session.choose().await.is_empty());
        assert_eq!(session.stats().total_selections, 0);
    }

    #[tokio::test]
    async fn test_health_results_cached_within_ttl() {
        let probes = Arc::new(AtomicUsize::new(0));
        let counter = probes.clone();

        let session = DiscoverySession::builder("jabber", "tcp", "registro.br")
            .resolver(StaticResolver::new(two_records()))
            .liveness(LivenessFn(move |_: &str, _: u16, _: &str| -> DiscoveryResult<bool> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }))
            .health_check_ttl(Duration::from_secs(3600))
            .build();

        session.refresh().await.unwrap();
        for _ in 0..5 {
            assert!(!session.choose().await.is_empty());
        }

        assert_eq!(probes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_probes_every_time() {
        let probes = Arc::new(AtomicUsize::new(0));
        let counter = probes.clone();

        let session = DiscoverySession::builder("jabber", "tcp", "registro.br")
            .resolver(StaticResolver::new(two_records()))
            .liveness(LivenessFn(move |_: &str, _: u16, _: &str| -> DiscoveryResult<bool> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }))
            .health_check_ttl(Duration::ZERO)
            .build();

        session.refresh().await.unwrap();
        for _ in 0..3 {
            session.choose().await;
        }

        assert_eq!(probes.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_probe_error_marks_unhealthy() {
        let session = DiscoverySession::builder("jabber", "tcp", "registro.br")
            .resolver(StaticResolver::new(two_records()))
            .liveness(LivenessFn(|target: &str, port: u16, _: &str| -> DiscoveryResult<bool> {
                if target == "server1.example.com." {
                    Err(DiscoveryError::health_check(target, port, "connection refused"))
                } else {
                    Ok(true)
                }
            }))
            .build();

        session.refresh().await.unwrap();
        for _ in 0..10 {
            assert_eq!(
                session.choose().await,
                Endpoint::new("server2.example.com.", 2222)
            );
        }

        let servers = session.servers();
        assert!(!servers[0].is_healthy());
        assert!(servers[0].last_health_check_at.is_some());
        assert_eq!(servers[1].used_count, 10);
    }

    #[tokio::test]
    async fn test_refresh_resets_usage_and_health() {
        let session = DiscoverySession::builder("jabber", "tcp", "registro.br")
            .resolver(StaticResolver::new(two_records()))
            .liveness(LivenessFn(|_: &str, _: u16, _: &str| -> DiscoveryResult<bool> { Ok(true) }))
            .build();

        session.refresh().await.unwrap();
        session.choose().await;
        session.choose().await;
        assert_eq!(session.servers().iter().map(|s| s.used_count).sum::<u64>(), 2);

        session.refresh().await.unwrap();
        let servers = session.servers();
        assert!(servers.iter().all(|s| s.used_count == 0));
        assert!(servers.iter().all(|s| s.last_health_check_at.is_none()));
        assert!(session.stats().last_refresh.is_some());
    }

    #[tokio::test]
    async fn test_out_of_range_index_is_ignored() {
        use crate::load_balancing::SelectorFn;

        let session = DiscoverySession::builder("jabber", "tcp", "registro.br")
            .resolver(StaticResolver::new(two_records()))
            .liveness(LivenessFn(|_: &str, _: u16, _: &str| -> DiscoveryResult<bool> { Ok(true) }))
            .selector(SelectorFn(|_: &[TrackedServer]| Some(99)))
            .build();

        session.refresh().await.unwrap();
        assert!(session.choose().await.is_empty());
        assert!(session.servers().iter().all(|s| s.used_count == 0));
        assert_eq!(session.stats().selection_misses, 1);
    }

    #[tokio::test]
    async fn test_custom_selector_miss_is_counted() {
        use crate::load_balancing::SelectorFn;

        let session = DiscoverySession::builder("jabber", "tcp", "registro.br")
            .resolver(StaticResolver::new(two_records()))
            .liveness(LivenessFn(|_: &str, _: u16, _: &str| -> DiscoveryResult<bool> { Ok(true) }))
            .selector(SelectorFn(|_: &[TrackedServer]| -> Option<usize> { None }))
            .build();

        session.refresh().await.unwrap();
        session.choose().await;
        session.choose().await;

        let stats = session.stats();
        assert_eq!(stats.selection_misses, 2);
        assert_eq!(stats.total_selections, 0);
    }

    #[tokio::test]
    async fn test_refresh_async_rejects_zero_interval() {
        let session = Arc::new(
            DiscoverySession::builder("jabber", "tcp", "registro.br")
                .resolver(StaticResolver::new(two_records()))
                .build(),
        );

        assert!(matches!(
            session.refresh_async(Duration::ZERO),
            Err(DiscoveryError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_from_config_development_mode() {
        let mut config = DiscoveryConfig::new("jabber", "tcp", "registro.br");
        config.development = Some(crate::core::config::DevelopmentTarget {
            target: "localhost".to_string(),
            port: 8443,
        });

        let session = DiscoverySession::from_config(&config).unwrap();
        session.refresh().await.unwrap();
        assert_eq!(
            session.servers()[0].candidate,
            SrvCandidate::new("localhost", 8443, 0, 0)
        );
    }

    #[tokio::test]
    async fn test_refresh_error_passed_through() {
        let session = DiscoverySession::builder("jabber", "xxx", "registro.br")
            .resolver(ResolverFn(
                |_: &str, _: &str, _: &str| -> DiscoveryResult<Vec<SrvCandidate>> {
                    Err(DiscoveryError::resolution("_jabber._xxx.registro.br.", "no such host"))
                },
            ))
            .build();

        assert_eq!(
            session.refresh().await,
            Err(DiscoveryError::resolution("_jabber._xxx.registro.br.", "no such host"))
        );
        assert!(session.servers().is_empty());
        assert!(session.stats().last_refresh.is_none());
    }
}
