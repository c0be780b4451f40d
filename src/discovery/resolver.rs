//! # SRV Resolution Strategies
//!
//! A resolution strategy turns a (service, protocol, domain) triple into the list of
//! SRV records currently published for it. The discovery session calls it once per
//! refresh and replaces its server set with the result.
//!
//! - `DnsSrvResolver` queries DNS through `hickory-resolver`
//! - `StaticResolver` serves a fixed list, for development setups without SRV records
//! - `ResolverFn` wraps a closure

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use tracing::{debug, warn};

use crate::core::error::{DiscoveryError, DiscoveryResult};
use crate::types::SrvCandidate;

/// Resolution strategy trait
#[async_trait]
pub trait ResolutionStrategy: Send + Sync {
    /// Fetch the SRV records for `_service._protocol.domain`
    async fn resolve(
        &self,
        service: &str,
        protocol: &str,
        domain: &str,
    ) -> DiscoveryResult<Vec<SrvCandidate>>;
}

/// Build the SRV query name `_service._protocol.domain.`
///
/// When both service and protocol are empty the domain itself is queried, which
/// allows callers to pass a complete SRV owner name.
pub fn srv_query_name(service: &str, protocol: &str, domain: &str) -> String {
    let domain = domain.trim_end_matches('.');
    if service.is_empty() && protocol.is_empty() {
        format!("{}.", domain)
    } else {
        format!("_{}._{}.{}.", service, protocol, domain)
    }
}

/// Adapter turning a synchronous closure into a resolution strategy
pub struct ResolverFn<F>(pub F);

#[async_trait]
impl<F> ResolutionStrategy for ResolverFn<F>
where
    F: Fn(&str, &str, &str) -> DiscoveryResult<Vec<SrvCandidate>> + Send + Sync,
{
    async fn resolve(
        &self,
        service: &str,
        protocol: &str,
        domain: &str,
    ) -> DiscoveryResult<Vec<SrvCandidate>> {
        (self.0)(service, protocol, domain)
    }
}

/// Serves the same records for every query
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    records: Vec<SrvCandidate>,
}

impl StaticResolver {
    pub fn new(records: Vec<SrvCandidate>) -> Self {
        Self { records }
    }

    /// Single record with priority and weight zero
    pub fn single<S: Into<String>>(target: S, port: u16) -> Self {
        Self::new(vec![SrvCandidate::new(target, port, 0, 0)])
    }

    pub fn records(&self) -> &[SrvCandidate] {
        &self.records
    }
}

#[async_trait]
impl ResolutionStrategy for StaticResolver {
    async fn resolve(
        &self,
        _service: &str,
        _protocol: &str,
        _domain: &str,
    ) -> DiscoveryResult<Vec<SrvCandidate>> {
        Ok(self.records.clone())
    }
}

/// DNS SRV lookups through `hickory-resolver`
#[derive(Clone)]
pub struct DnsSrvResolver {
    resolver: TokioAsyncResolver,
}

impl DnsSrvResolver {
    /// Use the host's resolver configuration (`/etc/resolv.conf` or the platform
    /// equivalent), falling back to the library defaults when it cannot be read
    pub fn system() -> Self {
        match TokioAsyncResolver::tokio_from_system_conf() {
            Ok(resolver) => Self { resolver },
            Err(e) => {
                warn!(error = %e, "Failed to read system resolver configuration, using defaults");
                Self::with_config(ResolverConfig::default(), ResolverOpts::default())
            }
        }
    }

    /// Use an explicit resolver configuration
    pub fn with_config(config: ResolverConfig, options: ResolverOpts) -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(config, options),
        }
    }
}

impl std::fmt::Debug for DnsSrvResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsSrvResolver").finish_non_exhaustive()
    }
}

#[async_trait]
impl ResolutionStrategy for DnsSrvResolver {
    async fn resolve(
        &self,
        service: &str,
        protocol: &str,
        domain: &str,
    ) -> DiscoveryResult<Vec<SrvCandidate>> {
        let name = srv_query_name(service, protocol, domain);

        let lookup = self
            .resolver
            .srv_lookup(name.as_str())
            .await
            .map_err(|e| DiscoveryError::resolution(name.clone(), e.to_string()))?;

        let records: Vec<SrvCandidate> = lookup
            .iter()
            .map(|srv| SrvCandidate::new(srv.target().to_utf8(), srv.port(), srv.priority(), srv.weight()))
            .collect();

        debug!(name = %name, records = records.len(), "Resolved SRV records");
        Ok(records)
    }
}
