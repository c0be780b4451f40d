//! # SRV Discovery - Core Library Crate
//!
//! Resolves a logical service name to a concrete, currently reachable endpoint using DNS
//! SRV records (RFC 2782). Candidates are grouped by priority, picked by weight, and
//! probed for liveness with results cached for a configurable TTL.
//!
//! ## Quick Start
//!
//! ```no_run
//! # async fn run() -> srv_discovery::DiscoveryResult<()> {
//! let session = srv_discovery::DiscoverySession::new("jabber", "tcp", "registro.br");
//! session.refresh().await?;
//! let endpoint = session.choose().await;
//! if !endpoint.is_empty() {
//!     println!("{}:{}", endpoint.target, endpoint.port);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Pluggable Strategies
//!
//! The session calls three traits, each replaceable through `DiscoverySession::builder`:
//! - `ResolutionStrategy` fetches SRV records (default: `DnsSrvResolver`)
//! - `LivenessStrategy` probes one target (default: `ConnectLivenessCheck`)
//! - `SelectionStrategy` picks among tracked servers (default: `PrioritySelector`)
//!
//! Closures can be used directly through the `ResolverFn`, `LivenessFn` and `SelectorFn`
//! adapters.

/// Error types and configuration
/// Everything else in the crate builds on these
pub mod core;

/// Server data model: SRV records, tracked servers and endpoints
pub mod types;

/// SRV resolution and the discovery session
/// The session owns the server set and drives refresh, probing and selection
pub mod discovery;

/// Selection strategies and the shared random source
/// Implements RFC 2782 weighted priority selection plus simpler alternatives
pub mod load_balancing;

/// Logging setup and liveness probing
pub mod observability;

/// Main error type used throughout the crate
pub use core::error::{DiscoveryError, DiscoveryResult};

/// Configuration loaded from YAML/JSON with environment overrides
pub use core::config::{DevelopmentTarget, DiscoveryConfig};

/// Server data model
pub use types::{Endpoint, SrvCandidate, TrackedServer};

/// Discovery session and the one-shot helper
pub use discovery::{
    discover, DiscoverySession, DiscoverySessionBuilder, DnsSrvResolver, RefreshHandle,
    ResolutionStrategy, ResolverFn, SessionStats, StaticResolver,
};

/// Selection strategies
pub use load_balancing::{
    FirstHealthySelector, PrioritySelector, RandomSource, RoundRobinSelector, SelectionStrategy,
    SelectorFn,
};

/// Liveness strategies and logging setup
pub use observability::{init_logging, ConnectLivenessCheck, LivenessFn, LivenessStrategy};
