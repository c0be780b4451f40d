//! # Discovery
//!
//! SRV record resolution and the discovery session that keeps a server set for one
//! SRV name, probes it and hands out endpoints.

pub mod resolver;
pub mod session;

pub use resolver::{srv_query_name, DnsSrvResolver, ResolutionStrategy, ResolverFn, StaticResolver};
pub use session::{discover, DiscoverySession, DiscoverySessionBuilder, RefreshHandle, SessionStats};
