//! Selection strategy interface and the simpler built-in strategies.
//!
//! A strategy receives a read-only snapshot of the session's server set and returns
//! the index of the chosen server in that same slice, or `None`. The session maps the
//! index back onto its live set and counts the selection.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::types::TrackedServer;

pub trait SelectionStrategy: Send + Sync {
    /// Pick a server from the snapshot
    fn select(&self, servers: &[TrackedServer]) -> Option<usize>;

    /// Strategy name for logs and metrics
    fn name(&self) -> &'static str {
        "custom"
    }
}

/// Adapter turning a closure into a selection strategy
pub struct SelectorFn<F>(pub F);

impl<F> SelectionStrategy for SelectorFn<F>
where
    F: Fn(&[TrackedServer]) -> Option<usize> + Send + Sync,
{
    fn select(&self, servers: &[TrackedServer]) -> Option<usize> {
        (self.0)(servers)
    }
}

/// Cycles through the healthy servers in record order
///
/// Priority and weight are ignored.
#[derive(Debug, Default)]
pub struct RoundRobinSelector {
    counter: AtomicUsize,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionStrategy for RoundRobinSelector {
    fn select(&self, servers: &[TrackedServer]) -> Option<usize> {
        let healthy: Vec<usize> = servers
            .iter()
            .enumerate()
            .filter(|(_, server)| server.is_healthy())
            .map(|(index, _)| index)
            .collect();

        if healthy.is_empty() {
            return None;
        }

        let turn = self.counter.fetch_add(1, Ordering::Relaxed) % healthy.len();
        Some(healthy[turn])
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}

/// Returns the first healthy server, lowest priority value first
///
/// Ties within a priority go to the earliest record.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstHealthySelector;

impl SelectionStrategy for FirstHealthySelector {
    fn select(&self, servers: &[TrackedServer]) -> Option<usize> {
        servers
            .iter()
            .enumerate()
            .filter(|(_, server)| server.is_healthy())
            // min_by_key keeps the first of equal keys
            .min_by_key(|(_, server)| server.priority())
            .map(|(index, _)| index)
    }

    fn name(&self) -> &'static str {
        "first_healthy"
    }
}
