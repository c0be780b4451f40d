//! # Weighted Priority Selection
//!
//! The default selection strategy, following the target selection rules of
//! RFC 2782 with an added fairness step.
//!
//! ## Algorithm
//!
//! 1. Group servers by priority and visit the groups from the lowest priority value up
//! 2. Inside a group, drop every server whose last health check failed
//! 3. Keep only the healthy servers with the smallest `used_count`, so a server that
//!    has been chosen less often than its peers is always served next
//! 4. Associate each remaining server with the running sum of the weights, in record
//!    order, draw a uniform number in `[0, total]` (inclusive) and take the first
//!    server whose running sum is greater than or equal to it
//! 5. The first group producing a server wins; lower-preference groups are only
//!    reached when a group has no healthy server at all
//!
//! A weight of zero does not exclude a server: when it is the only candidate, or all
//! candidates weigh zero, the draw is forced to 0 and the first candidate matches.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::types::TrackedServer;
use crate::load_balancing::random::RandomSource;
use crate::load_balancing::strategies::SelectionStrategy;

/// RFC 2782 weighted priority selector with usage fairness
#[derive(Debug, Clone)]
pub struct PrioritySelector {
    random: Arc<RandomSource>,
}

impl PrioritySelector {
    /// Create a selector drawing from its own time-seeded generator
    pub fn new() -> Self {
        Self::with_random(Arc::new(RandomSource::new()))
    }

    /// Create a selector drawing from a shared generator
    pub fn with_random(random: Arc<RandomSource>) -> Self {
        Self { random }
    }

    /// The generator used for weighted draws
    pub fn random(&self) -> &Arc<RandomSource> {
        &self.random
    }

    /// Run steps 2-4 over one priority group; `members` are indices into `servers`
    fn select_in_tier(&self, servers: &[TrackedServer], members: &[usize]) -> Option<usize> {
        let healthy: Vec<usize> = members
            .iter()
            .copied()
            .filter(|&index| servers[index].is_healthy())
            .collect();

        let min_used = healthy.iter().map(|&index| servers[index].used_count).min()?;

        let mut total_weight: u64 = 0;
        let running_sums: Vec<(usize, u64)> = healthy
            .into_iter()
            .filter(|&index| servers[index].used_count == min_used)
            .map(|index| {
                total_weight += u64::from(servers[index].weight());
                (index, total_weight)
            })
            .collect();

        let drawn = self.random.gen_inclusive(total_weight);

        trace!(
            candidates = running_sums.len(),
            min_used,
            total_weight,
            drawn,
            "Weighted draw inside priority tier"
        );

        running_sums
            .into_iter()
            .find(|&(_, running_sum)| running_sum >= drawn)
            .map(|(index, _)| index)
    }
}

impl Default for PrioritySelector {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionStrategy for PrioritySelector {
    fn select(&self, servers: &[TrackedServer]) -> Option<usize> {
        let mut tiers: BTreeMap<u16, Vec<usize>> = BTreeMap::new();
        for (index, server) in servers.iter().enumerate() {
            tiers.entry(server.priority()).or_default().push(index);
        }

        for (priority, members) in &tiers {
            if let Some(index) = self.select_in_tier(servers, members) {
                let selected = &servers[index];
                debug!(
                    target_host = %selected.target(),
                    port = selected.port(),
                    priority = *priority,
                    weight = selected.weight(),
                    used_count = selected.used_count,
                    algorithm = "priority_weighted",
                    "Selected server"
                );
                return Some(index);
            }

            trace!(priority = *priority, "No healthy server in priority tier");
        }

        None
    }

    fn name(&self) -> &'static str {
        "priority_weighted"
    }
}
