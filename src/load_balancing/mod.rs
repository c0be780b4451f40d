pub mod balancer;
pub mod random;
pub mod strategies;

pub use balancer::PrioritySelector;
pub use random::RandomSource;
pub use strategies::{FirstHealthySelector, RoundRobinSelector, SelectionStrategy, SelectorFn};
