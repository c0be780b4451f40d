pub mod config;
pub mod health;
pub mod logging;

pub use config::{LogConfig, LogFormat};
pub use health::{ConnectLivenessCheck, LivenessFn, LivenessStrategy};
pub use logging::init_logging;
