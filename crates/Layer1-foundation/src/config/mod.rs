//! Config - run configuration
//!
//! - `swarm.rs` - SwarmConfig (round budget, retry settings, model settings)

mod swarm;

pub use swarm::{ModelConfig, RetrySettings, SwarmConfig, SWARM_CONFIG_FILE};
