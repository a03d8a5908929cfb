//! # baton-foundation
//!
//! Foundation layer for Baton:
//! - Error: the single error taxonomy shared by every layer
//! - Config: `SwarmConfig` (round budget, retry bound, model settings)
//! - Storage: `ConfigStore` for global / project config files
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  baton-cli (Layer4)                          │
//! │        │                                     │
//! │        ▼                                     │
//! │  baton-swarm (Layer3)  Swarm run loop        │
//! │        │                                     │
//! │        ▼                                     │
//! │  baton-core (Layer2)   context / handoffs    │
//! │        │                                     │
//! │        ▼                                     │
//! │  baton-foundation (Layer1)  error / config   │
//! └──────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config
// ============================================================================
pub use config::{ModelConfig, RetrySettings, SwarmConfig, SWARM_CONFIG_FILE};

// ============================================================================
// Storage
// ============================================================================
pub use storage::{load_file, ConfigFormat, ConfigStore};
