//! Storage module for Baton
//!
//! - `json`: config files on disk (JSON or TOML)

mod json;

pub use json::{load_file, ConfigFormat, ConfigStore};
