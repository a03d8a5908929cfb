//! Swarm Config - run budgets, retry policy, model settings
//!
//! Loaded as one value and threaded explicitly into the swarm, its
//! conditions and its turn executor. Nothing here is process-global.
//!
//! ```json
//! {
//!   "maxRounds": 15,
//!   "conditionWindow": 10,
//!   "successStatuses": ["completed"],
//!   "retry": { "maxAttempts": 3, "maxElapsedSecs": 120 },
//!   "model": { "model": "gpt-4o-mini", "apiType": "openai", "apiKeyEnv": "OPENAI_API_KEY" }
//! }
//! ```

use crate::storage::{load_file, ConfigStore};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

/// Config file name inside the global / project config directory
pub const SWARM_CONFIG_FILE: &str = "config.json";

// ============================================================================
// Swarm Config
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwarmConfig {
    /// Round budget used when a run does not pass its own
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Recent transcript messages shown to an LLM-backed condition
    #[serde(default = "default_condition_window")]
    pub condition_window: usize,

    /// `status` values that make a terminal hand-off end as completed
    #[serde(default = "default_success_statuses")]
    pub success_statuses: Vec<String>,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub model: ModelConfig,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            condition_window: default_condition_window(),
            success_statuses: default_success_statuses(),
            retry: RetrySettings::default(),
            model: ModelConfig::default(),
        }
    }
}

impl SwarmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// Global config merged with the current project's config (project wins)
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        if let Ok(global) = ConfigStore::global() {
            if let Some(layer) = global.load_optional::<Value>(SWARM_CONFIG_FILE)? {
                config.merge(layer)?;
            }
        }

        if let Ok(project) = ConfigStore::current_project() {
            if let Some(layer) = project.load_optional::<Value>(SWARM_CONFIG_FILE)? {
                config.merge(layer)?;
            }
        }

        config.validate()?;
        tracing::debug!(
            max_rounds = config.max_rounds,
            max_attempts = config.retry.max_attempts,
            "Loaded swarm config"
        );
        Ok(config)
    }

    /// Load a single `.json` or `.toml` file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let config: SwarmConfig = load_file(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: SwarmConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(Error::Config("maxRounds must be at least 1".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config(
                "retry.maxAttempts must be at least 1".to_string(),
            ));
        }
        if self.condition_window == 0 {
            return Err(Error::Config(
                "conditionWindow must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a `status` value counts as success for a terminal hand-off
    pub fn is_success_status(&self, status: &str) -> bool {
        self.success_statuses.iter().any(|s| s == status)
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// Layer a partial config (as parsed from a file) over this one
    ///
    /// Every key present in `layer` wins, including ones set back to their
    /// default; absent keys keep the current value. `null` clears optional
    /// fields such as `retry.maxElapsedSecs`.
    pub fn merge(&mut self, layer: Value) -> Result<()> {
        let mut base = serde_json::to_value(&*self)?;
        merge_values(&mut base, layer);
        *self = serde_json::from_value(base)?;
        Ok(())
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.retry.max_attempts = attempts;
        self
    }

    pub fn max_elapsed(mut self, elapsed: Duration) -> Self {
        self.retry.max_elapsed_secs = Some(elapsed.as_secs());
        self
    }

    pub fn condition_window(mut self, window: usize) -> Self {
        self.condition_window = window;
        self
    }

    pub fn model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }
}

// ============================================================================
// Retry Settings
// ============================================================================

/// Bounded retry for the task pipeline. No backoff; attempts run back to back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Optional wall-clock bound on one task, measured from when it was recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_elapsed_secs: Option<u64>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_elapsed_secs: None,
        }
    }
}

impl RetrySettings {
    pub fn max_elapsed(&self) -> Option<Duration> {
        self.max_elapsed_secs.map(Duration::from_secs)
    }
}

// ============================================================================
// Model Config
// ============================================================================

/// Language-model settings handed to turn executors and condition evaluators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_api_type")]
    pub api_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Name of the environment variable holding the API key (never the key itself)
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_type: default_api_type(),
            base_url: None,
            api_key_env: default_api_key_env(),
        }
    }
}

impl ModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Resolve the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Deep merge of JSON objects; anything else in `layer` replaces `base`
fn merge_values(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(slot) => merge_values(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn default_max_rounds() -> u32 {
    20
}

fn default_condition_window() -> usize {
    10
}

fn default_success_statuses() -> Vec<String> {
    vec!["completed".to_string()]
}

fn default_max_attempts() -> u32 {
    3
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_type() -> String {
    "openai".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swarm_config_default() {
        let config = SwarmConfig::new();
        assert_eq!(config.max_rounds, 20);
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.retry.max_elapsed().is_none());
        assert!(config.is_success_status("completed"));
        assert!(!config.is_success_status("failed"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_swarm_config_builder() {
        let config = SwarmConfig::new()
            .max_rounds(10)
            .max_attempts(5)
            .max_elapsed(Duration::from_secs(90))
            .model(ModelConfig::new("local-model").base_url("http://localhost:11434"));

        assert_eq!(config.max_rounds, 10);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.max_elapsed(), Some(Duration::from_secs(90)));
        assert_eq!(config.model.model, "local-model");
        assert_eq!(
            config.model.base_url.as_deref(),
            Some("http://localhost:11434")
        );
    }

    #[test]
    fn test_config_merge() {
        let mut config = SwarmConfig::new();
        config
            .merge(serde_json::json!({
                "maxRounds": 12,
                "retry": { "maxAttempts": 5, "maxElapsedSecs": 60 },
                "model": { "model": "gpt-4o" }
            }))
            .unwrap();
        config
            .merge(serde_json::json!({ "retry": { "maxAttempts": 4 } }))
            .unwrap();

        // absent keys keep the earlier layer
        assert_eq!(config.max_rounds, 12);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.max_elapsed_secs, Some(60));
        assert_eq!(config.model.model, "gpt-4o");
        assert_eq!(config.model.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_config_merge_resets_to_default() {
        let mut config = SwarmConfig::new();
        config
            .merge(serde_json::json!({
                "maxRounds": 12,
                "retry": { "maxElapsedSecs": 60 },
                "model": { "model": "gpt-4o" }
            }))
            .unwrap();

        // a project layer can put values back to their defaults
        config
            .merge(serde_json::json!({
                "maxRounds": 20,
                "retry": { "maxElapsedSecs": null },
                "model": { "model": "gpt-4o-mini" }
            }))
            .unwrap();

        assert_eq!(config, SwarmConfig::default());
    }

    #[test]
    fn test_config_merge_rejects_bad_types() {
        let mut config = SwarmConfig::new();
        let err = config
            .merge(serde_json::json!({ "maxRounds": "many" }))
            .unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert_eq!(config.max_rounds, 20);
    }

    #[test]
    fn test_validate_rejects_zero_budgets() {
        assert!(matches!(
            SwarmConfig::new().max_rounds(0).validate(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            SwarmConfig::new().max_attempts(0).validate(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            SwarmConfig::new().condition_window(0).validate(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_from_toml_str() {
        let config = SwarmConfig::from_toml_str(
            r#"
            maxRounds = 15
            successStatuses = ["completed", "done"]

            [retry]
            maxAttempts = 2
            maxElapsedSecs = 30

            [model]
            model = "gpt-4o"
            "#,
        )
        .unwrap();

        assert_eq!(config.max_rounds, 15);
        assert!(config.is_success_status("done"));
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.max_elapsed_secs, Some(30));
        assert_eq!(config.model.model, "gpt-4o");
        assert_eq!(config.model.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_from_path_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swarm.json");
        std::fs::write(&path, r#"{ "maxRounds": 8, "retry": { "maxAttempts": 1 } }"#).unwrap();

        let config = SwarmConfig::from_path(&path).unwrap();
        assert_eq!(config.max_rounds, 8);
        assert_eq!(config.retry.max_attempts, 1);
        assert_eq!(config.condition_window, 10);
    }

    #[test]
    fn test_from_path_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swarm.json");
        std::fs::write(&path, r#"{ "maxRounds": 0 }"#).unwrap();

        assert!(matches!(SwarmConfig::from_path(&path), Err(Error::Config(_))));
    }
}
