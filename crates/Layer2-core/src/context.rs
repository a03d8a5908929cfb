//! Context Store - shared key/value state for one run
//!
//! Every agent and every function in a run reads and writes the same store.
//! Values are a closed set (string, integer, nested map) so reads are typed:
//! asking for an integer where a string is stored fails with
//! `Error::ContextType` instead of coercing.
//!
//! ## Task keys
//!
//! ```text
//! task          Str   task description
//! attempts      Int   failed attempts so far (starts at 0)
//! max_attempts  Int   retry budget (positive)
//! status        Str   received | retrying | completed | failed
//! result        Str   outcome message
//! started_at    Int   epoch millis when the task was recorded
//! ```

use baton_foundation::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Well-known keys used by the task workflow
pub mod keys {
    pub const TASK: &str = "task";
    pub const ATTEMPTS: &str = "attempts";
    pub const MAX_ATTEMPTS: &str = "max_attempts";
    pub const STATUS: &str = "status";
    pub const RESULT: &str = "result";
    pub const STARTED_AT: &str = "started_at";
}

/// Values of the `status` key
pub mod status {
    pub const RECEIVED: &str = "received";
    pub const RETRYING: &str = "retrying";
    pub const COMPLETED: &str = "completed";
    pub const FAILED: &str = "failed";
}

// ============================================================================
// ContextValue
// ============================================================================

/// A single value in the context store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Int(i64),
    Str(String),
    Map(BTreeMap<String, ContextValue>),
}

impl ContextValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ContextValue::Int(_) => "integer",
            ContextValue::Str(_) => "string",
            ContextValue::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ContextValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ContextValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ContextValue>> {
        match self {
            ContextValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Non-empty string, non-zero integer, or non-empty map
    pub fn is_truthy(&self) -> bool {
        match self {
            ContextValue::Int(i) => *i != 0,
            ContextValue::Str(s) => !s.is_empty(),
            ContextValue::Map(m) => !m.is_empty(),
        }
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Int(i) => write!(f, "{}", i),
            ContextValue::Str(s) => write!(f, "{}", s),
            ContextValue::Map(m) => {
                let rendered = serde_json::to_string(m).map_err(|_| fmt::Error)?;
                write!(f, "{}", rendered)
            }
        }
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::Str(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        ContextValue::Str(s)
    }
}

impl From<i64> for ContextValue {
    fn from(i: i64) -> Self {
        ContextValue::Int(i)
    }
}

impl From<i32> for ContextValue {
    fn from(i: i32) -> Self {
        ContextValue::Int(i64::from(i))
    }
}

impl From<u32> for ContextValue {
    fn from(i: u32) -> Self {
        ContextValue::Int(i64::from(i))
    }
}

impl From<BTreeMap<String, ContextValue>> for ContextValue {
    fn from(m: BTreeMap<String, ContextValue>) -> Self {
        ContextValue::Map(m)
    }
}

// ============================================================================
// Typed reads (shared by store and snapshot)
// ============================================================================

fn read_str<'a>(values: &'a BTreeMap<String, ContextValue>, key: &str) -> Result<Option<&'a str>> {
    match values.get(key) {
        None => Ok(None),
        Some(ContextValue::Str(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(Error::context_type(key, "string", other.type_name())),
    }
}

fn read_int(values: &BTreeMap<String, ContextValue>, key: &str) -> Result<Option<i64>> {
    match values.get(key) {
        None => Ok(None),
        Some(ContextValue::Int(i)) => Ok(Some(*i)),
        Some(other) => Err(Error::context_type(key, "integer", other.type_name())),
    }
}

fn read_map<'a>(
    values: &'a BTreeMap<String, ContextValue>,
    key: &str,
) -> Result<Option<&'a BTreeMap<String, ContextValue>>> {
    match values.get(key) {
        None => Ok(None),
        Some(ContextValue::Map(m)) => Ok(Some(m)),
        Some(other) => Err(Error::context_type(key, "map", other.type_name())),
    }
}

// ============================================================================
// ContextStore
// ============================================================================

/// Mutable key/value bag owned by a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextStore {
    values: BTreeMap<String, ContextValue>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded store
    pub fn with_values<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<ContextValue>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.values.get(key)
    }

    /// Stored value, or `default` when the key is absent
    pub fn get_or(&self, key: &str, default: impl Into<ContextValue>) -> ContextValue {
        self.values
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.into())
    }

    pub fn get_str(&self, key: &str) -> Result<Option<&str>> {
        read_str(&self.values, key)
    }

    pub fn get_str_or(&self, key: &str, default: &str) -> Result<String> {
        Ok(self.get_str(key)?.unwrap_or(default).to_string())
    }

    pub fn get_int(&self, key: &str) -> Result<Option<i64>> {
        read_int(&self.values, key)
    }

    pub fn get_int_or(&self, key: &str, default: i64) -> Result<i64> {
        Ok(self.get_int(key)?.unwrap_or(default))
    }

    pub fn get_map(&self, key: &str) -> Result<Option<&BTreeMap<String, ContextValue>>> {
        read_map(&self.values, key)
    }

    /// Insert or replace a value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<ContextValue> {
        self.values.remove(key)
    }

    /// Add `delta` to an integer (absent keys start at 0) and return the new value
    pub fn increment(&mut self, key: &str, delta: i64) -> Result<i64> {
        let next = self
            .get_int_or(key, 0)?
            .checked_add(delta)
            .ok_or_else(|| {
                Error::InvalidInput(format!("integer overflow incrementing '{}'", key))
            })?;
        self.values.insert(key.to_string(), ContextValue::Int(next));
        Ok(next)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// False when the key is absent
    pub fn is_truthy(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(ContextValue::is_truthy)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Immutable copy for inspection outside the run
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            values: self.values.clone(),
        }
    }
}

// ============================================================================
// ContextSnapshot
// ============================================================================

/// Read-only copy of a context store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextSnapshot {
    values: BTreeMap<String, ContextValue>,
}

impl ContextSnapshot {
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Result<Option<&str>> {
        read_str(&self.values, key)
    }

    pub fn get_int(&self, key: &str) -> Result<Option<i64>> {
        read_int(&self.values, key)
    }

    pub fn get_map(&self, key: &str) -> Result<Option<&BTreeMap<String, ContextValue>>> {
        read_map(&self.values, key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_and_defaults() {
        let mut ctx = ContextStore::new();
        assert!(ctx.get("task").is_none());
        assert_eq!(ctx.get_or("task", "Unknown"), ContextValue::from("Unknown"));

        ctx.set(keys::TASK, "write report");
        ctx.set(keys::ATTEMPTS, 0);

        assert_eq!(ctx.get_str(keys::TASK).unwrap(), Some("write report"));
        assert_eq!(ctx.get_int(keys::ATTEMPTS).unwrap(), Some(0));
        assert_eq!(ctx.get_int_or("missing", 3).unwrap(), 3);
        assert_eq!(ctx.get_str_or(keys::STATUS, "unknown").unwrap(), "unknown");
    }

    #[test]
    fn test_type_mismatch_fails() {
        let ctx = ContextStore::new().with(keys::ATTEMPTS, "two");

        let err = ctx.get_int(keys::ATTEMPTS).unwrap_err();
        assert!(matches!(
            err,
            Error::ContextType { ref key, expected: "integer", found: "string" } if key == "attempts"
        ));
        assert!(ctx.get_map(keys::ATTEMPTS).is_err());
    }

    #[test]
    fn test_increment() {
        let mut ctx = ContextStore::new();
        assert_eq!(ctx.increment(keys::ATTEMPTS, 1).unwrap(), 1);
        assert_eq!(ctx.increment(keys::ATTEMPTS, 2).unwrap(), 3);
        assert_eq!(ctx.get_int(keys::ATTEMPTS).unwrap(), Some(3));

        ctx.set(keys::STATUS, "received");
        assert!(ctx.increment(keys::STATUS, 1).is_err());
        // failed increment leaves the value untouched
        assert_eq!(ctx.get_str(keys::STATUS).unwrap(), Some("received"));
    }

    #[test]
    fn test_increment_overflow() {
        let mut ctx = ContextStore::new().with("n", i64::MAX);
        assert!(matches!(ctx.increment("n", 1), Err(Error::InvalidInput(_))));
        assert_eq!(ctx.get_int("n").unwrap(), Some(i64::MAX));

        ctx.set("m", i64::MIN);
        assert!(ctx.increment("m", -1).is_err());
        assert_eq!(ctx.increment("m", 1).unwrap(), i64::MIN + 1);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut ctx = ContextStore::new().with(keys::STATUS, status::RECEIVED);
        let snap = ctx.snapshot();

        ctx.set(keys::STATUS, status::COMPLETED);

        assert_eq!(snap.get_str(keys::STATUS).unwrap(), Some("received"));
        assert_eq!(ctx.get_str(keys::STATUS).unwrap(), Some("completed"));
    }

    #[test]
    fn test_truthiness() {
        let mut nested = BTreeMap::new();
        nested.insert("k".to_string(), ContextValue::from(1));

        let ctx = ContextStore::with_values([
            ("empty", ContextValue::from("")),
            ("zero", ContextValue::from(0)),
            ("text", ContextValue::from("yes")),
            ("count", ContextValue::from(2)),
            ("map", ContextValue::from(nested)),
            ("empty_map", ContextValue::Map(BTreeMap::new())),
        ]);

        assert!(!ctx.is_truthy("empty"));
        assert!(!ctx.is_truthy("zero"));
        assert!(!ctx.is_truthy("empty_map"));
        assert!(!ctx.is_truthy("absent"));
        assert!(ctx.is_truthy("text"));
        assert!(ctx.is_truthy("count"));
        assert!(ctx.is_truthy("map"));
    }

    #[test]
    fn test_serde_untagged() {
        let ctx = ContextStore::new()
            .with(keys::TASK, "t")
            .with(keys::ATTEMPTS, 2);

        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json, serde_json::json!({ "attempts": 2, "task": "t" }));

        let back: ContextStore = serde_json::from_value(json).unwrap();
        assert_eq!(back, ctx);
    }
}
