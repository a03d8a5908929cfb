//! Regex-backed condition evaluator
//!
//! Stands in for a language model when judging natural-language hand-off
//! conditions: each prompt maps to a pattern tested against the most recent
//! agent message.

use async_trait::async_trait;
use baton_core::{ConditionEvaluator, ContextStore, Message, MessageRole};
use baton_foundation::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Default)]
pub struct RegexEvaluator {
    patterns: HashMap<String, Regex>,
}

impl RegexEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a condition prompt to a pattern
    pub fn with_pattern(mut self, prompt: impl Into<String>, pattern: &str) -> Result<Self> {
        let prompt = prompt.into();
        let regex = Regex::new(pattern).map_err(|e| {
            Error::InvalidInput(format!("invalid pattern for '{}': {}", prompt, e))
        })?;
        self.patterns.insert(prompt, regex);
        Ok(self)
    }
}

#[async_trait]
impl ConditionEvaluator for RegexEvaluator {
    async fn evaluate(
        &self,
        prompt: &str,
        recent: &[Message],
        _context: &ContextStore,
    ) -> Result<bool> {
        let Some(regex) = self.patterns.get(prompt) else {
            return Ok(false);
        };
        let matched = recent
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Agent)
            .is_some_and(|m| regex.is_match(&m.content));
        debug!(prompt, matched, "Evaluated condition");
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_matches_last_agent_message() {
        let evaluator = RegexEvaluator::new()
            .with_pattern("needs help", r"(?i)\bstuck\b")
            .unwrap();
        let ctx = ContextStore::new();

        let stuck = [
            Message::agent("helper", "all good"),
            Message::agent("processor", "I am STUCK here"),
            Message::function("note", "ignored"),
        ];
        assert!(evaluator.evaluate("needs help", &stuck, &ctx).await.unwrap());

        let fine = [
            Message::agent("processor", "stuck before"),
            Message::agent("processor", "solved it"),
        ];
        assert!(!evaluator.evaluate("needs help", &fine, &ctx).await.unwrap());
        assert!(!evaluator.evaluate("unknown", &stuck, &ctx).await.unwrap());
    }

    #[test]
    fn test_invalid_pattern() {
        let err = RegexEvaluator::new().with_pattern("x", "(").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
