//! Conditions - predicates behind conditional hand-off rules
//!
//! Three kinds, all stateless and evaluated fresh each turn:
//! - `Llm`: natural-language predicate, answered by a `ConditionEvaluator`
//! - `Predicate`: programmatic boolean over the context store
//! - `ContextFlag`: true when a context key holds a truthy value
//!
//! Only `Llm` conditions suspend (they await the evaluator). The other two
//! never touch the evaluator.

use crate::context::ContextStore;
use crate::transcript::Message;
use async_trait::async_trait;
use baton_foundation::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Programmatic condition over the context store
pub type ContextPredicate = Arc<dyn Fn(&ContextStore) -> bool + Send + Sync>;

// ============================================================================
// Condition
// ============================================================================

#[derive(Clone)]
pub enum Condition {
    /// Natural-language predicate judged against recent conversation
    Llm { prompt: String },

    /// Boolean callback; `label` is used for logs only
    Predicate {
        label: String,
        check: ContextPredicate,
    },

    /// Truthy context key
    ContextFlag { key: String },
}

impl Condition {
    pub fn llm(prompt: impl Into<String>) -> Self {
        Condition::Llm {
            prompt: prompt.into(),
        }
    }

    pub fn predicate<F>(label: impl Into<String>, check: F) -> Self
    where
        F: Fn(&ContextStore) -> bool + Send + Sync + 'static,
    {
        Condition::Predicate {
            label: label.into(),
            check: Arc::new(check),
        }
    }

    pub fn context_flag(key: impl Into<String>) -> Self {
        Condition::ContextFlag { key: key.into() }
    }

    /// Short description for logs
    pub fn describe(&self) -> String {
        match self {
            Condition::Llm { prompt } => format!("llm: {}", prompt),
            Condition::Predicate { label, .. } => format!("predicate: {}", label),
            Condition::ContextFlag { key } => format!("context: {}", key),
        }
    }

    /// Evaluate against the current context and conversation window
    pub async fn evaluate(
        &self,
        evaluator: &dyn ConditionEvaluator,
        context: &ContextStore,
        recent: &[Message],
    ) -> Result<bool> {
        match self {
            Condition::Llm { prompt } => evaluator.evaluate(prompt, recent, context).await,
            Condition::Predicate { check, .. } => Ok(check(context)),
            Condition::ContextFlag { key } => Ok(context.is_truthy(key)),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Llm { prompt } => f.debug_struct("Llm").field("prompt", prompt).finish(),
            Condition::Predicate { label, .. } => f
                .debug_struct("Predicate")
                .field("label", label)
                .finish_non_exhaustive(),
            Condition::ContextFlag { key } => {
                f.debug_struct("ContextFlag").field("key", key).finish()
            }
        }
    }
}

// ============================================================================
// ConditionEvaluator
// ============================================================================

/// Answers natural-language conditions
///
/// Implementations wrap a model call or a deterministic stub. Given the same
/// prompt and conversation, an implementation should give the same answer.
#[async_trait]
pub trait ConditionEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        prompt: &str,
        recent: &[Message],
        context: &ContextStore,
    ) -> Result<bool>;
}

// ============================================================================
// FixedEvaluator
// ============================================================================

/// Evaluator returning configured answers per prompt
///
/// Unknown prompts get the default answer (false unless changed). Every
/// evaluated prompt is recorded so tests can check evaluation order.
#[derive(Debug, Default)]
pub struct FixedEvaluator {
    answers: HashMap<String, bool>,
    default_answer: bool,
    calls: Mutex<Vec<String>>,
}

impl FixedEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(mut self, prompt: impl Into<String>, answer: bool) -> Self {
        self.answers.insert(prompt.into(), answer);
        self
    }

    pub fn with_default(mut self, answer: bool) -> Self {
        self.default_answer = answer;
        self
    }

    /// Prompts evaluated so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ConditionEvaluator for FixedEvaluator {
    async fn evaluate(
        &self,
        prompt: &str,
        _recent: &[Message],
        _context: &ContextStore,
    ) -> Result<bool> {
        self.calls.lock().push(prompt.to_string());
        Ok(self
            .answers
            .get(prompt)
            .copied()
            .unwrap_or(self.default_answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_llm_condition_uses_evaluator() {
        let evaluator = FixedEvaluator::new().with_answer("needs help", true);
        let ctx = ContextStore::new();

        assert!(Condition::llm("needs help")
            .evaluate(&evaluator, &ctx, &[])
            .await
            .unwrap());
        assert!(!Condition::llm("task completed")
            .evaluate(&evaluator, &ctx, &[])
            .await
            .unwrap());
        assert_eq!(evaluator.calls(), vec!["needs help", "task completed"]);
    }

    #[tokio::test]
    async fn test_local_conditions_skip_evaluator() {
        let evaluator = FixedEvaluator::new().with_default(true);
        let ctx = ContextStore::new().with("escalate", 1).with("attempts", 2);

        let flag = Condition::context_flag("escalate");
        let missing = Condition::context_flag("absent");
        let pred = Condition::predicate("attempts > 1", |c| {
            c.get_int_or("attempts", 0).unwrap_or(0) > 1
        });

        assert!(flag.evaluate(&evaluator, &ctx, &[]).await.unwrap());
        assert!(!missing.evaluate(&evaluator, &ctx, &[]).await.unwrap());
        assert!(pred.evaluate(&evaluator, &ctx, &[]).await.unwrap());
        assert!(evaluator.calls().is_empty());
    }

    #[test]
    fn test_describe() {
        assert_eq!(Condition::llm("x").describe(), "llm: x");
        assert_eq!(Condition::context_flag("k").describe(), "context: k");
        assert_eq!(
            Condition::predicate("p", |_| true).describe(),
            "predicate: p"
        );
    }
}
