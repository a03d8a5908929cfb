//! Handoff Table - per-agent routing
//!
//! ```text
//! explicit function target? ── yes ──▶ use it (table skipped)
//!          │ no
//!          ▼
//! rules in declared order ── first true ──▶ rule target
//!          │ none
//!          ▼
//! after-work fallback ── set ──▶ fallback target
//!          │ unset
//!          ▼
//!     Error::Routing
//! ```
//!
//! Rules are evaluated one at a time and stop at the first match, so later
//! conditions are never evaluated once an earlier one fires.

use crate::condition::{Condition, ConditionEvaluator};
use crate::context::ContextStore;
use crate::transcript::Message;
use crate::transfer::TransferTarget;
use baton_foundation::{Error, Result};
use tracing::debug;

/// Conditional rule: (condition, target)
#[derive(Debug, Clone)]
pub struct HandoffRule {
    pub condition: Condition,
    pub target: TransferTarget,
}

impl HandoffRule {
    pub fn new(condition: Condition, target: TransferTarget) -> Self {
        Self { condition, target }
    }
}

/// Ordered conditional rules plus one after-work fallback
#[derive(Debug, Clone, Default)]
pub struct HandoffTable {
    rules: Vec<HandoffRule>,
    after_work: Option<TransferTarget>,
}

impl HandoffTable {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Setup
    // ========================================================================

    /// Unconditional fallback used when no rule fires
    pub fn set_after_work(&mut self, target: TransferTarget) -> &mut Self {
        self.after_work = Some(target);
        self
    }

    pub fn add_rule(&mut self, rule: HandoffRule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn add_llm_condition(
        &mut self,
        prompt: impl Into<String>,
        target: TransferTarget,
    ) -> &mut Self {
        self.add_rule(HandoffRule::new(Condition::llm(prompt), target))
    }

    /// Several LLM conditions, appended in iteration order
    pub fn add_llm_conditions<P>(
        &mut self,
        conditions: impl IntoIterator<Item = (P, TransferTarget)>,
    ) -> &mut Self
    where
        P: Into<String>,
    {
        for (prompt, target) in conditions {
            self.add_llm_condition(prompt, target);
        }
        self
    }

    pub fn add_context_condition(
        &mut self,
        key: impl Into<String>,
        target: TransferTarget,
    ) -> &mut Self {
        self.add_rule(HandoffRule::new(Condition::context_flag(key), target))
    }

    pub fn add_condition<F>(
        &mut self,
        label: impl Into<String>,
        check: F,
        target: TransferTarget,
    ) -> &mut Self
    where
        F: Fn(&ContextStore) -> bool + Send + Sync + 'static,
    {
        self.add_rule(HandoffRule::new(Condition::predicate(label, check), target))
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn rules(&self) -> &[HandoffRule] {
        &self.rules
    }

    pub fn after_work(&self) -> Option<&TransferTarget> {
        self.after_work.as_ref()
    }

    /// No rules and no fallback (a terminal agent's table)
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.after_work.is_none()
    }

    /// Every agent name this table can route to
    pub fn referenced_agents(&self) -> impl Iterator<Item = &str> {
        self.rules
            .iter()
            .map(|r| &r.target)
            .chain(self.after_work.iter())
            .filter_map(TransferTarget::agent_name)
    }

    /// Conditional rules need a fallback behind them
    pub fn validate(&self, owner: &str) -> Result<()> {
        if !self.rules.is_empty() && self.after_work.is_none() {
            return Err(Error::Routing(format!(
                "agent '{}' has {} conditional hand-off(s) but no after-work fallback",
                owner,
                self.rules.len()
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// First matching rule in declared order, else the fallback
    pub async fn resolve(
        &self,
        owner: &str,
        evaluator: &dyn ConditionEvaluator,
        context: &ContextStore,
        recent: &[Message],
    ) -> Result<TransferTarget> {
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.condition.evaluate(evaluator, context, recent).await? {
                debug!(
                    agent = owner,
                    rule = index,
                    condition = %rule.condition.describe(),
                    target = %rule.target,
                    "Hand-off rule matched"
                );
                return Ok(rule.target.clone());
            }
        }

        match &self.after_work {
            Some(target) => {
                debug!(agent = owner, target = %target, "Using after-work hand-off");
                Ok(target.clone())
            }
            None => Err(Error::Routing(format!(
                "no hand-off rule matched for agent '{}' and no after-work target is set",
                owner
            ))),
        }
    }
}

/// Next target for a finished turn: an explicit function target wins outright
pub async fn resolve_transfer(
    explicit: Option<TransferTarget>,
    table: &HandoffTable,
    owner: &str,
    evaluator: &dyn ConditionEvaluator,
    context: &ContextStore,
    recent: &[Message],
) -> Result<TransferTarget> {
    if let Some(target) = explicit {
        debug!(agent = owner, target = %target, "Using function-supplied target");
        return Ok(target);
    }
    table.resolve(owner, evaluator, context, recent).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::FixedEvaluator;

    fn processor_table() -> HandoffTable {
        let mut table = HandoffTable::new();
        table
            .add_llm_condition("needs help", TransferTarget::agent("helper"))
            .set_after_work(TransferTarget::agent("finisher"));
        table
    }

    #[tokio::test]
    async fn test_condition_true_routes_to_rule_target() {
        let evaluator = FixedEvaluator::new().with_answer("needs help", true);
        let target = processor_table()
            .resolve("processor", &evaluator, &ContextStore::new(), &[])
            .await
            .unwrap();
        assert_eq!(target, TransferTarget::agent("helper"));
    }

    #[tokio::test]
    async fn test_condition_false_routes_to_fallback() {
        let evaluator = FixedEvaluator::new().with_answer("needs help", false);
        let target = processor_table()
            .resolve("processor", &evaluator, &ContextStore::new(), &[])
            .await
            .unwrap();
        assert_eq!(target, TransferTarget::agent("finisher"));
    }

    #[tokio::test]
    async fn test_first_match_wins_and_stops_evaluation() {
        let mut table = HandoffTable::new();
        table
            .add_llm_conditions([
                ("first", TransferTarget::agent("a")),
                ("second", TransferTarget::agent("b")),
                ("third", TransferTarget::agent("c")),
            ])
            .set_after_work(TransferTarget::Terminate);

        let evaluator = FixedEvaluator::new()
            .with_answer("second", true)
            .with_answer("third", true);

        let target = table
            .resolve("x", &evaluator, &ContextStore::new(), &[])
            .await
            .unwrap();

        assert_eq!(target, TransferTarget::agent("b"));
        assert_eq!(evaluator.calls(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_mixed_condition_kinds_keep_order() {
        let mut table = HandoffTable::new();
        table
            .add_context_condition("escalate", TransferTarget::agent("supervisor"))
            .add_condition(
                "failed",
                |c| c.get_str("status").ok().flatten() == Some("failed"),
                TransferTarget::agent("reporter"),
            )
            .set_after_work(TransferTarget::agent("processor"));

        let evaluator = FixedEvaluator::new();

        let ctx = ContextStore::new().with("status", "failed");
        let target = table.resolve("p", &evaluator, &ctx, &[]).await.unwrap();
        assert_eq!(target, TransferTarget::agent("reporter"));

        let ctx = ctx.with("escalate", "yes");
        let target = table.resolve("p", &evaluator, &ctx, &[]).await.unwrap();
        assert_eq!(target, TransferTarget::agent("supervisor"));
    }

    #[tokio::test]
    async fn test_empty_table_is_routing_error() {
        let evaluator = FixedEvaluator::new();
        let err = HandoffTable::new()
            .resolve("finisher", &evaluator, &ContextStore::new(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Routing(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_explicit_target_skips_table() {
        let evaluator = FixedEvaluator::new().with_default(true);
        let target = resolve_transfer(
            Some(TransferTarget::Terminate),
            &processor_table(),
            "processor",
            &evaluator,
            &ContextStore::new(),
            &[],
        )
        .await
        .unwrap();

        assert_eq!(target, TransferTarget::Terminate);
        assert!(evaluator.calls().is_empty());

        // explicit target works even on a table that cannot resolve
        let target = resolve_transfer(
            Some(TransferTarget::agent("x")),
            &HandoffTable::new(),
            "finisher",
            &evaluator,
            &ContextStore::new(),
            &[],
        )
        .await
        .unwrap();
        assert_eq!(target, TransferTarget::agent("x"));
    }

    #[test]
    fn test_validate_and_references() {
        let table = processor_table();
        assert!(table.validate("processor").is_ok());
        let refs: Vec<&str> = table.referenced_agents().collect();
        assert_eq!(refs, vec!["helper", "finisher"]);

        let mut dangling = HandoffTable::new();
        dangling.add_llm_condition("x", TransferTarget::agent("a"));
        assert!(matches!(dangling.validate("p"), Err(Error::Routing(_))));

        assert!(HandoffTable::new().validate("terminal").is_ok());
        assert!(HandoffTable::new().is_empty());
    }
}
