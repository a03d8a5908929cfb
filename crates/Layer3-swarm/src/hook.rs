//! Run hooks
//!
//! Observers called at fixed points of a run. Every method has a no-op
//! default, so a hook overrides only what it needs. Hooks see state but
//! cannot change routing.

use crate::outcome::RunOutcome;
use crate::turn::TurnOutput;
use async_trait::async_trait;
use baton_core::{ContextStore, TransferTarget};
use baton_foundation::Error;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ============================================================================
// RunHook Trait
// ============================================================================

#[async_trait]
pub trait RunHook: Send + Sync {
    /// Hook name (for logs)
    fn name(&self) -> &str {
        "unnamed-hook"
    }

    async fn on_run_start(&self, _run_id: &str, _entry_agent: &str, _context: &ContextStore) {}

    async fn before_turn(&self, _run_id: &str, _round: u32, _agent: &str) {}

    async fn after_turn(&self, _run_id: &str, _round: u32, _agent: &str, _output: &TurnOutput) {}

    async fn on_handoff(&self, _run_id: &str, _round: u32, _from: &str, _to: &TransferTarget) {}

    /// Run reached a final status
    async fn on_run_end(&self, _outcome: &RunOutcome) {}

    /// Run stopped with an error
    async fn on_run_error(&self, _run_id: &str, _error: &Error) {}
}

// ============================================================================
// LoggingHook
// ============================================================================

/// Emits tracing events for every hook point
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHook;

impl LoggingHook {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RunHook for LoggingHook {
    fn name(&self) -> &str {
        "logging"
    }

    async fn on_run_start(&self, run_id: &str, entry_agent: &str, context: &ContextStore) {
        info!(run_id, agent = entry_agent, keys = context.len(), "Run started");
    }

    async fn before_turn(&self, run_id: &str, round: u32, agent: &str) {
        debug!(run_id, round, agent, "Turn started");
    }

    async fn after_turn(&self, run_id: &str, round: u32, agent: &str, output: &TurnOutput) {
        debug!(
            run_id,
            round,
            agent,
            function = output.function_call.as_ref().map(|c| c.name.as_str()),
            "Turn finished"
        );
    }

    async fn on_handoff(&self, run_id: &str, round: u32, from: &str, to: &TransferTarget) {
        info!(run_id, round, agent = from, target = %to, "Hand-off");
    }

    async fn on_run_end(&self, outcome: &RunOutcome) {
        info!(
            run_id = %outcome.run_id,
            status = %outcome.status,
            rounds = outcome.rounds,
            agent = %outcome.last_agent,
            "Run finished"
        );
    }

    async fn on_run_error(&self, run_id: &str, error: &Error) {
        warn!(run_id, error = %error, "Run failed");
    }
}

// ============================================================================
// HookManager
// ============================================================================

/// Runs hooks in registration order
#[derive(Clone, Default)]
pub struct HookManager {
    hooks: Vec<Arc<dyn RunHook>>,
}

impl HookManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<H: RunHook + 'static>(&mut self, hook: H) {
        self.hooks.push(Arc::new(hook));
    }

    pub fn add_arc(&mut self, hook: Arc<dyn RunHook>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    pub async fn on_run_start(&self, run_id: &str, entry_agent: &str, context: &ContextStore) {
        for hook in &self.hooks {
            hook.on_run_start(run_id, entry_agent, context).await;
        }
    }

    pub async fn before_turn(&self, run_id: &str, round: u32, agent: &str) {
        for hook in &self.hooks {
            hook.before_turn(run_id, round, agent).await;
        }
    }

    pub async fn after_turn(&self, run_id: &str, round: u32, agent: &str, output: &TurnOutput) {
        for hook in &self.hooks {
            hook.after_turn(run_id, round, agent, output).await;
        }
    }

    pub async fn on_handoff(&self, run_id: &str, round: u32, from: &str, to: &TransferTarget) {
        for hook in &self.hooks {
            hook.on_handoff(run_id, round, from, to).await;
        }
    }

    pub async fn on_run_end(&self, outcome: &RunOutcome) {
        for hook in &self.hooks {
            hook.on_run_end(outcome).await;
        }
    }

    pub async fn on_run_error(&self, run_id: &str, error: &Error) {
        for hook in &self.hooks {
            hook.on_run_error(run_id, error).await;
        }
    }
}

impl std::fmt::Debug for HookManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookManager")
            .field("hooks", &self.names())
            .finish()
    }
}
