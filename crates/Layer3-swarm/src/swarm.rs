//! Swarm runtime - the run loop
//!
//! Per turn:
//! 1. stop if cancellation was requested (`Error::Cancelled`)
//! 2. stop with `RoundLimitExceeded` once the round counter passes the budget
//! 3. run the active agent's turn; invoke its function call, if any
//! 4. resolve the next target (function target first, then the hand-off table)
//! 5. terminate → `Completed` / `Terminated`; agent → make it active, next round
//!
//! Routing and registration errors end the run in `Error` and are returned
//! to the caller. Turns within a run are strictly sequential. A `Swarm` is
//! read-only after `build`, so independent runs can share it concurrently;
//! each run owns its context store, transcript and round counter.

use crate::cancel::CancelToken;
use crate::hook::{HookManager, RunHook};
use crate::outcome::{HandoffRecord, RunOutcome, RunStatus};
use crate::turn::{TurnExecutor, TurnRequest};
use baton_core::{
    keys, resolve_transfer, Agent, Condition, ConditionEvaluator, ContextStore, FunctionRegistry,
    FunctionSpec, Transcript, TransferTarget,
};
use baton_foundation::{Error, Result, SwarmConfig};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

// ============================================================================
// Swarm
// ============================================================================

pub struct Swarm {
    agents: HashMap<String, Agent>,
    functions: FunctionRegistry,
    executor: Arc<dyn TurnExecutor>,
    evaluator: Option<Arc<dyn ConditionEvaluator>>,
    hooks: HookManager,
    config: SwarmConfig,
}

/// Mutable state of one run
struct RunState {
    run_id: String,
    status: RunStatus,
    active: String,
    last_agent: String,
    round: u32,
    turns: u32,
    context: ContextStore,
    transcript: Transcript,
    handoffs: Vec<HandoffRecord>,
}

impl Swarm {
    pub fn builder() -> SwarmBuilder {
        SwarmBuilder::new()
    }

    pub fn agent(&self, name: &str) -> Option<&Agent> {
        self.agents.get(name)
    }

    pub fn agent_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.agents.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Run from `entry_agent` until termination or the round budget runs out
    ///
    /// `max_rounds` falls back to the configured budget.
    pub async fn run(
        &self,
        entry_agent: &str,
        initial_message: impl Into<String>,
        context: ContextStore,
        max_rounds: Option<u32>,
    ) -> Result<RunOutcome> {
        self.run_with_cancel(
            entry_agent,
            initial_message,
            context,
            max_rounds,
            &CancelToken::none(),
        )
        .await
    }

    /// Same as `run`, checking `cancel` at the top of every turn
    pub async fn run_with_cancel(
        &self,
        entry_agent: &str,
        initial_message: impl Into<String>,
        context: ContextStore,
        max_rounds: Option<u32>,
        cancel: &CancelToken,
    ) -> Result<RunOutcome> {
        let max_rounds = max_rounds.unwrap_or(self.config.max_rounds);
        if max_rounds == 0 {
            return Err(Error::InvalidInput("max_rounds must be at least 1".to_string()));
        }
        if !self.agents.contains_key(entry_agent) {
            return Err(Error::Registration(format!(
                "unknown entry agent '{}'",
                entry_agent
            )));
        }

        let mut state = RunState {
            run_id: Uuid::new_v4().to_string(),
            status: RunStatus::Initialized,
            active: entry_agent.to_string(),
            last_agent: entry_agent.to_string(),
            round: 1,
            turns: 0,
            context,
            transcript: Transcript::new(),
            handoffs: Vec::new(),
        };
        state.transcript.add_user(initial_message);

        info!(
            run_id = %state.run_id,
            agent = entry_agent,
            max_rounds,
            "Starting run"
        );
        self.hooks
            .on_run_start(&state.run_id, entry_agent, &state.context)
            .await;

        state.status = RunStatus::Running;
        match self.drive(&mut state, max_rounds, cancel).await {
            Ok(status) => {
                state.status = status;
                let outcome = RunOutcome {
                    run_id: state.run_id,
                    status: state.status,
                    context: state.context.snapshot(),
                    transcript: state.transcript,
                    rounds: state.turns,
                    last_agent: state.last_agent,
                    handoffs: state.handoffs,
                };
                info!(
                    run_id = %outcome.run_id,
                    status = %outcome.status,
                    rounds = outcome.rounds,
                    "Run finished"
                );
                self.hooks.on_run_end(&outcome).await;
                Ok(outcome)
            }
            Err(e) => {
                state.status = RunStatus::Error;
                error!(
                    run_id = %state.run_id,
                    status = %state.status,
                    round = state.round,
                    agent = %state.active,
                    error = %e,
                    "Run stopped with error"
                );
                self.hooks.on_run_error(&state.run_id, &e).await;
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        state: &mut RunState,
        max_rounds: u32,
        cancel: &CancelToken,
    ) -> Result<RunStatus> {
        loop {
            if cancel.is_cancelled() {
                warn!(
                    run_id = %state.run_id,
                    round = state.round,
                    reason = cancel.reason().as_deref().unwrap_or(""),
                    "Run cancelled"
                );
                return Err(Error::Cancelled);
            }

            if state.round > max_rounds {
                warn!(run_id = %state.run_id, max_rounds, "Round limit exceeded");
                return Ok(RunStatus::RoundLimitExceeded);
            }

            let agent = self.agents.get(&state.active).ok_or_else(|| {
                Error::Registration(format!("unknown agent '{}'", state.active))
            })?;
            let round = state.round;

            self.hooks.before_turn(&state.run_id, round, agent.name()).await;
            debug!(run_id = %state.run_id, round, agent = agent.name(), "Executing turn");

            let output = self
                .executor
                .execute(TurnRequest {
                    run_id: &state.run_id,
                    round,
                    agent,
                    context: &state.context,
                    transcript: &state.transcript,
                    model: &self.config.model,
                })
                .await
                .map_err(|e| match e {
                    Error::AgentTurn { .. } | Error::Cancelled => e,
                    other => Error::agent_turn(agent.name(), other.to_string()),
                })?;
            state.turns = round;
            state.last_agent = agent.name().to_string();

            if !output.message.is_empty() {
                state.transcript.add_agent(agent.name(), &output.message);
            }
            self.hooks
                .after_turn(&state.run_id, round, agent.name(), &output)
                .await;

            let explicit = match &output.function_call {
                Some(call) => {
                    let result = self.functions.invoke(
                        &call.name,
                        agent.name(),
                        &call.arguments,
                        &mut state.context,
                    )?;
                    state.transcript.add_function(&call.name, &result.message);
                    result.target
                }
                None => None,
            };
            let was_explicit = explicit.is_some();

            let recent = state.transcript.recent(self.config.condition_window);
            let evaluator = self.evaluator();
            let target = resolve_transfer(
                explicit,
                agent.handoffs(),
                agent.name(),
                evaluator,
                &state.context,
                recent,
            )
            .await?;

            state.handoffs.push(HandoffRecord {
                round,
                from: agent.name().to_string(),
                to: target.clone(),
                explicit: was_explicit,
            });
            self.hooks
                .on_handoff(&state.run_id, round, agent.name(), &target)
                .await;

            match target {
                TransferTarget::Terminate => {
                    return self.final_status(&state.context);
                }
                TransferTarget::Agent(next) => {
                    if !self.agents.contains_key(&next) {
                        return Err(Error::Registration(format!(
                            "agent '{}' handed off to unknown agent '{}'",
                            agent.name(),
                            next
                        )));
                    }
                    debug!(run_id = %state.run_id, round, agent = agent.name(), target = %next, "Hand-off");
                    state.active = next;
                    state.round += 1;
                }
            }
        }
    }

    fn evaluator(&self) -> &dyn ConditionEvaluator {
        match &self.evaluator {
            Some(evaluator) => evaluator.as_ref(),
            None => &NO_LLM_CONDITIONS,
        }
    }

    /// A non-string `status` is a context type error, not a failed run
    fn final_status(&self, context: &ContextStore) -> Result<RunStatus> {
        let success = context
            .get_str(keys::STATUS)?
            .is_some_and(|s| self.config.is_success_status(s));
        Ok(if success {
            RunStatus::Completed
        } else {
            RunStatus::Terminated
        })
    }
}

impl fmt::Debug for Swarm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Swarm")
            .field("agents", &self.agent_names())
            .field("functions", &self.functions.names().collect::<Vec<_>>())
            .field("hooks", &self.hooks)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Stand-in evaluator for swarms without LLM conditions; `build` guarantees
/// it is never asked.
struct NoLlmConditions;

static NO_LLM_CONDITIONS: NoLlmConditions = NoLlmConditions;

#[async_trait::async_trait]
impl ConditionEvaluator for NoLlmConditions {
    async fn evaluate(
        &self,
        prompt: &str,
        _recent: &[baton_core::Message],
        _context: &ContextStore,
    ) -> Result<bool> {
        Err(Error::Config(format!(
            "no condition evaluator configured for '{}'",
            prompt
        )))
    }
}

// ============================================================================
// SwarmBuilder
// ============================================================================

/// Collects agents, functions and collaborators, then validates them eagerly
#[derive(Default)]
pub struct SwarmBuilder {
    agents: Vec<Agent>,
    functions: FunctionRegistry,
    pending_functions: Vec<FunctionSpec>,
    executor: Option<Arc<dyn TurnExecutor>>,
    evaluator: Option<Arc<dyn ConditionEvaluator>>,
    hooks: HookManager,
    config: SwarmConfig,
}

impl SwarmBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn agent(mut self, agent: Agent) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn agents(mut self, agents: impl IntoIterator<Item = Agent>) -> Self {
        self.agents.extend(agents);
        self
    }

    /// Use an already populated registry
    pub fn functions(mut self, registry: FunctionRegistry) -> Self {
        self.functions = registry;
        self
    }

    pub fn function(mut self, spec: FunctionSpec) -> Self {
        self.pending_functions.push(spec);
        self
    }

    pub fn executor<E: TurnExecutor + 'static>(mut self, executor: E) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    pub fn executor_arc(mut self, executor: Arc<dyn TurnExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn evaluator<C: ConditionEvaluator + 'static>(mut self, evaluator: C) -> Self {
        self.evaluator = Some(Arc::new(evaluator));
        self
    }

    pub fn evaluator_arc(mut self, evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn hook<H: RunHook + 'static>(mut self, hook: H) -> Self {
        self.hooks.add(hook);
        self
    }

    pub fn hook_arc(mut self, hook: Arc<dyn RunHook>) -> Self {
        self.hooks.add_arc(hook);
        self
    }

    pub fn config(mut self, config: SwarmConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate everything and freeze the swarm
    pub fn build(self) -> Result<Swarm> {
        self.config.validate()?;

        let executor = self
            .executor
            .ok_or_else(|| Error::Config("swarm needs a turn executor".to_string()))?;

        if self.agents.is_empty() {
            return Err(Error::InvalidInput("swarm needs at least one agent".to_string()));
        }

        let mut functions = self.functions;
        for spec in self.pending_functions {
            functions.register(spec)?;
        }

        let mut agents: HashMap<String, Agent> = HashMap::with_capacity(self.agents.len());
        for agent in self.agents {
            let name = agent.name().to_string();
            if name.trim().is_empty() {
                return Err(Error::InvalidInput("agent name is empty".to_string()));
            }
            if agents.insert(name.clone(), agent).is_some() {
                return Err(Error::Registration(format!("duplicate agent '{}'", name)));
            }
        }

        let mut uses_llm = false;
        for agent in agents.values() {
            let table = agent.handoffs();
            table.validate(agent.name())?;
            for target in table.referenced_agents() {
                if !agents.contains_key(target) {
                    return Err(Error::Registration(format!(
                        "agent '{}' hands off to unknown agent '{}'",
                        agent.name(),
                        target
                    )));
                }
            }
            uses_llm |= table
                .rules()
                .iter()
                .any(|r| matches!(r.condition, Condition::Llm { .. }));
        }

        if uses_llm && self.evaluator.is_none() {
            return Err(Error::Config(
                "LLM hand-off conditions need a condition evaluator".to_string(),
            ));
        }

        functions.validate_agents(|name| agents.contains_key(name))?;
        for spec in functions.iter() {
            if let Some(agent) = agents.get_mut(spec.caller()) {
                agent.allow_function(spec.name());
            }
        }

        info!(
            agents = agents.len(),
            functions = functions.len(),
            hooks = self.hooks.len(),
            "Swarm built"
        );

        Ok(Swarm {
            agents,
            functions,
            executor,
            evaluator: self.evaluator,
            hooks: self.hooks,
            config: self.config,
        })
    }
}
