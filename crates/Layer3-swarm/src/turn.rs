//! Turn execution seam
//!
//! The swarm does not talk to a language model. Each turn is delegated to a
//! `TurnExecutor`, which sees the active agent, the context store and the
//! transcript, and returns the agent's output plus at most one function call.

use async_trait::async_trait;
use baton_core::{Agent, ContextStore, Transcript};
use baton_foundation::{Error, ModelConfig, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};

// ============================================================================
// Turn types
// ============================================================================

/// Everything an executor may look at for one turn
#[derive(Debug, Clone, Copy)]
pub struct TurnRequest<'a> {
    pub run_id: &'a str,
    pub round: u32,
    pub agent: &'a Agent,
    pub context: &'a ContextStore,
    pub transcript: &'a Transcript,
    pub model: &'a ModelConfig,
}

/// A function the agent asked to call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// What an agent produced in one turn
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TurnOutput {
    /// Conversational output (may be empty when the agent only calls a function)
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl TurnOutput {
    pub fn reply(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            function_call: None,
        }
    }

    pub fn call(message: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            message: message.into(),
            function_call: Some(FunctionCall::new(name, arguments)),
        }
    }
}

/// Runs one agent turn
///
/// Failures should be reported as `Error::AgentTurn`; the swarm wraps any
/// other error into one. Turns are never retried automatically.
#[async_trait]
pub trait TurnExecutor: Send + Sync {
    async fn execute(&self, request: TurnRequest<'_>) -> Result<TurnOutput>;
}

// ============================================================================
// ScriptedTurns
// ============================================================================

/// One scripted step
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedTurn {
    Output(TurnOutput),
    Fail(String),
}

impl ScriptedTurn {
    pub fn reply(message: impl Into<String>) -> Self {
        ScriptedTurn::Output(TurnOutput::reply(message))
    }

    pub fn call(name: impl Into<String>, arguments: Value) -> Self {
        ScriptedTurn::Output(TurnOutput::call("", name, arguments))
    }

    pub fn call_with_message(
        message: impl Into<String>,
        name: impl Into<String>,
        arguments: Value,
    ) -> Self {
        ScriptedTurn::Output(TurnOutput::call(message, name, arguments))
    }

    pub fn fail(message: impl Into<String>) -> Self {
        ScriptedTurn::Fail(message.into())
    }
}

/// Deterministic executor replaying per-agent queues of turns
///
/// When an agent's queue runs dry its `repeat` turn is used, if one was set;
/// otherwise the turn fails with `Error::AgentTurn`.
#[derive(Debug, Default)]
pub struct ScriptedTurns {
    queues: Mutex<HashMap<String, VecDeque<ScriptedTurn>>>,
    repeat: HashMap<String, ScriptedTurn>,
}

impl ScriptedTurns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append turns to an agent's queue
    pub fn script(self, agent: impl Into<String>, turns: impl IntoIterator<Item = ScriptedTurn>) -> Self {
        self.queues
            .lock()
            .entry(agent.into())
            .or_default()
            .extend(turns);
        self
    }

    /// Turn used whenever the agent's queue is empty
    pub fn repeat(mut self, agent: impl Into<String>, turn: ScriptedTurn) -> Self {
        self.repeat.insert(agent.into(), turn);
        self
    }

    /// Scripted turns not yet consumed for `agent`
    pub fn remaining(&self, agent: &str) -> usize {
        self.queues.lock().get(agent).map_or(0, VecDeque::len)
    }

    fn next_turn(&self, agent: &str) -> Option<ScriptedTurn> {
        let queued = self
            .queues
            .lock()
            .get_mut(agent)
            .and_then(VecDeque::pop_front);
        queued.or_else(|| self.repeat.get(agent).cloned())
    }
}

#[async_trait]
impl TurnExecutor for ScriptedTurns {
    async fn execute(&self, request: TurnRequest<'_>) -> Result<TurnOutput> {
        let agent = request.agent.name();
        match self.next_turn(agent) {
            Some(ScriptedTurn::Output(output)) => Ok(output),
            Some(ScriptedTurn::Fail(message)) => Err(Error::agent_turn(agent, message)),
            None => Err(Error::agent_turn(agent, "no scripted turn left")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request<'a>(
        agent: &'a Agent,
        context: &'a ContextStore,
        transcript: &'a Transcript,
        model: &'a ModelConfig,
    ) -> TurnRequest<'a> {
        TurnRequest {
            run_id: "test",
            round: 1,
            agent,
            context,
            transcript,
            model,
        }
    }

    #[tokio::test]
    async fn test_scripted_turns_replay_in_order() {
        let executor = ScriptedTurns::new()
            .script(
                "processor",
                [
                    ScriptedTurn::reply("thinking"),
                    ScriptedTurn::call("process_task", json!({ "status": "success" })),
                ],
            )
            .repeat("processor", ScriptedTurn::reply("idle"));

        let agent = Agent::new("processor");
        let ctx = ContextStore::new();
        let transcript = Transcript::new();
        let model = ModelConfig::default();

        let first = executor
            .execute(request(&agent, &ctx, &transcript, &model))
            .await
            .unwrap();
        assert_eq!(first, TurnOutput::reply("thinking"));

        let second = executor
            .execute(request(&agent, &ctx, &transcript, &model))
            .await
            .unwrap();
        assert_eq!(second.function_call.unwrap().name, "process_task");
        assert_eq!(executor.remaining("processor"), 0);

        let third = executor
            .execute(request(&agent, &ctx, &transcript, &model))
            .await
            .unwrap();
        assert_eq!(third.message, "idle");
    }

    #[tokio::test]
    async fn test_scripted_failure_and_exhaustion() {
        let executor = ScriptedTurns::new().script("a", [ScriptedTurn::fail("upstream 503")]);
        let agent = Agent::new("a");
        let ctx = ContextStore::new();
        let transcript = Transcript::new();
        let model = ModelConfig::default();

        let err = executor
            .execute(request(&agent, &ctx, &transcript, &model))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Agent turn failed: a - upstream 503");

        let err = executor
            .execute(request(&agent, &ctx, &transcript, &model))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AgentTurn { .. }));
    }
}
