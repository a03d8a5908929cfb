//! Run status and outcome

use baton_core::{ContextSnapshot, Transcript, TransferTarget};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Run state machine
///
/// ```text
/// Initialized → Running → { Completed, Terminated, RoundLimitExceeded, Error }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Initialized,
    Running,
    /// Terminal hand-off with a success status in the context
    Completed,
    /// Terminal hand-off without a success status
    Terminated,
    /// Round budget used up before any terminal hand-off (not an error)
    RoundLimitExceeded,
    Error,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Initialized | RunStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Initialized => "INITIALIZED",
            RunStatus::Running => "RUNNING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Terminated => "TERMINATED",
            RunStatus::RoundLimitExceeded => "ROUND_LIMIT_EXCEEDED",
            RunStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resolved hand-off
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffRecord {
    pub round: u32,
    pub from: String,
    pub to: TransferTarget,
    /// True when a function result supplied the target
    pub explicit: bool,
}

/// Result of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub run_id: String,
    pub status: RunStatus,
    pub context: ContextSnapshot,
    pub transcript: Transcript,
    /// Turns executed
    pub rounds: u32,
    /// Agent that ran the final turn
    pub last_agent: String,
    pub handoffs: Vec<HandoffRecord>,
}

impl RunOutcome {
    /// Agents that took a turn, in order
    pub fn agent_path(&self) -> Vec<&str> {
        self.handoffs.iter().map(|h| h.from.as_str()).collect()
    }
}
