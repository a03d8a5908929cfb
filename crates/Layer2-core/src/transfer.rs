//! Transfer Target - where control goes after a turn

use serde::{Deserialize, Serialize};
use std::fmt;

/// Destination of a hand-off
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "agent", rename_all = "snake_case")]
pub enum TransferTarget {
    /// Hand control to the named agent (may be the current one)
    Agent(String),
    /// End the run; no further turns execute
    Terminate,
}

impl TransferTarget {
    pub fn agent(name: impl Into<String>) -> Self {
        TransferTarget::Agent(name.into())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferTarget::Terminate)
    }

    /// Agent name, `None` for the terminal marker
    pub fn agent_name(&self) -> Option<&str> {
        match self {
            TransferTarget::Agent(name) => Some(name.as_str()),
            TransferTarget::Terminate => None,
        }
    }
}

impl fmt::Display for TransferTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferTarget::Agent(name) => write!(f, "{}", name),
            TransferTarget::Terminate => write!(f, "<terminate>"),
        }
    }
}
