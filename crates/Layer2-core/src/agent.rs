//! Agent - a named participant with its hand-off table

use crate::handoff::HandoffTable;
use std::collections::BTreeSet;

/// Agent definition
///
/// The hand-off table is editable through `handoffs_mut` while the agent is
/// still being set up. Once the agent is added to a swarm it is shared
/// read-only across runs.
#[derive(Debug, Clone)]
pub struct Agent {
    name: String,
    description: Option<String>,
    system_message: Option<String>,
    handoffs: HandoffTable,
    functions: BTreeSet<String>,
}

impl Agent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            system_message: None,
            handoffs: HandoffTable::new(),
            functions: BTreeSet::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }

    pub fn with_handoffs(mut self, handoffs: HandoffTable) -> Self {
        self.handoffs = handoffs;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn system_message(&self) -> Option<&str> {
        self.system_message.as_deref()
    }

    pub fn handoffs(&self) -> &HandoffTable {
        &self.handoffs
    }

    pub fn handoffs_mut(&mut self) -> &mut HandoffTable {
        &mut self.handoffs
    }

    /// Names of the functions this agent may call
    pub fn functions(&self) -> &BTreeSet<String> {
        &self.functions
    }

    pub fn allow_function(&mut self, name: impl Into<String>) {
        self.functions.insert(name.into());
    }

    pub fn can_call(&self, function: &str) -> bool {
        self.functions.contains(function)
    }
}
