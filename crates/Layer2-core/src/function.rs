//! Function Registry
//!
//! Functions are registered once at setup as
//! `name -> (caller, executor, handler)`. Only the declared caller may invoke a
//! function; anything else is a `Registration` error. A handler runs
//! synchronously inside the turn that called it and may return an explicit
//! transfer target, which then overrides the caller's hand-off table.

use crate::context::{ContextSnapshot, ContextStore};
use crate::transfer::TransferTarget;
use baton_foundation::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Handler signature: JSON arguments plus the run's context store
pub type FunctionHandler =
    Arc<dyn Fn(&Value, &mut ContextStore) -> Result<FunctionReply> + Send + Sync>;

// ============================================================================
// Replies
// ============================================================================

/// What a handler returns
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionReply {
    pub message: String,
    pub target: Option<TransferTarget>,
}

impl FunctionReply {
    /// Reply without a routing decision (the hand-off table decides)
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            target: None,
        }
    }

    pub fn transfer(message: impl Into<String>, target: TransferTarget) -> Self {
        Self {
            message: message.into(),
            target: Some(target),
        }
    }

    pub fn terminate(message: impl Into<String>) -> Self {
        Self::transfer(message, TransferTarget::Terminate)
    }
}

/// Result of one function invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallResult {
    pub function: String,
    pub message: String,
    /// Context as the handler left it
    pub context: ContextSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TransferTarget>,
}

// ============================================================================
// FunctionSpec
// ============================================================================

/// A registered function and the agents allowed to call / execute it
#[derive(Clone)]
pub struct FunctionSpec {
    name: String,
    description: String,
    caller: String,
    executor: String,
    handler: FunctionHandler,
}

impl FunctionSpec {
    pub fn new<F>(
        name: impl Into<String>,
        caller: impl Into<String>,
        executor: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(&Value, &mut ContextStore) -> Result<FunctionReply> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            caller: caller.into(),
            executor: executor.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn caller(&self) -> &str {
        &self.caller
    }

    pub fn executor(&self) -> &str {
        &self.executor
    }
}

impl fmt::Debug for FunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionSpec")
            .field("name", &self.name)
            .field("caller", &self.caller)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// FunctionRegistry
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, FunctionSpec>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function; names are unique
    pub fn register(&mut self, spec: FunctionSpec) -> Result<()> {
        if spec.name.trim().is_empty() {
            return Err(Error::InvalidInput("function name is empty".to_string()));
        }
        if spec.caller.trim().is_empty() || spec.executor.trim().is_empty() {
            return Err(Error::Registration(format!(
                "function '{}' needs both a caller and an executor",
                spec.name
            )));
        }
        if self.functions.contains_key(&spec.name) {
            return Err(Error::Registration(format!(
                "function '{}' is already registered",
                spec.name
            )));
        }

        debug!(
            function = %spec.name,
            caller = %spec.caller,
            executor = %spec.executor,
            "Registered function"
        );
        self.functions.insert(spec.name.clone(), spec);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionSpec> {
        self.functions.values()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Every caller and executor must be a known agent
    pub fn validate_agents<F>(&self, is_known: F) -> Result<()>
    where
        F: Fn(&str) -> bool,
    {
        for spec in self.functions.values() {
            for (role, agent) in [("caller", &spec.caller), ("executor", &spec.executor)] {
                if !is_known(agent.as_str()) {
                    return Err(Error::Registration(format!(
                        "function '{}' names unknown {} agent '{}'",
                        spec.name, role, agent
                    )));
                }
            }
        }
        Ok(())
    }

    /// Invoke `name` on behalf of `caller`
    pub fn invoke(
        &self,
        name: &str,
        caller: &str,
        arguments: &Value,
        context: &mut ContextStore,
    ) -> Result<FunctionCallResult> {
        let spec = self
            .functions
            .get(name)
            .ok_or_else(|| Error::Registration(format!("unknown function '{}'", name)))?;

        if spec.caller != caller {
            return Err(Error::Registration(format!(
                "agent '{}' is not allowed to call '{}' (registered caller: '{}')",
                caller, name, spec.caller
            )));
        }

        debug!(function = name, caller, executor = %spec.executor, "Invoking function");
        let reply = (spec.handler)(arguments, context)?;

        Ok(FunctionCallResult {
            function: name.to_string(),
            message: reply.message,
            context: context.snapshot(),
            target: reply.target,
        })
    }
}

// ============================================================================
// Argument helpers
// ============================================================================

/// Required string argument
pub fn arg_str<'a>(arguments: &'a Value, field: &str) -> Result<&'a str> {
    arguments
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidInput(format!("missing string argument '{}'", field)))
}

/// Optional string argument with a default
pub fn arg_str_or<'a>(arguments: &'a Value, field: &str, default: &'a str) -> &'a str {
    arguments
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or(default)
}
