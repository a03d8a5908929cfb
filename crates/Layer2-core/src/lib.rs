//! # baton-core
//!
//! Routing model for Baton (Layer2):
//!
//! - `context`: Context Store shared by every agent in a run
//! - `transfer`: Transfer Target (agent or terminate)
//! - `condition`: LLM / predicate / context-flag conditions
//! - `handoff`: Handoff Table and transfer resolution
//! - `agent`: Agent definitions
//! - `function`: Function Registry (caller / executor / handler)
//! - `transcript`: run message history
//!
//! ## Example
//!
//! ```ignore
//! use baton_core::{Agent, TransferTarget};
//!
//! let mut processor = Agent::new("processor");
//! processor
//!     .handoffs_mut()
//!     .add_llm_condition("needs help", TransferTarget::agent("helper"))
//!     .set_after_work(TransferTarget::agent("finisher"));
//! ```

pub mod agent;
pub mod condition;
pub mod context;
pub mod function;
pub mod handoff;
pub mod transcript;
pub mod transfer;

pub use agent::Agent;
pub use condition::{Condition, ConditionEvaluator, ContextPredicate, FixedEvaluator};
pub use context::{keys, status, ContextSnapshot, ContextStore, ContextValue};
pub use function::{
    arg_str, arg_str_or, FunctionCallResult, FunctionHandler, FunctionRegistry, FunctionReply,
    FunctionSpec,
};
pub use handoff::{resolve_transfer, HandoffRule, HandoffTable};
pub use transcript::{Message, MessageRole, Transcript};
pub use transfer::TransferTarget;

// Re-export foundation types used across the public API
pub use baton_foundation::{Error, Result};
