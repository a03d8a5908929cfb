//! # baton-swarm
//!
//! Swarm runtime for Baton (Layer3):
//!
//! - **Swarm**: the run loop; routes between agents until a terminal hand-off
//!   or the round budget runs out
//! - **TurnExecutor**: seam to whatever produces an agent's turn
//! - **RunHook**: observers for run / turn / hand-off events
//! - **CancelHandle**: cooperative cancellation between turns
//! - **TaskPipeline**: receive → process (bounded retry) → report functions
//!
//! ## Example
//!
//! ```ignore
//! use baton_swarm::{Swarm, ScriptedTurns, TaskPipeline};
//!
//! let mut functions = FunctionRegistry::new();
//! TaskPipeline::new("receiver", "processor", "reporter").register(&mut functions)?;
//!
//! let swarm = Swarm::builder()
//!     .agents([receiver, processor, reporter])
//!     .functions(functions)
//!     .executor(ScriptedTurns::new())
//!     .hook(LoggingHook::new())
//!     .build()?;
//!
//! let outcome = swarm.run("receiver", "Compute 2+2", ContextStore::new(), Some(10)).await?;
//! println!("{} after {} rounds", outcome.status, outcome.rounds);
//! ```

pub mod cancel;
pub mod hook;
pub mod outcome;
pub mod pipeline;
pub mod swarm;
pub mod turn;

pub use cancel::{CancelHandle, CancelToken};
pub use hook::{HookManager, LoggingHook, RunHook};
pub use outcome::{HandoffRecord, RunOutcome, RunStatus};
pub use pipeline::{StepStatus, TaskPipeline, FINALIZE_REPORT, PROCESS_TASK, RECORD_TASK};
pub use swarm::{Swarm, SwarmBuilder};
pub use turn::{FunctionCall, ScriptedTurn, ScriptedTurns, TurnExecutor, TurnOutput, TurnRequest};
