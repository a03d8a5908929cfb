//! Reference workflows
//!
//! - pipeline: receiver → processor (bounded retry) → reporter
//! - handoffs: greeter → processor → helper / finisher

use crate::evaluator::RegexEvaluator;
use baton_core::{
    arg_str_or, keys, status, Agent, FunctionRegistry, FunctionReply, FunctionSpec,
    TransferTarget,
};
use baton_foundation::{Result, SwarmConfig};
use baton_swarm::{
    LoggingHook, ScriptedTurn, ScriptedTurns, Swarm, TaskPipeline, FINALIZE_REPORT, PROCESS_TASK,
    RECORD_TASK,
};
use serde_json::json;

pub const NEEDS_HELP: &str = "needs help";
pub const TASK_COMPLETED: &str = "task completed";
pub const DEFAULT_HELP_PATTERN: &str = r"(?i)\b(stuck|help)\b";
pub const DEFAULT_DONE_PATTERN: &str = r"(?i)\b(done|completed?)\b";

// ============================================================================
// Pipeline
// ============================================================================

/// Task pipeline whose processor fails `failures` times before succeeding
pub fn pipeline_swarm(config: &SwarmConfig, task: &str, failures: u32) -> Result<Swarm> {
    let mut functions = FunctionRegistry::new();
    TaskPipeline::new("receiver", "processor", "reporter")
        .with_retry(config.retry.clone())
        .register(&mut functions)?;

    let processor_turns = (1..=failures)
        .map(|n| {
            ScriptedTurn::call(
                PROCESS_TASK,
                json!({ "status": "failure", "result_message": format!("attempt {} failed", n) }),
            )
        })
        .chain(std::iter::once(ScriptedTurn::call(
            PROCESS_TASK,
            json!({ "status": "success", "result_message": format!("processed '{}'", task) }),
        )));

    let executor = ScriptedTurns::new()
        .script(
            "receiver",
            [ScriptedTurn::call_with_message(
                "Recording the task.",
                RECORD_TASK,
                json!({ "task_description": task }),
            )],
        )
        .script("processor", processor_turns)
        .script(
            "reporter",
            [ScriptedTurn::call(
                FINALIZE_REPORT,
                json!({ "summary": "pipeline finished" }),
            )],
        );

    Swarm::builder()
        .agents([
            Agent::new("receiver").with_description("Receives the task"),
            Agent::new("processor").with_description("Processes the task"),
            Agent::new("reporter").with_description("Reports the outcome"),
        ])
        .functions(functions)
        .executor(executor)
        .hook(LoggingHook::new())
        .config(config.clone())
        .build()
}

// ============================================================================
// Handoffs
// ============================================================================

/// Greeter / processor / helper / finisher wiring
///
/// With `stuck` the processor first asks for help, goes to the helper, and
/// finishes on its second turn.
pub fn handoffs_swarm(
    config: &SwarmConfig,
    task: &str,
    help_pattern: &str,
    stuck: bool,
) -> Result<Swarm> {
    let mut greeter = Agent::new("greeter").with_description("Greets and forwards the task");
    greeter
        .handoffs_mut()
        .set_after_work(TransferTarget::agent("processor"));

    let mut processor = Agent::new("processor").with_description("Works on the task");
    processor
        .handoffs_mut()
        .add_llm_conditions([
            (NEEDS_HELP, TransferTarget::agent("helper")),
            (TASK_COMPLETED, TransferTarget::agent("finisher")),
        ])
        .set_after_work(TransferTarget::agent("finisher"));

    let mut helper = Agent::new("helper").with_description("Unblocks the processor");
    helper
        .handoffs_mut()
        .set_after_work(TransferTarget::agent("processor"));

    let mut finisher = Agent::new("finisher").with_description("Wraps up");
    finisher.handoffs_mut().set_after_work(TransferTarget::Terminate);

    let finish_task = FunctionSpec::new("finish_task", "finisher", "finisher", |args, ctx| {
        let summary = arg_str_or(args, "summary", "");
        ctx.set(keys::STATUS, status::COMPLETED);
        ctx.set(keys::RESULT, summary);
        Ok(FunctionReply::message(format!("Finished: {}", summary)))
    })
    .with_description("Record the outcome; the finisher's after-work ends the run");

    let mut processor_turns = Vec::new();
    if stuck {
        processor_turns.push(ScriptedTurn::reply(format!(
            "I am stuck on '{}' and need help.",
            task
        )));
    }
    processor_turns.push(ScriptedTurn::reply(format!("Task '{}' is done.", task)));

    let executor = ScriptedTurns::new()
        .script(
            "greeter",
            [ScriptedTurn::reply(format!(
                "Hello! Passing '{}' to the processor.",
                task
            ))],
        )
        .script("processor", processor_turns)
        .script(
            "helper",
            [ScriptedTurn::reply("Try splitting it into smaller steps.")],
        )
        .script(
            "finisher",
            [ScriptedTurn::call(
                "finish_task",
                json!({ "summary": format!("'{}' handled", task) }),
            )],
        );

    let evaluator = RegexEvaluator::new()
        .with_pattern(NEEDS_HELP, help_pattern)?
        .with_pattern(TASK_COMPLETED, DEFAULT_DONE_PATTERN)?;

    Swarm::builder()
        .agents([greeter, processor, helper, finisher])
        .function(finish_task)
        .executor(executor)
        .evaluator(evaluator)
        .hook(LoggingHook::new())
        .config(config.clone())
        .build()
}
