//! Task pipeline - receive → process (bounded retry) → report
//!
//! Three functions around one task:
//!
//! ```text
//! receiver  ── record_task ──▶ processor
//! processor ── process_task ─┬─ success ───────────▶ reporter
//!                            ├─ failure, retries left ▶ processor
//!                            └─ failure, exhausted ──▶ reporter
//! reporter  ── finalize_report ──▶ terminate
//! ```
//!
//! A failure increments `attempts` by one. Once `attempts` reaches
//! `max_attempts` the task is marked failed and escalated to the reporter,
//! so the processing step never runs more than `max_attempts` times. No delay
//! is inserted between attempts.

use baton_core::{
    arg_str, arg_str_or, keys, status, ContextStore, FunctionRegistry, FunctionReply,
    FunctionSpec, TransferTarget,
};
use baton_foundation::{Error, Result, RetrySettings};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

pub const RECORD_TASK: &str = "record_task";
pub const PROCESS_TASK: &str = "process_task";
pub const FINALIZE_REPORT: &str = "finalize_report";

/// Outcome reported to `process_task`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Success,
    Failure,
}

impl StepStatus {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "success" => Ok(StepStatus::Success),
            "failure" => Ok(StepStatus::Failure),
            other => Err(Error::InvalidInput(format!(
                "status must be \"success\" or \"failure\", got \"{}\"",
                other
            ))),
        }
    }
}

// ============================================================================
// TaskPipeline
// ============================================================================

#[derive(Debug, Clone)]
pub struct TaskPipeline {
    receiver: String,
    processor: String,
    reporter: String,
    retry: RetrySettings,
}

impl TaskPipeline {
    pub fn new(
        receiver: impl Into<String>,
        processor: impl Into<String>,
        reporter: impl Into<String>,
    ) -> Self {
        Self {
            receiver: receiver.into(),
            processor: processor.into(),
            reporter: reporter.into(),
            retry: RetrySettings::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn processor(&self) -> &str {
        &self.processor
    }

    pub fn reporter(&self) -> &str {
        &self.reporter
    }

    /// Register the three functions, each callable only by its own agent
    pub fn register(&self, registry: &mut FunctionRegistry) -> Result<()> {
        let pipeline = Arc::new(self.clone());

        let p = Arc::clone(&pipeline);
        registry.register(
            FunctionSpec::new(RECORD_TASK, &self.receiver, &self.receiver, move |args, ctx| {
                p.record_task(args, ctx)
            })
            .with_description("Record the task and transfer to the processor"),
        )?;

        let p = Arc::clone(&pipeline);
        registry.register(
            FunctionSpec::new(PROCESS_TASK, &self.processor, &self.processor, move |args, ctx| {
                p.process_task(args, ctx)
            })
            .with_description("Report a processing result; retries or escalates on failure"),
        )?;

        let p = pipeline;
        registry.register(
            FunctionSpec::new(FINALIZE_REPORT, &self.reporter, &self.reporter, move |args, ctx| {
                p.finalize_report(args, ctx)
            })
            .with_description("Produce the final report and end the workflow"),
        )?;

        Ok(())
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// `{ "task_description": str }`
    pub fn record_task(&self, args: &Value, ctx: &mut ContextStore) -> Result<FunctionReply> {
        let task = arg_str(args, "task_description")?;

        ctx.set(keys::TASK, task);
        ctx.set(keys::ATTEMPTS, 0);
        ctx.set(keys::MAX_ATTEMPTS, self.retry.max_attempts);
        ctx.set(keys::STATUS, status::RECEIVED);
        ctx.set(keys::STARTED_AT, Utc::now().timestamp_millis());

        info!(task, max_attempts = self.retry.max_attempts, "Task received");

        Ok(FunctionReply::transfer(
            format!("Task to process: {}", task),
            TransferTarget::agent(&self.processor),
        ))
    }

    /// `{ "status": "success" | "failure", "result_message": str }`
    pub fn process_task(&self, args: &Value, ctx: &mut ContextStore) -> Result<FunctionReply> {
        let step = StepStatus::parse(arg_str(args, "status")?)?;
        let result_message = arg_str_or(args, "result_message", "");

        let max_attempts = ctx.get_int_or(keys::MAX_ATTEMPTS, i64::from(self.retry.max_attempts))?;
        let task = ctx.get_str_or(keys::TASK, "Unknown")?;

        if step == StepStatus::Success {
            ctx.set(keys::STATUS, status::COMPLETED);
            ctx.set(keys::RESULT, result_message);
            info!(task = %task, "Task completed");

            return Ok(FunctionReply::transfer(
                format!("Task completed: {}", result_message),
                TransferTarget::agent(&self.reporter),
            ));
        }

        // an exhausted budget is never incremented past max_attempts
        let mut attempts = ctx.get_int_or(keys::ATTEMPTS, 0)?;
        if attempts < max_attempts {
            attempts = ctx.increment(keys::ATTEMPTS, 1)?;
        }

        let timed_out = self.elapsed_exceeded(ctx)?;
        if attempts >= max_attempts || timed_out {
            ctx.set(keys::STATUS, status::FAILED);
            let result = if timed_out && attempts < max_attempts {
                format!("Failed after {} attempts (time limit exceeded)", attempts)
            } else {
                format!("Failed after {} attempts", attempts)
            };
            ctx.set(keys::RESULT, result);
            warn!(task = %task, attempts, max_attempts, timed_out, "Task failed, escalating");

            return Ok(FunctionReply::transfer(
                format!("Task failed after {} attempts: {}", attempts, result_message),
                TransferTarget::agent(&self.reporter),
            ));
        }

        ctx.set(keys::STATUS, status::RETRYING);
        info!(task = %task, attempts, max_attempts, "Retrying task");

        Ok(FunctionReply::transfer(
            format!(
                "Retry {}/{}. Error: {}. Task: {}",
                attempts + 1,
                max_attempts,
                result_message,
                task
            ),
            TransferTarget::agent(&self.processor),
        ))
    }

    /// `{ "summary": str }`
    pub fn finalize_report(&self, args: &Value, ctx: &mut ContextStore) -> Result<FunctionReply> {
        let summary = arg_str_or(args, "summary", "");
        let task = ctx.get_str_or(keys::TASK, "Unknown")?;
        let task_status = ctx.get_str_or(keys::STATUS, "unknown")?;
        let attempts = ctx.get_int_or(keys::ATTEMPTS, 0)?;

        info!(task = %task, status = %task_status, attempts, "Final report");

        let report = [
            format!("Workflow completed. Status: {}", task_status),
            format!("Task: {}", task),
            format!("Attempts: {}", attempts),
            format!("Summary: {}", summary),
        ]
        .join("\n");

        Ok(FunctionReply::terminate(report))
    }

    fn elapsed_exceeded(&self, ctx: &ContextStore) -> Result<bool> {
        let Some(limit) = self.retry.max_elapsed() else {
            return Ok(false);
        };
        let Some(started_at) = ctx.get_int(keys::STARTED_AT)? else {
            return Ok(false);
        };
        let elapsed_ms = Utc::now().timestamp_millis().saturating_sub(started_at);
        Ok(elapsed_ms >= 0 && elapsed_ms as u128 >= limit.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pipeline() -> TaskPipeline {
        TaskPipeline::new("receiver", "processor", "reporter")
    }

    fn failure(reason: &str) -> Value {
        json!({ "status": "failure", "result_message": reason })
    }

    #[test]
    fn test_record_task_seeds_context() {
        let mut ctx = ContextStore::new();
        let reply = pipeline()
            .record_task(&json!({ "task_description": "sum 1..10" }), &mut ctx)
            .unwrap();

        assert_eq!(reply.message, "Task to process: sum 1..10");
        assert_eq!(reply.target, Some(TransferTarget::agent("processor")));
        assert_eq!(ctx.get_str(keys::TASK).unwrap(), Some("sum 1..10"));
        assert_eq!(ctx.get_int(keys::ATTEMPTS).unwrap(), Some(0));
        assert_eq!(ctx.get_int(keys::MAX_ATTEMPTS).unwrap(), Some(3));
        assert_eq!(ctx.get_str(keys::STATUS).unwrap(), Some(status::RECEIVED));
        assert!(ctx.get_int(keys::STARTED_AT).unwrap().is_some());
    }

    #[test]
    fn test_three_failures_escalate() {
        let p = pipeline();
        let mut ctx = ContextStore::new();
        p.record_task(&json!({ "task_description": "t" }), &mut ctx)
            .unwrap();

        let reply = p.process_task(&failure("e1"), &mut ctx).unwrap();
        assert_eq!(reply.message, "Retry 2/3. Error: e1. Task: t");
        assert_eq!(reply.target, Some(TransferTarget::agent("processor")));
        assert_eq!(ctx.get_str(keys::STATUS).unwrap(), Some(status::RETRYING));

        let reply = p.process_task(&failure("e2"), &mut ctx).unwrap();
        assert_eq!(reply.message, "Retry 3/3. Error: e2. Task: t");

        let reply = p.process_task(&failure("e3"), &mut ctx).unwrap();
        assert_eq!(reply.message, "Task failed after 3 attempts: e3");
        assert_eq!(reply.target, Some(TransferTarget::agent("reporter")));
        assert_eq!(ctx.get_int(keys::ATTEMPTS).unwrap(), Some(3));
        assert_eq!(ctx.get_str(keys::STATUS).unwrap(), Some(status::FAILED));
        assert_eq!(
            ctx.get_str(keys::RESULT).unwrap(),
            Some("Failed after 3 attempts")
        );

        // further failures never push attempts past the budget
        p.process_task(&failure("e4"), &mut ctx).unwrap();
        assert_eq!(ctx.get_int(keys::ATTEMPTS).unwrap(), Some(3));
    }

    #[test]
    fn test_success_goes_to_reporter_regardless_of_attempts() {
        let p = pipeline();
        let mut ctx = ContextStore::new();
        p.record_task(&json!({ "task_description": "t" }), &mut ctx)
            .unwrap();
        p.process_task(&failure("flaky"), &mut ctx).unwrap();

        let reply = p
            .process_task(
                &json!({ "status": "success", "result_message": "42" }),
                &mut ctx,
            )
            .unwrap();

        assert_eq!(reply.message, "Task completed: 42");
        assert_eq!(reply.target, Some(TransferTarget::agent("reporter")));
        assert_eq!(ctx.get_str(keys::STATUS).unwrap(), Some(status::COMPLETED));
        assert_eq!(ctx.get_str(keys::RESULT).unwrap(), Some("42"));
        assert_eq!(ctx.get_int(keys::ATTEMPTS).unwrap(), Some(1));
    }

    #[test]
    fn test_max_attempts_one_escalates_immediately() {
        let p = pipeline().with_retry(RetrySettings {
            max_attempts: 1,
            max_elapsed_secs: None,
        });
        let mut ctx = ContextStore::new();
        p.record_task(&json!({ "task_description": "t" }), &mut ctx)
            .unwrap();

        let reply = p.process_task(&failure("boom"), &mut ctx).unwrap();
        assert_eq!(reply.target, Some(TransferTarget::agent("reporter")));
        assert_eq!(ctx.get_int(keys::ATTEMPTS).unwrap(), Some(1));
    }

    #[test]
    fn test_elapsed_bound_escalates_early() {
        let p = pipeline().with_retry(RetrySettings {
            max_attempts: 5,
            max_elapsed_secs: Some(60),
        });
        let mut ctx = ContextStore::new();
        p.record_task(&json!({ "task_description": "t" }), &mut ctx)
            .unwrap();
        // pretend the task was recorded two minutes ago
        ctx.set(
            keys::STARTED_AT,
            Utc::now().timestamp_millis() - 120_000,
        );

        let reply = p.process_task(&failure("slow"), &mut ctx).unwrap();
        assert_eq!(reply.target, Some(TransferTarget::agent("reporter")));
        assert_eq!(ctx.get_int(keys::ATTEMPTS).unwrap(), Some(1));
        assert_eq!(
            ctx.get_str(keys::RESULT).unwrap(),
            Some("Failed after 1 attempts (time limit exceeded)")
        );
    }

    #[test]
    fn test_finalize_report_terminates() {
        let mut ctx = ContextStore::new()
            .with(keys::TASK, "t")
            .with(keys::STATUS, status::COMPLETED)
            .with(keys::ATTEMPTS, 0);

        let reply = pipeline()
            .finalize_report(&json!({ "summary": "all good" }), &mut ctx)
            .unwrap();

        assert_eq!(reply.target, Some(TransferTarget::Terminate));
        assert!(reply.message.starts_with("Workflow completed. Status: completed"));
        assert!(reply.message.contains("Summary: all good"));
    }

    #[test]
    fn test_bad_arguments() {
        let mut ctx = ContextStore::new();
        let err = pipeline()
            .process_task(&json!({ "status": "maybe" }), &mut ctx)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = pipeline().record_task(&json!({}), &mut ctx).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_register_binds_callers() {
        let mut registry = FunctionRegistry::new();
        pipeline().register(&mut registry).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get(PROCESS_TASK).unwrap().caller(), "processor");
        assert_eq!(registry.get(FINALIZE_REPORT).unwrap().executor(), "reporter");

        let mut ctx = ContextStore::new();
        let err = registry
            .invoke(RECORD_TASK, "processor", &json!({ "task_description": "t" }), &mut ctx)
            .unwrap_err();
        assert!(matches!(err, Error::Registration(_)));
    }
}
