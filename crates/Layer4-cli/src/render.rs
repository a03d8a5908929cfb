//! Outcome rendering for the terminal

use baton_core::MessageRole;
use baton_swarm::RunOutcome;
use std::fmt::Write;

/// Human-readable summary: status, path, context, transcript
pub fn render_text(outcome: &RunOutcome) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Run {}", outcome.run_id);
    let _ = writeln!(out, "  status : {}", outcome.status);
    let _ = writeln!(out, "  rounds : {}", outcome.rounds);
    let _ = writeln!(out, "  last   : {}", outcome.last_agent);
    let _ = writeln!(out, "  path   : {}", outcome.agent_path().join(" -> "));

    if !outcome.context.is_empty() {
        let _ = writeln!(out, "\nContext");
        for (key, value) in outcome.context.iter() {
            let _ = writeln!(out, "  {} = {}", key, value);
        }
    }

    let _ = writeln!(out, "\nTranscript");
    for message in outcome.transcript.messages() {
        let tag = match message.role {
            MessageRole::User => "user".to_string(),
            MessageRole::Agent => message.sender.clone(),
            MessageRole::Function => format!("fn:{}", message.sender),
        };
        for (i, line) in message.content.lines().enumerate() {
            if i == 0 {
                let _ = writeln!(out, "  [{}] {}", tag, line);
            } else {
                let _ = writeln!(out, "  {:width$} {}", "", line, width = tag.len() + 2);
            }
        }
    }

    out
}

pub fn render_json(outcome: &RunOutcome) -> serde_json::Result<String> {
    serde_json::to_string_pretty(outcome)
}
