//! Rendering of launch outcomes and session output.

use clipforge_core::{LaunchOutcome, LaunchState};
use clipforge_runtime::LogEntry;
use serde::Serialize;

use crate::error::CliError;

/// Lines of captured output shown after a failed launch.
pub const LOG_TAIL_LINES: usize = 20;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::Io(format!("failed to encode output: {e}")))?;
    println!("{rendered}");
    Ok(())
}

pub fn print_launch_outcome(outcome: &LaunchOutcome) {
    match outcome.state {
        LaunchState::Ready => {
            println!("Preview server ready at {}", outcome.url.as_deref().unwrap_or("--"));
        }
        LaunchState::Failed | LaunchState::Timeout => {
            let kind = outcome
                .error_kind
                .map_or_else(|| "Unknown".to_string(), |k| k.to_string());
            println!("Launch {} ({kind})", outcome_label(outcome.state));
            if let Some(message) = &outcome.message {
                println!("  {message}");
            }
            if let Some(hint) = &outcome.hint {
                println!("  Hint: {hint}");
            }
        }
    }
}

pub fn print_log_tail(entries: &[LogEntry]) {
    if entries.is_empty() {
        return;
    }
    println!("\nLast output:");
    let start = entries.len().saturating_sub(LOG_TAIL_LINES);
    for entry in &entries[start..] {
        println!("  [{}] {}", entry.stream.as_str(), entry.line);
    }
}

const fn outcome_label(state: LaunchState) -> &'static str {
    match state {
        LaunchState::Ready => "ready",
        LaunchState::Failed => "failed",
        LaunchState::Timeout => "timed out",
    }
}
