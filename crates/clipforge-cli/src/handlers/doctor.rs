//! Doctor and fix handlers.

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::print_json;

/// Diagnose the project; exits non-zero when issues are found.
pub async fn diagnose(ctx: &CliContext) -> Result<(), CliError> {
    let report = ctx.doctor().diagnose().await?;
    if ctx.json {
        print_json(&report)?;
    } else {
        println!("Platform: {}", report.platform);
        println!(
            "Node.js:  {}",
            report.runtime_version.as_deref().unwrap_or("not found")
        );
        if report.healthy {
            println!("No issues found.");
        } else {
            println!("\n{} issue(s):", report.issues.len());
            for issue in &report.issues {
                println!("  - {}", issue.description);
                println!("    fix: {}", issue.suggested_fix);
            }
            if !report.fixes.is_empty() {
                println!("\nRun 'clipforge fix' to apply the automatic fixes.");
            }
        }
    }

    if report.healthy {
        Ok(())
    } else {
        Err(CliError::Failed(format!(
            "{} issue(s) found",
            report.issues.len()
        )))
    }
}

pub fn fix(ctx: &CliContext) -> Result<(), CliError> {
    let report = ctx.doctor().auto_fix()?;
    if ctx.json {
        print_json(&report)?;
    } else if report.actions.is_empty() {
        println!("Nothing to fix.");
    } else {
        for action in &report.actions {
            println!("  - {action}");
        }
    }

    if report.success {
        Ok(())
    } else {
        Err(CliError::Failed("some fixes were skipped".to_string()))
    }
}
