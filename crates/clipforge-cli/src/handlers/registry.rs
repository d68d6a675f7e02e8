//! Repair, validate and remove handlers.

use clipforge_registry::RepairReport;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::print_json;

pub fn repair(ctx: &CliContext) -> Result<(), CliError> {
    let report = ctx.registry.repair()?;
    finish_repair(ctx, &report)
}

pub fn remove(ctx: &CliContext, name: &str) -> Result<(), CliError> {
    let report = ctx.registry.remove_component(name)?;
    if !ctx.json {
        println!("Removed {name}");
    }
    finish_repair(ctx, &report)
}

/// Read-only check; an unhealthy registry exits non-zero.
pub fn validate(ctx: &CliContext) -> Result<(), CliError> {
    let report = ctx.registry.validate()?;
    if ctx.json {
        print_json(&report)?;
    } else if report.healthy {
        println!(
            "Registry is healthy ({} component(s))",
            report.components_found
        );
    } else {
        println!("Registry has {} issue(s):", report.issues.len());
        for issue in &report.issues {
            println!("  - {issue}");
        }
        println!("Run 'clipforge repair' to regenerate the aggregation file.");
    }

    if report.healthy {
        Ok(())
    } else {
        Err(CliError::Failed("registry validation failed".to_string()))
    }
}

fn finish_repair(ctx: &CliContext, report: &RepairReport) -> Result<(), CliError> {
    if ctx.json {
        print_json(report)?;
    } else {
        println!("{}", report.message);
        for skipped in &report.skipped {
            println!("  skipped {}: {}", skipped.file.display(), skipped.reason);
        }
        for dup in &report.duplicates {
            println!(
                "  duplicate {}: kept {}, ignored {}",
                dup.name,
                dup.kept.display(),
                dup.dropped.display()
            );
        }
    }

    if report.success {
        Ok(())
    } else {
        Err(CliError::Failed(report.message.clone()))
    }
}
