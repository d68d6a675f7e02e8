//! Launch and safe-launch handlers.
//!
//! A successful launch keeps the CLI in the foreground until SIGINT/SIGTERM
//! or until the server exits, then tears every session down.

use std::time::Duration;

use clipforge_core::LaunchOutcome;
use clipforge_runtime::ProcessSupervisor;
use tracing::{info, warn};

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{print_json, print_launch_outcome, print_log_tail};

const REAP_INTERVAL: Duration = Duration::from_secs(1);

pub async fn execute(ctx: &CliContext, port: Option<u16>) -> Result<(), CliError> {
    let port = ctx.port(port)?;
    ctx.supervisor.install_shutdown_hook();

    let outcome = ctx.supervisor.launch(port).await;
    report_outcome(ctx, &outcome)?;
    if !outcome.is_ready() {
        return Err(launch_failure(&outcome));
    }
    run_foreground(ctx).await;
    Ok(())
}

pub async fn execute_safe(ctx: &CliContext, port: Option<u16>) -> Result<(), CliError> {
    let port = ctx.port(port)?;
    ctx.supervisor.install_shutdown_hook();

    match ctx.safe_launcher().launch_safe(port).await {
        Ok(report) => {
            if ctx.json {
                print_json(&report)?;
            } else {
                if let Some(fixes) = &report.fixes {
                    for action in &fixes.actions {
                        println!("Fixed: {action}");
                    }
                }
                if report.reinstalled {
                    println!("Dependencies reinstalled.");
                }
                print_launch_outcome(&report.launch);
            }
            run_foreground(ctx).await;
            Ok(())
        }
        Err(err) => {
            if let Some(outcome) = &err.outcome {
                report_outcome(ctx, outcome)?;
            }
            Err(err.into())
        }
    }
}

fn report_outcome(ctx: &CliContext, outcome: &LaunchOutcome) -> Result<(), CliError> {
    if ctx.json {
        return print_json(outcome);
    }
    print_launch_outcome(outcome);
    if let Some(id) = outcome.session_id.filter(|_| !outcome.is_ready()) {
        print_log_tail(&ctx.supervisor.session_logs(id));
    }
    Ok(())
}

fn launch_failure(outcome: &LaunchOutcome) -> CliError {
    let kind = outcome
        .error_kind
        .map_or_else(|| "Unknown".to_string(), |k| k.to_string());
    CliError::Failed(format!("launch did not become ready ({kind})"))
}

/// Block until shutdown is requested or no session is left, then stop everything.
async fn run_foreground(ctx: &CliContext) {
    let supervisor = &ctx.supervisor;
    let reaper = supervisor.spawn_reaper(REAP_INTERVAL);
    if !ctx.json {
        println!("Press Ctrl+C to stop.");
    }

    tokio::select! {
        () = supervisor.wait_for_shutdown() => info!("Shutdown requested"),
        () = all_sessions_gone(supervisor) => warn!("Preview server exited"),
    }

    reaper.abort();
    let stopped = supervisor.shutdown_all().await;
    info!(stopped = stopped, "All sessions stopped");
}

async fn all_sessions_gone(supervisor: &ProcessSupervisor) {
    let mut ticker = tokio::time::interval(REAP_INTERVAL);
    loop {
        ticker.tick().await;
        if supervisor.sessions().is_empty() {
            return;
        }
    }
}
