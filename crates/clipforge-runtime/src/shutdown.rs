//! Graceful termination for `tokio::process::Child` with SIGTERM → SIGKILL escalation.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tokio::time::timeout;
use tracing::debug;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Terminate a child and everything in its process group, then reap it.
///
/// # Strategy
/// 1. Send SIGTERM to the child's process group and wait up to `grace`
/// 2. If still running, send SIGKILL to the group
/// 3. Wait for reaping (required to avoid zombies)
///
/// The child must have been spawned as a process-group leader; launcher
/// shims (`npx` → `node`) would otherwise outlive it.
///
/// # Platform behavior
/// - Unix: group signals via nix
/// - Windows: immediate `.kill()` (no graceful shutdown available)
pub async fn terminate_child(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    if let Some(status) = child.try_wait()? {
        return Ok(status);
    }

    #[cfg(unix)]
    {
        terminate_unix(child, grace).await
    }

    #[cfg(not(unix))]
    {
        let _ = grace;
        child.kill().await?;
        child.wait().await
    }
}

/// Kills a child's whole process group when dropped.
///
/// Covers the paths where the owning future is cancelled or the leader has
/// already been reaped and forked helpers may still be running. The child
/// must have been spawned as a process-group leader.
pub struct ProcessGroupGuard {
    pid: Option<u32>,
}

impl ProcessGroupGuard {
    pub fn new(child: &Child) -> Self {
        Self { pid: child.id() }
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pid) = self.pid {
            kill_group(pid);
        }
    }
}

#[cfg(unix)]
fn kill_group(pid: u32) {
    if let Ok(pgid) = i32::try_from(pid) {
        // ESRCH: the group is already gone
        let _ = signal::killpg(Pid::from_raw(pgid), Signal::SIGKILL);
    }
}

// Children are not grouped off unix; `kill_on_drop` covers the leader.
#[cfg(not(unix))]
const fn kill_group(_pid: u32) {}

#[cfg(unix)]
async fn terminate_unix(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    let pid = child
        .id()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "child has no PID"))?;
    let pgid = Pid::from_raw(i32::try_from(pid).map_err(io::Error::other)?);

    // Phase 1: SIGTERM to the group
    if let Err(e) = signal::killpg(pgid, Signal::SIGTERM) {
        if e == nix::errno::Errno::ESRCH {
            return child.wait().await;
        }
        return Err(io::Error::other(e));
    }

    if let Ok(result) = timeout(grace, child.wait()).await {
        // Stragglers that ignored SIGTERM after the leader exited
        let _ = signal::killpg(pgid, Signal::SIGKILL);
        return result;
    }

    // Phase 2: SIGKILL
    debug!(pid = pid, "Grace period elapsed, sending SIGKILL");
    let _ = signal::killpg(pgid, Signal::SIGKILL);
    child.kill().await?;

    // Phase 3: reap
    child.wait().await
}
