//! Candidate verification and the native command locator.
//!
//! Both run short-lived subprocesses under a hard timeout; the child is
//! killed if the timeout fires.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use clipforge_core::Platform;
use tokio::process::Command;
use tracing::debug;

use crate::shell::{needs_shell, quote_for_shell};

/// Flag passed to candidates to prove they run.
pub const VERSION_FLAG: &str = "--version";

/// Why a candidate failed verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("exited with {0}")]
    ExitStatus(String),

    #[error("could not run: {0}")]
    Spawn(String),
}

/// Runs a trivial command against a candidate executable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Returns the first line of the version output on success.
    async fn verify(&self, path: &Path) -> Result<String, VerifyError>;
}

/// Asks the operating system where a command lives.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SystemLocator: Send + Sync {
    /// First hit of `which`/`where`, if any.
    async fn locate(&self, command: &str) -> Option<PathBuf>;
}

/// Production verifier: `<path> --version` must exit 0 within the timeout.
pub struct ProcessVerifier {
    timeout: Duration,
    platform: Platform,
}

impl ProcessVerifier {
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            platform: Platform::current(),
        }
    }
}

#[async_trait]
impl Verifier for ProcessVerifier {
    async fn verify(&self, path: &Path) -> Result<String, VerifyError> {
        let mut cmd = if needs_shell(path, self.platform) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C")
                .arg(quote_for_shell(path, self.platform))
                .arg(VERSION_FLAG);
            cmd
        } else {
            let mut cmd = Command::new(path);
            cmd.arg(VERSION_FLAG);
            cmd
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(VerifyError::Spawn(e.to_string())),
            Err(_) => return Err(VerifyError::Timeout(self.timeout)),
        };

        if !output.status.success() {
            return Err(VerifyError::ExitStatus(output.status.to_string()));
        }

        let version = first_line(&output.stdout)
            .or_else(|| first_line(&output.stderr))
            .unwrap_or_default();
        debug!(path = %path.display(), version = %version, "Verified executable");
        Ok(version)
    }
}

/// Production locator backed by `which` (Unix) or `where` (Windows).
pub struct CommandLocator {
    timeout: Duration,
    platform: Platform,
}

impl CommandLocator {
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            platform: Platform::current(),
        }
    }
}

#[async_trait]
impl SystemLocator for CommandLocator {
    async fn locate(&self, command: &str) -> Option<PathBuf> {
        let mut cmd = Command::new(self.platform.locator_command());
        cmd.arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .ok()?
            .ok()?;
        if !output.status.success() {
            return None;
        }
        first_line(&output.stdout).map(PathBuf::from)
    }
}

fn first_line(bytes: &[u8]) -> Option<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}
