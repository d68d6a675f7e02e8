//! Dependency reinstallation.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clipforge_core::ProjectConfig;
use clipforge_resolver::{ExecutableResolver, ResolveError, needs_shell, quote_for_shell};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::shutdown::{ProcessGroupGuard, terminate_child};

/// Package manager used for reinstalls.
pub const PACKAGE_MANAGER: &str = "npm";

/// Arguments for a forced reinstall.
pub const INSTALL_ARGS: &[&str] = &["install", "--force", "--no-audit", "--no-fund"];

/// Longest stderr excerpt kept in an error.
const MAX_ERROR_OUTPUT: usize = 2000;

/// SIGTERM-to-SIGKILL window for an install that overran its timeout.
pub const DEFAULT_INSTALL_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Package manager not available: {0}")]
    PackageManagerNotFound(#[from] ResolveError),

    #[error("Failed to start the package manager: {0}")]
    Spawn(#[source] io::Error),

    #[error("Dependency install did not finish within {0:?}")]
    TimedOut(Duration),

    #[error("Dependency install failed ({status}): {output}")]
    Failed { status: String, output: String },
}

/// Reinstalls the dependencies of a project.
#[async_trait]
pub trait DependencyInstaller: Send + Sync {
    async fn reinstall(&self, project_dir: &Path) -> Result<(), InstallError>;
}

/// `npm install --force`, bounded by a timeout.
///
/// npm runs in its own process group. A timeout tears the group down with
/// SIGTERM then SIGKILL; dropping the future (cancellation) kills the group
/// outright, so lifecycle scripts npm forked do not outlive the install.
pub struct NpmInstaller {
    resolver: Arc<ExecutableResolver>,
    custom_paths: Vec<PathBuf>,
    timeout: Duration,
    grace: Duration,
}

impl NpmInstaller {
    pub const fn new(resolver: Arc<ExecutableResolver>, timeout: Duration) -> Self {
        Self {
            resolver,
            custom_paths: Vec::new(),
            timeout,
            grace: DEFAULT_INSTALL_GRACE,
        }
    }

    pub fn from_config(config: &ProjectConfig, resolver: Arc<ExecutableResolver>) -> Self {
        Self {
            resolver,
            custom_paths: config.extra_paths.clone(),
            timeout: config.install_timeout,
            grace: config.termination_grace,
        }
    }

    #[must_use]
    pub const fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

#[async_trait]
impl DependencyInstaller for NpmInstaller {
    async fn reinstall(&self, project_dir: &Path) -> Result<(), InstallError> {
        let npm = self
            .resolver
            .resolve(PACKAGE_MANAGER, &self.custom_paths)
            .await?;
        let platform = self.resolver.platform();

        let mut cmd = if needs_shell(&npm.path, platform) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(quote_for_shell(&npm.path, platform));
            cmd
        } else {
            Command::new(&npm.path)
        };
        cmd.args(INSTALL_ARGS)
            .current_dir(project_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        info!(project = %project_dir.display(), npm = %npm.path.display(), "Reinstalling dependencies");
        let mut child = cmd.spawn().map_err(InstallError::Spawn)?;
        let group = ProcessGroupGuard::new(&child);
        let stdout = child.stdout.take().map(collect_output);
        let stderr = child.stderr.take().map(collect_output);

        let status = match timeout(self.timeout, child.wait()).await {
            Ok(result) => result.map_err(InstallError::Spawn)?,
            Err(_) => {
                warn!(timeout = ?self.timeout, "Dependency install timed out");
                if let Err(e) = terminate_child(&mut child, self.grace).await {
                    warn!(error = %e, "Failed to stop the package manager");
                }
                return Err(InstallError::TimedOut(self.timeout));
            }
        };
        // Helpers still holding the pipes would keep the readers open
        drop(group);
        if let Some(reader) = stdout {
            let _ = reader.await;
        }
        let stderr = match stderr {
            Some(reader) => reader.await.unwrap_or_default(),
            None => Vec::new(),
        };

        if status.success() {
            info!("Dependencies reinstalled");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&stderr);
            let trimmed = stderr.trim();
            let start = trimmed.len().saturating_sub(MAX_ERROR_OUTPUT);
            let start = (start..=trimmed.len())
                .find(|&i| trimmed.is_char_boundary(i))
                .unwrap_or(trimmed.len());
            Err(InstallError::Failed {
                status: status.to_string(),
                output: trimmed[start..].to_string(),
            })
        }
    }
}

fn collect_output<R>(mut stream: R) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Err(e) = stream.read_to_end(&mut buf).await {
            debug!(error = %e, "Package manager output stream closed");
        }
        buf
    })
}
