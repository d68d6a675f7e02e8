//! Diagnose → fix → reinstall → launch.
//!
//! The only place where the doctor and the supervisor compose. Any step
//! failure aborts the chain and is reported with the phase it came from.

use std::fmt;
use std::sync::Arc;

use clipforge_core::{LaunchOutcome, LaunchState};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::doctor::{DiagnosisReport, Doctor, FixReport};
use crate::install::DependencyInstaller;
use crate::supervisor::ProcessSupervisor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchPhase {
    Diagnose,
    Fix,
    Reinstall,
    Launch,
}

impl fmt::Display for LaunchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Diagnose => "diagnose",
            Self::Fix => "fix",
            Self::Reinstall => "reinstall",
            Self::Launch => "launch",
        })
    }
}

/// A safe launch that stopped at `phase`.
#[derive(Debug, Error)]
#[error("Safe launch failed during {phase}: {message}")]
pub struct SafeLaunchError {
    pub phase: LaunchPhase,
    pub message: String,
    /// Set when the launch itself ran and did not become ready.
    pub outcome: Option<LaunchOutcome>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SafeLaunchError {
    fn at(phase: LaunchPhase, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            phase,
            message: source.to_string(),
            outcome: None,
            source: Some(Box::new(source)),
        }
    }
}

/// Everything a successful safe launch did.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeLaunchReport {
    pub diagnosis: DiagnosisReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixes: Option<FixReport>,
    pub reinstalled: bool,
    pub launch: LaunchOutcome,
}

pub struct SafeLauncher {
    doctor: Doctor,
    supervisor: Arc<ProcessSupervisor>,
    installer: Arc<dyn DependencyInstaller>,
}

impl SafeLauncher {
    pub fn new(
        doctor: Doctor,
        supervisor: Arc<ProcessSupervisor>,
        installer: Arc<dyn DependencyInstaller>,
    ) -> Self {
        Self {
            doctor,
            supervisor,
            installer,
        }
    }

    pub const fn supervisor(&self) -> &Arc<ProcessSupervisor> {
        &self.supervisor
    }

    pub async fn launch_safe(&self, port: u16) -> Result<SafeLaunchReport, SafeLaunchError> {
        let diagnosis = self
            .doctor
            .diagnose()
            .await
            .map_err(|e| SafeLaunchError::at(LaunchPhase::Diagnose, e))?;

        let mut fixes = None;
        let mut reinstalled = false;
        if !diagnosis.healthy {
            info!(issues = diagnosis.issues.len(), "Project unhealthy, repairing before launch");
            let report = self
                .doctor
                .auto_fix()
                .map_err(|e| SafeLaunchError::at(LaunchPhase::Fix, e))?;
            if !report.success {
                return Err(SafeLaunchError {
                    phase: LaunchPhase::Fix,
                    message: report.actions.join("; "),
                    outcome: None,
                    source: None,
                });
            }
            fixes = Some(report);

            // A shutdown drops the install future, which kills the package manager
            tokio::select! {
                result = self.installer.reinstall(self.doctor.project_dir()) => {
                    result.map_err(|e| SafeLaunchError::at(LaunchPhase::Reinstall, e))?;
                }
                () = self.supervisor.wait_for_shutdown() => {
                    warn!("Shutdown requested during dependency reinstall");
                    return Err(SafeLaunchError {
                        phase: LaunchPhase::Reinstall,
                        message: "cancelled by shutdown".to_string(),
                        outcome: None,
                        source: None,
                    });
                }
            }
            reinstalled = true;
        }

        let launch = self.supervisor.launch(port).await;
        if launch.state != LaunchState::Ready {
            return Err(SafeLaunchError {
                phase: LaunchPhase::Launch,
                message: launch
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("{:?}", launch.state)),
                outcome: Some(launch),
                source: None,
            });
        }

        Ok(SafeLaunchReport {
            diagnosis,
            fixes,
            reinstalled,
            launch,
        })
    }
}
