//! Environment diagnosis and automatic repair for a preview project.

mod checks;
mod fix;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clipforge_core::{DiagnosticIssue, IssueKind, Platform, ProjectConfig};
use clipforge_resolver::ExecutableResolver;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub use checks::{
    MANIFEST, PREVIEW_CONFIG_JS, PREVIEW_CONFIG_TS, REQUIRED_PACKAGES, TSCONFIG, inspect_project,
};
pub use fix::{DEFAULT_JSX, apply_fixes};

/// Executable whose version is reported as the runtime fingerprint.
pub const RUNTIME_EXECUTABLE: &str = "node";

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result of a diagnosis pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisReport {
    pub healthy: bool,
    pub issues: Vec<DiagnosticIssue>,
    /// Suggested remedies for the fixable issues, in issue order.
    pub fixes: Vec<String>,
    pub runtime_version: Option<String>,
    pub platform: Platform,
}

impl DiagnosisReport {
    pub fn has_issue(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|i| i.kind == kind)
    }
}

/// Result of an auto-fix pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixReport {
    /// False when some step had to be skipped.
    pub success: bool,
    pub actions: Vec<String>,
}

impl Default for FixReport {
    fn default() -> Self {
        Self {
            success: true,
            actions: Vec::new(),
        }
    }
}

impl FixReport {
    fn record(&mut self, action: String) {
        info!(action = %action, "Applied fix");
        self.actions.push(action);
    }

    fn skip(&mut self, reason: String) {
        warn!(reason = %reason, "Fix skipped");
        self.success = false;
        self.actions.push(format!("Skipped: {reason}"));
    }
}

/// Inspects and repairs one project directory.
pub struct Doctor {
    project_dir: PathBuf,
    resolver: Arc<ExecutableResolver>,
    custom_paths: Vec<PathBuf>,
}

impl Doctor {
    pub fn new(project_dir: impl Into<PathBuf>, resolver: Arc<ExecutableResolver>) -> Self {
        Self {
            project_dir: project_dir.into(),
            resolver,
            custom_paths: Vec::new(),
        }
    }

    pub fn from_config(config: &ProjectConfig, resolver: Arc<ExecutableResolver>) -> Self {
        Self::new(&config.project_dir, resolver).with_custom_paths(config.extra_paths.clone())
    }

    #[must_use]
    pub fn with_custom_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.custom_paths = paths;
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Run every check and fingerprint the environment.
    pub async fn diagnose(&self) -> Result<DiagnosisReport, DoctorError> {
        let mut issues = inspect_project(&self.project_dir)?;

        let runtime_version = match self
            .resolver
            .resolve(RUNTIME_EXECUTABLE, &self.custom_paths)
            .await
        {
            Ok(runtime) => Some(runtime.version),
            Err(e) => {
                issues.push(DiagnosticIssue::new(
                    IssueKind::MissingRuntime,
                    e.to_string(),
                    "Install Node.js or add its directory to CLIPFORGE_EXTRA_PATHS",
                ));
                None
            }
        };

        let fixes = issues
            .iter()
            .filter(|i| i.kind.is_fixable())
            .map(|i| i.suggested_fix.clone())
            .collect();
        let report = DiagnosisReport {
            healthy: issues.is_empty(),
            issues,
            fixes,
            runtime_version,
            platform: self.resolver.platform(),
        };

        info!(
            project = %self.project_dir.display(),
            healthy = report.healthy,
            issues = report.issues.len(),
            "Diagnosis complete"
        );
        Ok(report)
    }

    /// Apply the ordered repair steps. Safe to run repeatedly.
    pub fn auto_fix(&self) -> Result<FixReport, DoctorError> {
        apply_fixes(&self.project_dir)
    }
}
