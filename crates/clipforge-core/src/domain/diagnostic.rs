//! Environment diagnostic issues.

use serde::{Deserialize, Serialize};

/// Known incompatibility signatures in a project's configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// No package manifest in the project directory.
    MissingManifest,
    /// A manifest or config file exists but is not valid JSON.
    UnparseableConfig,
    /// Required framework packages are not declared.
    MissingDependency,
    /// ES module package with a CommonJS preview config.
    ModuleSystemMismatch,
    /// Preview config file is absent.
    MissingPreviewConfig,
    /// TypeScript config is absent.
    MissingTsConfig,
    /// TypeScript config lacks a JSX setting.
    MissingJsxSetting,
    /// The JavaScript runtime could not be resolved.
    MissingRuntime,
}

impl IssueKind {
    /// Whether an automatic repair step exists for this kind.
    pub const fn is_fixable(self) -> bool {
        !matches!(
            self,
            Self::MissingManifest | Self::UnparseableConfig | Self::MissingRuntime
        )
    }
}

/// One problem found by a diagnosis pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticIssue {
    pub kind: IssueKind,
    pub description: String,
    pub suggested_fix: String,
}

impl DiagnosticIssue {
    pub fn new(
        kind: IssueKind,
        description: impl Into<String>,
        suggested_fix: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            description: description.into(),
            suggested_fix: suggested_fix.into(),
        }
    }
}
