//! What the supervisor launches.

use std::path::{Path, PathBuf};

use crate::readiness::DEFAULT_READY_MARKERS;

/// Placeholder substituted with the requested port in arguments and markers.
pub const PORT_PLACEHOLDER: &str = "{port}";

/// Program, arguments and readiness markers of a preview server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    /// Bare name or path, handed to the executable resolver.
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub ready_markers: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl LaunchCommand {
    pub fn new(program: impl Into<String>, args: &[&str], working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            working_dir: working_dir.into(),
            ready_markers: DEFAULT_READY_MARKERS.iter().map(|m| (*m).to_string()).collect(),
            env: Vec::new(),
        }
    }

    /// `npx remotion studio --port <port>` in the project directory.
    pub fn preview_server(project_dir: &Path) -> Self {
        Self::new(
            "npx",
            &["remotion", "studio", "--port", PORT_PLACEHOLDER],
            project_dir,
        )
    }

    #[must_use]
    pub fn with_ready_markers(mut self, markers: &[&str]) -> Self {
        self.ready_markers = markers.iter().map(|m| (*m).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Arguments with the port substituted.
    pub fn args_for(&self, port: u16) -> Vec<String> {
        let port = port.to_string();
        self.args
            .iter()
            .map(|a| a.replace(PORT_PLACEHOLDER, &port))
            .collect()
    }
}
