//! Launch outcomes and the closed launch-failure taxonomy.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Opaque identifier for a supervised child session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate a fresh process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Lifecycle of one launch session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Init,
    PortCheck,
    Spawning,
    AwaitingReady,
    Ready,
    Running,
    Terminating,
    Terminated,
    Failed,
    Timeout,
}

impl SessionState {
    /// No further transitions happen from a terminal state.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Terminated | Self::Failed | Self::Timeout)
    }
}

/// Terminal state reported back to the launch caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaunchState {
    Ready,
    Failed,
    Timeout,
}

/// Closed classification of launch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LaunchErrorKind {
    PortInUse,
    ExecutableNotFound,
    StartupTimeout,
    ConnectionRefused,
    DependencyError,
    ProcessSpawnError,
    Unknown,
}

impl LaunchErrorKind {
    /// Canned remediation text shown alongside the failure.
    pub const fn hint(self) -> &'static str {
        match self {
            Self::PortInUse => {
                "Another process is listening on this port. Stop it or launch on a different port."
            }
            Self::ExecutableNotFound => {
                "Node.js tooling was not found. Install Node.js or pass its install directory as a custom path."
            }
            Self::StartupTimeout => {
                "The preview server did not report readiness in time. Check the session logs or raise the readiness timeout."
            }
            Self::ConnectionRefused => {
                "The server refused connections. It may have crashed during startup; check the session logs."
            }
            Self::DependencyError => {
                "Project dependencies are missing or broken. Run a safe launch to reinstall them."
            }
            Self::ProcessSpawnError => {
                "The operating system could not start the process. Check file permissions on the executable and project."
            }
            Self::Unknown => "An unexpected error occurred. Check the session logs for details.",
        }
    }

    /// Best-effort mapping of free-form failure text onto the taxonomy.
    ///
    /// Matching is case-insensitive and first rule wins.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if has(&["eaddrinuse", "address already in use", "port is already in use"]) {
            Self::PortInUse
        } else if has(&["econnrefused", "connection refused"]) {
            Self::ConnectionRefused
        } else if has(&["timed out", "timeout"]) {
            Self::StartupTimeout
        } else if has(&[
            "enoent",
            "command not found",
            "not recognized as an internal or external command",
            "executable not found",
        ]) {
            Self::ExecutableNotFound
        } else if has(&[
            "cannot find module",
            "module not found",
            "npm err",
            "err_module_not_found",
            "could not resolve dependency",
        ]) {
            Self::DependencyError
        } else if has(&["eacces", "permission denied", "eperm", "spawn"]) {
            Self::ProcessSpawnError
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for LaunchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PortInUse => "PortInUse",
            Self::ExecutableNotFound => "ExecutableNotFound",
            Self::StartupTimeout => "StartupTimeout",
            Self::ConnectionRefused => "ConnectionRefused",
            Self::DependencyError => "DependencyError",
            Self::ProcessSpawnError => "ProcessSpawnError",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Result of a launch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchOutcome {
    pub state: LaunchState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<LaunchErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Detail text captured from the failure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Session whose captured output explains the outcome; absent when no child was spawned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

impl LaunchOutcome {
    pub fn ready(url: impl Into<String>, session_id: SessionId) -> Self {
        Self {
            state: LaunchState::Ready,
            url: Some(url.into()),
            error_kind: None,
            hint: None,
            message: None,
            session_id: Some(session_id),
        }
    }

    pub fn failed(kind: LaunchErrorKind, message: impl Into<String>) -> Self {
        Self {
            state: LaunchState::Failed,
            url: None,
            error_kind: Some(kind),
            hint: Some(kind.hint().to_string()),
            message: Some(message.into()),
            session_id: None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        let kind = LaunchErrorKind::StartupTimeout;
        Self {
            state: LaunchState::Timeout,
            url: None,
            error_kind: Some(kind),
            hint: Some(kind.hint().to_string()),
            message: Some(message.into()),
            session_id: None,
        }
    }

    pub const fn is_ready(&self) -> bool {
        matches!(self.state, LaunchState::Ready)
    }
}
