//! Types for executable resolution.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lookup strategies, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// The caller passed an absolute path.
    Direct,
    /// Caller-supplied paths, then well-known install locations.
    CuratedFallback,
    /// Directories of the inherited `PATH`.
    PathScan,
    /// `which` / `where`.
    SystemLocator,
    /// Per-version install directories (nvm, fnm, asdf), newest first.
    VersionManager,
}

impl Strategy {
    /// Strategies for a bare command name.
    pub const SEARCH_ORDER: [Self; 4] = [
        Self::CuratedFallback,
        Self::PathScan,
        Self::SystemLocator,
        Self::VersionManager,
    ];
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Direct => "direct path",
            Self::CuratedFallback => "curated fallback paths",
            Self::PathScan => "PATH scan",
            Self::SystemLocator => "system locator",
            Self::VersionManager => "version-manager directories",
        };
        f.write_str(name)
    }
}

/// A single check of a candidate path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub candidate: PathBuf,
    pub strategy: Strategy,
    pub outcome: AttemptOutcome,
}

/// Possible outcomes when checking a candidate path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Exists, is executable and passed the version query.
    Ok,
    /// Path does not exist.
    NotFound,
    /// Path exists but is not a file (e.g., directory).
    NotAFile,
    /// File exists but has no execute permission.
    NotExecutable,
    /// Permission denied when checking the path.
    PermissionDenied,
    /// Executable, but the version query failed.
    VerificationFailed(String),
    /// Other I/O error occurred.
    IoError(String),
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::NotFound => write!(f, "not found"),
            Self::NotAFile => write!(f, "not a file"),
            Self::NotExecutable => write!(f, "not executable"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::VerificationFailed(msg) => write!(f, "verification failed: {msg}"),
            Self::IoError(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

/// A verified executable.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedExecutable {
    pub name: String,
    pub path: PathBuf,
    pub strategy: Strategy,
    /// First line printed by the version query.
    pub version: String,
    pub resolved_at: DateTime<Utc>,
    /// Every candidate checked up to and including the hit.
    pub attempts: Vec<Attempt>,
    /// Non-fatal notes (e.g., an absolute path fell back to its basename).
    pub warnings: Vec<String>,
    /// Served from the cache without probing.
    pub from_cache: bool,
}

/// Error returned when executable resolution fails.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    #[error("Executable name is empty")]
    EmptyCommand,

    #[error(
        "Executable '{name}' not found. Strategies tried: {}. Candidates:\n{}",
        render_strategies(.strategies),
        render_attempts(.attempts)
    )]
    ExecutableNotFound {
        name: String,
        strategies: Vec<Strategy>,
        attempts: Vec<Attempt>,
    },
}

impl ResolveError {
    pub fn not_found(name: impl Into<String>, strategies: Vec<Strategy>, attempts: Vec<Attempt>) -> Self {
        Self::ExecutableNotFound {
            name: name.into(),
            strategies,
            attempts,
        }
    }
}

fn render_strategies(strategies: &[Strategy]) -> String {
    strategies
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_attempts(attempts: &[Attempt]) -> String {
    if attempts.is_empty() {
        return "  (no candidates checked)".to_string();
    }
    attempts
        .iter()
        .map(|a| format!("  ✗ {}: {}", a.candidate.display(), a.outcome))
        .collect::<Vec<_>>()
        .join("\n")
}
