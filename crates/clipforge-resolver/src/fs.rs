//! Filesystem provider trait for testable path resolution.

use std::path::{Path, PathBuf};

use super::types::AttemptOutcome;

/// Trait for filesystem operations (injectable for testing).
pub trait FsProvider: Send + Sync {
    /// Check if a path exists and is a valid executable.
    /// Returns Ok if the file is executable, or a specific outcome otherwise.
    fn check_executable(&self, path: &Path) -> AttemptOutcome;

    /// Names of the subdirectories of `dir`. Empty if `dir` is unreadable.
    fn list_subdirs(&self, dir: &Path) -> Vec<String>;

    /// Small text file contents, if readable.
    fn read_text(&self, path: &Path) -> Option<String>;
}

/// Production filesystem provider that uses real filesystem operations.
pub struct SystemFs;

impl FsProvider for SystemFs {
    fn check_executable(&self, path: &Path) -> AttemptOutcome {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return AttemptOutcome::NotFound;
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return AttemptOutcome::PermissionDenied;
            }
            Err(e) => return AttemptOutcome::IoError(e.to_string()),
        };

        if !metadata.is_file() {
            return AttemptOutcome::NotAFile;
        }

        // Windows treats any listed extension as executable
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if metadata.permissions().mode() & 0o111 == 0 {
                return AttemptOutcome::NotExecutable;
            }
        }

        AttemptOutcome::Ok
    }

    fn list_subdirs(&self, dir: &Path) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_dir() || t.is_symlink()))
            .filter_map(|e| e.file_name().into_string().ok())
            .collect()
    }

    fn read_text(&self, path: &Path) -> Option<String> {
        std::fs::read_to_string(path).ok()
    }
}

/// Test/mock filesystem provider with predefined responses.
#[cfg(test)]
#[derive(Default)]
pub struct MockFs {
    executables: std::collections::HashSet<PathBuf>,
    non_executables: std::collections::HashSet<PathBuf>,
    dirs: std::collections::HashMap<PathBuf, Vec<String>>,
    files: std::collections::HashMap<PathBuf, String>,
}

#[cfg(test)]
impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executables.insert(path.into());
        self
    }

    #[must_use]
    pub fn with_non_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.non_executables.insert(path.into());
        self
    }

    #[must_use]
    pub fn with_subdirs(mut self, dir: impl Into<PathBuf>, names: &[&str]) -> Self {
        self.dirs
            .insert(dir.into(), names.iter().map(|n| (*n).to_string()).collect());
        self
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }
}

#[cfg(test)]
impl FsProvider for MockFs {
    fn check_executable(&self, path: &Path) -> AttemptOutcome {
        if self.executables.contains(path) {
            AttemptOutcome::Ok
        } else if self.non_executables.contains(path) {
            AttemptOutcome::NotExecutable
        } else {
            AttemptOutcome::NotFound
        }
    }

    fn list_subdirs(&self, dir: &Path) -> Vec<String> {
        self.dirs.get(dir).cloned().unwrap_or_default()
    }

    fn read_text(&self, path: &Path) -> Option<String> {
        self.files.get(path).cloned()
    }
}
