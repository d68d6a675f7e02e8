//! Atomic file replacement.
//!
//! 1. Write to a hidden temp file next to the target, unique per process and call
//! 2. fsync so the data reaches disk
//! 3. Rename over the target (atomic on the same filesystem)
//!
//! Readers therefore see either the old file or the new one, never a prefix.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

const TEMP_SUFFIX: &str = ".tmp";

/// Atomically replace `path` with `contents`, creating parent directories.
pub fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_path_for(path)?;

    if let Err(e) = write_and_sync(&temp_path, contents) {
        remove_temp(&temp_path);
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        remove_temp(&temp_path);
        return Err(e);
    }

    debug!(path = %path.display(), bytes = contents.len(), "Atomic write complete");
    Ok(())
}

/// Convenience wrapper for text content.
pub fn atomic_write_str(path: &Path, contents: &str) -> io::Result<()> {
    atomic_write(path, contents.as_bytes())
}

/// Whether a file name looks like an in-flight temp file from [`atomic_write`].
pub fn is_temp_artifact(file_name: &str) -> bool {
    file_name.starts_with('.') && file_name.ends_with(TEMP_SUFFIX)
}

fn temp_path_for(path: &Path) -> io::Result<PathBuf> {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?
        .to_string_lossy();
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let temp_name = format!(".{file_name}.{}.{seq}{TEMP_SUFFIX}", process::id());

    Ok(path.with_file_name(temp_name))
}

fn write_and_sync(temp_path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)?;
    file.write_all(contents)?;
    file.flush()?;
    file.sync_all()
}

fn remove_temp(temp_path: &Path) {
    if let Err(e) = fs::remove_file(temp_path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %temp_path.display(), error = %e, "Failed to remove temp file");
        }
    }
}
