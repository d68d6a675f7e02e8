//! Directory scan that derives the registry from the component files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use clipforge_core::ComponentEntry;
use clipforge_core::fs::is_temp_artifact;
use serde::Serialize;
use tracing::warn;

use crate::contract::ComponentContract;
use crate::error::RegistryError;
use crate::header::parse_header;

/// Extensions treated as component sources.
pub const COMPONENT_EXTENSIONS: [&str; 2] = ["tsx", "jsx"];

/// A file excluded from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub file: PathBuf,
    pub reason: String,
}

/// A valid file dropped because an earlier file already claimed its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedDuplicate {
    pub name: String,
    pub kept: PathBuf,
    pub dropped: PathBuf,
}

/// Everything a scan learned about the component directory.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Unique, sorted case-insensitively by name.
    pub entries: Vec<ComponentEntry>,
    pub skipped: Vec<SkippedFile>,
    pub duplicates: Vec<DroppedDuplicate>,
}

/// Scan `dir` and return the valid, deduplicated, sorted entries.
///
/// Files are visited in file-name order so "first occurrence" is stable.
/// Invalid or unreadable files are skipped and logged; only a failure to
/// read the directory itself is an error.
pub fn scan_components(dir: &Path) -> Result<ScanOutcome, RegistryError> {
    let mut files = candidate_files(dir)?;
    files.sort();

    let mut outcome = ScanOutcome::default();
    let mut seen: HashMap<String, PathBuf> = HashMap::new();

    for path in files {
        let relative = path
            .strip_prefix(dir)
            .map_or_else(|_| path.clone(), Path::to_path_buf);
        let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Skipping unreadable component file");
                outcome.skipped.push(SkippedFile {
                    file: relative,
                    reason: format!("unreadable: {e}"),
                });
                continue;
            }
        };

        if let Err(violation) = ComponentContract::check(&name, &content) {
            warn!(file = %path.display(), reason = %violation, "Skipping invalid component file");
            outcome.skipped.push(SkippedFile {
                file: relative,
                reason: violation.to_string(),
            });
            continue;
        }

        let key = name.to_lowercase();
        if let Some(kept) = seen.get(&key) {
            warn!(
                name = %name,
                kept = %kept.display(),
                dropped = %relative.display(),
                "Dropping duplicate component"
            );
            outcome.duplicates.push(DroppedDuplicate {
                name,
                kept: kept.clone(),
                dropped: relative,
            });
            continue;
        }
        seen.insert(key, relative.clone());

        let metadata = parse_header(&content);
        outcome
            .entries
            .push(ComponentEntry::new(name, relative, metadata));
    }

    outcome
        .entries
        .sort_by(|a, b| a.sort_key().cmp(&b.sort_key()).then_with(|| a.name.cmp(&b.name)));
    Ok(outcome)
}

/// Component source files directly inside `dir`, skipping hidden and temp files.
pub fn candidate_files(dir: &Path) -> Result<Vec<PathBuf>, RegistryError> {
    let entries = fs::read_dir(dir).map_err(|e| RegistryError::io(dir, e))?;
    let mut files = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| RegistryError::io(dir, e))?;
        let path = entry.path();
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();

        if file_name.starts_with('.') || is_temp_artifact(&file_name) {
            continue;
        }
        let has_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| COMPONENT_EXTENSIONS.contains(&e));
        if has_ext && entry.file_type().is_ok_and(|t| t.is_file()) {
            files.push(path);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn component(name: &str) -> String {
        format!("import {{ AbsoluteFill }} from \"remotion\";\nexport const {name} = () => <AbsoluteFill />;\n")
    }

    #[test]
    fn scan_skips_invalid_and_non_component_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Intro.tsx"), component("Intro")).unwrap();
        fs::write(dir.path().join("Broken.tsx"), "export const Nope = 1;").unwrap();
        fs::write(dir.path().join("notes.md"), component("notes")).unwrap();
        fs::write(dir.path().join(".Hidden.tsx"), component("Hidden")).unwrap();

        let outcome = scan_components(dir.path()).unwrap();

        let names: Vec<_> = outcome.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Intro"]);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].file, PathBuf::from("Broken.tsx"));
    }

    #[test]
    fn scan_keeps_first_of_same_name() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Intro.jsx"), component("Intro")).unwrap();
        fs::write(dir.path().join("Intro.tsx"), component("Intro")).unwrap();

        let outcome = scan_components(dir.path()).unwrap();

        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].relative_path, PathBuf::from("Intro.jsx"));
        assert_eq!(outcome.duplicates.len(), 1);
        assert_eq!(outcome.duplicates[0].dropped, PathBuf::from("Intro.tsx"));
    }

    #[test]
    fn scan_sorts_case_insensitively() {
        let dir = TempDir::new().unwrap();
        for name in ["beta", "Alpha", "Gamma"] {
            fs::write(dir.path().join(format!("{name}.tsx")), component(name)).unwrap();
        }

        let outcome = scan_components(dir.path()).unwrap();
        let names: Vec<_> = outcome.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "beta", "Gamma"]);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = scan_components(&dir.path().join("absent")).unwrap_err();
        assert!(err.is_io());
    }
}
