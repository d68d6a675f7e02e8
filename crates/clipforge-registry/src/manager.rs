//! Registry manager: add, repair, validate, list and remove components.
//!
//! The component directory is the only source of truth. Every mutating
//! operation ends by regenerating the aggregation file in full from a fresh
//! scan, written atomically. Overlapping calls need no lock: each derives
//! the whole file from disk, so the last writer wins with a consistent file.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clipforge_core::{ComponentEntry, ComponentMetadata, ProjectConfig, atomic_write_str};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::contract::{ComponentContract, ContractViolation};
use crate::error::RegistryError;
use crate::header::{parse_header, with_header};
use crate::render::{import_lines, parse_component_imports, parse_composition_ids, render};
use crate::scan::{DroppedDuplicate, ScanOutcome, SkippedFile, candidate_files, scan_components};

/// Extension used for newly added components.
const NEW_COMPONENT_EXTENSION: &str = "tsx";

/// Result of a forced rescan and regeneration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    pub success: bool,
    pub message: String,
    pub components_found: usize,
    pub skipped: Vec<SkippedFile>,
    pub duplicates: Vec<DroppedDuplicate>,
}

/// One problem found in the aggregation file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RegistryIssue {
    MissingAggregationFile(PathBuf),
    DuplicateImport(String),
    DuplicateId(String),
    /// An import names a component with no valid file.
    DanglingImport(String),
    CountMismatch { registered: usize, on_disk: usize },
}

impl std::fmt::Display for RegistryIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingAggregationFile(path) => {
                write!(f, "aggregation file {} is missing", path.display())
            }
            Self::DuplicateImport(line) => write!(f, "duplicate import line: {line}"),
            Self::DuplicateId(id) => write!(f, "duplicate composition id: {id}"),
            Self::DanglingImport(name) => {
                write!(f, "import of '{name}' has no valid component file")
            }
            Self::CountMismatch {
                registered,
                on_disk,
            } => write!(
                f,
                "{registered} compositions registered but {on_disk} valid component files on disk"
            ),
        }
    }
}

/// Read-only health report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub healthy: bool,
    pub issues: Vec<RegistryIssue>,
    pub components_found: usize,
}

/// Owns one component directory and its aggregation file.
#[derive(Debug, Clone)]
pub struct RegistryManager {
    components_dir: PathBuf,
    aggregation_file: PathBuf,
}

impl RegistryManager {
    pub fn new(components_dir: impl Into<PathBuf>, aggregation_file: impl Into<PathBuf>) -> Self {
        Self {
            components_dir: components_dir.into(),
            aggregation_file: aggregation_file.into(),
        }
    }

    pub fn from_config(config: &ProjectConfig) -> Self {
        Self::new(config.components_path(), config.aggregation_path())
    }

    pub fn components_dir(&self) -> &Path {
        &self.components_dir
    }

    pub fn aggregation_file(&self) -> &Path {
        &self.aggregation_file
    }

    /// Validate, write atomically, re-read and re-validate, then regenerate.
    ///
    /// Nothing is written if the pre-write check fails. If the post-write
    /// check fails the new file is deleted and the aggregation file is left
    /// untouched.
    pub fn add_component_safely(
        &self,
        name: &str,
        content: &str,
        metadata: ComponentMetadata,
    ) -> Result<ComponentEntry, RegistryError> {
        metadata
            .validate()
            .map_err(|source| RegistryError::InvalidMetadata {
                name: name.to_string(),
                source,
            })?;
        ComponentContract::check(name, content).map_err(|violation| {
            RegistryError::Validation {
                name: name.to_string(),
                violation,
            }
        })?;

        let file_name = format!("{name}.{NEW_COMPONENT_EXTENSION}");
        let path = self.components_dir.join(&file_name);
        self.ensure_name_free(name, &file_name)?;

        let document = with_header(content, &metadata);
        atomic_write_str(&path, &document).map_err(|e| RegistryError::io(&path, e))?;
        debug!(name = %name, path = %path.display(), "Component file written");

        if let Err(reason) = Self::recheck(&path, name, &metadata) {
            warn!(name = %name, reason = %reason, "Post-write validation failed; removing file");
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != io::ErrorKind::NotFound {
                    return Err(RegistryError::io(&path, e));
                }
            }
            return Err(RegistryError::PostWriteValidation {
                name: name.to_string(),
                reason,
            });
        }

        let report = self.repair()?;
        info!(
            name = %name,
            components = report.components_found,
            "Component added"
        );
        Ok(ComponentEntry::new(name, PathBuf::from(file_name), metadata))
    }

    /// Rescan the component directory and regenerate the aggregation file.
    pub fn repair(&self) -> Result<RepairReport, RegistryError> {
        let scan = scan_components(&self.components_dir)?;
        let rendered = render(&scan.entries);
        atomic_write_str(&self.aggregation_file, &rendered)
            .map_err(|e| RegistryError::io(&self.aggregation_file, e))?;

        let ScanOutcome {
            entries,
            skipped,
            duplicates,
        } = scan;
        let message = format!(
            "Regenerated {} with {} component(s); {} file(s) skipped, {} duplicate(s) dropped",
            self.aggregation_file.display(),
            entries.len(),
            skipped.len(),
            duplicates.len()
        );
        info!(
            file = %self.aggregation_file.display(),
            components = entries.len(),
            skipped = skipped.len(),
            duplicates = duplicates.len(),
            "Registry regenerated"
        );

        Ok(RepairReport {
            success: true,
            message,
            components_found: entries.len(),
            skipped,
            duplicates,
        })
    }

    /// Inspect the aggregation file against the component directory.
    ///
    /// Never writes. A missing component directory is an I/O error; a
    /// missing aggregation file is reported as an issue.
    pub fn validate(&self) -> Result<ValidationReport, RegistryError> {
        let scan = scan_components(&self.components_dir)?;
        let components_found = scan.entries.len();

        let content = match fs::read_to_string(&self.aggregation_file) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(ValidationReport {
                    healthy: false,
                    issues: vec![RegistryIssue::MissingAggregationFile(
                        self.aggregation_file.clone(),
                    )],
                    components_found,
                });
            }
            Err(e) => return Err(RegistryError::io(&self.aggregation_file, e)),
        };

        let mut issues = Vec::new();

        for line in duplicates(import_lines(&content)) {
            issues.push(RegistryIssue::DuplicateImport(line.to_string()));
        }

        let ids = parse_composition_ids(&content);
        for id in duplicates(ids.iter().map(String::as_str)) {
            issues.push(RegistryIssue::DuplicateId(id.to_string()));
        }

        let on_disk: HashSet<&str> = scan.entries.iter().map(|e| e.name.as_str()).collect();
        let mut reported = HashSet::new();
        for (name, _) in parse_component_imports(&content) {
            if !on_disk.contains(name.as_str()) && reported.insert(name.clone()) {
                issues.push(RegistryIssue::DanglingImport(name));
            }
        }

        if ids.len() != components_found {
            issues.push(RegistryIssue::CountMismatch {
                registered: ids.len(),
                on_disk: components_found,
            });
        }

        if !issues.is_empty() {
            warn!(
                file = %self.aggregation_file.display(),
                issues = issues.len(),
                "Registry validation found issues"
            );
        }

        Ok(ValidationReport {
            healthy: issues.is_empty(),
            issues,
            components_found,
        })
    }

    /// Current entries derived from disk.
    pub fn list_components(&self) -> Result<Vec<ComponentEntry>, RegistryError> {
        Ok(scan_components(&self.components_dir)?.entries)
    }

    /// Delete every file for `name` (case-insensitive) and regenerate.
    pub fn remove_component(&self, name: &str) -> Result<RepairReport, RegistryError> {
        let key = name.to_lowercase();
        let mut removed = 0;

        for path in candidate_files(&self.components_dir)? {
            let matches = path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| stem.to_lowercase() == key);
            if matches {
                fs::remove_file(&path).map_err(|e| RegistryError::io(&path, e))?;
                info!(name = %name, file = %path.display(), "Component file removed");
                removed += 1;
            }
        }

        if removed == 0 {
            return Err(RegistryError::NotFound(name.to_string()));
        }
        self.repair()
    }

    /// Reject a name already claimed by a different file.
    fn ensure_name_free(&self, name: &str, file_name: &str) -> Result<(), RegistryError> {
        let files = match candidate_files(&self.components_dir) {
            Ok(files) => files,
            // The directory is created by the write
            Err(RegistryError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let key = name.to_lowercase();
        for path in files {
            let Some(existing) = path.file_name().and_then(|f| f.to_str()) else {
                continue;
            };
            let same_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| stem.to_lowercase() == key);
            if same_key && existing != file_name {
                return Err(RegistryError::Validation {
                    name: name.to_string(),
                    violation: ContractViolation::NameTaken(existing.to_string()),
                });
            }
        }
        Ok(())
    }

    /// Re-read a freshly written file and apply the same checks again.
    fn recheck(path: &Path, name: &str, metadata: &ComponentMetadata) -> Result<(), String> {
        let written = fs::read_to_string(path).map_err(|e| format!("re-read failed: {e}"))?;
        ComponentContract::check(name, &written).map_err(|v| v.to_string())?;
        let stored = parse_header(&written);
        if stored != *metadata {
            return Err(format!("metadata header reads back as {stored}"));
        }
        Ok(())
    }
}

/// Items that occur more than once, each reported once in first-seen order.
fn duplicates<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order = Vec::new();
    for item in items {
        let count = counts.entry(item).or_insert(0);
        *count += 1;
        if *count == 2 {
            order.push(item);
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn component(name: &str) -> String {
        format!("import {{ AbsoluteFill }} from \"remotion\";\n\nexport const {name} = () => <AbsoluteFill />;\n")
    }

    fn manager(dir: &TempDir) -> RegistryManager {
        RegistryManager::new(dir.path().join("src/components"), dir.path().join("src/Root.tsx"))
    }

    #[test]
    fn add_writes_header_and_regenerates() {
        let dir = TempDir::new().unwrap();
        let registry = manager(&dir);

        let entry = registry
            .add_component_safely("Intro", &component("Intro"), ComponentMetadata::new(90, 1280, 720))
            .unwrap();

        assert_eq!(entry.relative_path, PathBuf::from("Intro.tsx"));
        let written = fs::read_to_string(dir.path().join("src/components/Intro.tsx")).unwrap();
        assert!(written.starts_with("// clipforge: durationInFrames=90 width=1280 height=720\n"));
        let root = fs::read_to_string(registry.aggregation_file()).unwrap();
        assert!(root.contains("durationInFrames={90}"));
        assert!(root.contains("width={1280}"));
    }

    #[test]
    fn rejected_content_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let registry = manager(&dir);

        let err = registry
            .add_component_safely("Intro", "export const Intro = 1;", ComponentMetadata::default())
            .unwrap_err();

        assert!(matches!(
            err,
            RegistryError::Validation {
                violation: ContractViolation::MissingFrameworkImport,
                ..
            }
        ));
        assert!(!registry.components_dir().exists());
        assert!(!registry.aggregation_file().exists());
    }

    #[test]
    fn zero_metadata_is_rejected() {
        let dir = TempDir::new().unwrap();
        let registry = manager(&dir);

        let err = registry
            .add_component_safely("Intro", &component("Intro"), ComponentMetadata::new(0, 1, 1))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidMetadata { .. }));
    }

    #[test]
    fn case_variant_of_existing_name_is_rejected() {
        let dir = TempDir::new().unwrap();
        let registry = manager(&dir);
        registry
            .add_component_safely("Intro", &component("Intro"), ComponentMetadata::default())
            .unwrap();

        let err = registry
            .add_component_safely("INTRO", &component("INTRO"), ComponentMetadata::default())
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Validation {
                violation: ContractViolation::NameTaken(_),
                ..
            }
        ));
    }

    #[test]
    fn re_adding_same_name_overwrites() {
        let dir = TempDir::new().unwrap();
        let registry = manager(&dir);
        registry
            .add_component_safely("Intro", &component("Intro"), ComponentMetadata::default())
            .unwrap();
        registry
            .add_component_safely("Intro", &component("Intro"), ComponentMetadata::new(45, 640, 480))
            .unwrap();

        let entries = registry.list_components().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].metadata, ComponentMetadata::new(45, 640, 480));
    }

    #[test]
    fn validate_flags_duplicates_and_dangling_imports() {
        let dir = TempDir::new().unwrap();
        let registry = manager(&dir);
        registry
            .add_component_safely("Intro", &component("Intro"), ComponentMetadata::default())
            .unwrap();

        let mut root = fs::read_to_string(registry.aggregation_file()).unwrap();
        root = root.replace(
            "import { Intro } from \"./components/Intro\";\n",
            "import { Intro } from \"./components/Intro\";\nimport { Intro } from \"./components/Intro\";\nimport { Ghost } from \"./components/Ghost\";\n",
        );
        root = root.replace("    </>", "      <Composition id=\"Intro\" component={Intro} />\n    </>");
        fs::write(registry.aggregation_file(), root).unwrap();

        let report = registry.validate().unwrap();

        assert!(!report.healthy);
        assert_eq!(report.components_found, 1);
        assert!(report.issues.contains(&RegistryIssue::DuplicateImport(
            "import { Intro } from \"./components/Intro\";".to_string()
        )));
        assert!(report.issues.contains(&RegistryIssue::DuplicateId("Intro".to_string())));
        assert!(report.issues.contains(&RegistryIssue::DanglingImport("Ghost".to_string())));
        assert!(report.issues.contains(&RegistryIssue::CountMismatch {
            registered: 2,
            on_disk: 1
        }));
    }

    #[test]
    fn validate_reports_missing_aggregation_file() {
        let dir = TempDir::new().unwrap();
        let registry = manager(&dir);
        fs::create_dir_all(registry.components_dir()).unwrap();

        let report = registry.validate().unwrap();
        assert!(!report.healthy);
        assert!(matches!(
            report.issues[0],
            RegistryIssue::MissingAggregationFile(_)
        ));
    }

    #[test]
    fn validate_does_not_write() {
        let dir = TempDir::new().unwrap();
        let registry = manager(&dir);
        fs::create_dir_all(registry.components_dir()).unwrap();

        registry.validate().unwrap();
        assert!(!registry.aggregation_file().exists());
    }

    #[test]
    fn remove_deletes_file_and_regenerates() {
        let dir = TempDir::new().unwrap();
        let registry = manager(&dir);
        for name in ["Intro", "Outro"] {
            registry
                .add_component_safely(name, &component(name), ComponentMetadata::default())
                .unwrap();
        }

        let report = registry.remove_component("intro").unwrap();

        assert_eq!(report.components_found, 1);
        let root = fs::read_to_string(registry.aggregation_file()).unwrap();
        assert!(!root.contains("Intro"));
        assert!(matches!(
            registry.remove_component("Intro"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn repair_without_component_dir_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = manager(&dir).repair().unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn duplicates_reports_each_once() {
        assert_eq!(duplicates(["a", "b", "a", "a", "b", "c"]), vec!["a", "b"]);
    }
}
