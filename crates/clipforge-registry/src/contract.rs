//! The structural validity predicate for component files.
//!
//! Content is matched with patterns, not parsed. Both the pre-write check
//! and the directory scan go through [`ComponentContract::check`], so a
//! real parser can later replace it in one place.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// `export const X`, `export function X`, `export class X`, ...
static EXPORT_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bexport\s+(?:declare\s+)?(?:const|let|var|(?:async\s+)?function\*?|class)\s+([A-Za-z_$][\w$]*)",
    )
    .unwrap()
});

/// `export { A, B as X }`
static EXPORT_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bexport\s*(?:type\s*)?\{([^}]*)\}").unwrap());

/// An import whose module is the framework or one of its scoped packages.
static FRAMEWORK_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*import\s[^;]*?\bfrom\s*["'](?:remotion|@remotion/[\w.-]+)["']"#).unwrap()
});

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Identifiers the aggregation file itself declares or imports.
const RESERVED_NAMES: [&str; 3] = ["Composition", "RemotionRoot", "React"];

/// Why content failed the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum ContractViolation {
    InvalidName(String),
    ReservedName(String),
    EmptyContent,
    NameNotReferenced,
    MissingNamedExport,
    MissingFrameworkImport,
    /// A different file already registers this name (case-insensitively).
    NameTaken(String),
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName(name) => write!(f, "'{name}' is not a valid identifier"),
            Self::ReservedName(name) => write!(f, "'{name}' is reserved by the aggregation file"),
            Self::EmptyContent => write!(f, "content is empty"),
            Self::NameNotReferenced => write!(f, "content does not mention the component name"),
            Self::MissingNamedExport => {
                write!(f, "content has no named export of the component")
            }
            Self::MissingFrameworkImport => {
                write!(f, "content does not import from remotion or @remotion/*")
            }
            Self::NameTaken(file) => write!(f, "name is already registered by {file}"),
        }
    }
}

/// Structural contract every component file must satisfy.
pub struct ComponentContract;

impl ComponentContract {
    /// Check `content` as the source of component `name`.
    ///
    /// Checks run in a fixed order and the first failure is returned.
    pub fn check(name: &str, content: &str) -> Result<(), ContractViolation> {
        Self::check_name(name)?;
        if content.trim().is_empty() {
            return Err(ContractViolation::EmptyContent);
        }
        if !content.contains(name) {
            return Err(ContractViolation::NameNotReferenced);
        }
        if !exported_names(content).iter().any(|n| n == name) {
            return Err(ContractViolation::MissingNamedExport);
        }
        if !FRAMEWORK_IMPORT.is_match(content) {
            return Err(ContractViolation::MissingFrameworkImport);
        }
        Ok(())
    }

    /// Name rules alone, usable before any content exists.
    pub fn check_name(name: &str) -> Result<(), ContractViolation> {
        if !IDENTIFIER.is_match(name) {
            return Err(ContractViolation::InvalidName(name.to_string()));
        }
        if RESERVED_NAMES.contains(&name) {
            return Err(ContractViolation::ReservedName(name.to_string()));
        }
        Ok(())
    }
}

/// Every identifier the content exports by name, in source order.
pub fn exported_names(content: &str) -> Vec<String> {
    let mut names: Vec<String> = EXPORT_DECL
        .captures_iter(content)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect();

    for list in EXPORT_LIST.captures_iter(content).filter_map(|c| c.get(1)) {
        for item in list.as_str().split(',') {
            let exported = item.split_whitespace().last().unwrap_or_default();
            if !exported.is_empty() && exported != "default" {
                names.push(exported.to_string());
            }
        }
    }

    names
}
