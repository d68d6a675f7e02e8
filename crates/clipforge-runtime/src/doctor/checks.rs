//! Project inspection: the fixed, ordered list of incompatibility checks.

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use clipforge_core::{DiagnosticIssue, IssueKind};
use regex::Regex;
use serde_json::Value;

use super::DoctorError;

pub const MANIFEST: &str = "package.json";
pub const TSCONFIG: &str = "tsconfig.json";
pub const PREVIEW_CONFIG_TS: &str = "remotion.config.ts";
pub const PREVIEW_CONFIG_JS: &str = "remotion.config.js";

/// Packages the preview server cannot start without, with the range added on repair.
pub const REQUIRED_PACKAGES: &[(&str, &str)] = &[("remotion", "^4.0.0"), ("@remotion/cli", "^4.0.0")];

static COMMONJS_SYNTAX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\brequire\s*\(|\bmodule\.exports\b|\bexports\.\w+\s*=").unwrap());

/// A JSON config file as found on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonFile {
    Missing,
    /// Present but not a JSON object; never rewritten.
    Unparseable(String),
    Parsed(serde_json::Map<String, Value>),
}

/// How strictly a config file is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Json,
    /// JSON with `//` and `/* */` comments and trailing commas, as `tsc` accepts.
    Jsonc,
}

pub fn read_text(path: &Path) -> Result<Option<String>, DoctorError> {
    match std::fs::read_to_string(path) {
        Ok(t) => Ok(Some(t)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(DoctorError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub fn parse_object(text: &str, syntax: Syntax) -> JsonFile {
    let text = match syntax {
        Syntax::Json => Cow::Borrowed(text),
        Syntax::Jsonc => strip_jsonc(text),
    };
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => JsonFile::Parsed(map),
        Ok(_) => JsonFile::Unparseable("top-level value is not an object".to_string()),
        Err(e) => JsonFile::Unparseable(e.to_string()),
    }
}

pub fn read_json(path: &Path, syntax: Syntax) -> Result<JsonFile, DoctorError> {
    Ok(read_text(path)?.map_or(JsonFile::Missing, |text| parse_object(&text, syntax)))
}

/// Blank out comments and drop trailing commas, leaving strings intact.
///
/// Comments become spaces (newlines kept) so parse errors still point at
/// the right line. Returns the input unchanged when there is nothing to strip.
pub fn strip_jsonc(text: &str) -> Cow<'_, str> {
    if !text.contains("//") && !text.contains("/*") && !text.contains(',') {
        return Cow::Borrowed(text);
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let mut in_string = false;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(&escaped) = chars.get(i + 1) {
                    out.push(escaped);
                    i += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match (c, chars.get(i + 1)) {
            ('"', _) => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            ('/', Some('/')) => {
                while i < chars.len() && chars[i] != '\n' {
                    out.push(' ');
                    i += 1;
                }
            }
            ('/', Some('*')) => {
                out.push_str("  ");
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    out.push(if chars[i] == '\n' { '\n' } else { ' ' });
                    i += 1;
                }
                if i < chars.len() {
                    out.push_str("  ");
                    i += 2;
                }
            }
            (',', _) if closes_after_comma(&chars[i + 1..]) => {
                out.push(' ');
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    if out == text {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(out)
    }
}

/// True when only whitespace or comments separate a comma from `}` or `]`.
fn closes_after_comma(rest: &[char]) -> bool {
    let mut i = 0;
    while i < rest.len() {
        match (rest[i], rest.get(i + 1)) {
            (c, _) if c.is_whitespace() => i += 1,
            ('/', Some('/')) => {
                while i < rest.len() && rest[i] != '\n' {
                    i += 1;
                }
            }
            ('/', Some('*')) => {
                i += 2;
                while i < rest.len() && !(rest[i] == '*' && rest.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            ('}' | ']', _) => return true,
            _ => return false,
        }
    }
    false
}

/// Required packages absent from both `dependencies` and `devDependencies`.
pub fn missing_packages(manifest: &serde_json::Map<String, Value>) -> Vec<&'static str> {
    let declared = |name: &str| {
        ["dependencies", "devDependencies"]
            .iter()
            .filter_map(|section| manifest.get(*section).and_then(Value::as_object))
            .any(|deps| deps.contains_key(name))
    };
    REQUIRED_PACKAGES
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| !declared(*name))
        .collect()
}

/// `"type": "module"` combined with a CommonJS `remotion.config.js`.
pub fn has_module_mismatch(dir: &Path, manifest: &serde_json::Map<String, Value>) -> bool {
    let is_esm = manifest.get("type").and_then(Value::as_str) == Some("module");
    is_esm
        && std::fs::read_to_string(dir.join(PREVIEW_CONFIG_JS))
            .is_ok_and(|config| COMMONJS_SYNTAX.is_match(&config))
}

pub fn preview_config_path(dir: &Path) -> Option<PathBuf> {
    [PREVIEW_CONFIG_TS, PREVIEW_CONFIG_JS]
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

pub fn has_jsx_setting(tsconfig: &serde_json::Map<String, Value>) -> bool {
    tsconfig
        .get("compilerOptions")
        .and_then(Value::as_object)
        .is_some_and(|opts| opts.get("jsx").is_some_and(|v| !v.is_null()))
}

/// Run every file-level check against `dir`, in a fixed order.
pub fn inspect_project(dir: &Path) -> Result<Vec<DiagnosticIssue>, DoctorError> {
    let mut issues = Vec::new();

    match read_json(&dir.join(MANIFEST), Syntax::Json)? {
        JsonFile::Missing => issues.push(DiagnosticIssue::new(
            IssueKind::MissingManifest,
            format!("No {MANIFEST} in {}", dir.display()),
            "Create the project with `npx create-video@latest` or point --project-dir at it",
        )),
        JsonFile::Unparseable(reason) => issues.push(DiagnosticIssue::new(
            IssueKind::UnparseableConfig,
            format!("{MANIFEST} is not valid JSON: {reason}"),
            format!("Fix the syntax of {MANIFEST} by hand"),
        )),
        JsonFile::Parsed(manifest) => {
            let missing = missing_packages(&manifest);
            if !missing.is_empty() {
                issues.push(DiagnosticIssue::new(
                    IssueKind::MissingDependency,
                    format!("Required packages not declared: {}", missing.join(", ")),
                    format!("Add {} to dependencies and reinstall", missing.join(", ")),
                ));
            }
            if has_module_mismatch(dir, &manifest) {
                issues.push(DiagnosticIssue::new(
                    IssueKind::ModuleSystemMismatch,
                    format!(
                        "{MANIFEST} declares \"type\": \"module\" but {PREVIEW_CONFIG_JS} uses CommonJS"
                    ),
                    format!("Remove \"type\": \"module\" from {MANIFEST}"),
                ));
            }
        }
    }

    if preview_config_path(dir).is_none() {
        issues.push(DiagnosticIssue::new(
            IssueKind::MissingPreviewConfig,
            format!("Neither {PREVIEW_CONFIG_TS} nor {PREVIEW_CONFIG_JS} exists"),
            format!("Create a default {PREVIEW_CONFIG_TS}"),
        ));
    }

    match read_json(&dir.join(TSCONFIG), Syntax::Jsonc)? {
        JsonFile::Missing => issues.push(DiagnosticIssue::new(
            IssueKind::MissingTsConfig,
            format!("No {TSCONFIG} in {}", dir.display()),
            format!("Create a default {TSCONFIG}"),
        )),
        JsonFile::Unparseable(reason) => issues.push(DiagnosticIssue::new(
            IssueKind::UnparseableConfig,
            format!("{TSCONFIG} cannot be parsed: {reason}"),
            format!("Fix the syntax of {TSCONFIG} by hand"),
        )),
        JsonFile::Parsed(tsconfig) if !has_jsx_setting(&tsconfig) => {
            issues.push(DiagnosticIssue::new(
                IssueKind::MissingJsxSetting,
                format!("{TSCONFIG} has no compilerOptions.jsx"),
                "Set compilerOptions.jsx to \"react-jsx\"",
            ));
        }
        JsonFile::Parsed(_) => {}
    }

    Ok(issues)
}
