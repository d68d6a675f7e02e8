//! Ordered, idempotent repair steps.
//!
//! Each step first checks whether its target state already holds and
//! skips itself if so. Rewrites go through the atomic writer; files that
//! do not parse are left untouched.

use std::borrow::Cow;
use std::path::Path;

use clipforge_core::atomic_write_str;
use serde_json::{Map, Value, json};
use tracing::info;

use super::checks::{
    JsonFile, MANIFEST, PREVIEW_CONFIG_TS, REQUIRED_PACKAGES, Syntax, TSCONFIG, has_jsx_setting,
    has_module_mismatch, missing_packages, parse_object, preview_config_path, read_json,
    read_text, strip_jsonc,
};
use super::{DoctorError, FixReport};

pub const DEFAULT_JSX: &str = "react-jsx";

const DEFAULT_PREVIEW_CONFIG: &str = "\
// See all configuration options: https://remotion.dev/docs/config
import { Config } from \"@remotion/cli/config\";

Config.setVideoImageFormat(\"jpeg\");
Config.setOverwriteOutput(true);
";

fn default_tsconfig() -> Value {
    json!({
        "compilerOptions": {
            "target": "ES2018",
            "module": "commonjs",
            "jsx": DEFAULT_JSX,
            "strict": true,
            "noEmit": true,
            "lib": ["es2015"],
            "esModuleInterop": true,
            "skipLibCheck": true,
            "forceConsistentCasingInFileNames": true
        },
        "exclude": ["remotion.config.ts"]
    })
}

/// Apply every repair step to the project in `dir`.
pub fn apply_fixes(dir: &Path) -> Result<FixReport, DoctorError> {
    let mut report = FixReport::default();

    let manifest_path = dir.join(MANIFEST);
    match read_json(&manifest_path, Syntax::Json)? {
        JsonFile::Missing => {
            report.skip(format!("{MANIFEST} not found; nothing can be repaired without it"));
            return Ok(report);
        }
        JsonFile::Unparseable(reason) => {
            report.skip(format!("{MANIFEST} is not valid JSON ({reason}); left untouched"));
            return Ok(report);
        }
        JsonFile::Parsed(mut manifest) => {
            let mut changed = false;
            if let Some(action) = add_missing_packages(&mut manifest) {
                report.record(action);
                changed = true;
            }
            if has_module_mismatch(dir, &manifest) {
                manifest.remove("type");
                report.record(format!(
                    "Removed \"type\": \"module\" from {MANIFEST} to match the CommonJS preview config"
                ));
                changed = true;
            }
            if changed {
                write_json(&manifest_path, &Value::Object(manifest))?;
            }
        }
    }

    if preview_config_path(dir).is_none() {
        write_text(&dir.join(PREVIEW_CONFIG_TS), DEFAULT_PREVIEW_CONFIG)?;
        report.record(format!("Created {PREVIEW_CONFIG_TS}"));
    }

    let tsconfig_path = dir.join(TSCONFIG);
    let tsconfig_text = read_text(&tsconfig_path)?;
    let commented = tsconfig_text
        .as_deref()
        .is_some_and(|text| matches!(strip_jsonc(text), Cow::Owned(_)));
    let tsconfig = tsconfig_text
        .as_deref()
        .map_or(JsonFile::Missing, |text| parse_object(text, Syntax::Jsonc));
    match tsconfig {
        JsonFile::Missing => {
            write_json(&tsconfig_path, &default_tsconfig())?;
            report.record(format!("Created {TSCONFIG}"));
        }
        JsonFile::Unparseable(reason) => {
            report.skip(format!("{TSCONFIG} cannot be parsed ({reason}); left untouched"));
        }
        JsonFile::Parsed(mut tsconfig) if !has_jsx_setting(&tsconfig) => {
            set_jsx(&mut tsconfig);
            write_json(&tsconfig_path, &Value::Object(tsconfig))?;
            let note = if commented { " (comments were not kept)" } else { "" };
            report.record(format!(
                "Set compilerOptions.jsx to \"{DEFAULT_JSX}\" in {TSCONFIG}{note}"
            ));
        }
        JsonFile::Parsed(_) => {}
    }

    Ok(report)
}

fn add_missing_packages(manifest: &mut Map<String, Value>) -> Option<String> {
    let missing = missing_packages(manifest);
    if missing.is_empty() {
        return None;
    }

    let deps = manifest
        .entry("dependencies")
        .or_insert_with(|| Value::Object(Map::new()));
    if !deps.is_object() {
        *deps = Value::Object(Map::new());
    }
    if let Value::Object(deps) = deps {
        for (name, range) in REQUIRED_PACKAGES {
            if missing.contains(name) {
                deps.insert((*name).to_string(), Value::String((*range).to_string()));
            }
        }
    }
    Some(format!("Added {} to dependencies", missing.join(", ")))
}

fn set_jsx(tsconfig: &mut Map<String, Value>) {
    let options = tsconfig
        .entry("compilerOptions")
        .or_insert_with(|| Value::Object(Map::new()));
    if !options.is_object() {
        *options = Value::Object(Map::new());
    }
    if let Value::Object(options) = options {
        options.insert("jsx".to_string(), Value::String(DEFAULT_JSX.to_string()));
    }
}

fn write_json(path: &Path, value: &Value) -> Result<(), DoctorError> {
    let mut text = serde_json::to_string_pretty(value).map_err(|e| DoctorError::Io {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    text.push('\n');
    write_text(path, &text)
}

fn write_text(path: &Path, contents: &str) -> Result<(), DoctorError> {
    atomic_write_str(path, contents).map_err(|source| DoctorError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "Repaired project file");
    Ok(())
}
