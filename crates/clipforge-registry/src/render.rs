//! Aggregation file template and the read-back helpers used by `validate`.

use std::fmt::Write as _;
use std::sync::LazyLock;

use clipforge_core::ComponentEntry;
use regex::Regex;

/// Frame rate written for every composition.
pub const FPS: u32 = 30;

const GENERATED_BANNER: &str =
    "// Generated by clipforge. Do not edit; run `clipforge repair` to regenerate.";

static ID_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bid\s*=\s*\{?\s*["']([^"']+)["']"#).unwrap());

static COMPONENT_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^import\s*\{\s*([A-Za-z_$][\w$]*)\s*\}\s*from\s*["']\./components/([^"']+)["']"#)
        .unwrap()
});

/// Render the full aggregation file for `entries`, which must already be sorted.
///
/// Output depends only on the entries, so equal input gives byte-identical output.
pub fn render(entries: &[ComponentEntry]) -> String {
    let mut out = String::new();
    out.push_str(GENERATED_BANNER);
    out.push('\n');
    out.push_str("import React from \"react\";\n");
    out.push_str("import { Composition } from \"remotion\";\n");
    for entry in entries {
        let _ = writeln!(
            out,
            "import {{ {} }} from \"{}\";",
            entry.name,
            entry.import_path()
        );
    }

    out.push_str("\nexport const RemotionRoot: React.FC = () => {\n");
    out.push_str("  return (\n");
    out.push_str("    <>\n");
    for entry in entries {
        let meta = &entry.metadata;
        let _ = write!(
            out,
            "      <Composition\n        id=\"{name}\"\n        component={{{name}}}\n        durationInFrames={{{frames}}}\n        fps={{{FPS}}}\n        width={{{width}}}\n        height={{{height}}}\n      />\n",
            name = entry.name,
            frames = meta.duration_in_frames,
            width = meta.width,
            height = meta.height,
        );
    }
    out.push_str("    </>\n");
    out.push_str("  );\n");
    out.push_str("};\n");
    out
}

/// Composition identifiers in file order.
pub fn parse_composition_ids(content: &str) -> Vec<String> {
    ID_ATTR
        .captures_iter(content)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// `(identifier, module path)` of every component import line.
pub fn parse_component_imports(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .filter_map(|line| COMPONENT_IMPORT.captures(line.trim()))
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
}

/// Trimmed import lines, including framework imports.
pub fn import_lines(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("import "))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_core::ComponentMetadata;
    use std::path::PathBuf;

    fn entry(name: &str, frames: u32) -> ComponentEntry {
        ComponentEntry::new(
            name,
            PathBuf::from(format!("{name}.tsx")),
            ComponentMetadata::new(frames, 1920, 1080),
        )
    }

    #[test]
    fn renders_imports_and_compositions_in_order() {
        let out = render(&[entry("Intro", 90), entry("Outro", 60)]);

        assert!(out.contains("import { Intro } from \"./components/Intro\";\nimport { Outro }"));
        assert!(out.contains("        id=\"Intro\"\n        component={Intro}\n        durationInFrames={90}\n        fps={30}\n        width={1920}\n        height={1080}\n"));
        assert!(out.find("id=\"Intro\"") < out.find("id=\"Outro\""));
    }

    #[test]
    fn empty_registry_still_renders_root() {
        let out = render(&[]);
        assert!(out.contains("export const RemotionRoot"));
        assert!(parse_composition_ids(&out).is_empty());
        assert!(parse_component_imports(&out).is_empty());
    }

    #[test]
    fn read_back_matches_rendered_entries() {
        let out = render(&[entry("A", 1), entry("B", 2)]);
        assert_eq!(parse_composition_ids(&out), vec!["A", "B"]);
        assert_eq!(
            parse_component_imports(&out),
            vec![
                ("A".to_string(), "A".to_string()),
                ("B".to_string(), "B".to_string())
            ]
        );
        assert_eq!(import_lines(&out).len(), 4);
    }
}
