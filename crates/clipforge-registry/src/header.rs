//! One-line metadata header stored at the top of each component file.
//!
//! ```text
//! // clipforge: durationInFrames=150 width=1920 height=1080
//! ```
//!
//! The header lets a `ComponentEntry` be recomputed from the file alone.
//! Missing or malformed values fall back to the defaults field by field.

use clipforge_core::ComponentMetadata;

pub const HEADER_PREFIX: &str = "// clipforge:";

/// Only the first few lines are searched for the header.
const HEADER_SEARCH_LINES: usize = 5;

pub fn render_header(metadata: &ComponentMetadata) -> String {
    format!("{HEADER_PREFIX} {metadata}")
}

/// Metadata from the header, or defaults if there is none.
pub fn parse_header(content: &str) -> ComponentMetadata {
    let mut metadata = ComponentMetadata::default();
    let Some(line) = find_header(content) else {
        return metadata;
    };

    for pair in line
        .strip_prefix(HEADER_PREFIX)
        .unwrap_or_default()
        .split_whitespace()
    {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let Ok(value) = value.parse::<u32>() else {
            continue;
        };
        if value == 0 {
            continue;
        }
        match key {
            "durationInFrames" => metadata.duration_in_frames = value,
            "width" => metadata.width = value,
            "height" => metadata.height = value,
            _ => {}
        }
    }
    metadata
}

/// `content` with its header replaced by (or prefixed with) one for `metadata`.
pub fn with_header(content: &str, metadata: &ComponentMetadata) -> String {
    let body: String = if find_header(content).is_some() {
        let mut replaced = false;
        content
            .split_inclusive('\n')
            .filter(|line| {
                if !replaced && line.trim_start().starts_with(HEADER_PREFIX) {
                    replaced = true;
                    return false;
                }
                true
            })
            .collect()
    } else {
        content.to_string()
    };

    let mut out = render_header(metadata);
    out.push('\n');
    out.push_str(&body);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn find_header(content: &str) -> Option<&str> {
    content
        .lines()
        .take(HEADER_SEARCH_LINES)
        .map(str::trim_start)
        .find(|line| line.starts_with(HEADER_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let meta = ComponentMetadata::new(90, 1280, 720);
        let content = with_header("export const A = 1;\n", &meta);
        assert!(content.starts_with("// clipforge: durationInFrames=90 width=1280 height=720\n"));
        assert_eq!(parse_header(&content), meta);
    }

    #[test]
    fn missing_header_uses_defaults() {
        assert_eq!(parse_header("export const A = 1;"), ComponentMetadata::default());
    }

    #[test]
    fn malformed_values_fall_back_per_field() {
        let content = "// clipforge: durationInFrames=abc width=0 height=480\n";
        let meta = parse_header(content);
        assert_eq!(meta.duration_in_frames, 150);
        assert_eq!(meta.width, 1920);
        assert_eq!(meta.height, 480);
    }

    #[test]
    fn existing_header_is_replaced_not_duplicated() {
        let original = "// clipforge: durationInFrames=10 width=10 height=10\nexport const A = 1;\n";
        let updated = with_header(original, &ComponentMetadata::new(20, 20, 20));
        assert_eq!(updated.matches(HEADER_PREFIX).count(), 1);
        assert_eq!(parse_header(&updated).duration_in_frames, 20);
        assert!(updated.ends_with("export const A = 1;\n"));
    }
}
