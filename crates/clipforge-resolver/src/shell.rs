//! Shell invocation helpers.
//!
//! On Windows, npm installs `.cmd`/`.bat` shims that cannot be spawned
//! directly; they must go through `cmd /C`, and then the path has to be
//! quoted for the shell.

use std::path::Path;

use clipforge_core::Platform;

/// Whether `path` has to be run through the platform shell.
pub fn needs_shell(path: &Path, platform: Platform) -> bool {
    platform.is_windows()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("cmd") || e.eq_ignore_ascii_case("bat"))
}

/// Quote `path` for use inside a shell command line.
///
/// Paths made only of safe characters are returned unchanged.
pub fn quote_for_shell(path: &Path, platform: Platform) -> String {
    let raw = path.to_string_lossy();

    if platform.is_windows() {
        if raw.chars().any(|c| c.is_whitespace() || "&()[]{}^=;!'+,`~".contains(c)) {
            format!("\"{}\"", raw.replace('"', "\"\""))
        } else {
            raw.into_owned()
        }
    } else if !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+:,@%".contains(c))
    {
        raw.into_owned()
    } else {
        format!("'{}'", raw.replace('\'', "'\\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmd_shims_need_shell_on_windows_only() {
        let shim = Path::new(r"C:\Program Files\nodejs\npx.cmd");
        assert!(needs_shell(shim, Platform::Windows));
        assert!(needs_shell(Path::new("npm.BAT"), Platform::Windows));
        assert!(!needs_shell(Path::new("node.exe"), Platform::Windows));
        assert!(!needs_shell(shim, Platform::Linux));
    }

    #[test]
    fn windows_quotes_paths_with_spaces() {
        let shim = Path::new(r"C:\Program Files\nodejs\npx.cmd");
        assert_eq!(
            quote_for_shell(shim, Platform::Windows),
            r#""C:\Program Files\nodejs\npx.cmd""#
        );
        assert_eq!(
            quote_for_shell(Path::new(r"C:\nodejs\npx.cmd"), Platform::Windows),
            r"C:\nodejs\npx.cmd"
        );
    }

    #[test]
    fn unix_single_quotes_and_escapes() {
        assert_eq!(
            quote_for_shell(Path::new("/usr/local/bin/npx"), Platform::Linux),
            "/usr/local/bin/npx"
        );
        assert_eq!(
            quote_for_shell(Path::new("/Users/me/My Tools/npx"), Platform::MacOs),
            "'/Users/me/My Tools/npx'"
        );
        assert_eq!(
            quote_for_shell(Path::new("/tmp/it's/npx"), Platform::Linux),
            r"'/tmp/it'\''s/npx'"
        );
    }
}
