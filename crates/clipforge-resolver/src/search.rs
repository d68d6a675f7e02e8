//! Platform-specific candidate generation.
//!
//! Each strategy only produces candidate paths. Checking and verifying them
//! is the resolver's job, so the order of the returned list is the probe order.

use std::cmp::Ordering;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use clipforge_core::Platform;

use super::env::{EnvProvider, ManagerRoots};
use super::fs::FsProvider;

/// Default Windows executable extensions if PATHEXT is not set.
const DEFAULT_PATHEXT: [&str; 4] = [".cmd", ".exe", ".bat", ".com"];

/// Produces candidate paths for a command name.
pub struct CandidateSearch<'a> {
    env: &'a dyn EnvProvider,
    fs: &'a dyn FsProvider,
    platform: Platform,
}

impl<'a> CandidateSearch<'a> {
    pub fn new(env: &'a dyn EnvProvider, fs: &'a dyn FsProvider, platform: Platform) -> Self {
        Self { env, fs, platform }
    }

    /// File names to probe in each directory (e.g., npx -> [npx, npx.cmd, npx.exe] on Windows).
    pub fn name_variants(&self, command: &str) -> Vec<String> {
        if !self.platform.is_windows() || Path::new(command).extension().is_some() {
            return vec![command.to_string()];
        }

        let mut variants = vec![command.to_string()];
        match self.env.pathext() {
            Some(exts) => variants.extend(exts.iter().map(|ext| format!("{command}{ext}"))),
            None => variants.extend(DEFAULT_PATHEXT.iter().map(|ext| format!("{command}{ext}"))),
        }
        variants
    }

    /// Caller paths first, then well-known install locations.
    ///
    /// A caller path may name a directory or the executable itself.
    pub fn curated(&self, command: &str, custom_paths: &[PathBuf]) -> Vec<PathBuf> {
        let variants = self.name_variants(command);
        let mut candidates = Vec::new();

        for custom in custom_paths {
            if custom.as_os_str().is_empty() {
                continue;
            }
            let names_file = custom
                .file_name()
                .and_then(OsStr::to_str)
                .is_some_and(|f| variants.iter().any(|v| v == f));
            if names_file {
                candidates.push(custom.clone());
            }
            candidates.extend(variants.iter().map(|v| custom.join(v)));
        }

        for dir in self.well_known_dirs() {
            candidates.extend(variants.iter().map(|v| dir.join(v)));
        }

        dedup_preserving_order(candidates)
    }

    /// Every directory of the inherited search path.
    pub fn path_scan(&self, command: &str) -> Vec<PathBuf> {
        let variants = self.name_variants(command);
        let candidates = self
            .env
            .search_path(self.platform)
            .into_iter()
            .flat_map(|dir| variants.iter().map(move |v| dir.join(v)).collect::<Vec<_>>())
            .collect();
        dedup_preserving_order(candidates)
    }

    /// Per-version install directories, newest version first.
    pub fn version_managers(&self, command: &str) -> Vec<PathBuf> {
        let variants = self.name_variants(command);
        let mut candidates = Vec::new();

        for layout in self.version_layouts() {
            if let Some(preferred) = &layout.preferred {
                let bin = layout.bin_dir(preferred);
                candidates.extend(variants.iter().map(|v| bin.join(v)));
            }
            for version in sort_versions_desc(self.fs.list_subdirs(&layout.root)) {
                let bin = layout.bin_dir(&version);
                candidates.extend(variants.iter().map(|v| bin.join(v)));
            }
        }

        dedup_preserving_order(candidates)
    }

    /// Hand-maintained install locations for this platform.
    fn well_known_dirs(&self) -> Vec<PathBuf> {
        let home = self.env.home_dir();
        let mut dirs: Vec<PathBuf> = Vec::new();

        match self.platform {
            Platform::Windows => {
                for key in ["ProgramFiles", "ProgramFiles(x86)"] {
                    if let Some(base) = self.env.dir(key) {
                        dirs.push(base.join("nodejs"));
                    }
                }
                if let Some(appdata) = self.env.dir("APPDATA") {
                    dirs.push(appdata.join("npm"));
                }
                if let Some(local) = self.env.dir("LOCALAPPDATA") {
                    dirs.push(local.join("Volta").join("bin"));
                }
                dirs.extend(self.env.dir("NVM_SYMLINK"));
            }
            Platform::MacOs => {
                dirs.extend(
                    ["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin", "/bin"]
                        .map(PathBuf::from),
                );
            }
            Platform::Linux | Platform::Other => {
                dirs.extend(["/usr/local/bin", "/usr/bin", "/bin", "/snap/bin"].map(PathBuf::from));
            }
        }

        if !self.platform.is_windows() {
            if let Some(home) = &home {
                dirs.push(home.join(".volta/bin"));
            }
            if let Some(asdf) = ManagerRoots::locate(self.env, self.platform).asdf {
                dirs.push(asdf.join("shims"));
            }
            if let Some(home) = home {
                dirs.push(home.join(".local/bin"));
                dirs.push(home.join(".npm-global/bin"));
            }
        }

        dirs
    }

    fn version_layouts(&self) -> Vec<VersionLayout> {
        let roots = ManagerRoots::locate(self.env, self.platform);
        let mut layouts = Vec::new();

        if self.platform.is_windows() {
            layouts.extend(roots.nvm.map(|nvm| VersionLayout::new(nvm, &[])));
            layouts.extend(
                roots
                    .fnm
                    .map(|fnm| VersionLayout::new(fnm.join("node-versions"), &["installation"])),
            );
            return layouts;
        }

        if let Some(nvm) = roots.nvm {
            let preferred = self
                .fs
                .read_text(&nvm.join("alias/default"))
                .map(|alias| alias.trim().to_string())
                .filter(|alias| alias.chars().next().is_some_and(|c| c.is_ascii_digit() || c == 'v'))
                .map(|alias| {
                    if alias.starts_with('v') {
                        alias
                    } else {
                        format!("v{alias}")
                    }
                });
            let mut layout = VersionLayout::new(nvm.join("versions/node"), &["bin"]);
            layout.preferred = preferred;
            layouts.push(layout);
        }
        if let Some(fnm) = roots.fnm {
            layouts.push(VersionLayout::new(
                fnm.join("node-versions"),
                &["installation", "bin"],
            ));
        }
        if let Some(asdf) = roots.asdf {
            layouts.push(VersionLayout::new(asdf.join("installs/nodejs"), &["bin"]));
        }

        layouts
    }
}

/// `<root>/<version>/<suffix...>` holds the executables.
struct VersionLayout {
    root: PathBuf,
    suffix: &'static [&'static str],
    /// Version named by the manager's default alias, probed first.
    preferred: Option<String>,
}

impl VersionLayout {
    const fn new(root: PathBuf, suffix: &'static [&'static str]) -> Self {
        Self {
            root,
            suffix,
            preferred: None,
        }
    }

    fn bin_dir(&self, version: &str) -> PathBuf {
        let mut dir = self.root.join(version);
        for part in self.suffix {
            dir.push(part);
        }
        dir
    }
}

/// Parsed semantic versions descending; unparseable names after them, reverse lexical.
pub fn sort_versions_desc(names: Vec<String>) -> Vec<String> {
    let mut parsed: Vec<(Option<semver::Version>, String)> = names
        .into_iter()
        .map(|name| {
            let trimmed = name.trim_start_matches(['v', 'V']);
            (semver::Version::parse(trimmed).ok(), name)
        })
        .collect();

    parsed.sort_by(|(va, na), (vb, nb)| match (va, vb) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => nb.cmp(na),
    });

    parsed.into_iter().map(|(_, name)| name).collect()
}

fn dedup_preserving_order(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = std::collections::HashSet::new();
    paths.into_iter().filter(|p| seen.insert(p.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::StaticEnv;
    use crate::fs::MockFs;

    #[test]
    fn test_path_scan_lists_every_directory() {
        let env = StaticEnv::from([("PATH", "/usr/bin::/usr/local/bin")]);
        let fs = MockFs::new();

        let search = CandidateSearch::new(&env, &fs, Platform::Linux);
        let candidates = search.path_scan("npx");

        assert_eq!(
            candidates,
            vec![PathBuf::from("/usr/bin/npx"), PathBuf::from("/usr/local/bin/npx")]
        );
    }

    #[test]
    fn test_path_scan_without_path_is_empty() {
        let env = StaticEnv::default();
        let fs = MockFs::new();

        let search = CandidateSearch::new(&env, &fs, Platform::Linux);
        assert!(search.path_scan("npx").is_empty());
    }

    #[test]
    fn test_windows_variants_follow_pathext() {
        let env = StaticEnv::from([("PATHEXT", ".EXE;.CMD")]);
        let fs = MockFs::new();

        let search = CandidateSearch::new(&env, &fs, Platform::Windows);
        assert_eq!(search.name_variants("npx"), vec!["npx", "npx.exe", "npx.cmd"]);
        assert_eq!(search.name_variants("node.exe"), vec!["node.exe"]);
    }

    #[test]
    fn test_windows_variants_default_without_pathext() {
        let env = StaticEnv::default();
        let fs = MockFs::new();

        let search = CandidateSearch::new(&env, &fs, Platform::Windows);
        assert_eq!(
            search.name_variants("npm"),
            vec!["npm", "npm.cmd", "npm.exe", "npm.bat", "npm.com"]
        );
    }

    #[test]
    fn test_curated_puts_custom_paths_first() {
        let env = StaticEnv::from([("HOME", "/home/dev")]);
        let fs = MockFs::new();

        let search = CandidateSearch::new(&env, &fs, Platform::Linux);
        let candidates = search.curated(
            "node",
            &[PathBuf::from("/opt/node/bin"), PathBuf::from("/tools/node")],
        );

        assert_eq!(candidates[0], PathBuf::from("/opt/node/bin/node"));
        // A custom path naming the executable itself is probed as-is
        assert_eq!(candidates[1], PathBuf::from("/tools/node"));
        assert!(candidates.contains(&PathBuf::from("/usr/local/bin/node")));
        assert!(candidates.contains(&PathBuf::from("/home/dev/.volta/bin/node")));
    }

    #[test]
    fn test_macos_prefers_homebrew() {
        let env = StaticEnv::default();
        let fs = MockFs::new();

        let search = CandidateSearch::new(&env, &fs, Platform::MacOs);
        let candidates = search.curated("npx", &[]);
        assert_eq!(candidates[0], PathBuf::from("/opt/homebrew/bin/npx"));
    }

    #[test]
    fn test_version_manager_newest_first() {
        let env = StaticEnv::from([("HOME", "/home/dev")]);
        let fs = MockFs::new().with_subdirs(
            "/home/dev/.nvm/versions/node",
            &["v18.19.0", "v20.11.1", "v9.0.0", "system"],
        );

        let search = CandidateSearch::new(&env, &fs, Platform::Linux);
        let candidates = search.version_managers("node");

        assert_eq!(
            &candidates[..4],
            &[
                PathBuf::from("/home/dev/.nvm/versions/node/v20.11.1/bin/node"),
                PathBuf::from("/home/dev/.nvm/versions/node/v18.19.0/bin/node"),
                PathBuf::from("/home/dev/.nvm/versions/node/v9.0.0/bin/node"),
                PathBuf::from("/home/dev/.nvm/versions/node/system/bin/node"),
            ]
        );
    }

    #[test]
    fn test_nvm_default_alias_is_probed_first() {
        let env = StaticEnv::from([("NVM_DIR", "/nvm")]);
        let fs = MockFs::new()
            .with_file("/nvm/alias/default", "18.19.0\n")
            .with_subdirs("/nvm/versions/node", &["v18.19.0", "v20.11.1"]);

        let search = CandidateSearch::new(&env, &fs, Platform::Linux);
        let candidates = search.version_managers("npx");

        assert_eq!(
            candidates[0],
            PathBuf::from("/nvm/versions/node/v18.19.0/bin/npx")
        );
        assert_eq!(
            candidates[1],
            PathBuf::from("/nvm/versions/node/v20.11.1/bin/npx")
        );
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_fnm_layout() {
        let env = StaticEnv::from([("FNM_DIR", "/fnm")]);
        let fs = MockFs::new().with_subdirs("/fnm/node-versions", &["v21.0.0"]);

        let search = CandidateSearch::new(&env, &fs, Platform::Linux);
        let candidates = search.version_managers("node");

        assert_eq!(
            candidates,
            vec![PathBuf::from("/fnm/node-versions/v21.0.0/installation/bin/node")]
        );
    }

    #[test]
    fn test_sort_versions_handles_prerelease_and_garbage() {
        let sorted = sort_versions_desc(vec![
            "v20.0.0-rc.1".to_string(),
            "lts".to_string(),
            "v20.0.0".to_string(),
            "19.9.9".to_string(),
        ]);
        assert_eq!(sorted, vec!["v20.0.0", "v20.0.0-rc.1", "19.9.9", "lts"]);
    }
}
