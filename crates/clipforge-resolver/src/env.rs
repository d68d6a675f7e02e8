//! Environment lookups behind candidate generation.
//!
//! Raw variables come from an [`EnvProvider`]. [`ManagerRoots`] turns them
//! into the directories node version managers install into, following each
//! manager's own override variable before its per-platform default.

use std::ffi::OsString;
use std::path::PathBuf;

use clipforge_core::Platform;

/// Source of environment variables.
pub trait EnvProvider: Send + Sync {
    fn get(&self, key: &str) -> Option<OsString>;

    /// Current user's home directory.
    fn home_dir(&self) -> Option<PathBuf> {
        self.dir("HOME").or_else(|| self.dir("USERPROFILE"))
    }

    /// A variable naming a directory. Empty values count as unset.
    fn dir(&self, key: &str) -> Option<PathBuf> {
        self.get(key).filter(|v| !v.is_empty()).map(PathBuf::from)
    }

    /// Entries of `PATH` in order, empty entries dropped.
    fn search_path(&self, platform: Platform) -> Vec<PathBuf> {
        let Some(path) = self.get("PATH").and_then(|p| p.into_string().ok()) else {
            return Vec::new();
        };
        path.split(platform.path_separator())
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .collect()
    }

    /// Lower-cased `PATHEXT` entries, `None` when unset.
    fn pathext(&self) -> Option<Vec<String>> {
        let raw = self.get("PATHEXT")?.into_string().ok()?;
        Some(
            raw.split(';')
                .filter(|e| !e.is_empty())
                .map(str::to_lowercase)
                .collect(),
        )
    }
}

/// The process environment.
pub struct SystemEnv;

impl EnvProvider for SystemEnv {
    fn get(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }
}

/// Data directories of the supported node version managers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerRoots {
    /// `NVM_DIR` (or `NVM_HOME` for nvm-windows).
    pub nvm: Option<PathBuf>,
    pub fnm: Option<PathBuf>,
    /// Not used on Windows.
    pub asdf: Option<PathBuf>,
}

impl ManagerRoots {
    pub fn locate(env: &dyn EnvProvider, platform: Platform) -> Self {
        let home = env.home_dir();

        if platform.is_windows() {
            let appdata = env.dir("APPDATA");
            return Self {
                nvm: env
                    .dir("NVM_HOME")
                    .or_else(|| appdata.as_ref().map(|a| a.join("nvm"))),
                fnm: env
                    .dir("FNM_DIR")
                    .or_else(|| appdata.as_ref().map(|a| a.join("fnm"))),
                asdf: None,
            };
        }

        let fnm_default = home.as_ref().map(|h| match platform {
            Platform::MacOs => h.join("Library/Application Support/fnm"),
            _ => h.join(".local/share/fnm"),
        });
        Self {
            nvm: env
                .dir("NVM_DIR")
                .or_else(|| home.as_ref().map(|h| h.join(".nvm"))),
            fnm: env.dir("FNM_DIR").or(fnm_default),
            asdf: env
                .dir("ASDF_DATA_DIR")
                .or_else(|| home.as_ref().map(|h| h.join(".asdf"))),
        }
    }
}

/// Fixed variable table for tests.
#[cfg(test)]
#[derive(Default)]
pub struct StaticEnv(std::collections::HashMap<String, OsString>);

#[cfg(test)]
impl<const N: usize> From<[(&str, &str); N]> for StaticEnv {
    fn from(vars: [(&str, &str); N]) -> Self {
        Self(
            vars.into_iter()
                .map(|(k, v)| (k.to_string(), OsString::from(v)))
                .collect(),
        )
    }
}

#[cfg(test)]
impl EnvProvider for StaticEnv {
    fn get(&self, key: &str) -> Option<OsString> {
        self.0.get(key).cloned()
    }
}
