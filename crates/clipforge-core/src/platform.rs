//! Host platform detection.
//!
//! Lookups that differ per OS take a `Platform` value rather than using
//! `cfg!` directly, so every platform's behavior can be exercised from tests
//! on any host.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl Platform {
    /// Platform this binary was compiled for.
    pub const fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Other
        }
    }

    pub const fn is_windows(self) -> bool {
        matches!(self, Self::Windows)
    }

    /// Separator used by the `PATH` variable.
    pub const fn path_separator(self) -> char {
        if self.is_windows() { ';' } else { ':' }
    }

    /// Native "where is this command" utility.
    pub const fn locator_command(self) -> &'static str {
        if self.is_windows() { "where" } else { "which" }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Linux => "linux",
            Self::MacOs => "macos",
            Self::Windows => "windows",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}
