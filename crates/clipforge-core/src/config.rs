//! Project configuration.
//!
//! Values come from built-in defaults, then `CLIPFORGE_*` environment
//! variables. The CLI applies its flags on top of the result.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_PROJECT_DIR: &str = "CLIPFORGE_PROJECT_DIR";
pub const ENV_PORT: &str = "CLIPFORGE_PORT";
pub const ENV_READY_TIMEOUT_SECS: &str = "CLIPFORGE_READY_TIMEOUT_SECS";
pub const ENV_RESOLVER_TTL_SECS: &str = "CLIPFORGE_RESOLVER_TTL_SECS";
pub const ENV_INSTALL_TIMEOUT_SECS: &str = "CLIPFORGE_INSTALL_TIMEOUT_SECS";
pub const ENV_EXTRA_PATHS: &str = "CLIPFORGE_EXTRA_PATHS";

pub const DEFAULT_PORT: u16 = 3000;

/// Errors from building or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidEnv {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Port {0} is reserved; use a port of 1024 or above")]
    PrivilegedPort(u16),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Project directory must not be empty")]
    EmptyProjectDir,
}

/// Everything the resolver, registry and supervisor need to know about one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project_dir: PathBuf,
    /// Relative to `project_dir`.
    pub components_dir: PathBuf,
    /// Relative to `project_dir`.
    pub aggregation_file: PathBuf,
    pub port: u16,
    pub ready_timeout: Duration,
    pub termination_grace: Duration,
    pub probe_delay: Duration,
    pub resolver_ttl: Duration,
    pub verify_timeout: Duration,
    pub install_timeout: Duration,
    /// Searched before any built-in location.
    pub extra_paths: Vec<PathBuf>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("."))
    }
}

impl ProjectConfig {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            components_dir: PathBuf::from("src/components"),
            aggregation_file: PathBuf::from("src/Root.tsx"),
            port: DEFAULT_PORT,
            ready_timeout: Duration::from_secs(30),
            termination_grace: Duration::from_secs(5),
            probe_delay: Duration::from_secs(1),
            resolver_ttl: Duration::from_secs(300),
            verify_timeout: Duration::from_secs(5),
            install_timeout: Duration::from_secs(300),
            extra_paths: Vec::new(),
        }
    }

    /// Build from defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from defaults overlaid with values from `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_PROJECT_DIR) {
            config.project_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_PORT) {
            config.port = parse_env(ENV_PORT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_READY_TIMEOUT_SECS) {
            config.ready_timeout = Duration::from_secs(parse_env(ENV_READY_TIMEOUT_SECS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_RESOLVER_TTL_SECS) {
            config.resolver_ttl = Duration::from_secs(parse_env(ENV_RESOLVER_TTL_SECS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_INSTALL_TIMEOUT_SECS) {
            config.install_timeout =
                Duration::from_secs(parse_env(ENV_INSTALL_TIMEOUT_SECS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_EXTRA_PATHS) {
            config.extra_paths = std::env::split_paths(&raw)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_extra_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.extra_paths.extend(paths);
        self
    }

    /// Absolute (or project-relative) component directory.
    pub fn components_path(&self) -> PathBuf {
        self.project_dir.join(&self.components_dir)
    }

    /// Absolute (or project-relative) aggregation file.
    pub fn aggregation_path(&self) -> PathBuf {
        self.project_dir.join(&self.aggregation_file)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyProjectDir);
        }
        if self.port < 1024 {
            return Err(ConfigError::PrivilegedPort(self.port));
        }
        let durations = [
            ("ready_timeout", self.ready_timeout),
            ("termination_grace", self.termination_grace),
            ("resolver_ttl", self.resolver_ttl),
            ("verify_timeout", self.verify_timeout),
            ("install_timeout", self.install_timeout),
        ];
        for (name, value) in durations {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration(name));
            }
        }
        Ok(())
    }
}

fn parse_env<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = ProjectConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.ready_timeout, Duration::from_secs(30));
        assert_eq!(config.resolver_ttl, Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_defaults() {
        let config = ProjectConfig::from_lookup(lookup(&[
            (ENV_PROJECT_DIR, "/work/video"),
            (ENV_PORT, "4100"),
            (ENV_READY_TIMEOUT_SECS, "45"),
        ]))
        .unwrap();

        assert_eq!(config.project_dir, PathBuf::from("/work/video"));
        assert_eq!(config.port, 4100);
        assert_eq!(config.ready_timeout, Duration::from_secs(45));
        assert_eq!(
            config.components_path(),
            PathBuf::from("/work/video/src/components")
        );
    }

    #[test]
    fn bad_port_value_is_reported() {
        let err = ProjectConfig::from_lookup(lookup(&[(ENV_PORT, "not-a-port")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: ENV_PORT, .. }));
    }

    #[test]
    fn privileged_port_is_rejected() {
        let config = ProjectConfig::default().with_port(80);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PrivilegedPort(80))
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = ProjectConfig::default().with_ready_timeout(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroDuration("ready_timeout"))
        ));
    }
}
