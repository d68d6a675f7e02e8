//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where the resolver, registry, supervisor
//! and doctor are wired together for the CLI. Command handlers receive the
//! composed [`CliContext`] and delegate work to it.

use std::sync::Arc;

use clipforge_core::ProjectConfig;
use clipforge_registry::RegistryManager;
use clipforge_resolver::ExecutableResolver;
use clipforge_runtime::{DependencyInstaller, Doctor, NpmInstaller, ProcessSupervisor, SafeLauncher};
use tracing::debug;

use crate::error::CliError;
use crate::parser::Cli;

/// Fully composed application context for CLI commands.
pub struct CliContext {
    pub config: ProjectConfig,
    /// Shared by every component so resolutions are cached once per run.
    pub resolver: Arc<ExecutableResolver>,
    pub registry: RegistryManager,
    pub supervisor: Arc<ProcessSupervisor>,
    pub installer: Arc<dyn DependencyInstaller>,
    /// Print JSON instead of text.
    pub json: bool,
}

impl CliContext {
    pub fn doctor(&self) -> Doctor {
        Doctor::from_config(&self.config, Arc::clone(&self.resolver))
    }

    pub fn safe_launcher(&self) -> SafeLauncher {
        SafeLauncher::new(
            self.doctor(),
            Arc::clone(&self.supervisor),
            Arc::clone(&self.installer),
        )
    }

    /// Port from the command line, else from configuration.
    pub fn port(&self, flag: Option<u16>) -> Result<u16, CliError> {
        let config = self.config.clone().with_port(flag.unwrap_or(self.config.port));
        config.validate()?;
        Ok(config.port)
    }
}

/// Build the context from environment configuration and global flags.
pub fn bootstrap(cli: &Cli) -> Result<CliContext, CliError> {
    let mut config = ProjectConfig::from_env()?;
    if let Some(dir) = &cli.project_dir {
        config.project_dir.clone_from(dir);
    }
    config.validate()?;
    debug!(project_dir = %config.project_dir.display(), port = config.port, "Configuration loaded");

    let resolver = Arc::new(ExecutableResolver::new(
        config.resolver_ttl,
        config.verify_timeout,
    ));
    let registry = RegistryManager::from_config(&config);
    let supervisor = Arc::new(ProcessSupervisor::from_config(
        &config,
        Arc::clone(&resolver),
    ));
    let installer: Arc<dyn DependencyInstaller> =
        Arc::new(NpmInstaller::from_config(&config, Arc::clone(&resolver)));

    Ok(CliContext {
        config,
        resolver,
        registry,
        supervisor,
        installer,
        json: cli.json,
    })
}
