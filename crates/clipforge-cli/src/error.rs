//! CLI-specific error types and exit-code mapping.

use clipforge_core::ConfigError;
use clipforge_registry::RegistryError;
use clipforge_resolver::ResolveError;
use clipforge_runtime::{DoctorError, SafeLaunchError, SupervisorError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// A command ran and reported failure.
    #[error("{0}")]
    Failed(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Process error: {0}")]
    Process(String),
}

impl CliError {
    /// Exit codes follow sysexits.h where one fits.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Failed(_) => 1,
            Self::Validation(_) => 65, // EX_DATAERR
            Self::NotFound(_) => 66,   // EX_NOINPUT
            Self::Process(_) => 71,    // EX_OSERR
            Self::Io(_) => 74,         // EX_IOERR
            Self::Config(_) => 78,     // EX_CONFIG
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<RegistryError> for CliError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Validation { .. }
            | RegistryError::InvalidMetadata { .. }
            | RegistryError::PostWriteValidation { .. } => Self::Validation(err.to_string()),
            RegistryError::NotFound(_) => Self::NotFound(err.to_string()),
            RegistryError::Io { .. } => Self::Io(err.to_string()),
        }
    }
}

impl From<ResolveError> for CliError {
    fn from(err: ResolveError) -> Self {
        Self::NotFound(err.to_string())
    }
}

impl From<DoctorError> for CliError {
    fn from(err: DoctorError) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<SupervisorError> for CliError {
    fn from(err: SupervisorError) -> Self {
        Self::Process(err.to_string())
    }
}

impl From<SafeLaunchError> for CliError {
    fn from(err: SafeLaunchError) -> Self {
        Self::Failed(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
