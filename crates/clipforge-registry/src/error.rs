//! Registry error types.

use std::io;
use std::path::PathBuf;

use clipforge_core::MetadataError;

use crate::contract::ContractViolation;

/// Errors surfaced by registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Content or name rejected before anything was written.
    #[error("Validation failed for component '{name}': {violation}")]
    Validation {
        name: String,
        violation: ContractViolation,
    },

    #[error("Invalid metadata for component '{name}': {source}")]
    InvalidMetadata {
        name: String,
        #[source]
        source: MetadataError,
    },

    /// The written file did not survive re-reading; it has been removed.
    #[error("Component '{name}' failed validation after being written ({reason}); the file was removed")]
    PostWriteValidation { name: String, reason: String },

    #[error("Component '{0}' does not exist")]
    NotFound(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RegistryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Filesystem failures, as opposed to rejected content.
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}
