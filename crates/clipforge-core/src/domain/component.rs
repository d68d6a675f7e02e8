//! Component entries tracked by the registry.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default composition length when a component file carries no metadata header.
pub const DEFAULT_DURATION_IN_FRAMES: u32 = 150;
/// Default composition width.
pub const DEFAULT_WIDTH: u32 = 1920;
/// Default composition height.
pub const DEFAULT_HEIGHT: u32 = 1080;

/// Presentation metadata for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMetadata {
    pub duration_in_frames: u32,
    pub width: u32,
    pub height: u32,
}

/// Rejected metadata values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

impl ComponentMetadata {
    #[must_use]
    pub const fn new(duration_in_frames: u32, width: u32, height: u32) -> Self {
        Self {
            duration_in_frames,
            width,
            height,
        }
    }

    /// Every dimension must be non-zero.
    pub const fn validate(&self) -> Result<(), MetadataError> {
        if self.duration_in_frames == 0 {
            return Err(MetadataError::Zero {
                field: "durationInFrames",
            });
        }
        if self.width == 0 {
            return Err(MetadataError::Zero { field: "width" });
        }
        if self.height == 0 {
            return Err(MetadataError::Zero { field: "height" });
        }
        Ok(())
    }
}

impl Default for ComponentMetadata {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION_IN_FRAMES, DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl fmt::Display for ComponentMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "durationInFrames={} width={} height={}",
            self.duration_in_frames, self.width, self.height
        )
    }
}

/// One registered component, always recomputed from the file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentEntry {
    /// Unique name, also the exported identifier.
    pub name: String,
    /// Path relative to the component directory.
    pub relative_path: PathBuf,
    #[serde(flatten)]
    pub metadata: ComponentMetadata,
}

impl ComponentEntry {
    pub fn new(name: impl Into<String>, relative_path: PathBuf, metadata: ComponentMetadata) -> Self {
        Self {
            name: name.into(),
            relative_path,
            metadata,
        }
    }

    /// Key used for uniqueness and ordering.
    pub fn sort_key(&self) -> String {
        self.name.to_lowercase()
    }

    /// Module specifier used in the aggregation file, without extension.
    pub fn import_path(&self) -> String {
        let stem = self.relative_path.with_extension("");
        let stem = stem.to_string_lossy().replace('\\', "/");
        format!("./components/{stem}")
    }
}
