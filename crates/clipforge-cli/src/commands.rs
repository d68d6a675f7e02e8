//! Subcommands.

use std::path::PathBuf;

use clap::Subcommand;
use clipforge_core::domain::{DEFAULT_DURATION_IN_FRAMES, DEFAULT_HEIGHT, DEFAULT_WIDTH};

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Locate and verify an executable (e.g. node, npm, npx)
    Resolve {
        name: String,
        /// Extra directory or file to search first (repeatable)
        #[arg(long = "path")]
        paths: Vec<PathBuf>,
    },

    /// Validate a component file and register it
    Add {
        /// Component name; the file must export a constant with this name
        name: String,
        /// File holding the component source
        file: PathBuf,
        #[arg(long, default_value_t = DEFAULT_DURATION_IN_FRAMES)]
        frames: u32,
        #[arg(long, default_value_t = DEFAULT_WIDTH)]
        width: u32,
        #[arg(long, default_value_t = DEFAULT_HEIGHT)]
        height: u32,
    },

    /// Regenerate the aggregation file from the component directory
    Repair,

    /// Check the aggregation file without changing anything
    Validate,

    /// List registered components
    List,

    /// Delete a component and regenerate
    Remove { name: String },

    /// Start the preview server and keep it running until interrupted
    Launch {
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Inspect the project for known configuration problems
    Doctor,

    /// Apply every automatic repair
    Fix,

    /// Diagnose, repair, reinstall dependencies, then launch
    LaunchSafe {
        #[arg(short, long)]
        port: Option<u16>,
    },
}
