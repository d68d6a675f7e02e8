//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Prepare, register and supervise video preview projects.
#[derive(Debug, Parser)]
#[command(name = "clipforge")]
#[command(about = "Prepare, register and supervise video preview projects")]
#[command(version)]
pub struct Cli {
    /// Project directory (overrides CLIPFORGE_PROJECT_DIR)
    #[arg(short = 'C', long = "project-dir", global = true)]
    pub project_dir: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
