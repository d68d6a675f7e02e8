//! Shared CLI presentation utilities.
//!
//! Keep this module format-only: handlers decide what to show, these
//! helpers decide how.

pub mod reports;
pub mod tables;

pub use reports::{print_json, print_launch_outcome, print_log_tail};
pub use tables::{print_separator, truncate_string};
