//! Command handlers.
//!
//! Each handler takes the composed [`crate::bootstrap::CliContext`] and
//! prints either text or JSON depending on `--json`.

pub mod add;
pub mod doctor;
pub mod launch;
pub mod list;
pub mod registry;
pub mod resolve;
