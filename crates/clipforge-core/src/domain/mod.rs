//! Domain types shared across clipforge crates.
//!
//! These types are pure data: no filesystem, process or network access.

mod component;
mod diagnostic;
mod launch;

pub use component::{
    ComponentEntry, ComponentMetadata, DEFAULT_DURATION_IN_FRAMES, DEFAULT_HEIGHT, DEFAULT_WIDTH,
    MetadataError,
};
pub use diagnostic::{DiagnosticIssue, IssueKind};
pub use launch::{LaunchErrorKind, LaunchOutcome, LaunchState, SessionId, SessionState};
