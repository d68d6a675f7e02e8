//! Core domain types and port definitions for clipforge.
//!
//! This crate is shared by the resolver, registry and runtime crates. It holds
//! everything that has no process, network or template knowledge:
//!
//! - `domain` - component entries, launch outcomes, diagnostic issues
//! - `ports` - trait abstractions injected into the other crates (clock)
//! - `config` - project configuration with environment overrides
//! - `platform` - host platform detection used for per-OS lookups
//! - `fs` - atomic file replacement shared by every writer

pub mod config;
pub mod domain;
pub mod fs;
pub mod platform;
pub mod ports;

// Re-export commonly used types for convenience
pub use config::{ConfigError, ProjectConfig};
pub use domain::{
    ComponentEntry, ComponentMetadata, DiagnosticIssue, IssueKind, LaunchErrorKind, LaunchOutcome,
    LaunchState, MetadataError, SessionId, SessionState,
};
pub use fs::{atomic_write, atomic_write_str};
pub use platform::Platform;
pub use ports::{Clock, ManualClock, SystemClock};
