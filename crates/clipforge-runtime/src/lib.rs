//! Preview-server runtime for clipforge.
//!
//! - [`ProcessSupervisor`] spawns the preview server, waits for its ready
//!   marker, classifies failures and owns every child until it is reaped.
//! - [`Doctor`] inspects a project for known incompatibilities and repairs
//!   what it safely can.
//! - [`SafeLauncher`] chains the two: diagnose, fix, reinstall, launch.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use clipforge_core::ProjectConfig;
//! use clipforge_resolver::ExecutableResolver;
//! use clipforge_runtime::ProcessSupervisor;
//!
//! # async fn run() {
//! let config = ProjectConfig::new("./my-video");
//! let resolver = Arc::new(ExecutableResolver::default());
//! let supervisor = Arc::new(ProcessSupervisor::from_config(&config, resolver));
//! supervisor.install_shutdown_hook();
//!
//! let outcome = supervisor.launch(config.port).await;
//! println!("{:?} {:?}", outcome.state, outcome.url);
//! supervisor.shutdown_all().await;
//! # }
//! ```

mod command;
pub mod doctor;
mod error;
mod events;
mod install;
mod logs;
mod ports;
mod probe;
mod readiness;
mod safe_launch;
mod shutdown;
mod stream;
mod supervisor;

pub use command::{LaunchCommand, PORT_PLACEHOLDER};
pub use doctor::{DiagnosisReport, Doctor, DoctorError, FixReport};
pub use error::SupervisorError;
pub use events::{SessionEvent, SessionSnapshot};
pub use install::{
    DEFAULT_INSTALL_GRACE, DependencyInstaller, INSTALL_ARGS, InstallError, NpmInstaller,
    PACKAGE_MANAGER,
};
pub use logs::{LogEntry, MAX_LOG_LINES, MAX_RETAINED_SESSIONS, SessionLogs, StreamKind};
pub use ports::is_port_available;
pub use probe::{ProbeOutcome, probe_url};
pub use readiness::{ChildEvent, DEFAULT_READY_MARKERS, ReadinessMachine, Verdict};
pub use safe_launch::{LaunchPhase, SafeLaunchError, SafeLaunchReport, SafeLauncher};
pub use shutdown::{ProcessGroupGuard, terminate_child};
pub use supervisor::{ProcessSupervisor, SessionInfo, SupervisorSettings};
