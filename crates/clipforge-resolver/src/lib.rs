//! Executable path resolution for the preview toolchain.
//!
//! PATH-based lookup is unreliable when clipforge is started by another
//! program (a GUI agent host, a service manager), so command names like
//! `npx` are resolved through several strategies and every hit is
//! verified by running it before it is accepted.
//!
//! ## Architecture
//!
//! - `types`: Core types (`ResolvedExecutable`, `Attempt`, `AttemptOutcome`, `Strategy`)
//! - `env`: Environment variable access trait (injectable for testing)
//! - `fs`: Filesystem operations trait (injectable for testing)
//! - `search`: Platform-specific candidate generation
//! - `verify`: Version-query verification and the native locator
//! - `shell`: Shell shim detection and path quoting
//! - `resolve`: Orchestration and the TTL cache
//!
//! ## Usage
//!
//! ```rust,no_run
//! use clipforge_resolver::ExecutableResolver;
//!
//! # async fn demo() -> Result<(), clipforge_resolver::ResolveError> {
//! let resolver = ExecutableResolver::default();
//! let npx = resolver.resolve("npx", &[]).await?;
//! println!("{} ({})", npx.path.display(), npx.version);
//! for attempt in &npx.attempts {
//!     println!("  {} - {}", attempt.candidate.display(), attempt.outcome);
//! }
//! # Ok(())
//! # }
//! ```

mod env;
mod fs;
mod resolve;
mod search;
mod shell;
mod types;
mod verify;

pub use env::{EnvProvider, ManagerRoots, SystemEnv};
pub use fs::{FsProvider, SystemFs};
pub use resolve::{DEFAULT_TTL, DEFAULT_VERIFY_TIMEOUT, ExecutableResolver, ResolverStats};
pub use search::sort_versions_desc;
pub use shell::{needs_shell, quote_for_shell};
pub use types::{Attempt, AttemptOutcome, ResolveError, ResolvedExecutable, Strategy};
pub use verify::{CommandLocator, ProcessVerifier, SystemLocator, VERSION_FLAG, Verifier, VerifyError};
