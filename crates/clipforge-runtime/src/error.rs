//! Supervisor errors.
//!
//! Launch failures are not errors here: `launch` always returns a
//! classified `LaunchOutcome`. These cover operations on existing sessions.

use std::io;

use clipforge_core::SessionId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("No live session {0}")]
    SessionNotFound(SessionId),

    #[error("Failed to terminate {session}: {source}")]
    Terminate {
        session: SessionId,
        #[source]
        source: io::Error,
    },
}
