//! Session lifecycle events.
//!
//! Every state change of a launch session is broadcast so that hosts can
//! follow progress without polling the supervisor.

use chrono::{DateTime, Utc};
use clipforge_core::{SessionId, SessionState};
use serde::{Deserialize, Serialize};

/// Broadcast channel capacity; slow subscribers observe `Lagged`.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A session's state at the moment an event was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub port: u16,
    pub state: SessionState,
    pub updated_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn new(session_id: SessionId, port: u16, state: SessionState) -> Self {
        Self {
            session_id,
            port,
            state,
            updated_at: Utc::now(),
        }
    }
}

/// Session lifecycle event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SessionEvent {
    /// The session moved to a new state.
    Transition(SessionSnapshot),

    /// The child exited without being asked to.
    Crashed {
        #[serde(flatten)]
        session: SessionSnapshot,
        exit: String,
    },
}

impl SessionEvent {
    pub const fn session_id(&self) -> SessionId {
        match self {
            Self::Transition(s) | Self::Crashed { session: s, .. } => s.session_id,
        }
    }

    pub const fn state(&self) -> SessionState {
        match self {
            Self::Transition(s) | Self::Crashed { session: s, .. } => s.state,
        }
    }
}
