//! Per-session output capture.
//!
//! Child output is never inherited by the host. Every line a child writes
//! lands here, bounded per session, so failures can be inspected after
//! the fact without flooding the host's own streams.

use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use clipforge_core::SessionId;
use serde::{Deserialize, Serialize};

/// Maximum number of lines kept per session
pub const MAX_LOG_LINES: usize = 2000;

/// Which child stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// A single captured output line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub stream: StreamKind,
    pub line: String,
}

/// Ring buffer of recent lines for one session.
#[derive(Debug)]
struct LogBuffer {
    lines: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(256)),
            capacity,
        }
    }

    fn push(&mut self, entry: LogEntry) {
        if self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(entry);
    }
}

/// Finished sessions whose output is kept for inspection.
pub const MAX_RETAINED_SESSIONS: usize = 32;

#[derive(Debug, Default)]
struct Buffers {
    live: HashMap<SessionId, LogBuffer>,
    /// Retirement order, oldest first.
    retired: VecDeque<SessionId>,
}

/// Log buffers for every session a supervisor has spawned.
///
/// A session's buffer stays readable after it is retired; once more than
/// `retained` sessions have been retired the oldest buffers are dropped.
#[derive(Debug)]
pub struct SessionLogs {
    buffers: RwLock<Buffers>,
    capacity: usize,
    retained: usize,
}

impl Default for SessionLogs {
    fn default() -> Self {
        Self::with_capacity(MAX_LOG_LINES)
    }
}

impl SessionLogs {
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_limits(capacity, MAX_RETAINED_SESSIONS)
    }

    pub fn with_limits(capacity: usize, retained: usize) -> Self {
        Self {
            buffers: RwLock::new(Buffers::default()),
            capacity: capacity.max(1),
            retained,
        }
    }

    /// Append one line, evicting the oldest when the session is at capacity.
    pub fn append(&self, session: SessionId, stream: StreamKind, line: String) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            stream,
            line,
        };
        let mut buffers = self.buffers.write().unwrap_or_else(PoisonError::into_inner);
        buffers
            .live
            .entry(session)
            .or_insert_with(|| LogBuffer::new(self.capacity))
            .push(entry);
    }

    /// Lines captured for a session, oldest first.
    pub fn get(&self, session: SessionId) -> Vec<LogEntry> {
        let buffers = self.buffers.read().unwrap_or_else(PoisonError::into_inner);
        buffers
            .live
            .get(&session)
            .map(|b| b.lines.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Mark a session as finished, dropping the oldest retired buffers
    /// beyond the retention limit. Retiring twice is a no-op.
    pub fn retire(&self, session: SessionId) {
        let mut buffers = self.buffers.write().unwrap_or_else(PoisonError::into_inner);
        if buffers.retired.contains(&session) {
            return;
        }
        buffers.retired.push_back(session);
        while buffers.retired.len() > self.retained {
            if let Some(oldest) = buffers.retired.pop_front() {
                buffers.live.remove(&oldest);
            }
        }
    }

    /// Drop the buffer of a session.
    pub fn clear(&self, session: SessionId) {
        let mut buffers = self.buffers.write().unwrap_or_else(PoisonError::into_inner);
        buffers.live.remove(&session);
        buffers.retired.retain(|id| *id != session);
    }

    /// Number of sessions with a buffer.
    pub fn session_count(&self) -> usize {
        self.buffers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .live
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_evicts_oldest() {
        let logs = SessionLogs::with_capacity(3);
        let id = SessionId::next();
        for i in 0..5 {
            logs.append(id, StreamKind::Stdout, format!("line {i}"));
        }

        let lines: Vec<String> = logs.get(id).into_iter().map(|e| e.line).collect();
        assert_eq!(lines, vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let logs = SessionLogs::default();
        let a = SessionId::next();
        let b = SessionId::next();
        logs.append(a, StreamKind::Stdout, "from a".into());
        logs.append(b, StreamKind::Stderr, "from b".into());

        assert_eq!(logs.get(a).len(), 1);
        assert_eq!(logs.get(b)[0].stream, StreamKind::Stderr);

        logs.clear(a);
        assert!(logs.get(a).is_empty());
        assert_eq!(logs.get(b).len(), 1);
    }

    #[test]
    fn test_retired_sessions_are_bounded() {
        let logs = SessionLogs::with_limits(10, 2);
        let running = SessionId::next();
        logs.append(running, StreamKind::Stdout, "still serving".into());

        let finished: Vec<SessionId> = (0..4).map(|_| SessionId::next()).collect();
        for id in &finished {
            logs.append(*id, StreamKind::Stderr, "crashed".into());
            logs.retire(*id);
            logs.retire(*id);
        }

        assert_eq!(logs.session_count(), 3);
        assert!(logs.get(finished[0]).is_empty());
        assert!(logs.get(finished[1]).is_empty());
        assert_eq!(logs.get(finished[3]).len(), 1);
        assert_eq!(logs.get(running).len(), 1);
    }
}
