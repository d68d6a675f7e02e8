//! Async child stream readers (non-UTF8-safe).
//!
//! Node tooling can emit partial lines, colour codes and the occasional
//! non-UTF8 byte. Readers therefore work on raw chunks: each chunk is
//! forwarded to the readiness machine as-is, and completed lines are
//! decoded lossily into the session log.

use std::sync::Arc;

use clipforge_core::SessionId;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::logs::{SessionLogs, StreamKind};
use crate::readiness::ChildEvent;

const CHUNK_SIZE: usize = 4096;

/// Spawn a task that drains `stream` until EOF.
///
/// Chunks go to `events` while anyone listens; once the receiver is gone
/// the task keeps draining into the log so the child never blocks on a
/// full pipe.
pub fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    session: SessionId,
    kind: StreamKind,
    logs: Arc<SessionLogs>,
    events: UnboundedSender<ChildEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = stream;
        let mut chunk = vec![0u8; CHUNK_SIZE];
        let mut pending: Vec<u8> = Vec::with_capacity(CHUNK_SIZE);

        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break, // EOF
                Ok(n) => {
                    let bytes = &chunk[..n];
                    let _ = events.send(ChildEvent::Output {
                        kind,
                        chunk: String::from_utf8_lossy(bytes).into_owned(),
                    });

                    pending.extend_from_slice(bytes);
                    for line in drain_lines(&mut pending) {
                        debug!(session = %session, stream = kind.as_str(), "{line}");
                        logs.append(session, kind, line);
                    }
                }
                Err(e) => {
                    debug!(session = %session, stream = kind.as_str(), error = %e, "stream reader exiting due to read error");
                    break;
                }
            }
        }

        if !pending.is_empty() {
            let line = decode_line(&pending);
            debug!(session = %session, stream = kind.as_str(), "{line}");
            logs.append(session, kind, line);
        }

        debug!(session = %session, stream = kind.as_str(), "stream reader task exiting");
    })
}

/// Remove every complete line from `pending`, leaving the unterminated tail.
fn drain_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let Some(last_newline) = pending.iter().rposition(|&b| b == b'\n') else {
        return Vec::new();
    };
    let complete: Vec<u8> = pending.drain(..=last_newline).collect();
    complete
        .split(|&b| b == b'\n')
        .filter(|l| !l.is_empty())
        .map(decode_line)
        .collect()
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_drain_lines_keeps_partial_tail() {
        let mut pending = b"first\r\nsecond\nthi".to_vec();
        let lines = drain_lines(&mut pending);

        assert_eq!(lines, vec!["first", "second"]);
        assert_eq!(pending, b"thi");
    }

    #[test]
    fn test_drain_lines_without_newline() {
        let mut pending = b"no newline yet".to_vec();
        assert!(drain_lines(&mut pending).is_empty());
        assert_eq!(pending.len(), 14);
    }

    #[tokio::test]
    async fn test_reader_forwards_chunks_and_logs_lines() {
        let logs = Arc::new(SessionLogs::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = SessionId::next();
        let input: &[u8] = b"hello\nwor\xffld\npartial";

        spawn_stream_reader(input, id, StreamKind::Stdout, Arc::clone(&logs), tx)
            .await
            .unwrap();

        let mut seen = String::new();
        while let Ok(ChildEvent::Output { chunk, .. }) = rx.try_recv() {
            seen.push_str(&chunk);
        }
        assert!(seen.starts_with("hello\n"));

        let lines: Vec<String> = logs.get(id).into_iter().map(|e| e.line).collect();
        assert_eq!(lines, vec!["hello", "wor\u{fffd}ld", "partial"]);
    }

    #[tokio::test]
    async fn test_reader_keeps_draining_after_receiver_drops() {
        let logs = Arc::new(SessionLogs::default());
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let id = SessionId::next();

        spawn_stream_reader(&b"a\nb\n"[..], id, StreamKind::Stderr, Arc::clone(&logs), tx)
            .await
            .unwrap();

        assert_eq!(logs.get(id).len(), 2);
    }
}
