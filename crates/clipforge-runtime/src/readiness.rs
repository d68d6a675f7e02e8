//! Readiness detection for a freshly spawned preview server.
//!
//! Stdout chunks, stderr chunks, child exit and the deadline all arrive as
//! [`ChildEvent`]s and go through one transition function. Whichever event
//! decides the session first wins; later events are ignored.

use std::sync::LazyLock;

use clipforge_core::{LaunchErrorKind, SessionState};
use regex::Regex;

use crate::logs::StreamKind;

/// Ready markers printed by the preview server once it is listening.
///
/// `{port}` is replaced with the requested port.
pub const DEFAULT_READY_MARKERS: &[&str] = &[
    "Local:",
    "Server ready",
    "Server running at",
    "localhost:{port}",
];

/// Fatal stderr patterns, matched case-insensitively.
const FATAL_PATTERNS: &[(&str, LaunchErrorKind)] = &[
    ("eaddrinuse", LaunchErrorKind::PortInUse),
    ("address already in use", LaunchErrorKind::PortInUse),
    ("eacces", LaunchErrorKind::ProcessSpawnError),
    ("permission denied", LaunchErrorKind::ProcessSpawnError),
];

/// Upper bound on the unterminated line carried between chunks.
const MAX_CARRY: usize = 1024;
/// Upper bound on captured output used for exit classification.
const MAX_CAPTURE: usize = 8 * 1024;

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").unwrap());

static HTTP_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>`]+"#).unwrap());

/// Something that happened to a child while it was starting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildEvent {
    Output { kind: StreamKind, chunk: String },
    Exited { code: Option<i32> },
    Deadline,
    Cancelled,
}

/// The decision taken for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Ready { url: String },
    Failed { kind: LaunchErrorKind, message: String },
    TimedOut { message: String },
}

impl Verdict {
    pub const fn state(&self) -> SessionState {
        match self {
            Self::Ready { .. } => SessionState::Ready,
            Self::Failed { .. } => SessionState::Failed,
            Self::TimedOut { .. } => SessionState::Timeout,
        }
    }
}

#[derive(Debug, Default)]
struct StreamScan {
    carry: String,
    capture: String,
}

impl StreamScan {
    /// Join the carried partial line with `chunk`, colour codes removed.
    fn window(&self, chunk: &str) -> String {
        let joined = format!("{}{chunk}", self.carry);
        ANSI_ESCAPE.replace_all(&joined, "").into_owned()
    }

    fn advance(&mut self, window: &str, chunk: &str) {
        let tail = window.rsplit('\n').next().unwrap_or_default();
        self.carry = keep_tail(tail, MAX_CARRY).to_string();
        self.record(chunk);
    }

    fn record(&mut self, chunk: &str) {
        self.capture.push_str(chunk);
        if self.capture.len() > MAX_CAPTURE {
            self.capture = keep_tail(&self.capture, MAX_CAPTURE).to_string();
        }
    }
}

/// Pure state machine for `AWAITING_READY`.
#[derive(Debug)]
pub struct ReadinessMachine {
    port: u16,
    markers: Vec<String>,
    state: SessionState,
    stdout: StreamScan,
    stderr: StreamScan,
}

impl ReadinessMachine {
    pub fn new<S: AsRef<str>>(port: u16, markers: &[S]) -> Self {
        let markers = markers
            .iter()
            .map(|m| m.as_ref().replace("{port}", &port.to_string()))
            .filter(|m| !m.is_empty())
            .collect();
        Self {
            port,
            markers,
            state: SessionState::AwaitingReady,
            stdout: StreamScan::default(),
            stderr: StreamScan::default(),
        }
    }

    pub fn with_default_markers(port: u16) -> Self {
        Self::new(port, DEFAULT_READY_MARKERS)
    }

    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub const fn is_decided(&self) -> bool {
        !matches!(self.state, SessionState::AwaitingReady)
    }

    /// Feed one event. Returns the verdict if this event decided the session.
    pub fn on_event(&mut self, event: ChildEvent) -> Option<Verdict> {
        if self.is_decided() {
            return None;
        }

        let verdict = match event {
            ChildEvent::Output {
                kind: StreamKind::Stdout,
                chunk,
            } => self.scan_stdout(&chunk),
            ChildEvent::Output {
                kind: StreamKind::Stderr,
                chunk,
            } => self.scan_stderr(&chunk),
            ChildEvent::Exited { code } => Some(self.exit_verdict(code)),
            ChildEvent::Deadline => Some(Verdict::TimedOut {
                message: self.with_stderr_tail(
                    "Server did not report readiness before the deadline".to_string(),
                ),
            }),
            ChildEvent::Cancelled => Some(Verdict::Failed {
                kind: LaunchErrorKind::Unknown,
                message: "Launch cancelled by shutdown".to_string(),
            }),
        };

        if let Some(v) = &verdict {
            self.state = v.state();
        }
        verdict
    }

    /// Capture output without scanning it.
    ///
    /// Used for output drained after the child already exited, so that
    /// exit classification sees the complete error text.
    pub fn record(&mut self, kind: StreamKind, chunk: &str) {
        match kind {
            StreamKind::Stdout => self.stdout.record(chunk),
            StreamKind::Stderr => self.stderr.record(chunk),
        }
    }

    fn scan_stdout(&mut self, chunk: &str) -> Option<Verdict> {
        let window = self.stdout.window(chunk);
        let hit = self
            .markers
            .iter()
            .filter_map(|m| window.find(m.as_str()))
            .min();
        self.stdout.advance(&window, chunk);

        hit.map(|pos| Verdict::Ready {
            url: extract_url(&window, pos).unwrap_or_else(|| self.fallback_url()),
        })
    }

    fn scan_stderr(&mut self, chunk: &str) -> Option<Verdict> {
        let window = self.stderr.window(chunk);
        let lower = window.to_lowercase();
        let hit = FATAL_PATTERNS
            .iter()
            .find(|(pattern, _)| lower.contains(pattern));
        self.stderr.advance(&window, chunk);

        hit.map(|(pattern, kind)| Verdict::Failed {
            kind: *kind,
            message: offending_line(&window, &lower, pattern),
        })
    }

    fn exit_verdict(&self, code: Option<i32>) -> Verdict {
        let captured = format!("{}\n{}", self.stderr.capture, self.stdout.capture);
        let kind = LaunchErrorKind::classify(&captured);
        let status = code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}"));
        Verdict::Failed {
            kind,
            message: self.with_stderr_tail(format!(
                "Process exited with {status} before becoming ready"
            )),
        }
    }

    fn with_stderr_tail(&self, message: String) -> String {
        let cleaned = ANSI_ESCAPE.replace_all(&self.stderr.capture, "");
        let tail = cleaned
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty());
        match tail {
            Some(line) => format!("{message}: {line}"),
            None => message,
        }
    }

    fn fallback_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}

/// First URL on the marker line, else the first one after the marker.
fn extract_url(window: &str, marker_pos: usize) -> Option<String> {
    let line_start = window[..marker_pos].rfind('\n').map_or(0, |i| i + 1);
    let line_end = window[marker_pos..]
        .find('\n')
        .map_or(window.len(), |i| marker_pos + i);

    HTTP_URL
        .find(&window[line_start..line_end])
        .or_else(|| HTTP_URL.find(&window[marker_pos..]))
        .map(|m| {
            m.as_str()
                .trim_end_matches(['.', ',', ';', ')', ']'])
                .trim_end_matches('/')
                .to_string()
        })
}

fn offending_line(window: &str, lower: &str, pattern: &str) -> String {
    let Some(pos) = lower.find(pattern) else {
        return window.trim().to_string();
    };
    // Lowercasing can shift byte offsets for non-ASCII text.
    if lower.len() != window.len() {
        return window.trim().to_string();
    }
    let start = window[..pos].rfind('\n').map_or(0, |i| i + 1);
    let end = window[pos..].find('\n').map_or(window.len(), |i| pos + i);
    window[start..end].trim().to_string()
}

/// Last `max` bytes of `s`, moved forward to a char boundary.
fn keep_tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stdout(chunk: &str) -> ChildEvent {
        ChildEvent::Output {
            kind: StreamKind::Stdout,
            chunk: chunk.to_string(),
        }
    }

    fn stderr(chunk: &str) -> ChildEvent {
        ChildEvent::Output {
            kind: StreamKind::Stderr,
            chunk: chunk.to_string(),
        }
    }

    #[test]
    fn test_ready_marker_with_url() {
        let mut machine = ReadinessMachine::with_default_markers(3000);

        assert_eq!(machine.on_event(stdout("Building...\n")), None);
        let verdict = machine.on_event(stdout("Local: http://localhost:3000\n"));

        assert_eq!(
            verdict,
            Some(Verdict::Ready {
                url: "http://localhost:3000".into()
            })
        );
        assert_eq!(machine.state(), SessionState::Ready);
    }

    #[test]
    fn test_marker_split_across_chunks() {
        let mut machine = ReadinessMachine::new(4000, &["Server ready"]);

        assert_eq!(machine.on_event(stdout("Server rea")), None);
        let verdict = machine.on_event(stdout("dy at http://127.0.0.1:4000/\n"));

        assert_eq!(
            verdict,
            Some(Verdict::Ready {
                url: "http://127.0.0.1:4000".into()
            })
        );
    }

    #[test]
    fn test_ansi_codes_are_stripped_from_url() {
        let mut machine = ReadinessMachine::with_default_markers(3000);
        let verdict =
            machine.on_event(stdout("\x1b[32mServer ready\x1b[0m - Local: \x1b[1mhttp://localhost:3000\x1b[22m\n"));

        assert_eq!(
            verdict,
            Some(Verdict::Ready {
                url: "http://localhost:3000".into()
            })
        );
    }

    #[test]
    fn test_marker_without_url_falls_back_to_port() {
        let mut machine = ReadinessMachine::new(3123, &["Server ready"]);
        let verdict = machine.on_event(stdout("Server ready\n"));

        assert_eq!(
            verdict,
            Some(Verdict::Ready {
                url: "http://localhost:3123".into()
            })
        );
    }

    #[test]
    fn test_fatal_stderr_preempts_readiness() {
        let mut machine = ReadinessMachine::with_default_markers(3000);
        let verdict = machine.on_event(stderr(
            "node:events:496\nError: listen EADDRINUSE: address already in use :::3000\n",
        ));

        let Some(Verdict::Failed { kind, message }) = verdict else {
            panic!("expected failure, got {verdict:?}");
        };
        assert_eq!(kind, LaunchErrorKind::PortInUse);
        assert!(message.starts_with("Error: listen EADDRINUSE"));

        // First signal wins
        assert_eq!(machine.on_event(stdout("Local: http://localhost:3000\n")), None);
        assert_eq!(machine.state(), SessionState::Failed);
    }

    #[test]
    fn test_permission_denied_is_spawn_error() {
        let mut machine = ReadinessMachine::with_default_markers(3000);
        let verdict = machine.on_event(stderr("sh: ./studio: Permission denied\n"));

        assert!(matches!(
            verdict,
            Some(Verdict::Failed {
                kind: LaunchErrorKind::ProcessSpawnError,
                ..
            })
        ));
    }

    #[test]
    fn test_non_fatal_stderr_is_ignored() {
        let mut machine = ReadinessMachine::with_default_markers(3000);
        assert_eq!(machine.on_event(stderr("npm WARN deprecated inflight\n")), None);
        assert!(!machine.is_decided());
    }

    #[test]
    fn test_exit_before_ready_is_classified() {
        let mut machine = ReadinessMachine::with_default_markers(3000);
        machine.on_event(stderr("Error: Cannot find module '@remotion/cli'\n"));
        let verdict = machine.on_event(ChildEvent::Exited { code: Some(1) });

        let Some(Verdict::Failed { kind, message }) = verdict else {
            panic!("expected failure, got {verdict:?}");
        };
        assert_eq!(kind, LaunchErrorKind::DependencyError);
        assert!(message.contains("code 1"));
        assert!(message.contains("Cannot find module"));
    }

    #[test]
    fn test_recorded_output_feeds_exit_classification() {
        let mut machine = ReadinessMachine::with_default_markers(3000);
        machine.record(StreamKind::Stderr, "sh: 1: remotion: command not found\n");
        let verdict = machine.on_event(ChildEvent::Exited { code: Some(127) });

        assert!(matches!(
            verdict,
            Some(Verdict::Failed {
                kind: LaunchErrorKind::ExecutableNotFound,
                ..
            })
        ));
    }

    #[test]
    fn test_silent_exit_is_unknown() {
        let mut machine = ReadinessMachine::with_default_markers(3000);
        let verdict = machine.on_event(ChildEvent::Exited { code: None });

        assert_eq!(
            verdict,
            Some(Verdict::Failed {
                kind: LaunchErrorKind::Unknown,
                message: "Process exited with a signal before becoming ready".into(),
            })
        );
    }

    #[test]
    fn test_deadline_times_out() {
        let mut machine = ReadinessMachine::with_default_markers(3000);
        machine.on_event(stdout("Bundling 42%\n"));
        let verdict = machine.on_event(ChildEvent::Deadline);

        assert!(matches!(verdict, Some(Verdict::TimedOut { .. })));
        assert_eq!(machine.state(), SessionState::Timeout);
        assert_eq!(machine.on_event(ChildEvent::Exited { code: Some(0) }), None);
    }

    #[test]
    fn test_keep_tail_respects_char_boundaries() {
        let s = "ééé";
        assert_eq!(keep_tail(s, 3), "é");
        assert_eq!(keep_tail(s, 10), s);
    }
}
