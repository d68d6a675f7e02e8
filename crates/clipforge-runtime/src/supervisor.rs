//! Process supervisor for preview-server sessions.
//!
//! The supervisor is the single owner of every child it spawns. A launch
//! walks `INIT → PORT_CHECK → SPAWNING → AWAITING_READY` and ends in
//! `READY`, `FAILED` or `TIMEOUT`. Ready sessions stay in the live registry
//! until they are stopped, reaped after an unexpected exit, or torn down by
//! [`ProcessSupervisor::shutdown_all`].

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use clipforge_core::{LaunchErrorKind, LaunchOutcome, ProjectConfig, SessionId, SessionState};
use clipforge_resolver::{ExecutableResolver, needs_shell, quote_for_shell};
use serde::Serialize;
use tokio::process::{Child, Command};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::{RwLock, broadcast, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::command::LaunchCommand;
use crate::error::SupervisorError;
use crate::events::{EVENT_CHANNEL_CAPACITY, SessionEvent, SessionSnapshot};
use crate::logs::{LogEntry, SessionLogs, StreamKind};
use crate::ports::is_port_available;
use crate::probe::{PROBE_TIMEOUT, probe_url};
use crate::readiness::{ChildEvent, ReadinessMachine, Verdict};
use crate::shutdown::terminate_child;
use crate::stream::spawn_stream_reader;

/// How long to keep collecting output after the child exited.
const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Timing and lookup knobs for a supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorSettings {
    pub ready_timeout: Duration,
    pub termination_grace: Duration,
    /// Delay before the advisory probe; `None` skips probing.
    pub probe_delay: Option<Duration>,
    /// Searched first when resolving the launch program.
    pub custom_paths: Vec<PathBuf>,
    pub log_capacity: usize,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self::from_config(&ProjectConfig::default())
    }
}

impl SupervisorSettings {
    pub fn from_config(config: &ProjectConfig) -> Self {
        Self {
            ready_timeout: config.ready_timeout,
            termination_grace: config.termination_grace,
            probe_delay: Some(config.probe_delay),
            custom_paths: config.extra_paths.clone(),
            log_capacity: crate::logs::MAX_LOG_LINES,
        }
    }
}

/// Public view of a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub port: u16,
    pub pid: Option<u32>,
    pub state: SessionState,
    pub url: String,
    pub program: PathBuf,
    pub started_at: DateTime<Utc>,
}

struct LiveSession {
    child: Child,
    info: SessionInfo,
}

type SessionMap = Arc<Mutex<HashMap<SessionId, LiveSession>>>;

/// Spawns, watches and tears down preview-server processes.
pub struct ProcessSupervisor {
    resolver: Arc<ExecutableResolver>,
    command: LaunchCommand,
    settings: SupervisorSettings,
    sessions: SessionMap,
    logs: Arc<SessionLogs>,
    events: broadcast::Sender<SessionEvent>,
    spawned: AtomicU64,
    shutdown_tx: watch::Sender<bool>,
    /// Held shared by every in-flight launch, exclusively by shutdown.
    launch_gate: RwLock<()>,
    shutdown_lock: tokio::sync::Mutex<()>,
    hook_installed: AtomicBool,
}

impl ProcessSupervisor {
    pub fn new(
        resolver: Arc<ExecutableResolver>,
        command: LaunchCommand,
        settings: SupervisorSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            resolver,
            command,
            logs: Arc::new(SessionLogs::with_capacity(settings.log_capacity)),
            settings,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            events,
            spawned: AtomicU64::new(0),
            shutdown_tx,
            launch_gate: RwLock::new(()),
            shutdown_lock: tokio::sync::Mutex::new(()),
            hook_installed: AtomicBool::new(false),
        }
    }

    /// Supervisor for the project's preview server.
    pub fn from_config(config: &ProjectConfig, resolver: Arc<ExecutableResolver>) -> Self {
        Self::new(
            resolver,
            LaunchCommand::preview_server(&config.project_dir),
            SupervisorSettings::from_config(config),
        )
    }

    pub const fn command(&self) -> &LaunchCommand {
        &self.command
    }

    pub const fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    /// Start a server on `port` and wait until it is ready, fails or times out.
    ///
    /// Every failure path returns a classified outcome, and no child
    /// outlives a non-ready outcome.
    pub async fn launch(&self, port: u16) -> LaunchOutcome {
        let _gate = self.launch_gate.read().await;
        let id = SessionId::next();
        info!(session = %id, port = %port, "Launching preview server");
        self.emit(id, port, SessionState::Init);

        if self.is_shutting_down() {
            return self.fail(id, port, LaunchErrorKind::Unknown, "Supervisor is shutting down");
        }

        self.emit(id, port, SessionState::PortCheck);
        if !is_port_available(port) {
            return self.fail(
                id,
                port,
                LaunchErrorKind::PortInUse,
                format!("Port {port} is already in use"),
            );
        }

        self.emit(id, port, SessionState::Spawning);
        let resolved = match self
            .resolver
            .resolve(&self.command.program, &self.settings.custom_paths)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return self.fail(id, port, LaunchErrorKind::ExecutableNotFound, e.to_string());
            }
        };

        let mut child = match self.spawn(&resolved.path, port) {
            Ok(c) => c,
            Err(e) => {
                let kind = spawn_error_kind(&e);
                let message = format!("Failed to start {}: {e}", resolved.path.display());
                return self.fail(id, port, kind, message);
            }
        };
        self.spawned.fetch_add(1, Ordering::Relaxed);
        let pid = child.id();
        debug!(session = %id, pid = ?pid, path = %resolved.path.display(), "Spawned child");

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            spawn_stream_reader(stdout, id, StreamKind::Stdout, Arc::clone(&self.logs), tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_stream_reader(stderr, id, StreamKind::Stderr, Arc::clone(&self.logs), tx);
        }

        self.emit(id, port, SessionState::AwaitingReady);
        let verdict = self.await_ready(&mut child, &mut rx, port).await;

        match verdict {
            Verdict::Ready { url } => {
                info!(session = %id, url = %url, "Preview server ready");
                let info = SessionInfo {
                    session_id: id,
                    port,
                    pid,
                    state: SessionState::Ready,
                    url: url.clone(),
                    program: resolved.path,
                    started_at: Utc::now(),
                };
                lock(&self.sessions).insert(id, LiveSession { child, info });
                self.emit(id, port, SessionState::Ready);
                self.spawn_probe(id, port, url.clone());
                LaunchOutcome::ready(url, id)
            }
            Verdict::Failed { kind, message } => {
                self.release(&mut child, id).await;
                warn!(session = %id, kind = %kind, "Launch failed: {message}");
                self.emit(id, port, SessionState::Failed);
                LaunchOutcome {
                    session_id: Some(id),
                    ..LaunchOutcome::failed(kind, message)
                }
            }
            Verdict::TimedOut { message } => {
                self.release(&mut child, id).await;
                warn!(session = %id, timeout = ?self.settings.ready_timeout, "Launch timed out");
                self.emit(id, port, SessionState::Timeout);
                LaunchOutcome {
                    session_id: Some(id),
                    ..LaunchOutcome::timeout(message)
                }
            }
        }
    }

    /// Terminate one live session.
    pub async fn stop(&self, id: SessionId) -> Result<(), SupervisorError> {
        let session = lock(&self.sessions)
            .remove(&id)
            .ok_or(SupervisorError::SessionNotFound(id))?;
        let port = session.info.port;
        let mut child = session.child;

        self.emit(id, port, SessionState::Terminating);
        terminate_child(&mut child, self.settings.termination_grace)
            .await
            .map_err(|source| SupervisorError::Terminate { session: id, source })?;
        self.emit(id, port, SessionState::Terminated);
        info!(session = %id, "Session stopped");
        Ok(())
    }

    /// Terminate every live session and wait for each child to exit.
    ///
    /// In-flight launches are cancelled and awaited too. Later launches are
    /// refused. Returns the number of sessions that were terminated.
    pub async fn shutdown_all(&self) -> usize {
        let _serial = self.shutdown_lock.lock().await;
        self.shutdown_tx.send_replace(true);
        let _gate = self.launch_gate.write().await;

        let drained: Vec<(SessionId, LiveSession)> = lock(&self.sessions).drain().collect();
        let grace = self.settings.termination_grace;
        let mut tasks = JoinSet::new();
        for (id, mut session) in drained {
            let port = session.info.port;
            self.emit(id, port, SessionState::Terminating);
            tasks.spawn(async move {
                let result = terminate_child(&mut session.child, grace).await;
                (id, port, result)
            });
        }

        let mut terminated = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, port, Ok(status))) => {
                    debug!(session = %id, status = %status, "Session terminated");
                    self.emit(id, port, SessionState::Terminated);
                    terminated += 1;
                }
                Ok((id, _, Err(e))) => warn!(session = %id, error = %e, "Failed to terminate session"),
                Err(e) => warn!(error = %e, "Termination task failed"),
            }
        }

        info!(terminated = terminated, "Supervisor shut down");
        terminated
    }

    /// Register SIGINT/SIGTERM handling that runs [`Self::shutdown_all`].
    ///
    /// Only the first call installs the hook; later calls return `false`.
    pub fn install_shutdown_hook(self: &Arc<Self>) -> bool {
        if self.hook_installed.swap(true, Ordering::SeqCst) {
            return false;
        }

        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            wait_for_termination_signal().await;
            info!("Termination signal received, stopping all sessions");
            supervisor.shutdown_all().await;
        });
        true
    }

    /// Resolves once a shutdown has been requested.
    pub async fn wait_for_shutdown(&self) {
        shutdown_requested(&mut self.shutdown_tx.subscribe()).await;
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Remove sessions whose child exited on its own and report them.
    pub fn reap_exited(&self) -> Vec<SessionId> {
        let exited: Vec<(SessionInfo, String)> = {
            let mut sessions = lock(&self.sessions);
            let gone: Vec<(SessionId, String)> = sessions
                .iter_mut()
                .filter_map(|(id, s)| match s.child.try_wait() {
                    Ok(Some(status)) => Some((*id, status.to_string())),
                    Ok(None) => None,
                    Err(e) => Some((*id, e.to_string())),
                })
                .collect();
            gone.into_iter()
                .filter_map(|(id, exit)| sessions.remove(&id).map(|s| (s.info, exit)))
                .collect()
        };

        exited
            .into_iter()
            .map(|(info, exit)| {
                warn!(session = %info.session_id, port = %info.port, exit = %exit, "Session exited unexpectedly");
                self.logs.retire(info.session_id);
                let _ = self.events.send(SessionEvent::Crashed {
                    session: SessionSnapshot::new(info.session_id, info.port, SessionState::Terminated),
                    exit,
                });
                info.session_id
            })
            .collect()
    }

    /// Periodically reap exited sessions until shutdown.
    pub fn spawn_reaper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if supervisor.is_shutting_down() {
                    break;
                }
                supervisor.reap_exited();
            }
        })
    }

    /// Live sessions, oldest first.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = lock(&self.sessions)
            .values()
            .map(|s| s.info.clone())
            .collect();
        infos.sort_by_key(|i| i.session_id);
        infos
    }

    /// Captured output of a session, including finished ones.
    pub fn session_logs(&self, id: SessionId) -> Vec<LogEntry> {
        self.logs.get(id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Number of child processes spawned so far.
    pub fn spawn_count(&self) -> u64 {
        self.spawned.load(Ordering::Relaxed)
    }

    fn spawn(&self, program: &Path, port: u16) -> io::Result<Child> {
        let platform = self.resolver.platform();
        let mut cmd = if needs_shell(program, platform) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(quote_for_shell(program, platform));
            cmd
        } else {
            Command::new(program)
        };

        cmd.args(self.command.args_for(port))
            .current_dir(&self.command.working_dir)
            .envs(self.command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        cmd.spawn()
    }

    /// Race output, exit, deadline and shutdown through the readiness machine.
    async fn await_ready(
        &self,
        child: &mut Child,
        rx: &mut UnboundedReceiver<ChildEvent>,
        port: u16,
    ) -> Verdict {
        let mut machine = ReadinessMachine::new(port, &self.command.ready_markers);
        let deadline = tokio::time::sleep(self.settings.ready_timeout);
        tokio::pin!(deadline);
        let mut shutdown = self.shutdown_tx.subscribe();
        let mut streams_open = true;

        loop {
            let event = tokio::select! {
                received = rx.recv(), if streams_open => match received {
                    Some(event) => event,
                    None => {
                        streams_open = false;
                        continue;
                    }
                },
                status = child.wait() => {
                    drain_after_exit(rx, &mut machine).await;
                    ChildEvent::Exited { code: status.ok().and_then(|s| s.code()) }
                },
                () = &mut deadline => ChildEvent::Deadline,
                () = shutdown_requested(&mut shutdown) => ChildEvent::Cancelled,
            };

            if let Some(verdict) = machine.on_event(event) {
                return verdict;
            }
        }
    }

    fn spawn_probe(&self, id: SessionId, port: u16, url: String) {
        let sessions = Arc::clone(&self.sessions);
        let events = self.events.clone();
        let delay = self.settings.probe_delay;

        tokio::spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
                let outcome = probe_url(&url, PROBE_TIMEOUT).await;
                if outcome.is_reachable() {
                    debug!(session = %id, url = %url, "Advisory probe succeeded");
                } else {
                    // The ready marker stays authoritative.
                    warn!(session = %id, url = %url, outcome = ?outcome, "Advisory probe failed");
                }
            }

            let mut sessions = lock(&sessions);
            if let Some(session) = sessions.get_mut(&id) {
                session.info.state = SessionState::Running;
                let _ = events.send(SessionEvent::Transition(SessionSnapshot::new(
                    id,
                    port,
                    SessionState::Running,
                )));
            }
        });
    }

    async fn release(&self, child: &mut Child, id: SessionId) {
        if let Err(e) = terminate_child(child, self.settings.termination_grace).await {
            warn!(session = %id, error = %e, "Failed to terminate child");
        }
    }

    fn fail(
        &self,
        id: SessionId,
        port: u16,
        kind: LaunchErrorKind,
        message: impl Into<String>,
    ) -> LaunchOutcome {
        let message = message.into();
        warn!(session = %id, port = %port, kind = %kind, "Launch failed: {message}");
        self.emit(id, port, SessionState::Failed);
        LaunchOutcome::failed(kind, message)
    }

    fn emit(&self, id: SessionId, port: u16, state: SessionState) {
        debug!(session = %id, state = ?state, "Session transition");
        if state.is_terminal() {
            self.logs.retire(id);
        }
        let _ = self
            .events
            .send(SessionEvent::Transition(SessionSnapshot::new(id, port, state)));
    }
}

async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|requested| *requested).await;
}

/// Collect output still in flight after the child exited.
async fn drain_after_exit(rx: &mut UnboundedReceiver<ChildEvent>, machine: &mut ReadinessMachine) {
    let _ = timeout(EXIT_DRAIN_GRACE, async {
        while let Some(event) = rx.recv().await {
            if let ChildEvent::Output { kind, chunk } = event {
                machine.record(kind, &chunk);
            }
        }
    })
    .await;
}

fn spawn_error_kind(e: &io::Error) -> LaunchErrorKind {
    match e.kind() {
        io::ErrorKind::NotFound => LaunchErrorKind::ExecutableNotFound,
        _ => LaunchErrorKind::ProcessSpawnError,
    }
}

fn lock(sessions: &Mutex<HashMap<SessionId, LiveSession>>) -> MutexGuard<'_, HashMap<SessionId, LiveSession>> {
    sessions.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(unix)]
async fn wait_for_termination_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {},
                _ = term.recv() => {},
            }
        }
        Err(e) => {
            warn!(error = %e, "Cannot listen for SIGTERM, relying on Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_termination_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
