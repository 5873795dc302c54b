//! Orchestrates stop, start and restart of the `tach` language server.
//!
//! The supervisor owns at most one [`Session`] and the disposables tied to
//! it (the state subscription and the configuration watcher). Every mutating
//! operation takes `&mut self`, so a restart runs to completion before the
//! next one begins. Watchers never restart inline: they enqueue a
//! [`RestartTrigger`] tagged with their generation, and the owner drains the
//! queue with [`Supervisor::process_pending_triggers`] or
//! [`Supervisor::run_until`]. Triggers from a watcher that has since been
//! replaced are ignored.

mod trigger;

use std::env;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use tach_lsp_config::LogLevel;
use tracing::{debug, info};

use crate::client::{ClientFactory, SessionState, StateChange, StateObserver};
use crate::disposable::DisposableSet;
use crate::launcher::{
    BaseEnvironment, ClientContext, InitializationOptions, OutputChannel, ServerIdentity,
    ServerLauncher,
};
use crate::probe::VersionProbe;
use crate::session::{Session, SessionId, SessionStartError};
use crate::settings::{SettingsProvider, WorkspaceContext};
use crate::trace::{TraceSink, negotiate_trace_level};
use crate::watcher::{WatchPatterns, WatchProvider};

pub use trigger::RestartTrigger;

/// Log target for supervisor operations.
pub(crate) const SUPERVISOR_TARGET: &str = "tach_lsp_host::supervisor";

/// Static inputs of a supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Server being supervised.
    pub identity: ServerIdentity,
    /// Output channel bound to every session.
    pub output: OutputChannel,
    /// Log level of the surrounding environment.
    pub global_log_level: LogLevel,
    /// Workspace folders and virtual-workspace flag.
    pub workspace: WorkspaceContext,
    /// Directory exported as `PYTHONPATH` for bundled imports.
    pub bundled_libs_dir: Utf8PathBuf,
    /// Environment sessions start from.
    pub base_env: BaseEnvironment,
}

/// Collaborators of a supervisor.
pub struct SupervisorDeps {
    /// Source of settings, read on every start.
    pub settings: Box<dyn SettingsProvider>,
    /// Creates protocol clients.
    pub clients: Box<dyn ClientFactory>,
    /// Registers configuration watches.
    pub watches: Box<dyn WatchProvider>,
    /// Reports the tool version for the custom-configuration gate.
    pub probe: Box<dyn VersionProbe + Send>,
    /// Receives supervisor diagnostics.
    pub sink: Arc<dyn TraceSink>,
}

/// Owner of the active language-server session.
pub struct Supervisor {
    identity: ServerIdentity,
    output: OutputChannel,
    global_log_level: LogLevel,
    workspace: WorkspaceContext,
    settings: Box<dyn SettingsProvider>,
    clients: Box<dyn ClientFactory>,
    watches: Box<dyn WatchProvider>,
    sink: Arc<dyn TraceSink>,
    launcher: ServerLauncher<Box<dyn VersionProbe + Send>>,
    session: Option<Session>,
    disposables: DisposableSet,
    next_session: u64,
    watch_generation: u64,
    active_watch: Option<u64>,
    triggers_tx: Sender<RestartTrigger>,
    triggers_rx: Receiver<RestartTrigger>,
}

impl Supervisor {
    /// Creates an idle supervisor; call [`Self::restart`] to launch.
    #[must_use]
    pub fn new(config: SupervisorConfig, deps: SupervisorDeps) -> Self {
        let (triggers_tx, triggers_rx) = mpsc::channel();
        let launcher =
            ServerLauncher::new(deps.probe, config.bundled_libs_dir).with_base_env(config.base_env);
        Self {
            identity: config.identity,
            output: config.output,
            global_log_level: config.global_log_level,
            workspace: config.workspace,
            settings: deps.settings,
            clients: deps.clients,
            watches: deps.watches,
            sink: deps.sink,
            launcher,
            session: None,
            disposables: DisposableSet::new(),
            next_session: 1,
            watch_generation: 0,
            active_watch: None,
            triggers_tx,
            triggers_rx,
        }
    }

    /// Stops any running session and starts a new one.
    ///
    /// Returns the new session's identifier, or `None` when the start failed;
    /// the failure is reported through the trace sink and nothing is retried.
    pub fn restart(&mut self) -> Option<SessionId> {
        self.stop_current();
        match self.start_new() {
            Ok(id) => {
                info!(target: SUPERVISOR_TARGET, session = %id, "language server session started");
                Some(id)
            }
            Err(error) => {
                self.sink
                    .trace_error(&format!("Server: Start failed: {error}"));
                None
            }
        }
    }

    /// Stops the session and releases every disposable.
    pub fn shutdown(&mut self) {
        self.stop_current();
        debug!(target: SUPERVISOR_TARGET, "supervisor shut down");
    }

    /// Handles queued watcher triggers without blocking.
    ///
    /// Returns the number of restarts performed.
    pub fn process_pending_triggers(&mut self) -> usize {
        let mut restarts = 0;
        while let Ok(trigger) = self.triggers_rx.try_recv() {
            if self.handle_trigger(trigger) {
                restarts += 1;
            }
        }
        restarts
    }

    /// Handles watcher triggers until `shutdown` is set, checking the flag at
    /// least every `poll_interval`.
    pub fn run_until(&mut self, shutdown: &AtomicBool, poll_interval: Duration) {
        while !shutdown.load(Ordering::SeqCst) {
            match self.triggers_rx.recv_timeout(poll_interval) {
                Ok(trigger) => {
                    self.handle_trigger(trigger);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    /// The current session, if one was started.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// State of the current session.
    #[must_use]
    pub fn session_state(&self) -> Option<SessionState> {
        self.session.as_ref().map(Session::state)
    }

    /// Number of live disposables (subscriptions and watchers).
    #[must_use]
    pub fn disposable_count(&self) -> usize {
        self.disposables.len()
    }

    /// Generation of the installed configuration watcher.
    #[must_use]
    pub const fn active_watch_generation(&self) -> Option<u64> {
        self.active_watch
    }

    fn stop_current(&mut self) {
        if let Some(mut session) = self.session.take() {
            self.sink.trace_info("Server: Stop requested");
            if let Err(error) = session.stop() {
                self.sink
                    .trace_error(&format!("Server: Stop failed: {error}"));
            }
            debug!(target: SUPERVISOR_TARGET, session = %session.id(), "session stopped");
        }
        self.disposables.dispose_all();
        self.active_watch = None;
    }

    fn start_new(&mut self) -> Result<SessionId, SessionStartError> {
        let project_root = self.workspace.project_root(&current_dir());
        let workspace_settings = self.settings.workspace_settings(&project_root)?;
        let initialization_options = InitializationOptions {
            settings: self.settings.extension_settings()?,
            global_settings: self.settings.global_settings()?,
        };

        let context = ClientContext {
            identity: self.identity.clone(),
            output: self.output.clone(),
            virtual_workspace: self.workspace.is_virtual(),
        };
        let (plan, advisories) = self
            .launcher
            .build_launch_plan(
                &workspace_settings,
                &context,
                initialization_options,
                &*self.sink,
            )?
            .into_parts();
        for advisory in &advisories {
            debug!(target: SUPERVISOR_TARGET, %advisory, "launch advisory");
        }

        let id = SessionId::new(self.next_session);
        self.next_session += 1;
        let mut session = Session::new(id, self.clients.create(plan));
        let subscription = session.on_state_change(trace_states(Arc::clone(&self.sink)));
        self.disposables.push(Box::new(subscription));

        self.sink.trace_info("Server: Start requested.");
        if let Err(error) = session.start() {
            self.disposables.dispose_all();
            return Err(error.into());
        }

        let level = negotiate_trace_level(self.output.log_level, self.global_log_level);
        if let Err(error) = session.set_trace(level) {
            self.sink
                .trace_error(&format!("Server: Failed to set trace level: {error}"));
        }

        self.session = Some(session);
        self.install_watcher(&project_root);
        Ok(id)
    }

    fn install_watcher(&mut self, project_root: &Utf8Path) {
        self.watch_generation += 1;
        let generation = self.watch_generation;
        let patterns = match WatchPatterns::config_files() {
            Ok(patterns) => patterns,
            Err(error) => {
                self.sink
                    .trace_error(&format!("Failed to watch configuration files: {error}"));
                return;
            }
        };
        let callback = trigger::enqueue_on_change(self.triggers_tx.clone(), generation);
        match self.watches.watch(project_root, patterns, callback) {
            Ok(watcher) => {
                self.disposables.push(watcher);
                self.active_watch = Some(generation);
                debug!(
                    target: SUPERVISOR_TARGET,
                    generation,
                    root = %project_root,
                    "configuration watcher installed"
                );
            }
            Err(error) => {
                self.sink
                    .trace_error(&format!("Failed to watch configuration files: {error}"));
            }
        }
    }

    fn handle_trigger(&mut self, trigger: RestartTrigger) -> bool {
        if self.active_watch != Some(trigger.generation) {
            debug!(
                target: SUPERVISOR_TARGET,
                generation = trigger.generation,
                path = %trigger.path,
                "ignoring trigger from a replaced watcher"
            );
            return false;
        }
        self.sink
            .trace_info(&format!("Configuration changed: {}", trigger.path));
        self.restart();
        true
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("identity", &self.identity)
            .field("session", &self.session)
            .field("disposables", &self.disposables.len())
            .field("active_watch", &self.active_watch)
            .finish_non_exhaustive()
    }
}

fn trace_states(sink: Arc<dyn TraceSink>) -> StateObserver {
    Box::new(move |change: StateChange| {
        sink.trace_verbose(&format!("Server State: {}", change.new_state));
    })
}

fn current_dir() -> Utf8PathBuf {
    env::current_dir()
        .ok()
        .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("."))
}
