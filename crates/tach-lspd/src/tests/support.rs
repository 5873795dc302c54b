//! Recording collaborators for bootstrap and run-loop tests.

use std::ffi::OsString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use lsp_types::TraceValue;
use ortho_config::{OrthoConfig, OrthoError};
use tach_lsp_config::Config;
use tach_lsp_host::{
    ChangeCallback, ClientError, ClientFactory, Disposable, LanguageClient, LaunchPlan,
    SessionId, SessionState, StateObserver, StateTracker, Subscription, TraceSink,
    VersionInfo, VersionProbe, VersionProbeError, WatchError, WatchPatterns, WatchProvider,
};

use crate::bootstrap::{BootstrapError, ConfigLoader, SessionServices};
use crate::health::HealthReporter;
use crate::process::{ShutdownError, ShutdownSignal};

/// Lifecycle events observed by [`RecordingHealthReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    SupervisorStarted(Option<SessionId>),
    SupervisorStopped,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Copy of the recorded events.
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn supervisor_started(&self, session: Option<SessionId>) {
        self.record(HealthEvent::SupervisorStarted(session));
    }

    fn supervisor_stopped(&self) {
        self.record(HealthEvent::SupervisorStopped);
    }
}

/// Configuration used by the tests: one workspace and a fixed install root.
pub fn test_config() -> Config {
    Config {
        workspace_folders: vec![Utf8PathBuf::from("/workspace")],
        install_root: Some(Utf8PathBuf::from("/opt/tach-lsp")),
        log_format: tach_lsp_config::LogFormat::Compact,
        ..Config::default()
    }
}

/// Loader that fails by passing an invalid command-line value.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([
            OsString::from("tach-lspd"),
            OsString::from("--request-timeout-secs"),
            OsString::from("soon"),
        ])
    }
}

/// Shutdown listener whose flag is already set, so the run loop exits at once.
pub struct ImmediateShutdown;

impl ShutdownSignal for ImmediateShutdown {
    fn install(&self) -> Result<Arc<AtomicBool>, ShutdownError> {
        Ok(Arc::new(AtomicBool::new(true)))
    }
}

#[derive(Debug, Default)]
struct ClientLog {
    plans: Vec<LaunchPlan>,
    starts: usize,
    stops: usize,
    traces: Vec<TraceValue>,
}

/// Client factory whose clients always start and record their calls.
#[derive(Debug, Clone, Default)]
pub struct RecordingClients {
    log: Arc<Mutex<ClientLog>>,
}

impl RecordingClients {
    /// Plans clients were created from.
    pub fn plans(&self) -> Vec<LaunchPlan> {
        self.lock().plans.clone()
    }

    /// Number of `start` calls.
    pub fn starts(&self) -> usize {
        self.lock().starts
    }

    /// Number of `stop` calls.
    pub fn stops(&self) -> usize {
        self.lock().stops
    }

    /// Trace levels applied.
    pub fn traces(&self) -> Vec<TraceValue> {
        self.lock().traces.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClientLog> {
        self.log.lock().expect("client log mutex poisoned")
    }
}

impl ClientFactory for RecordingClients {
    fn create(&self, plan: LaunchPlan) -> Box<dyn LanguageClient> {
        self.lock().plans.push(plan);
        Box::new(RecordingClient {
            log: Arc::clone(&self.log),
            tracker: StateTracker::new(),
        })
    }
}

struct RecordingClient {
    log: Arc<Mutex<ClientLog>>,
    tracker: StateTracker,
}

impl LanguageClient for RecordingClient {
    fn start(&mut self) -> Result<(), ClientError> {
        self.log.lock().expect("client log mutex poisoned").starts += 1;
        self.tracker.transition(SessionState::Starting);
        self.tracker.transition(SessionState::Running);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ClientError> {
        self.log.lock().expect("client log mutex poisoned").stops += 1;
        self.tracker.transition(SessionState::Stopped);
        Ok(())
    }

    fn set_trace(&mut self, level: TraceValue) -> Result<(), ClientError> {
        self.log
            .lock()
            .expect("client log mutex poisoned")
            .traces
            .push(level);
        Ok(())
    }

    fn state(&self) -> SessionState {
        self.tracker.state()
    }

    fn on_state_change(&self, observer: StateObserver) -> Subscription {
        self.tracker.subscribe(observer)
    }
}

/// Watch provider that records roots and reports disposal.
#[derive(Debug, Clone, Default)]
pub struct RecordingWatches {
    roots: Arc<Mutex<Vec<Utf8PathBuf>>>,
    active: Arc<AtomicBool>,
}

impl RecordingWatches {
    /// Roots watched so far.
    pub fn roots(&self) -> Vec<Utf8PathBuf> {
        self.roots.lock().expect("watch mutex poisoned").clone()
    }

    /// Whether the latest watch is still registered.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl WatchProvider for RecordingWatches {
    fn watch(
        &self,
        root: &Utf8Path,
        _patterns: WatchPatterns,
        _on_change: ChangeCallback,
    ) -> Result<Box<dyn Disposable>, WatchError> {
        self.roots
            .lock()
            .expect("watch mutex poisoned")
            .push(root.to_path_buf());
        self.active.store(true, Ordering::SeqCst);
        Ok(Box::new(RecordingWatch {
            active: Arc::clone(&self.active),
        }))
    }
}

struct RecordingWatch {
    active: Arc<AtomicBool>,
}

impl Disposable for RecordingWatch {
    fn dispose(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

struct NewestProbe;

impl VersionProbe for NewestProbe {
    fn probe(&self, _command: &str) -> Result<VersionInfo, VersionProbeError> {
        Ok(VersionInfo::new(0, 26, 0))
    }
}

struct SilentSink;

impl TraceSink for SilentSink {
    fn trace_error(&self, _message: &str) {}

    fn trace_info(&self, _message: &str) {}

    fn trace_verbose(&self, _message: &str) {}
}

/// Builds session services backed by the recording doubles.
pub fn recording_services(
    clients: &RecordingClients,
    watches: &RecordingWatches,
) -> impl FnOnce(&Config) -> SessionServices {
    let factory = clients.clone();
    let provider = watches.clone();
    move |_config: &Config| SessionServices {
        clients: Box::new(factory),
        watches: Box::new(provider),
        probe: Box::new(NewestProbe),
        sink: Arc::new(SilentSink),
    }
}
