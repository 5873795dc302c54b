//! Supervisor wired to in-memory collaborators.

use std::collections::BTreeMap;
use std::sync::Arc;

use camino::Utf8PathBuf;
use tach_lsp_config::LogLevel;

use super::{
    FakeClientFactory, FakeWatchProvider, FixedVersionProbe, RecordingTraceSink,
    StaticSettingsProvider, WORKSPACE, workspace_settings,
};
use crate::launcher::{BaseEnvironment, OutputChannel, ServerIdentity};
use crate::session::SessionId;
use crate::settings::WorkspaceContext;
use crate::supervisor::{Supervisor, SupervisorConfig, SupervisorDeps};
use crate::trace::TraceSink;
use crate::version::VersionInfo;

/// State shared by supervisor scenarios.
pub struct SupervisorWorld {
    /// Supervisor under test.
    pub supervisor: Supervisor,
    /// Trace messages emitted by the supervisor.
    pub sink: Arc<RecordingTraceSink>,
    /// Handle onto the created clients.
    pub clients: FakeClientFactory,
    /// Handle onto the registered watches.
    pub watches: FakeWatchProvider,
    /// Handle onto the served settings.
    pub settings: StaticSettingsProvider,
    /// Result of the last restart.
    pub last_restart: Option<Option<SessionId>>,
    /// Restarts performed by the last trigger drain.
    pub last_processed: usize,
}

impl SupervisorWorld {
    /// Builds an idle supervisor with `Info` output and global log levels.
    #[must_use]
    pub fn new() -> Self {
        Self::with_levels(LogLevel::Info, LogLevel::Info)
    }

    /// Builds an idle supervisor with the given output and global log levels.
    #[must_use]
    pub fn with_levels(output: LogLevel, global: LogLevel) -> Self {
        let sink = Arc::new(RecordingTraceSink::default());
        let clients = FakeClientFactory::new();
        let watches = FakeWatchProvider::new();
        let settings = StaticSettingsProvider::new(workspace_settings());
        let config = SupervisorConfig {
            identity: ServerIdentity::new("tach", "Tach"),
            output: OutputChannel::new("Tach", output),
            global_log_level: global,
            workspace: WorkspaceContext::new(vec![Utf8PathBuf::from(WORKSPACE)]),
            bundled_libs_dir: Utf8PathBuf::from("/opt/tach-lsp/bundled/libs"),
            base_env: BaseEnvironment::Fixed(BTreeMap::new()),
        };
        let deps = SupervisorDeps {
            settings: Box::new(settings.clone()),
            clients: Box::new(clients.clone()),
            watches: Box::new(watches.clone()),
            probe: Box::new(FixedVersionProbe::reporting(VersionInfo::new(0, 26, 0))),
            sink: Arc::clone(&sink) as Arc<dyn TraceSink>,
        };
        Self {
            supervisor: Supervisor::new(config, deps),
            sink,
            clients,
            watches,
            settings,
            last_restart: None,
            last_processed: 0,
        }
    }

    /// Restarts the supervisor and records the outcome.
    pub fn restart(&mut self) -> Option<SessionId> {
        let outcome = self.supervisor.restart();
        self.last_restart = Some(outcome);
        outcome
    }

    /// Drains queued watcher triggers and records how many restarted.
    pub fn process_triggers(&mut self) -> usize {
        self.last_processed = self.supervisor.process_pending_triggers();
        self.last_processed
    }
}

impl Default for SupervisorWorld {
    fn default() -> Self {
        Self::new()
    }
}
