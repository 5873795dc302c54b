//! Shared fixtures and test doubles for supervisor tests.

mod clients;
mod recording_sink;
mod watches;
mod world;

use std::sync::{Arc, Mutex, MutexGuard};

use camino::{Utf8Path, Utf8PathBuf};
use tach_lsp_config::{ImportStrategy, Settings};

use crate::probe::{VersionProbe, VersionProbeError};
use crate::settings::{SettingsError, SettingsProvider, SettingsScope};
use crate::version::VersionInfo;

pub use clients::{ClientRecord, FakeClientFactory};
pub use recording_sink::{RecordingTraceSink, Severity};
pub use watches::FakeWatchProvider;
pub use world::SupervisorWorld;

/// Workspace folder used by supervisor tests.
pub const WORKSPACE: &str = "/workspace";

/// Settings for [`WORKSPACE`] with the bundled import strategy.
#[must_use]
pub fn workspace_settings() -> Settings {
    Settings {
        workspace: Utf8PathBuf::from(WORKSPACE),
        interpreter: vec![String::from("/usr/bin/python3")],
        cwd: Utf8PathBuf::from(WORKSPACE),
        import_strategy: ImportStrategy::UseBundled,
        configuration: None,
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}

#[derive(Debug)]
struct SettingsState {
    settings: Settings,
    failing: Option<SettingsScope>,
    reads: usize,
}

/// Settings provider returning fixed settings, optionally failing one scope.
///
/// Clones share state so tests can change the settings after handing a
/// clone to the supervisor.
#[derive(Debug, Clone)]
pub struct StaticSettingsProvider {
    state: Arc<Mutex<SettingsState>>,
}

impl StaticSettingsProvider {
    /// Serves `settings` for every scope.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            state: Arc::new(Mutex::new(SettingsState {
                settings,
                failing: None,
                reads: 0,
            })),
        }
    }

    /// Makes reads of `scope` fail until cleared with `None`.
    pub fn fail(&self, scope: Option<SettingsScope>) {
        lock(&self.state).failing = scope;
    }

    /// Replaces the served settings.
    pub fn update(&self, update: impl FnOnce(&mut Settings)) {
        update(&mut lock(&self.state).settings);
    }

    /// Number of reads across every scope.
    #[must_use]
    pub fn reads(&self) -> usize {
        lock(&self.state).reads
    }

    fn read(&self, scope: SettingsScope) -> Result<Settings, SettingsError> {
        let mut state = lock(&self.state);
        state.reads += 1;
        if state.failing == Some(scope) {
            return Err(SettingsError::new(scope, "scripted settings failure"));
        }
        Ok(state.settings.clone())
    }
}

impl SettingsProvider for StaticSettingsProvider {
    fn workspace_settings(&self, _project_root: &Utf8Path) -> Result<Settings, SettingsError> {
        self.read(SettingsScope::Workspace)
    }

    fn extension_settings(&self) -> Result<Vec<Settings>, SettingsError> {
        self.read(SettingsScope::Extension).map(|settings| vec![settings])
    }

    fn global_settings(&self) -> Result<Settings, SettingsError> {
        self.read(SettingsScope::Global)
    }
}

/// Probe reporting a fixed outcome.
#[derive(Debug, Clone)]
pub struct FixedVersionProbe {
    outcome: Result<VersionInfo, VersionProbeError>,
}

impl FixedVersionProbe {
    /// Always reports `version`.
    #[must_use]
    pub const fn reporting(version: VersionInfo) -> Self {
        Self {
            outcome: Ok(version),
        }
    }
}

impl VersionProbe for FixedVersionProbe {
    fn probe(&self, _command: &str) -> Result<VersionInfo, VersionProbeError> {
        self.outcome.clone()
    }
}
