//! Supervisor bootstrap orchestration.

use std::env;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use tach_lsp_config::{Config, InstallRootError, bundled_libs_dir};
use tach_lsp_host::{
    BaseEnvironment, ClientFactory, NotifyWatchProvider, OutputChannel, ProcessClientFactory,
    ProcessVersionProbe, ServerIdentity, Supervisor, SupervisorConfig, SupervisorDeps, TraceSink,
    TracingTraceSink, VersionProbe, WatchProvider, WorkspaceContext,
};

use crate::health::HealthReporter;
use crate::settings_provider::ConfigSettingsProvider;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Identifier of the supervised server.
pub const SERVER_ID: &str = "tach";

/// Display name of the supervised server and its output channel.
pub const SERVER_NAME: &str = "Tach";

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Abstracts configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the supervisor configuration.
    ///
    /// # Errors
    ///
    /// Returns the layered loader's error when any layer is invalid.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that always returns the same configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps a resolved configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The bundled library directory could not be located.
    #[error("failed to locate bundled libraries: {source}")]
    InstallRoot {
        /// Underlying path error.
        #[source]
        source: InstallRootError,
    },
}

/// Process-facing collaborators handed to the supervisor.
pub struct SessionServices {
    /// Creates protocol clients.
    pub clients: Box<dyn ClientFactory>,
    /// Registers configuration watches.
    pub watches: Box<dyn WatchProvider>,
    /// Reports the installed `tach` version.
    pub probe: Box<dyn VersionProbe + Send>,
    /// Receives supervisor diagnostics.
    pub sink: Arc<dyn TraceSink>,
}

impl SessionServices {
    /// Real processes, `notify` watches and `tracing` output.
    #[must_use]
    pub fn system(config: &Config) -> Self {
        Self {
            clients: Box::new(ProcessClientFactory::new(config.request_timeout())),
            watches: Box::new(NotifyWatchProvider),
            probe: Box::new(ProcessVersionProbe),
            sink: Arc::new(TracingTraceSink::new(SERVER_NAME)),
        }
    }
}

/// A bootstrapped supervisor ready to run.
pub struct Daemon {
    config: Config,
    supervisor: Supervisor,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// The owned supervisor.
    #[must_use]
    pub const fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Starts the first session, handles configuration-change restarts until
    /// `shutdown` is set, then stops everything.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        let session = self.supervisor.restart();
        self.reporter.supervisor_started(session);
        self.supervisor.run_until(shutdown, POLL_INTERVAL);
        self.supervisor.shutdown();
        self.reporter.supervisor_stopped();
    }
}

/// Bootstraps the supervisor with the supplied collaborators.
///
/// No session is started until [`Daemon::run`].
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration, telemetry or the install
/// root cannot be resolved; the reporter sees the same error.
pub fn bootstrap_with(
    loader: Arc<dyn ConfigLoader>,
    reporter: Arc<dyn HealthReporter>,
    services: impl FnOnce(&Config) -> SessionServices,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();
    match assemble(loader, services) {
        Ok((config, supervisor, telemetry)) => {
            reporter.bootstrap_succeeded(&config);
            Ok(Daemon {
                config,
                supervisor,
                telemetry,
                reporter,
            })
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn assemble(
    loader: Arc<dyn ConfigLoader>,
    services: impl FnOnce(&Config) -> SessionServices,
) -> Result<(Config, Supervisor, TelemetryHandle), BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    let install_root = config
        .install_root()
        .map_err(|source| BootstrapError::InstallRoot { source })?;

    let SessionServices {
        clients,
        watches,
        probe,
        sink,
    } = services(&config);
    let supervisor_config = SupervisorConfig {
        identity: ServerIdentity::new(SERVER_ID, SERVER_NAME),
        output: OutputChannel::new(SERVER_NAME, config.channel_log_level()),
        global_log_level: config.global_log_level(),
        workspace: WorkspaceContext::new(config.workspace_folders().to_vec())
            .with_virtual(config.is_virtual_workspace()),
        bundled_libs_dir: bundled_libs_dir(&install_root),
        base_env: BaseEnvironment::Inherit,
    };
    let deps = SupervisorDeps {
        settings: Box::new(ConfigSettingsProvider::new(loader, current_dir())),
        clients,
        watches,
        probe,
        sink,
    };
    Ok((config, Supervisor::new(supervisor_config, deps), telemetry))
}

fn current_dir() -> Utf8PathBuf {
    env::current_dir()
        .ok()
        .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("."))
}
