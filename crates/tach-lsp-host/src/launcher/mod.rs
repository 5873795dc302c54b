//! Builds the `tach server` invocation and client options for a session.
//!
//! The launcher is pure apart from two inputs: the base environment (the
//! supervisor's own, or a fixed map in tests) and the [`VersionProbe`], which
//! is consulted only when a custom configuration path is requested.

mod advisory;
mod plan;

use std::collections::BTreeMap;
use std::env;

use camino::{Utf8Path, Utf8PathBuf};
use tach_lsp_config::{ImportStrategy, Settings};
use thiserror::Error;
use tracing::debug;

use crate::gate::{MIN_VERSION_WITH_CONFIG, supports_custom_config};
use crate::probe::VersionProbe;
use crate::trace::TraceSink;

pub use advisory::{Advised, Advisory};
pub use plan::{
    ClientContext, ClientOptions, InitializationOptions, LaunchPlan, LaunchSpec, OutputChannel,
    RevealOutputOn, SERVED_LANGUAGE, ServerIdentity, document_selector,
};

const LAUNCHER_TARGET: &str = "tach_lsp_host::launcher";

/// Arguments that start the `tach` language server.
pub const SERVER_ARGS: [&str; 3] = ["-m", "tach", "server"];

/// Flag preceding a custom configuration path.
pub const CONFIG_FLAG: &str = "-c";

/// Environment variable carrying the import strategy.
pub const IMPORT_STRATEGY_ENV: &str = "LS_IMPORT_STRATEGY";

/// Environment variable pointing at the bundled libraries.
pub const PYTHONPATH_ENV: &str = "PYTHONPATH";

/// Errors that prevent a launch spec from being built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    /// The settings name no interpreter.
    #[error("no interpreter configured for workspace {workspace}")]
    EmptyInterpreter {
        /// Workspace whose settings were empty.
        workspace: Utf8PathBuf,
    },
}

/// Environment the child process starts from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BaseEnvironment {
    /// The supervisor's environment, read at build time.
    #[default]
    Inherit,
    /// A fixed map.
    Fixed(BTreeMap<String, String>),
}

impl BaseEnvironment {
    fn snapshot(&self) -> BTreeMap<String, String> {
        match self {
            Self::Inherit => env::vars_os()
                .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
                .collect(),
            Self::Fixed(vars) => vars.clone(),
        }
    }
}

/// Produces [`LaunchSpec`]s and [`LaunchPlan`]s from workspace settings.
#[derive(Debug)]
pub struct ServerLauncher<P> {
    probe: P,
    bundled_libs_dir: Utf8PathBuf,
    base_env: BaseEnvironment,
}

impl<P> ServerLauncher<P>
where
    P: VersionProbe,
{
    /// Creates a launcher that exports `bundled_libs_dir` for bundled imports.
    #[must_use]
    pub fn new(probe: P, bundled_libs_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            probe,
            bundled_libs_dir: bundled_libs_dir.into(),
            base_env: BaseEnvironment::Inherit,
        }
    }

    /// Replaces the inherited environment.
    #[must_use]
    pub fn with_base_env(mut self, base_env: BaseEnvironment) -> Self {
        self.base_env = base_env;
        self
    }

    /// Resolves the subprocess invocation for `settings`.
    ///
    /// When `settings.configuration` is set the tool version is probed; `-c`
    /// is appended only if the version passes the gate. Probe failures and
    /// gate rejections are reported through `sink` and as advisories.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::EmptyInterpreter`] when no interpreter is set.
    pub fn build_launch_spec(
        &self,
        settings: &Settings,
        sink: &dyn TraceSink,
    ) -> Result<Advised<LaunchSpec>, LaunchError> {
        let (command, leading) =
            settings
                .interpreter
                .split_first()
                .ok_or_else(|| LaunchError::EmptyInterpreter {
                    workspace: settings.workspace.clone(),
                })?;

        let mut args: Vec<String> = leading.to_vec();
        args.extend(SERVER_ARGS.iter().map(|arg| (*arg).to_owned()));

        let mut env = self.base_env.snapshot();
        env.insert(
            IMPORT_STRATEGY_ENV.to_owned(),
            settings.import_strategy.to_string(),
        );
        if settings.import_strategy == ImportStrategy::UseBundled {
            env.insert(PYTHONPATH_ENV.to_owned(), self.bundled_libs_dir.to_string());
        }

        let mut advisories = Vec::new();
        if let Some(configuration) = &settings.configuration
            && self.accepts_custom_config(command, configuration, sink, &mut advisories)
        {
            args.push(CONFIG_FLAG.to_owned());
            args.push(configuration.to_string());
        }

        let spec = LaunchSpec {
            command: command.clone(),
            args,
            env,
            cwd: settings.cwd.clone(),
        };
        Ok(Advised::with_advisories(spec, advisories))
    }

    /// Resolves the launch spec and the client options for one session.
    ///
    /// # Errors
    ///
    /// Propagates [`LaunchError`] from [`Self::build_launch_spec`].
    pub fn build_launch_plan(
        &self,
        settings: &Settings,
        context: &ClientContext,
        initialization_options: InitializationOptions,
        sink: &dyn TraceSink,
    ) -> Result<Advised<LaunchPlan>, LaunchError> {
        let advised = self.build_launch_spec(settings, sink)?;
        sink.trace_info(&format!(
            "Server run command: {}",
            advised.value().command_line()
        ));

        let options = ClientOptions {
            document_selector: document_selector(context.virtual_workspace),
            output_channel: context.output.clone(),
            trace_output_channel: context.output.clone(),
            reveal_output_on: RevealOutputOn::Never,
            initialization_options,
        };
        Ok(advised.map(|spec| LaunchPlan {
            identity: context.identity.clone(),
            spec,
            options,
        }))
    }

    fn accepts_custom_config(
        &self,
        command: &str,
        configuration: &Utf8Path,
        sink: &dyn TraceSink,
        advisories: &mut Vec<Advisory>,
    ) -> bool {
        match self.probe.probe(command) {
            Err(error) => {
                sink.trace_error(&format!(
                    "Failed to determine tach version, ignoring configuration {configuration}: {error}"
                ));
                advisories.push(Advisory::VersionProbeFailed {
                    message: error.to_string(),
                });
                false
            }
            Ok(version) if !supports_custom_config(version) => {
                sink.trace_info(&format!(
                    "tach {version} does not support custom configuration paths \
                     (requires {MIN_VERSION_WITH_CONFIG}); ignoring {configuration}"
                ));
                advisories.push(Advisory::CustomConfigUnsupported {
                    version,
                    required: MIN_VERSION_WITH_CONFIG,
                });
                false
            }
            Ok(version) => {
                debug!(
                    target: LAUNCHER_TARGET,
                    %version,
                    %configuration,
                    "passing custom configuration to tach"
                );
                true
            }
        }
    }
}
