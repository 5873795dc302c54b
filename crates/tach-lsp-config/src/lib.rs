//! Shared configuration for the Tach language-server supervisor.
//!
//! [`Config`] is layered with `ortho_config`: built-in defaults, then an
//! optional TOML file (`--config-path` or `TACH_LSP_CONFIG_PATH`), then
//! `TACH_LSP_*` environment variables, then command-line flags. The supervisor
//! re-reads it on every restart and projects it into per-workspace
//! [`Settings`] records.

mod defaults;
mod logging;
mod paths;
mod settings;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_INTERPRETER, DEFAULT_LOG_FILTER, DEFAULT_REQUEST_TIMEOUT_SECS, default_import_strategy,
    default_interpreter, default_log_filter, default_log_filter_string, default_log_format,
    default_log_level, default_request_timeout_secs,
};
pub use logging::{LogFormat, LogFormatParseError, LogLevel};
pub use paths::{
    BUNDLED_DIR_NAME, BUNDLED_LIBS_DIR_NAME, InstallRootError, bundled_libs_dir,
    default_install_root,
};
pub use settings::{ImportStrategy, Settings};

/// Configuration consumed by the supervisor binary and its settings provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "TACH_LSP")]
pub struct Config {
    /// `tracing` filter expression.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for supervisor logs.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Interpreter executable followed by fixed leading arguments.
    #[serde(default = "default_interpreter")]
    #[ortho_config(default = default_interpreter())]
    pub interpreter: Vec<String>,
    /// Working directory for the server; defaults to the workspace folder.
    #[serde(default)]
    pub cwd: Option<Utf8PathBuf>,
    /// How the server imports `tach`.
    #[serde(default = "default_import_strategy")]
    #[ortho_config(default = default_import_strategy())]
    pub import_strategy: ImportStrategy,
    /// Optional custom `tach` configuration file.
    #[serde(default)]
    pub configuration: Option<Utf8PathBuf>,
    /// Workspace folders served by the supervisor.
    #[serde(default)]
    pub workspace_folders: Vec<Utf8PathBuf>,
    /// Installation root holding `bundled/libs`.
    #[serde(default)]
    pub install_root: Option<Utf8PathBuf>,
    /// Whether the workspace is virtual (no `file` scheme documents).
    #[serde(default)]
    pub virtual_workspace: bool,
    /// Log level of the output channel bound to the server.
    #[serde(default = "default_log_level")]
    #[ortho_config(default = default_log_level())]
    pub channel_log_level: LogLevel,
    /// Log level of the surrounding environment.
    #[serde(default = "default_log_level")]
    #[ortho_config(default = default_log_level())]
    pub global_log_level: LogLevel,
    /// Seconds to wait for lifecycle responses from the server.
    #[serde(default = "default_request_timeout_secs")]
    #[ortho_config(default = default_request_timeout_secs())]
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            interpreter: default_interpreter(),
            cwd: None,
            import_strategy: default_import_strategy(),
            configuration: None,
            workspace_folders: Vec::new(),
            install_root: None,
            virtual_workspace: false,
            channel_log_level: default_log_level(),
            global_log_level: default_log_level(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Interpreter invocation.
    #[must_use]
    pub fn interpreter(&self) -> &[String] {
        &self.interpreter
    }

    /// Configured workspace folders.
    #[must_use]
    pub fn workspace_folders(&self) -> &[Utf8PathBuf] {
        &self.workspace_folders
    }

    /// Whether the workspace is virtual.
    #[must_use]
    pub fn is_virtual_workspace(&self) -> bool {
        self.virtual_workspace
    }

    /// Output channel log level.
    #[must_use]
    pub fn channel_log_level(&self) -> LogLevel {
        self.channel_log_level
    }

    /// Environment log level.
    #[must_use]
    pub fn global_log_level(&self) -> LogLevel {
        self.global_log_level
    }

    /// Timeout applied to lifecycle requests.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolves the install root, deriving it from the executable when unset.
    ///
    /// # Errors
    ///
    /// Returns [`InstallRootError`] when no root is configured and none can
    /// be derived from the running executable.
    pub fn install_root(&self) -> Result<Utf8PathBuf, InstallRootError> {
        match &self.install_root {
            Some(root) => Ok(root.clone()),
            None => default_install_root(),
        }
    }

    /// Projects the configuration onto a workspace folder.
    #[must_use]
    pub fn settings_for(&self, workspace: &Utf8Path) -> Settings {
        Settings {
            workspace: workspace.to_path_buf(),
            interpreter: self.interpreter.clone(),
            cwd: self
                .cwd
                .clone()
                .unwrap_or_else(|| workspace.to_path_buf()),
            import_strategy: self.import_strategy,
            configuration: self.configuration.clone(),
        }
    }

    /// Settings applied outside any workspace folder.
    #[must_use]
    pub fn global_settings(&self, current_dir: &Utf8Path) -> Settings {
        self.settings_for(current_dir)
    }
}
