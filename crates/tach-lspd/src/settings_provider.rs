//! Settings provider backed by the layered supervisor configuration.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use tach_lsp_config::{Config, Settings};
use tach_lsp_host::{SettingsError, SettingsProvider, SettingsScope};

use crate::bootstrap::ConfigLoader;

/// Reads [`Settings`] from a freshly loaded [`Config`] on every call.
///
/// Edits to the configuration file or environment therefore take effect on
/// the next restart without restarting the binary.
pub struct ConfigSettingsProvider {
    loader: Arc<dyn ConfigLoader>,
    current_dir: Utf8PathBuf,
}

impl ConfigSettingsProvider {
    /// Creates a provider; `current_dir` anchors the global settings.
    #[must_use]
    pub fn new(loader: Arc<dyn ConfigLoader>, current_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            loader,
            current_dir: current_dir.into(),
        }
    }

    fn load(&self, scope: SettingsScope) -> Result<Config, SettingsError> {
        self.loader.load().map_err(|source| {
            SettingsError::with_source(scope, "configuration failed to load", source)
        })
    }
}

impl SettingsProvider for ConfigSettingsProvider {
    fn workspace_settings(&self, project_root: &Utf8Path) -> Result<Settings, SettingsError> {
        let config = self.load(SettingsScope::Workspace)?;
        Ok(config.settings_for(project_root))
    }

    fn extension_settings(&self) -> Result<Vec<Settings>, SettingsError> {
        let config = self.load(SettingsScope::Extension)?;
        Ok(config
            .workspace_folders()
            .iter()
            .map(|folder| config.settings_for(folder))
            .collect())
    }

    fn global_settings(&self) -> Result<Settings, SettingsError> {
        let config = self.load(SettingsScope::Global)?;
        Ok(config.global_settings(&self.current_dir))
    }
}
