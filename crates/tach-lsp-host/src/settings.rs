//! Settings and workspace collaborators consumed by the supervisor.

use std::error::Error as StdError;
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use tach_lsp_config::Settings;
use thiserror::Error;

/// Which settings read failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsScope {
    /// Settings for the project root.
    Workspace,
    /// Settings for every workspace folder.
    Extension,
    /// Settings outside any folder.
    Global,
}

impl fmt::Display for SettingsScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Workspace => "workspace",
            Self::Extension => "extension",
            Self::Global => "global",
        })
    }
}

/// Failure reported by a [`SettingsProvider`].
#[derive(Debug, Error)]
#[error("failed to read {scope} settings: {message}")]
pub struct SettingsError {
    scope: SettingsScope,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl SettingsError {
    /// Builds an error without an underlying cause.
    #[must_use]
    pub fn new(scope: SettingsScope, message: impl Into<String>) -> Self {
        Self {
            scope,
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error wrapping `source`.
    #[must_use]
    pub fn with_source(
        scope: SettingsScope,
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            scope,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Scope of the failed read.
    #[must_use]
    pub const fn scope(&self) -> SettingsScope {
        self.scope
    }
}

/// Supplies the current settings. Each call reads afresh.
///
/// The supervisor makes three independent reads per start; they are not a
/// consistent snapshot.
pub trait SettingsProvider: Send {
    /// Settings for the project root.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when the settings cannot be read.
    fn workspace_settings(&self, project_root: &Utf8Path) -> Result<Settings, SettingsError>;

    /// Settings for every workspace folder.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when the settings cannot be read.
    fn extension_settings(&self) -> Result<Vec<Settings>, SettingsError>;

    /// Settings outside any folder.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when the settings cannot be read.
    fn global_settings(&self) -> Result<Settings, SettingsError>;
}

/// Workspace folders and the virtual-workspace predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceContext {
    folders: Vec<Utf8PathBuf>,
    virtual_workspace: bool,
}

impl WorkspaceContext {
    /// Creates a context over `folders`.
    #[must_use]
    pub fn new(folders: Vec<Utf8PathBuf>) -> Self {
        Self {
            folders,
            virtual_workspace: false,
        }
    }

    /// Marks the workspace as virtual.
    #[must_use]
    pub const fn with_virtual(mut self, virtual_workspace: bool) -> Self {
        self.virtual_workspace = virtual_workspace;
        self
    }

    /// Workspace folders.
    #[must_use]
    pub fn folders(&self) -> &[Utf8PathBuf] {
        &self.folders
    }

    /// Whether the workspace has no on-disk documents.
    #[must_use]
    pub const fn is_virtual(&self) -> bool {
        self.virtual_workspace
    }

    /// Folder with the shortest path, or `current_dir` without folders.
    ///
    /// Ties keep the first folder listed.
    #[must_use]
    pub fn project_root(&self, current_dir: &Utf8Path) -> Utf8PathBuf {
        self.folders
            .iter()
            .min_by_key(|folder| folder.as_str().len())
            .map_or_else(|| current_dir.to_path_buf(), Clone::clone)
    }
}
