//! Per-workspace settings forwarded to the language server.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the language server locates the `tach` package.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ImportStrategy {
    /// Prefer the copy of `tach` shipped alongside the supervisor.
    #[default]
    UseBundled,
    /// Import `tach` from the interpreter's environment.
    FromEnvironment,
}

/// Settings resolved for a single workspace folder.
///
/// The record serialises in camelCase because it is passed verbatim to the
/// server as part of the initialisation payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Workspace folder these settings apply to.
    pub workspace: Utf8PathBuf,
    /// Interpreter executable followed by any fixed leading arguments.
    pub interpreter: Vec<String>,
    /// Working directory for the server process.
    pub cwd: Utf8PathBuf,
    /// Import strategy exported to the server environment.
    pub import_strategy: ImportStrategy,
    /// Optional path to a custom `tach` configuration file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Utf8PathBuf>,
}
