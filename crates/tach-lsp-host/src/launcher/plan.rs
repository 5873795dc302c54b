//! Launch specification and protocol-client options for one session.

use std::collections::BTreeMap;
use std::fmt;

use camino::Utf8PathBuf;
use lsp_types::DocumentFilter;
use serde::Serialize;
use tach_lsp_config::{LogLevel, Settings};

/// Language whose documents the server handles.
pub const SERVED_LANGUAGE: &str = "python";

const FILE_SCHEME: &str = "file";
const UNTITLED_SCHEME: &str = "untitled";

/// Fully resolved subprocess invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Executable to run.
    pub command: String,
    /// Arguments in order.
    pub args: Vec<String>,
    /// Complete environment of the child; nothing else is inherited.
    pub env: BTreeMap<String, String>,
    /// Working directory of the child.
    pub cwd: Utf8PathBuf,
}

impl LaunchSpec {
    /// Renders the command line for diagnostics.
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut line = self.command.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

impl fmt::Display for LaunchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Identifier and display name of the supervised server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    /// Stable identifier, e.g. `tach`.
    pub id: String,
    /// Human-readable name, e.g. `Tach`.
    pub name: String,
}

impl ServerIdentity {
    /// Builds an identity.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Named output channel that receives server output and protocol traces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChannel {
    /// Channel name.
    pub name: String,
    /// Channel verbosity.
    pub log_level: LogLevel,
}

impl OutputChannel {
    /// Builds a channel binding.
    #[must_use]
    pub fn new(name: impl Into<String>, log_level: LogLevel) -> Self {
        Self {
            name: name.into(),
            log_level,
        }
    }
}

/// When the client surfaces its output channel to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevealOutputOn {
    /// On informational messages and above.
    Info,
    /// On warnings and above.
    Warn,
    /// On errors only.
    Error,
    /// Never.
    #[default]
    Never,
}

/// Payload sent as `initializationOptions` in the `initialize` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializationOptions {
    /// Settings for every workspace folder.
    pub settings: Vec<Settings>,
    /// Settings applied outside any folder.
    pub global_settings: Settings,
}

/// Options for constructing the protocol client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    /// Documents routed to the server.
    pub document_selector: Vec<DocumentFilter>,
    /// Channel receiving server output.
    pub output_channel: OutputChannel,
    /// Channel receiving protocol traces.
    pub trace_output_channel: OutputChannel,
    /// Output reveal policy.
    pub reveal_output_on: RevealOutputOn,
    /// Initialisation payload.
    pub initialization_options: InitializationOptions,
}

/// Everything a client factory needs to start one session.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPlan {
    /// Server being launched.
    pub identity: ServerIdentity,
    /// Subprocess invocation.
    pub spec: LaunchSpec,
    /// Protocol-client options.
    pub options: ClientOptions,
}

/// Client-side inputs the launcher does not derive from settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContext {
    /// Server being launched.
    pub identity: ServerIdentity,
    /// Channel bound to the session.
    pub output: OutputChannel,
    /// Whether the workspace has no `file` scheme documents.
    pub virtual_workspace: bool,
}

/// Document selector for Python sources.
///
/// Virtual workspaces match by language alone; otherwise on-disk and
/// untitled documents are selected by scheme.
#[must_use]
pub fn document_selector(virtual_workspace: bool) -> Vec<DocumentFilter> {
    let filter = |scheme: Option<&str>| DocumentFilter {
        language: Some(String::from(SERVED_LANGUAGE)),
        scheme: scheme.map(str::to_owned),
        pattern: None,
    };
    if virtual_workspace {
        vec![filter(None)]
    } else {
        vec![filter(Some(FILE_SCHEME)), filter(Some(UNTITLED_SCHEME))]
    }
}
