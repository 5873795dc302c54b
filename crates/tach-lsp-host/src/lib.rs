//! Session supervisor for the `tach` language server.
//!
//! The crate decides how to launch `tach server` for a workspace (including
//! the version gate for custom configuration paths), owns the resulting
//! protocol session, and restarts it whenever a workspace configuration file
//! changes. Collaborators sit behind traits ([`SettingsProvider`],
//! [`ClientFactory`], [`WatchProvider`], [`VersionProbe`], [`TraceSink`]) so
//! the supervisor can be exercised without spawning real servers.

mod client;
mod disposable;
mod gate;
mod launcher;
mod probe;
mod session;
mod settings;
mod supervisor;
mod trace;
mod version;
mod watcher;

#[cfg(test)]
mod tests;

pub use client::{
    ClientError, ClientFactory, JsonRpcError, JsonRpcIncoming, JsonRpcMessage,
    JsonRpcNotification, JsonRpcReply, JsonRpcRequest, JsonRpcResponse, LanguageClient,
    MessageReader, MessageWriter, ProcessClientFactory, ProcessLanguageClient, SessionState,
    StateChange, StateObserver, StateTracker, Subscription, TransportError, next_request_id,
};
pub use disposable::{Disposable, DisposableSet};
pub use gate::{MIN_VERSION_WITH_CONFIG, compare_at_least, supports_custom_config};
pub use launcher::{
    Advised, Advisory, BaseEnvironment, CONFIG_FLAG, ClientContext, ClientOptions,
    IMPORT_STRATEGY_ENV, InitializationOptions, LaunchError, LaunchPlan, LaunchSpec,
    OutputChannel, PYTHONPATH_ENV, RevealOutputOn, SERVED_LANGUAGE, SERVER_ARGS, ServerIdentity,
    ServerLauncher, document_selector,
};
pub use probe::{
    ProcessVersionProbe, VERSION_ARGS, VersionProbe, VersionProbeError, parse_version_output,
};
pub use session::{Session, SessionId, SessionStartError};
pub use settings::{SettingsError, SettingsProvider, SettingsScope, WorkspaceContext};
pub use supervisor::{RestartTrigger, Supervisor, SupervisorConfig, SupervisorDeps};
pub use trace::{TRACE_TARGET, TraceSink, TracingTraceSink, negotiate_trace_level};
pub use version::{VersionInfo, VersionParseError, VersionSegment};
pub use watcher::{
    CONFIG_FILE_PATTERNS, ChangeCallback, ConfigWatcher, NotifyWatchProvider, WatchError,
    WatchPatterns, WatchProvider, is_change_trigger, triggering_path,
};
