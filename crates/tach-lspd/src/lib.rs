//! Headless supervisor for the `tach` language server.
//!
//! The binary loads layered configuration, installs structured telemetry,
//! builds a [`tach_lsp_host::Supervisor`] wired to real processes and file
//! watchers, starts the first session and then services configuration-change
//! restarts until a termination signal arrives. Every session is stopped
//! before the process exits.

mod bootstrap;
mod health;
mod process;
mod settings_provider;
mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, SessionServices, StaticConfigLoader,
    SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    RunError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run, run_with,
};
pub use settings_provider::ConfigSettingsProvider;
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
