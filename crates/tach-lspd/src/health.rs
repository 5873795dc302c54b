//! Structured health reporting for supervisor lifecycle events.

use std::sync::Arc;

use tach_lsp_config::Config;
use tach_lsp_host::SessionId;

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer for lifecycle events of the supervisor binary.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked after the first restart; `None` when no session came up.
    fn supervisor_started(&self, session: Option<SessionId>);

    /// Invoked once every session has been stopped.
    fn supervisor_stopped(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn supervisor_started(&self, session: Option<SessionId>) {
        (**self).supervisor_started(session);
    }

    fn supervisor_stopped(&self) {
        (**self).supervisor_stopped();
    }
}

/// Reporter that records lifecycle events with `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting supervisor bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            workspace_folders = config.workspace_folders().len(),
            import_strategy = %config.import_strategy,
            "supervisor bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "supervisor bootstrap failed"
        );
    }

    fn supervisor_started(&self, session: Option<SessionId>) {
        match session {
            Some(id) => tracing::info!(
                target: HEALTH_TARGET,
                event = "supervisor_started",
                session = %id,
                "language server session running"
            ),
            None => tracing::warn!(
                target: HEALTH_TARGET,
                event = "supervisor_started",
                "language server failed to start"
            ),
        }
    }

    fn supervisor_stopped(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "supervisor_stopped",
            "language server supervisor stopped"
        );
    }
}
