//! Process entry point: bootstrap, signal handling and the run loop.

mod shutdown;

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use tach_lsp_config::Config;
use thiserror::Error;
use tracing::info;

use crate::bootstrap::{
    BootstrapError, ConfigLoader, SessionServices, SystemConfigLoader, bootstrap_with,
};
use crate::health::{HealthReporter, StructuredHealthReporter};

pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Errors that end the supervisor process.
#[derive(Debug, Error)]
pub enum RunError {
    /// Bootstrap failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// Signal handlers could not be installed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}

/// Runs the supervisor with the production collaborators, writing a fatal
/// error to `stderr`.
pub fn run(stderr: &mut dyn Write) -> ExitCode {
    let outcome = run_with(
        Arc::new(SystemConfigLoader),
        Arc::new(StructuredHealthReporter::new()),
        &SystemShutdownSignal,
        SessionServices::system,
    );
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(stderr, "tach-lspd: {error}").is_err() {
                return ExitCode::from(2);
            }
            ExitCode::FAILURE
        }
    }
}

/// Runs the supervisor until `signal` fires.
///
/// Signal handlers are installed before the first session starts so an early
/// termination request still stops the server cleanly.
///
/// # Errors
///
/// Returns [`RunError`] if signal handlers cannot be installed or bootstrap
/// fails.
pub fn run_with(
    loader: Arc<dyn ConfigLoader>,
    reporter: Arc<dyn HealthReporter>,
    signal: &dyn ShutdownSignal,
    services: impl FnOnce(&Config) -> SessionServices,
) -> Result<(), RunError> {
    let shutdown = signal.install()?;
    let mut daemon = bootstrap_with(loader, reporter, services)?;
    info!(target: PROCESS_TARGET, "supervisor running");
    daemon.run(&shutdown);
    info!(target: PROCESS_TARGET, "supervisor exiting");
    Ok(())
}
