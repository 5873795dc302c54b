//! Termination signal handling.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Source of the shutdown request polled by the run loop.
pub trait ShutdownSignal: Send + Sync {
    /// Installs the listener and returns the flag it sets on shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] when the listener cannot be installed.
    fn install(&self) -> Result<Arc<AtomicBool>, ShutdownError>;
}

/// Errors reported by shutdown listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The listener thread could not be spawned.
    #[error("failed to spawn signal listener: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Listener that sets the flag on `SIGTERM`, `SIGINT`, `SIGQUIT` or `SIGHUP`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl ShutdownSignal for SystemShutdownSignal {
    fn install(&self) -> Result<Arc<AtomicBool>, ShutdownError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        let flag = Arc::new(AtomicBool::new(false));
        let listener_flag = Arc::clone(&flag);
        thread::Builder::new()
            .name(String::from("tach-lspd-signals"))
            .spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    info!(target: PROCESS_TARGET, signal, "shutdown signal received");
                }
                listener_flag.store(true, Ordering::SeqCst);
            })
            .map_err(|source| ShutdownError::Spawn { source })?;
        Ok(flag)
    }
}
