//! A single language-server session and the errors that end its start-up.

use std::fmt;

use lsp_types::TraceValue;
use thiserror::Error;

use crate::client::{ClientError, LanguageClient, SessionState, StateObserver, Subscription};
use crate::launcher::LaunchError;
use crate::settings::SettingsError;

/// Identifier of a session, unique within one supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Reasons a session failed to start.
#[derive(Debug, Error)]
pub enum SessionStartError {
    /// A settings read failed.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// The launch spec could not be built.
    #[error(transparent)]
    Launch(#[from] LaunchError),
    /// The process or handshake failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// One running (or once-running) language-server connection.
///
/// Sessions are never restarted in place; the supervisor replaces them.
pub struct Session {
    id: SessionId,
    client: Box<dyn LanguageClient>,
}

impl Session {
    /// Wraps a freshly created client.
    #[must_use]
    pub fn new(id: SessionId, client: Box<dyn LanguageClient>) -> Self {
        Self { id, client }
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Lifecycle state of the underlying client.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.client.state()
    }

    /// Starts the client.
    ///
    /// # Errors
    ///
    /// Propagates the client's start failure.
    pub fn start(&mut self) -> Result<(), ClientError> {
        self.client.start()
    }

    /// Stops the client.
    ///
    /// # Errors
    ///
    /// Propagates the client's stop failure.
    pub fn stop(&mut self) -> Result<(), ClientError> {
        self.client.stop()
    }

    /// Applies a protocol trace level.
    ///
    /// # Errors
    ///
    /// Propagates the client's notification failure.
    pub fn set_trace(&mut self, level: TraceValue) -> Result<(), ClientError> {
        self.client.set_trace(level)
    }

    /// Observes lifecycle transitions.
    pub fn on_state_change(&self, observer: StateObserver) -> Subscription {
        self.client.on_state_change(observer)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
