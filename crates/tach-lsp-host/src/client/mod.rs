//! Protocol client seam and its stdio process implementation.
//!
//! The supervisor drives sessions through the [`LanguageClient`] trait and
//! creates them through a [`ClientFactory`], so tests can substitute
//! in-memory clients for real `tach server` processes.

mod error;
mod jsonrpc;
mod lifecycle;
mod process;
mod reader;
mod state;
mod transport;

use std::time::Duration;

use lsp_types::TraceValue;

use crate::launcher::LaunchPlan;

pub use error::{ClientError, TransportError};
pub use jsonrpc::{
    JsonRpcError, JsonRpcIncoming, JsonRpcMessage, JsonRpcNotification, JsonRpcReply,
    JsonRpcRequest, JsonRpcResponse, next_request_id,
};
pub use process::ProcessLanguageClient;
pub use state::{SessionState, StateChange, StateObserver, StateTracker, Subscription};
pub use transport::{MessageReader, MessageWriter};

/// Log target for client operations.
pub(crate) const CLIENT_TARGET: &str = "tach_lsp_host::client";

/// One protocol connection to a language server.
pub trait LanguageClient: Send {
    /// Spawns the server and completes the `initialize` handshake.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the process cannot be started or the
    /// handshake fails; the client is left stopped.
    fn start(&mut self) -> Result<(), ClientError>;

    /// Requests a graceful shutdown and terminates the process.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the stop could not be carried out.
    fn stop(&mut self) -> Result<(), ClientError>;

    /// Sends `$/setTrace` with the given level.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the server is not running or the
    /// notification cannot be written.
    fn set_trace(&mut self, level: TraceValue) -> Result<(), ClientError>;

    /// Current lifecycle state.
    fn state(&self) -> SessionState;

    /// Registers an observer for lifecycle transitions.
    fn on_state_change(&self, observer: StateObserver) -> Subscription;
}

/// Creates language clients from launch plans.
pub trait ClientFactory: Send {
    /// Builds a stopped client for `plan`.
    fn create(&self, plan: LaunchPlan) -> Box<dyn LanguageClient>;
}

/// Factory for [`ProcessLanguageClient`]s.
#[derive(Debug, Clone, Copy)]
pub struct ProcessClientFactory {
    request_timeout: Duration,
}

impl ProcessClientFactory {
    /// Creates a factory whose clients wait `request_timeout` for each
    /// lifecycle response.
    #[must_use]
    pub const fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

impl ClientFactory for ProcessClientFactory {
    fn create(&self, plan: LaunchPlan) -> Box<dyn LanguageClient> {
        Box::new(ProcessLanguageClient::new(plan, self.request_timeout))
    }
}
