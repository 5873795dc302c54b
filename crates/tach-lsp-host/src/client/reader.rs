//! Background pump for messages arriving from the server.

use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::CLIENT_TARGET;
use super::jsonrpc::{JsonRpcIncoming, JsonRpcMessage, JsonRpcReply, JsonRpcResponse};
use super::state::{SessionState, StateTracker};
use super::transport::{MessageReader, MessageWriter};

/// Drains server output until the stream closes.
///
/// Responses are forwarded to the request waiting on `responses`, server
/// requests are acknowledged with `null`, and log notifications are written
/// to the output channel. When the stream ends the session moves to
/// [`SessionState::Stopped`].
pub(super) struct ReaderLoop<R, W> {
    pub(super) server: String,
    pub(super) channel: String,
    pub(super) reader: MessageReader<R>,
    pub(super) writer: Arc<Mutex<MessageWriter<W>>>,
    pub(super) responses: Sender<JsonRpcResponse>,
    pub(super) tracker: StateTracker,
    pub(super) stopping: Arc<AtomicBool>,
}

impl<R, W> ReaderLoop<R, W>
where
    R: BufRead,
    W: Write,
{
    pub(super) fn run(mut self) {
        loop {
            match self.reader.receive() {
                Ok(bytes) => self.dispatch(&bytes),
                Err(error) if error.is_closed() => {
                    debug!(target: CLIENT_TARGET, server = %self.server, "server output closed");
                    break;
                }
                Err(error) => {
                    warn!(
                        target: CLIENT_TARGET,
                        server = %self.server,
                        %error,
                        "failed to read from language server"
                    );
                    break;
                }
            }
        }

        if !self.stopping.load(Ordering::SeqCst) {
            warn!(
                target: CLIENT_TARGET,
                server = %self.server,
                "language server exited unexpectedly"
            );
        }
        self.tracker.transition(SessionState::Stopped);
    }

    fn dispatch(&self, bytes: &[u8]) {
        match JsonRpcMessage::from_bytes(bytes) {
            Ok(JsonRpcMessage::Response(response)) => {
                if self.responses.send(response).is_err() {
                    debug!(
                        target: CLIENT_TARGET,
                        server = %self.server,
                        "dropping response with no waiting request"
                    );
                }
            }
            Ok(JsonRpcMessage::ServerRequest(request)) => self.acknowledge(request),
            Ok(JsonRpcMessage::Notification(notification)) => self.log_notification(&notification),
            Err(error) => {
                warn!(
                    target: CLIENT_TARGET,
                    server = %self.server,
                    %error,
                    "discarding undecodable message"
                );
            }
        }
    }

    fn acknowledge(&self, request: JsonRpcIncoming) {
        let Some(id) = request.id else {
            return;
        };
        debug!(
            target: CLIENT_TARGET,
            server = %self.server,
            method = %request.method,
            "acknowledging server request with null"
        );
        let sent = serde_json::to_vec(&JsonRpcReply::null(id))
            .map_err(|error| error.to_string())
            .and_then(|payload| {
                let mut writer = self
                    .writer
                    .lock()
                    .unwrap_or_else(|poison| poison.into_inner());
                writer.send(&payload).map_err(|error| error.to_string())
            });
        if let Err(error) = sent {
            warn!(
                target: CLIENT_TARGET,
                server = %self.server,
                method = %request.method,
                %error,
                "failed to answer server request"
            );
        }
    }

    fn log_notification(&self, notification: &JsonRpcIncoming) {
        let message = notification
            .params
            .as_ref()
            .and_then(|params| params.get("message"))
            .and_then(Value::as_str);
        match (notification.method.as_str(), message) {
            ("window/logMessage" | "window/showMessage", Some(text)) => {
                info!(target: CLIENT_TARGET, channel = %self.channel, "{text}");
            }
            ("$/logTrace", Some(text)) => {
                debug!(target: CLIENT_TARGET, channel = %self.channel, "{text}");
            }
            (method, _) => {
                debug!(
                    target: CLIENT_TARGET,
                    server = %self.server,
                    method,
                    "ignoring server notification"
                );
            }
        }
    }
}
