//! JSON-RPC 2.0 message types for the lifecycle handshake.

use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

static REQUEST_ID: AtomicI64 = AtomicI64::new(1);

/// Generates a process-unique request identifier.
#[must_use]
pub fn next_request_id() -> i64 {
    REQUEST_ID.fetch_add(1, Ordering::SeqCst)
}

/// A request sent to the server.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    /// Protocol version, always "2.0".
    pub jsonrpc: &'static str,
    /// Request identifier.
    pub id: i64,
    /// Method to invoke.
    pub method: String,
    /// Optional parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a request with a fresh identifier.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self::with_id(next_request_id(), method, params)
    }

    /// Creates a request with a specific identifier.
    #[must_use]
    pub fn with_id(id: i64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }
}

/// A notification sent to the server.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    /// Protocol version, always "2.0".
    pub jsonrpc: &'static str,
    /// Method to invoke.
    pub method: String,
    /// Optional parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Creates a notification.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }
}

/// A response received from the server.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version.
    pub jsonrpc: String,
    /// Identifier of the request being answered.
    pub id: Option<i64>,
    /// Result on success.
    #[serde(default)]
    pub result: Option<Value>,
    /// Error on failure.
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional additional data.
    #[serde(default)]
    pub data: Option<Value>,
}

/// Request or notification initiated by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcIncoming {
    /// Identifier, present only for requests. Servers may use strings.
    #[serde(default)]
    pub id: Option<Value>,
    /// Method invoked by the server.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: Option<Value>,
}

/// Reply to a server-initiated request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcReply {
    /// Protocol version, always "2.0".
    pub jsonrpc: &'static str,
    /// Identifier copied from the server's request.
    pub id: Value,
    /// Result payload.
    pub result: Value,
}

impl JsonRpcReply {
    /// Acknowledges a request with a `null` result.
    #[must_use]
    pub const fn null(id: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Value::Null,
        }
    }
}

/// Any message the server may send.
#[derive(Debug, Clone)]
pub enum JsonRpcMessage {
    /// Answer to one of our requests.
    Response(JsonRpcResponse),
    /// Request expecting our answer.
    ServerRequest(JsonRpcIncoming),
    /// Fire-and-forget notification.
    Notification(JsonRpcIncoming),
}

impl JsonRpcMessage {
    /// Classifies a raw payload by the presence of `method` and `id`.
    ///
    /// # Errors
    ///
    /// Returns the decoding error for malformed payloads.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(bytes)?;
        if value.get("method").is_some() {
            let incoming: JsonRpcIncoming = serde_json::from_value(value)?;
            if incoming.id.is_some() {
                Ok(Self::ServerRequest(incoming))
            } else {
                Ok(Self::Notification(incoming))
            }
        } else {
            Ok(Self::Response(serde_json::from_value(value)?))
        }
    }
}
