//! JSON-RPC 2.0 envelopes and the text codec used on the wire.
//!
//! Three envelope kinds exist: requests (method + id), notifications
//! (method, no id), and responses (result or error, correlated by id).
//! [`decode_message`] classifies inbound text by shape and never yields a
//! partially populated envelope; [`encode_message`] is infallible for the
//! envelope types defined here.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::error::{McpError, McpResult};

/// JSON-RPC version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC version marker, serde-enforced to always be `"2.0"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(JSONRPC_VERSION)
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let version = String::deserialize(deserializer)?;
        if version == JSONRPC_VERSION {
            Ok(JsonRpcVersion)
        } else {
            Err(serde::de::Error::custom(format!(
                "Invalid JSON-RPC version: expected '{JSONRPC_VERSION}', got '{version}'"
            )))
        }
    }
}

/// Request identifier - JSON-RPC permits strings and integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// String identifier
    String(String),
    /// Integer identifier
    Number(i64),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

/// JSON-RPC request message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version
    pub jsonrpc: JsonRpcVersion,
    /// Request method name
    pub method: String,
    /// Request parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Request identifier
    pub id: RequestId,
}

impl JsonRpcRequest {
    /// Create a new request envelope.
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            method: method.into(),
            params,
            id: id.into(),
        }
    }
}

/// JSON-RPC notification message (no response expected)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// JSON-RPC version
    pub jsonrpc: JsonRpcVersion,
    /// Notification method name
    pub method: String,
    /// Notification parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Create a new notification envelope.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            method: method.into(),
            params,
        }
    }
}

/// Response payload - ensures mutual exclusion of result and error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcResponsePayload {
    /// Successful response with result
    Success {
        /// Response result
        result: Value,
    },
    /// Error response
    Error {
        /// Response error
        error: JsonRpcError,
    },
}

/// Response ID - parse errors carry a null id since none could be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseId(pub Option<RequestId>);

impl ResponseId {
    /// Response ID correlated to a request.
    pub fn from_request(id: RequestId) -> Self {
        Self(Some(id))
    }

    /// Null response ID (parse errors only).
    pub fn null() -> Self {
        Self(None)
    }

    /// The originating request id, if present.
    pub fn as_request_id(&self) -> Option<&RequestId> {
        self.0.as_ref()
    }
}

/// JSON-RPC response message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version
    pub jsonrpc: JsonRpcVersion,
    /// Response payload (either result or error, never both)
    #[serde(flatten)]
    pub payload: JsonRpcResponsePayload,
    /// Request identifier (null only for parse errors)
    pub id: ResponseId,
}

impl JsonRpcResponse {
    /// Build a success response correlated to `id`.
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            payload: JsonRpcResponsePayload::Success { result },
            id: ResponseId::from_request(id),
        }
    }

    /// Build an error response correlated to `id`.
    pub fn error(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            payload: JsonRpcResponsePayload::Error { error },
            id: ResponseId::from_request(id),
        }
    }

    /// Build an error response with a null id (undecodable request).
    pub fn parse_error(error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            payload: JsonRpcResponsePayload::Error { error },
            id: ResponseId::null(),
        }
    }

    /// Whether this response carries a result rather than an error.
    pub fn is_success(&self) -> bool {
        matches!(self.payload, JsonRpcResponsePayload::Success { .. })
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonRpcError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Create a new JSON-RPC error
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a new JSON-RPC error with additional data
    pub fn with_data(code: i32, message: impl Into<String>, data: Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }
}

/// Standard JSON-RPC 2.0 error codes plus the transport's extensions.
pub mod codes {
    /// Invalid JSON was received
    pub const PARSE_ERROR: i32 = -32700;
    /// The JSON sent is not a valid request object
    pub const INVALID_REQUEST: i32 = -32600;
    /// The method does not exist or is not available
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid method parameters
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal JSON-RPC error
    pub const INTERNAL_ERROR: i32 = -32603;
    /// The session id on a posted message is not (or no longer) open
    pub const SESSION_NOT_FOUND: i32 = -32001;
}

/// Any JSON-RPC envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// A request expecting a correlated response
    Request(JsonRpcRequest),
    /// A fire-and-forget notification
    Notification(JsonRpcNotification),
    /// A response to an earlier request
    Response(JsonRpcResponse),
}

impl JsonRpcMessage {
    /// The method name, for requests and notifications.
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(r) => Some(&r.method),
            Self::Notification(n) => Some(&n.method),
            Self::Response(_) => None,
        }
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(r: JsonRpcResponse) -> Self {
        Self::Response(r)
    }
}

/// Serialize an envelope to its wire form.
///
/// The envelope types in this module serialize infallibly; a failure here
/// is a programming error and aborts rather than being surfaced as a
/// recoverable condition.
pub fn encode_message(message: &JsonRpcMessage) -> String {
    match serde_json::to_string(message) {
        Ok(wire) => wire,
        Err(e) => panic!("JSON-RPC envelope failed to serialize: {e}"),
    }
}

/// Decode one wire chunk into an envelope.
///
/// Classification is by shape: `method` + `id` is a request, `method`
/// without `id` is a notification, `result`/`error` with `id` is a
/// response. Anything else is a decode error naming what was expected.
///
/// # Errors
///
/// Returns [`ErrorKind::Decode`](crate::ErrorKind::Decode) for malformed
/// JSON, a missing/invalid `jsonrpc` tag, or an unclassifiable shape.
pub fn decode_message(wire: &str) -> McpResult<JsonRpcMessage> {
    let value: Value = serde_json::from_str(wire)
        .map_err(|e| McpError::decode(format!("invalid JSON: {e}")))?;

    let obj = value
        .as_object()
        .ok_or_else(|| McpError::decode("expected a JSON object envelope"))?;

    match obj.get("jsonrpc").and_then(Value::as_str) {
        Some(JSONRPC_VERSION) => {}
        Some(other) => {
            return Err(McpError::decode(format!(
                "expected jsonrpc \"{JSONRPC_VERSION}\", got \"{other}\""
            )));
        }
        None => return Err(McpError::decode("missing jsonrpc version field")),
    }

    if obj.contains_key("method") {
        if obj.contains_key("id") {
            let request: JsonRpcRequest = serde_json::from_value(value)
                .map_err(|e| McpError::decode(format!("malformed request envelope: {e}")))?;
            Ok(JsonRpcMessage::Request(request))
        } else {
            let notification: JsonRpcNotification = serde_json::from_value(value)
                .map_err(|e| McpError::decode(format!("malformed notification envelope: {e}")))?;
            Ok(JsonRpcMessage::Notification(notification))
        }
    } else if obj.contains_key("result") || obj.contains_key("error") {
        let response: JsonRpcResponse = serde_json::from_value(value)
            .map_err(|e| McpError::decode(format!("malformed response envelope: {e}")))?;
        Ok(JsonRpcMessage::Response(response))
    } else {
        Err(McpError::decode(
            "envelope has neither a method nor a result/error",
        ))
    }
}
