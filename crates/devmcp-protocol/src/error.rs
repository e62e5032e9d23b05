//! Unified error type shared across the bridge.
//!
//! One error struct, classified by [`ErrorKind`], covers the whole
//! taxonomy: codec failures, unknown methods, invalid params, handler
//! execution failures, and transport/session-level conditions. Client
//! visibility is controlled at conversion time - [`McpError::to_json_rpc_error`]
//! never includes the server-side `detail`.

use serde_json::Value;

use crate::jsonrpc::{JsonRpcError, codes};

/// Result alias used throughout the bridge.
pub type McpResult<T> = Result<T, McpError>;

/// Error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed wire message; local to one message
    Decode,
    /// No handler registered under the requested method name
    UnknownMethod,
    /// Params rejected by the handler's declared schema
    InvalidParams,
    /// A registered handler failed while executing
    Handler,
    /// A posted message carried no session identifier
    MissingSessionId,
    /// The session identifier is not (or no longer) open
    SessionNotFound,
    /// The outbound stream died mid-flight
    Transport,
    /// Invalid server setup (malformed schema at registration, bad bind address)
    Configuration,
    /// Unrecoverable internal state
    Internal,
}

impl ErrorKind {
    /// Short stable label used in log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::UnknownMethod => "unknown_method",
            Self::InvalidParams => "invalid_params",
            Self::Handler => "handler",
            Self::MissingSessionId => "missing_session_id",
            Self::SessionNotFound => "session_not_found",
            Self::Transport => "transport",
            Self::Configuration => "configuration",
            Self::Internal => "internal",
        }
    }
}

/// The unified bridge error.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{} error: {message}", .kind.as_str())]
pub struct McpError {
    /// Error classification
    pub kind: ErrorKind,
    /// Client-safe message
    pub message: String,
    /// Server-side diagnostic detail; never sent to the remote client
    pub detail: Option<String>,
    /// Structured data attached to the client-facing error (field paths etc.)
    pub data: Option<Value>,
}

impl McpError {
    /// Create an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            data: None,
        }
    }

    /// Malformed wire message.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    /// Unknown method, naming the method that was requested.
    pub fn unknown_method(method: impl AsRef<str>) -> Self {
        Self::new(
            ErrorKind::UnknownMethod,
            format!("method not found: {}", method.as_ref()),
        )
    }

    /// Params failed schema validation.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParams, message)
    }

    /// Handler execution failure. The client sees a generic message; the
    /// underlying failure goes into `detail` for server-side diagnostics.
    pub fn handler(name: impl AsRef<str>, detail: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Handler,
            format!("handler '{}' failed", name.as_ref()),
        )
        .with_detail(detail)
    }

    /// No session identifier on a posted message.
    pub fn missing_session_id() -> Self {
        Self::new(
            ErrorKind::MissingSessionId,
            "missing session id: supply an x-session-id header or sessionId query parameter",
        )
    }

    /// Session id not present in the registry.
    pub fn session_not_found(id: impl AsRef<str>) -> Self {
        Self::new(
            ErrorKind::SessionNotFound,
            format!("session not found: {}", id.as_ref()),
        )
    }

    /// Outbound stream failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Invalid server setup; fatal at startup.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Unrecoverable internal state.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Attach server-side diagnostic detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attach structured client-facing data.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// JSON-RPC error code for this kind.
    pub fn jsonrpc_code(&self) -> i32 {
        match self.kind {
            ErrorKind::Decode => codes::PARSE_ERROR,
            ErrorKind::UnknownMethod => codes::METHOD_NOT_FOUND,
            ErrorKind::InvalidParams => codes::INVALID_PARAMS,
            ErrorKind::MissingSessionId => codes::INVALID_REQUEST,
            ErrorKind::SessionNotFound => codes::SESSION_NOT_FOUND,
            ErrorKind::Handler | ErrorKind::Transport | ErrorKind::Configuration
            | ErrorKind::Internal => codes::INTERNAL_ERROR,
        }
    }

    /// Whether this error indicates a programming error that should abort
    /// startup rather than be reported to a client.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, ErrorKind::Configuration | ErrorKind::Internal)
    }

    /// The client-facing JSON-RPC error object. `detail` is deliberately
    /// withheld; only `message` and structured `data` cross the wire.
    pub fn to_json_rpc_error(&self) -> JsonRpcError {
        match &self.data {
            Some(data) => {
                JsonRpcError::with_data(self.jsonrpc_code(), self.message.clone(), data.clone())
            }
            None => JsonRpcError::new(self.jsonrpc_code(), self.message.clone()),
        }
    }
}
