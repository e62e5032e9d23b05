//! HTTP + Server-Sent-Events streaming transport.
//!
//! Two endpoints implement the asymmetric request/response routing:
//!
//! - `GET {mount}/sse` - long-lived. Opens a session, immediately emits an
//!   `endpoint` handshake event carrying the message-post URL with the new
//!   session id, then flushes outbound envelopes as `message` events until
//!   the connection closes. Connection close evicts the session.
//! - `POST {mount}/messages` - short-lived. Identifies the session from an
//!   `x-session-id` header or `sessionId` query parameter, decodes the
//!   body, and dispatches it. The POST response is only an acknowledgement
//!   of receipt; the RPC result is pushed down the owning session's SSE
//!   stream. Answering the POST directly would break every client, so no
//!   code path here ever does.
//!
//! Dispatch runs in a spawned task per message, so responses reach the
//! stream in handler-completion order and slow handlers never block other
//! posts or other sessions.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use devmcp_protocol::{
    JsonRpcMessage, JsonRpcResponse, McpError, decode_message, encode_message,
};

use crate::routing::RequestRouter;
use crate::session::{SessionEvent, SessionRegistry};

/// Header carrying the session identifier on message posts.
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// Shared state behind both endpoints.
#[derive(Clone)]
pub struct TransportState {
    /// Request dispatcher
    pub router: Arc<RequestRouter>,
    /// Open-session table; owned exclusively by this transport
    pub sessions: Arc<SessionRegistry>,
    /// Message-post path advertised in the handshake event
    pub messages_path: String,
    /// SSE keep-alive interval
    pub keep_alive_interval: Duration,
    /// Server-wide shutdown signal; ends streams whose session opened too
    /// late to receive the shutdown event
    pub shutdown: CancellationToken,
}

/// Build the axum router exposing both endpoints under the mount path.
pub fn router(state: TransportState, sse_path: &str, messages_path: &str) -> Router {
    Router::new()
        .route(sse_path, get(sse_handler))
        .route(messages_path, post(message_handler))
        .with_state(state)
}

/// Evicts the session when the SSE response body is dropped, which is the
/// only signal axum gives us for client disconnect or server shutdown.
struct SessionGuard {
    id: String,
    sessions: Arc<SessionRegistry>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.sessions.close(&self.id) {
            info!(session = %self.id, "SSE connection closed, session evicted");
        }
    }
}

async fn sse_handler(
    State(state): State<TransportState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (session, rx) = state.sessions.open();
    info!(session = %session.id, "new SSE connection established");

    let handshake = format!("{}?sessionId={}", state.messages_path, session.id);
    let guard = SessionGuard {
        id: session.id.clone(),
        sessions: Arc::clone(&state.sessions),
    };

    let stream = session_stream(handshake, rx, guard, state.shutdown.clone());
    Sse::new(stream).keep_alive(KeepAlive::new().interval(state.keep_alive_interval))
}

/// The event stream for one session: handshake first, then outbound
/// envelopes until the channel closes or the server shuts down.
///
/// The stream also watches the server-wide shutdown token: a session that
/// registers concurrently with shutdown may miss the broadcast shutdown
/// event, and without the token its stream would hold graceful shutdown
/// open until the client went away on its own.
fn session_stream(
    handshake: String,
    mut rx: UnboundedReceiver<SessionEvent>,
    guard: SessionGuard,
    shutdown: CancellationToken,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let _guard = guard;

        // The client learns its session id from this first event and tags
        // every subsequent post with it.
        yield Ok::<Event, Infallible>(Event::default().event("endpoint").data(handshake));

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                event = rx.recv() => match event {
                    Some(SessionEvent::Message(message)) => {
                        yield Ok(Event::default().event("message").data(encode_message(&message)));
                    }
                    Some(SessionEvent::Shutdown) | None => break,
                },
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

async fn message_handler(
    State(state): State<TransportState>,
    Query(query): Query<MessageQuery>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let session_id = headers
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or(query.session_id);

    let Some(session_id) = session_id else {
        return error_response(StatusCode::BAD_REQUEST, &McpError::missing_session_id());
    };

    let session = match state.sessions.get(&session_id) {
        Ok(session) => session,
        Err(err) => return error_response(StatusCode::NOT_FOUND, &err),
    };

    let message = match decode_message(&body) {
        Ok(message) => message,
        Err(err) => {
            debug!(session = %session_id, %err, "undecodable message body");
            // Decode failures cannot be correlated to a request id, so they
            // are the one error reported on the POST itself.
            return (
                StatusCode::BAD_REQUEST,
                Json(
                    serde_json::to_value(JsonRpcResponse::parse_error(err.to_json_rpc_error()))
                        .unwrap_or_else(|_| json!({"error": "decode failure"})),
                ),
            )
                .into_response();
        }
    };

    match message {
        JsonRpcMessage::Request(request) => {
            let router = Arc::clone(&state.router);
            tokio::spawn(async move {
                let response = router.handle_request(request).await;
                if let Err(err) = session.send(response.into()) {
                    // The stream died while the handler ran; the response
                    // is unanswerable and the client will retry after its
                    // own timeout.
                    warn!(session = %session.id, %err, "dropping response for closed session");
                }
            });
        }
        JsonRpcMessage::Notification(notification) => {
            let router = Arc::clone(&state.router);
            tokio::spawn(async move {
                router.handle_notification(notification).await;
            });
        }
        JsonRpcMessage::Response(response) => {
            // This bridge never issues server-initiated requests, so a
            // client response has nothing to correlate with.
            debug!(
                session = %session_id,
                id = ?response.id,
                "ignoring unsolicited client response"
            );
        }
    }

    (StatusCode::ACCEPTED, Json(json!({"status": "accepted"}))).into_response()
}

fn error_response(status: StatusCode, err: &McpError) -> Response {
    (status, Json(json!({"error": err.message}))).into_response()
}
