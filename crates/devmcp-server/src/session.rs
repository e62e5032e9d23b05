//! Sessions and the concurrent session registry.
//!
//! One [`Session`] exists per connected client, created when that client
//! opens the SSE endpoint and destroyed when the underlying connection
//! closes. The session's outbound sender is the only valid route for
//! delivering envelopes to that client; posts to `/messages` carrying its
//! id are routed here.
//!
//! The registry is the single shared mutable structure in the transport.
//! Its only mutation paths are insertion on stream open and removal on
//! stream close.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use devmcp_protocol::{JsonRpcMessage, McpError, McpResult};

/// An event delivered on a session's outbound stream.
#[derive(Debug)]
pub enum SessionEvent {
    /// A serializable envelope destined for the client
    Message(JsonRpcMessage),
    /// The server is shutting down; the stream should end
    Shutdown,
}

/// One long-lived logical connection to a single remote client.
///
/// State machine: OPEN -> CLOSED, terminal. A session is OPEN exactly
/// while it is present in the [`SessionRegistry`]; the transition to
/// CLOSED is connection teardown, never message content.
pub struct Session {
    /// Opaque identifier, generated per connection and never reused
    pub id: String,
    /// Creation timestamp, for diagnostics
    pub created_at: DateTime<Utc>,
    outbound: mpsc::UnboundedSender<SessionEvent>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl Session {
    /// Push an envelope onto this session's outbound stream.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the underlying connection has
    /// already closed.
    pub fn send(&self, message: JsonRpcMessage) -> McpResult<()> {
        self.outbound
            .send(SessionEvent::Message(message))
            .map_err(|_| McpError::transport(format!("session {} outbound stream closed", self.id)))
    }

    fn notify_shutdown(&self) {
        // Best effort: the stream may already be gone.
        let _ = self.outbound.send(SessionEvent::Shutdown);
    }
}

/// Concurrent-safe table of open sessions, keyed by session id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("open_sessions", &self.sessions.len())
            .finish()
    }
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh session and insert it.
    ///
    /// Returns the session plus the receiving half of its outbound
    /// stream, which the one stream-open call that created the session
    /// exclusively owns. Safe to call concurrently for many clients.
    pub fn open(&self) -> (Arc<Session>, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Arc::new(Session {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            outbound: tx,
        });
        self.sessions.insert(session.id.clone(), Arc::clone(&session));
        debug!(session = %session.id, open = self.sessions.len(), "session opened");
        (session, rx)
    }

    /// Remove a session. Returns whether an entry was actually removed.
    ///
    /// Subsequent lookups for this id fail with a session-not-found
    /// error, never against a stale handle.
    pub fn close(&self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            debug!(session = %id, open = self.sessions.len(), "session closed");
        }
        removed
    }

    /// Look up an open session.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::session_not_found`] when the id was never
    /// opened or has since been closed.
    pub fn get(&self, id: &str) -> McpResult<Arc<Session>> {
        self.sessions
            .get(id)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| McpError::session_not_found(id))
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are open.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Notify every open session of shutdown and remove them all.
    pub fn close_all(&self) {
        for entry in self.sessions.iter() {
            entry.value().notify_shutdown();
        }
        self.sessions.clear();
    }
}
