//! MCP Transport layer
//!
//! Plumbing for the HTTP+SSE bridge. Each SSE connection opens a session,
//! which yields two halves:
//! - [`SessionChannel`]: handed to the session loop (inbound receiver,
//!   outbound sender)
//! - [`ClientEndpoint`]: kept by the HTTP response; a `Stream` of outbound
//!   messages that also owns the registry entry
//!
//! POSTed messages are routed to the session's inbound queue by id through
//! [`SessionRegistry::deliver`].

use dashmap::DashMap;
use futures_util::stream::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::debug;

use nimbus_core::SessionId;

use crate::protocol::McpMessage;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Transport faults seen while routing messages to a session
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Could not find session {0}")]
    SessionNotFound(SessionId),

    #[error("Session {0} is closed")]
    SessionClosed(SessionId),
}

type InboundSenders = DashMap<SessionId, mpsc::Sender<McpMessage>>;

/// Live sessions keyed by id
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<InboundSenders>,
    capacity: usize,
}

/// Session-side half of a duplex pair
pub struct SessionChannel {
    pub id: SessionId,
    pub inbound: mpsc::Receiver<McpMessage>,
    pub outbound: mpsc::Sender<McpMessage>,
}

/// HTTP-side half of a duplex pair.
///
/// Dropping it removes the session from the registry, which also closes the
/// session's inbound queue.
pub struct ClientEndpoint {
    id: SessionId,
    outbound: mpsc::Receiver<McpMessage>,
    _guard: SessionGuard,
}

struct SessionGuard {
    id: SessionId,
    sessions: Arc<InboundSenders>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.sessions.remove(&self.id).is_some() {
            debug!(session_id = %self.id, "Session unregistered");
        }
    }
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Allocate a fresh session and register its inbound queue
    pub fn open(&self) -> (SessionChannel, ClientEndpoint) {
        let id = SessionId::generate();
        let (inbound_tx, inbound_rx) = mpsc::channel(self.capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(self.capacity);

        self.sessions.insert(id, inbound_tx);
        debug!(session_id = %id, "Session registered");

        let channel = SessionChannel {
            id,
            inbound: inbound_rx,
            outbound: outbound_tx,
        };
        let endpoint = ClientEndpoint {
            id,
            outbound: outbound_rx,
            _guard: SessionGuard {
                id,
                sessions: self.sessions.clone(),
            },
        };
        (channel, endpoint)
    }

    /// Queue a message for a session, waiting for capacity
    pub async fn deliver(&self, id: &SessionId, message: McpMessage) -> Result<(), TransportError> {
        // Clone the sender so no map shard lock is held across the await.
        let sender = self
            .sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(TransportError::SessionNotFound(*id))?;

        sender
            .send(message)
            .await
            .map_err(|_| TransportError::SessionClosed(*id))
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl ClientEndpoint {
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Stream for ClientEndpoint {
    type Item = McpMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.outbound.poll_recv(cx)
    }
}
