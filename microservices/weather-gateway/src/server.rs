//! MCP over HTTP+SSE
//!
//! `GET /sse` opens a session and streams its outbound messages;
//! `POST /messages?session_id=..` feeds the session's inbound queue.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::stream::Stream;
use nimbus_core::SessionId;
use nimbus_mcp_sdk::{ClientEndpoint, McpMessage, SessionChannel};
use serde::Deserialize;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, error, info, warn};

use crate::api::AppState;

/// Outbound side of one SSE response: the `endpoint` announcement, then
/// every message the session writes.
struct SessionEventStream {
    announce: Option<Event>,
    endpoint: ClientEndpoint,
}

impl SessionEventStream {
    fn new(messages_path: &str, endpoint: ClientEndpoint) -> Self {
        let announce = Event::default()
            .event("endpoint")
            .data(format!("{}?session_id={}", messages_path, endpoint.id()));
        Self {
            announce: Some(announce),
            endpoint,
        }
    }
}

impl Stream for SessionEventStream {
    type Item = Result<Event, axum::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(event) = self.announce.take() {
            return Poll::Ready(Some(Ok(event)));
        }
        match Pin::new(&mut self.endpoint).poll_next(cx) {
            Poll::Ready(Some(message)) => {
                Poll::Ready(Some(Event::default().event("message").json_data(&message)))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

pub fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|item| item.split(';').next().unwrap_or("").trim())
        .any(|media| media.eq_ignore_ascii_case("text/event-stream") || media == "*/*")
}

/// SSE handler for MCP over HTTP
pub async fn sse_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !accepts_event_stream(&headers) {
        warn!("SSE request without an event-stream Accept header");
        return (
            StatusCode::NOT_ACCEPTABLE,
            "Not Acceptable: client must accept text/event-stream",
        )
            .into_response();
    }

    let (channel, endpoint) = state.sessions.open();
    info!(session_id = %channel.id, "SSE connection established");
    spawn_session(&state, channel);

    let stream = SessionEventStream::new(&state.config.sse.messages_path, endpoint);
    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(state.config.sse.keep_alive))
        .into_response()
}

/// Run the session loop, plus a supervisor that reports how it ended
fn spawn_session(state: &AppState, channel: SessionChannel) {
    let id = channel.id;
    let session = state.mcp.clone();
    let metrics = state.metrics.clone();
    metrics.sessions_total.inc();
    metrics.sessions_active.inc();

    let handle = tokio::spawn(async move { session.run(channel).await });

    tokio::spawn(async move {
        match handle.await {
            Ok(end) => info!(session_id = %id, outcome = ?end, "MCP session finished"),
            Err(e) if e.is_panic() => error!(session_id = %id, error = %e, "MCP session panicked"),
            Err(e) => warn!(session_id = %id, error = %e, "MCP session cancelled"),
        }
        metrics.sessions_active.dec();
    });
}

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    session_id: Option<String>,
}

/// Inbound half of the bridge
pub async fn message_handler(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Response {
    let Some(raw_id) = query.session_id else {
        return (StatusCode::BAD_REQUEST, "session_id is required").into_response();
    };
    let Ok(session_id) = raw_id.parse::<SessionId>() else {
        debug!(session_id = %raw_id, "Malformed session id");
        return (StatusCode::BAD_REQUEST, "Invalid session ID").into_response();
    };
    if !state.sessions.contains(&session_id) {
        warn!(session_id = %session_id, "Message for unknown session");
        return (StatusCode::NOT_FOUND, "Could not find session").into_response();
    }

    let message: McpMessage = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Unparsable message");
            return (StatusCode::BAD_REQUEST, "Could not parse message").into_response();
        }
    };

    match state.sessions.deliver(&session_id, message).await {
        Ok(()) => (StatusCode::ACCEPTED, "Accepted").into_response(),
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Message could not be delivered");
            (StatusCode::NOT_FOUND, "Could not find session").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn accept(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_accept_header_policy() {
        assert!(accepts_event_stream(&accept("text/event-stream")));
        assert!(accepts_event_stream(&accept("application/json, text/event-stream;q=0.9")));
        assert!(accepts_event_stream(&accept("*/*")));
        assert!(!accepts_event_stream(&accept("application/json")));
        assert!(!accepts_event_stream(&HeaderMap::new()));
    }
}
