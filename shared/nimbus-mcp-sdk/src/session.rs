//! Per-session MCP dispatch loop

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::protocol::{
    error_codes, negotiate_protocol_version, InitializeResult, McpMessage, McpRequest, McpResponse,
    RequestId, ServerCapabilities, ServerInfo, ToolsCapability,
};
use crate::registry::ToolRegistry;
use crate::tool::ToolResult;
use crate::transport::SessionChannel;

/// Why a session loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The HTTP side dropped its outbound receiver
    ClientDisconnected,
    /// The session was removed from the registry
    InboundClosed,
}

/// Serves MCP requests for one session.
///
/// Requests are handled one at a time, so replies leave in arrival order.
#[derive(Clone)]
pub struct McpSession {
    tools: ToolRegistry,
    server_info: ServerInfo,
}

impl McpSession {
    pub fn new(tools: ToolRegistry, server_info: ServerInfo) -> Self {
        Self { tools, server_info }
    }

    /// Drive a session until either side goes away.
    ///
    /// A client disconnect is noticed while waiting for input and while a
    /// request is being handled; the in-flight handler is dropped.
    pub async fn run(&self, channel: SessionChannel) -> SessionEnd {
        let SessionChannel {
            id,
            mut inbound,
            outbound,
        } = channel;

        loop {
            let message = tokio::select! {
                biased;
                _ = outbound.closed() => break SessionEnd::ClientDisconnected,
                received = inbound.recv() => match received {
                    Some(message) => message,
                    None => break SessionEnd::InboundClosed,
                },
            };

            let reply = tokio::select! {
                biased;
                _ = outbound.closed() => {
                    info!(session_id = %id, "Client went away mid-request");
                    break SessionEnd::ClientDisconnected;
                }
                reply = self.handle_message(message) => reply,
            };

            if let Some(response) = reply {
                if outbound.send(response.into()).await.is_err() {
                    break SessionEnd::ClientDisconnected;
                }
            }
        }
    }

    /// Handle one inbound message; only requests produce a reply
    pub async fn handle_message(&self, message: McpMessage) -> Option<McpResponse> {
        match message {
            McpMessage::Request(request) => Some(self.handle_request(request).await),
            McpMessage::Notification(notification) => {
                debug!(method = %notification.method, "Notification received");
                None
            }
            McpMessage::Response(response) => {
                debug!(id = ?response.id, "Ignoring client response");
                None
            }
        }
    }

    async fn handle_request(&self, request: McpRequest) -> McpResponse {
        let McpRequest {
            id, method, params, ..
        } = request;
        debug!(method = %method, id = ?id, "Handling request");

        match method.as_str() {
            "initialize" => {
                let requested = params
                    .as_ref()
                    .and_then(|p| p.get("protocolVersion"))
                    .and_then(Value::as_str);
                let result = InitializeResult {
                    protocol_version: negotiate_protocol_version(requested).to_string(),
                    capabilities: ServerCapabilities {
                        tools: Some(ToolsCapability { list_changed: false }),
                    },
                    server_info: self.server_info.clone(),
                };
                success(id, &result)
            }
            "ping" => McpResponse::success(id, json!({})),
            "tools/list" => McpResponse::success(id, json!({ "tools": self.tools.list() })),
            "tools/call" => self.call_tool(id, params).await,
            other => McpResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            ),
        }
    }

    async fn call_tool(&self, id: RequestId, params: Option<Value>) -> McpResponse {
        let params = params.unwrap_or(Value::Null);
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return McpResponse::error(id, error_codes::INVALID_PARAMS, "Missing tool name");
        };
        let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let result = match self.tools.call(name, args).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = name, error = %e, "Tool call failed");
                ToolResult::error(e.to_string())
            }
        };
        success(id, &result)
    }
}

fn success<T: Serialize>(id: RequestId, result: &T) -> McpResponse {
    match serde_json::to_value(result) {
        Ok(value) => McpResponse::success(id, value),
        Err(e) => McpResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::McpNotification;
    use crate::tool::{Tool, ToolError};
    use crate::transport::SessionRegistry;
    use async_trait::async_trait;
    use futures_util::StreamExt;
    use std::time::Duration;

    struct Upper;

    #[async_trait]
    impl Tool for Upper {
        fn name(&self) -> &str {
            "upper"
        }
        fn description(&self) -> &str {
            "Uppercase a word"
        }
        fn input_schema(&self) -> Value {
            json!({"type": "object", "properties": {"word": {"type": "string"}}, "required": ["word"]})
        }
        async fn execute(&self, args: Value) -> Result<ToolResult, ToolError> {
            let word = args
                .get("word")
                .and_then(Value::as_str)
                .ok_or_else(|| ToolError::InvalidInput("word is required".into()))?;
            Ok(ToolResult::text(word.to_uppercase()))
        }
    }

    fn session() -> McpSession {
        let mut tools = ToolRegistry::new();
        tools.register(Upper);
        McpSession::new(tools, ServerInfo::new("test", "0.0.1"))
    }

    async fn reply(session: &McpSession, request: McpRequest) -> McpResponse {
        session.handle_message(request.into()).await.unwrap()
    }

    #[tokio::test]
    async fn test_initialize_negotiates_version() {
        let s = session();
        let resp = reply(
            &s,
            McpRequest::new(1i64, "initialize").with_params(json!({"protocolVersion": "2024-11-05"})),
        )
        .await;
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
        assert_eq!(result["serverInfo"]["name"], "test");

        let resp = reply(
            &s,
            McpRequest::new(2i64, "initialize").with_params(json!({"protocolVersion": "2000-01-01"})),
        )
        .await;
        assert_eq!(resp.result.unwrap()["protocolVersion"], "2025-06-18");
    }

    #[tokio::test]
    async fn test_ping_and_tools_list() {
        let s = session();
        assert_eq!(reply(&s, McpRequest::new(1i64, "ping")).await.result, Some(json!({})));

        let resp = reply(&s, McpRequest::new(2i64, "tools/list")).await;
        let tools = resp.result.unwrap();
        assert_eq!(tools["tools"][0]["name"], "upper");
        assert_eq!(tools["tools"][0]["inputSchema"]["required"][0], "word");
    }

    #[tokio::test]
    async fn test_tools_call() {
        let s = session();
        let resp = reply(
            &s,
            McpRequest::new(1i64, "tools/call")
                .with_params(json!({"name": "upper", "arguments": {"word": "rain"}})),
        )
        .await;
        let result = resp.result.unwrap();
        assert_eq!(result["content"][0]["text"], "RAIN");
        assert_eq!(result["isError"], false);
    }

    #[tokio::test]
    async fn test_tool_failures_are_results_not_errors() {
        let s = session();
        let resp = reply(
            &s,
            McpRequest::new(1i64, "tools/call").with_params(json!({"name": "nope"})),
        )
        .await;
        assert!(resp.error.is_none());
        assert_eq!(resp.result.unwrap()["isError"], true);

        let resp = reply(
            &s,
            McpRequest::new(2i64, "tools/call").with_params(json!({"name": "upper", "arguments": {}})),
        )
        .await;
        assert_eq!(resp.result.unwrap()["isError"], true);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let s = session();
        let resp = reply(&s, McpRequest::new(1i64, "resources/list")).await;
        assert_eq!(resp.error.unwrap().code, error_codes::METHOD_NOT_FOUND);

        let resp = reply(&s, McpRequest::new(2i64, "tools/call").with_params(json!({}))).await;
        assert_eq!(resp.error.unwrap().code, error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_notifications_get_no_reply() {
        let s = session();
        let reply = s
            .handle_message(McpNotification::new("notifications/initialized").into())
            .await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn test_run_replies_in_order_and_ends_on_disconnect() {
        let registry = SessionRegistry::default();
        let (channel, mut endpoint) = registry.open();
        let id = channel.id;
        let handle = tokio::spawn(async move { session().run(channel).await });

        registry
            .deliver(&id, McpNotification::new("notifications/initialized").into())
            .await
            .unwrap();
        for n in 1..=3i64 {
            registry.deliver(&id, McpRequest::new(n, "ping").into()).await.unwrap();
        }

        for n in 1..=3i64 {
            match endpoint.next().await {
                Some(McpMessage::Response(resp)) => assert_eq!(resp.id, RequestId::from(n)),
                other => panic!("unexpected message: {:?}", other),
            }
        }

        drop(endpoint);
        let end = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            end,
            SessionEnd::ClientDisconnected | SessionEnd::InboundClosed
        ));
        assert!(registry.is_empty());
    }
}
