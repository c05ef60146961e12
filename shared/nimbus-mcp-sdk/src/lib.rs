//! Nimbus MCP SDK
//!
//! Model Context Protocol plumbing shared by Nimbus services:
//! - JSON-RPC 2.0 message types
//! - Tool trait and an ordered tool registry
//! - Session channel registry used by the HTTP+SSE bridge
//! - Per-session dispatch loop

pub mod protocol;
pub mod registry;
pub mod session;
pub mod tool;
pub mod transport;

pub use protocol::{McpMessage, McpNotification, McpRequest, McpResponse, RequestId, ServerInfo};
pub use registry::ToolRegistry;
pub use session::{McpSession, SessionEnd};
pub use tool::{Tool, ToolDefinition, ToolError, ToolResult};
pub use transport::{ClientEndpoint, SessionChannel, SessionRegistry, TransportError};
