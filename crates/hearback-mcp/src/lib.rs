//! MCP stdio server for Hearback.
//!
//! Exposes the `interactive_feedback` tool to MCP clients. The server reads
//! newline-delimited JSON-RPC 2.0 from a reader and writes responses to a
//! writer; in production these are the process's stdin and stdout.

/// The `interactive_feedback` tool.
pub mod feedback_tool;
/// JSON-RPC 2.0 and MCP message types.
pub mod protocol;
/// Stdio request loop.
pub mod server;
/// Tool trait and registry.
pub mod tool;

pub use feedback_tool::{FeedbackTool, FEEDBACK_TOOL_NAME};
pub use server::McpServer;
pub use tool::{Tool, ToolRegistry};

use hearback_session::SessionCoordinator;
use std::sync::Arc;

/// Registry holding the feedback tool backed by `coordinator`.
pub fn feedback_registry(coordinator: Arc<SessionCoordinator>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(FeedbackTool::new(coordinator)));
    registry
}
