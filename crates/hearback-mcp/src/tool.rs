use crate::protocol::{McpToolDef, McpToolResult};
use async_trait::async_trait;
use hearback_core::HearbackResult;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// A tool the MCP server can expose.
///
/// Invalid arguments should come back as an error [`McpToolResult`];
/// `Err` is reserved for failures the caller cannot fix by retrying with
/// different input.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Definition returned by `tools/list`.
    fn descriptor(&self) -> &McpToolDef;

    /// Run the tool with the raw `arguments` object.
    async fn call(&self, arguments: serde_json::Value) -> HearbackResult<McpToolResult>;
}

/// Tools available to `tools/list` and `tools/call`.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Add `tool`, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.descriptor().name.clone();
        info!(tool = %name, "Registered tool");
        self.tools.insert(name, tool);
    }

    /// Tool registered under `name`.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Descriptors sorted by name.
    pub fn list_descriptors(&self) -> Vec<&McpToolDef> {
        let mut descriptors: Vec<&McpToolDef> =
            self.tools.values().map(|t| t.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Number of registered tools.
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
