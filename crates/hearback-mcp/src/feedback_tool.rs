use crate::protocol::{McpContent, McpToolDef, McpToolResult};
use crate::tool::Tool;
use async_trait::async_trait;
use hearback_core::{FeedbackResult, HearbackResult};
use hearback_session::SessionCoordinator;
use std::sync::Arc;
use tracing::{info, warn};

/// Name under which the tool is registered.
pub const FEEDBACK_TOOL_NAME: &str = "interactive_feedback";

/// Asks the human for feedback through a [`SessionCoordinator`].
///
/// Blocks (asynchronously) until the human answers or dismisses the agent.
pub struct FeedbackTool {
    descriptor: McpToolDef,
    coordinator: Arc<SessionCoordinator>,
}

impl FeedbackTool {
    /// Tool backed by `coordinator`.
    pub fn new(coordinator: Arc<SessionCoordinator>) -> Self {
        Self {
            descriptor: McpToolDef {
                name: FEEDBACK_TOOL_NAME.to_string(),
                description: "Request interactive feedback from the user. \
                    Shows the message, optional predefined options to pick from, \
                    and returns the user's text plus any attached files or images."
                    .to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "message": {
                            "type": "string",
                            "description": "The specific question for the user"
                        },
                        "predefined_options": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Predefined options for the user to choose from (optional)"
                        }
                    },
                    "required": ["message"]
                }),
            },
            coordinator,
        }
    }
}

/// Arguments accepted by the tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackRequest {
    /// Question for the human.
    pub message: String,
    /// Quick-pick answers; `None` when absent or empty.
    pub predefined_options: Option<Vec<String>>,
}

/// Extract the request from raw tool arguments. `predefinedOptions` is
/// accepted as an alias; a value that is not an array counts as absent.
pub fn parse_request(arguments: &serde_json::Value) -> Result<FeedbackRequest, String> {
    let message = arguments["message"]
        .as_str()
        .ok_or_else(|| "Missing required string argument 'message'".to_string())?
        .to_string();

    let predefined_options = arguments
        .get("predefined_options")
        .or_else(|| arguments.get("predefinedOptions"))
        .and_then(serde_json::Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect::<Vec<_>>()
        })
        .filter(|opts| !opts.is_empty());

    Ok(FeedbackRequest {
        message,
        predefined_options,
    })
}

/// Render a session result as MCP content: one JSON text block, then one
/// image block per image attachment that carries a preview.
pub fn render_result(result: &FeedbackResult) -> HearbackResult<McpToolResult> {
    let mut content = vec![McpContent::text(serde_json::to_string(result)?)];
    content.extend(result.attachments.iter().filter_map(|a| {
        a.inline_image().map(|(mime, data)| McpContent::Image {
            data: data.to_string(),
            mime_type: mime.to_string(),
        })
    }));
    Ok(McpToolResult::success(content))
}

#[async_trait]
impl Tool for FeedbackTool {
    fn descriptor(&self) -> &McpToolDef {
        &self.descriptor
    }

    async fn call(&self, arguments: serde_json::Value) -> HearbackResult<McpToolResult> {
        let request = match parse_request(&arguments) {
            Ok(request) => request,
            Err(msg) => return Ok(McpToolResult::error(msg)),
        };

        info!(
            message_len = request.message.len(),
            options = request.predefined_options.as_ref().map_or(0, Vec::len),
            "Requesting interactive feedback"
        );

        match self
            .coordinator
            .run_session(&request.message, request.predefined_options.as_deref())
            .await
        {
            Ok(result) => render_result(&result),
            Err(e) => {
                warn!(error = %e, "Interactive feedback failed");
                Ok(McpToolResult::error(e.to_string()))
            }
        }
    }
}
