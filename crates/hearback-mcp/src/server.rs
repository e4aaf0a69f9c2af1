//! MCP server that answers JSON-RPC 2.0 requests read line by line from an
//! async reader (stdin in production) and writes responses to a writer.

use crate::protocol::*;
use crate::tool::ToolRegistry;
use hearback_core::HearbackResult;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// MCP server over a newline-delimited byte stream.
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    info: ServerInfo,
}

impl McpServer {
    /// Server exposing the tools in `registry` under the given identity.
    pub fn new(registry: Arc<ToolRegistry>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            registry,
            info: ServerInfo {
                name: name.into(),
                version: version.into(),
            },
        }
    }

    /// Serve until `reader` reaches EOF.
    ///
    /// `tools/call` requests run on their own tasks so the server keeps
    /// answering while a human is still typing. When the client hangs up,
    /// unfinished calls are aborted.
    pub async fn serve<R, W>(self, reader: R, writer: W) -> HearbackResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let server = Arc::new(self);
        let (tx, rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let writer_task = tokio::spawn(write_responses(writer, rx));
        let mut calls = JoinSet::new();

        info!(
            server = %server.info.name,
            tools = server.registry.tool_count(),
            "MCP server ready"
        );

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let request = match parse_request(trimmed) {
                Ok(request) => request,
                Err(response) => {
                    let _ = tx.send(*response);
                    continue;
                }
            };

            if request.is_notification() {
                debug!(method = %request.method, "Notification received");
                continue;
            }
            let id = request.id.clone().unwrap_or(serde_json::Value::Null);

            if request.method == "tools/call" {
                let server = server.clone();
                let tx = tx.clone();
                calls.spawn(async move {
                    let response = server.respond(id, &request.method, request.params).await;
                    let _ = tx.send(response);
                });
            } else {
                let response = server.respond(id, &request.method, request.params).await;
                let _ = tx.send(response);
            }

            // reap finished calls so the set does not grow without bound
            while let Some(joined) = calls.try_join_next() {
                if let Err(e) = joined {
                    error!(error = %e, "Tool call task failed");
                }
            }
        }

        info!(in_flight = calls.len(), "MCP client disconnected");
        calls.shutdown().await;
        drop(tx);
        if let Err(e) = writer_task.await {
            error!(error = %e, "Response writer task failed");
        }
        Ok(())
    }

    async fn respond(
        &self,
        id: serde_json::Value,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> JsonRpcResponse {
        match self.dispatch(method, params).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => {
                debug!(method, code = err.code, message = %err.message, "Request failed");
                JsonRpcResponse::failure(id, err)
            }
        }
    }

    async fn dispatch(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, JsonRpcError> {
        match method {
            "initialize" => to_result(&InitializeResult {
                protocol_version: PROTOCOL_VERSION.to_string(),
                capabilities: ServerCapabilities {
                    tools: Some(serde_json::json!({})),
                },
                server_info: self.info.clone(),
            }),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => Ok(serde_json::json!({
                "tools": self.registry.list_descriptors(),
            })),
            "tools/call" => self.call_tool(params).await,
            other => Err(JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        }
    }

    async fn call_tool(
        &self,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, JsonRpcError> {
        let params: ToolCallParams = params
            .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "Missing tools/call params"))
            .and_then(|p| {
                serde_json::from_value(p).map_err(|e| {
                    JsonRpcError::new(INVALID_PARAMS, format!("Invalid tools/call params: {e}"))
                })
            })?;

        let tool = self.registry.get(&params.name).ok_or_else(|| {
            JsonRpcError::new(INVALID_PARAMS, format!("Unknown tool: {}", params.name))
        })?;

        info!(tool = %params.name, "Tool call");
        let result = match tool.call(params.arguments).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %params.name, error = %e, "Tool call failed");
                McpToolResult::error(e.to_string())
            }
        };
        to_result(&result)
    }
}

/// Parse one line into a request, or build the error response for it.
fn parse_request(line: &str) -> Result<JsonRpcRequest, Box<JsonRpcResponse>> {
    let value: serde_json::Value = serde_json::from_str(line).map_err(|e| {
        warn!(error = %e, "Unparseable message from client");
        Box::new(JsonRpcResponse::failure(
            serde_json::Value::Null,
            JsonRpcError::new(PARSE_ERROR, format!("Parse error: {e}")),
        ))
    })?;

    let id = value.get("id").cloned().unwrap_or(serde_json::Value::Null);
    serde_json::from_value(value).map_err(|e| {
        Box::new(JsonRpcResponse::failure(
            id,
            JsonRpcError::new(INVALID_REQUEST, format!("Invalid request: {e}")),
        ))
    })
}

fn to_result<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, JsonRpcError> {
    serde_json::to_value(value)
        .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, format!("Failed to serialize result: {e}")))
}

async fn write_responses<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let line = match serde_json::to_string(&response) {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "Failed to serialize response");
                continue;
            }
        };
        let written = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;
        if let Err(e) = written {
            error!(error = %e, "Failed to write response, stopping writer");
            break;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_valid() {
        let req = parse_request(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
        assert_eq!(req.method, "ping");
    }

    #[test]
    fn test_parse_request_not_json() {
        let resp = parse_request("{oops").unwrap_err();
        assert!(resp.id.is_null());
        assert_eq!(resp.error.unwrap().code, PARSE_ERROR);
    }

    #[test]
    fn test_parse_request_missing_method() {
        let resp = parse_request(r#"{"jsonrpc":"2.0","id":9}"#).unwrap_err();
        assert_eq!(resp.id, serde_json::json!(9));
        assert_eq!(resp.error.unwrap().code, INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_method() {
        let server = McpServer::new(Arc::new(ToolRegistry::new()), "t", "0");
        let err = server.dispatch("resources/list", None).await.unwrap_err();
        assert_eq!(err.code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_dispatch_call_without_params() {
        let server = McpServer::new(Arc::new(ToolRegistry::new()), "t", "0");
        let err = server.dispatch("tools/call", None).await.unwrap_err();
        assert_eq!(err.code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let server = McpServer::new(Arc::new(ToolRegistry::new()), "t", "0");
        let err = server
            .dispatch("tools/call", Some(serde_json::json!({"name": "nope"})))
            .await
            .unwrap_err();
        assert_eq!(err.code, INVALID_PARAMS);
        assert!(err.message.contains("nope"));
    }
}
