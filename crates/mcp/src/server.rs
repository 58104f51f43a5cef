//! Server side: serve a tool catalog over line-delimited JSON-RPC.
//!
//! The loop is generic over the reader/writer pair so tests can run it
//! against an in-memory duplex instead of real stdio.

use std::future::Future;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{Error, Result};
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, PROTOCOL_VERSION, ServerCapabilities, ServerInfo, Tool,
    ToolsCapability,
};

/// A tool catalog the server loop can dispatch into.
///
/// Implementations own the operation table; this trait is the boundary
/// between transport and tool execution.
pub trait Handler: Send + Sync {
    /// Identity reported during initialization.
    fn server_info(&self) -> ServerInfo;

    /// The advertised tool catalog.
    fn list_tools(&self) -> Vec<Tool>;

    /// Execute a tool call. `Err(Error::ToolNotFound)` maps to a JSON-RPC
    /// invalid-params error; operation-level faults must instead be
    /// encoded as structured error records inside the result.
    fn call_tool(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> impl Future<Output = Result<CallToolResult>> + Send;
}

/// Serve requests from `reader`, writing responses to `writer`, until EOF.
pub async fn serve<H, R, W>(handler: &H, reader: R, writer: W) -> Result<()>
where
    H: Handler,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut writer = writer;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                let response = JsonRpcResponse::failure(
                    None,
                    JsonRpcError::new(JsonRpcError::PARSE_ERROR, format!("parse error: {e}")),
                );
                write_response(&mut writer, &response).await?;
                continue;
            }
        };

        // Notifications get no response.
        let Some(id) = request.id else {
            continue;
        };

        let response = match dispatch(handler, &request.method, request.params).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(Some(id), error),
        };
        write_response(&mut writer, &response).await?;
    }

    Ok(())
}

/// Serve on the process's stdin/stdout. This is what `vitals serve` runs;
/// diagnostics must go to stderr, stdout carries the protocol.
pub async fn serve_stdio<H: Handler>(handler: &H) -> Result<()> {
    serve(handler, tokio::io::stdin(), tokio::io::stdout()).await
}

async fn dispatch<H: Handler>(
    handler: &H,
    method: &str,
    params: Option<Value>,
) -> std::result::Result<Value, JsonRpcError> {
    match method {
        "initialize" => {
            let result = InitializeResult {
                protocol_version: PROTOCOL_VERSION.to_string(),
                capabilities: ServerCapabilities {
                    tools: Some(ToolsCapability {
                        list_changed: false,
                    }),
                },
                server_info: handler.server_info(),
            };
            to_json(result)
        }
        "tools/list" => to_json(ListToolsResult {
            tools: handler.list_tools(),
        }),
        "tools/call" => {
            let params: CallToolParams = match params {
                Some(value) => serde_json::from_value(value)
                    .map_err(|e| JsonRpcError::invalid_params(format!("invalid params: {e}")))?,
                None => return Err(JsonRpcError::invalid_params("missing params")),
            };
            let result = handler
                .call_tool(&params.name, params.arguments)
                .await
                .map_err(|e| match e {
                    Error::ToolNotFound(name) => {
                        JsonRpcError::invalid_params(format!("unknown tool: {name}"))
                    }
                    other => JsonRpcError::internal(other.to_string()),
                })?;
            to_json(result)
        }
        other => Err(JsonRpcError::method_not_found(other)),
    }
}

fn to_json(value: impl serde::Serialize) -> std::result::Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal(e.to_string()))
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &JsonRpcResponse,
) -> Result<()> {
    let json = serde_json::to_string(response)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
