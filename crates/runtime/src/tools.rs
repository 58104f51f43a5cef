//! Tool surface offered to the model.

use std::future::Future;

use serde_json::Value;
use thiserror::Error;

use mcp::Client;

/// Errors from tool dispatch.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The model produced arguments that are not valid JSON.
    #[error("invalid tool input: {0}")]
    InvalidInput(String),

    /// The call never reached the tool (transport failure, dead host).
    #[error("tool call failed: {0}")]
    Execution(String),
}

/// A tool descriptor in the shape providers expect.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl From<&mcp::Tool> for ToolSpec {
    fn from(tool: &mcp::Tool) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone().unwrap_or_default(),
            parameters: tool.input_schema.clone(),
        }
    }
}

/// Source of tools and executor of tool calls.
pub trait ToolHost: Send + Sync {
    /// Descriptors for every available tool.
    fn specs(&self) -> Vec<ToolSpec>;

    /// Execute one call, returning the tool's textual output. Tool-level
    /// failures come back as ordinary output; `Err` means the call never
    /// reached the tool.
    fn execute(
        &self,
        name: &str,
        arguments: &str,
    ) -> impl Future<Output = Result<String, ToolError>> + Send;

    fn shutdown(&mut self) -> impl Future<Output = ()> + Send;
}

/// Tool host backed by a spawned tool server process.
pub struct McpToolHost {
    client: Option<Client>,
    specs: Vec<ToolSpec>,
}

impl McpToolHost {
    /// Spawns the configured server process, completes the handshake and
    /// caches the advertised catalog.
    pub async fn spawn(config: mcp::ServerConfig) -> mcp::Result<Self> {
        let client = Client::spawn(config).await?;
        client.initialize().await?;
        let specs = client.tools().await.iter().map(ToolSpec::from).collect();
        Ok(Self {
            client: Some(client),
            specs,
        })
    }

    pub fn tool_count(&self) -> usize {
        self.specs.len()
    }
}

impl ToolHost for McpToolHost {
    fn specs(&self) -> Vec<ToolSpec> {
        self.specs.clone()
    }

    async fn execute(&self, name: &str, arguments: &str) -> Result<String, ToolError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ToolError::Execution("tool host is shut down".into()))?;

        let arguments: Value = if arguments.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(arguments).map_err(|e| ToolError::InvalidInput(e.to_string()))?
        };
        let arguments = match arguments {
            Value::Null => None,
            value @ Value::Object(_) => Some(value),
            _ => return Err(ToolError::InvalidInput("arguments must be an object".into())),
        };

        let result = client
            .call_tool(name, arguments)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let text = result.joined_text();
        if text.is_empty() {
            return Ok(r#"{"error":"no content returned from tool"}"#.to_string());
        }
        Ok(text)
    }

    async fn shutdown(&mut self) {
        if let Some(client) = self.client.take() {
            if let Err(error) = client.shutdown().await {
                tracing::warn!(%error, "tool server shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn spec_from_tool_fills_missing_description() {
        let tool = mcp::Tool {
            name: "get_cpu_usage".into(),
            description: None,
            input_schema: json!({"type": "object"}),
        };
        let spec = ToolSpec::from(&tool);
        assert_eq!(spec.name, "get_cpu_usage");
        assert_eq!(spec.description, "");
        assert_eq!(spec.parameters["type"], "object");
    }
}
