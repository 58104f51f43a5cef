//! The mcp handler serving the catalog.

use std::sync::Arc;

use mcp::{CallToolResult, ServerInfo, Tool};
use serde_json::{Map, Value, json};

use crate::catalog::Catalog;

/// Tool host service: owns the catalog and executes calls.
///
/// Telemetry calls block (CPU sampling windows, the graceful-terminate
/// wait), so execution happens on the blocking pool to keep the
/// transport loop responsive.
pub struct HostService {
    catalog: Arc<Catalog>,
}

impl HostService {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }
}

impl mcp::Handler for HostService {
    fn server_info(&self) -> ServerInfo {
        ServerInfo {
            name: "vitals-host".to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }
    }

    fn list_tools(&self) -> Vec<Tool> {
        self.catalog.tools()
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> mcp::Result<CallToolResult> {
        let operation = self
            .catalog
            .get(name)
            .ok_or_else(|| mcp::Error::ToolNotFound(name.to_string()))?;
        let handler = operation.handler;

        let args: Map<String, Value> = match arguments {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Ok(CallToolResult::text(
                    json!({"error": "arguments must be an object"}).to_string(),
                ));
            }
        };

        tracing::info!(tool = name, "tool call");
        let record = tokio::task::spawn_blocking(move || handler(&args))
            .await
            .unwrap_or_else(|e| json!({"error": format!("tool execution failed: {e}")}));

        Ok(CallToolResult::text(record.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp::Handler;

    #[tokio::test]
    async fn serves_the_full_catalog() {
        let service = HostService::new(Catalog::standard());
        assert_eq!(service.list_tools().len(), 11);
        assert_eq!(service.server_info().name, "vitals-host");
    }

    #[tokio::test]
    async fn call_returns_parseable_json_text() {
        let service = HostService::new(Catalog::standard());
        let result = service.call_tool("get_memory_usage", None).await.unwrap();
        let record: Value = serde_json::from_str(&result.joined_text()).unwrap();
        assert!(record["total_gb"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn unknown_tool_is_a_method_level_error() {
        let service = HostService::new(Catalog::standard());
        let err = service.call_tool("no_such_tool", None).await.unwrap_err();
        assert!(matches!(err, mcp::Error::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn non_object_arguments_degrade_to_error_record() {
        let service = HostService::new(Catalog::standard());
        let result = service
            .call_tool("get_disk_usage", Some(json!([1, 2])))
            .await
            .unwrap();
        let record: Value = serde_json::from_str(&result.joined_text()).unwrap();
        assert!(record["error"].is_string());
    }
}
