//! Tool-invocation protocol (JSON-RPC 2.0 over stdio), both ends.
//!
//! The wire format is line-delimited JSON. The client spawns the tool
//! host as a child process and issues one request at a time; the server
//! loop reads requests, dispatches into a [`server::Handler`], and
//! writes responses.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{Client, ServerConfig};
//! use std::collections::HashMap;
//!
//! # async fn example() -> mcp::Result<()> {
//! let config = ServerConfig {
//!     name: "vitals-host".to_string(),
//!     command: "vitals".to_string(),
//!     args: vec!["serve".to_string()],
//!     env: HashMap::new(),
//! };
//!
//! let client = Client::spawn(config).await?;
//! client.initialize().await?;
//!
//! for tool in client.tools().await {
//!     println!("Tool: {}", tool.name);
//! }
//!
//! let result = client.call_tool("get_disk_usage", Some(serde_json::json!({
//!     "path": "/"
//! }))).await?;
//! println!("{}", result.joined_text());
//!
//! client.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod protocol;
pub mod server;

pub use client::{Client, DEFAULT_TIMEOUT, MAX_OUTPUT_SIZE, ServerConfig};
pub use error::{Error, Result};
pub use protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, PROTOCOL_VERSION, RequestId,
    ServerCapabilities, ServerInfo, Tool, ToolContent, ToolsCapability,
};
pub use server::Handler;
