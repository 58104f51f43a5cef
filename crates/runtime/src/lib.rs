//! Chat runtime: model backends, tool dispatch and session management.

pub mod error;
pub mod model;
pub mod providers;
pub mod session;
pub mod tools;
pub mod transcript;

pub use error::{Error, Result};
pub use model::{Backend, ChatRequest, ModelError, ModelTurn, ToolChoice, Usage};
pub use providers::{DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAiBackend, OpenAiBackendBuilder};
pub use session::{Exchange, Session, SYSTEM_PROMPT};
pub use tools::{McpToolHost, ToolError, ToolHost, ToolSpec};
pub use transcript::{Message, Role, ToolCall};
