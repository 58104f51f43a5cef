//! Provider-agnostic model types.

use std::future::Future;

use thiserror::Error;

use crate::tools::ToolSpec;
use crate::transcript::Message;

/// How the model may choose tools for one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToolChoice {
    /// Model decides whether to use tools.
    #[default]
    Auto,
    /// Model must answer in text (the synthesis round).
    None,
}

/// Everything needed for one completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub messages: &'a [Message],
    pub tools: &'a [ToolSpec],
    pub tool_choice: ToolChoice,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// The model's reply to one completion request: either plain text or a
/// batch of tool calls (carried on the message).
#[derive(Debug, Clone)]
pub struct ModelTurn {
    pub message: Message,
    pub usage: Usage,
}

/// Errors from model provider calls.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// A network error occurred during the API call.
    #[error("network: {0}")]
    Network(String),

    /// The provider returned an error response.
    #[error("provider api: {0}")]
    Api(String),

    /// The provider response could not be parsed.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Trait for chat-completion provider backends.
pub trait Backend: Send + Sync {
    fn complete(
        &self,
        request: ChatRequest<'_>,
    ) -> impl Future<Output = Result<ModelTurn, ModelError>> + Send;
}
