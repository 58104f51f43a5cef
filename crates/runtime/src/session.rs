//! Conversation session: transcript, tool dispatch and synthesis.

use serde_json::json;

use crate::error::Result;
use crate::model::{Backend, ChatRequest, ModelTurn, ToolChoice};
use crate::tools::ToolHost;
use crate::transcript::Message;

/// Standing instructions for the assistant.
pub const SYSTEM_PROMPT: &str = "\
You are a system monitoring assistant with access to tools that report CPU, \
memory, disk, network and process telemetry, and that can terminate, suspend \
or resume processes.

Rules:
- Use the tools to answer questions about the machine; never guess at numbers.
- Before terminating, suspending or resuming a process, ask the user to \
confirm unless they have already clearly asked for that exact action.
- Treat processes with a PID below 1000 as higher-risk system processes and \
say so when the user asks to act on one.
- Summarize tool output in plain language; include the key figures.
- Respond in English.";

/// One user-facing exchange: the final reply plus what happened on the way.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub reply: String,
    /// Names of the tools dispatched for this exchange, in order.
    pub tools_used: Vec<String>,
}

/// A chat session over a model backend and a tool host.
///
/// The transcript persists across [`Session::chat`] calls until
/// [`Session::reset`].
pub struct Session<B, H> {
    backend: B,
    host: H,
    system: String,
    messages: Vec<Message>,
}

impl<B: Backend, H: ToolHost> Session<B, H> {
    pub fn new(backend: B, host: H) -> Self {
        Self::with_system(backend, host, SYSTEM_PROMPT)
    }

    pub fn with_system(backend: B, host: H, system: impl Into<String>) -> Self {
        Self {
            backend,
            host,
            system: system.into(),
            messages: Vec::new(),
        }
    }

    /// Run one exchange: send the query, dispatch any tool calls the model
    /// makes, then ask for a plain-text synthesis of the results.
    pub async fn chat(&mut self, query: &str) -> Result<Exchange> {
        if self.messages.is_empty() {
            self.messages.push(Message::system(&self.system));
        }
        self.messages.push(Message::user(query));

        let specs = self.host.specs();
        let turn = self
            .backend
            .complete(ChatRequest {
                messages: &self.messages,
                tools: &specs,
                tool_choice: ToolChoice::Auto,
            })
            .await?;

        if turn.message.tool_calls.is_empty() {
            return Ok(self.finish(turn));
        }

        let calls = turn.message.tool_calls.clone();
        self.messages.push(turn.message);

        let mut tools_used = Vec::with_capacity(calls.len());
        for call in &calls {
            tracing::info!(tool = %call.name, "dispatching tool call");
            let output = match self.host.execute(&call.name, &call.arguments).await {
                Ok(output) => output,
                Err(error) => json!({ "error": format!("tool call failed: {error}") }).to_string(),
            };
            tools_used.push(call.name.clone());
            self.messages.push(Message::tool(&call.id, output));
        }

        // Synthesis round: no tools attached, so the model must answer in text.
        let turn = self
            .backend
            .complete(ChatRequest {
                messages: &self.messages,
                tools: &[],
                tool_choice: ToolChoice::None,
            })
            .await?;

        let mut exchange = self.finish(turn);
        exchange.tools_used = tools_used;
        Ok(exchange)
    }

    fn finish(&mut self, turn: ModelTurn) -> Exchange {
        let reply = turn.message.text_content().to_string();
        self.messages.push(turn.message);
        Exchange {
            reply,
            tools_used: Vec::new(),
        }
    }

    /// Drop the transcript. The next [`Session::chat`] starts fresh.
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Shut down the tool host.
    pub async fn close(mut self) {
        self.host.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::model::{ModelError, Usage};
    use crate::tools::{ToolError, ToolSpec};
    use crate::transcript::{Role, ToolCall};
    use serde_json::json;

    /// Snapshot of what one completion request looked like.
    struct SeenRequest {
        message_count: usize,
        tools_offered: usize,
    }

    /// Backend that replays a scripted sequence of turns and records each
    /// request it receives.
    struct ScriptedBackend {
        script: Mutex<VecDeque<Message>>,
        seen: Mutex<Vec<SeenRequest>>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Message>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Backend for ScriptedBackend {
        async fn complete(
            &self,
            request: ChatRequest<'_>,
        ) -> std::result::Result<ModelTurn, ModelError> {
            self.seen.lock().unwrap().push(SeenRequest {
                message_count: request.messages.len(),
                tools_offered: request.tools.len(),
            });
            let message = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ModelError::Api("script exhausted".into()))?;
            Ok(ModelTurn {
                message,
                usage: Usage::default(),
            })
        }
    }

    /// Tool host that echoes calls back, or fails for names starting "bad".
    struct EchoHost;

    impl ToolHost for EchoHost {
        fn specs(&self) -> Vec<ToolSpec> {
            vec![ToolSpec {
                name: "get_cpu_usage".into(),
                description: "CPU usage".into(),
                parameters: json!({"type": "object"}),
            }]
        }

        async fn execute(
            &self,
            name: &str,
            arguments: &str,
        ) -> std::result::Result<String, ToolError> {
            if name.starts_with("bad") {
                return Err(ToolError::Execution("host exited".into()));
            }
            Ok(json!({ "tool": name, "args": arguments }).to_string())
        }

        async fn shutdown(&mut self) {}
    }

    fn tool_call_turn(calls: Vec<(&str, &str)>) -> Message {
        Message {
            role: Role::Assistant,
            content: None,
            tool_calls: calls
                .into_iter()
                .enumerate()
                .map(|(i, (name, args))| ToolCall {
                    id: format!("call_{i}"),
                    name: name.into(),
                    arguments: args.into(),
                })
                .collect(),
            tool_call_id: None,
        }
    }

    #[tokio::test]
    async fn plain_answer_needs_one_completion() {
        let backend = ScriptedBackend::new(vec![Message::assistant("hello")]);
        let mut session = Session::new(backend, EchoHost);

        let exchange = session.chat("hi").await.unwrap();
        assert_eq!(exchange.reply, "hello");
        assert!(exchange.tools_used.is_empty());
        // system + user + assistant
        assert_eq!(session.message_count(), 3);
        assert_eq!(session.backend.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn tool_calls_get_paired_responses_then_synthesis() {
        let backend = ScriptedBackend::new(vec![
            tool_call_turn(vec![("get_cpu_usage", "{}"), ("get_memory_usage", "{}")]),
            Message::assistant("cpu is fine, memory is fine"),
        ]);
        let mut session = Session::new(backend, EchoHost);

        let exchange = session.chat("how is the machine?").await.unwrap();
        assert_eq!(exchange.reply, "cpu is fine, memory is fine");
        assert_eq!(exchange.tools_used, vec!["get_cpu_usage", "get_memory_usage"]);

        // system, user, assistant(tool_calls), tool, tool, assistant
        assert_eq!(session.message_count(), 6);
        let tools: Vec<_> = session
            .messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .collect();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].tool_call_id.as_deref(), Some("call_0"));
        assert_eq!(tools[1].tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn synthesis_round_offers_no_tools() {
        let backend = ScriptedBackend::new(vec![
            tool_call_turn(vec![("get_cpu_usage", "{}")]),
            Message::assistant("done"),
        ]);
        let mut session = Session::new(backend, EchoHost);
        session.chat("cpu?").await.unwrap();

        let seen = session.backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].tools_offered, 1);
        assert_eq!(seen[1].tools_offered, 0);
    }

    #[tokio::test]
    async fn transport_failure_becomes_error_record() {
        let backend = ScriptedBackend::new(vec![
            tool_call_turn(vec![("bad_tool", "{}")]),
            Message::assistant("the tool failed"),
        ]);
        let mut session = Session::new(backend, EchoHost);
        session.chat("do it").await.unwrap();

        let tool_msg = session
            .messages
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        let record: serde_json::Value =
            serde_json::from_str(tool_msg.text_content()).unwrap();
        assert!(
            record["error"]
                .as_str()
                .unwrap()
                .starts_with("tool call failed")
        );
    }

    #[tokio::test]
    async fn reset_reseeds_system_prompt() {
        let backend = ScriptedBackend::new(vec![
            Message::assistant("one"),
            Message::assistant("two"),
        ]);
        let mut session = Session::new(backend, EchoHost);

        session.chat("first").await.unwrap();
        session.reset();
        assert_eq!(session.message_count(), 0);

        session.chat("second").await.unwrap();
        assert_eq!(session.messages[0].role, Role::System);
        assert_eq!(session.messages[1].text_content(), "second");
    }
}
