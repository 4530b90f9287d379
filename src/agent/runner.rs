//! Agent runner with tool calling loop.

use crate::conversation::{Message, ToolCall};
use crate::error::Result;
use crate::model::{Completion, LanguageModel};
use crate::tools::{ToolOutput, ToolRegistry};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reply used when a turn runs out of iterations.
pub const INCOMPLETE_REPLY: &str = "I couldn't finish this request within the allowed number of steps. \
Please try again, or break the request into smaller parts.";

enum TurnState {
    AwaitingModel,
    ExecutingTools(Vec<ToolCall>),
    Done,
}

/// Drives one turn of a conversation through the model and the tools.
pub struct Agent {
    model: Arc<dyn LanguageModel>,
    tools: Arc<ToolRegistry>,
    max_iterations: usize,
}

impl Agent {
    pub fn new(model: Arc<dyn LanguageModel>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            model,
            tools,
            max_iterations: 10,
        }
    }

    /// Set maximum model calls per turn (at least one).
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one turn on top of `history`.
    ///
    /// The outcome carries only the messages appended by this turn; the
    /// caller decides whether to persist them. Only a model failure is an
    /// `Err`.
    pub async fn run_turn(&self, history: &[Message], user_message: &str) -> Result<TurnOutcome> {
        let start = history.len();
        let mut messages = history.to_vec();
        messages.push(Message::user(user_message));

        let definitions = self.tools.definitions();
        let mut tool_calls = Vec::new();
        let mut iterations = 0;
        let mut complete = true;
        let mut state = TurnState::AwaitingModel;

        loop {
            state = match state {
                TurnState::AwaitingModel if iterations >= self.max_iterations => {
                    warn!(
                        "Agent exceeded maximum iterations ({}), ending turn",
                        self.max_iterations
                    );
                    complete = false;
                    messages.push(Message::assistant(INCOMPLETE_REPLY));
                    TurnState::Done
                }
                TurnState::AwaitingModel => {
                    iterations += 1;
                    debug!("Agent iteration {}", iterations);

                    match self.model.complete(&messages, &definitions).await? {
                        Completion::FinalAnswer(text) => {
                            messages.push(Message::assistant(text));
                            TurnState::Done
                        }
                        Completion::ToolRequests { content, calls } if calls.is_empty() => {
                            messages.push(Message::assistant(content));
                            TurnState::Done
                        }
                        Completion::ToolRequests { content, calls } => {
                            messages.push(Message::assistant_with_tools(content, calls.clone()));
                            TurnState::ExecutingTools(calls)
                        }
                    }
                }
                TurnState::ExecutingTools(calls) => {
                    for call in &calls {
                        let record = self.execute_tool_call(call).await;
                        messages.push(Message::tool_result(call, record.result.clone()));
                        tool_calls.push(record);
                    }
                    TurnState::AwaitingModel
                }
                TurnState::Done => break,
            };
        }

        let reply = final_reply(&messages, start)?;
        let appended = messages.split_off(start);

        Ok(TurnOutcome {
            reply,
            messages: appended,
            tool_calls,
            iterations,
            complete,
        })
    }

    /// Execute a single tool call and return a record of it.
    async fn execute_tool_call(&self, call: &ToolCall) -> ToolCallRecord {
        info!("Agent calling tool: {} with args: {}", call.name, call.arguments);

        let result = match self.tools.invoke(&call.name, call.arguments.clone()).await {
            Ok(output) => output.render(),
            Err(e) => {
                warn!("Model requested undeclared tool {}", call.name);
                ToolOutput::error(e).render()
            }
        };

        ToolCallRecord {
            name: call.name.clone(),
            arguments: call.arguments.to_string(),
            result,
        }
    }
}

/// Last assistant text of the turn, or every message content as a JSON
/// array when the turn produced none.
fn final_reply(messages: &[Message], turn_start: usize) -> Result<String> {
    let answer = messages[turn_start..]
        .iter()
        .rev()
        .find(|m| m.is_assistant_text())
        .map(|m| m.content.clone());

    match answer {
        Some(text) => Ok(text),
        None => {
            let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
            Ok(serde_json::to_string(&contents)?)
        }
    }
}

/// Result of one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Text returned to the caller.
    pub reply: String,
    /// Messages appended by this turn, starting with the user message.
    pub messages: Vec<Message>,
    /// Record of all tool calls made during the turn.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of model calls used.
    pub iterations: usize,
    /// False when the iteration limit cut the turn short.
    pub complete: bool,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use crate::error::PalaverError;
    use crate::model::testing::{call, ScriptedModel};
    use crate::tools::Tool;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the text argument"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }

        async fn invoke(&self, arguments: serde_json::Value) -> Result<ToolOutput> {
            let text = crate::tools::required_str(&arguments, "text")?;
            Ok(ToolOutput::text(text))
        }
    }

    struct BrokenTool;

    #[async_trait]
    impl Tool for BrokenTool {
        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }

        async fn invoke(&self, _arguments: serde_json::Value) -> Result<ToolOutput> {
            Err(PalaverError::Tool("upstream unavailable".to_string()))
        }
    }

    fn agent(model: Arc<ScriptedModel>) -> Agent {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();
        registry.register(BrokenTool).unwrap();
        Agent::new(model, Arc::new(registry))
    }

    #[test]
    fn test_tool_call_record_display() {
        let record = ToolCallRecord {
            name: "search".to_string(),
            arguments: r#"{"query": "test"}"#.to_string(),
            result: "Found results".to_string(),
        };
        assert_eq!(format!("{}", record), r#"search({"query": "test"})"#);
    }

    #[tokio::test]
    async fn test_final_answer_round_trip() {
        let model = Arc::new(ScriptedModel::new(vec![Completion::FinalAnswer(
            "Hello there".into(),
        )]));
        let outcome = agent(model.clone()).run_turn(&[], "hi").await.unwrap();

        assert_eq!(outcome.reply, "Hello there");
        assert!(outcome.complete);
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.messages.len(), 2);
        assert_eq!(outcome.messages[0], Message::user("hi"));
        assert_eq!(model.tools_offered()[0], vec!["echo", "broken"]);
    }

    #[tokio::test]
    async fn test_tool_results_follow_call_order() {
        let calls = vec![
            call("a", "echo", json!({"text": "first"})),
            call("b", "echo", json!({"text": "second"})),
            call("c", "echo", json!({"text": "third"})),
        ];
        let model = Arc::new(ScriptedModel::new(vec![
            Completion::ToolRequests {
                content: String::new(),
                calls,
            },
            Completion::FinalAnswer("done".into()),
        ]));

        let outcome = agent(model.clone()).run_turn(&[], "go").await.unwrap();

        let results: Vec<_> = outcome
            .messages
            .iter()
            .filter(|m| m.role == Role::ToolResult)
            .collect();
        assert_eq!(results.len(), 3);
        let ids: Vec<_> = results.iter().map(|m| m.tool_call_id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        let contents: Vec<_> = results.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);

        // The second model call sees every result before answering.
        let second = &model.histories_seen()[1];
        assert_eq!(second.len(), 5);
        assert_eq!(second[1].tool_calls.len(), 3);
        assert_eq!(outcome.tool_calls.len(), 3);
        assert_eq!(outcome.reply, "done");
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_result_text() {
        let model = Arc::new(ScriptedModel::new(vec![
            Completion::ToolRequests {
                content: String::new(),
                calls: vec![call("x", "teleport", json!({}))],
            },
            Completion::FinalAnswer("I can't do that.".into()),
        ]));

        let outcome = agent(model).run_turn(&[], "beam me up").await.unwrap();

        assert!(outcome.complete);
        assert_eq!(outcome.tool_calls[0].result, "Error: Unknown tool: teleport");
    }

    #[tokio::test]
    async fn test_tool_failure_reaches_done() {
        let model = Arc::new(ScriptedModel::new(vec![
            Completion::ToolRequests {
                content: String::new(),
                calls: vec![call("x", "broken", json!({}))],
            },
            Completion::FinalAnswer("The service is down.".into()),
        ]));

        let outcome = agent(model).run_turn(&[], "try it").await.unwrap();

        assert_eq!(outcome.reply, "The service is down.");
        assert_eq!(outcome.tool_calls[0].result, "Error: upstream unavailable");
    }

    #[tokio::test]
    async fn test_iteration_limit_ends_incomplete() {
        let model = Arc::new(ScriptedModel::repeating(Completion::ToolRequests {
            content: String::new(),
            calls: vec![call("loop", "echo", json!({"text": "again"}))],
        }));

        let outcome = agent(model.clone())
            .with_max_iterations(3)
            .run_turn(&[], "loop forever")
            .await
            .unwrap();

        assert!(!outcome.complete);
        assert_eq!(outcome.iterations, 3);
        assert_eq!(model.calls(), 3);
        assert_eq!(outcome.reply, INCOMPLETE_REPLY);
        // Every issued call still has its result.
        let results = outcome
            .messages
            .iter()
            .filter(|m| m.role == Role::ToolResult)
            .count();
        assert_eq!(results, 3);
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let model = Arc::new(ScriptedModel::failing("upstream outage"));
        let err = agent(model).run_turn(&[], "hi").await.unwrap_err();
        assert!(matches!(err, PalaverError::Model(_)));
    }

    #[tokio::test]
    async fn test_empty_answer_falls_back_to_contents() {
        let model = Arc::new(ScriptedModel::new(vec![Completion::FinalAnswer(String::new())]));
        let history = vec![Message::system("sys")];

        let outcome = agent(model).run_turn(&history, "hi").await.unwrap();

        assert_eq!(outcome.reply, r#"["sys","hi",""]"#);
    }

    #[tokio::test]
    async fn test_text_alongside_calls_is_reply_when_final_is_empty() {
        let model = Arc::new(ScriptedModel::new(vec![
            Completion::ToolRequests {
                content: "Let me check.".into(),
                calls: vec![call("a", "echo", json!({"text": "x"}))],
            },
            Completion::FinalAnswer(String::new()),
        ]));

        let outcome = agent(model).run_turn(&[], "check").await.unwrap();
        assert_eq!(outcome.reply, "Let me check.");
    }

    #[tokio::test]
    async fn test_history_is_prefix_of_model_input() {
        let history = vec![
            Message::system("sys"),
            Message::user("earlier"),
            Message::assistant("earlier answer"),
        ];
        let model = Arc::new(ScriptedModel::new(vec![Completion::FinalAnswer("ok".into())]));

        agent(model.clone()).run_turn(&history, "now").await.unwrap();

        let seen = &model.histories_seen()[0];
        assert_eq!(&seen[..3], history.as_slice());
        assert_eq!(seen[3], Message::user("now"));
    }
}
