//! Scripted model double for tests.

use super::{Completion, LanguageModel};
use crate::conversation::{Message, ToolCall};
use crate::error::{PalaverError, Result};
use crate::tools::ToolDefinition;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

enum Step {
    Reply(Completion),
    Fail(String),
}

/// Replays queued completions in order and records what it was shown.
pub(crate) struct ScriptedModel {
    script: Mutex<VecDeque<Step>>,
    repeat: Option<Completion>,
    prompt_reply: Option<String>,
    histories: Mutex<Vec<Vec<Message>>>,
    tools_offered: Mutex<Vec<Vec<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub(crate) fn new(completions: Vec<Completion>) -> Self {
        Self {
            script: Mutex::new(completions.into_iter().map(Step::Reply).collect()),
            repeat: None,
            prompt_reply: None,
            histories: Mutex::new(Vec::new()),
            tools_offered: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A model whose next `complete` call fails.
    pub(crate) fn failing(message: &str) -> Self {
        Self::new(vec![]).then_fail(message)
    }

    /// Queue a failure after the scripted completions.
    pub(crate) fn then_fail(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Step::Fail(message.to_string()));
        self
    }

    /// Keep returning `completion` once the script runs out.
    pub(crate) fn repeating(completion: Completion) -> Self {
        let mut model = Self::new(vec![]);
        model.repeat = Some(completion);
        model
    }

    pub(crate) fn with_prompt_reply(mut self, reply: &str) -> Self {
        self.prompt_reply = Some(reply.to_string());
        self
    }

    /// Histories passed to each `complete` call.
    pub(crate) fn histories_seen(&self) -> Vec<Vec<Message>> {
        self.histories.lock().unwrap().clone()
    }

    /// Tool names offered on each `complete` call.
    pub(crate) fn tools_offered(&self) -> Vec<Vec<String>> {
        self.tools_offered.lock().unwrap().clone()
    }

    pub(crate) fn prompts_seen(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.histories.lock().unwrap().len()
    }
}

/// Shorthand for a tool call with a fixed id.
pub(crate) fn call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, history: &[Message], tools: &[ToolDefinition]) -> Result<Completion> {
        self.histories.lock().unwrap().push(history.to_vec());
        self.tools_offered
            .lock()
            .unwrap()
            .push(tools.iter().map(|t| t.name.clone()).collect());

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Step::Reply(completion)) => Ok(completion),
            Some(Step::Fail(message)) => Err(PalaverError::Model(message)),
            None => self
                .repeat
                .clone()
                .ok_or_else(|| PalaverError::Model("script exhausted".to_string())),
        }
    }

    async fn prompt(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.prompt_reply
            .clone()
            .ok_or_else(|| PalaverError::Model("no prompt reply scripted".to_string()))
    }
}
