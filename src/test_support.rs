//! Scripted collaborators shared by the unit tests

use crate::error::OrchestrationError;
use crate::llm::LlmClient;
use crate::models::ToolParams;
use crate::tools::{Tool, ToolAction};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// LLM double answering from a queue and remembering every prompt.
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(OrchestrationError::LlmError(message.to_string())));
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompt(&self, index: usize) -> String {
        self.prompts.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn provider(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn generate_text(&self, prompt: &str, _system_prompt: Option<&str>) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(OrchestrationError::LlmError("script exhausted".to_string())))
    }
}

#[derive(Clone, Copy)]
enum Behavior {
    Respond,
    Fail,
    Panic,
    Sleep(Duration),
}

/// Tool double with a fixed behavior and a record of received params.
pub struct StaticTool {
    name: String,
    data: Value,
    actions: Vec<ToolAction>,
    behavior: Behavior,
    calls: AtomicUsize,
    received: Mutex<Vec<ToolParams>>,
}

impl StaticTool {
    pub fn new(name: &str, data: Value) -> Self {
        Self {
            name: name.to_string(),
            data,
            actions: Vec::new(),
            behavior: Behavior::Respond,
            calls: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            behavior: Behavior::Fail,
            ..Self::new(name, Value::Null)
        }
    }

    pub fn panicking(name: &str) -> Self {
        Self {
            behavior: Behavior::Panic,
            ..Self::new(name, Value::Null)
        }
    }

    pub fn sleeping(name: &str, duration: Duration) -> Self {
        Self {
            behavior: Behavior::Sleep(duration),
            ..Self::new(name, Value::Null)
        }
    }

    pub fn with_actions(mut self, actions: &[ToolAction]) -> Self {
        self.actions = actions.to_vec();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<ToolParams> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "test tool"
    }

    fn actions(&self) -> &[ToolAction] {
        &self.actions
    }

    async fn run(&self, _action: &str, params: &ToolParams) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(params.clone());

        match self.behavior {
            Behavior::Respond => Ok(self.data.clone()),
            Behavior::Fail => Err(OrchestrationError::ToolError(format!(
                "{} is unavailable",
                self.name
            ))),
            Behavior::Panic => panic!("{} crashed", self.name),
            Behavior::Sleep(duration) => {
                tokio::time::sleep(duration).await;
                Ok(self.data.clone())
            }
        }
    }
}
