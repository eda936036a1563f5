//! Shared test helpers.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{Completion, GenerationOptions, LlmProvider};
use crate::schema::FunctionSchema;

/// A provider that replays a fixed script of responses.
///
/// Each call to `complete` takes the next entry; an exhausted script answers
/// with a provider error.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Completion>>>,
    requests: Mutex<Vec<Vec<Message>>>,
    offered_tools: Mutex<Vec<usize>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<Completion>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            offered_tools: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Message sequences received, one per call
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of tool schemas offered, one per call
    pub fn offered_tools(&self) -> Vec<usize> {
        self.offered_tools.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[FunctionSchema],
        _options: &GenerationOptions,
    ) -> Result<Completion> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.offered_tools.lock().unwrap().push(tools.len());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::Provider("script exhausted".into())))
    }
}
