//! Scripted stub backends for exercising the stage graph without a
//! network. Responses are queued ahead of time and consumed in call
//! order; running out of script is a test bug and panics loudly.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use futures::future::BoxFuture;

use sondera_core::config::ModelConfig;
use sondera_core::error::{Result, SonderaError};
use sondera_core::traits::{GroundedSearch, TextGenerator};
use sondera_core::types::{ChatMessage, GroundedResponse, GroundingChunk, GroundingSupport};

/// One scripted reply from a [`StubGenerator`].
pub enum ScriptedReply {
    Text(String),
    Structured(serde_json::Value),
    Fail(SonderaError),
}

/// Text-generation stub. Replies are dequeued in call order regardless
/// of whether the call was free-text or structured; `calls` counts every
/// invocation.
#[derive(Default)]
pub struct StubGenerator {
    script: Mutex<VecDeque<ScriptedReply>>,
    prompts: Mutex<Vec<String>>,
    temperatures: Mutex<Vec<f32>>,
    pub calls: AtomicUsize,
}

impl StubGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Text(text.into()));
    }

    pub fn push_structured(&self, value: serde_json::Value) {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Structured(value));
    }

    pub fn push_failure(&self, err: SonderaError) {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Fail(err));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The prompt text of every call so far, in call order. Multi-message
    /// requests are joined with newlines.
    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// The sampling temperature of every call so far, in call order.
    pub fn recorded_temperatures(&self) -> Vec<f32> {
        self.temperatures.lock().unwrap().clone()
    }

    fn next_reply(&self, config: &ModelConfig, messages: &[ChatMessage]) -> ScriptedReply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.temperatures.lock().unwrap().push(config.temperature);
        self.prompts.lock().unwrap().push(
            messages
                .iter()
                .map(|m| m.content.clone())
                .collect::<Vec<_>>()
                .join("\n"),
        );
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("stub generator script exhausted")
    }
}

impl TextGenerator for StubGenerator {
    fn generate(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<String>> {
        let config = config.clone();
        Box::pin(async move {
            match self.next_reply(&config, &messages) {
                ScriptedReply::Text(text) => Ok(text),
                ScriptedReply::Structured(value) => Ok(value.to_string()),
                ScriptedReply::Fail(err) => Err(err),
            }
        })
    }

    fn generate_structured(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
        _schema: serde_json::Value,
    ) -> BoxFuture<'_, Result<serde_json::Value>> {
        let config = config.clone();
        Box::pin(async move {
            match self.next_reply(&config, &messages) {
                ScriptedReply::Structured(value) => Ok(value),
                ScriptedReply::Text(text) => Err(SonderaError::SchemaViolation(format!(
                    "stub scripted free text for a structured call: {text}"
                ))),
                ScriptedReply::Fail(err) => Err(err),
            }
        })
    }
}

/// Grounded-search stub. Each queued item is either a full response or
/// a failure, consumed in call order.
#[derive(Default)]
pub struct StubSearch {
    script: Mutex<VecDeque<Result<GroundedResponse>>>,
    prompts: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
}

impl StubSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: GroundedResponse) {
        self.script.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_failure(&self, err: SonderaError) {
        self.script.lock().unwrap().push_back(Err(err));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every search prompt so far, in call order.
    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl GroundedSearch for StubSearch {
    fn search(
        &self,
        _config: &ModelConfig,
        prompt: String,
    ) -> BoxFuture<'_, Result<GroundedResponse>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("stub search script exhausted")
        })
    }
}

/// A grounded response citing a single source over the whole text.
pub fn grounded(text: &str, uri: &str, title: &str) -> GroundedResponse {
    GroundedResponse {
        text: text.to_string(),
        chunks: vec![GroundingChunk {
            uri: uri.to_string(),
            title: title.to_string(),
        }],
        supports: vec![GroundingSupport {
            start_index: 0,
            end_index: text.len(),
            chunk_indices: vec![0],
        }],
    }
}

/// A grounded response with no citations at all.
pub fn ungrounded(text: &str) -> GroundedResponse {
    GroundedResponse {
        text: text.to_string(),
        chunks: vec![],
        supports: vec![],
    }
}
