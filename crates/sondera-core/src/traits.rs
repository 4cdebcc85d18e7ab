use futures::future::BoxFuture;

use crate::config::ModelConfig;
use crate::error::Result;
use crate::types::{ChatMessage, GroundedResponse};

/// Text-generation backend.
///
/// `generate_structured` must return an object conforming to the given
/// response schema; a backend that cannot honor the schema fails with
/// `SchemaViolation` rather than returning free text.
pub trait TextGenerator: Send + Sync + 'static {
    /// Free-text completion over a message sequence.
    fn generate(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<String>>;

    /// Schema-constrained completion. The schema is a JSON Schema
    /// subset understood by the backend.
    fn generate_structured(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
        schema: serde_json::Value,
    ) -> BoxFuture<'_, Result<serde_json::Value>>;
}

/// Search-augmented generation backend: text plus grounding metadata.
pub trait GroundedSearch: Send + Sync + 'static {
    fn search(&self, config: &ModelConfig, prompt: String)
        -> BoxFuture<'_, Result<GroundedResponse>>;
}
