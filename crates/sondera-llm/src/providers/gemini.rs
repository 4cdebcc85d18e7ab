use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use sondera_core::config::ModelConfig;
use sondera_core::error::{Result, SonderaError};
use sondera_core::traits::{GroundedSearch, TextGenerator};
use sondera_core::types::*;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini native API client (non-streaming `generateContent`).
pub struct GeminiClient {
    http: Client,
}

impl GeminiClient {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

// ── Request types ────────────────────────────────────────────────

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize, Debug)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize, Debug)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiTool {
    google_search: serde_json::Value,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

// ── Response types ───────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize, Debug)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(default, rename = "groundingMetadata")]
    grounding_metadata: Option<RawGroundingMetadata>,
}

#[derive(Deserialize, Debug, Default)]
struct RawGroundingMetadata {
    #[serde(default, rename = "groundingChunks")]
    grounding_chunks: Vec<RawGroundingChunk>,
    #[serde(default, rename = "groundingSupports")]
    grounding_supports: Vec<RawGroundingSupport>,
}

#[derive(Deserialize, Debug)]
struct RawGroundingChunk {
    web: Option<RawWebSource>,
}

#[derive(Deserialize, Debug)]
struct RawWebSource {
    #[serde(default)]
    uri: String,
    #[serde(default)]
    title: String,
}

#[derive(Deserialize, Debug)]
struct RawGroundingSupport {
    segment: Option<RawSegment>,
    #[serde(default, rename = "groundingChunkIndices")]
    grounding_chunk_indices: Vec<usize>,
}

#[derive(Deserialize, Debug)]
struct RawSegment {
    #[serde(default, rename = "startIndex")]
    start_index: usize,
    #[serde(default, rename = "endIndex")]
    end_index: usize,
}

// ── Conversion ───────────────────────────────────────────────────

fn convert_messages(messages: Vec<ChatMessage>) -> (Option<GeminiContent>, Vec<GeminiContent>) {
    let mut system = None;
    let mut contents = Vec::new();

    for msg in messages {
        match msg.role {
            Role::System => {
                system = Some(GeminiContent {
                    role: None,
                    parts: vec![GeminiPart { text: msg.content }],
                });
            }
            Role::User => {
                contents.push(GeminiContent {
                    role: Some("user".to_string()),
                    parts: vec![GeminiPart { text: msg.content }],
                });
            }
            Role::Assistant => {
                contents.push(GeminiContent {
                    role: Some("model".to_string()),
                    parts: vec![GeminiPart { text: msg.content }],
                });
            }
        }
    }

    (system, contents)
}

fn candidate_text(response: GeminiResponse) -> Result<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| SonderaError::Upstream("Gemini returned no candidates".into()))?;

    let text = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(SonderaError::Upstream(
            "Gemini candidate had no text content".into(),
        ));
    }
    Ok(text)
}

fn convert_grounding(meta: RawGroundingMetadata) -> (Vec<GroundingChunk>, Vec<GroundingSupport>) {
    let chunks = meta
        .grounding_chunks
        .into_iter()
        .map(|c| {
            let web = c.web.unwrap_or(RawWebSource {
                uri: String::new(),
                title: String::new(),
            });
            GroundingChunk {
                uri: web.uri,
                title: web.title,
            }
        })
        .collect();

    let supports = meta
        .grounding_supports
        .into_iter()
        .filter_map(|s| {
            let segment = s.segment?;
            Some(GroundingSupport {
                start_index: segment.start_index,
                end_index: segment.end_index,
                chunk_indices: s.grounding_chunk_indices,
            })
        })
        .collect();

    (chunks, supports)
}

impl GeminiClient {
    async fn generate_content(
        &self,
        config: &ModelConfig,
        body: &GeminiRequest,
    ) -> Result<GeminiResponse> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| SonderaError::Config("Gemini: api_key is required".into()))?;

        let base = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            base, config.model_id, api_key
        );

        let response = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| SonderaError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(SonderaError::Upstream(format!("HTTP {}: {}", status, body)));
        }

        response
            .json::<GeminiResponse>()
            .await
            .map_err(|e| SonderaError::Upstream(format!("Gemini response parse: {}", e)))
    }
}

impl TextGenerator for GeminiClient {
    fn generate(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<String>> {
        let config = config.clone();

        Box::pin(async move {
            let (system_instruction, contents) = convert_messages(messages);
            let body = GeminiRequest {
                contents,
                system_instruction,
                tools: vec![],
                generation_config: Some(GenerationConfig {
                    max_output_tokens: Some(config.max_tokens),
                    temperature: Some(config.temperature),
                    response_mime_type: None,
                    response_schema: None,
                }),
            };

            let response = self.generate_content(&config, &body).await?;
            candidate_text(response)
        })
    }

    fn generate_structured(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
        schema: serde_json::Value,
    ) -> BoxFuture<'_, Result<serde_json::Value>> {
        let config = config.clone();

        Box::pin(async move {
            let (system_instruction, contents) = convert_messages(messages);
            let body = GeminiRequest {
                contents,
                system_instruction,
                tools: vec![],
                generation_config: Some(GenerationConfig {
                    max_output_tokens: Some(config.max_tokens),
                    temperature: Some(config.temperature),
                    response_mime_type: Some("application/json".to_string()),
                    response_schema: Some(schema),
                }),
            };

            let response = self.generate_content(&config, &body).await?;
            let text = candidate_text(response)?;

            // Schema-or-fail: a constrained call that produced non-JSON
            // is a contract violation, never parsed as free text.
            serde_json::from_str(&text).map_err(|e| {
                SonderaError::SchemaViolation(format!("response was not valid JSON: {}", e))
            })
        })
    }
}

impl GroundedSearch for GeminiClient {
    fn search(
        &self,
        config: &ModelConfig,
        prompt: String,
    ) -> BoxFuture<'_, Result<GroundedResponse>> {
        let config = config.clone();

        Box::pin(async move {
            let body = GeminiRequest {
                contents: vec![GeminiContent {
                    role: Some("user".to_string()),
                    parts: vec![GeminiPart { text: prompt }],
                }],
                system_instruction: None,
                tools: vec![GeminiTool {
                    google_search: serde_json::json!({}),
                }],
                generation_config: Some(GenerationConfig {
                    max_output_tokens: Some(config.max_tokens),
                    temperature: Some(0.0),
                    response_mime_type: None,
                    response_schema: None,
                }),
            };

            let response = self.generate_content(&config, &body).await?;

            let candidate = response
                .candidates
                .into_iter()
                .next()
                .ok_or_else(|| SonderaError::Upstream("Gemini returned no candidates".into()))?;

            let text = candidate
                .content
                .map(|c| {
                    c.parts
                        .into_iter()
                        .map(|p| p.text)
                        .collect::<Vec<_>>()
                        .join("")
                })
                .unwrap_or_default();

            let (chunks, supports) = candidate
                .grounding_metadata
                .map(convert_grounding)
                .unwrap_or_default();

            debug!(
                chunks = chunks.len(),
                supports = supports.len(),
                "Grounded search response"
            );

            Ok(GroundedResponse {
                text,
                chunks,
                supports,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_messages_splits_system() {
        let messages = vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("hello"),
            ChatMessage::assistant("hi"),
        ];
        let (system, contents) = convert_messages(messages);

        assert_eq!(system.unwrap().parts[0].text, "be brief");
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0].role.as_deref(), Some("user"));
        assert_eq!(contents[1].role.as_deref(), Some("model"));
    }

    #[test]
    fn test_grounding_metadata_parsing() {
        let raw = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "Hanoi is rainy."}]},
                "groundingMetadata": {
                    "groundingChunks": [
                        {"web": {"uri": "https://example.com/weather", "title": "weather.example.com"}}
                    ],
                    "groundingSupports": [
                        {"segment": {"startIndex": 0, "endIndex": 15}, "groundingChunkIndices": [0]}
                    ]
                }
            }]
        }"#;
        let response: GeminiResponse = serde_json::from_str(raw).unwrap();
        let candidate = response.candidates.into_iter().next().unwrap();
        let (chunks, supports) = convert_grounding(candidate.grounding_metadata.unwrap());

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].uri, "https://example.com/weather");
        assert_eq!(supports[0].end_index, 15);
        assert_eq!(supports[0].chunk_indices, vec![0]);
    }

    #[test]
    fn test_candidate_text_empty_is_upstream_error() {
        let response: GeminiResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(matches!(
            candidate_text(response),
            Err(SonderaError::Upstream(_))
        ));
    }
}
