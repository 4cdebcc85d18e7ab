//! Query generation: expands the research topic into at most N focused
//! web search queries via schema-constrained extraction.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use sondera_core::error::{Result, SonderaError};
use sondera_core::types::ChatMessage;

use crate::prompts;
use crate::state::RunState;

use super::StageContext;

#[derive(Debug, Deserialize)]
struct SearchQueryList {
    query: Vec<String>,
    rationale: String,
}

/// Response schema for the query-writer call.
pub fn search_query_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "array",
                "items": { "type": "string" }
            },
            "rationale": { "type": "string" }
        },
        "required": ["query", "rationale"]
    })
}

/// Produces between 1 and `initial_search_query_count` queries for the
/// topic. An empty query list from the backend is a `SchemaViolation`;
/// an oversized one is truncated with a warning.
pub async fn generate_queries(ctx: &StageContext, state: &RunState) -> Result<Vec<String>> {
    let topic = state.research_topic()?;
    let max_queries = ctx.config.initial_query_count(&state.overrides);
    // Diverse queries want a hot sample.
    let model = ctx
        .config
        .query_generator_model(&state.overrides)
        .with_temperature(1.0);

    let prompt = prompts::query_writer(&prompts::current_date(), &topic, max_queries);
    let raw = ctx
        .generator
        .generate_structured(&model, vec![ChatMessage::user(prompt)], search_query_schema())
        .await?;

    let parsed: SearchQueryList = serde_json::from_value(raw)
        .map_err(|e| SonderaError::SchemaViolation(format!("query list: {e}")))?;

    let mut queries: Vec<String> = parsed
        .query
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect();

    if queries.is_empty() {
        return Err(SonderaError::SchemaViolation(
            "query generator returned no usable queries".into(),
        ));
    }
    if queries.len() > max_queries as usize {
        warn!(
            generated = queries.len(),
            max = max_queries,
            "query generator exceeded the requested count, truncating"
        );
        queries.truncate(max_queries as usize);
    }

    debug!(count = queries.len(), rationale = %parsed.rationale, "generated search queries");
    Ok(queries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_requires_both_keys() {
        let schema = search_query_schema();
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "query"));
        assert!(required.iter().any(|v| v == "rationale"));
    }

    #[test]
    fn test_query_list_parses() {
        let parsed: SearchQueryList = serde_json::from_value(json!({
            "query": ["rust async runtime comparison 2026"],
            "rationale": "single aspect"
        }))
        .unwrap();
        assert_eq!(parsed.query.len(), 1);
    }
}
