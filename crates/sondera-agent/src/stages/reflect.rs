//! Reflection: judges whether the gathered summaries answer the topic,
//! and the pure loop-evaluation decision that follows it.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use sondera_core::error::{Result, SonderaError};
use sondera_core::types::ChatMessage;

use crate::prompts;
use crate::state::{RunState, StateUpdate};

use super::StageContext;

#[derive(Debug, Deserialize)]
struct Reflection {
    is_sufficient: bool,
    #[serde(default)]
    knowledge_gap: String,
    #[serde(default)]
    follow_up_queries: Vec<String>,
}

/// Response schema for the reflection call.
pub fn reflection_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "is_sufficient": { "type": "boolean" },
            "knowledge_gap": { "type": "string" },
            "follow_up_queries": {
                "type": "array",
                "items": { "type": "string" }
            }
        },
        "required": ["is_sufficient", "knowledge_gap", "follow_up_queries"]
    })
}

/// Runs the reflection call. The sole place the loop count advances;
/// also snapshots `number_of_ran_queries` so a follow-up branch gets
/// the next free dispatch id.
pub async fn reflect(ctx: &StageContext, state: &RunState) -> Result<StateUpdate> {
    let topic = state.research_topic()?;
    // Gap analysis samples hot, like query generation.
    let model = ctx
        .config
        .reflection_model(&state.overrides)
        .with_temperature(1.0);

    let prompt = prompts::reflection(&prompts::current_date(), &topic, &state.joined_summaries());
    let raw = ctx
        .generator
        .generate_structured(&model, vec![ChatMessage::user(prompt)], reflection_schema())
        .await?;

    let reflection: Reflection = serde_json::from_value(raw)
        .map_err(|e| SonderaError::SchemaViolation(format!("reflection: {e}")))?;

    debug!(
        is_sufficient = reflection.is_sufficient,
        follow_ups = reflection.follow_up_queries.len(),
        "reflection complete"
    );

    Ok(StateUpdate {
        is_sufficient: Some(reflection.is_sufficient),
        knowledge_gap: Some(reflection.knowledge_gap),
        follow_up_queries: Some(reflection.follow_up_queries),
        research_loop_count: Some(state.research_loop_count + 1),
        number_of_ran_queries: Some(state.search_queries.len()),
        ..Default::default()
    })
}

/// Outcome of loop evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopDecision {
    /// Move on to planning with whatever was gathered.
    Advance,
    /// Run exactly one more research branch, then reflect again.
    FollowUp { query: String, id: usize },
}

/// Pure routing decision after a reflection. At most one follow-up per
/// iteration; the loop always terminates once `research_loop_count`
/// reaches `max_loops`, whatever the sufficiency verdict.
pub fn evaluate_research(state: &RunState, max_loops: u32) -> LoopDecision {
    if state.is_sufficient || state.research_loop_count >= max_loops {
        info!(
            loops = state.research_loop_count,
            sufficient = state.is_sufficient,
            "research loop done"
        );
        return LoopDecision::Advance;
    }

    match state.follow_up_queries.first() {
        Some(query) if !query.trim().is_empty() => LoopDecision::FollowUp {
            query: query.clone(),
            id: state.number_of_ran_queries,
        },
        _ => LoopDecision::Advance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_after_reflection(
        is_sufficient: bool,
        loop_count: u32,
        follow_ups: Vec<&str>,
        ran_queries: usize,
    ) -> RunState {
        RunState {
            is_sufficient,
            research_loop_count: loop_count,
            follow_up_queries: follow_ups.into_iter().map(String::from).collect(),
            number_of_ran_queries: ran_queries,
            ..Default::default()
        }
    }

    #[test]
    fn test_sufficient_advances() {
        let state = state_after_reflection(true, 1, vec!["q"], 3);
        assert_eq!(evaluate_research(&state, 3), LoopDecision::Advance);
    }

    #[test]
    fn test_budget_exhausted_advances_even_if_insufficient() {
        let state = state_after_reflection(false, 2, vec!["q"], 4);
        assert_eq!(evaluate_research(&state, 2), LoopDecision::Advance);
    }

    #[test]
    fn test_first_follow_up_only_with_next_dispatch_id() {
        let state = state_after_reflection(false, 1, vec!["q1", "q2"], 3);
        assert_eq!(
            evaluate_research(&state, 3),
            LoopDecision::FollowUp {
                query: "q1".into(),
                id: 3
            }
        );
    }

    #[test]
    fn test_no_follow_ups_advances() {
        let state = state_after_reflection(false, 1, vec![], 3);
        assert_eq!(evaluate_research(&state, 3), LoopDecision::Advance);

        let blank = state_after_reflection(false, 1, vec!["   "], 3);
        assert_eq!(evaluate_research(&blank, 3), LoopDecision::Advance);
    }

    #[test]
    fn test_reflection_parses_with_defaults() {
        let parsed: Reflection = serde_json::from_value(json!({
            "is_sufficient": true
        }))
        .unwrap();
        assert!(parsed.is_sufficient);
        assert!(parsed.follow_up_queries.is_empty());
        assert!(parsed.knowledge_gap.is_empty());
    }
}
