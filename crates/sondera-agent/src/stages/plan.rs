//! Planner, actor, and self-check: the structured-work tail of the
//! research path.

use serde_json::json;
use tracing::{debug, info};

use sondera_core::error::{Result, SonderaError};
use sondera_core::types::{Artifact, ChatMessage, Plan, TaskKind};

use crate::prompts;
use crate::state::{RunState, StateUpdate};

use super::StageContext;

/// Response schema for the planner call. `kind` is a closed enum; the
/// backend must pick one of the three values or the parse fails.
pub fn plan_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "objective": { "type": "string" },
            "kind": { "type": "string", "enum": ["code", "analysis", "answer"] },
            "steps": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": { "description": { "type": "string" } },
                    "required": ["description"]
                }
            },
            "acceptance_criteria": {
                "type": "array",
                "items": { "type": "string" }
            }
        },
        "required": ["objective", "kind", "steps", "acceptance_criteria"]
    })
}

/// Builds a plan from the topic and the gathered summaries, under the
/// policy preamble. Sets `plan` and `task_kind`.
pub async fn planner(ctx: &StageContext, state: &RunState) -> Result<StateUpdate> {
    let topic = state.research_topic()?;
    let model = ctx
        .config
        .answer_model(&state.overrides)
        .with_temperature(0.3);

    let messages = vec![
        ChatMessage::system(ctx.policy.get_preamble()),
        ChatMessage::user(prompts::planner(&topic, &state.joined_summaries())),
    ];
    let raw = ctx
        .generator
        .generate_structured(&model, messages, plan_schema())
        .await?;

    let plan: Plan = serde_json::from_value(raw)
        .map_err(|e| SonderaError::SchemaViolation(format!("plan: {e}")))?;

    info!(kind = %plan.kind, steps = plan.steps.len(), "plan ready");

    Ok(StateUpdate {
        task_kind: Some(plan.kind),
        plan: Some(plan),
        ..Default::default()
    })
}

/// Executes the plan with the prompt strategy keyed by `task_kind`,
/// producing exactly one markdown artifact. A missing plan or kind is
/// an executor sequencing bug, reported as a config error.
pub async fn actor(ctx: &StageContext, state: &RunState) -> Result<StateUpdate> {
    let plan = state
        .plan
        .as_ref()
        .ok_or_else(|| SonderaError::Config("actor invoked without a plan".into()))?;
    let kind = state
        .task_kind
        .ok_or_else(|| SonderaError::Config("actor invoked without a task kind".into()))?;

    let model = ctx
        .config
        .answer_model(&state.overrides)
        .with_temperature(0.2);

    let messages = vec![
        ChatMessage::system(ctx.policy.get_preamble()),
        ChatMessage::user(prompts::actor(kind, plan)),
    ];
    let content = ctx.generator.generate(&model, messages).await?;

    let title = match kind {
        TaskKind::Code => "Code Snippet",
        TaskKind::Analysis => "Analysis",
        TaskKind::Answer => "Draft Answer",
    };

    debug!(kind = %kind, bytes = content.len(), "artifact produced");

    Ok(StateUpdate {
        artifacts: vec![Artifact::markdown(title, content)],
        ..Default::default()
    })
}

/// Advisory review of the artifact. Stores feedback only; the artifact
/// itself is never touched.
pub async fn self_check(ctx: &StageContext, state: &RunState) -> Result<StateUpdate> {
    let artifact = state
        .artifacts
        .last()
        .ok_or_else(|| SonderaError::Config("self-check invoked without an artifact".into()))?;

    let model = ctx.config.answer_model(&state.overrides);
    let feedback = ctx
        .generator
        .generate(
            &model,
            vec![ChatMessage::user(prompts::self_check(&artifact.content))],
        )
        .await?;

    Ok(StateUpdate {
        self_check_feedback: Some(feedback),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_schema_closes_kind() {
        let schema = plan_schema();
        let kinds = schema["properties"]["kind"]["enum"].as_array().unwrap();
        assert_eq!(kinds.len(), 3);
        assert!(kinds.iter().any(|v| v == "code"));
    }

    #[test]
    fn test_unknown_kind_fails_parse() {
        let raw = json!({
            "objective": "x",
            "kind": "poetry",
            "steps": [],
            "acceptance_criteria": []
        });
        assert!(serde_json::from_value::<Plan>(raw).is_err());
    }
}
