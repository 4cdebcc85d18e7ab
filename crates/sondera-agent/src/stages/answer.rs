//! Terminal stages: research-path finalize and the direct-answer path.

use tracing::info;

use sondera_core::error::Result;
use sondera_core::types::ChatMessage;

use crate::citations;
use crate::prompts;
use crate::state::{RunState, StateUpdate};

use super::StageContext;

/// Synthesizes the final answer over all summaries, swaps each referenced
/// short token for its real URL, and keeps only the referenced sources.
pub async fn finalize(ctx: &StageContext, state: &RunState) -> Result<StateUpdate> {
    let topic = state.research_topic()?;
    let model = ctx.config.answer_model(&state.overrides);

    let prompt = prompts::answer(&prompts::current_date(), &topic, &state.joined_summaries());
    let draft = ctx
        .generator
        .generate(&model, vec![ChatMessage::user(prompt)])
        .await?;

    let (text, sources) = citations::substitute_short_urls(&draft, &state.sources_gathered);

    info!(
        gathered = state.sources_gathered.len(),
        referenced = sources.len(),
        "final answer ready"
    );

    Ok(StateUpdate {
        messages: vec![ChatMessage::assistant(text)],
        replace_sources: Some(sources),
        ..Default::default()
    })
}

/// Direct path: answers conversationally under the policy preamble,
/// with no research and no sources.
pub async fn direct_answer(ctx: &StageContext, state: &RunState) -> Result<StateUpdate> {
    let topic = state.research_topic()?;
    let model = ctx.config.answer_model(&state.overrides);

    let messages = vec![
        ChatMessage::system(ctx.policy.get_preamble()),
        ChatMessage::user(prompts::direct_answer(&topic)),
    ];
    let reply = ctx.generator.generate(&model, messages).await?;

    Ok(StateUpdate {
        messages: vec![ChatMessage::assistant(reply)],
        ..Default::default()
    })
}
