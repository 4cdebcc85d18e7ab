//! Web-research branch: grounded search on one query, short-URL
//! resolution, and citation-marker insertion into the summary text.

use tracing::{info, warn};

use sondera_core::config::RunOverrides;
use sondera_core::error::{Result, SonderaError};

use crate::citations;
use crate::prompts;
use crate::state::StateUpdate;

use super::StageContext;

/// Runs one fan-out branch. `id` is the branch's dispatch index; it
/// scopes the short URLs so two branches citing the same page never
/// collide. Malformed grounding offsets degrade to the raw text with no
/// sources rather than failing the branch.
pub async fn web_research(
    ctx: &StageContext,
    overrides: &RunOverrides,
    query: &str,
    id: usize,
) -> Result<StateUpdate> {
    let query = query.trim();
    if query.is_empty() {
        return Err(SonderaError::EmptyInput(format!(
            "branch {id} dispatched with an empty query"
        )));
    }

    let model = ctx.config.query_generator_model(overrides);
    let prompt = prompts::web_searcher(&prompts::current_date(), query);
    let response = ctx.search.search(&model, prompt).await?;

    let uris: Vec<String> = response.chunks.iter().map(|c| c.uri.clone()).collect();
    let resolved = citations::resolve_urls(&uris, id);

    let (text, sources) = match citations::extract_citations(&response, &resolved) {
        Ok(spans) => {
            let text = citations::insert_citation_markers(&response.text, &spans);
            let mut sources = Vec::new();
            for span in &spans {
                for segment in &span.segments {
                    if !sources.iter().any(|s| s == segment) {
                        sources.push(segment.clone());
                    }
                }
            }
            (text, sources)
        }
        Err(SonderaError::GroundingResolution(reason)) => {
            warn!(branch = id, %reason, "grounding metadata unusable, keeping raw text");
            (response.text.clone(), Vec::new())
        }
        Err(e) => return Err(e),
    };

    info!(branch = id, sources = sources.len(), "web research branch complete");

    Ok(StateUpdate {
        web_research_results: vec![text],
        sources_gathered: sources,
        ..Default::default()
    })
}
