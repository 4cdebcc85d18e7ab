//! Short-URL generation, citation-marker insertion and the finalize-time
//! substitution that swaps short tokens back for real URLs.
//!
//! Grounding offsets are byte positions into the original response text.
//! Markers are inserted in a single pass from the highest offset down so
//! earlier offsets stay valid while we splice.

use std::collections::{HashMap, HashSet};

use sondera_core::error::{Result, SonderaError};
use sondera_core::types::{GroundedResponse, Source};

/// Deterministic short URL for a (dispatch branch, source index) pair.
/// Stable within a run, unique across branches even for the same URI.
/// The trailing slash terminates the token, so no token is a prefix of
/// another and substitution cannot corrupt a longer one.
pub fn short_url(branch_id: usize, source_index: usize) -> String {
    format!("https://search.ref/id/{branch_id}-{source_index}/")
}

/// Maps each distinct source URI to a short URL. First occurrence wins;
/// the source index follows first-seen order within the branch.
pub fn resolve_urls(chunks_uris: &[String], branch_id: usize) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let mut next_index = 0;
    for uri in chunks_uris {
        if !map.contains_key(uri) {
            map.insert(uri.clone(), short_url(branch_id, next_index));
            next_index += 1;
        }
    }
    map
}

/// One grounded span of the response text and the sources that support it.
#[derive(Debug, Clone)]
pub struct CitationSpan {
    pub start_index: usize,
    pub end_index: usize,
    pub segments: Vec<Source>,
}

fn clean_label(title: &str) -> String {
    match title.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.contains(' ') => stem.to_string(),
        _ => title.to_string(),
    }
}

/// Builds citation spans from grounding metadata, validating every offset
/// against the original text. Any malformed offset or chunk index fails
/// the whole extraction with `GroundingResolution`; callers degrade to the
/// unmodified text rather than propagating.
pub fn extract_citations(
    response: &GroundedResponse,
    resolved: &HashMap<String, String>,
) -> Result<Vec<CitationSpan>> {
    let text = response.text.as_str();
    let mut spans = Vec::with_capacity(response.supports.len());

    for support in &response.supports {
        let (start, end) = (support.start_index, support.end_index);
        if start > end || end > text.len() {
            return Err(SonderaError::GroundingResolution(format!(
                "segment [{start}, {end}) out of range for text of {} bytes",
                text.len()
            )));
        }
        if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            return Err(SonderaError::GroundingResolution(format!(
                "segment [{start}, {end}) splits a character"
            )));
        }

        let mut segments = Vec::new();
        for &chunk_index in &support.chunk_indices {
            let chunk = response.chunks.get(chunk_index).ok_or_else(|| {
                SonderaError::GroundingResolution(format!(
                    "chunk index {chunk_index} out of range ({} chunks)",
                    response.chunks.len()
                ))
            })?;
            let short = resolved.get(&chunk.uri).ok_or_else(|| {
                SonderaError::GroundingResolution(format!("unresolved source uri {}", chunk.uri))
            })?;
            segments.push(Source {
                label: clean_label(&chunk.title),
                short_url: short.clone(),
                value: chunk.uri.clone(),
            });
        }

        spans.push(CitationSpan {
            start_index: start,
            end_index: end,
            segments,
        });
    }

    Ok(spans)
}

/// Inserts ` [label](short_url)` markers after each cited span. Offsets are
/// in original-text coordinates, so insertion runs highest offset first.
pub fn insert_citation_markers(text: &str, spans: &[CitationSpan]) -> String {
    let mut ordered: Vec<&CitationSpan> = spans.iter().collect();
    ordered.sort_by(|a, b| {
        b.end_index
            .cmp(&a.end_index)
            .then(b.start_index.cmp(&a.start_index))
    });

    let mut out = text.to_string();
    for span in ordered {
        let marker: String = span
            .segments
            .iter()
            .map(|s| format!(" [{}]({})", s.label, s.short_url))
            .collect();
        out.insert_str(span.end_index, &marker);
    }
    out
}

/// Finalize-time substitution: every short token found in `text` is replaced
/// by the source's real URL, and that source is kept (first occurrence per
/// short_url wins). Sources whose token never appears are dropped. Running
/// this on already-substituted text is a no-op since short tokens are gone.
pub fn substitute_short_urls(text: &str, sources: &[Source]) -> (String, Vec<Source>) {
    let mut out = text.to_string();
    let mut seen = HashSet::new();
    let mut kept = Vec::new();

    for source in sources {
        if !seen.contains(source.short_url.as_str()) && out.contains(&source.short_url) {
            out = out.replace(&source.short_url, &source.value);
            seen.insert(source.short_url.clone());
            kept.push(source.clone());
        }
    }

    (out, kept)
}
