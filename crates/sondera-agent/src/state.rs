use sondera_core::config::RunOverrides;
use sondera_core::error::{Result, SonderaError};
use sondera_core::types::{Artifact, ChatMessage, Plan, Role, Source, TaskKind};

/// How a field of [`RunState`] absorbs a partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Sequence fields: the update's entries are appended.
    Append,
    /// Scalar fields: a present value overwrites the current one.
    Replace,
    /// Caller-supplied fields: set at construction, never merged.
    SetOnce,
}

/// The merge rule for every RunState field. `apply` implements exactly
/// this table; fields absent from an update are left untouched.
pub const MERGE_POLICIES: &[(&str, MergePolicy)] = &[
    ("messages", MergePolicy::Append),
    ("search_queries", MergePolicy::Append),
    ("web_research_results", MergePolicy::Append),
    ("sources_gathered", MergePolicy::Append),
    ("research_loop_count", MergePolicy::Replace),
    ("number_of_ran_queries", MergePolicy::Replace),
    ("is_sufficient", MergePolicy::Replace),
    ("knowledge_gap", MergePolicy::Replace),
    ("follow_up_queries", MergePolicy::Replace),
    ("plan", MergePolicy::Replace),
    ("task_kind", MergePolicy::Replace),
    ("artifacts", MergePolicy::Append),
    ("self_check_feedback", MergePolicy::Replace),
    ("overrides", MergePolicy::SetOnce),
];

/// Accumulated state for one run. Created empty (apart from the caller's
/// messages and overrides), threaded through every stage, and discarded
/// when the terminal stage is reached.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub messages: Vec<ChatMessage>,
    pub search_queries: Vec<String>,
    pub web_research_results: Vec<String>,
    pub sources_gathered: Vec<Source>,
    pub research_loop_count: u32,
    pub number_of_ran_queries: usize,
    pub is_sufficient: bool,
    pub knowledge_gap: String,
    pub follow_up_queries: Vec<String>,
    pub plan: Option<Plan>,
    pub task_kind: Option<TaskKind>,
    pub artifacts: Vec<Artifact>,
    pub self_check_feedback: Option<String>,
    pub overrides: RunOverrides,
}

/// A partial update returned by a stage. Only the fields a stage
/// changed are populated; everything else stays at its default and is
/// ignored by [`RunState::apply`].
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub messages: Vec<ChatMessage>,
    pub search_queries: Vec<String>,
    pub web_research_results: Vec<String>,
    pub sources_gathered: Vec<Source>,
    pub research_loop_count: Option<u32>,
    pub number_of_ran_queries: Option<usize>,
    pub is_sufficient: Option<bool>,
    pub knowledge_gap: Option<String>,
    pub follow_up_queries: Option<Vec<String>>,
    pub plan: Option<Plan>,
    pub task_kind: Option<TaskKind>,
    pub artifacts: Vec<Artifact>,
    pub self_check_feedback: Option<String>,
    /// Finalize-only: the deduplicated source list replaces the
    /// accumulated one, so the final state carries exactly the sources
    /// referenced by the answer.
    pub replace_sources: Option<Vec<Source>>,
}

impl RunState {
    pub fn new(messages: Vec<ChatMessage>, overrides: RunOverrides) -> Self {
        Self {
            messages,
            overrides,
            ..Default::default()
        }
    }

    /// The research topic: the latest user message, or for multi-turn
    /// conversations the full role-tagged transcript.
    pub fn research_topic(&self) -> Result<String> {
        let latest_user = self
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.trim())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| SonderaError::EmptyInput("no user message with content".into()))?;

        if self.messages.len() == 1 {
            return Ok(latest_user.to_string());
        }

        let transcript = self
            .messages
            .iter()
            .map(|m| {
                let tag = match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                format!("{}: {}", tag, m.content)
            })
            .collect::<Vec<_>>()
            .join("\n");
        Ok(transcript)
    }

    /// All research summaries joined for prompt building.
    pub fn joined_summaries(&self) -> String {
        self.web_research_results.join("\n\n---\n\n")
    }

    /// Merge a partial update per [`MERGE_POLICIES`]. Callers apply
    /// fan-out branch updates sequentially in dispatch order; no two
    /// stages ever write concurrently.
    pub fn apply(&mut self, update: StateUpdate) {
        self.messages.extend(update.messages);
        self.search_queries.extend(update.search_queries);
        self.web_research_results.extend(update.web_research_results);
        self.sources_gathered.extend(update.sources_gathered);

        if let Some(count) = update.research_loop_count {
            // The loop count only ever moves forward.
            debug_assert!(count >= self.research_loop_count);
            self.research_loop_count = count;
        }
        if let Some(n) = update.number_of_ran_queries {
            self.number_of_ran_queries = n;
        }
        if let Some(sufficient) = update.is_sufficient {
            self.is_sufficient = sufficient;
        }
        if let Some(gap) = update.knowledge_gap {
            self.knowledge_gap = gap;
        }
        if let Some(queries) = update.follow_up_queries {
            self.follow_up_queries = queries;
        }
        if let Some(plan) = update.plan {
            self.plan = Some(plan);
        }
        if let Some(kind) = update.task_kind {
            self.task_kind = Some(kind);
        }
        self.artifacts.extend(update.artifacts);
        if let Some(feedback) = update.self_check_feedback {
            self.self_check_feedback = Some(feedback);
        }
        if let Some(sources) = update.replace_sources {
            self.sources_gathered = sources;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(n: usize) -> Source {
        Source {
            label: format!("site{n}"),
            short_url: format!("https://search.ref/id/0-{n}/"),
            value: format!("https://example.com/{n}"),
        }
    }

    #[test]
    fn test_policy_table_is_unique_and_complete() {
        let mut names: Vec<&str> = MERGE_POLICIES.iter().map(|(n, _)| *n).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), MERGE_POLICIES.len(), "duplicate field in table");
        // One entry per RunState field
        assert_eq!(MERGE_POLICIES.len(), 14);
    }

    #[test]
    fn test_append_fields_accumulate() {
        let mut state = RunState::default();
        state.apply(StateUpdate {
            web_research_results: vec!["first".into()],
            sources_gathered: vec![source(0)],
            ..Default::default()
        });
        state.apply(StateUpdate {
            web_research_results: vec!["second".into()],
            sources_gathered: vec![source(1)],
            ..Default::default()
        });

        assert_eq!(state.web_research_results, vec!["first", "second"]);
        assert_eq!(state.sources_gathered.len(), 2);
    }

    #[test]
    fn test_replace_fields_overwrite() {
        let mut state = RunState::default();
        state.apply(StateUpdate {
            follow_up_queries: Some(vec!["q1".into(), "q2".into()]),
            knowledge_gap: Some("gap A".into()),
            ..Default::default()
        });
        state.apply(StateUpdate {
            follow_up_queries: Some(vec!["q3".into()]),
            knowledge_gap: Some("gap B".into()),
            ..Default::default()
        });

        assert_eq!(state.follow_up_queries, vec!["q3"]);
        assert_eq!(state.knowledge_gap, "gap B");
    }

    #[test]
    fn test_absent_fields_untouched() {
        let mut state = RunState::default();
        state.apply(StateUpdate {
            is_sufficient: Some(true),
            knowledge_gap: Some("none".into()),
            ..Default::default()
        });
        state.apply(StateUpdate {
            web_research_results: vec!["unrelated".into()],
            ..Default::default()
        });

        assert!(state.is_sufficient);
        assert_eq!(state.knowledge_gap, "none");
    }

    #[test]
    fn test_loop_count_monotonic() {
        let mut state = RunState::default();
        for expected in 1..=3u32 {
            state.apply(StateUpdate {
                research_loop_count: Some(state.research_loop_count + 1),
                ..Default::default()
            });
            assert_eq!(state.research_loop_count, expected);
        }
    }

    #[test]
    fn test_replace_sources_dedups_final_state() {
        let mut state = RunState::default();
        state.apply(StateUpdate {
            sources_gathered: vec![source(0), source(0), source(1)],
            ..Default::default()
        });
        state.apply(StateUpdate {
            replace_sources: Some(vec![source(0)]),
            ..Default::default()
        });

        assert_eq!(state.sources_gathered, vec![source(0)]);
    }

    #[test]
    fn test_topic_from_single_message() {
        let state = RunState::new(
            vec![ChatMessage::user("current weather in Hanoi")],
            RunOverrides::default(),
        );
        assert_eq!(state.research_topic().unwrap(), "current weather in Hanoi");
    }

    #[test]
    fn test_topic_from_conversation() {
        let state = RunState::new(
            vec![
                ChatMessage::user("tell me about Rust"),
                ChatMessage::assistant("Rust is a systems language."),
                ChatMessage::user("what about async?"),
            ],
            RunOverrides::default(),
        );
        let topic = state.research_topic().unwrap();
        assert!(topic.contains("user: tell me about Rust"));
        assert!(topic.contains("assistant: Rust is a systems language."));
    }

    #[test]
    fn test_empty_topic_fails_fast() {
        let state = RunState::new(vec![], RunOverrides::default());
        assert!(matches!(
            state.research_topic(),
            Err(SonderaError::EmptyInput(_))
        ));

        let blank = RunState::new(vec![ChatMessage::user("   ")], RunOverrides::default());
        assert!(matches!(
            blank.research_topic(),
            Err(SonderaError::EmptyInput(_))
        ));
    }
}
