use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A chat message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
            timestamp: Some(Utc::now()),
        }
    }
}

/// A gathered web source. `short_url` is the branch-scoped token
/// inserted into research text; `value` is the real URL it stands for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub label: String,
    pub short_url: String,
    pub value: String,
}

/// Kind of task the planner decided on. Closed enumeration: an
/// unrecognized kind fails deserialization rather than defaulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Code,
    Analysis,
    Answer,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Analysis => "analysis",
            Self::Answer => "answer",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One concrete step in a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub description: String,
}

/// Structured plan produced after research.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub objective: String,
    pub kind: TaskKind,
    pub steps: Vec<PlanStep>,
    pub acceptance_criteria: Vec<String>,
}

/// An artifact produced by the actor stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub title: String,
    pub mime: String,
    pub content: String,
}

impl Artifact {
    /// Create a markdown artifact with a fresh id.
    pub fn markdown(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            mime: "text/markdown".to_string(),
            content: content.into(),
        }
    }
}

/// A source document referenced by grounded generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundingChunk {
    pub uri: String,
    pub title: String,
}

/// A span of generated text supported by one or more chunks.
/// Offsets are byte positions into the original response text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundingSupport {
    pub start_index: usize,
    pub end_index: usize,
    pub chunk_indices: Vec<usize>,
}

/// Text plus grounding metadata from a search-augmented generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundedResponse {
    pub text: String,
    pub chunks: Vec<GroundingChunk>,
    pub supports: Vec<GroundingSupport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let msg = ChatMessage::user("hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "hello");
        assert!(msg.timestamp.is_some());

        let msg = ChatMessage::assistant("hi");
        assert_eq!(msg.role, Role::Assistant);
    }

    #[test]
    fn test_task_kind_closed_enum() {
        let kind: TaskKind = serde_json::from_str("\"code\"").unwrap();
        assert_eq!(kind, TaskKind::Code);
        assert_eq!(kind.as_str(), "code");

        // Unknown kinds must fail, never default
        assert!(serde_json::from_str::<TaskKind>("\"poetry\"").is_err());
    }

    #[test]
    fn test_markdown_artifact() {
        let a = Artifact::markdown("Draft", "# body");
        assert_eq!(a.mime, "text/markdown");
        assert!(!a.id.is_empty());
    }

    #[test]
    fn test_plan_roundtrip() {
        let json = r#"{
            "objective": "summarize findings",
            "kind": "analysis",
            "steps": [{"description": "read summaries"}],
            "acceptance_criteria": ["covers all sources"]
        }"#;
        let plan: Plan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.kind, TaskKind::Analysis);
        assert_eq!(plan.steps.len(), 1);
    }
}
