//! Prompt builders for every stage. Each takes the current date where
//! freshness matters, so the backend favors up-to-date sources.

use sondera_core::types::{Plan, TaskKind};

/// Current date in a readable format, e.g. "August 29, 2026".
pub fn current_date() -> String {
    chrono::Local::now().format("%B %d, %Y").to_string()
}

pub fn query_writer(date: &str, topic: &str, number_queries: u32) -> String {
    format!(
        "Generate focused, diverse web search queries for an automated research tool.\n\n\
         Rules:\n\
         - Prefer a single query; add more only when the question has multiple distinct aspects.\n\
         - Each query targets one specific aspect of the question.\n\
         - Never produce more than {number_queries} queries, and never near-duplicates.\n\
         - Queries should surface the most current information. Today is {date}.\n\n\
         Respond as a JSON object with exactly these keys:\n\
         - \"rationale\": brief explanation of why these queries cover the topic\n\
         - \"query\": a list of search query strings\n\n\
         Topic: {topic}"
    )
}

pub fn web_searcher(date: &str, topic: &str) -> String {
    format!(
        "Run targeted web searches on \"{topic}\" and synthesize the findings into a \
         verifiable report.\n\n\
         Rules:\n\
         - Favor the most recent, credible sources. Today is {date}.\n\
         - Track which source supports each specific claim.\n\
         - Include concrete data points, statistics, and examples where available.\n\
         - Use ONLY information found in the search results; never invent facts.\n\n\
         Research topic:\n{topic}"
    )
}

pub fn reflection(date: &str, topic: &str, summaries: &str) -> String {
    format!(
        "You are reviewing research summaries about \"{topic}\" (today is {date}).\n\n\
         Decide whether the summaries suffice to answer the question. If not, name the \
         knowledge gap and write follow-up search queries that are self-contained \
         (include enough context to run them standalone).\n\n\
         Respond as a JSON object with exactly these keys:\n\
         - \"is_sufficient\": true or false\n\
         - \"knowledge_gap\": what is missing (empty string when sufficient)\n\
         - \"follow_up_queries\": list of queries (empty list when sufficient)\n\n\
         Summaries:\n{summaries}"
    )
}

pub fn planner(topic: &str, summaries: &str) -> String {
    format!(
        "You are a planner. From the user's request and the gathered summaries, produce \
         a JSON plan with these keys: \"objective\" (string), \"kind\" (one of \"code\", \
         \"analysis\", \"answer\"), \"steps\" (list of objects with a \"description\"), \
         and \"acceptance_criteria\" (list of strings).\n\n\
         User request: {topic}\n\n\
         Summaries:\n{summaries}"
    )
}

pub fn actor(kind: TaskKind, plan: &Plan) -> String {
    let steps = plan
        .steps
        .iter()
        .map(|s| format!("- {}", s.description))
        .collect::<Vec<_>>()
        .join("\n");

    let task = match kind {
        TaskKind::Code => {
            "Write a minimal code snippet addressing the request. Use a fenced Markdown \
             code block with a language tag, and give it a short title."
        }
        TaskKind::Analysis => {
            "Write a short analytical Markdown write-up addressing the request. Use \
             bullet points and end with a brief conclusion."
        }
        TaskKind::Answer => {
            "Draft a concise answer to the request. Keep it short and clear."
        }
    };

    format!(
        "You are the actor. Follow the plan and produce one concise artifact.\n\n\
         {task}\n\nObjective: {}\nSteps:\n{steps}",
        plan.objective
    )
}

pub fn self_check(artifact_content: &str) -> String {
    format!(
        "Review the artifact below. Respond with 2-3 bullet points of feedback and any \
         quick fixes. Do not rewrite the artifact.\n\nArtifact:\n{artifact_content}"
    )
}

pub fn answer(date: &str, topic: &str, summaries: &str) -> String {
    format!(
        "Write the best possible response to the user's request using the research \
         summaries below.\n\n\
         Rules:\n\
         - Today is {date}.\n\
         - Respond in the SAME LANGUAGE as the user's question.\n\
         - Never fabricate information; use ONLY facts found in the summaries.\n\
         - Cite sources inline as markdown links right after the sentence that uses them, \
           keeping the link URLs from the summaries exactly as written.\n\
         - Structure the response clearly with sections or bullet points.\n\n\
         User request:\n{topic}\n\n\
         Summaries:\n{summaries}"
    )
}

pub fn direct_answer(topic: &str) -> String {
    topic.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sondera_core::types::PlanStep;

    #[test]
    fn test_query_writer_includes_bounds() {
        let prompt = query_writer("May 01, 2026", "rust async", 3);
        assert!(prompt.contains("3 queries"));
        assert!(prompt.contains("May 01, 2026"));
        assert!(prompt.contains("rust async"));
    }

    #[test]
    fn test_actor_strategy_per_kind() {
        let plan = Plan {
            objective: "demo".into(),
            kind: TaskKind::Code,
            steps: vec![PlanStep {
                description: "write it".into(),
            }],
            acceptance_criteria: vec![],
        };

        assert!(actor(TaskKind::Code, &plan).contains("code block"));
        assert!(actor(TaskKind::Analysis, &plan).contains("analytical"));
        assert!(actor(TaskKind::Answer, &plan).contains("concise answer"));
    }

    #[test]
    fn test_answer_prompt_forbids_fabrication() {
        let prompt = answer("May 01, 2026", "topic", "summary");
        assert!(prompt.contains("Never fabricate"));
    }
}
