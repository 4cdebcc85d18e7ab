use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

/// Which path a run takes after the entry stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePath {
    /// Iterative web research followed by plan/act/check/finalize.
    Research,
    /// Single direct answer, no search.
    Direct,
}

/// Questions that depend on fresh or market data always need search.
const TEMPORAL_TRIGGERS: &[&str] = &[
    "today",
    "current",
    "currently",
    "right now",
    "latest",
    "this week",
    "this month",
    "this year",
    "recent",
    "breaking",
    "news",
    "weather",
    "forecast",
    "price",
    "stock",
    "exchange rate",
    "schedule",
    "holiday",
    "event",
    "happening",
];

/// Knowledge questions that benefit from sourced answers.
const KNOWLEDGE_TRIGGERS: &[&str] = &[
    "what is",
    "what are",
    "who is",
    "who was",
    "when did",
    "when was",
    "where is",
    "where was",
    "how many",
    "how much",
    "compare",
    " vs ",
    "versus",
    "definition of",
    "difference between",
    "source for",
    "website",
];

fn year_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b20\d{2}\b").expect("valid regex"))
}

fn date_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{1,2}/\d{1,2}/\d{2,4}\b").expect("valid regex"))
}

/// Decide between the research path and a direct answer.
///
/// Deterministic and side-effect-free: a fixed trigger-condition set,
/// no model call. Direct is the fallback when nothing fires.
pub fn route_mode(topic: &str) -> RoutePath {
    let q = topic.to_lowercase();
    let q = q.trim();

    if TEMPORAL_TRIGGERS.iter().any(|k| q.contains(k)) {
        debug!(topic = %q, "Router: temporal trigger fired");
        return RoutePath::Research;
    }

    if KNOWLEDGE_TRIGGERS.iter().any(|k| q.contains(k)) {
        debug!(topic = %q, "Router: knowledge trigger fired");
        return RoutePath::Research;
    }

    // An explicit year or calendar date implies time-sensitive intent.
    if year_pattern().is_match(q) || date_pattern().is_match(q) {
        debug!(topic = %q, "Router: date trigger fired");
        return RoutePath::Research;
    }

    RoutePath::Direct
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_goes_direct() {
        assert_eq!(route_mode("hello, how are you"), RoutePath::Direct);
        assert_eq!(route_mode("tell me a joke"), RoutePath::Direct);
        assert_eq!(route_mode("thanks!"), RoutePath::Direct);
    }

    #[test]
    fn test_temporal_topics_research() {
        assert_eq!(route_mode("current weather in Hanoi"), RoutePath::Research);
        assert_eq!(route_mode("latest Rust release notes"), RoutePath::Research);
        assert_eq!(route_mode("AAPL stock performance"), RoutePath::Research);
    }

    #[test]
    fn test_knowledge_questions_research() {
        assert_eq!(route_mode("What is WebAssembly?"), RoutePath::Research);
        assert_eq!(
            route_mode("difference between TCP and UDP"),
            RoutePath::Research
        );
    }

    #[test]
    fn test_year_and_date_triggers() {
        assert_eq!(route_mode("Olympics host city 2028"), RoutePath::Research);
        assert_eq!(route_mode("what happened on 4/7/1776"), RoutePath::Research);
    }

    #[test]
    fn test_router_is_case_insensitive() {
        assert_eq!(route_mode("LATEST election results"), RoutePath::Research);
    }
}
