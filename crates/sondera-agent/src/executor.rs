//! Graph executor: stages as states, transitions as data, interpreted
//! in one explicit loop. Entry is `RouteMode`; terminals are `Finalize`
//! and `DirectAnswer`. The reflection cycle re-enters `WebResearch`
//! through a single-branch dispatch.

use futures::future::try_join_all;
use tracing::{debug, info};

use sondera_core::config::RunOverrides;
use sondera_core::error::{Result, SonderaError};
use sondera_core::types::{Artifact, ChatMessage, Plan, Source, TaskKind};

use crate::router::{route_mode, RoutePath};
use crate::stages::{self, StageContext};
use crate::state::{RunState, StateUpdate};

/// Named units of the orchestration graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    RouteMode,
    GenerateQueries,
    WebResearch,
    Reflection,
    Planner,
    Actor,
    SelfCheck,
    Finalize,
    DirectAnswer,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RouteMode => "route_mode",
            Self::GenerateQueries => "generate_queries",
            Self::WebResearch => "web_research",
            Self::Reflection => "reflection",
            Self::Planner => "planner",
            Self::Actor => "actor",
            Self::SelfCheck => "self_check",
            Self::Finalize => "finalize",
            Self::DirectAnswer => "direct_answer",
        }
    }
}

/// One web-research branch of a fan-out dispatch. `id` is the branch's
/// stable dispatch index, used for short-URL scoping and merge order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchDispatch {
    pub query: String,
    pub id: usize,
}

/// A stage's transition decision, interpreted by the executor loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Next(Stage),
    Dispatch(Vec<ResearchDispatch>),
    End,
}

/// What a finished run hands back to the caller. The artifact list and
/// self-check feedback are addressable independently of the messages.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub messages: Vec<ChatMessage>,
    pub sources_gathered: Vec<Source>,
    pub plan: Option<Plan>,
    pub task_kind: Option<TaskKind>,
    pub artifacts: Vec<Artifact>,
    pub self_check_feedback: Option<String>,
}

pub struct GraphExecutor {
    ctx: StageContext,
}

impl GraphExecutor {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }

    /// Runs one full pass of the graph over the caller's conversation.
    /// State lives only for the duration of this call.
    pub async fn execute(
        &self,
        messages: Vec<ChatMessage>,
        overrides: RunOverrides,
    ) -> Result<RunOutcome> {
        let mut state = RunState::new(messages, overrides);
        // Fail fast before any external call.
        let topic = state.research_topic()?;
        info!(topic = %truncate_for_log(&topic), "run started");

        let mut stage = Stage::RouteMode;
        loop {
            debug!(stage = stage.as_str(), "entering stage");
            match self.step(stage, &mut state).await? {
                Route::Next(next) => stage = next,
                Route::Dispatch(branches) => {
                    self.run_dispatch(&mut state, branches).await?;
                    stage = Stage::Reflection;
                }
                Route::End => break,
            }
        }

        Ok(RunOutcome {
            messages: state.messages,
            sources_gathered: state.sources_gathered,
            plan: state.plan,
            task_kind: state.task_kind,
            artifacts: state.artifacts,
            self_check_feedback: state.self_check_feedback,
        })
    }

    async fn step(&self, stage: Stage, state: &mut RunState) -> Result<Route> {
        match stage {
            Stage::RouteMode => {
                let topic = state.research_topic()?;
                match route_mode(&topic) {
                    RoutePath::Research => Ok(Route::Next(Stage::GenerateQueries)),
                    RoutePath::Direct => Ok(Route::Next(Stage::DirectAnswer)),
                }
            }
            Stage::GenerateQueries => {
                let queries = stages::generate::generate_queries(&self.ctx, state).await?;
                let branches = queries
                    .into_iter()
                    .enumerate()
                    .map(|(id, query)| ResearchDispatch { query, id })
                    .collect();
                Ok(Route::Dispatch(branches))
            }
            // Web research only runs inside a dispatch; reaching it as a
            // sequential stage means the transition table is broken.
            Stage::WebResearch => Err(SonderaError::Config(
                "web_research is a fan-out stage, not a sequential one".into(),
            )),
            Stage::Reflection => {
                let update = stages::reflect::reflect(&self.ctx, state).await?;
                state.apply(update);

                let max_loops = self.ctx.config.max_research_loops(&state.overrides);
                match stages::reflect::evaluate_research(state, max_loops) {
                    stages::reflect::LoopDecision::Advance => Ok(Route::Next(Stage::Planner)),
                    stages::reflect::LoopDecision::FollowUp { query, id } => {
                        Ok(Route::Dispatch(vec![ResearchDispatch { query, id }]))
                    }
                }
            }
            Stage::Planner => {
                let update = stages::plan::planner(&self.ctx, state).await?;
                state.apply(update);
                Ok(Route::Next(Stage::Actor))
            }
            Stage::Actor => {
                let update = stages::plan::actor(&self.ctx, state).await?;
                state.apply(update);
                Ok(Route::Next(Stage::SelfCheck))
            }
            Stage::SelfCheck => {
                let update = stages::plan::self_check(&self.ctx, state).await?;
                state.apply(update);
                Ok(Route::Next(Stage::Finalize))
            }
            Stage::Finalize => {
                let update = stages::answer::finalize(&self.ctx, state).await?;
                state.apply(update);
                Ok(Route::End)
            }
            Stage::DirectAnswer => {
                let update = stages::answer::direct_answer(&self.ctx, state).await?;
                state.apply(update);
                Ok(Route::End)
            }
        }
    }

    /// Fan-out: records each branch's query, runs all branches
    /// concurrently, and merges results in dispatch-index order so the
    /// sequences stay reproducible whatever the completion order. The
    /// first branch error drops the in-flight siblings and fails the
    /// dispatch as a unit.
    async fn run_dispatch(
        &self,
        state: &mut RunState,
        branches: Vec<ResearchDispatch>,
    ) -> Result<()> {
        if branches.is_empty() {
            return Err(SonderaError::Config("empty research dispatch".into()));
        }
        info!(branches = branches.len(), "dispatching web research");

        state.apply(StateUpdate {
            search_queries: branches.iter().map(|b| b.query.clone()).collect(),
            ..Default::default()
        });

        let futures = branches.iter().map(|branch| {
            stages::research::web_research(&self.ctx, &state.overrides, &branch.query, branch.id)
        });
        let updates = try_join_all(futures).await?;

        for update in updates {
            state.apply(update);
        }
        Ok(())
    }
}

fn truncate_for_log(text: &str) -> String {
    const MAX: usize = 120;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::RouteMode.as_str(), "route_mode");
        assert_eq!(Stage::Finalize.as_str(), "finalize");
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("short"), "short");
        let long = "x".repeat(200);
        assert!(truncate_for_log(&long).ends_with("..."));
        assert_eq!(truncate_for_log(&long).chars().count(), 123);
    }
}
