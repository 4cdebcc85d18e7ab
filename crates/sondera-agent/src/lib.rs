//! Research-and-answer orchestration: a stage graph that routes a
//! conversation to either iterative web research (query generation,
//! parallel grounded search, bounded reflection, plan/act/check,
//! cited final answer) or a direct conversational reply.

pub mod citations;
pub mod executor;
pub mod prompts;
pub mod router;
pub mod stages;
pub mod state;

pub use executor::{GraphExecutor, ResearchDispatch, Route, RunOutcome, Stage};
pub use router::{route_mode, RoutePath};
pub use stages::StageContext;
pub use state::{MergePolicy, RunState, StateUpdate, MERGE_POLICIES};
