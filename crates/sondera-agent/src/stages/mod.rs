//! Stage implementations. Each stage receives the shared [`StageContext`]
//! and the current run state, performs its external calls, and returns a
//! partial [`crate::state::StateUpdate`] for the executor to merge.

use std::sync::Arc;

use sondera_core::config::AppConfig;
use sondera_core::policy::PolicyStore;
use sondera_core::traits::{GroundedSearch, TextGenerator};

pub mod answer;
pub mod generate;
pub mod plan;
pub mod reflect;
pub mod research;

/// Shared collaborators every stage can reach.
#[derive(Clone)]
pub struct StageContext {
    pub generator: Arc<dyn TextGenerator>,
    pub search: Arc<dyn GroundedSearch>,
    pub policy: Arc<PolicyStore>,
    pub config: AppConfig,
}

impl StageContext {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        search: Arc<dyn GroundedSearch>,
        policy: Arc<PolicyStore>,
        config: AppConfig,
    ) -> Self {
        Self {
            generator,
            search,
            policy,
            config,
        }
    }
}
