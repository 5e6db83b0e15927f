use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub mod aggregate;
pub mod dedup;
pub mod filter;
pub mod orchestrator;
pub mod preprocess;
pub mod report;
pub mod select;
pub mod sentiment;
pub(crate) mod stopwords;
pub mod topic;
pub mod visitor;

pub use orchestrator::{AnalysisOutcome, PipelineBuilder, PipelineOrchestrator, RunSummary};

/// Identity and seed of one analysis run. Every randomised step draws from
/// `seed` so a run is reproducible end to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunContext {
    pub run_id: Uuid,
    pub seed: u64,
}

impl RunContext {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            seed,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("requested a sample of {requested} reviews but only {available} survived cleaning")]
    SampleTooLarge { requested: usize, available: usize },
}
