//! Analytics orchestration
//!
//! Projections, the stage machine and the stage operations: node similarity,
//! PageRank, Louvain and link prediction, run in that order over a built graph.

pub mod orchestrator;
pub mod scope;
pub mod stage;

pub use orchestrator::{
    build_projection, AnalyticsOrchestrator, CentralityParams, CentralityReport, CommunityParams, CommunityReport,
    LinkPredictionParams, LinkPredictionReport, PairSpace, RelationshipSplit, SimilarityParams, SimilarityReport,
    SplitReport,
};
pub use scope::ProjectionScope;
pub use stage::Stage;

use crate::engine::EngineError;
use crate::ingest::IngestError;
use thiserror::Error;

/// Errors raised by stage operations
#[derive(Error, Debug)]
pub enum StageError {
    /// Stage out of order; raised before any engine call
    #[error("Cannot {operation} while {current}; {required} is required")]
    PreconditionViolation {
        operation: &'static str,
        current: Stage,
        required: Stage,
    },

    #[error("Graph is empty; run graph construction first")]
    EmptyGraph,

    #[error("No relationships to learn from")]
    NoRelationships,

    #[error("Unexpected engine result: {0}")]
    UnexpectedResult(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type StageResult<T> = Result<T, StageError>;
