//! Top-level pipeline error

use crate::analytics::StageError;
use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::ingest::IngestError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Stage(#[from] StageError),
}

impl PipelineError {
    /// The engine could not be reached or opened
    pub fn is_connectivity(&self) -> bool {
        matches!(self.engine_error(), Some(EngineError::Connectivity(_)))
    }

    /// The engine error underneath, whichever layer raised it
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self {
            PipelineError::Engine(e) => Some(e),
            PipelineError::Ingest(IngestError::Engine(e)) => Some(e),
            PipelineError::Stage(StageError::Engine(e)) => Some(e),
            PipelineError::Stage(StageError::Ingest(IngestError::Engine(e))) => Some(e),
            _ => None,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
