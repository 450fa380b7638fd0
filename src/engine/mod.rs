//! Graph engine adapter
//!
//! [`GraphEngine`] is the only surface the pipeline talks to: constraint
//! declaration, keyed upserts, typed reads and writes, projections and
//! algorithm runs. Every call is blocking request/response.
//!
//! [`EmbeddedEngine`] implements it in-process over a [`GraphStore`] and the
//! `cordis-kg-algorithms` crate, persisting to a snapshot file.
//!
//! [`GraphStore`]: crate::graph::GraphStore

pub mod command;
pub mod embedded;
pub mod projection;
pub mod snapshot;
pub mod view;

pub use command::{
    AlgorithmOutcome, AlgorithmRequest, ConstraintStatus, ModelInfo, ReadQuery, Row, TrainMode, WriteCommand,
    WriteSummary,
};
pub use embedded::EmbeddedEngine;
pub use projection::{Orientation, Projection, ProjectionHandle, RelEntry, RelSpec};

use crate::graph::{EdgeType, GraphError, Label, NodeKey, PropertyMap};
use cordis_kg_algorithms::AlgoError;
use snapshot::SnapshotError;
use thiserror::Error;

/// Errors raised by an engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine cannot be reached or its state cannot be opened
    #[error("Engine unavailable: {0}")]
    Connectivity(String),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// A relationship endpoint does not exist
    #[error("No node matches {0}")]
    MissingEndpoint(NodeKey),

    /// The engine rejected a projection or an algorithm run
    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("Algorithm error: {0}")]
    AlgorithmInput(#[from] AlgoError),

    #[error("Projection {0} does not exist")]
    UnknownProjection(String),

    #[error("Projection {0} already exists")]
    ProjectionExists(String),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Engine state lock poisoned")]
    LockPoisoned,
}

impl EngineError {
    /// Errors that reject one algorithm call and leave the graph untouched
    pub fn is_algorithm_error(&self) -> bool {
        matches!(
            self,
            EngineError::Algorithm(_)
                | EngineError::AlgorithmInput(_)
                | EngineError::UnknownProjection(_)
                | EngineError::ProjectionExists(_)
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Blocking interface to a property-graph engine
pub trait GraphEngine {
    /// Fails with [`EngineError::Connectivity`] when the engine is unusable
    fn verify_connectivity(&self) -> EngineResult<()>;

    /// Declare `(label, property)` unique; re-declaring is a no-op
    fn ensure_unique_constraint(&self, label: &Label, property: &str) -> EngineResult<ConstraintStatus>;

    /// Merge the node identified by `key` and set `properties` on it
    fn upsert_node(&self, key: &NodeKey, properties: PropertyMap) -> EngineResult<WriteSummary>;

    /// Merge a `from -[rel_type]-> to` relationship; both endpoints must exist
    fn upsert_relationship(
        &self,
        rel_type: &EdgeType,
        from: &NodeKey,
        to: &NodeKey,
        properties: PropertyMap,
    ) -> EngineResult<WriteSummary>;

    fn execute_read(&self, query: &ReadQuery) -> EngineResult<Vec<Row>>;

    fn execute_write(&self, command: &WriteCommand) -> EngineResult<WriteSummary>;

    /// Define a projection. Named projections live until dropped; `None`
    /// creates an anonymous one meant for a single algorithm call.
    fn define_projection(&self, projection: &Projection, name: Option<&str>) -> EngineResult<ProjectionHandle>;

    fn drop_projection(&self, handle: &ProjectionHandle) -> EngineResult<()>;

    fn run_algorithm(&self, handle: &ProjectionHandle, request: &AlgorithmRequest) -> EngineResult<AlgorithmOutcome>;
}
