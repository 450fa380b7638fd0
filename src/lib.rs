//! CordisKG
//!
//! Knowledge-graph construction and analytics for research-funding records:
//! projects, deliverables, organizations, people and the keyphrases that
//! describe them.
//!
//! # Architecture
//!
//! - [`ingest`]: tabular sources, record normalization, merge-join
//!   reconciliation and the idempotent [`GraphBuilder`]
//! - [`keyphrase`]: consolidation of multi-method keyphrase extraction output
//! - [`engine`]: the [`GraphEngine`] boundary and its in-process
//!   [`EmbeddedEngine`], persisted as a compressed snapshot
//! - [`graph`]: the property graph behind the embedded engine
//! - [`analytics`]: projections and the staged similarity, PageRank, Louvain
//!   and link-prediction runs
//! - [`pipeline`]: the end-to-end driver used by the binary
//!
//! ## Example Usage
//!
//! ```rust
//! use cordis_kg::engine::{EmbeddedEngine, GraphEngine};
//! use cordis_kg::graph::{NodeKey, PropertyMap};
//! use cordis_kg::ingest::{GraphBuilder, Upsert};
//!
//! let engine = EmbeddedEngine::in_memory();
//! let builder = GraphBuilder::new(&engine);
//! builder.ensure_constraints()?;
//!
//! engine.upsert_node(&NodeKey::new("Project", "id", 101i64), PropertyMap::new())?;
//! let written = builder.upsert_keyphrase_edges("Project", 101i64, &["Energy  Storage".to_string()])?;
//! assert!(matches!(written, Upsert::Written(_)));
//! assert_eq!(engine.node_count()?, 2);
//! # Ok::<(), cordis_kg::PipelineError>(())
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod analytics;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod keyphrase;
pub mod pipeline;
pub mod schema;

// Re-export main types for convenience
pub use analytics::{AnalyticsOrchestrator, ProjectionScope, Stage, StageError};
pub use config::{ConfigError, PipelineConfig};
pub use engine::{EmbeddedEngine, EngineError, GraphEngine, Orientation, Projection};
pub use error::{PipelineError, PipelineResult};
pub use graph::{EdgeType, GraphStore, KeyValue, Label, NodeKey, PropertyMap, PropertyValue};
pub use ingest::{DataFormatError, GraphBuilder, IngestError, ReconciliationGap, TabularSource};
pub use keyphrase::{KeyphraseConsolidator, KeyphraseExtractor};
pub use pipeline::{Pipeline, RunReport};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(version(), "0.3.0");
    }
}
