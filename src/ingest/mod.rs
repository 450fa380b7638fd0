//! Graph construction from tabular records
//!
//! - [`tabular`]: delimited interchange files and the [`TabularSource`] trait
//! - [`records`]: typed rows and field normalization
//! - [`reconcile`]: merge-join of key-sorted datasets
//! - [`builder`]: constraints, idempotent upserts and construction passes

pub mod builder;
pub mod records;
pub mod reconcile;
pub mod tabular;

pub use builder::{ConstructionReport, GraphBuilder, ReconciliationGap, Upsert};
pub use records::{DeliverableRecord, KeyphraseRecord, PersonsRecord, ProjectRecord};
pub use reconcile::{reconcile, Reconciliation};
pub use tabular::{DelimitedFile, MemorySource, Record, TabularSource};

use crate::engine::EngineError;
use std::path::PathBuf;
use thiserror::Error;

/// A field or record that cannot be used as given
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataFormatError {
    #[error("Missing field {field}")]
    MissingField { field: String },

    #[error("Invalid number in {field}: {value:?}")]
    InvalidNumber { field: String, value: String },

    #[error("Placeholder value in {field}")]
    Placeholder { field: String },
}

/// Errors that stop a construction pass
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed {source_name} at line {line}: {reason}")]
    Malformed {
        source_name: String,
        line: usize,
        reason: String,
    },

    #[error("Label {0} has no key property")]
    UnknownLabel(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type IngestResult<T> = Result<T, IngestError>;
