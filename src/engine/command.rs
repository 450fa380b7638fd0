//! Typed engine commands
//!
//! Every read, write and algorithm call the pipeline issues is one of these
//! variants. Values are carried as typed fields, never spliced into query text.

use crate::graph::{EdgeType, Label, NodeKey, PropertyValue};
use cordis_kg_algorithms::LogisticParams;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One result row: column name → value, in column order
pub type Row = IndexMap<String, PropertyValue>;

/// Read-only queries
#[derive(Debug, Clone, PartialEq)]
pub enum ReadQuery {
    /// `count`: nodes carrying any of `labels`
    CountNodes { labels: Vec<Label> },

    /// `count`: relationships of `rel_type`
    CountRelationships { rel_type: EdgeType },

    /// `nodeId` and all properties of one node (zero or one row)
    NodeByKey(NodeKey),

    /// `source`, `target`, `score` of stored relationships, by id
    Relationships { rel_type: EdgeType, limit: Option<usize> },

    /// Size of the candidate pair space of `rel_type` among `labels`.
    ///
    /// Columns: `nodeCount`, `relationshipCount` (distinct unordered pairs),
    /// `selfReferential`, `sourceLabelCount`, `targetLabelCount`.
    PairSpace { labels: Vec<Label>, rel_type: EdgeType },
}

/// Mutating commands that are not upserts
#[derive(Debug, Clone, PartialEq)]
pub enum WriteCommand {
    /// Delete every relationship of this type
    DeleteRelationships { rel_type: EdgeType },

    /// Remove a property from every node of a label
    RemoveNodeProperty { label: Label, property: String },

    /// Drop a stored link-prediction model; no-op when absent
    DropModel { name: String },
}

/// Counters returned by writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteSummary {
    pub nodes_created: usize,
    pub relationships_created: usize,
    pub relationships_deleted: usize,
    pub properties_set: usize,
    pub models_dropped: usize,
}

impl WriteSummary {
    pub fn absorb(&mut self, other: WriteSummary) {
        self.nodes_created += other.nodes_created;
        self.relationships_created += other.relationships_created;
        self.relationships_deleted += other.relationships_deleted;
        self.properties_set += other.properties_set;
        self.models_dropped += other.models_dropped;
    }
}

/// Result of declaring a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintStatus {
    Created,
    AlreadyPresent,
}

/// Whether a link-prediction run keeps its model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainMode {
    /// Train and store the model under its name
    Train,
    /// Train and report metrics only
    Evaluate,
}

/// Algorithms the engine runs over a projection
#[derive(Debug, Clone, PartialEq)]
pub enum AlgorithmRequest {
    /// Jaccard similarity over outgoing neighbours; writes scored relationships
    NodeSimilarity {
        similarity_cutoff: f64,
        top_k: usize,
        write_relationship: EdgeType,
        write_property: String,
    },

    PageRank {
        damping_factor: f64,
        max_iterations: usize,
        write_property: String,
    },

    Louvain {
        max_levels: usize,
        max_iterations: usize,
        write_property: String,
    },

    /// Split `relationship` of a named projection into `remaining_type` and
    /// `holdout_type`; the stored graph is not touched
    SplitRelationships {
        relationship: EdgeType,
        remaining_type: EdgeType,
        holdout_type: EdgeType,
        holdout_fraction: f64,
        random_seed: u64,
    },

    LinkPredictionTrain {
        train_relationship: EdgeType,
        test_relationship: EdgeType,
        model_name: String,
        class_ratio: f64,
        validation_folds: usize,
        random_seed: u64,
        params: Vec<LogisticParams>,
        mode: TrainMode,
        /// Overwrite a stored model of the same name, once training succeeds
        replace: bool,
    },
}

impl AlgorithmRequest {
    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmRequest::NodeSimilarity { .. } => "nodeSimilarity",
            AlgorithmRequest::PageRank { .. } => "pageRank",
            AlgorithmRequest::Louvain { .. } => "louvain",
            AlgorithmRequest::SplitRelationships { .. } => "splitRelationships",
            AlgorithmRequest::LinkPredictionTrain { .. } => "linkPrediction.train",
        }
    }
}

/// Summary of a trained link-prediction model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub best_parameters: LogisticParams,
    /// Mean validation AUCPR per candidate, in the order submitted
    pub validation_scores: Vec<(LogisticParams, f64)>,
    pub train_aucpr: f64,
    pub test_aucpr: f64,
    pub class_ratio: f64,
    pub stored: bool,
}

/// What an algorithm did
#[derive(Debug, Clone, PartialEq)]
pub enum AlgorithmOutcome {
    Similarity {
        nodes_compared: usize,
        relationships_written: usize,
    },
    PageRank {
        nodes_written: usize,
        iterations_run: usize,
        converged: bool,
    },
    Louvain {
        nodes_written: usize,
        community_count: usize,
        modularity: f64,
        levels: usize,
    },
    Split {
        remaining: usize,
        holdout: usize,
    },
    LinkPrediction(ModelInfo),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_summary_absorb() {
        let mut total = WriteSummary::default();
        total.absorb(WriteSummary {
            nodes_created: 1,
            relationships_created: 2,
            ..WriteSummary::default()
        });
        total.absorb(WriteSummary {
            relationships_created: 1,
            properties_set: 4,
            ..WriteSummary::default()
        });
        assert_eq!(total.nodes_created, 1);
        assert_eq!(total.relationships_created, 3);
        assert_eq!(total.properties_set, 4);
    }

    #[test]
    fn test_algorithm_names() {
        let request = AlgorithmRequest::PageRank {
            damping_factor: 0.85,
            max_iterations: 20,
            write_property: "pagerank".to_string(),
        };
        assert_eq!(request.name(), "pageRank");
    }
}
