//! Graph algorithms over a read-only CSR view: node similarity, PageRank,
//! Louvain community detection and supervised link prediction.

pub mod common;
pub mod community;
pub mod error;
pub mod linkpred;
pub mod metrics;
pub mod pagerank;
pub mod similarity;

pub use common::{GraphView, NodeId};
pub use community::{louvain, LouvainConfig, LouvainResult};
pub use error::{AlgoError, AlgoResult};
pub use linkpred::{
    holdout_split, train_link_predictor, LinkPredictionConfig, LinkPredictionModel, LogisticParams, PairFeatures,
    TrainingOutcome, DEFAULT_PENALTIES, FEATURE_NAMES,
};
pub use metrics::aucpr;
pub use pagerank::{page_rank, PageRankConfig, PageRankResult};
pub use similarity::{node_similarity, NodeSimilarityConfig, SimilarityPair};
