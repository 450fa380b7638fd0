//! Node similarity: Jaccard over outgoing neighbor sets.
//!
//! `J(u, v) = |N(u) ∩ N(v)| / |N(u) ∪ N(v)|` where `N(x)` are the successors of
//! `x` in the view. Only nodes with at least one successor take part, and only
//! pairs sharing a neighbor are scored.

use super::common::{GraphView, NodeId};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashSet};

/// Node similarity configuration
#[derive(Debug, Clone)]
pub struct NodeSimilarityConfig {
    /// Lower bound (inclusive) on the score of a reported pair
    pub similarity_cutoff: f64,
    /// Maximum number of pairs reported per source node
    pub top_k: usize,
}

impl Default for NodeSimilarityConfig {
    fn default() -> Self {
        Self {
            similarity_cutoff: 0.0,
            top_k: 10,
        }
    }
}

/// A scored, directed similarity result
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityPair {
    pub source: NodeId,
    pub target: NodeId,
    pub score: f64,
}

/// Compute the top-k most similar nodes for every node in the view.
///
/// Results are ordered by source index, then score descending, then target id.
pub fn node_similarity(view: &GraphView, config: &NodeSimilarityConfig) -> Vec<SimilarityPair> {
    if config.top_k == 0 {
        return Vec::new();
    }

    let neighbors: Vec<BTreeSet<usize>> = (0..view.node_count)
        .map(|i| view.successors(i).iter().copied().collect())
        .collect();

    (0..view.node_count)
        .into_par_iter()
        .filter(|&u| !neighbors[u].is_empty())
        .flat_map_iter(|u| {
            let mut candidates: HashSet<usize> = HashSet::new();
            for &w in &neighbors[u] {
                for &v in view.predecessors(w) {
                    if v != u {
                        candidates.insert(v);
                    }
                }
            }

            let mut scored: Vec<(usize, f64)> = candidates
                .into_iter()
                .filter_map(|v| {
                    let intersection = neighbors[u].intersection(&neighbors[v]).count();
                    let union = neighbors[u].len() + neighbors[v].len() - intersection;
                    if intersection == 0 || union == 0 {
                        return None;
                    }
                    let score = intersection as f64 / union as f64;
                    (score >= config.similarity_cutoff).then_some((v, score))
                })
                .collect();

            scored.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| view.index_to_node[a.0].cmp(&view.index_to_node[b.0]))
            });
            scored.truncate(config.top_k);

            scored.into_iter().map(move |(v, score)| SimilarityPair {
                source: view.index_to_node[u],
                target: view.index_to_node[v],
                score,
            })
        })
        .collect()
}
