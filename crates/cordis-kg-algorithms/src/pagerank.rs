//! PageRank centrality
//!
//! Iterative rank propagation over the projected view. Every node starts with
//! a score of 1.0 and receives `(1 - d) + d * Σ score(u) / outdeg(u)` from its
//! predecessors on each pass.

use super::common::{GraphView, NodeId};
use std::collections::HashMap;

/// PageRank configuration
#[derive(Debug, Clone)]
pub struct PageRankConfig {
    /// Damping factor (usually 0.85)
    pub damping_factor: f64,
    /// Maximum number of iterations
    pub iterations: usize,
    /// Stop early once the summed absolute change drops below this value
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping_factor: 0.85,
            iterations: 20,
            tolerance: 0.0000001,
        }
    }
}

/// Scores plus the number of passes actually run
#[derive(Debug, Clone)]
pub struct PageRankResult {
    pub scores: HashMap<NodeId, f64>,
    pub iterations_run: usize,
    pub converged: bool,
}

/// Calculate PageRank for the graph view
pub fn page_rank(view: &GraphView, config: &PageRankConfig) -> PageRankResult {
    let n = view.node_count;

    if n == 0 {
        return PageRankResult {
            scores: HashMap::new(),
            iterations_run: 0,
            converged: true,
        };
    }

    let mut scores = vec![1.0; n];
    let mut next_scores = vec![0.0; n];

    let d = config.damping_factor;
    let base_score = 1.0 - d;
    let mut iterations_run = 0;
    let mut converged = false;

    for _ in 0..config.iterations {
        iterations_run += 1;
        let mut total_diff = 0.0;

        for i in 0..n {
            let mut sum_incoming = 0.0;

            for &source_idx in view.predecessors(i) {
                let out_degree = view.out_degree(source_idx);
                if out_degree > 0 {
                    sum_incoming += scores[source_idx] / out_degree as f64;
                }
            }

            next_scores[i] = base_score + d * sum_incoming;
            total_diff += (next_scores[i] - scores[i]).abs();
        }

        scores.copy_from_slice(&next_scores);

        if total_diff < config.tolerance {
            converged = true;
            break;
        }
    }

    let scores = scores
        .into_iter()
        .enumerate()
        .map(|(idx, score)| (view.index_to_node[idx], score))
        .collect();

    PageRankResult {
        scores,
        iterations_run,
        converged,
    }
}
