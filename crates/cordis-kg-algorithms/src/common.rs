//! Shared utilities for graph algorithms
//!
//! Provides a read-only, optimized view of a projected subgraph for algorithm execution.

use std::collections::{BTreeSet, HashMap};

/// Node Identifier type (u64)
pub type NodeId = u64;

/// A dense, integer-indexed view of the graph topology using Compressed Sparse Row (CSR) format.
///
/// Orientation is resolved before the view is built: an undirected projection
/// simply stores every relationship in both directions.
#[derive(Debug, Clone)]
pub struct GraphView {
    /// Number of nodes
    pub node_count: usize,
    /// Mapping from dense index (0..N) back to NodeId
    pub index_to_node: Vec<NodeId>,
    /// Mapping from NodeId to dense index
    pub node_to_index: HashMap<NodeId, usize>,

    /// Outgoing edges CSR structure
    /// Offsets into `out_targets`. Size = node_count + 1
    pub out_offsets: Vec<usize>,
    /// Contiguous array of target node indices
    pub out_targets: Vec<usize>,

    /// Incoming edges CSR structure (Compressed Sparse Column effectively)
    /// Offsets into `in_sources`. Size = node_count + 1
    pub in_offsets: Vec<usize>,
    /// Contiguous array of source node indices
    pub in_sources: Vec<usize>,

    /// Edge weights: aligned with `out_targets`
    pub weights: Option<Vec<f64>>,
}

impl GraphView {
    /// Build a view from node ids and `(source_idx, target_idx, weight)` triples.
    ///
    /// Indices refer to positions in `index_to_node`. Weights are kept only
    /// when at least one of them differs from 1.0.
    pub fn from_edge_list(index_to_node: Vec<NodeId>, edges: &[(usize, usize, f64)]) -> Self {
        let node_count = index_to_node.len();
        let node_to_index = index_to_node
            .iter()
            .enumerate()
            .map(|(idx, &id)| (id, idx))
            .collect();

        let mut outgoing: Vec<Vec<(usize, f64)>> = vec![Vec::new(); node_count];
        let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); node_count];
        for &(u, v, w) in edges {
            outgoing[u].push((v, w));
            incoming[v].push(u);
        }

        let weighted = edges.iter().any(|&(_, _, w)| (w - 1.0).abs() > f64::EPSILON);

        let mut out_offsets = Vec::with_capacity(node_count + 1);
        let mut out_targets = Vec::with_capacity(edges.len());
        let mut flat_weights = Vec::with_capacity(if weighted { edges.len() } else { 0 });
        out_offsets.push(0);
        for row in outgoing {
            for (v, w) in row {
                out_targets.push(v);
                if weighted {
                    flat_weights.push(w);
                }
            }
            out_offsets.push(out_targets.len());
        }

        let mut in_offsets = Vec::with_capacity(node_count + 1);
        let mut in_sources = Vec::with_capacity(edges.len());
        in_offsets.push(0);
        for sources in incoming {
            in_sources.extend(sources);
            in_offsets.push(in_sources.len());
        }

        GraphView {
            node_count,
            index_to_node,
            node_to_index,
            out_offsets,
            out_targets,
            in_offsets,
            in_sources,
            weights: if weighted { Some(flat_weights) } else { None },
        }
    }

    /// Number of directed entries in the view
    pub fn edge_count(&self) -> usize {
        self.out_targets.len()
    }

    /// Get the out-degree of a node (by index)
    pub fn out_degree(&self, idx: usize) -> usize {
        self.out_offsets[idx + 1] - self.out_offsets[idx]
    }

    /// Get the in-degree of a node (by index)
    pub fn in_degree(&self, idx: usize) -> usize {
        self.in_offsets[idx + 1] - self.in_offsets[idx]
    }

    /// Get outgoing neighbors (successors) of a node
    pub fn successors(&self, idx: usize) -> &[usize] {
        let start = self.out_offsets[idx];
        let end = self.out_offsets[idx + 1];
        &self.out_targets[start..end]
    }

    /// Get incoming neighbors (predecessors) of a node
    pub fn predecessors(&self, idx: usize) -> &[usize] {
        let start = self.in_offsets[idx];
        let end = self.in_offsets[idx + 1];
        &self.in_sources[start..end]
    }

    /// Get weights for outgoing edges of a node
    pub fn weights(&self, idx: usize) -> Option<&[f64]> {
        self.weights.as_ref().map(|w| {
            let start = self.out_offsets[idx];
            let end = self.out_offsets[idx + 1];
            &w[start..end]
        })
    }

    /// Weight of the `k`-th outgoing edge of `idx` (1.0 when unweighted)
    pub fn weight_at(&self, idx: usize, k: usize) -> f64 {
        self.weights(idx).map(|w| w[k]).unwrap_or(1.0)
    }

    /// Distinct neighbors in either direction, self-loops excluded
    pub fn undirected_neighbors(&self, idx: usize) -> BTreeSet<usize> {
        self.successors(idx)
            .iter()
            .chain(self.predecessors(idx))
            .copied()
            .filter(|&n| n != idx)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_edge_list_builds_csr() {
        let view = GraphView::from_edge_list(vec![10, 20, 30], &[(0, 1, 1.0), (0, 2, 1.0), (2, 1, 1.0)]);

        assert_eq!(view.node_count, 3);
        assert_eq!(view.edge_count(), 3);
        assert_eq!(view.successors(0), &[1, 2]);
        assert_eq!(view.predecessors(1), &[0, 2]);
        assert_eq!(view.out_degree(1), 0);
        assert_eq!(view.in_degree(1), 2);
        assert!(view.weights.is_none());
        assert_eq!(view.node_to_index[&30], 2);
    }

    #[test]
    fn test_weights_kept_when_not_uniform() {
        let view = GraphView::from_edge_list(vec![1, 2], &[(0, 1, 0.5)]);
        assert_eq!(view.weights(0), Some(&[0.5][..]));
        assert_eq!(view.weight_at(0, 0), 0.5);
    }

    #[test]
    fn test_undirected_neighbors() {
        let view = GraphView::from_edge_list(vec![1, 2, 3], &[(0, 1, 1.0), (2, 0, 1.0), (0, 0, 1.0)]);
        let neighbors: Vec<usize> = view.undirected_neighbors(0).into_iter().collect();
        assert_eq!(neighbors, vec![1, 2]);
    }
}
