//! Community detection
//!
//! Hierarchical Louvain modularity optimization. Each level runs local moving
//! until no node changes community (or `max_iterations` passes), then
//! aggregates every community into a super-node and starts the next level.
//! Relationship direction is ignored.

use super::common::{GraphView, NodeId};
use std::collections::{BTreeMap, HashMap};

/// Louvain configuration
#[derive(Debug, Clone)]
pub struct LouvainConfig {
    /// Maximum number of aggregation levels
    pub max_levels: usize,
    /// Maximum local-moving passes per level
    pub max_iterations: usize,
}

impl Default for LouvainConfig {
    fn default() -> Self {
        Self {
            max_levels: 10,
            max_iterations: 10,
        }
    }
}

/// Result of the Louvain algorithm
#[derive(Debug, Clone)]
pub struct LouvainResult {
    /// NodeId -> community id. A community is identified by the smallest
    /// NodeId it contains, so ids are stable for identical input.
    pub communities: HashMap<NodeId, u64>,
    /// Modularity of the final partition on the input graph
    pub modularity: f64,
    /// Number of levels that changed the partition
    pub levels: usize,
    pub community_count: usize,
}

/// Weighted undirected graph used inside one Louvain level
struct LevelGraph {
    adjacency: Vec<BTreeMap<usize, f64>>,
    self_loops: Vec<f64>,
}

impl LevelGraph {
    fn from_view(view: &GraphView) -> Self {
        let n = view.node_count;
        let mut adjacency = vec![BTreeMap::new(); n];
        for u in 0..n {
            for (k, &v) in view.successors(u).iter().enumerate() {
                if u == v {
                    continue;
                }
                let w = view.weight_at(u, k);
                *adjacency[u].entry(v).or_insert(0.0) += w;
                *adjacency[v].entry(u).or_insert(0.0) += w;
            }
        }
        LevelGraph {
            adjacency,
            self_loops: vec![0.0; n],
        }
    }

    fn len(&self) -> usize {
        self.adjacency.len()
    }

    fn degree(&self, i: usize) -> f64 {
        self.adjacency[i].values().sum::<f64>() + self.self_loops[i]
    }

    /// One local-moving phase. Returns the community of each node and whether anything moved.
    fn local_moving(&self, max_iterations: usize) -> (Vec<usize>, bool) {
        let n = self.len();
        let degrees: Vec<f64> = (0..n).map(|i| self.degree(i)).collect();
        let m2: f64 = degrees.iter().sum();
        let mut community: Vec<usize> = (0..n).collect();
        if m2 <= 0.0 {
            return (community, false);
        }

        let mut totals = degrees.clone();
        let mut any_move = false;

        for _ in 0..max_iterations {
            let mut moved = false;

            for i in 0..n {
                let current = community[i];
                let k_i = degrees[i];

                let mut links: BTreeMap<usize, f64> = BTreeMap::new();
                for (&j, &w) in &self.adjacency[i] {
                    *links.entry(community[j]).or_insert(0.0) += w;
                }

                totals[current] -= k_i;

                let own_links = links.get(&current).copied().unwrap_or(0.0);
                let mut best = current;
                let mut best_gain = own_links - totals[current] * k_i / m2;

                for (&c, &w_ic) in &links {
                    if c == current {
                        continue;
                    }
                    let gain = w_ic - totals[c] * k_i / m2;
                    if gain > best_gain + 1e-12 {
                        best_gain = gain;
                        best = c;
                    }
                }

                totals[best] += k_i;
                if best != current {
                    community[i] = best;
                    moved = true;
                    any_move = true;
                }
            }

            if !moved {
                break;
            }
        }

        (community, any_move)
    }

    /// Collapse communities into super-nodes. `community` must be renumbered 0..k.
    fn aggregate(&self, community: &[usize], k: usize) -> LevelGraph {
        let mut adjacency = vec![BTreeMap::new(); k];
        let mut self_loops = vec![0.0; k];
        for i in 0..self.len() {
            let ci = community[i];
            self_loops[ci] += self.self_loops[i];
            for (&j, &w) in &self.adjacency[i] {
                let cj = community[j];
                if ci == cj {
                    self_loops[ci] += w;
                } else {
                    *adjacency[ci].entry(cj).or_insert(0.0) += w;
                }
            }
        }
        LevelGraph {
            adjacency,
            self_loops,
        }
    }
}

/// Renumber community labels to 0..k in order of first appearance
fn renumber(community: &mut [usize]) -> usize {
    let mut mapping: HashMap<usize, usize> = HashMap::new();
    for c in community.iter_mut() {
        let next = mapping.len();
        *c = *mapping.entry(*c).or_insert(next);
    }
    mapping.len()
}

/// Run hierarchical Louvain over the view
pub fn louvain(view: &GraphView, config: &LouvainConfig) -> LouvainResult {
    let n = view.node_count;
    let base = LevelGraph::from_view(view);

    // membership[i] = community of original node i at the current level
    let mut membership: Vec<usize> = (0..n).collect();
    let mut graph = LevelGraph::from_view(view);
    let mut levels = 0;

    for _ in 0..config.max_levels {
        let (mut community, moved) = graph.local_moving(config.max_iterations);
        if !moved {
            break;
        }
        let k = renumber(&mut community);
        for m in membership.iter_mut() {
            *m = community[*m];
        }
        levels += 1;
        if k == graph.len() {
            break;
        }
        graph = graph.aggregate(&community, k);
    }

    let modularity = modularity(&base, &membership);

    // Label every community by its smallest member NodeId
    let mut representative: HashMap<usize, NodeId> = HashMap::new();
    for (idx, &c) in membership.iter().enumerate() {
        let id = view.index_to_node[idx];
        representative
            .entry(c)
            .and_modify(|r| *r = (*r).min(id))
            .or_insert(id);
    }

    let communities = membership
        .iter()
        .enumerate()
        .map(|(idx, c)| (view.index_to_node[idx], representative[c]))
        .collect();

    LouvainResult {
        communities,
        modularity,
        levels,
        community_count: representative.len(),
    }
}

fn modularity(graph: &LevelGraph, membership: &[usize]) -> f64 {
    let n = graph.len();
    let degrees: Vec<f64> = (0..n).map(|i| graph.degree(i)).collect();
    let m2: f64 = degrees.iter().sum();
    if m2 <= 0.0 {
        return 0.0;
    }

    let mut internal: HashMap<usize, f64> = HashMap::new();
    let mut totals: HashMap<usize, f64> = HashMap::new();
    for i in 0..n {
        let c = membership[i];
        *totals.entry(c).or_insert(0.0) += degrees[i];
        for (&j, &w) in &graph.adjacency[i] {
            if membership[j] == c {
                *internal.entry(c).or_insert(0.0) += w;
            }
        }
    }

    totals
        .iter()
        .map(|(c, &tot)| {
            let inside = internal.get(c).copied().unwrap_or(0.0);
            inside / m2 - (tot / m2).powi(2)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two triangles joined by a single bridge
    fn two_triangles() -> GraphView {
        GraphView::from_edge_list(
            vec![1, 2, 3, 4, 5, 6],
            &[
                (0, 1, 1.0),
                (1, 2, 1.0),
                (2, 0, 1.0),
                (3, 4, 1.0),
                (4, 5, 1.0),
                (5, 3, 1.0),
                (2, 3, 1.0),
            ],
        )
    }

    #[test]
    fn test_louvain_separates_triangles() {
        let result = louvain(&two_triangles(), &LouvainConfig::default());

        assert_eq!(result.community_count, 2);
        let c = &result.communities;
        assert_eq!(c[&1], c[&2]);
        assert_eq!(c[&2], c[&3]);
        assert_eq!(c[&4], c[&5]);
        assert_eq!(c[&5], c[&6]);
        assert_ne!(c[&1], c[&4]);
        assert_eq!(c[&1], 1);
        assert_eq!(c[&6], 4);
        assert!(result.modularity > 0.3);
    }

    #[test]
    fn test_louvain_is_deterministic() {
        let a = louvain(&two_triangles(), &LouvainConfig::default());
        let b = louvain(&two_triangles(), &LouvainConfig::default());
        assert_eq!(a.communities, b.communities);
    }

    #[test]
    fn test_isolated_nodes_keep_own_community() {
        let view = GraphView::from_edge_list(vec![7, 8, 9], &[(0, 1, 1.0)]);
        let result = louvain(&view, &LouvainConfig::default());
        assert_eq!(result.communities[&7], result.communities[&8]);
        assert_eq!(result.communities[&9], 9);
    }

    #[test]
    fn test_empty_graph() {
        let view = GraphView::from_edge_list(vec![1, 2], &[]);
        let result = louvain(&view, &LouvainConfig::default());
        assert_eq!(result.community_count, 2);
        assert_eq!(result.levels, 0);
        assert_eq!(result.modularity, 0.0);
    }
}
