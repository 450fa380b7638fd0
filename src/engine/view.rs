//! Materialized projections
//!
//! Resolves a [`Projection`] against the store into dense node indices and
//! oriented relationship lists, from which algorithm views are cut.

use super::projection::{Orientation, Projection};
use super::{EngineError, EngineResult};
use crate::graph::{EdgeType, GraphStore, NodeId, PropertyValue};
use cordis_kg_algorithms::GraphView;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// `(source_idx, target_idx, weight)` after orientation
pub type ProjectedRelationship = (usize, usize, f64);

/// A projection resolved against the store at definition time
#[derive(Debug, Clone)]
pub struct ProjectedGraph {
    pub projection: Projection,
    /// Dense index → node id, ascending by id
    pub index_to_node: Vec<u64>,
    pub node_to_index: HashMap<u64, usize>,
    pub relationships: BTreeMap<EdgeType, Vec<ProjectedRelationship>>,
}

impl ProjectedGraph {
    pub fn materialize(store: &GraphStore, projection: &Projection) -> EngineResult<Self> {
        if projection.rel_specs.is_empty() {
            return Err(EngineError::Algorithm(format!(
                "projection {} has no relationship types",
                projection
            )));
        }

        let mut ids: BTreeSet<u64> = BTreeSet::new();
        for label in &projection.node_labels {
            let nodes = store.get_nodes_by_label(label);
            if nodes.is_empty() {
                debug!(label = %label, "projected label has no nodes");
            }
            ids.extend(nodes.iter().map(|n| n.id.as_u64()));
        }
        if ids.is_empty() {
            return Err(EngineError::Algorithm(format!(
                "projection {} contains no nodes",
                projection
            )));
        }

        let index_to_node: Vec<u64> = ids.into_iter().collect();
        let node_to_index: HashMap<u64, usize> = index_to_node
            .iter()
            .enumerate()
            .map(|(idx, &id)| (id, idx))
            .collect();

        let mut relationships = BTreeMap::new();
        for spec in &projection.rel_specs {
            let weight_property = spec.properties.first();
            let mut entries = Vec::new();
            for edge in store.get_edges_by_type(&spec.rel_type) {
                let (Some(&s), Some(&t)) = (
                    node_to_index.get(&edge.source.as_u64()),
                    node_to_index.get(&edge.target.as_u64()),
                ) else {
                    continue;
                };
                let weight = weight_property
                    .and_then(|p| edge.get_property(p))
                    .and_then(PropertyValue::as_float)
                    .unwrap_or(1.0);
                match spec.orientation {
                    Orientation::Natural => entries.push((s, t, weight)),
                    Orientation::Reverse => entries.push((t, s, weight)),
                    Orientation::Undirected => {
                        entries.push((s, t, weight));
                        entries.push((t, s, weight));
                    }
                }
            }
            relationships.insert(spec.rel_type.clone(), entries);
        }

        Ok(ProjectedGraph {
            projection: projection.clone(),
            index_to_node,
            node_to_index,
            relationships,
        })
    }

    pub fn node_count(&self) -> usize {
        self.index_to_node.len()
    }

    pub fn node_id(&self, idx: usize) -> NodeId {
        NodeId::new(self.index_to_node[idx])
    }

    pub fn has_relationship_type(&self, rel_type: &EdgeType) -> bool {
        self.relationships.contains_key(rel_type)
    }

    pub fn relationships_of(&self, rel_type: &EdgeType) -> EngineResult<&[ProjectedRelationship]> {
        self.relationships
            .get(rel_type)
            .map(|r| r.as_slice())
            .ok_or_else(|| EngineError::Algorithm(format!("relationship type {} is not projected", rel_type)))
    }

    /// Add a relationship type that exists only inside this projection
    pub fn insert_relationships(&mut self, rel_type: EdgeType, entries: Vec<ProjectedRelationship>) {
        self.relationships.insert(rel_type, entries);
    }

    /// CSR view over the given relationship types, or every projected type
    pub fn view(&self, rel_types: Option<&[EdgeType]>) -> EngineResult<GraphView> {
        let mut edges: Vec<ProjectedRelationship> = Vec::new();
        match rel_types {
            Some(types) => {
                for rel_type in types {
                    edges.extend_from_slice(self.relationships_of(rel_type)?);
                }
            }
            None => {
                for spec in &self.projection.rel_specs {
                    edges.extend_from_slice(self.relationships_of(&spec.rel_type)?);
                }
            }
        }
        Ok(GraphView::from_edge_list(self.index_to_node.clone(), &edges))
    }
}
