//! In-memory graph storage
//!
//! Arena-backed property graph with:
//! - adjacency lists per node in both directions
//! - label and relationship-type indexes (ordered, so scans are deterministic)
//! - unique-key constraints `(label, property)` backed by hash indexes, which
//!   make `merge_node` an O(1) lookup-or-create

use super::edge::Edge;
use super::node::Node;
use super::property::{PropertyMap, PropertyValue};
use super::types::{EdgeId, EdgeType, KeyValue, Label, NodeId, NodeKey};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors that can occur during graph operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("Node {0} already exists")]
    NodeAlreadyExists(NodeId),

    #[error("Invalid edge: source node {0} does not exist")]
    InvalidEdgeSource(NodeId),

    #[error("Invalid edge: target node {0} does not exist")]
    InvalidEdgeTarget(NodeId),

    #[error("Unique constraint violated: {key} already held by {existing}")]
    DuplicateKey { key: NodeKey, existing: NodeId },

    #[error("Property {property} of {label} cannot hold a unique key")]
    InvalidKeyValue { label: Label, property: String },
}

pub type GraphResult<T> = Result<T, GraphError>;

type ConstraintKey = (Label, String);

/// In-memory graph storage
#[derive(Debug)]
pub struct GraphStore {
    /// Node arena, indexed by `NodeId`; slot 0 is never used
    nodes: Vec<Option<Node>>,

    /// Edge arena, indexed by `EdgeId`; slot 0 is never used
    edges: Vec<Option<Edge>>,

    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,

    label_index: BTreeMap<Label, BTreeSet<NodeId>>,
    edge_type_index: BTreeMap<EdgeType, BTreeSet<EdgeId>>,

    /// Declared `(label, property)` uniqueness constraints and their value index
    unique_index: BTreeMap<ConstraintKey, FxHashMap<KeyValue, NodeId>>,

    /// First edge for each `(source, target, type)`; backs `merge_edge`
    edge_key_index: FxHashMap<(NodeId, NodeId, EdgeType), EdgeId>,

    node_count: usize,
    edge_count: usize,
    next_node_id: u64,
    next_edge_id: u64,
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new() -> Self {
        GraphStore {
            nodes: vec![None],
            edges: vec![None],
            outgoing: vec![Vec::new()],
            incoming: vec![Vec::new()],
            label_index: BTreeMap::new(),
            edge_type_index: BTreeMap::new(),
            unique_index: BTreeMap::new(),
            edge_key_index: FxHashMap::default(),
            node_count: 0,
            edge_count: 0,
            next_node_id: 1,
            next_edge_id: 1,
        }
    }

    // ------------------------------------------------------------------
    // Constraints
    // ------------------------------------------------------------------

    /// Declare a uniqueness constraint. Returns `false` when it already existed.
    ///
    /// Existing nodes are indexed; if two of them already share a value the
    /// constraint is not created.
    pub fn ensure_constraint(&mut self, label: &Label, property: &str) -> GraphResult<bool> {
        let constraint = (label.clone(), property.to_string());
        if self.unique_index.contains_key(&constraint) {
            return Ok(false);
        }

        let mut index: FxHashMap<KeyValue, NodeId> = FxHashMap::default();
        for node in self.get_nodes_by_label(label) {
            let Some(value) = node.get_property(property) else {
                continue;
            };
            let key = value.as_key().ok_or_else(|| GraphError::InvalidKeyValue {
                label: label.clone(),
                property: property.to_string(),
            })?;
            if let Some(&existing) = index.get(&key) {
                return Err(GraphError::DuplicateKey {
                    key: NodeKey::new(label.clone(), property, key),
                    existing,
                });
            }
            index.insert(key, node.id);
        }

        self.unique_index.insert(constraint, index);
        Ok(true)
    }

    pub fn has_constraint(&self, label: &Label, property: &str) -> bool {
        self.unique_index.contains_key(&(label.clone(), property.to_string()))
    }

    /// Declared constraints in `(label, property)` order
    pub fn constraints(&self) -> impl Iterator<Item = (&Label, &str)> {
        self.unique_index.keys().map(|(l, p)| (l, p.as_str()))
    }

    /// Check that giving `id` (or a new node, when `None`) these properties
    /// under `labels` would not collide with another node's key.
    fn check_unique(&self, labels: &BTreeSet<Label>, properties: &PropertyMap, id: Option<NodeId>) -> GraphResult<()> {
        for ((label, property), index) in &self.unique_index {
            if !labels.contains(label) {
                continue;
            }
            let Some(value) = properties.get(property) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let key = value.as_key().ok_or_else(|| GraphError::InvalidKeyValue {
                label: label.clone(),
                property: property.clone(),
            })?;
            if let Some(&existing) = index.get(&key) {
                if Some(existing) != id {
                    return Err(GraphError::DuplicateKey {
                        key: NodeKey::new(label.clone(), property.as_str(), key),
                        existing,
                    });
                }
            }
        }
        Ok(())
    }

    fn index_keys(&mut self, node: &Node) {
        for ((label, property), index) in self.unique_index.iter_mut() {
            if !node.labels.contains(label) {
                continue;
            }
            if let Some(key) = node.get_property(property).and_then(|v| v.as_key()) {
                index.insert(key, node.id);
            }
        }
    }

    fn unindex_key(&mut self, labels: &BTreeSet<Label>, property: &str, old: &PropertyValue, id: NodeId) {
        let Some(old_key) = old.as_key() else {
            return;
        };
        for ((label, p), index) in self.unique_index.iter_mut() {
            if p == property && labels.contains(label) && index.get(&old_key) == Some(&id) {
                index.remove(&old_key);
            }
        }
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    fn allocate_node_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    fn place_node(&mut self, node: Node) {
        let idx = node.id.as_u64() as usize;
        if idx >= self.nodes.len() {
            self.nodes.resize(idx + 1, None);
            self.outgoing.resize(idx + 1, Vec::new());
            self.incoming.resize(idx + 1, Vec::new());
        }

        for label in &node.labels {
            self.label_index.entry(label.clone()).or_default().insert(node.id);
        }
        self.index_keys(&node);

        self.nodes[idx] = Some(node);
        self.node_count += 1;
    }

    /// Create a node with a single label and properties
    pub fn create_node(&mut self, label: impl Into<Label>, properties: PropertyMap) -> GraphResult<NodeId> {
        let label = label.into();
        let labels: BTreeSet<Label> = std::iter::once(label.clone()).collect();
        self.check_unique(&labels, &properties, None)?;

        let id = self.allocate_node_id();
        self.place_node(Node::new_with_properties(id, label, properties));
        Ok(id)
    }

    /// Look a node up by its natural key.
    ///
    /// Uses the unique index when the key is constrained and falls back to a
    /// label scan otherwise.
    pub fn find_node(&self, key: &NodeKey) -> Option<NodeId> {
        let constraint = (key.label.clone(), key.property.clone());
        if let Some(index) = self.unique_index.get(&constraint) {
            return index.get(&key.value).copied();
        }
        self.get_nodes_by_label(&key.label)
            .into_iter()
            .find(|n| n.get_property(&key.property).and_then(|v| v.as_key()).as_ref() == Some(&key.value))
            .map(|n| n.id)
    }

    /// Find the node with this key or create it, then merge `properties` into it.
    ///
    /// Returns the node id and whether it was created.
    pub fn merge_node(&mut self, key: &NodeKey, mut properties: PropertyMap) -> GraphResult<(NodeId, bool)> {
        properties.insert(key.property.clone(), key.value.clone().into());

        match self.find_node(key) {
            Some(id) => {
                for (k, v) in properties {
                    self.set_node_property(id, k, v)?;
                }
                Ok((id, false))
            }
            None => Ok((self.create_node(key.label.clone(), properties)?, true)),
        }
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.as_u64() as usize).and_then(|slot| slot.as_ref())
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.get_node(id).is_some()
    }

    /// Set one property, keeping unique indexes consistent
    pub fn set_node_property(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<()> {
        let key = key.into();
        let value = value.into();
        let labels = self.get_node(id).ok_or(GraphError::NodeNotFound(id))?.labels.clone();

        let mut probe = PropertyMap::new();
        probe.insert(key.clone(), value.clone());
        self.check_unique(&labels, &probe, Some(id))?;

        let old = self
            .nodes
            .get_mut(id.as_u64() as usize)
            .and_then(|slot| slot.as_mut())
            .ok_or(GraphError::NodeNotFound(id))?
            .set_property(key.clone(), value);

        if let Some(old) = old {
            self.unindex_key(&labels, &key, &old, id);
        }
        if let Some(node) = self.get_node(id).cloned() {
            self.index_keys(&node);
        }
        Ok(())
    }

    /// Remove a property from every node carrying `label`. Returns how many changed.
    pub fn remove_label_property(&mut self, label: &Label, key: &str) -> usize {
        let ids: Vec<NodeId> = self
            .label_index
            .get(label)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();

        let mut removed = 0;
        for id in ids {
            let old = self
                .nodes
                .get_mut(id.as_u64() as usize)
                .and_then(|slot| slot.as_mut())
                .and_then(|node| node.remove_property(key));
            if let Some(old) = old {
                if let Some(labels) = self.get_node(id).map(|n| n.labels.clone()) {
                    self.unindex_key(&labels, key, &old, id);
                }
                removed += 1;
            }
        }
        removed
    }

    /// Nodes with `label`, ordered by id
    pub fn get_nodes_by_label(&self, label: &Label) -> Vec<&Node> {
        self.label_index
            .get(label)
            .map(|ids| ids.iter().filter_map(|&id| self.get_node(id)).collect())
            .unwrap_or_default()
    }

    pub fn label_count(&self, label: &Label) -> usize {
        self.label_index.get(label).map(|ids| ids.len()).unwrap_or(0)
    }

    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter_map(|slot| slot.as_ref())
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    // ------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------

    fn place_edge(&mut self, edge: Edge) -> GraphResult<()> {
        if !self.has_node(edge.source) {
            return Err(GraphError::InvalidEdgeSource(edge.source));
        }
        if !self.has_node(edge.target) {
            return Err(GraphError::InvalidEdgeTarget(edge.target));
        }

        let idx = edge.id.as_u64() as usize;
        if idx >= self.edges.len() {
            self.edges.resize(idx + 1, None);
        }

        self.outgoing[edge.source.as_u64() as usize].push(edge.id);
        self.incoming[edge.target.as_u64() as usize].push(edge.id);
        self.edge_type_index
            .entry(edge.edge_type.clone())
            .or_default()
            .insert(edge.id);
        self.edge_key_index
            .entry((edge.source, edge.target, edge.edge_type.clone()))
            .or_insert(edge.id);

        self.edges[idx] = Some(edge);
        self.edge_count += 1;
        Ok(())
    }

    /// Create a directed relationship
    pub fn create_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
        properties: PropertyMap,
    ) -> GraphResult<EdgeId> {
        let id = EdgeId::new(self.next_edge_id);
        self.place_edge(Edge::new_with_properties(id, source, target, edge_type, properties))?;
        self.next_edge_id += 1;
        Ok(id)
    }

    pub fn find_edge(&self, source: NodeId, target: NodeId, edge_type: &EdgeType) -> Option<EdgeId> {
        self.edge_key_index
            .get(&(source, target, edge_type.clone()))
            .copied()
    }

    /// Find the `(source, target, type)` relationship or create it, then merge
    /// `properties` into it. Returns the edge id and whether it was created.
    pub fn merge_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        edge_type: impl Into<EdgeType>,
        properties: PropertyMap,
    ) -> GraphResult<(EdgeId, bool)> {
        let edge_type = edge_type.into();
        if let Some(id) = self.find_edge(source, target, &edge_type) {
            if let Some(edge) = self.edges.get_mut(id.as_u64() as usize).and_then(|slot| slot.as_mut()) {
                edge.properties.extend(properties);
            }
            return Ok((id, false));
        }
        Ok((self.create_edge(source, target, edge_type, properties)?, true))
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.as_u64() as usize).and_then(|slot| slot.as_ref())
    }

    pub fn delete_edge(&mut self, id: EdgeId) -> GraphResult<Edge> {
        let edge = self
            .edges
            .get_mut(id.as_u64() as usize)
            .and_then(|slot| slot.take())
            .ok_or(GraphError::EdgeNotFound(id))?;

        self.outgoing[edge.source.as_u64() as usize].retain(|&e| e != id);
        self.incoming[edge.target.as_u64() as usize].retain(|&e| e != id);
        if let Some(ids) = self.edge_type_index.get_mut(&edge.edge_type) {
            ids.remove(&id);
            if ids.is_empty() {
                self.edge_type_index.remove(&edge.edge_type);
            }
        }

        let triple = (edge.source, edge.target, edge.edge_type.clone());
        if self.edge_key_index.get(&triple) == Some(&id) {
            let replacement = self.outgoing[edge.source.as_u64() as usize]
                .iter()
                .copied()
                .find(|&e| {
                    self.get_edge(e)
                        .map(|o| o.target == edge.target && o.edge_type == edge.edge_type)
                        .unwrap_or(false)
                });
            match replacement {
                Some(e) => {
                    self.edge_key_index.insert(triple, e);
                }
                None => {
                    self.edge_key_index.remove(&triple);
                }
            }
        }

        self.edge_count -= 1;
        Ok(edge)
    }

    /// Delete every relationship of this type. Returns how many were deleted.
    pub fn delete_edges_by_type(&mut self, edge_type: &EdgeType) -> usize {
        let ids: Vec<EdgeId> = self
            .edge_type_index
            .get(edge_type)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        ids.into_iter().filter(|&id| self.delete_edge(id).is_ok()).count()
    }

    pub fn get_outgoing_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.outgoing
            .get(node_id.as_u64() as usize)
            .map(|ids| ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    pub fn get_incoming_edges(&self, node_id: NodeId) -> Vec<&Edge> {
        self.incoming
            .get(node_id.as_u64() as usize)
            .map(|ids| ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    /// Relationships of `edge_type`, ordered by id
    pub fn get_edges_by_type(&self, edge_type: &EdgeType) -> Vec<&Edge> {
        self.edge_type_index
            .get(edge_type)
            .map(|ids| ids.iter().filter_map(|&id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    pub fn edge_type_count(&self, edge_type: &EdgeType) -> usize {
        self.edge_type_index.get(edge_type).map(|ids| ids.len()).unwrap_or(0)
    }

    pub fn all_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter_map(|slot| slot.as_ref())
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.node_count == 0
    }

    // ------------------------------------------------------------------
    // Recovery
    // ------------------------------------------------------------------

    /// Insert a node restored from a snapshot, keeping its id
    pub fn insert_recovered_node(&mut self, node: Node) -> GraphResult<()> {
        if self.has_node(node.id) {
            return Err(GraphError::NodeAlreadyExists(node.id));
        }
        self.check_unique(&node.labels, &node.properties, Some(node.id))?;
        if node.id.as_u64() >= self.next_node_id {
            self.next_node_id = node.id.as_u64() + 1;
        }
        self.place_node(node);
        Ok(())
    }

    /// Insert a relationship restored from a snapshot, keeping its id
    pub fn insert_recovered_edge(&mut self, edge: Edge) -> GraphResult<()> {
        let next = edge.id.as_u64() + 1;
        self.place_edge(edge)?;
        if next > self.next_edge_id {
            self.next_edge_id = next;
        }
        Ok(())
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, PropertyValue)]) -> PropertyMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_create_and_get_node() {
        let mut store = GraphStore::new();
        let id = store.create_node("Project", props(&[("id", 1i64.into())])).unwrap();

        assert_eq!(store.node_count(), 1);
        let node = store.get_node(id).unwrap();
        assert!(node.has_label(&Label::new("Project")));
        assert_eq!(node.get_property("id"), Some(&PropertyValue::Integer(1)));
    }

    #[test]
    fn test_edge_validation() {
        let mut store = GraphStore::new();
        let node = store.create_node("Project", PropertyMap::new()).unwrap();
        let invalid = NodeId::new(999);

        let result = store.create_edge(invalid, node, "belongs", PropertyMap::new());
        assert_eq!(result, Err(GraphError::InvalidEdgeSource(invalid)));

        let result = store.create_edge(node, invalid, "belongs", PropertyMap::new());
        assert_eq!(result, Err(GraphError::InvalidEdgeTarget(invalid)));
    }

    #[test]
    fn test_unique_constraint_rejects_duplicates() {
        let mut store = GraphStore::new();
        let label = Label::new("Organization");
        assert!(store.ensure_constraint(&label, "name").unwrap());
        assert!(!store.ensure_constraint(&label, "name").unwrap());

        let first = store.create_node("Organization", props(&[("name", "ACME".into())])).unwrap();
        let err = store
            .create_node("Organization", props(&[("name", "ACME".into())]))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::DuplicateKey {
                key: NodeKey::new("Organization", "name", "ACME"),
                existing: first
            }
        );
        // Same value under another label is fine
        assert!(store.create_node("Person", props(&[("name", "ACME".into())])).is_ok());
    }

    #[test]
    fn test_constraint_over_existing_duplicates_fails() {
        let mut store = GraphStore::new();
        store.create_node("Person", props(&[("name", "Ann".into())])).unwrap();
        store.create_node("Person", props(&[("name", "Ann".into())])).unwrap();

        assert!(matches!(
            store.ensure_constraint(&Label::new("Person"), "name"),
            Err(GraphError::DuplicateKey { .. })
        ));
        assert!(!store.has_constraint(&Label::new("Person"), "name"));
    }

    #[test]
    fn test_merge_node_is_idempotent() {
        let mut store = GraphStore::new();
        store.ensure_constraint(&Label::new("Project"), "id").unwrap();
        let key = NodeKey::new("Project", "id", 42i64);

        let (a, created) = store.merge_node(&key, props(&[("acronym", "GRID".into())])).unwrap();
        assert!(created);
        let (b, created) = store.merge_node(&key, props(&[("status", "SIGNED".into())])).unwrap();
        assert!(!created);
        assert_eq!(a, b);
        assert_eq!(store.node_count(), 1);

        let node = store.get_node(a).unwrap();
        assert_eq!(node.get_property("acronym").and_then(|v| v.as_string()), Some("GRID"));
        assert_eq!(node.get_property("status").and_then(|v| v.as_string()), Some("SIGNED"));
    }

    #[test]
    fn test_typed_keys_do_not_collide() {
        let mut store = GraphStore::new();
        store.ensure_constraint(&Label::new("Project"), "id").unwrap();
        let (a, _) = store.merge_node(&NodeKey::new("Project", "id", 7i64), PropertyMap::new()).unwrap();
        let (b, _) = store.merge_node(&NodeKey::new("Project", "id", "7"), PropertyMap::new()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_find_node_without_constraint_scans_label() {
        let mut store = GraphStore::new();
        let id = store.create_node("Keyphrase", props(&[("name", "energy".into())])).unwrap();
        assert_eq!(store.find_node(&NodeKey::new("Keyphrase", "name", "energy")), Some(id));
        assert_eq!(store.find_node(&NodeKey::new("Keyphrase", "name", "solar")), None);
    }

    #[test]
    fn test_rekeying_updates_index() {
        let mut store = GraphStore::new();
        store.ensure_constraint(&Label::new("Person"), "name").unwrap();
        let id = store.create_node("Person", props(&[("name", "Ann".into())])).unwrap();

        store.set_node_property(id, "name", "Anna").unwrap();
        assert_eq!(store.find_node(&NodeKey::new("Person", "name", "Anna")), Some(id));
        assert_eq!(store.find_node(&NodeKey::new("Person", "name", "Ann")), None);
        assert!(store.create_node("Person", props(&[("name", "Ann".into())])).is_ok());
    }

    #[test]
    fn test_merge_edge_is_idempotent() {
        let mut store = GraphStore::new();
        let a = store.create_node("Organization", PropertyMap::new()).unwrap();
        let p = store.create_node("Project", PropertyMap::new()).unwrap();

        let (e1, created) = store.merge_edge(a, p, "participates_in", PropertyMap::new()).unwrap();
        assert!(created);
        let (e2, created) = store.merge_edge(a, p, "participates_in", PropertyMap::new()).unwrap();
        assert!(!created);
        assert_eq!(e1, e2);

        // Other type or direction is another relationship
        let (e3, _) = store.merge_edge(a, p, "coordinates", PropertyMap::new()).unwrap();
        let (e4, _) = store.merge_edge(p, a, "participates_in", PropertyMap::new()).unwrap();
        assert_ne!(e1, e3);
        assert_ne!(e1, e4);
        assert_eq!(store.edge_count(), 3);
    }

    #[test]
    fn test_delete_edges_by_type() {
        let mut store = GraphStore::new();
        let a = store.create_node("Organization", PropertyMap::new()).unwrap();
        let b = store.create_node("Organization", PropertyMap::new()).unwrap();
        let p = store.create_node("Project", PropertyMap::new()).unwrap();
        store.create_edge(a, b, "is_similar", props(&[("score", 0.5.into())])).unwrap();
        store.create_edge(b, a, "is_similar", props(&[("score", 0.5.into())])).unwrap();
        store.create_edge(a, p, "participates_in", PropertyMap::new()).unwrap();

        assert_eq!(store.delete_edges_by_type(&EdgeType::new("is_similar")), 2);
        assert_eq!(store.edge_count(), 1);
        assert!(store.get_edges_by_type(&EdgeType::new("is_similar")).is_empty());
        assert_eq!(store.get_outgoing_edges(a).len(), 1);
        assert!(store.get_incoming_edges(a).is_empty());
        assert_eq!(store.find_edge(a, b, &EdgeType::new("is_similar")), None);
    }

    #[test]
    fn test_delete_edge_promotes_parallel_edge() {
        let mut store = GraphStore::new();
        let a = store.create_node("Person", PropertyMap::new()).unwrap();
        let d = store.create_node("Deliverable", PropertyMap::new()).unwrap();
        let first = store.create_edge(a, d, "writes", PropertyMap::new()).unwrap();
        let second = store.create_edge(a, d, "writes", PropertyMap::new()).unwrap();

        store.delete_edge(first).unwrap();
        assert_eq!(store.find_edge(a, d, &EdgeType::new("writes")), Some(second));
        assert_eq!(store.delete_edge(first), Err(GraphError::EdgeNotFound(first)));
    }

    #[test]
    fn test_remove_label_property() {
        let mut store = GraphStore::new();
        let a = store.create_node("Project", props(&[("pagerank", 0.2.into())])).unwrap();
        store.create_node("Project", PropertyMap::new()).unwrap();

        assert_eq!(store.remove_label_property(&Label::new("Project"), "pagerank"), 1);
        assert!(store.get_node(a).unwrap().get_property("pagerank").is_none());
    }

    #[test]
    fn test_recovered_ids_are_kept() {
        let mut store = GraphStore::new();
        store
            .insert_recovered_node(Node::new(NodeId::new(10), "Project"))
            .unwrap();
        store
            .insert_recovered_node(Node::new(NodeId::new(12), "Project"))
            .unwrap();
        store
            .insert_recovered_edge(Edge::new(EdgeId::new(5), NodeId::new(10), NodeId::new(12), "is_similar"))
            .unwrap();

        assert_eq!(
            store.insert_recovered_node(Node::new(NodeId::new(10), "Project")),
            Err(GraphError::NodeAlreadyExists(NodeId::new(10)))
        );

        let next = store.create_node("Project", PropertyMap::new()).unwrap();
        assert_eq!(next, NodeId::new(13));
        let edge = store.create_edge(next, NodeId::new(10), "is_similar", PropertyMap::new()).unwrap();
        assert_eq!(edge, EdgeId::new(6));
    }

    #[test]
    fn test_label_index_is_ordered() {
        let mut store = GraphStore::new();
        for _ in 0..5 {
            store.create_node("Keyphrase", PropertyMap::new()).unwrap();
        }
        let ids: Vec<u64> = store
            .get_nodes_by_label(&Label::new("Keyphrase"))
            .iter()
            .map(|n| n.id.as_u64())
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(store.label_count(&Label::new("Keyphrase")), 5);
    }
}
