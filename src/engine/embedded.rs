//! EmbeddedEngine: in-process graph engine
//!
//! Wraps a [`GraphStore`] behind a lock, keeps named projections and trained
//! models next to it, and runs the algorithm crate directly. State is loaded
//! from and flushed to a snapshot file when a path is configured.

use super::command::{
    AlgorithmOutcome, AlgorithmRequest, ConstraintStatus, ModelInfo, ReadQuery, Row, TrainMode, WriteCommand,
    WriteSummary,
};
use super::projection::{Projection, ProjectionHandle};
use super::snapshot::{self, StoredModel};
use super::view::{ProjectedGraph, ProjectedRelationship};
use super::{EngineError, EngineResult, GraphEngine};
use crate::graph::{EdgeType, GraphStore, Label, NodeId, NodeKey, PropertyMap, PropertyValue};
use cordis_kg_algorithms::{
    holdout_split, louvain, node_similarity, page_rank, train_link_predictor, LinkPredictionConfig, LouvainConfig,
    NodeSimilarityConfig, PageRankConfig,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct EngineState {
    store: GraphStore,
    projections: BTreeMap<String, ProjectedGraph>,
    models: BTreeMap<String, StoredModel>,
    anonymous_counter: u64,
    dirty: bool,
}

/// In-process implementation of [`GraphEngine`]
#[derive(Debug)]
pub struct EmbeddedEngine {
    state: RwLock<EngineState>,
    snapshot_path: Option<PathBuf>,
    closed: bool,
}

impl EmbeddedEngine {
    /// Open an engine backed by the snapshot at `path` (created on first flush).
    ///
    /// An unreadable snapshot is reported as a connectivity failure.
    pub fn open(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let (store, models) = snapshot::load(path).map_err(|e| {
            EngineError::Connectivity(format!("cannot open graph snapshot {}: {}", path.display(), e))
        })?;

        info!(path = %path.display(), nodes = store.node_count(), "embedded engine opened");
        Ok(Self {
            state: RwLock::new(EngineState {
                store,
                models,
                ..EngineState::default()
            }),
            snapshot_path: Some(path.to_path_buf()),
            closed: false,
        })
    }

    /// An engine that lives only in memory
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(EngineState::default()),
            snapshot_path: None,
            closed: false,
        }
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    fn read(&self) -> EngineResult<RwLockReadGuard<'_, EngineState>> {
        self.state.read().map_err(|_| EngineError::LockPoisoned)
    }

    fn write(&self) -> EngineResult<RwLockWriteGuard<'_, EngineState>> {
        self.state.write().map_err(|_| EngineError::LockPoisoned)
    }

    /// Write pending changes to the snapshot, if one is configured
    pub fn flush(&self) -> EngineResult<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let mut state = self.write()?;
        if !state.dirty && path.exists() {
            return Ok(());
        }
        snapshot::save(path, &state.store, &state.models)?;
        state.dirty = false;
        Ok(())
    }

    /// Flush and release the engine
    pub fn close(mut self) -> EngineResult<()> {
        let result = self.flush();
        self.closed = true;
        info!("embedded engine closed");
        result
    }

    /// Number of nodes currently stored
    pub fn node_count(&self) -> EngineResult<usize> {
        Ok(self.read()?.store.node_count())
    }

    /// Run `f` against the store under a read lock
    pub fn with_store<T>(&self, f: impl FnOnce(&GraphStore) -> T) -> EngineResult<T> {
        Ok(f(&self.read()?.store))
    }

    /// Whether a model with this name is stored
    pub fn has_model(&self, name: &str) -> EngineResult<bool> {
        Ok(self.read()?.models.contains_key(name))
    }
}

impl Drop for EmbeddedEngine {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.flush() {
            warn!(error = %e, "failed to flush graph snapshot on drop");
        }
    }
}

fn count_row(count: usize) -> Row {
    let mut row = Row::new();
    row.insert("count".to_string(), count.into());
    row
}

/// Write `value(node)` as `property` on every node of the projection
fn write_node_property(
    store: &mut GraphStore,
    graph: &ProjectedGraph,
    property: &str,
    mut value: impl FnMut(NodeId) -> Option<PropertyValue>,
) -> EngineResult<usize> {
    let mut written = 0;
    for idx in 0..graph.node_count() {
        let id = graph.node_id(idx);
        if let Some(v) = value(id) {
            store.set_node_property(id, property, v)?;
            written += 1;
        }
    }
    Ok(written)
}

fn pair_space(store: &GraphStore, labels: &[Label], rel_type: &EdgeType) -> Row {
    let wanted: BTreeSet<&Label> = labels.iter().collect();
    let label_of = |id: NodeId| -> Option<&Label> {
        store
            .get_node(id)
            .and_then(|n| n.labels.iter().find(|l| wanted.contains(l)))
    };

    let mut nodes: BTreeSet<NodeId> = BTreeSet::new();
    for label in labels {
        nodes.extend(store.get_nodes_by_label(label).iter().map(|n| n.id));
    }

    let mut source_labels: BTreeSet<&Label> = BTreeSet::new();
    let mut target_labels: BTreeSet<&Label> = BTreeSet::new();
    let mut pairs: BTreeSet<(NodeId, NodeId)> = BTreeSet::new();
    for edge in store.get_edges_by_type(rel_type) {
        let (Some(s), Some(t)) = (label_of(edge.source), label_of(edge.target)) else {
            continue;
        };
        source_labels.insert(s);
        target_labels.insert(t);
        if edge.source != edge.target {
            pairs.insert((edge.source.min(edge.target), edge.source.max(edge.target)));
        }
    }

    let self_referential = if source_labels.is_empty() {
        labels.len() == 1
    } else {
        source_labels == target_labels
    };
    let count_labels = |set: &BTreeSet<&Label>| -> usize {
        if set.is_empty() {
            nodes.len()
        } else {
            set.iter().map(|l| store.label_count(l)).sum()
        }
    };

    let mut row = Row::new();
    row.insert("nodeCount".to_string(), nodes.len().into());
    row.insert("relationshipCount".to_string(), pairs.len().into());
    row.insert("selfReferential".to_string(), self_referential.into());
    row.insert("sourceLabelCount".to_string(), count_labels(&source_labels).into());
    row.insert("targetLabelCount".to_string(), count_labels(&target_labels).into());
    row
}

/// Group oriented entries by unordered pair so both directions stay together
fn group_by_pair(entries: &[ProjectedRelationship]) -> Vec<Vec<ProjectedRelationship>> {
    let mut groups: BTreeMap<(usize, usize), Vec<ProjectedRelationship>> = BTreeMap::new();
    for &(s, t, w) in entries {
        groups.entry((s.min(t), s.max(t))).or_default().push((s, t, w));
    }
    groups.into_values().collect()
}

impl GraphEngine for EmbeddedEngine {
    fn verify_connectivity(&self) -> EngineResult<()> {
        let state = self
            .state
            .read()
            .map_err(|_| EngineError::Connectivity("engine state is poisoned".to_string()))?;
        debug!(nodes = state.store.node_count(), "engine reachable");
        Ok(())
    }

    fn ensure_unique_constraint(&self, label: &Label, property: &str) -> EngineResult<ConstraintStatus> {
        let mut state = self.write()?;
        let created = state.store.ensure_constraint(label, property)?;
        if created {
            state.dirty = true;
            Ok(ConstraintStatus::Created)
        } else {
            Ok(ConstraintStatus::AlreadyPresent)
        }
    }

    fn upsert_node(&self, key: &NodeKey, properties: PropertyMap) -> EngineResult<WriteSummary> {
        let mut state = self.write()?;
        let properties_set = properties.len();
        let (_, created) = state.store.merge_node(key, properties)?;
        state.dirty = true;
        Ok(WriteSummary {
            nodes_created: usize::from(created),
            properties_set: properties_set + usize::from(created),
            ..WriteSummary::default()
        })
    }

    fn upsert_relationship(
        &self,
        rel_type: &EdgeType,
        from: &NodeKey,
        to: &NodeKey,
        properties: PropertyMap,
    ) -> EngineResult<WriteSummary> {
        let mut state = self.write()?;
        let source = state
            .store
            .find_node(from)
            .ok_or_else(|| EngineError::MissingEndpoint(from.clone()))?;
        let target = state
            .store
            .find_node(to)
            .ok_or_else(|| EngineError::MissingEndpoint(to.clone()))?;

        let properties_set = properties.len();
        let (_, created) = state.store.merge_edge(source, target, rel_type.clone(), properties)?;
        state.dirty = true;
        Ok(WriteSummary {
            relationships_created: usize::from(created),
            properties_set,
            ..WriteSummary::default()
        })
    }

    fn execute_read(&self, query: &ReadQuery) -> EngineResult<Vec<Row>> {
        let state = self.read()?;
        let store = &state.store;

        let rows = match query {
            ReadQuery::CountNodes { labels } => {
                let mut ids: BTreeSet<NodeId> = BTreeSet::new();
                for label in labels {
                    ids.extend(store.get_nodes_by_label(label).iter().map(|n| n.id));
                }
                vec![count_row(ids.len())]
            }
            ReadQuery::CountRelationships { rel_type } => vec![count_row(store.edge_type_count(rel_type))],
            ReadQuery::NodeByKey(key) => store
                .find_node(key)
                .and_then(|id| store.get_node(id))
                .map(|node| {
                    let mut row = Row::new();
                    row.insert("nodeId".to_string(), PropertyValue::Integer(node.id.as_u64() as i64));
                    for (k, v) in &node.properties {
                        row.insert(k.clone(), v.clone());
                    }
                    row
                })
                .into_iter()
                .collect(),
            ReadQuery::Relationships { rel_type, limit } => store
                .get_edges_by_type(rel_type)
                .into_iter()
                .take(limit.unwrap_or(usize::MAX))
                .map(|edge| {
                    let mut row = Row::new();
                    row.insert("source".to_string(), PropertyValue::Integer(edge.source.as_u64() as i64));
                    row.insert("target".to_string(), PropertyValue::Integer(edge.target.as_u64() as i64));
                    for (k, v) in &edge.properties {
                        row.insert(k.clone(), v.clone());
                    }
                    row
                })
                .collect(),
            ReadQuery::PairSpace { labels, rel_type } => vec![pair_space(store, labels, rel_type)],
        };
        Ok(rows)
    }

    fn execute_write(&self, command: &WriteCommand) -> EngineResult<WriteSummary> {
        let mut state = self.write()?;
        let summary = match command {
            WriteCommand::DeleteRelationships { rel_type } => {
                let deleted = state.store.delete_edges_by_type(rel_type);
                debug!(rel_type = %rel_type, deleted, "relationships deleted");
                WriteSummary {
                    relationships_deleted: deleted,
                    ..WriteSummary::default()
                }
            }
            WriteCommand::RemoveNodeProperty { label, property } => WriteSummary {
                properties_set: state.store.remove_label_property(label, property),
                ..WriteSummary::default()
            },
            WriteCommand::DropModel { name } => WriteSummary {
                models_dropped: usize::from(state.models.remove(name).is_some()),
                ..WriteSummary::default()
            },
        };
        state.dirty = true;
        Ok(summary)
    }

    fn define_projection(&self, projection: &Projection, name: Option<&str>) -> EngineResult<ProjectionHandle> {
        let mut state = self.write()?;
        let handle = match name {
            Some(name) => {
                if state.projections.contains_key(name) {
                    return Err(EngineError::ProjectionExists(name.to_string()));
                }
                ProjectionHandle {
                    name: name.to_string(),
                    anonymous: false,
                }
            }
            None => {
                state.anonymous_counter += 1;
                ProjectionHandle {
                    name: format!("__anonymous_{}", state.anonymous_counter),
                    anonymous: true,
                }
            }
        };

        let graph = ProjectedGraph::materialize(&state.store, projection)?;
        debug!(
            projection = %handle.name,
            nodes = graph.node_count(),
            spec = %projection,
            "projection defined"
        );
        state.projections.insert(handle.name.clone(), graph);
        Ok(handle)
    }

    fn drop_projection(&self, handle: &ProjectionHandle) -> EngineResult<()> {
        let mut state = self.write()?;
        state
            .projections
            .remove(&handle.name)
            .map(|_| debug!(projection = %handle.name, "projection dropped"))
            .ok_or_else(|| EngineError::UnknownProjection(handle.name.clone()))
    }

    fn run_algorithm(&self, handle: &ProjectionHandle, request: &AlgorithmRequest) -> EngineResult<AlgorithmOutcome> {
        let mut guard = self.write()?;
        let EngineState {
            store,
            projections,
            models,
            dirty,
            ..
        } = &mut *guard;

        let graph = projections
            .get_mut(&handle.name)
            .ok_or_else(|| EngineError::UnknownProjection(handle.name.clone()))?;

        debug!(projection = %handle.name, algorithm = request.name(), "running algorithm");

        let outcome = match request {
            AlgorithmRequest::NodeSimilarity {
                similarity_cutoff,
                top_k,
                write_relationship,
                write_property,
            } => {
                let view = graph.view(None)?;
                let config = NodeSimilarityConfig {
                    similarity_cutoff: *similarity_cutoff,
                    top_k: *top_k,
                };
                let pairs = node_similarity(&view, &config);
                let nodes_compared = (0..view.node_count).filter(|&i| view.out_degree(i) > 0).count();

                for pair in &pairs {
                    let mut properties = PropertyMap::new();
                    properties.insert(write_property.clone(), pair.score.into());
                    store.merge_edge(
                        NodeId::new(pair.source),
                        NodeId::new(pair.target),
                        write_relationship.clone(),
                        properties,
                    )?;
                }
                *dirty = true;

                AlgorithmOutcome::Similarity {
                    nodes_compared,
                    relationships_written: pairs.len(),
                }
            }

            AlgorithmRequest::PageRank {
                damping_factor,
                max_iterations,
                write_property,
            } => {
                if !(*damping_factor > 0.0 && *damping_factor < 1.0) {
                    return Err(EngineError::Algorithm(format!(
                        "dampingFactor must be within (0, 1), got {}",
                        damping_factor
                    )));
                }
                let view = graph.view(None)?;
                let config = PageRankConfig {
                    damping_factor: *damping_factor,
                    iterations: *max_iterations,
                    ..PageRankConfig::default()
                };
                let result = page_rank(&view, &config);
                let nodes_written = write_node_property(store, graph, write_property, |id| {
                    result.scores.get(&id.as_u64()).map(|&s| PropertyValue::Float(s))
                })?;
                *dirty = true;

                AlgorithmOutcome::PageRank {
                    nodes_written,
                    iterations_run: result.iterations_run,
                    converged: result.converged,
                }
            }

            AlgorithmRequest::Louvain {
                max_levels,
                max_iterations,
                write_property,
            } => {
                let view = graph.view(None)?;
                let config = LouvainConfig {
                    max_levels: *max_levels,
                    max_iterations: *max_iterations,
                };
                let result = louvain(&view, &config);
                let nodes_written = write_node_property(store, graph, write_property, |id| {
                    result
                        .communities
                        .get(&id.as_u64())
                        .map(|&c| PropertyValue::Integer(c as i64))
                })?;
                *dirty = true;

                AlgorithmOutcome::Louvain {
                    nodes_written,
                    community_count: result.community_count,
                    modularity: result.modularity,
                    levels: result.levels,
                }
            }

            AlgorithmRequest::SplitRelationships {
                relationship,
                remaining_type,
                holdout_type,
                holdout_fraction,
                random_seed,
            } => {
                if handle.anonymous {
                    return Err(EngineError::Algorithm(
                        "splitRelationships requires a named projection".to_string(),
                    ));
                }
                let groups = group_by_pair(graph.relationships_of(relationship)?);
                let (remaining, holdout) = holdout_split(&groups, *holdout_fraction, *random_seed)?;
                let counts = (remaining.len(), holdout.len());
                graph.insert_relationships(remaining_type.clone(), remaining.concat());
                graph.insert_relationships(holdout_type.clone(), holdout.concat());

                AlgorithmOutcome::Split {
                    remaining: counts.0,
                    holdout: counts.1,
                }
            }

            AlgorithmRequest::LinkPredictionTrain {
                train_relationship,
                test_relationship,
                model_name,
                class_ratio,
                validation_folds,
                random_seed,
                params,
                mode,
                replace,
            } => {
                if *mode == TrainMode::Train && !*replace && models.contains_key(model_name) {
                    return Err(EngineError::Algorithm(format!("model {} already exists", model_name)));
                }

                let view = graph.view(Some(std::slice::from_ref(train_relationship)))?;
                let train_pairs: Vec<(usize, usize)> = graph
                    .relationships_of(train_relationship)?
                    .iter()
                    .map(|&(s, t, _)| (s, t))
                    .collect();
                let test_pairs: Vec<(usize, usize)> = graph
                    .relationships_of(test_relationship)?
                    .iter()
                    .map(|&(s, t, _)| (s, t))
                    .collect();

                let config = LinkPredictionConfig {
                    class_ratio: *class_ratio,
                    validation_folds: *validation_folds,
                    random_seed: *random_seed,
                    params: params.clone(),
                    ..LinkPredictionConfig::default()
                };
                let trained = train_link_predictor(&view, &train_pairs, &test_pairs, &config)?;

                let info = ModelInfo {
                    name: model_name.clone(),
                    best_parameters: trained.model.params,
                    validation_scores: trained.validation.clone(),
                    train_aucpr: trained.train_aucpr,
                    test_aucpr: trained.test_aucpr,
                    class_ratio: *class_ratio,
                    stored: *mode == TrainMode::Train,
                };
                if info.stored {
                    models.insert(
                        model_name.clone(),
                        StoredModel {
                            info: info.clone(),
                            model: trained.model,
                        },
                    );
                    *dirty = true;
                }

                AlgorithmOutcome::LinkPrediction(info)
            }
        };

        Ok(outcome)
    }
}
