//! Engine snapshot persistence
//!
//! The whole embedded graph (constraints, nodes, relationships and stored
//! models) is written as one gzip-compressed bincode document. Writes go to a
//! temporary sibling file first and are renamed into place.

use super::command::ModelInfo;
use crate::graph::{Edge, GraphError, GraphStore, Label, Node};
use cordis_kg_algorithms::LinkPredictionModel;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    #[error("Corrupt snapshot: {0}")]
    Corrupt(#[from] GraphError),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// A trained model kept by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredModel {
    pub info: ModelInfo,
    pub model: LinkPredictionModel,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    created_at: i64,
    constraints: Vec<(Label, String)>,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    models: Vec<StoredModel>,
}

/// Write the store and models to `path`
pub fn save(path: &Path, store: &GraphStore, models: &BTreeMap<String, StoredModel>) -> SnapshotResult<()> {
    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        created_at: chrono::Utc::now().timestamp_millis(),
        constraints: store
            .constraints()
            .map(|(label, property)| (label.clone(), property.to_string()))
            .collect(),
        nodes: store.all_nodes().cloned().collect(),
        edges: store.all_edges().cloned().collect(),
        models: models.values().cloned().collect(),
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp = path.with_extension("tmp");
    {
        let file = File::create(&tmp)?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        bincode::serialize_into(&mut encoder, &snapshot)?;
        encoder.finish()?.flush()?;
    }
    std::fs::rename(&tmp, path)?;

    info!(
        path = %path.display(),
        nodes = snapshot.nodes.len(),
        edges = snapshot.edges.len(),
        models = snapshot.models.len(),
        "snapshot written"
    );
    Ok(())
}

/// Load a snapshot into a fresh store. A missing file yields an empty graph.
pub fn load(path: &Path) -> SnapshotResult<(GraphStore, BTreeMap<String, StoredModel>)> {
    let mut store = GraphStore::new();
    let mut models = BTreeMap::new();

    if !path.exists() {
        debug!(path = %path.display(), "no snapshot, starting empty");
        return Ok((store, models));
    }

    let file = File::open(path)?;
    let snapshot: Snapshot = bincode::deserialize_from(GzDecoder::new(BufReader::new(file)))?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(snapshot.version));
    }

    for (label, property) in &snapshot.constraints {
        store.ensure_constraint(label, property)?;
    }
    for node in snapshot.nodes {
        store.insert_recovered_node(node)?;
    }
    for edge in snapshot.edges {
        store.insert_recovered_edge(edge)?;
    }
    for stored in snapshot.models {
        models.insert(stored.info.name.clone(), stored);
    }

    info!(
        path = %path.display(),
        nodes = store.node_count(),
        edges = store.edge_count(),
        models = models.len(),
        "snapshot loaded"
    );
    Ok((store, models))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeType, NodeKey, PropertyMap};
    use tempfile::TempDir;

    #[test]
    fn test_snapshot_restores_graph_and_constraints() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("graph.snap");

        let mut store = GraphStore::new();
        store.ensure_constraint(&Label::new("Project"), "id").unwrap();
        let (p, _) = store.merge_node(&NodeKey::new("Project", "id", 1i64), PropertyMap::new()).unwrap();
        let (k, _) = store.merge_node(&NodeKey::new("Keyphrase", "name", "energy"), PropertyMap::new()).unwrap();
        store.create_edge(p, k, "includes", PropertyMap::new()).unwrap();
        save(&path, &store, &BTreeMap::new()).unwrap();

        let (restored, models) = load(&path).unwrap();
        assert!(models.is_empty());
        assert_eq!(restored.node_count(), 2);
        assert_eq!(restored.edge_count(), 1);
        assert!(restored.has_constraint(&Label::new("Project"), "id"));
        assert_eq!(restored.find_node(&NodeKey::new("Project", "id", 1i64)), Some(p));
        assert_eq!(restored.find_edge(p, k, &EdgeType::new("includes")).is_some(), true);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_missing_snapshot_is_empty() {
        let dir = TempDir::new().unwrap();
        let (store, models) = load(&dir.path().join("absent.snap")).unwrap();
        assert!(store.is_empty());
        assert!(models.is_empty());
    }

    #[test]
    fn test_garbage_snapshot_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.snap");
        std::fs::write(&path, b"not a snapshot").unwrap();
        assert!(load(&path).is_err());
    }
}
