mod common;

use common::{write_fixture, FixedExtractor};
use cordis_kg::engine::{EmbeddedEngine, GraphEngine, ReadQuery};
use cordis_kg::graph::{EdgeType, Label, NodeKey, PropertyValue};
use cordis_kg::ingest::tabular::{DelimitedFile, TabularSource};
use cordis_kg::{Pipeline, PipelineConfig, Stage};
use std::collections::BTreeSet;
use tempfile::TempDir;

fn count_nodes(engine: &EmbeddedEngine, label: &str) -> i64 {
    engine
        .execute_read(&ReadQuery::CountNodes {
            labels: vec![Label::new(label)],
        })
        .unwrap()[0]["count"]
        .as_integer()
        .unwrap()
}

fn count_rels(engine: &EmbeddedEngine, rel: &str) -> i64 {
    engine
        .execute_read(&ReadQuery::CountRelationships {
            rel_type: EdgeType::new(rel),
        })
        .unwrap()[0]["count"]
        .as_integer()
        .unwrap()
}

fn node(engine: &EmbeddedEngine, key: NodeKey) -> indexmap::IndexMap<String, PropertyValue> {
    engine
        .execute_read(&ReadQuery::NodeByKey(key))
        .unwrap()
        .into_iter()
        .next()
        .expect("node exists")
}

fn build(config: PipelineConfig, engine: &EmbeddedEngine) -> cordis_kg::RunReport {
    Pipeline::new(engine, config)
        .with_extractor(Box::new(FixedExtractor))
        .run()
        .expect("pipeline run")
}

#[test]
fn test_energy_project_end_to_end() {
    let dir = TempDir::new().unwrap();
    let config = write_fixture(dir.path());
    let engine = EmbeddedEngine::in_memory();

    let report = build(config, &engine);
    assert_eq!(report.reached, Stage::GraphBuilt);
    assert_eq!(report.exports.len(), 2);

    // Near-duplicates collapse into one phrase in the interchange file
    let exported = DelimitedFile::new(dir.path().join("project_keyphrases.csv"), ',')
        .records()
        .unwrap();
    assert_eq!(exported.len(), 2);
    assert_eq!(exported[0].get("id"), Some("101"));
    assert!(exported.iter().all(|row| row.get("keyphrases") == Some("energy")));

    assert_eq!(count_nodes(&engine, "Project"), 2);
    assert_eq!(count_nodes(&engine, "Keyphrase"), 1);
    assert_eq!(count_nodes(&engine, "Organization"), 2);
    assert_eq!(count_nodes(&engine, "Deliverable"), 1);
    assert_eq!(count_nodes(&engine, "Person"), 2);

    // Alpha Energy coordinates both projects; both organizations take part in each
    assert_eq!(count_rels(&engine, "coordinates"), 2);
    assert_eq!(count_rels(&engine, "participates_in"), 4);
    assert_eq!(count_rels(&engine, "belongs"), 1);
    assert_eq!(count_rels(&engine, "writes"), 2);
    // Both projects and deliverable 9001 include "energy"
    assert_eq!(count_rels(&engine, "includes"), 3);

    let project = node(&engine, NodeKey::new("Project", "id", 101i64));
    assert_eq!(project["acronym"], PropertyValue::String("STORE".to_string()));
    assert_eq!(project["url"], PropertyValue::String("https://store.example.eu".to_string()));
    assert_eq!(project["totalCost"], PropertyValue::Float(1500000.5));
    let grid = node(&engine, NodeKey::new("Project", "id", 102i64));
    assert_eq!(grid["totalCost"], PropertyValue::Float(2500000.75));

    // Deliverable 9002 points at a project that is not in the dump
    assert!(report.total_gaps() >= 1);
}

fn node_id(engine: &EmbeddedEngine, key: NodeKey) -> i64 {
    node(engine, key)["nodeId"].as_integer().expect("node id")
}

#[test]
fn test_projects_sharing_organizations_are_similar() {
    let dir = TempDir::new().unwrap();
    let mut config = write_fixture(dir.path());
    config.session.run_algorithms = true;
    config.similarity.organizations_projects = true;
    config.similarity.persons = false;
    let engine = EmbeddedEngine::in_memory();

    let report = build(config, &engine);
    assert_eq!(report.reached, Stage::CommunitiesComputed);
    assert_eq!(count_nodes(&engine, "Project"), 2);
    assert_eq!(count_nodes(&engine, "Organization"), 2);
    assert_eq!(count_rels(&engine, "coordinates"), 2);
    assert_eq!(count_rels(&engine, "participates_in"), 4);

    let scores: Vec<(i64, i64, f64)> = engine
        .execute_read(&ReadQuery::Relationships {
            rel_type: EdgeType::new("is_similar"),
            limit: None,
        })
        .unwrap()
        .iter()
        .map(|row| {
            (
                row["source"].as_integer().unwrap(),
                row["target"].as_integer().unwrap(),
                row["score"].as_float().unwrap(),
            )
        })
        .collect();
    assert_eq!(scores.len(), 4);

    let alpha = node_id(&engine, NodeKey::new("Organization", "name", "Alpha Energy"));
    let beta = node_id(&engine, NodeKey::new("Organization", "name", "Beta Grid"));
    let store = node_id(&engine, NodeKey::new("Project", "id", 101i64));
    let grid = node_id(&engine, NodeKey::new("Project", "id", 102i64));
    // Identical neighbor sets score 1.0 in both directions
    for (source, target) in [(alpha, beta), (beta, alpha), (store, grid), (grid, store)] {
        assert!(
            scores.contains(&(source, target, 1.0)),
            "missing is_similar {} -> {} in {:?}",
            source,
            target,
            scores
        );
    }
}

#[test]
fn test_construction_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let config = write_fixture(dir.path());
    let engine = EmbeddedEngine::in_memory();

    build(config.clone(), &engine);
    let snapshot = |engine: &EmbeddedEngine| {
        let labels = ["Project", "Deliverable", "Organization", "Person", "Keyphrase"]
            .map(|l| count_nodes(engine, l));
        let rels = ["participates_in", "coordinates", "includes", "belongs", "writes"].map(|r| count_rels(engine, r));
        (labels, rels)
    };
    let first = snapshot(&engine);

    let report = build(config, &engine);
    assert_eq!(snapshot(&engine), first);
    assert!(report.passes.iter().all(|p| p.written.nodes_created == 0));
    assert!(report.passes.iter().all(|p| p.written.relationships_created == 0));
}

#[test]
fn test_analytics_across_sessions() {
    let dir = TempDir::new().unwrap();
    let mut config = write_fixture(dir.path());
    let snapshot = dir.path().join("cordis-kg.snap");

    {
        let engine = EmbeddedEngine::open(&snapshot).unwrap();
        build(config.clone(), &engine);
        engine.close().unwrap();
    }

    config.session.extract_data = false;
    config.session.create = false;
    config.session.run_algorithms = true;

    let engine = EmbeddedEngine::open(&snapshot).unwrap();
    let report = Pipeline::new(&engine, config).run().unwrap();
    assert_eq!(report.reached, Stage::CommunitiesComputed);
    assert_eq!(report.communities.len(), 4);

    let similarity = report.similarity.as_ref().unwrap();
    assert_eq!(similarity.projections, 1);
    assert!(similarity.relationships_written >= 2);

    // The co-authors share their only deliverable
    let jane = node(&engine, NodeKey::new("Person", "name", "Jane Doe"));
    let john = node(&engine, NodeKey::new("Person", "name", "John Smith"));
    assert!(jane["community"].as_integer().is_some());
    assert_eq!(jane["community"], john["community"]);

    let project = node(&engine, NodeKey::new("Project", "id", 101i64));
    assert!(project["pagerank"].as_float().unwrap() > 0.0);
    engine.close().unwrap();
}

#[test]
fn test_similarity_recompute_is_stable() {
    let dir = TempDir::new().unwrap();
    let mut config = write_fixture(dir.path());
    config.session.run_algorithms = true;
    let engine = EmbeddedEngine::in_memory();

    let similar = |engine: &EmbeddedEngine| -> BTreeSet<(i64, i64)> {
        engine
            .execute_read(&ReadQuery::Relationships {
                rel_type: EdgeType::new("is_similar"),
                limit: None,
            })
            .unwrap()
            .iter()
            .map(|row| (row["source"].as_integer().unwrap(), row["target"].as_integer().unwrap()))
            .collect()
    };

    build(config.clone(), &engine);
    let first = similar(&engine);
    assert!(!first.is_empty());

    config.session.extract_data = false;
    config.session.create = false;
    let report = build(config, &engine);
    assert_eq!(similar(&engine), first);
    assert_eq!(report.similarity.unwrap().relationships_deleted, first.len());
}

#[test]
fn test_unreadable_snapshot_is_a_connectivity_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("garbage.snap"), b"not a snapshot").unwrap();
    let result = EmbeddedEngine::open(dir.path().join("garbage.snap"));
    assert!(matches!(result, Err(cordis_kg::EngineError::Connectivity(_))));
}
