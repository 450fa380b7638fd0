//! Stage operations over a constructed graph

use super::scope::ProjectionScope;
use super::stage::Stage;
use super::{StageError, StageResult};
use crate::engine::{
    AlgorithmOutcome, AlgorithmRequest, ConstraintStatus, EngineError, GraphEngine, ModelInfo, Orientation, Projection, ReadQuery,
    RelEntry, TrainMode, WriteCommand,
};
use crate::graph::{EdgeType, Label, PropertyValue};
use crate::ingest::GraphBuilder;
use crate::schema;
use cordis_kg_algorithms::{LogisticParams, DEFAULT_PENALTIES};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Node similarity parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityParams {
    pub cutoff: f64,
    pub top_k: usize,
}

impl Default for SimilarityParams {
    fn default() -> Self {
        Self { cutoff: 0.23, top_k: 1 }
    }
}

/// PageRank parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentralityParams {
    pub damping_factor: f64,
    pub max_iterations: usize,
}

impl Default for CentralityParams {
    fn default() -> Self {
        Self {
            damping_factor: 0.85,
            max_iterations: 20,
        }
    }
}

/// Louvain parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunityParams {
    pub max_levels: usize,
    pub max_iterations: usize,
}

impl Default for CommunityParams {
    fn default() -> Self {
        Self {
            max_levels: 10,
            max_iterations: 10,
        }
    }
}

/// Link prediction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkPredictionParams {
    /// Name of the projection holding the split relationship sets
    pub projection_name: String,
    pub model_name: String,
    /// Share of the relationships held out for testing
    pub holdout_fraction: f64,
    /// Share of the remaining relationships used for training
    pub train_fraction: f64,
    pub validation_folds: usize,
    pub random_seed: u64,
    /// Candidate L2 penalties, evaluated in order
    pub penalties: Vec<f64>,
    pub max_iterations: usize,
    pub mode: TrainMode,
}

impl Default for LinkPredictionParams {
    fn default() -> Self {
        Self {
            projection_name: "graph".to_string(),
            model_name: "LP".to_string(),
            holdout_fraction: 0.2,
            train_fraction: 1.0,
            validation_folds: 5,
            random_seed: 2,
            penalties: DEFAULT_PENALTIES.to_vec(),
            max_iterations: 1000,
            mode: TrainMode::Train,
        }
    }
}

impl LinkPredictionParams {
    pub fn candidates(&self) -> Vec<LogisticParams> {
        self.penalties
            .iter()
            .map(|&penalty| LogisticParams {
                penalty,
                max_iterations: self.max_iterations,
            })
            .collect()
    }
}

/// One relationship split inside a named projection
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipSplit {
    pub relationship: EdgeType,
    pub remaining_type: EdgeType,
    pub holdout_type: EdgeType,
    pub holdout_fraction: f64,
}

impl RelationshipSplit {
    /// `<rel>` into `<rel>_train` and `<rel>_test`
    pub fn holdout(relationship: &str, holdout_fraction: f64) -> Self {
        Self::with_suffixes(relationship, "train", "test", holdout_fraction)
    }

    pub fn with_suffixes(relationship: &str, remaining: &str, holdout: &str, holdout_fraction: f64) -> Self {
        RelationshipSplit {
            relationship: EdgeType::new(relationship),
            remaining_type: EdgeType::new(format!("{}_{}", relationship, remaining)),
            holdout_type: EdgeType::new(format!("{}_{}", relationship, holdout)),
            holdout_fraction,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimilarityReport {
    pub relationships_deleted: usize,
    pub projections: usize,
    pub nodes_compared: usize,
    pub relationships_written: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CentralityReport {
    pub nodes_written: usize,
    pub iterations_run: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommunityReport {
    pub projection: String,
    pub nodes_written: usize,
    pub community_count: usize,
    pub modularity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitReport {
    pub relationship: String,
    pub remaining: usize,
    pub holdout: usize,
}

/// Everything the link-prediction stage produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkPredictionReport {
    pub splits: Vec<SplitReport>,
    pub pair_space: PairSpace,
    pub model: ModelInfo,
}

/// Candidate pair space of one relationship type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PairSpace {
    pub node_count: usize,
    /// Distinct unordered node pairs already connected
    pub relationship_count: usize,
    /// Sources and targets share their labels
    pub self_referential: bool,
    pub source_count: usize,
    pub target_count: usize,
}

impl PairSpace {
    fn from_row(row: &crate::engine::Row) -> StageResult<Self> {
        let integer = |column: &str| -> StageResult<usize> {
            row.get(column)
                .and_then(PropertyValue::as_integer)
                .and_then(|v| usize::try_from(v).ok())
                .ok_or_else(|| StageError::UnexpectedResult(format!("pair space row lacks {}", column)))
        };
        Ok(PairSpace {
            node_count: integer("nodeCount")?,
            relationship_count: integer("relationshipCount")?,
            self_referential: row
                .get("selfReferential")
                .and_then(PropertyValue::as_boolean)
                .unwrap_or(false),
            source_count: integer("sourceLabelCount")?,
            target_count: integer("targetLabelCount")?,
        })
    }

    /// Every pair a link could connect
    pub fn max_pairs(&self) -> usize {
        if self.self_referential {
            self.node_count * self.node_count.saturating_sub(1) / 2
        } else {
            self.source_count * self.target_count
        }
    }

    /// Negative-to-positive ratio over the whole pair space
    pub fn class_ratio(&self) -> StageResult<f64> {
        let positives = self.relationship_count;
        if positives == 0 {
            return Err(StageError::NoRelationships);
        }
        let negatives = self.max_pairs().saturating_sub(positives);
        Ok(negatives as f64 / positives as f64)
    }
}

/// A projection over `node_labels`; bare relationship types take `orientation`
pub fn build_projection<L, R>(node_labels: L, rel_entries: R, orientation: Orientation) -> Projection
where
    L: IntoIterator,
    L::Item: Into<Label>,
    R: IntoIterator,
    R::Item: Into<RelEntry>,
{
    Projection::new(node_labels, rel_entries, orientation)
}

/// Runs the analytics stages in order against one engine.
///
/// Every operation checks its stage precondition before touching the engine
/// and advances the stage only when it succeeds.
pub struct AnalyticsOrchestrator<'e, E: GraphEngine + ?Sized> {
    engine: &'e E,
    stage: Stage,
}

impl<'e, E: GraphEngine + ?Sized> AnalyticsOrchestrator<'e, E> {
    pub fn new(engine: &'e E) -> Self {
        Self {
            engine,
            stage: Stage::Idle,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn engine(&self) -> &'e E {
        self.engine
    }

    fn check(&self, operation: &'static str, target: Stage) -> StageResult<()> {
        if self.stage.permits(target) {
            Ok(())
        } else {
            Err(StageError::PreconditionViolation {
                operation,
                current: self.stage,
                required: Stage::required_for(target),
            })
        }
    }

    /// Run `op` as the operation producing `target`.
    ///
    /// The stage is left untouched when the precondition or `op` fails.
    fn advance<T, Err>(
        &mut self,
        operation: &'static str,
        target: Stage,
        op: impl FnOnce(&'e E) -> Result<T, Err>,
    ) -> Result<T, Err>
    where
        Err: From<StageError>,
    {
        self.check(operation, target)?;
        let started = Instant::now();
        let value = op(self.engine)?;
        if self.stage != target {
            info!(
                operation,
                stage = %target,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "stage reached"
            );
        } else {
            debug!(operation, stage = %target, elapsed_ms = started.elapsed().as_millis() as u64, "stage repeated");
        }
        self.stage = target;
        Ok(value)
    }

    /// Declare the entity key constraints
    pub fn ensure_constraints(&mut self) -> StageResult<Vec<(Label, ConstraintStatus)>> {
        self.advance("ensure constraints", Stage::ConstraintsEnsured, |engine| -> StageResult<_> {
            Ok(GraphBuilder::new(engine).ensure_constraints()?)
        })
    }

    /// Run the construction passes in `build`, then require at least one
    /// entity node before the graph counts as built.
    pub fn build_graph<T, Err>(&mut self, build: impl FnOnce(&GraphBuilder<'e, E>) -> Result<T, Err>) -> Result<T, Err>
    where
        Err: From<StageError>,
    {
        self.advance("build graph", Stage::GraphBuilt, |engine| -> Result<T, Err> {
            let built = build(&GraphBuilder::new(engine))?;
            let nodes = entity_count(engine)?;
            if nodes == 0 {
                return Err(StageError::EmptyGraph.into());
            }
            info!(nodes, "graph built");
            Ok(built)
        })
    }

    /// Accept a graph built by an earlier session
    pub fn attach_existing_graph(&mut self) -> StageResult<usize> {
        self.advance("attach existing graph", Stage::GraphBuilt, |engine| -> StageResult<usize> {
            let nodes = entity_count(engine)?;
            if nodes == 0 {
                return Err(StageError::EmptyGraph);
            }
            info!(nodes, "attached to existing graph");
            Ok(nodes)
        })
    }

    /// Replace every `is_similar` relationship by a fresh run over `projection`
    pub fn compute_similarity(
        &mut self,
        projection: &Projection,
        params: &SimilarityParams,
    ) -> StageResult<SimilarityReport> {
        self.compute_similarity_set(std::slice::from_ref(projection), params)
    }

    /// Delete every `is_similar` relationship once, then run node similarity
    /// over each projection in turn
    pub fn compute_similarity_set(
        &mut self,
        projections: &[Projection],
        params: &SimilarityParams,
    ) -> StageResult<SimilarityReport> {
        self.advance("compute similarity", Stage::SimilarityComputed, |engine| -> StageResult<_> {
            let deleted = engine.execute_write(&WriteCommand::DeleteRelationships {
                rel_type: schema::rel(schema::IS_SIMILAR),
            })?;
            let mut report = SimilarityReport {
                relationships_deleted: deleted.relationships_deleted,
                ..SimilarityReport::default()
            };

            let request = AlgorithmRequest::NodeSimilarity {
                similarity_cutoff: params.cutoff,
                top_k: params.top_k,
                write_relationship: schema::rel(schema::IS_SIMILAR),
                write_property: schema::SCORE.to_string(),
            };
            for projection in projections {
                let scope = ProjectionScope::anonymous(engine, projection)?;
                match scope.run(&request)? {
                    AlgorithmOutcome::Similarity {
                        nodes_compared,
                        relationships_written,
                    } => {
                        info!(projection = %projection, nodes_compared, relationships_written, "node similarity written");
                        report.projections += 1;
                        report.nodes_compared += nodes_compared;
                        report.relationships_written += relationships_written;
                    }
                    other => return Err(unexpected(&request, &other)),
                }
            }
            Ok(report)
        })
    }

    /// PageRank over `projection`, written to `pagerank`
    pub fn compute_centrality(
        &mut self,
        projection: &Projection,
        params: &CentralityParams,
    ) -> StageResult<CentralityReport> {
        self.advance("compute centrality", Stage::CentralityComputed, |engine| -> StageResult<_> {
            let request = AlgorithmRequest::PageRank {
                damping_factor: params.damping_factor,
                max_iterations: params.max_iterations,
                write_property: schema::PAGERANK.to_string(),
            };
            let scope = ProjectionScope::anonymous(engine, projection)?;
            match scope.run(&request)? {
                AlgorithmOutcome::PageRank {
                    nodes_written,
                    iterations_run,
                    converged,
                } => {
                    info!(projection = %projection, nodes_written, iterations_run, converged, "pagerank written");
                    Ok(CentralityReport {
                        nodes_written,
                        iterations_run,
                        converged,
                    })
                }
                other => Err(unexpected(&request, &other)),
            }
        })
    }

    /// Louvain over `projection`, written to `community`
    pub fn compute_communities(
        &mut self,
        projection: &Projection,
        params: &CommunityParams,
    ) -> StageResult<CommunityReport> {
        self.advance("compute communities", Stage::CommunitiesComputed, |engine| -> StageResult<_> {
            let request = AlgorithmRequest::Louvain {
                max_levels: params.max_levels,
                max_iterations: params.max_iterations,
                write_property: schema::COMMUNITY.to_string(),
            };
            let scope = ProjectionScope::anonymous(engine, projection)?;
            match scope.run(&request)? {
                AlgorithmOutcome::Louvain {
                    nodes_written,
                    community_count,
                    modularity,
                    ..
                } => {
                    info!(projection = %projection, nodes_written, community_count, modularity, "communities written");
                    Ok(CommunityReport {
                        projection: projection.to_string(),
                        nodes_written,
                        community_count,
                        modularity,
                    })
                }
                other => Err(unexpected(&request, &other)),
            }
        })
    }

    /// Communities over `is_similar` separately for each label
    pub fn compute_communities_per_label(
        &mut self,
        labels: &[&str],
        params: &CommunityParams,
    ) -> StageResult<Vec<CommunityReport>> {
        let mut reports = Vec::with_capacity(labels.len());
        for label in labels {
            let projection = build_projection([*label], [schema::IS_SIMILAR], Orientation::Natural);
            reports.push(self.compute_communities(&projection, params)?);
        }
        Ok(reports)
    }

    /// Split a relationship of a named projection. Allowed once communities
    /// are computed; does not advance the stage.
    pub fn split_relationships(
        &self,
        scope: &ProjectionScope<'_, E>,
        split: &RelationshipSplit,
        random_seed: u64,
    ) -> StageResult<SplitReport> {
        self.check("split relationships", Stage::LinkModelTrained)?;
        let request = AlgorithmRequest::SplitRelationships {
            relationship: split.relationship.clone(),
            remaining_type: split.remaining_type.clone(),
            holdout_type: split.holdout_type.clone(),
            holdout_fraction: split.holdout_fraction,
            random_seed,
        };
        match scope.run(&request)? {
            AlgorithmOutcome::Split { remaining, holdout } => {
                info!(
                    relationship = %split.relationship,
                    remaining_type = %split.remaining_type,
                    holdout_type = %split.holdout_type,
                    remaining,
                    holdout,
                    "relationships split"
                );
                Ok(SplitReport {
                    relationship: split.relationship.to_string(),
                    remaining,
                    holdout,
                })
            }
            other => Err(unexpected(&request, &other)),
        }
    }

    /// Pair space of the projection's first relationship type
    pub fn pair_space(&self, projection: &Projection) -> StageResult<PairSpace> {
        let rel_type = projection
            .rel_types()
            .next()
            .cloned()
            .ok_or_else(|| StageError::Engine(EngineError::Algorithm("projection has no relationships".to_string())))?;
        let rows = self.engine.execute_read(&ReadQuery::PairSpace {
            labels: projection.node_labels.clone(),
            rel_type,
        })?;
        let row = rows
            .first()
            .ok_or_else(|| StageError::UnexpectedResult("empty pair space result".to_string()))?;
        PairSpace::from_row(row)
    }

    /// Train a link classifier on `train_rel` and score it on `test_rel`.
    ///
    /// The class ratio comes from the pair space of the projection's primary
    /// relationship. In [`TrainMode::Train`] a model of the same name is
    /// replaced only when training succeeds.
    pub fn train_link_predictor(
        &mut self,
        scope: &ProjectionScope<'_, E>,
        train_rel: &EdgeType,
        test_rel: &EdgeType,
        params: &LinkPredictionParams,
    ) -> StageResult<(PairSpace, ModelInfo)> {
        self.check("train link predictor", Stage::LinkModelTrained)?;
        let pair_space = self.pair_space(scope.projection())?;
        let class_ratio = pair_space.class_ratio()?;
        debug!(
            nodes = pair_space.node_count,
            relationships = pair_space.relationship_count,
            max_pairs = pair_space.max_pairs(),
            class_ratio,
            "link prediction pair space"
        );

        self.advance("train link predictor", Stage::LinkModelTrained, |_| -> StageResult<_> {
            let request = AlgorithmRequest::LinkPredictionTrain {
                train_relationship: train_rel.clone(),
                test_relationship: test_rel.clone(),
                model_name: params.model_name.clone(),
                class_ratio,
                validation_folds: params.validation_folds,
                random_seed: params.random_seed,
                params: params.candidates(),
                mode: params.mode,
                replace: true,
            };
            match scope.run(&request)? {
                AlgorithmOutcome::LinkPrediction(model) => {
                    info!(
                        model = %model.name,
                        penalty = model.best_parameters.penalty,
                        train_aucpr = model.train_aucpr,
                        test_aucpr = model.test_aucpr,
                        stored = model.stored,
                        "link prediction model trained"
                    );
                    Ok((pair_space, model))
                }
                other => Err(unexpected(&request, &other)),
            }
        })
    }

    /// Person co-similarity link prediction: project `is_similar` among
    /// persons undirected, hold out a test set, sample the training set from
    /// the rest, then train.
    pub fn run_link_prediction(&mut self, params: &LinkPredictionParams) -> StageResult<LinkPredictionReport> {
        self.check("run link prediction", Stage::LinkModelTrained)?;
        let projection = build_projection([schema::PERSON], [schema::IS_SIMILAR], Orientation::Undirected);
        let scope = ProjectionScope::named(self.engine, &projection, &params.projection_name)?;

        let test_split =
            RelationshipSplit::with_suffixes(schema::IS_SIMILAR, "remaining", "test", params.holdout_fraction);
        let remaining = test_split.remaining_type.to_string();
        let train_split = RelationshipSplit::with_suffixes(&remaining, "ignored", "train", params.train_fraction);

        let splits = vec![
            self.split_relationships(&scope, &test_split, params.random_seed)?,
            self.split_relationships(&scope, &train_split, params.random_seed)?,
        ];
        let (pair_space, model) =
            self.train_link_predictor(&scope, &train_split.holdout_type, &test_split.holdout_type, params)?;

        Ok(LinkPredictionReport {
            splits,
            pair_space,
            model,
        })
    }

    /// Close the run and return to `Idle`
    pub fn finish(&mut self) -> Stage {
        let reached = self.stage;
        info!(reached = %reached, "analytics finished");
        self.stage = Stage::Idle;
        reached
    }
}

fn count<E: GraphEngine + ?Sized>(engine: &E, query: &ReadQuery) -> StageResult<usize> {
    let rows = engine.execute_read(query)?;
    Ok(rows
        .first()
        .and_then(|row| row.get("count"))
        .and_then(PropertyValue::as_integer)
        .and_then(|c| usize::try_from(c).ok())
        .unwrap_or(0))
}

fn entity_count<E: GraphEngine + ?Sized>(engine: &E) -> StageResult<usize> {
    let labels = schema::NODE_KEYS.iter().map(|(label, _)| schema::label(label)).collect();
    count(engine, &ReadQuery::CountNodes { labels })
}

fn unexpected(request: &AlgorithmRequest, outcome: &AlgorithmOutcome) -> StageError {
    StageError::UnexpectedResult(format!("{} returned {:?}", request.name(), outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EmbeddedEngine, RelSpec};
    use crate::graph::{NodeKey, PropertyMap};
    use crate::ingest::ProjectRecord;

    /// Three organizations sharing projects, three persons sharing deliverables
    fn populated() -> EmbeddedEngine {
        let engine = EmbeddedEngine::in_memory();
        let org = |name: &str| NodeKey::new("Organization", "name", name);
        let project = |id: i64| NodeKey::new("Project", "id", id);
        for name in ["A", "B", "C"] {
            engine.upsert_node(&org(name), PropertyMap::new()).unwrap();
        }
        for id in 1..=3i64 {
            engine.upsert_node(&project(id), PropertyMap::new()).unwrap();
        }
        for (o, p) in [("A", 1), ("A", 2), ("B", 1), ("B", 2), ("C", 3)] {
            engine
                .upsert_relationship(&EdgeType::new("participates_in"), &org(o), &project(p), PropertyMap::new())
                .unwrap();
        }
        engine
    }

    fn org_projection() -> Projection {
        build_projection(
            ["Organization", "Project"],
            [RelSpec::new("participates_in", Orientation::Natural)],
            Orientation::Natural,
        )
    }

    fn similarity_count(engine: &EmbeddedEngine) -> usize {
        count(
            engine,
            &ReadQuery::CountRelationships {
                rel_type: EdgeType::new("is_similar"),
            },
        )
        .unwrap()
    }

    fn ready(engine: &EmbeddedEngine) -> AnalyticsOrchestrator<'_, EmbeddedEngine> {
        let mut orchestrator = AnalyticsOrchestrator::new(engine);
        orchestrator.ensure_constraints().unwrap();
        orchestrator.attach_existing_graph().unwrap();
        orchestrator
    }

    #[test]
    fn test_analytics_before_graph_is_rejected() {
        let engine = populated();
        let mut orchestrator = AnalyticsOrchestrator::new(&engine);
        let result = orchestrator.compute_similarity(&org_projection(), &SimilarityParams::default());
        assert!(matches!(
            result,
            Err(StageError::PreconditionViolation {
                current: Stage::Idle,
                required: Stage::GraphBuilt,
                ..
            })
        ));
        assert_eq!(orchestrator.stage(), Stage::Idle);
        assert_eq!(similarity_count(&engine), 0);
    }

    #[test]
    fn test_stage_cannot_be_skipped() {
        let engine = populated();
        let mut orchestrator = ready(&engine);
        let result = orchestrator.compute_centrality(&org_projection(), &CentralityParams::default());
        assert!(matches!(result, Err(StageError::PreconditionViolation { .. })));
        assert_eq!(orchestrator.stage(), Stage::GraphBuilt);
    }

    #[test]
    fn test_attach_empty_graph() {
        let engine = EmbeddedEngine::in_memory();
        let mut orchestrator = AnalyticsOrchestrator::new(&engine);
        orchestrator.ensure_constraints().unwrap();
        assert!(matches!(orchestrator.attach_existing_graph(), Err(StageError::EmptyGraph)));
        assert_eq!(orchestrator.stage(), Stage::ConstraintsEnsured);
    }

    #[test]
    fn test_graph_built_only_through_construction() {
        let engine = EmbeddedEngine::in_memory();
        let mut orchestrator = AnalyticsOrchestrator::new(&engine);

        let early = orchestrator.build_graph(|_| Ok::<_, StageError>(()));
        assert!(matches!(early, Err(StageError::PreconditionViolation { .. })));
        assert_eq!(orchestrator.stage(), Stage::Idle);

        orchestrator.ensure_constraints().unwrap();
        assert_eq!(orchestrator.stage(), Stage::ConstraintsEnsured);

        // Passes that write nothing leave the graph unbuilt
        let empty = orchestrator.build_graph(|_| Ok::<_, StageError>(()));
        assert!(matches!(empty, Err(StageError::EmptyGraph)));
        assert_eq!(orchestrator.stage(), Stage::ConstraintsEnsured);
        assert!(matches!(
            orchestrator.compute_similarity(&org_projection(), &SimilarityParams::default()),
            Err(StageError::PreconditionViolation { .. })
        ));

        let written = orchestrator
            .build_graph(|builder| -> StageResult<_> {
                let project = ProjectRecord {
                    id: 1,
                    participants: vec!["A".to_string(), "B".to_string()],
                    ..ProjectRecord::default()
                };
                Ok(builder.upsert_project(&project)?)
            })
            .unwrap();
        assert_eq!(written.nodes_created, 3);
        assert_eq!(orchestrator.stage(), Stage::GraphBuilt);
    }

    #[test]
    fn test_similarity_is_a_full_recompute() {
        let engine = populated();
        let mut orchestrator = ready(&engine);
        let params = SimilarityParams { cutoff: 0.5, top_k: 1 };

        let first = orchestrator.compute_similarity(&org_projection(), &params).unwrap();
        let after_first = similarity_count(&engine);
        let second = orchestrator.compute_similarity(&org_projection(), &params).unwrap();

        assert_eq!(first.relationships_deleted, 0);
        assert_eq!(second.relationships_deleted, after_first);
        assert_eq!(similarity_count(&engine), after_first);
        assert_eq!(first.relationships_written, second.relationships_written);
        assert_eq!(orchestrator.stage(), Stage::SimilarityComputed);
    }

    #[test]
    fn test_similarity_set_deletes_once() {
        let engine = populated();
        let mut orchestrator = ready(&engine);
        let params = SimilarityParams { cutoff: 0.5, top_k: 1 };
        let single = orchestrator.compute_similarity(&org_projection(), &params).unwrap();

        let report = orchestrator
            .compute_similarity_set(&[org_projection(), org_projection()], &params)
            .unwrap();
        assert_eq!(report.projections, 2);
        // The second projection merges onto the edges the first one wrote
        assert_eq!(similarity_count(&engine), single.relationships_written);
    }

    #[test]
    fn test_full_stage_sequence() {
        let engine = populated();
        let mut orchestrator = ready(&engine);
        orchestrator
            .compute_similarity(&org_projection(), &SimilarityParams { cutoff: 0.5, top_k: 1 })
            .unwrap();

        let centrality = orchestrator
            .compute_centrality(
                &build_projection(["Organization", "Project"], ["participates_in"], Orientation::Undirected),
                &CentralityParams::default(),
            )
            .unwrap();
        assert_eq!(centrality.nodes_written, 6);

        let reports = orchestrator
            .compute_communities_per_label(&["Organization", "Project"], &CommunityParams::default())
            .unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(orchestrator.stage(), Stage::CommunitiesComputed);

        assert_eq!(orchestrator.finish(), Stage::CommunitiesComputed);
        assert_eq!(orchestrator.stage(), Stage::Idle);
    }

    #[test]
    fn test_failed_stage_leaves_state_unchanged() {
        let engine = populated();
        let mut orchestrator = ready(&engine);
        orchestrator
            .compute_similarity(&org_projection(), &SimilarityParams { cutoff: 0.5, top_k: 1 })
            .unwrap();

        let bad = CentralityParams {
            damping_factor: 1.5,
            max_iterations: 20,
        };
        assert!(orchestrator.compute_centrality(&org_projection(), &bad).is_err());
        assert_eq!(orchestrator.stage(), Stage::SimilarityComputed);
    }

    #[test]
    fn test_class_ratio() {
        let space = PairSpace {
            node_count: 5,
            relationship_count: 4,
            self_referential: true,
            source_count: 5,
            target_count: 5,
        };
        assert_eq!(space.max_pairs(), 10);
        assert_eq!(space.class_ratio().unwrap(), 1.5);

        let bipartite = PairSpace {
            self_referential: false,
            source_count: 2,
            target_count: 3,
            ..space
        };
        assert_eq!(bipartite.max_pairs(), 6);
        assert_eq!(bipartite.class_ratio().unwrap(), 0.5);

        let empty = PairSpace {
            relationship_count: 0,
            ..space
        };
        assert!(matches!(empty.class_ratio(), Err(StageError::NoRelationships)));
    }

    #[test]
    fn test_split_names() {
        let split = RelationshipSplit::holdout("is_similar", 0.2);
        assert_eq!(split.remaining_type.as_str(), "is_similar_train");
        assert_eq!(split.holdout_type.as_str(), "is_similar_test");
    }

    #[test]
    fn test_split_before_communities_is_rejected() {
        let engine = populated();
        let orchestrator = ready(&engine);
        let projection = build_projection(["Organization", "Project"], ["participates_in"], Orientation::Undirected);
        let scope = ProjectionScope::named(&engine, &projection, "graph").unwrap();
        let result = orchestrator.split_relationships(&scope, &RelationshipSplit::holdout("participates_in", 0.2), 2);
        assert!(matches!(result, Err(StageError::PreconditionViolation { .. })));
    }

    #[test]
    fn test_default_link_prediction_params() {
        let params = LinkPredictionParams::default();
        let candidates = params.candidates();
        let penalties: Vec<f64> = candidates.iter().map(|c| c.penalty).collect();
        assert_eq!(penalties, vec![0.5, 1.0, 0.0]);
        assert!(candidates.iter().all(|c| c.max_iterations == 1000));
        assert_eq!(params.validation_folds, 5);
        assert_eq!(params.random_seed, 2);
        assert_eq!(params.model_name, "LP");
    }
}
