//! End-to-end pipeline driver
//!
//! Runs the enabled session parts in order: keyphrase export, graph
//! construction, then analytics. The engine handle is borrowed for the whole
//! run; opening and closing it is the caller's business.

use crate::analytics::{
    build_projection, AnalyticsOrchestrator, CentralityReport, CommunityReport, LinkPredictionReport, SimilarityReport,
    Stage,
};
use crate::config::PipelineConfig;
use crate::engine::{GraphEngine, Orientation, Projection};
use crate::error::PipelineResult;
use crate::ingest::{ConstructionReport, DelimitedFile};
use crate::keyphrase::{
    export_keyphrases, load_auxiliary_keyphrases, ExportColumns, ExportReport, KeyphraseConsolidator,
    KeyphraseExtractor,
};
use crate::schema;
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Source dumps are `;`-separated, interchange files `,`-separated
const SOURCE_DELIMITER: char = ';';
const INTERCHANGE_DELIMITER: char = ',';

/// What one run did
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub exports: Vec<(String, ExportReport)>,
    pub passes: Vec<ConstructionReport>,
    pub similarity: Option<SimilarityReport>,
    pub centrality: Option<CentralityReport>,
    pub communities: Vec<CommunityReport>,
    pub link_prediction: Option<LinkPredictionReport>,
    /// Last stage reached before returning to idle
    pub reached: Stage,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn total_gaps(&self) -> usize {
        self.passes.iter().map(|p| p.gaps.len()).sum()
    }

    fn construction_table(&self) -> Table {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            "Pass",
            "Records",
            "Malformed",
            "Field issues",
            "Gaps",
            "Orphans",
            "Nodes created",
            "Relationships created",
        ]);
        for pass in &self.passes {
            table.add_row(vec![
                pass.pass.clone(),
                pass.processed.to_string(),
                pass.skipped_malformed.to_string(),
                pass.field_issues.to_string(),
                pass.gaps.len().to_string(),
                pass.orphans.to_string(),
                pass.written.nodes_created.to_string(),
                pass.written.relationships_created.to_string(),
            ]);
        }
        table
    }

    fn analytics_table(&self) -> Table {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Stage", "Outcome"]);
        for (name, export) in &self.exports {
            table.add_row(vec![
                format!("export {}", name),
                format!("{} documents, {} phrases", export.documents, export.phrases_written),
            ]);
        }
        if let Some(s) = &self.similarity {
            table.add_row(vec![
                "similarity".to_string(),
                format!(
                    "{} deleted, {} written over {} projection(s)",
                    s.relationships_deleted, s.relationships_written, s.projections
                ),
            ]);
        }
        if let Some(c) = &self.centrality {
            table.add_row(vec![
                "pagerank".to_string(),
                format!("{} nodes, {} iterations", c.nodes_written, c.iterations_run),
            ]);
        }
        for c in &self.communities {
            table.add_row(vec![
                format!("louvain {}", c.projection),
                format!("{} communities, modularity {:.4}", c.community_count, c.modularity),
            ]);
        }
        if let Some(lp) = &self.link_prediction {
            let model = &lp.model;
            table.add_row(vec![
                format!("link prediction {}", model.name),
                format!(
                    "penalty {}, train AUCPR {:.4}, test AUCPR {:.4}, class ratio {:.2}",
                    model.best_parameters.penalty, model.train_aucpr, model.test_aucpr, model.class_ratio
                ),
            ]);
        }
        table
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.passes.is_empty() {
            writeln!(f, "{}", self.construction_table())?;
        }
        if !self.exports.is_empty()
            || self.similarity.is_some()
            || self.centrality.is_some()
            || !self.communities.is_empty()
            || self.link_prediction.is_some()
        {
            writeln!(f, "{}", self.analytics_table())?;
        }
        write!(f, "Reached {} in {:.2}s", self.reached, self.elapsed.as_secs_f64())
    }
}

/// Organizations compared through the keyphrases of their projects
pub fn organizations_projection() -> Projection {
    build_projection(
        [schema::ORGANIZATION, schema::PROJECT, schema::KEYPHRASE],
        [schema::PARTICIPATES_IN, schema::INCLUDES],
        Orientation::Natural,
    )
}

/// Persons compared through their deliverables, projects and keyphrases
pub fn persons_projection() -> Projection {
    build_projection(
        [schema::PERSON, schema::DELIVERABLE, schema::PROJECT, schema::KEYPHRASE],
        [schema::WRITES, schema::BELONGS, schema::INCLUDES],
        Orientation::Natural,
    )
}

/// Projects and keyphrases, undirected, for PageRank
pub fn centrality_projection() -> Projection {
    build_projection([schema::PROJECT, schema::KEYPHRASE], [schema::INCLUDES], Orientation::Undirected)
}

pub struct Pipeline<'e, E: GraphEngine + ?Sized> {
    engine: &'e E,
    config: PipelineConfig,
    extractors: Vec<Box<dyn KeyphraseExtractor>>,
}

impl<'e, E: GraphEngine + ?Sized> Pipeline<'e, E> {
    pub fn new(engine: &'e E, config: PipelineConfig) -> Self {
        Self {
            engine,
            config,
            extractors: Vec::new(),
        }
    }

    /// Register a keyphrase extraction method for the export step
    pub fn with_extractor(mut self, extractor: Box<dyn KeyphraseExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self) -> PipelineResult<RunReport> {
        let started = Instant::now();
        self.engine.verify_connectivity()?;

        let session = self.config.session;
        let mut report = RunReport::default();
        let mut orchestrator = AnalyticsOrchestrator::new(self.engine);

        if session.extract_data {
            report.exports = self.extract()?;
        }
        if session.create {
            report.passes = self.construct(&mut orchestrator)?;
        }
        if session.link_prediction && !session.run_algorithms {
            warn!("link prediction needs run_algorithms, skipping it");
        }
        if session.run_algorithms {
            if !session.create {
                orchestrator.ensure_constraints()?;
                orchestrator.attach_existing_graph()?;
            }
            self.analyze(&mut orchestrator, &mut report)?;
        }

        report.reached = orchestrator.finish();
        report.elapsed = started.elapsed();
        info!(
            reached = %report.reached,
            gaps = report.total_gaps(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "pipeline finished"
        );
        Ok(report)
    }

    /// Write the project and deliverable keyphrase interchange files
    pub fn extract(&self) -> PipelineResult<Vec<(String, ExportReport)>> {
        let paths = &self.config.paths;
        let keyphrases = &self.config.keyphrases;
        if self.extractors.is_empty() {
            warn!("no keyphrase extractors registered, exporting auxiliary matches only");
        }

        let auxiliary = load_auxiliary_keyphrases(&paths.resolve(&paths.aux_keys))?;
        let consolidator = KeyphraseConsolidator::new(keyphrases.consolidation);

        let jobs = [
            (
                "projects",
                &paths.projects_csv,
                &paths.project_keyphrases_csv,
                ExportColumns {
                    id_field: "id",
                    text_field: "objective",
                },
            ),
            (
                "deliverables",
                &paths.deliverables_csv,
                &paths.deliverables_keyphrases_csv,
                ExportColumns {
                    id_field: "rcn",
                    text_field: "description",
                },
            ),
        ];

        let mut exports = Vec::with_capacity(jobs.len());
        for (name, input, output, columns) in jobs {
            let source = DelimitedFile::new(paths.resolve(input), SOURCE_DELIMITER);
            let export = export_keyphrases(
                &source,
                &paths.resolve(output),
                &self.extractors,
                &consolidator,
                &auxiliary,
                columns,
                &keyphrases.extraction,
            )?;
            exports.push((name.to_string(), export));
        }
        Ok(exports)
    }

    /// Ensure constraints and run the four construction passes
    pub fn construct(&self, orchestrator: &mut AnalyticsOrchestrator<'e, E>) -> PipelineResult<Vec<ConstructionReport>> {
        orchestrator.ensure_constraints()?;

        let paths = &self.config.paths;
        orchestrator.build_graph(|builder| -> PipelineResult<_> {
            let source = |path: &Path| DelimitedFile::new(paths.resolve(path), SOURCE_DELIMITER);
            let interchange = |path: &Path| DelimitedFile::new(paths.resolve(path), INTERCHANGE_DELIMITER);

            let passes = vec![
                builder.build_projects(&source(&paths.projects_csv))?,
                builder.build_keyphrases(&interchange(&paths.project_keyphrases_csv), schema::PROJECT, "id")?,
                builder.build_deliverables(&interchange(&paths.persons_csv), &source(&paths.deliverables_csv))?,
                builder.build_keyphrases(
                    &interchange(&paths.deliverables_keyphrases_csv),
                    schema::DELIVERABLE,
                    "rcn",
                )?,
            ];
            Ok(passes)
        })
    }

    /// Similarity, centrality, communities and optionally link prediction
    pub fn analyze(&self, orchestrator: &mut AnalyticsOrchestrator<'e, E>, report: &mut RunReport) -> PipelineResult<()> {
        let similarity = &self.config.similarity;
        let mut projections = Vec::new();
        if similarity.organizations_projects {
            projections.push(organizations_projection());
        }
        if similarity.persons {
            projections.push(persons_projection());
        }
        report.similarity = Some(orchestrator.compute_similarity_set(&projections, &similarity.params)?);

        report.centrality = Some(orchestrator.compute_centrality(&centrality_projection(), &self.config.centrality)?);

        let labels: Vec<&str> = self.config.communities.labels.iter().map(String::as_str).collect();
        report.communities = orchestrator.compute_communities_per_label(&labels, &self.config.communities.params)?;

        if self.config.session.link_prediction {
            report.link_prediction = Some(orchestrator.run_link_prediction(&self.config.link_prediction)?);
        }
        Ok(())
    }
}
