//! GraphBuilder: constraints, idempotent upserts and construction passes
//!
//! Every write is a merge keyed by a natural identifier, so a pass can be
//! re-run from the start without cleaning the graph first. Records are
//! independent units of work.

use super::records::{clean_person_name, is_placeholder, normalize_phrase, DeliverableRecord, KeyphraseRecord, PersonsRecord, ProjectRecord};
use super::reconcile::reconcile;
use super::tabular::TabularSource;
use super::{IngestError, IngestResult};
use crate::engine::{ConstraintStatus, GraphEngine, ReadQuery, WriteSummary};
use crate::graph::{KeyValue, Label, NodeKey, PropertyMap};
use crate::schema;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// A record whose counterpart is absent; skipped, never raised
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationGap {
    /// The record that was dropped
    pub record: NodeKey,
    /// What it expected to find
    pub missing: String,
}

impl fmt::Display for ReconciliationGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} has no {}", self.record, self.missing)
    }
}

/// Outcome of one upsert
#[derive(Debug, Clone, PartialEq)]
pub enum Upsert {
    Written(WriteSummary),
    Gap(ReconciliationGap),
}

/// Counters for one construction pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConstructionReport {
    pub pass: String,
    /// Records read from the sources
    pub processed: usize,
    /// Records dropped because they could not be converted
    pub skipped_malformed: usize,
    /// Fields dropped from otherwise usable records
    pub field_issues: usize,
    pub gaps: Vec<ReconciliationGap>,
    /// Secondary records with no primary partner
    pub orphans: usize,
    pub written: WriteSummary,
}

impl ConstructionReport {
    fn new(pass: &str) -> Self {
        ConstructionReport {
            pass: pass.to_string(),
            ..Self::default()
        }
    }

    fn record(&mut self, upsert: Upsert) {
        match upsert {
            Upsert::Written(summary) => self.written.absorb(summary),
            Upsert::Gap(gap) => {
                debug!(pass = %self.pass, gap = %gap, "reconciliation gap");
                self.gaps.push(gap);
            }
        }
    }

    fn log(&self) {
        info!(
            pass = %self.pass,
            processed = self.processed,
            skipped = self.skipped_malformed,
            gaps = self.gaps.len(),
            nodes_created = self.written.nodes_created,
            relationships_created = self.written.relationships_created,
            "construction pass finished"
        );
    }
}

/// Writes entities and structural relationships through a [`GraphEngine`]
pub struct GraphBuilder<'e, E: GraphEngine + ?Sized> {
    engine: &'e E,
}

impl<'e, E: GraphEngine + ?Sized> GraphBuilder<'e, E> {
    pub fn new(engine: &'e E) -> Self {
        GraphBuilder { engine }
    }

    /// Declare every entity key unique. Safe to call repeatedly.
    pub fn ensure_constraints(&self) -> IngestResult<Vec<(Label, ConstraintStatus)>> {
        schema::NODE_KEYS
            .iter()
            .map(|(label, property)| {
                let label = schema::label(label);
                let status = self.engine.ensure_unique_constraint(&label, property)?;
                debug!(label = %label, property, ?status, "constraint ensured");
                Ok((label, status))
            })
            .collect()
    }

    fn exists(&self, key: &NodeKey) -> IngestResult<bool> {
        Ok(!self.engine.execute_read(&ReadQuery::NodeByKey(key.clone()))?.is_empty())
    }

    fn relate(&self, rel_type: &str, from: &NodeKey, to: &NodeKey) -> IngestResult<WriteSummary> {
        Ok(self
            .engine
            .upsert_relationship(&schema::rel(rel_type), from, to, PropertyMap::new())?)
    }

    /// Merge a project, its organizations and their participation.
    ///
    /// The coordinator both participates in and coordinates the project.
    /// Placeholder organization names are skipped.
    pub fn upsert_project(&self, project: &ProjectRecord) -> IngestResult<WriteSummary> {
        let mut summary = WriteSummary::default();
        let project_key = NodeKey::new(schema::PROJECT, "id", project.id);
        summary.absorb(self.engine.upsert_node(&project_key, project.properties())?);

        let organization = |name: &str| {
            let name = name.trim();
            (!is_placeholder(name)).then(|| NodeKey::new(schema::ORGANIZATION, "name", name))
        };

        for org in project.participants.iter().filter_map(|name| organization(name)) {
            summary.absorb(self.engine.upsert_node(&org, PropertyMap::new())?);
            summary.absorb(self.relate(schema::PARTICIPATES_IN, &org, &project_key)?);
        }

        if let Some(org) = project.coordinator.as_deref().and_then(organization) {
            summary.absorb(self.engine.upsert_node(&org, PropertyMap::new())?);
            summary.absorb(self.relate(schema::PARTICIPATES_IN, &org, &project_key)?);
            summary.absorb(self.relate(schema::COORDINATES, &org, &project_key)?);
        }
        Ok(summary)
    }

    /// Merge one Keyphrase per phrase and an `includes` edge from the target.
    ///
    /// Phrases are normalized first; an empty list writes nothing. A target
    /// that does not exist is a gap.
    pub fn upsert_keyphrase_edges(
        &self,
        target_label: &str,
        target_key: impl Into<KeyValue>,
        phrases: &[String],
    ) -> IngestResult<Upsert> {
        let property =
            schema::key_property(target_label).ok_or_else(|| IngestError::UnknownLabel(target_label.to_string()))?;
        let target = NodeKey::new(target_label, property, target_key);

        let mut normalized: Vec<String> = Vec::new();
        for phrase in phrases.iter().map(|p| normalize_phrase(p)) {
            if !phrase.is_empty() && !normalized.contains(&phrase) {
                normalized.push(phrase);
            }
        }
        if normalized.is_empty() {
            return Ok(Upsert::Written(WriteSummary::default()));
        }
        if !self.exists(&target)? {
            return Ok(Upsert::Gap(ReconciliationGap {
                record: target,
                missing: format!("{} node", target_label),
            }));
        }

        let mut summary = WriteSummary::default();
        for phrase in normalized {
            let keyphrase = NodeKey::new(schema::KEYPHRASE, "name", phrase);
            summary.absorb(self.engine.upsert_node(&keyphrase, PropertyMap::new())?);
            summary.absorb(self.relate(schema::INCLUDES, &target, &keyphrase)?);
        }
        Ok(Upsert::Written(summary))
    }

    /// Merge a deliverable, its `belongs` edge and a `writes` edge per person.
    ///
    /// Nothing is written when the parent project is missing.
    pub fn upsert_deliverable(&self, deliverable: &DeliverableRecord, person_names: &[String]) -> IngestResult<Upsert> {
        let deliverable_key = NodeKey::new(schema::DELIVERABLE, "rcn", deliverable.rcn);
        let project_key = NodeKey::new(schema::PROJECT, "id", deliverable.project_id);
        if !self.exists(&project_key)? {
            return Ok(Upsert::Gap(ReconciliationGap {
                record: deliverable_key,
                missing: format!("parent {}", project_key),
            }));
        }

        let mut summary = self.engine.upsert_node(&deliverable_key, deliverable.properties())?;
        summary.absorb(self.relate(schema::BELONGS, &deliverable_key, &project_key)?);

        for name in person_names.iter().filter_map(|n| clean_person_name(n)) {
            let person = NodeKey::new(schema::PERSON, "name", name);
            summary.absorb(self.engine.upsert_node(&person, PropertyMap::new())?);
            summary.absorb(self.relate(schema::WRITES, &person, &deliverable_key)?);
        }
        Ok(Upsert::Written(summary))
    }

    /// Construct projects from the projects dump
    pub fn build_projects(&self, source: &dyn TabularSource) -> IngestResult<ConstructionReport> {
        let mut report = ConstructionReport::new("projects");
        for record in source.records()? {
            report.processed += 1;
            match ProjectRecord::from_record(&record) {
                Ok((project, issues)) => {
                    for issue in &issues {
                        warn!(source = %source.name(), line = record.line, project = project.id, error = %issue, "field dropped");
                    }
                    report.field_issues += issues.len();
                    report.written.absorb(self.upsert_project(&project)?);
                }
                Err(e) => {
                    warn!(source = %source.name(), line = record.line, error = %e, "project skipped");
                    report.skipped_malformed += 1;
                }
            }
        }
        report.log();
        Ok(report)
    }

    /// Attach keyphrases from an interchange file to `label` nodes keyed by `key_field`
    pub fn build_keyphrases(
        &self,
        source: &dyn TabularSource,
        label: &str,
        key_field: &str,
    ) -> IngestResult<ConstructionReport> {
        let mut report = ConstructionReport::new(&format!("{} keyphrases", label));
        for record in source.records()? {
            report.processed += 1;
            match KeyphraseRecord::from_record(&record, key_field) {
                Ok(keys) => report.record(self.upsert_keyphrase_edges(label, keys.key, &keys.phrases)?),
                Err(e) => {
                    warn!(source = %source.name(), line = record.line, error = %e, "keyphrase row skipped");
                    report.skipped_malformed += 1;
                }
            }
        }
        report.log();
        Ok(report)
    }

    /// Join extracted persons with deliverable metadata by `rcn` and construct
    /// the deliverables that have both.
    pub fn build_deliverables(
        &self,
        persons_source: &dyn TabularSource,
        deliverables_source: &dyn TabularSource,
    ) -> IngestResult<ConstructionReport> {
        let mut report = ConstructionReport::new("deliverables");

        let mut persons = Vec::new();
        for record in persons_source.records()? {
            report.processed += 1;
            match PersonsRecord::from_record(&record) {
                Ok(p) => persons.push(p),
                Err(e) => {
                    warn!(source = %persons_source.name(), line = record.line, error = %e, "persons row skipped");
                    report.skipped_malformed += 1;
                }
            }
        }
        let mut deliverables = Vec::new();
        for record in deliverables_source.records()? {
            report.processed += 1;
            match DeliverableRecord::from_record(&record) {
                Ok(d) => deliverables.push(d),
                Err(e) => {
                    warn!(source = %deliverables_source.name(), line = record.line, error = %e, "deliverable skipped");
                    report.skipped_malformed += 1;
                }
            }
        }

        persons.sort_by_key(|p| p.rcn);
        deliverables.sort_by_key(|d| d.rcn);
        let joined = reconcile(&persons, &deliverables, |p| p.rcn, |d| d.rcn);
        report.orphans = joined.orphans;

        for unmatched in &joined.gaps {
            report.record(Upsert::Gap(ReconciliationGap {
                record: NodeKey::new(schema::DELIVERABLE, "rcn", unmatched.rcn),
                missing: "deliverable metadata".to_string(),
            }));
        }
        for (extracted, deliverable) in joined.pairs {
            report.record(self.upsert_deliverable(deliverable, &extracted.persons)?);
        }

        report.log();
        Ok(report)
    }
}
