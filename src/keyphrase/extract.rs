//! Keyphrase extraction boundary and interchange export

use super::consolidate::KeyphraseConsolidator;
use crate::ingest::records::is_placeholder;
use crate::ingest::tabular::{write_delimited_file, TabularSource};
use crate::ingest::{IngestError, IngestResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Parameters handed to every extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionParams {
    /// Maximum phrases per method and document
    pub top_n: usize,
    /// Inclusive bounds on phrase length in words
    pub ngram_range: (usize, usize),
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            top_n: 10,
            ngram_range: (1, 3),
        }
    }
}

/// A keyphrase extraction method
pub trait KeyphraseExtractor {
    fn name(&self) -> &str;

    /// Ranked phrases for `text`, at most `params.top_n`
    fn extract(&self, text: &str, params: &ExtractionParams) -> Vec<String>;
}

/// Read the auxiliary keyphrase list, one phrase per line
pub fn load_auxiliary_keyphrases(path: &Path) -> IngestResult<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Counters for one export
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub documents: usize,
    /// Rows skipped for a missing key or text
    pub skipped: usize,
    pub phrases_written: usize,
}

/// Where an export reads from and writes to
#[derive(Debug, Clone, Copy)]
pub struct ExportColumns<'a> {
    pub id_field: &'a str,
    pub text_field: &'a str,
}

/// Run every extractor over each document of `source`, consolidate, and write
/// a `(id_field, keyphrases)` interchange file with `;`-joined phrases.
pub fn export_keyphrases(
    source: &dyn TabularSource,
    output: &Path,
    extractors: &[Box<dyn KeyphraseExtractor>],
    consolidator: &KeyphraseConsolidator,
    auxiliary: &[String],
    columns: ExportColumns<'_>,
    params: &ExtractionParams,
) -> IngestResult<ExportReport> {
    let mut report = ExportReport::default();
    let mut rows: Vec<Vec<String>> = Vec::new();

    for record in source.records()? {
        let (Some(id), Some(text)) = (record.get(columns.id_field), record.get(columns.text_field)) else {
            warn!(line = record.line, id_field = columns.id_field, "document skipped, missing column");
            report.skipped += 1;
            continue;
        };
        if is_placeholder(id) {
            report.skipped += 1;
            continue;
        }
        let text = text.replace(['\r', '\n'], " ");

        let outputs: Vec<Vec<String>> = extractors
            .iter()
            .map(|extractor| {
                let mut phrases = extractor.extract(&text, params);
                if phrases.len() > params.top_n {
                    debug!(method = extractor.name(), returned = phrases.len(), "truncating to top_n");
                    phrases.truncate(params.top_n);
                }
                phrases
            })
            .collect();

        let phrases = consolidator.consolidate(&outputs, &text, auxiliary);
        report.documents += 1;
        report.phrases_written += phrases.len();
        rows.push(vec![id.trim().to_string(), phrases.join(";")]);
    }

    write_delimited_file(output, ',', &[columns.id_field, "keyphrases"], &rows)?;
    info!(
        output = %output.display(),
        documents = report.documents,
        phrases = report.phrases_written,
        methods = extractors.len(),
        "keyphrases exported"
    );
    Ok(report)
}
