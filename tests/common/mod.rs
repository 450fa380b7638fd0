//! Shared fixtures: a miniature CORDIS dump on disk

use cordis_kg::config::{PathsConfig, PipelineConfig, SessionConfig};
use cordis_kg::keyphrase::{ExtractionParams, KeyphraseExtractor};
use std::fs;
use std::path::Path;

pub const PROJECTS: &str = "\
id;acronym;status;programme;topics;startDate;endDate;projectUrl;totalCost;ecMaxContribution;fundingScheme;coordinator;participants;objective
101;STORE;SIGNED;H2020-EU.3.3.;LC-SC3-ES-1;2020-01-01;2023-12-31;https://store.example.eu;1500000,50;1200000;RIA;Alpha Energy;Beta Grid;\"Batteries for energy storage; grid scale\"
102;GRID;SIGNED;H2020-EU.3.3.;LC-SC3-ES-2;2021-03-01;2024-02-29;https://grid.example.eu;2.500.000,75;2000000;IA;Alpha Energy;Beta Grid;Grid balancing with storage
";

pub const DELIVERABLES: &str = "\
rcn;projectID;title;projectAcronym;programme;deliverableType;url;description
9001;101;Storage report;STORE;H2020-EU.3.3.;Documents, reports;https://store.example.eu/d1.pdf;Energy storage pilot results
9002;999;Stray report;NONE;H2020-EU.3.3.;Documents, reports;nan;Energy for a project that is not in the dump
";

pub const PERSONS: &str = "\
rcn,persons
9001,Jane Doe;John Smith
";

/// Always proposes the same two near-duplicate phrases
pub struct FixedExtractor;

impl KeyphraseExtractor for FixedExtractor {
    fn name(&self) -> &str {
        "fixed"
    }

    fn extract(&self, _text: &str, _params: &ExtractionParams) -> Vec<String> {
        vec!["energy".to_string(), "energy storage".to_string()]
    }
}

/// Write the source dumps into `dir` and return a config pointing at them
pub fn write_fixture(dir: &Path) -> PipelineConfig {
    fs::write(dir.join("cordis-h2020projects.csv"), PROJECTS).unwrap();
    fs::write(dir.join("cordis-h2020projectDeliverables.csv"), DELIVERABLES).unwrap();
    fs::write(dir.join("persons.csv"), PERSONS).unwrap();
    fs::write(dir.join("keyphrases.txt"), "hydrogen\n").unwrap();

    PipelineConfig {
        paths: PathsConfig {
            base_dir: dir.to_path_buf(),
            ..PathsConfig::default()
        },
        session: SessionConfig {
            extract_data: true,
            create: true,
            run_algorithms: false,
            link_prediction: false,
        },
        ..PipelineConfig::default()
    }
}
