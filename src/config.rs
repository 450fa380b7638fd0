//! Pipeline configuration
//!
//! Loaded from a YAML file; every field has a default, so an empty file (or
//! no file) yields a complete configuration.

use crate::analytics::{CentralityParams, CommunityParams, LinkPredictionParams, SimilarityParams};
use crate::keyphrase::{ConsolidationParams, ExtractionParams};
use crate::schema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub session: SessionConfig,
    pub keyphrases: KeyphraseConfig,
    pub similarity: SimilarityConfig,
    pub centrality: CentralityParams,
    pub communities: CommunityConfig,
    pub link_prediction: LinkPredictionParams,
}

/// Input and output locations; relative paths resolve against `base_dir`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub base_dir: PathBuf,
    pub projects_csv: PathBuf,
    pub deliverables_csv: PathBuf,
    pub persons_csv: PathBuf,
    pub project_keyphrases_csv: PathBuf,
    pub deliverables_keyphrases_csv: PathBuf,
    /// Auxiliary keyphrase list, one phrase per line
    pub aux_keys: PathBuf,
    /// Embedded engine snapshot
    pub snapshot: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            projects_csv: PathBuf::from("cordis-h2020projects.csv"),
            deliverables_csv: PathBuf::from("cordis-h2020projectDeliverables.csv"),
            persons_csv: PathBuf::from("persons.csv"),
            project_keyphrases_csv: PathBuf::from("project_keyphrases.csv"),
            deliverables_keyphrases_csv: PathBuf::from("deliverables_keyphrases.csv"),
            aux_keys: PathBuf::from("keyphrases.txt"),
            snapshot: PathBuf::from("cordis-kg.snap"),
        }
    }
}

impl PathsConfig {
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Which parts of the pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Export keyphrase interchange files from the source dumps
    pub extract_data: bool,
    /// Build the graph from the source and interchange files
    pub create: bool,
    /// Run similarity, centrality and community detection
    pub run_algorithms: bool,
    /// Train the link-prediction model after the other algorithms
    pub link_prediction: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            extract_data: false,
            create: false,
            run_algorithms: true,
            link_prediction: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyphraseConfig {
    #[serde(flatten)]
    pub extraction: ExtractionParams,
    #[serde(flatten)]
    pub consolidation: ConsolidationParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Organizations compared through their projects' keyphrases
    pub organizations_projects: bool,
    /// Persons compared through their deliverables' projects and keyphrases
    pub persons: bool,
    #[serde(flatten)]
    pub params: SimilarityParams,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            organizations_projects: false,
            persons: true,
            params: SimilarityParams::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunityConfig {
    /// Louvain runs once per label over its `is_similar` relationships
    pub labels: Vec<String>,
    #[serde(flatten)]
    pub params: CommunityParams,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            labels: [schema::PROJECT, schema::ORGANIZATION, schema::DELIVERABLE, schema::PERSON]
                .iter()
                .map(|l| l.to_string())
                .collect(),
            params: CommunityParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a YAML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PipelineConfig = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = |name: &str, value: f64| -> Result<(), ConfigError> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{} must be within [0, 1], got {}", name, value)))
            }
        };
        unit("keyphrases.cutoff", self.keyphrases.consolidation.cutoff)?;
        unit("similarity.cutoff", self.similarity.params.cutoff)?;
        unit("link_prediction.holdout_fraction", self.link_prediction.holdout_fraction)?;
        unit("link_prediction.train_fraction", self.link_prediction.train_fraction)?;

        let (low, high) = self.keyphrases.extraction.ngram_range;
        if low == 0 || low > high {
            return Err(ConfigError::Invalid(format!("ngram_range ({}, {}) is empty", low, high)));
        }
        if self.keyphrases.extraction.top_n == 0 {
            return Err(ConfigError::Invalid("top_n must be positive".to_string()));
        }
        if self.similarity.params.top_k == 0 {
            return Err(ConfigError::Invalid("similarity.top_k must be positive".to_string()));
        }
        if self.link_prediction.validation_folds < 2 {
            return Err(ConfigError::Invalid("link_prediction.validation_folds must be at least 2".to_string()));
        }
        if self.link_prediction.penalties.is_empty() {
            return Err(ConfigError::Invalid("link_prediction.penalties is empty".to_string()));
        }
        if self.session.link_prediction && !self.session.run_algorithms {
            return Err(ConfigError::Invalid(
                "session.link_prediction needs session.run_algorithms".to_string(),
            ));
        }
        for label in &self.communities.labels {
            if schema::key_property(label).is_none() {
                return Err(ConfigError::Invalid(format!("unknown community label {}", label)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TrainMode;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert!(!config.session.extract_data);
        assert!(!config.session.create);
        assert!(config.session.run_algorithms);
        assert_eq!(config.keyphrases.extraction.top_n, 10);
        assert_eq!(config.keyphrases.extraction.ngram_range, (1, 3));
        assert_eq!(config.keyphrases.consolidation.cutoff, 0.7);
        assert_eq!(config.similarity.params.cutoff, 0.23);
        assert_eq!(config.similarity.params.top_k, 1);
        assert!(config.similarity.persons);
        assert!(!config.similarity.organizations_projects);
        assert_eq!(config.centrality.damping_factor, 0.85);
        assert_eq!(config.communities.labels.len(), 4);
        assert_eq!(config.link_prediction.mode, TrainMode::Train);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
paths:
  base_dir: /data/cordis
  snapshot: /var/lib/cordis.snap
session:
  create: true
keyphrases:
  top_n: 5
  cutoff: 0.8
similarity:
  organizations_projects: true
  top_k: 3
link_prediction:
  penalties: [0.0, 1.0]
  mode: evaluate
"#;
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.session.create);
        assert!(config.session.run_algorithms);
        assert_eq!(config.keyphrases.extraction.top_n, 5);
        assert_eq!(config.keyphrases.extraction.ngram_range, (1, 3));
        assert_eq!(config.keyphrases.consolidation.cutoff, 0.8);
        assert!(config.similarity.organizations_projects);
        assert!(config.similarity.persons);
        assert_eq!(config.similarity.params.top_k, 3);
        assert_eq!(config.similarity.params.cutoff, 0.23);
        assert_eq!(config.link_prediction.penalties, vec![0.0, 1.0]);
        assert_eq!(config.link_prediction.mode, TrainMode::Evaluate);
        assert_eq!(config.link_prediction.max_iterations, 1000);

        assert_eq!(
            config.paths.resolve(&config.paths.projects_csv),
            PathBuf::from("/data/cordis/cordis-h2020projects.csv")
        );
        assert_eq!(
            config.paths.resolve(&config.paths.snapshot),
            PathBuf::from("/var/lib/cordis.snap")
        );
    }

    #[test]
    fn test_load_rejects_bad_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cordis.yaml");
        fs::write(&path, "similarity:\n  cutoff: 1.5\n").unwrap();
        assert!(matches!(PipelineConfig::load(&path), Err(ConfigError::Invalid(_))));

        fs::write(&path, "communities:\n  labels: [Keyphrase, Grant]\n").unwrap();
        assert!(matches!(PipelineConfig::load(&path), Err(ConfigError::Invalid(_))));

        fs::write(&path, "session:\n  run_algorithms: false\n  link_prediction: true\n").unwrap();
        assert!(matches!(PipelineConfig::load(&path), Err(ConfigError::Invalid(_))));

        fs::write(&path, "session: [1, 2").unwrap();
        assert!(matches!(PipelineConfig::load(&path), Err(ConfigError::Parse { .. })));

        assert!(matches!(
            PipelineConfig::load(dir.path().join("missing.yaml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_load_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.yaml");
        fs::write(&path, "{}\n").unwrap();
        assert_eq!(PipelineConfig::load(&path).unwrap(), PipelineConfig::default());
    }
}
