//! Graph projections
//!
//! A projection names the node labels and relationship types an algorithm
//! sees, and how each relationship type is oriented.

use crate::graph::{EdgeType, Label};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How stored relationships appear inside a projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Orientation {
    /// Stored direction
    #[default]
    Natural,
    /// Every relationship flipped
    Reverse,
    /// Every relationship in both directions
    Undirected,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Orientation::Natural => "NATURAL",
            Orientation::Reverse => "REVERSE",
            Orientation::Undirected => "UNDIRECTED",
        })
    }
}

/// One projected relationship type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelSpec {
    pub rel_type: EdgeType,
    pub orientation: Orientation,
    /// Relationship properties carried into the projection
    pub properties: Vec<String>,
}

impl RelSpec {
    pub fn new(rel_type: impl Into<EdgeType>, orientation: Orientation) -> Self {
        RelSpec {
            rel_type: rel_type.into(),
            orientation,
            properties: Vec::new(),
        }
    }

    pub fn with_properties(mut self, properties: &[&str]) -> Self {
        self.properties = properties.iter().map(|p| p.to_string()).collect();
        self
    }
}

/// Relationship entries accepted by [`Projection::new`]: a bare type takes the
/// projection's default orientation, a full spec keeps its own.
#[derive(Debug, Clone)]
pub enum RelEntry {
    Bare(EdgeType),
    Spec(RelSpec),
}

impl From<&str> for RelEntry {
    fn from(rel_type: &str) -> Self {
        RelEntry::Bare(EdgeType::new(rel_type))
    }
}

impl From<EdgeType> for RelEntry {
    fn from(rel_type: EdgeType) -> Self {
        RelEntry::Bare(rel_type)
    }
}

impl From<RelSpec> for RelEntry {
    fn from(spec: RelSpec) -> Self {
        RelEntry::Spec(spec)
    }
}

/// Immutable projection description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    pub node_labels: Vec<Label>,
    pub rel_specs: Vec<RelSpec>,
}

impl Projection {
    pub fn new<L, R>(node_labels: L, rel_entries: R, default_orientation: Orientation) -> Self
    where
        L: IntoIterator,
        L::Item: Into<Label>,
        R: IntoIterator,
        R::Item: Into<RelEntry>,
    {
        let rel_specs = rel_entries
            .into_iter()
            .map(|entry| match entry.into() {
                RelEntry::Bare(rel_type) => RelSpec::new(rel_type, default_orientation),
                RelEntry::Spec(spec) => spec,
            })
            .collect();

        Projection {
            node_labels: node_labels.into_iter().map(Into::into).collect(),
            rel_specs,
        }
    }

    pub fn rel_types(&self) -> impl Iterator<Item = &EdgeType> {
        self.rel_specs.iter().map(|s| &s.rel_type)
    }

    pub fn has_label(&self, label: &Label) -> bool {
        self.node_labels.contains(label)
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.node_labels.iter().map(|l| l.as_str()).collect();
        let rels: Vec<String> = self
            .rel_specs
            .iter()
            .map(|s| format!("{}:{}", s.rel_type, s.orientation))
            .collect();
        write!(f, "[{}] -> [{}]", labels.join(", "), rels.join(", "))
    }
}

/// Handle to a projection defined in the engine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectionHandle {
    pub name: String,
    /// Anonymous projections are created for a single algorithm call
    pub anonymous: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_types_take_default_orientation() {
        let projection = Projection::new(
            ["Project", "Keyphrase"],
            [RelEntry::from("includes")],
            Orientation::Undirected,
        );
        assert_eq!(projection.rel_specs.len(), 1);
        assert_eq!(projection.rel_specs[0].orientation, Orientation::Undirected);
        assert!(projection.has_label(&Label::new("Keyphrase")));
    }

    #[test]
    fn test_full_specs_keep_their_orientation() {
        let projection = Projection::new(
            ["Organization", "Project", "Keyphrase"],
            [
                RelEntry::from(RelSpec::new("participates_in", Orientation::Natural)),
                RelEntry::from("includes"),
            ],
            Orientation::Reverse,
        );
        assert_eq!(projection.rel_specs[0].orientation, Orientation::Natural);
        assert_eq!(projection.rel_specs[1].orientation, Orientation::Reverse);
        assert_eq!(
            projection.to_string(),
            "[Organization, Project, Keyphrase] -> [participates_in:NATURAL, includes:REVERSE]"
        );
    }
}
