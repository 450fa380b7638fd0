//! Graph vocabulary: labels, key properties and relationship types

use crate::graph::{EdgeType, Label};

pub const PROJECT: &str = "Project";
pub const DELIVERABLE: &str = "Deliverable";
pub const ORGANIZATION: &str = "Organization";
pub const PERSON: &str = "Person";
pub const KEYPHRASE: &str = "Keyphrase";

pub const PARTICIPATES_IN: &str = "participates_in";
pub const COORDINATES: &str = "coordinates";
pub const INCLUDES: &str = "includes";
pub const BELONGS: &str = "belongs";
pub const WRITES: &str = "writes";
pub const IS_SIMILAR: &str = "is_similar";

/// Property carrying the similarity score on `is_similar`
pub const SCORE: &str = "score";
pub const PAGERANK: &str = "pagerank";
pub const COMMUNITY: &str = "community";

/// `(label, key property)` of every entity, in declaration order
pub const NODE_KEYS: [(&str, &str); 5] = [
    (PROJECT, "id"),
    (DELIVERABLE, "rcn"),
    (PERSON, "name"),
    (ORGANIZATION, "name"),
    (KEYPHRASE, "name"),
];

/// Key property of `label`, if it is an entity label
pub fn key_property(label: &str) -> Option<&'static str> {
    NODE_KEYS.iter().find(|(l, _)| *l == label).map(|(_, p)| *p)
}

pub fn label(name: &str) -> Label {
    Label::new(name)
}

pub fn rel(name: &str) -> EdgeType {
    EdgeType::new(name)
}
