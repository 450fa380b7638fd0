//! Embedded property graph
//!
//! Nodes carry one label and a property map; relationships are directed and
//! typed. Natural keys are enforced through `(label, property)` uniqueness
//! constraints.

pub mod edge;
pub mod node;
pub mod property;
pub mod store;
pub mod types;

pub use edge::Edge;
pub use node::Node;
pub use property::{PropertyMap, PropertyValue};
pub use store::{GraphError, GraphResult, GraphStore};
pub use types::{EdgeId, EdgeType, KeyValue, Label, NodeId, NodeKey};
