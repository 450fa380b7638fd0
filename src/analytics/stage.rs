//! Pipeline stage ordering
//!
//! `Idle → ConstraintsEnsured → GraphBuilt → SimilarityComputed →
//! CentralityComputed → CommunitiesComputed → [LinkModelTrained] → Idle`
//!
//! An operation either repeats the current stage or advances exactly one.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Stage {
    #[default]
    Idle,
    ConstraintsEnsured,
    GraphBuilt,
    SimilarityComputed,
    CentralityComputed,
    CommunitiesComputed,
    LinkModelTrained,
}

impl Stage {
    /// The stage that follows this one, if any
    pub fn next(self) -> Option<Stage> {
        use Stage::*;
        match self {
            Idle => Some(ConstraintsEnsured),
            ConstraintsEnsured => Some(GraphBuilt),
            GraphBuilt => Some(SimilarityComputed),
            SimilarityComputed => Some(CentralityComputed),
            CentralityComputed => Some(CommunitiesComputed),
            CommunitiesComputed => Some(LinkModelTrained),
            LinkModelTrained => None,
        }
    }

    /// Whether an operation producing `target` may run from `self`
    pub fn permits(self, target: Stage) -> bool {
        self == target || self.next() == Some(target)
    }

    /// The stage an operation producing `target` must start from
    pub fn required_for(target: Stage) -> Stage {
        use Stage::*;
        match target {
            Idle | ConstraintsEnsured => Idle,
            GraphBuilt => ConstraintsEnsured,
            SimilarityComputed => GraphBuilt,
            CentralityComputed => SimilarityComputed,
            CommunitiesComputed => CentralityComputed,
            LinkModelTrained => CommunitiesComputed,
        }
    }

    /// Whether the graph has been fully constructed
    pub fn graph_available(self) -> bool {
        self >= Stage::GraphBuilt
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::ConstraintsEnsured => "constraints ensured",
            Stage::GraphBuilt => "graph built",
            Stage::SimilarityComputed => "similarity computed",
            Stage::CentralityComputed => "centrality computed",
            Stage::CommunitiesComputed => "communities computed",
            Stage::LinkModelTrained => "link model trained",
        };
        f.write_str(name)
    }
}
