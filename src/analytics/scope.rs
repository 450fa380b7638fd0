//! Scoped projections
//!
//! A [`ProjectionScope`] defines a projection in the engine when created and
//! drops it when it goes out of scope, on every exit path.

use crate::engine::{AlgorithmOutcome, AlgorithmRequest, EngineResult, GraphEngine, Projection, ProjectionHandle};
use tracing::{debug, warn};

pub struct ProjectionScope<'e, E: GraphEngine + ?Sized> {
    engine: &'e E,
    projection: Projection,
    handle: ProjectionHandle,
}

impl<'e, E: GraphEngine + ?Sized> ProjectionScope<'e, E> {
    /// A projection for the algorithm calls made through this scope
    pub fn anonymous(engine: &'e E, projection: &Projection) -> EngineResult<Self> {
        Self::define(engine, projection, None)
    }

    /// A named projection; required by relationship splitting
    pub fn named(engine: &'e E, projection: &Projection, name: &str) -> EngineResult<Self> {
        Self::define(engine, projection, Some(name))
    }

    fn define(engine: &'e E, projection: &Projection, name: Option<&str>) -> EngineResult<Self> {
        let handle = engine.define_projection(projection, name)?;
        debug!(projection = %handle.name, spec = %projection, "projection scope opened");
        Ok(ProjectionScope {
            engine,
            projection: projection.clone(),
            handle,
        })
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn handle(&self) -> &ProjectionHandle {
        &self.handle
    }

    pub fn run(&self, request: &AlgorithmRequest) -> EngineResult<AlgorithmOutcome> {
        self.engine.run_algorithm(&self.handle, request)
    }
}

impl<E: GraphEngine + ?Sized> Drop for ProjectionScope<'_, E> {
    fn drop(&mut self) {
        match self.engine.drop_projection(&self.handle) {
            Ok(()) => debug!(projection = %self.handle.name, "projection scope closed"),
            Err(e) => warn!(projection = %self.handle.name, error = %e, "failed to drop projection"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EmbeddedEngine, Orientation};
    use crate::graph::{NodeKey, PropertyMap};

    fn engine() -> EmbeddedEngine {
        let engine = EmbeddedEngine::in_memory();
        engine
            .upsert_node(&NodeKey::new("Person", "name", "Ann"), PropertyMap::new())
            .unwrap();
        engine
    }

    #[test]
    fn test_named_projection_is_dropped_with_scope() {
        let engine = engine();
        let projection = Projection::new(["Person"], ["is_similar"], Orientation::Undirected);
        {
            let scope = ProjectionScope::named(&engine, &projection, "graph").unwrap();
            assert_eq!(scope.handle().name, "graph");
        }
        // The name is free again once the scope is gone
        let again = ProjectionScope::named(&engine, &projection, "graph").unwrap();
        assert!(!again.handle().anonymous);
    }

    #[test]
    fn test_scope_is_dropped_on_error_path() {
        let engine = engine();
        let projection = Projection::new(["Person"], ["is_similar"], Orientation::Natural);

        let failing = || -> EngineResult<()> {
            let scope = ProjectionScope::named(&engine, &projection, "graph")?;
            scope.run(&AlgorithmRequest::PageRank {
                damping_factor: 0.85,
                max_iterations: 20,
                write_property: "pagerank".to_string(),
            })?;
            Err(crate::engine::EngineError::Algorithm("stage failed".to_string()))
        };
        assert!(failing().is_err());
        assert!(ProjectionScope::named(&engine, &projection, "graph").is_ok());
    }
}
