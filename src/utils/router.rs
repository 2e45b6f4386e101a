//! Per-source accessor routing

use std::collections::HashMap;

use crate::traits::SourceAccessor;
use crate::types::*;

/// Routes each query to the accessor configured for that source
///
/// Lets one run mix backends (the primary ledger on a live database
/// accessor, the fallback regions on file accessors) while the matcher
/// keeps seeing a single [`SourceAccessor`]. A source without a route
/// reports itself unavailable, which the matcher treats as a soft
/// failure.
#[derive(Default)]
pub struct SourceRouter {
    routes: HashMap<String, Box<dyn SourceAccessor>>,
}

impl SourceRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route queries for a source name to the given accessor
    pub fn route(mut self, source_name: &str, accessor: Box<dyn SourceAccessor>) -> Self {
        self.routes.insert(source_name.to_string(), accessor);
        self
    }
}

impl SourceAccessor for SourceRouter {
    fn query(&self, spec: &SourceSpec, query: &MovementQuery) -> ReconcileResult<Vec<SourceRow>> {
        match self.routes.get(&spec.name) {
            Some(accessor) => accessor.query(spec, query),
            None => Err(ReconcileError::SourceUnavailable(format!(
                "No accessor routed for source '{}'",
                spec.name
            ))),
        }
    }
}
