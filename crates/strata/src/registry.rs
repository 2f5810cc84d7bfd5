//! Registry of available filters.
//!
//! An explicit context object: construct one at startup, pass it by
//! reference to whatever loads pipelines. No process-wide singletons.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::filter::Filter;

/// Registry mapping stable filter identities to prototype instances.
///
/// Filters are stateless (per-run state lives in `BoundFilter`), so a
/// registered instance serves directly as the prototype for every
/// pipeline node that names it.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: IndexMap<String, Arc<dyn Filter>>,
    by_uuid: IndexMap<String, String>,
}

impl FilterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter under its declared class name and UUID.
    pub fn register(&mut self, filter: impl Filter + 'static) {
        self.register_arc(Arc::new(filter));
    }

    pub fn register_arc(&mut self, filter: Arc<dyn Filter>) {
        let decl = filter.decl();
        let id = decl.id.clone();
        self.by_uuid.insert(decl.uuid.clone(), id.clone());
        self.filters.insert(id, filter);
    }

    /// Get a filter by class name.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Filter>> {
        self.filters.get(id).cloned()
    }

    /// Get a filter by UUID alias.
    pub fn get_by_uuid(&self, uuid: &str) -> Option<Arc<dyn Filter>> {
        self.by_uuid.get(uuid).and_then(|id| self.get(id))
    }

    /// Iterate over registered filters in registration order.
    pub fn filters(&self) -> impl Iterator<Item = &Arc<dyn Filter>> {
        self.filters.values()
    }

    /// Number of registered filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
