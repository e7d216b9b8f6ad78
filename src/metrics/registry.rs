//! Collector registry with uniqueness enforcement.
//!
//! The registry is an explicit value owned by the caller, constructed once at
//! startup and handed to the [`Runner`](crate::metrics::Runner). Registration
//! order is preserved and becomes the collection order.

use std::sync::Arc;

use crate::collectors::Collector;

/// Rejected registrations. Detected before the periodic loops start, so these
/// are fatal to startup.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("collector ID cannot be empty")]
    EmptyId,

    #[error("collector already registered: {0}")]
    Duplicate(String),
}

/// Ordered name→collector registry.
#[derive(Default)]
pub struct CollectorRegistry {
    collectors: Vec<Arc<dyn Collector>>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collector. Fails without modifying the registry if the id
    /// is empty or already taken.
    pub fn register(&mut self, collector: Arc<dyn Collector>) -> Result<(), RegistryError> {
        let id = collector.id();
        if id.is_empty() {
            return Err(RegistryError::EmptyId);
        }
        if self.collectors.iter().any(|c| c.id() == id) {
            return Err(RegistryError::Duplicate(id.to_string()));
        }
        self.collectors.push(collector);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Collector>> {
        self.collectors.iter().find(|c| c.id() == id).cloned()
    }

    /// Collectors in registration order.
    pub fn collectors(&self) -> &[Arc<dyn Collector>] {
        &self.collectors
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }
}
