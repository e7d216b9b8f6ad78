//! One-shot collection over an ordered list of collectors.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::collectors::Collector;
use crate::metrics::{Collection, CollectorError, CollectorRegistry};

/// Invokes a fixed, ordered list of collectors once per call.
///
/// A failing collector contributes a [`CollectorError`] and never blocks or
/// skips the others. There is no retry here: one call is one attempt, and the
/// periodic driver is the only retry mechanism.
pub struct Runner {
    collectors: Vec<Arc<dyn Collector>>,
}

impl Runner {
    pub fn new(collectors: Vec<Arc<dyn Collector>>) -> Self {
        Self { collectors }
    }

    /// Build a runner over a registry's collectors in registration order.
    pub fn from_registry(registry: &CollectorRegistry) -> Self {
        Self::new(registry.collectors().to_vec())
    }

    /// Run every collector once and combine the outcome.
    ///
    /// Samples without a timestamp are stamped with the time captured at the
    /// start of the pass; collector-supplied timestamps are preserved.
    pub fn collect_once(&self) -> Collection {
        let now = Utc::now();
        let mut result = Collection::default();

        for collector in &self.collectors {
            match collector.collect() {
                Ok(mut samples) => {
                    for sample in &mut samples {
                        if sample.timestamp.is_none() {
                            sample.timestamp = Some(now);
                        }
                    }
                    result.samples.extend(samples);
                }
                Err(err) => {
                    debug!("collector {} failed: {}", collector.id(), err);
                    result.errors.push(CollectorError {
                        collector_id: collector.id().to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        result
    }
}
