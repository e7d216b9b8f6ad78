//! Argus Host Reporter Library
//!
//! Periodic host telemetry sampling for Linux. Collectors read CPU
//! temperature, per-core utilization, the thermal cooling device state and
//! filesystem usage; a runner combines their output into a single result
//! with per-collector failure isolation; exporters deliver that result as
//! JSON Lines or as a rate-limited chat-webhook message.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use argus_host_reporter::collectors::CpuUtilization;
//! use argus_host_reporter::{CollectorRegistry, Runner};
//!
//! let mut registry = CollectorRegistry::new();
//! registry
//!     .register(Arc::new(CpuUtilization::default()))
//!     .unwrap();
//!
//! let runner = Runner::from_registry(&registry);
//!
//! // First pass warms up the utilization baseline; a failing collector
//! // shows up as an attributed error instead of aborting the pass.
//! let result = runner.collect_once();
//! assert!(result.errors.len() <= registry.len());
//! ```

pub mod cli;
pub mod collectors;
pub mod config;
pub mod exporters;
pub mod metrics;
pub mod state;

// Re-export main types for convenience
pub use collectors::{CollectError, Collector};
pub use exporters::{ExportError, Exporter};
pub use metrics::{Collection, CollectorError, CollectorRegistry, RegistryError, Runner, Sample};
