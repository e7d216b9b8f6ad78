//! Metric collectors and the capability trait they implement.
//!
//! Each collector produces the samples for one metric family:
//! - [`thermal::ThermalZoneTemp`]: CPU temperature from sysfs
//! - [`cooling::CoolingDeviceState`]: thermal throttle state from sysfs
//! - [`cpu::CpuUtilization`]: per-core utilization deltas from /proc/stat
//! - [`storage::StorageUsage`]: filesystem usage via statvfs + mountinfo

pub mod cooling;
pub mod cpu;
pub mod storage;
pub mod thermal;

pub use cooling::CoolingDeviceState;
pub use cpu::CpuUtilization;
pub use storage::StorageUsage;
pub use thermal::ThermalZoneTemp;

use std::io;
use std::path::PathBuf;

use crate::metrics::Sample;

/// Failure modes shared by all collectors.
///
/// A `Parse` error means the read was aborted as a whole; stateful collectors
/// keep their previous snapshot in that case.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parse {}: invalid {what} {value:?}", .path.display())]
    Parse {
        path: PathBuf,
        what: &'static str,
        value: String,
    },

    #[error("{}: {reason}", .path.display())]
    Empty { path: PathBuf, reason: &'static str },

    #[error("statvfs {}: {source}", .path.display())]
    Statvfs {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no storage paths configured")]
    NoPaths,
}

/// One metric family's sample producer.
///
/// Implementations are constructed once at startup and live for the process
/// lifetime. `collect` is invoked sequentially by the runner, but stateful
/// implementations guard their state so concurrent invocation stays safe.
pub trait Collector: Send + Sync {
    /// Short stable identifier, unique within a registry. Used for error
    /// attribution and registration deduplication.
    fn id(&self) -> &'static str;

    /// Produce this collector's samples for the current tick.
    fn collect(&self) -> Result<Vec<Sample>, CollectError>;
}
