//! Shared state between the collection and notification loops.
//!
//! The only cross-loop state is the most recently completed collection:
//! single writer (the collection loop), single reader (the notification
//! loop). The reader clones the snapshot under the read lock and works on
//! the copy.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::metrics::Collection;

/// Type alias for the shared latest-collection cell.
pub type SharedLatest = Arc<RwLock<Option<Collection>>>;

/// Fresh cell with no completed collection yet.
pub fn shared_latest() -> SharedLatest {
    Arc::new(RwLock::new(None))
}
