//! Keeps the persisted snapshot current and publishes it to readers.

mod cache_maintainer;
mod snapshot_service;
mod snapshot_store;

pub use cache_maintainer::{CacheMaintainer, CycleReport};
pub use snapshot_service::{FileStream, LookupError, ServiceError, ServingMode, SnapshotService};
pub use snapshot_store::{SnapshotStore, SnapshotStoreError};
