//! On-disk snapshots of retrieved transfer windows.

pub mod snapshot;

pub use snapshot::{SnapshotStore, StoreError};
