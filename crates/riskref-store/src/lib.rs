//! Storage layer: DuckDB-backed persistence for published reference catalogs.

mod batches;
mod duck;
mod error;

pub use batches::to_record_batch;
pub use duck::{DuckStore, DuckTransaction, SnapshotInfo};
pub use error::StoreError;
