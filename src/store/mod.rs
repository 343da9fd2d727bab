mod history;
mod images;

pub use history::SqliteHistoryStore;
pub use images::{FsImageStore, UploadCoordinator, UploadSlot};

use std::future::Future;
use std::path::PathBuf;

use crate::error::GraderError;
use crate::models::HistoryRecord;

/// Write-once storage of raw images under opaque object keys.
pub trait ImageStore {
    fn fetch(&self, key: &str) -> impl Future<Output = Result<Vec<u8>, GraderError>>;
    /// Stores the bytes under `key`. A key can be written exactly once;
    /// a second put is a `StorageFailure`.
    fn put(
        &self,
        key: &str,
        bytes: &[u8],
        mime: &str,
    ) -> impl Future<Output = Result<(), GraderError>>;
    /// Where a client is expected to write the bytes for `key`.
    fn locator(&self, key: &str) -> PathBuf;
}

/// Recency window/cursor for history queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryQuery {
    /// Maximum number of records; unlimited when absent.
    pub limit: Option<u32>,
    /// Only records strictly older than this unix-ms timestamp.
    pub before_ms: Option<i64>,
}

/// Append-only, time-ordered record of past gradings.
pub trait HistoryStore {
    /// Atomic: a record is either fully visible to concurrent queries or
    /// not visible at all.
    fn append(&self, record: &HistoryRecord) -> impl Future<Output = Result<(), GraderError>>;
    /// Most recent first, non-increasing timestamps.
    fn query(
        &self,
        query: HistoryQuery,
    ) -> impl Future<Output = Result<Vec<HistoryRecord>, GraderError>>;
}
