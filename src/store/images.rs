use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::error::GraderError;
use crate::models::now_ms;
use crate::store::ImageStore;

/// Filesystem image store: one file per object key under a root directory.
/// Keys are generated uuid filenames, so a key never escapes the root.
#[derive(Debug, Clone)]
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, GraderError> {
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
            return Err(GraderError::FetchFailure(format!(
                "malformed object key {key:?}"
            )));
        }
        Ok(self.root.join(key))
    }
}

impl ImageStore for FsImageStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, GraderError> {
        let path = self.path_for(key)?;
        async_fs::read(&path)
            .await
            .map_err(|e| GraderError::FetchFailure(format!("failed to read {path:?}: {e}")))
    }

    async fn put(&self, key: &str, bytes: &[u8], mime: &str) -> Result<(), GraderError> {
        let path = self.path_for(key).map_err(|e| match e {
            GraderError::FetchFailure(msg) => GraderError::StorageFailure(msg),
            other => other,
        })?;
        // create_new makes the write-once check atomic: of two concurrent
        // puts on one key, exactly one creates the file.
        let mut file = match async_fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(GraderError::StorageFailure(format!(
                    "object key {key:?} already written"
                )));
            }
            Err(e) => {
                return Err(GraderError::StorageFailure(format!(
                    "failed to create {path:?}: {e}"
                )));
            }
        };
        file.write_all(bytes)
            .await
            .map_err(|e| GraderError::StorageFailure(format!("failed to write {path:?}: {e}")))?;
        debug!(key, mime, size = bytes.len(), "stored image");
        Ok(())
    }

    fn locator(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

/// A short-lived, one-shot permission to write one image.
#[derive(Debug, Clone, Serialize)]
pub struct UploadSlot {
    pub object_key: String,
    /// Where the client is expected to write the bytes.
    pub locator: PathBuf,
    pub mime: String,
    /// Unix milliseconds after which the slot can no longer be redeemed.
    pub expires_at_ms: i64,
}

/// Issues time-limited upload slots ahead of processing.
#[derive(Debug, Clone)]
pub struct UploadCoordinator<S> {
    store: S,
    ttl: Duration,
}

impl<S: ImageStore> UploadCoordinator<S> {
    pub fn new(store: S, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Mint an object key for a client-supplied filename. The extension is
    /// kept so stored files stay self-describing; the key itself is opaque.
    pub fn issue_slot(&self, filename: &str) -> UploadSlot {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("img")
            .to_ascii_lowercase();
        let mime = match ext.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            _ => "application/octet-stream",
        };
        let object_key = format!("{}.{}", Uuid::new_v4(), ext);
        UploadSlot {
            locator: self.store.locator(&object_key),
            object_key,
            mime: mime.to_string(),
            expires_at_ms: now_ms() + self.ttl.as_millis() as i64,
        }
    }

    /// Write the uploaded bytes through the slot. Fails once the slot has
    /// expired; the store's write-once rule makes redeeming twice fail too.
    pub async fn redeem(&self, slot: &UploadSlot, bytes: &[u8]) -> Result<(), GraderError> {
        if now_ms() > slot.expires_at_ms {
            return Err(GraderError::StorageFailure(format!(
                "upload slot for {} expired",
                slot.object_key
            )));
        }
        self.store.put(&slot.object_key, bytes, &slot.mime).await
    }
}
