//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// A boxed stream of file contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Flat store of uploaded files keyed by their full filename.
///
/// Keys are single path components. Backends reject anything else.
#[async_trait]
pub trait FileStore: Send + Sync + 'static {
    /// Store a new file.
    ///
    /// Never overwrites: returns [`StorageError::AlreadyExists`](crate::StorageError::AlreadyExists)
    /// when the key is taken.
    async fn save(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Open a file for reading as a chunked stream. Returns `NotFound` if absent.
    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream>;

    /// Delete a file.
    ///
    /// Returns `false` if there was nothing to delete.
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// List every stored file.
    async fn list(&self) -> StorageResult<Vec<ObjectMeta>>;

    /// Get the backend name for logging.
    fn backend_name(&self) -> &'static str {
        "unknown"
    }

    /// Verify the backend is usable.
    ///
    /// Called at startup and by the health endpoint.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Metadata about a stored file.
#[derive(Clone, Debug)]
pub struct ObjectMeta {
    /// Storage key (the full filename).
    pub key: String,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time (if available).
    pub last_modified: Option<time::OffsetDateTime>,
}
