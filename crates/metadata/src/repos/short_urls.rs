//! Short URL repository trait.

use crate::error::MetadataResult;
use crate::models::ShortUrlRow;
use async_trait::async_trait;

/// Token to URL mappings. Rows are immutable once inserted.
#[async_trait]
pub trait ShortUrlRepo: Send + Sync {
    /// Insert a new mapping.
    ///
    /// Returns `MetadataError::AlreadyExists` if the token is taken.
    async fn insert_short_url(&self, row: &ShortUrlRow) -> MetadataResult<()>;

    /// Look up the target URL for a token.
    async fn get_short_url(&self, token: &str) -> MetadataResult<Option<String>>;

    /// Delete a mapping. Returns `false` if no row matched.
    async fn delete_short_url(&self, token: &str) -> MetadataResult<bool>;

    /// Number of stored mappings.
    async fn count_short_urls(&self) -> MetadataResult<u64>;
}
