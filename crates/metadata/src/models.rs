//! Database models mapping to the metadata schema.

use sqlx::FromRow;

/// A row of the `urls` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ShortUrlRow {
    pub token: String,
    pub url: String,
}

impl From<shrink_core::ShortUrl> for ShortUrlRow {
    fn from(short: shrink_core::ShortUrl) -> Self {
        Self {
            token: short.token,
            url: short.url,
        }
    }
}
