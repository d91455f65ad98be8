//! Metadata store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::repos::ShortUrlRepo;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: ShortUrlRepo + Send + Sync {
    /// Create tables that do not exist yet.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;

    /// Close all connections. Further queries fail.
    async fn close(&self);
}

/// SQLite-backed metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and run migrations.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // One connection serializes writers; every operation is a single
            // autocommitted statement.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        tracing::info!(path = %path.display(), "Opened SQLite metadata store");
        Ok(store)
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

mod sqlite_impl {
    use super::*;
    use crate::models::ShortUrlRow;

    #[async_trait]
    impl ShortUrlRepo for SqliteStore {
        async fn insert_short_url(&self, row: &ShortUrlRow) -> MetadataResult<()> {
            match sqlx::query("INSERT INTO urls (token, url) VALUES (?, ?)")
                .bind(&row.token)
                .bind(&row.url)
                .execute(&self.pool)
                .await
            {
                Ok(_) => Ok(()),
                Err(sqlx::Error::Database(db_err)) => {
                    // SQLite error: "UNIQUE constraint failed: urls.token"
                    let msg = db_err.message();
                    if msg.contains("UNIQUE constraint") && msg.contains("urls.token") {
                        Err(MetadataError::AlreadyExists(format!(
                            "token {} already exists",
                            row.token
                        )))
                    } else {
                        Err(sqlx::Error::Database(db_err).into())
                    }
                }
                Err(e) => Err(e.into()),
            }
        }

        async fn get_short_url(&self, token: &str) -> MetadataResult<Option<String>> {
            let url: Option<String> =
                sqlx::query_scalar("SELECT url FROM urls WHERE token = ? LIMIT 1")
                    .bind(token)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(url)
        }

        async fn delete_short_url(&self, token: &str) -> MetadataResult<bool> {
            let result = sqlx::query("DELETE FROM urls WHERE token = ?")
                .bind(token)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        }

        async fn count_short_urls(&self) -> MetadataResult<u64> {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM urls")
                .fetch_one(&self.pool)
                .await?;
            Ok(u64::try_from(count).unwrap_or(0))
        }
    }
}

/// SQL schema for SQLite.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS urls (
    token TEXT PRIMARY KEY NOT NULL,
    url TEXT NOT NULL
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShortUrlRow;

    async fn open_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("urls.db")).await.unwrap();
        (store, dir)
    }

    fn row(token: &str, url: &str) -> ShortUrlRow {
        ShortUrlRow {
            token: token.to_string(),
            url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (store, _dir) = open_store().await;

        store
            .insert_short_url(&row("abc123", "https://example.com/x"))
            .await
            .unwrap();

        assert_eq!(
            store.get_short_url("abc123").await.unwrap().as_deref(),
            Some("https://example.com/x")
        );
        assert_eq!(store.get_short_url("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_token_is_already_exists() {
        let (store, _dir) = open_store().await;

        store
            .insert_short_url(&row("dup", "https://a.example"))
            .await
            .unwrap();
        let err = store
            .insert_short_url(&row("dup", "https://b.example"))
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::AlreadyExists(_)), "{err:?}");

        // Original mapping untouched.
        assert_eq!(
            store.get_short_url("dup").await.unwrap().as_deref(),
            Some("https://a.example")
        );
    }

    #[tokio::test]
    async fn test_delete_reports_rows() {
        let (store, _dir) = open_store().await;

        store
            .insert_short_url(&row("gone", "https://example.com"))
            .await
            .unwrap();
        assert!(store.delete_short_url("gone").await.unwrap());
        assert!(!store.delete_short_url("gone").await.unwrap());
        assert_eq!(store.get_short_url("gone").await.unwrap(), None);
        assert_eq!(store.count_short_urls().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent_and_persistent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.db");

        let store = SqliteStore::new(&path).await.unwrap();
        store
            .insert_short_url(&row("keep", "https://example.com"))
            .await
            .unwrap();
        store.migrate().await.unwrap();
        store.close().await;

        let reopened = SqliteStore::new(&path).await.unwrap();
        assert_eq!(reopened.count_short_urls().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_closed_store_fails_health_check() {
        let (store, _dir) = open_store().await;
        store.health_check().await.unwrap();
        store.close().await;
        assert!(store.health_check().await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_inserts_serialize() {
        let (store, _dir) = open_store().await;
        let store = std::sync::Arc::new(store);

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .insert_short_url(&row(&format!("t{i}"), "https://example.com"))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.count_short_urls().await.unwrap(), 20);
    }
}
