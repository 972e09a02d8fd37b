//! # gx-db-sqlite Implementation
//!
//! `KvBackend` over a single SQLite table. Values are stored as JSON text;
//! keys use the default BINARY collation so prefix scans come back in the
//! same order as the in-memory backend.

use std::str::FromStr;

use async_trait::async_trait;
use gx_core::traits::KvBackend;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
    key   TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
)";

pub struct SqliteKvBackend {
    pool: SqlitePool,
}

impl SqliteKvBackend {
    /// Opens (creating if needed) the database at `url` and ensures the schema.
    ///
    /// An in-memory URL is pinned to one long-lived connection, since every
    /// new connection would otherwise see its own empty database.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(options).await?;

        sqlx::query(SCHEMA).execute(&pool).await?;
        log::info!("sqlite backend ready at {url}");
        Ok(Self { pool })
    }
}

#[async_trait]
impl KvBackend for SqliteKvBackend {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let row = sqlx::query("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(serde_json::from_str(&row.get::<String, _>("value"))?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO kv (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(serde_json::to_string(&value)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// All keys go in one transaction, so a failure leaves every key in place.
    async fn remove(&self, keys: &[String]) -> anyhow::Result<usize> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;
        for key in keys {
            removed += sqlx::query("DELETE FROM kv WHERE key = ?")
                .bind(key)
                .execute(&mut *tx)
                .await?
                .rows_affected() as usize;
        }
        tx.commit().await?;
        Ok(removed)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        // substr instead of LIKE: prefixes may contain `_` and `%`.
        let rows = sqlx::query(
            "SELECT key FROM kv WHERE substr(key, 1, length(?)) = ? ORDER BY key ASC",
        )
        .bind(prefix)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.get("key")).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gx_core::models::{AnnotationKind, AnnotationRecord, Author};
    use gx_core::AnnotationStore;
    use serde_json::json;
    use std::sync::Arc;

    async fn backend() -> SqliteKvBackend {
        SqliteKvBackend::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_set_get_overwrite() {
        let db = backend().await;
        assert_eq!(db.get("missing").await.unwrap(), None);

        db.set("filterKeyword", json!("rust")).await.unwrap();
        db.set("filterKeyword", json!("tokio")).await.unwrap();
        assert_eq!(db.get("filterKeyword").await.unwrap(), Some(json!("tokio")));
    }

    #[tokio::test]
    async fn test_prefix_scan_and_remove() {
        let db = backend().await;
        for key in ["ghost-like-2", "ghost-like-1", "ghost-likes", "ghost-reply-1", "ghost_like_3"] {
            db.set(key, json!([])).await.unwrap();
        }

        let keys = db.keys_with_prefix("ghost-like-").await.unwrap();
        assert_eq!(keys, vec!["ghost-like-1", "ghost-like-2"]);

        let removed = db
            .remove(&["ghost-like-1".to_string(), "nope".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(db.keys_with_prefix("ghost-like-").await.unwrap(), vec!["ghost-like-2"]);
    }

    #[tokio::test]
    async fn test_store_on_sqlite() {
        let store = AnnotationStore::new(Arc::new(backend().await));
        let record = AnnotationRecord::new(AnnotationKind::Like, "42", None, Author::Anonymous, None);

        assert_eq!(store.append(AnnotationKind::Like, "42", record.clone()).await.unwrap(), 1);
        assert_eq!(store.list(AnnotationKind::Like, "42").await.unwrap(), vec![record]);
        assert_eq!(store.clear_all_of_kind(AnnotationKind::Like).await.unwrap(), 1);
        assert!(store.list(AnnotationKind::Like, "42").await.unwrap().is_empty());
    }
}
