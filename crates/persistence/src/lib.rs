#![deny(warnings)]

//! Persistence layer: SQLite schema and queries for users, territories and
//! troops.
//!
//! [`Store`] owns a long-lived connection pool. Query helpers in [`users`],
//! [`territories`] and [`troops`] take a plain `&mut SqliteConnection` so the
//! runtime can compose several of them inside one transaction.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

pub mod error;
pub mod territories;
pub mod troops;
pub mod users;

pub use error::StoreError;

/// Default maximum number of pooled connections for file databases.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// How long a writer waits on a locked database before failing.
const BUSY_TIMEOUT_SECS: u64 = 5;

/// Returns the default SQLite URL used for local saves.
pub fn default_sqlite_url() -> &'static str {
    conquest_core::config::DEFAULT_DATABASE_URL
}

/// True for URLs that name a private in-memory database.
pub fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Create the parent directory of a file-backed SQLite URL.
pub fn ensure_parent_dir(url: &str) -> std::io::Result<()> {
    if is_memory_url(url) {
        return Ok(());
    }
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .map(|p| p.split('?').next().unwrap_or(p));
    if let Some(path) = path {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}

/// Handle to the game database.
///
/// Cloning is cheap and shares the pool.
#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if needed) the database at `url` and apply the schema.
    ///
    /// In-memory URLs get a single never-recycled connection so every caller
    /// sees the same database.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        ensure_parent_dir(url)?;
        let opts = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS));
        let pool = if is_memory_url(url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(opts)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(DEFAULT_MAX_CONNECTIONS)
                .connect_with(opts)
                .await?
        };
        let store = Self { pool };
        store.migrate().await?;
        info!(url, "store ready");
        Ok(store)
    }

    /// Fresh private in-memory database with the schema applied.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:").await
    }

    /// Apply pending schema migrations. Safe to call repeatedly.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Start a transaction. Dropping it without `commit` rolls back.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, StoreError> {
        Ok(self.pool.begin().await?)
    }

    /// Underlying pool, for read-only queries outside a transaction.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_is_sqlite() {
        assert!(default_sqlite_url().starts_with("sqlite://"));
    }

    #[test]
    fn memory_urls_are_detected() {
        assert!(is_memory_url("sqlite::memory:"));
        assert!(is_memory_url("sqlite://file:game?mode=memory&cache=shared"));
        assert!(!is_memory_url("sqlite://./saves/conquest.db"));
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let store = Store::in_memory().await.unwrap();
        store.migrate().await.unwrap();
        let n: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'territories', 'troops')",
        )
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(n, 3);
    }
}
