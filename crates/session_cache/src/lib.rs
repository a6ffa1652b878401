use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};

/// Locally persisted key-value session state for the console client.
///
/// The cache is opaque to the orchestration layer: values go in and come out
/// as strings, and logout wipes the whole table in one call.
#[derive(Clone)]
pub struct SessionCache {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

impl SessionCache {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        let cache = Self { pool };
        cache.ensure_schema().await?;
        Ok(cache)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS session_state (
                key        TEXT NOT NULL PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create session_state table")?;
        Ok(())
    }

    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO session_state (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE
            SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to store session key '{key}'"))?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM session_state WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read session key '{key}'"))?;
        Ok(row.map(|row| row.get::<String, _>("value")))
    }

    pub async fn entries(&self) -> Result<Vec<CachedEntry>> {
        let rows = sqlx::query("SELECT key, value, updated_at FROM session_state ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .context("failed to list session entries")?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let key: String = row.get("key");
            let raw_updated_at: String = row.get("updated_at");
            let updated_at = DateTime::parse_from_rfc3339(&raw_updated_at)
                .map(|stamp| stamp.with_timezone(&Utc))
                .with_context(|| format!("invalid updated_at for session key '{key}'"))?;
            entries.push(CachedEntry {
                key,
                value: row.get("value"),
                updated_at,
            });
        }
        Ok(entries)
    }

    pub async fn remove(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM session_state WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to remove session key '{key}'"))?;
        Ok(result.rows_affected() > 0)
    }

    /// Wipe every cached entry. Returns how many rows were dropped.
    pub async fn clear_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM session_state")
            .execute(&self.pool)
            .await
            .context("failed to clear session state")?;
        Ok(result.rows_affected())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
