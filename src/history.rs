//! SQLite store for completed analyses
//!
//! Every analysis served over the API is recorded under the name of the API
//! key that requested it, and can be listed back newest first with
//! limit/offset pagination.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;

use crate::analysis::CostAnalysisResult;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Where an analysis came from: `manual` or the uploaded file's format
pub const MANUAL_SOURCE: &str = "manual";

/// A stored analysis as returned by the history endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    pub id: i64,
    pub source: String,
    pub filename: Option<String>,
    pub created_at: DateTime<Utc>,
    pub analysis: CostAnalysisResult,
}

/// Analysis history handle
///
/// Wraps a SQLite pool; cheap to share behind an `Arc`.
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    /// Open (or create) the database at `database_url` and run migrations
    ///
    /// * `database_url` - e.g. "sqlite:./data/history.db" or "sqlite::memory:"
    pub async fn connect(database_url: &str) -> Result<Self> {
        let in_memory = database_url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid history database URL '{}'", database_url))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(30));

        let mut pool_options = SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(30));

        if in_memory {
            // A closed connection takes an in-memory database with it
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            if let Some(parent) = options.get_filename().parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create history directory {}", parent.display())
                    })?;
                }
            }
            options = options.journal_mode(SqliteJournalMode::Wal);
            pool_options = pool_options.max_connections(5);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .context("Failed to connect to history database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run history database migrations")?;

        tracing::info!(database_url, "Analysis history ready");
        Ok(Self { pool })
    }

    /// Record a completed analysis; returns the new record id
    pub async fn save(
        &self,
        api_key_name: &str,
        source: &str,
        filename: Option<&str>,
        analysis: &CostAnalysisResult,
    ) -> Result<i64> {
        let result_json = serde_json::to_string(analysis)?;

        let id = sqlx::query(
            "INSERT INTO analyses (api_key_name, source, filename, monthly_bill, potential_savings, result, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(api_key_name)
        .bind(source)
        .bind(filename)
        .bind(analysis.current_bill.to_string())
        .bind(analysis.potential_savings.to_string())
        .bind(&result_json)
        .bind(analysis.analysis_date.timestamp_millis())
        .execute(&self.pool)
        .await
        .context("Failed to insert analysis")?
        .last_insert_rowid();

        Ok(id)
    }

    /// One page of `api_key_name`'s analyses, newest first
    pub async fn list(&self, api_key_name: &str, limit: u32, offset: u32) -> Result<Vec<AnalysisRecord>> {
        let rows = sqlx::query(
            "SELECT id, source, filename, result, created_at
             FROM analyses
             WHERE api_key_name = ?
             ORDER BY created_at DESC, id DESC
             LIMIT ? OFFSET ?",
        )
        .bind(api_key_name)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await
        .context("Failed to query analyses")?;

        rows.into_iter()
            .map(|row| -> Result<AnalysisRecord> {
                let result: String = row.try_get("result")?;
                let created_at: i64 = row.try_get("created_at")?;
                Ok(AnalysisRecord {
                    id: row.try_get("id")?,
                    source: row.try_get("source")?,
                    filename: row.try_get("filename")?,
                    created_at: DateTime::from_timestamp_millis(created_at)
                        .context("Stored analysis has an out-of-range timestamp")?,
                    analysis: serde_json::from_str(&result)
                        .context("Stored analysis is not valid JSON")?,
                })
            })
            .collect()
    }

    /// Number of analyses stored for `api_key_name`
    pub async fn count(&self, api_key_name: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM analyses WHERE api_key_name = ?")
            .bind(api_key_name)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count analyses")?;
        Ok(count.max(0) as u64)
    }
}
