//! Store gateway over the notification and cycle-log tables.
//!
//! All writes go through [`Store::process_batch`], which checks existence
//! by identifier or content hash before inserting and fails closed on any
//! backend error; one record's failure never aborts the batch. The
//! `source_id` UNIQUE constraint is the real dedup guarantee; the
//! existence check just avoids pointless insert attempts. Every operation
//! is bounded by the configured store timeout.

use std::future::Future;
use std::time::Duration;

use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::models::{
    BatchStats, CourtCount, CycleLogEntry, CycleReport, Record, StoreTotals, StoredRecord,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store query failed: {0}")]
    Backend(#[from] sqlx::Error),
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
}

pub struct Store {
    pool: SqlitePool,
    op_timeout: Duration,
}

impl Store {
    pub fn new(pool: SqlitePool, op_timeout: Duration) -> Self {
        Self { pool, op_timeout }
    }

    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        Ok(Self::new(pool, Duration::from_secs(config.db.timeout_secs)))
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout(self.op_timeout)),
        }
    }

    /// Look up a record by identifier, or by content hash when one is
    /// provided. Returns the first match found.
    pub async fn exists(
        &self,
        source_id: &str,
        content_hash: Option<&str>,
    ) -> Result<Option<StoredRecord>, StoreError> {
        let row = match content_hash {
            Some(hash) => {
                self.bounded(
                    sqlx::query(
                        "SELECT * FROM notifications \
                         WHERE source_id = ? OR content_hash = ? LIMIT 1",
                    )
                    .bind(source_id)
                    .bind(hash)
                    .fetch_optional(&self.pool),
                )
                .await?
            }
            None => {
                self.bounded(
                    sqlx::query("SELECT * FROM notifications WHERE source_id = ? LIMIT 1")
                        .bind(source_id)
                        .fetch_optional(&self.pool),
                )
                .await?
            }
        };

        Ok(row.map(|r| row_to_record(&r)))
    }

    /// Insert one record. The caller owns error accounting; this just
    /// reports the failure.
    pub async fn insert(&self, record: &Record) -> Result<StoredRecord, StoreError> {
        let id = Uuid::new_v4().to_string();
        let extracted_ts = record.extracted_at.timestamp();

        self.bounded(
            sqlx::query(
                r#"
                INSERT INTO notifications
                    (id, source_id, content_hash, process_number, court, organ,
                     communication_type, published_at, body, raw_json, metadata_json,
                     status, extracted_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(&record.source_id)
            .bind(&record.content_hash)
            .bind(&record.process_number)
            .bind(&record.court)
            .bind(&record.organ)
            .bind(&record.communication_type)
            .bind(&record.published_at)
            .bind(&record.body)
            .bind(&record.raw_json)
            .bind(&record.metadata_json)
            .bind(record.status.as_str())
            .bind(extracted_ts)
            .execute(&self.pool),
        )
        .await?;

        Ok(StoredRecord {
            id,
            source_id: record.source_id.clone(),
            content_hash: record.content_hash.clone(),
            process_number: record.process_number.clone(),
            court: record.court.clone(),
            organ: record.organ.clone(),
            communication_type: record.communication_type.clone(),
            published_at: record.published_at.clone(),
            body: record.body.clone(),
            metadata: serde_json::from_str(&record.metadata_json)
                .unwrap_or(serde_json::json!({})),
            status: record.status.as_str().to_string(),
            extracted_at: format_ts_iso(extracted_ts),
        })
    }

    /// Process a batch of records in input order: existing ones count as
    /// duplicates, the rest are inserted. A failed existence check degrades
    /// to an insert attempt; the UNIQUE constraint catches any race.
    pub async fn process_batch(&self, records: &[Record]) -> BatchStats {
        let mut stats = BatchStats {
            total: records.len() as u64,
            ..Default::default()
        };

        info!(total = stats.total, "processing record batch");

        for record in records {
            let existing = match self
                .exists(&record.source_id, record.content_hash.as_deref())
                .await
            {
                Ok(found) => found,
                Err(err) => {
                    warn!(id = %record.source_id, error = %err,
                        "existence check failed, attempting insert anyway");
                    None
                }
            };

            if existing.is_some() {
                stats.duplicates += 1;
                debug!(id = %record.source_id, "duplicate record skipped");
                continue;
            }

            match self.insert(record).await {
                Ok(_) => {
                    stats.inserted += 1;
                    debug!(id = %record.source_id, "record inserted");
                }
                Err(err) => {
                    stats.errors += 1;
                    stats
                        .error_details
                        .push(format!("insert failed for {}: {}", record.source_id, err));
                    error!(id = %record.source_id, error = %err, "record insert failed");
                }
            }
        }

        info!(
            inserted = stats.inserted,
            duplicates = stats.duplicates,
            errors = stats.errors,
            "batch finished"
        );

        stats
    }

    /// Best-effort append of a cycle report snapshot. Returns whether the
    /// write succeeded; failure is logged and never escalated.
    pub async fn record_cycle_log(&self, report: &CycleReport) -> bool {
        let details =
            serde_json::to_string(&report.error_details).unwrap_or_else(|_| "[]".to_string());

        let result = self
            .bounded(
                sqlx::query(
                    r#"
                    INSERT INTO cycle_logs
                        (id, started_at, finished_at, status, found, inserted, duplicates,
                         errors, elapsed_secs, date_from, date_to, error, error_details)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(report.started_at.timestamp())
                .bind(report.finished_at.map(|t| t.timestamp()))
                .bind(report.status.as_str())
                .bind(report.found as i64)
                .bind(report.inserted as i64)
                .bind(report.duplicates as i64)
                .bind(report.errors as i64)
                .bind(report.elapsed_secs as i64)
                .bind(&report.date_from)
                .bind(&report.date_to)
                .bind(&report.error)
                .bind(details)
                .execute(&self.pool),
            )
            .await;

        match result {
            Ok(_) => {
                debug!("cycle log recorded");
                true
            }
            Err(err) => {
                error!(error = %err, "failed to record cycle log");
                false
            }
        }
    }

    /// Most recent records, optionally filtered by publication date.
    pub async fn list_records(
        &self,
        limit: i64,
        date: Option<&str>,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let rows = match date {
            Some(date) => {
                self.bounded(
                    sqlx::query(
                        "SELECT * FROM notifications WHERE published_at = ? \
                         ORDER BY extracted_at DESC LIMIT ?",
                    )
                    .bind(date)
                    .bind(limit)
                    .fetch_all(&self.pool),
                )
                .await?
            }
            None => {
                self.bounded(
                    sqlx::query(
                        "SELECT * FROM notifications ORDER BY extracted_at DESC LIMIT ?",
                    )
                    .bind(limit)
                    .fetch_all(&self.pool),
                )
                .await?
            }
        };

        Ok(rows.iter().map(row_to_record).collect())
    }

    /// Record counts grouped by court, descending.
    pub async fn court_stats(&self) -> Result<Vec<CourtCount>, StoreError> {
        let rows = self
            .bounded(
                sqlx::query(
                    "SELECT COALESCE(court, 'N/A') AS court, COUNT(*) AS total \
                     FROM notifications GROUP BY COALESCE(court, 'N/A') \
                     ORDER BY total DESC",
                )
                .fetch_all(&self.pool),
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| CourtCount {
                court: row.get("court"),
                total: row.get("total"),
            })
            .collect())
    }

    /// Store-wide totals: record count and distinct courts.
    pub async fn totals(&self) -> Result<StoreTotals, StoreError> {
        let row = self
            .bounded(
                sqlx::query(
                    "SELECT COUNT(*) AS records, COUNT(DISTINCT court) AS courts \
                     FROM notifications",
                )
                .fetch_one(&self.pool),
            )
            .await?;

        Ok(StoreTotals {
            records: row.get("records"),
            courts: row.get("courts"),
        })
    }

    /// Most recent cycle log entries.
    pub async fn recent_cycles(&self, limit: i64) -> Result<Vec<CycleLogEntry>, StoreError> {
        let rows = self
            .bounded(
                sqlx::query("SELECT * FROM cycle_logs ORDER BY started_at DESC LIMIT ?")
                    .bind(limit)
                    .fetch_all(&self.pool),
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let details: String = row.get("error_details");
                CycleLogEntry {
                    id: row.get("id"),
                    started_at: format_ts_iso(row.get("started_at")),
                    finished_at: row.get::<Option<i64>, _>("finished_at").map(format_ts_iso),
                    status: row.get("status"),
                    found: row.get("found"),
                    inserted: row.get("inserted"),
                    duplicates: row.get("duplicates"),
                    errors: row.get("errors"),
                    elapsed_secs: row.get("elapsed_secs"),
                    date_from: row.get("date_from"),
                    date_to: row.get("date_to"),
                    error: row.get("error"),
                    error_details: serde_json::from_str(&details).unwrap_or_default(),
                }
            })
            .collect())
    }

    /// Connectivity probe used by the self-test.
    pub async fn check_connection(&self) -> bool {
        let result = self
            .bounded(
                sqlx::query("SELECT id FROM cycle_logs LIMIT 1").fetch_optional(&self.pool),
            )
            .await;

        match result {
            Ok(_) => {
                debug!("store connectivity check passed");
                true
            }
            Err(err) => {
                error!(error = %err, "store connectivity check failed");
                false
            }
        }
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> StoredRecord {
    let metadata_json: String = row.get("metadata_json");
    StoredRecord {
        id: row.get("id"),
        source_id: row.get("source_id"),
        content_hash: row.get("content_hash"),
        process_number: row.get("process_number"),
        court: row.get("court"),
        organ: row.get("organ"),
        communication_type: row.get("communication_type"),
        published_at: row.get("published_at"),
        body: row.get("body"),
        metadata: serde_json::from_str(&metadata_json).unwrap_or(serde_json::json!({})),
        status: row.get("status"),
        extracted_at: format_ts_iso(row.get("extracted_at")),
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
