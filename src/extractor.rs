//! Extraction cycle orchestration.
//!
//! Drives one full cycle (query, aggregate, build and validate, store)
//! and produces the cycle report. Every terminal path,
//! success or error, ends with a best-effort cycle log write. Also hosts
//! the per-component self-test used by the CLI and the HTTP surface.

use std::time::Instant;

use chrono::{Duration as ChronoDuration, Local, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::client::SourceClient;
use crate::config::Config;
use crate::models::{ComponentHealth, CycleLogEntry, CycleReport, Record, StoreTotals};
use crate::normalize;
use crate::record;
use crate::store::Store;

/// Full system status, as reported by `GET /status`.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub timestamp: String,
    pub components: ComponentHealth,
    pub functional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<StoreTotals>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cycle: Option<CycleLogEntry>,
}

pub struct Extractor {
    client: SourceClient,
    store: Store,
    tracked_name: String,
}

impl Extractor {
    pub fn new(client: SourceClient, store: Store, tracked_name: String) -> Self {
        Self {
            client,
            store,
            tracked_name,
        }
    }

    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = SourceClient::new(&config.source, &config.lawyer)?;
        let store = Store::connect(config).await?;
        Ok(Self::new(client, store, config.lawyer.name.clone()))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn tracked_name(&self) -> &str {
        &self.tracked_name
    }

    /// Run one full extraction cycle over the given date range (defaulting
    /// to the configured lookback window).
    ///
    /// The cycle always terminates in `success` or `error`, and the report
    /// is persisted as a cycle log entry on every terminal path.
    pub async fn run_cycle(
        &self,
        date_from: Option<String>,
        date_to: Option<String>,
    ) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::begin(date_from.clone(), date_to.clone());

        info!(?date_from, ?date_to, "starting extraction cycle");

        // Query all registered sources; an overall failure aborts the
        // cycle before anything reaches the store.
        let (ok, raw_items) = self
            .client
            .query_all_registered(date_from.as_deref(), date_to.as_deref())
            .await;

        if !ok {
            error!("source API query failed, aborting cycle");
            report.fail("source API query failed", started);
            self.finish(&report).await;
            return report;
        }

        report.found = raw_items.len() as u64;

        if raw_items.is_empty() {
            info!("no notifications found for the period");
            report.succeed(started);
            self.finish(&report).await;
            return report;
        }

        // Build and validate each item. Failures are counted and the loop
        // continues.
        let mut valid: Vec<Record> = Vec::with_capacity(raw_items.len());
        for raw in &raw_items {
            let built = record::build(raw, &self.tracked_name);
            if record::validate(&built) {
                valid.push(built);
            } else {
                warn!(id = %raw.identifier(), "item failed validation");
                report.errors += 1;
            }
        }

        info!(valid = valid.len(), "items processed");

        // Store the batch; its counters fold additively into the cycle's.
        let stats = self.store.process_batch(&valid).await;
        report.inserted = stats.inserted;
        report.duplicates = stats.duplicates;
        report.errors += stats.errors;
        report.error_details.extend(stats.error_details);

        report.succeed(started);
        info!(
            found = report.found,
            inserted = report.inserted,
            duplicates = report.duplicates,
            errors = report.errors,
            elapsed_secs = report.elapsed_secs,
            "extraction cycle finished"
        );

        self.finish(&report).await;
        report
    }

    /// Run one cycle over an extended window ending today.
    pub async fn backfill(&self, days: i64) -> CycleReport {
        let today = Local::now().date_naive();
        let from = today - ChronoDuration::days(days);
        info!(days, "starting backfill cycle");
        self.run_cycle(
            Some(from.format("%Y-%m-%d").to_string()),
            Some(today.format("%Y-%m-%d").to_string()),
        )
        .await
    }

    /// Lightweight connectivity and shape check of each collaborator.
    pub async fn self_test(&self) -> ComponentHealth {
        info!("running component self-test");

        let source_api = self.client.check_connectivity().await;
        let store = self.store.check_connection().await;

        let probe = normalize::normalize("<p>connectivity <b>probe</b><br>with markup</p>");
        let normalizer = !probe.is_empty() && !probe.contains('<');

        let health = ComponentHealth {
            source_api,
            store,
            normalizer,
        };

        if health.all_ok() {
            info!("all components healthy");
        } else {
            warn!(?health, "component self-test found problems");
        }

        health
    }

    /// Status summary: component health plus store totals and the most
    /// recent cycle. Store lookups are best-effort.
    pub async fn status_report(&self) -> StatusReport {
        let components = self.self_test().await;

        let totals = match self.store.totals().await {
            Ok(t) => Some(t),
            Err(err) => {
                warn!(error = %err, "failed to read store totals");
                None
            }
        };

        let last_cycle = match self.store.recent_cycles(1).await {
            Ok(mut entries) => entries.pop(),
            Err(err) => {
                warn!(error = %err, "failed to read recent cycles");
                None
            }
        };

        StatusReport {
            timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            components,
            functional: components.all_ok(),
            totals,
            last_cycle,
        }
    }

    /// Final step of every cycle: persist the report. A logging failure is
    /// reported but never changes the cycle's already-finalized status.
    async fn finish(&self, report: &CycleReport) {
        if !self.store.record_cycle_log(report).await {
            warn!("cycle log write failed; report status unchanged");
        }
    }
}
