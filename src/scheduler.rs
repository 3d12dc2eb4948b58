//! Daily extraction trigger.
//!
//! Sleeps until the configured local wall-clock time each day and runs one
//! cycle with the default date window. Runs as a background task next to
//! the HTTP server; a failed cycle is logged and the loop keeps going.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveTime};
use tracing::{error, info};

use crate::extractor::Extractor;
use crate::models::CycleStatus;

pub async fn run_scheduler(extractor: Arc<Extractor>, time_of_day: &str) -> Result<()> {
    let trigger = NaiveTime::parse_from_str(time_of_day, "%H:%M")
        .with_context(|| format!("invalid scheduler time '{}'", time_of_day))?;

    info!(time = time_of_day, "scheduler started");

    loop {
        let wait = duration_until(trigger);
        info!(seconds = wait.as_secs(), "next scheduled extraction");
        tokio::time::sleep(wait).await;

        info!("scheduled extraction triggered");
        let report = extractor.run_cycle(None, None).await;
        match report.status {
            CycleStatus::Error => {
                error!(error = ?report.error, "scheduled extraction failed");
            }
            _ => {
                info!(
                    found = report.found,
                    inserted = report.inserted,
                    duplicates = report.duplicates,
                    errors = report.errors,
                    "scheduled extraction finished"
                );
            }
        }
    }
}

fn duration_until(trigger: NaiveTime) -> Duration {
    let now = Local::now();
    let today_trigger = now.date_naive().and_time(trigger);
    let next = if now.naive_local() < today_trigger {
        today_trigger
    } else {
        (now.date_naive() + chrono::Duration::days(1)).and_time(trigger)
    };

    (next - now.naive_local())
        .to_std()
        .unwrap_or(Duration::from_secs(60))
}
