//! Database statistics overview.
//!
//! Prints a quick summary of what the extractor has stored: record totals,
//! per-court breakdown, and the most recent cycles. Used by `djen stats`
//! to give confidence that scheduled extractions are landing.

use anyhow::Result;

use crate::config::Config;
use crate::store::Store;

pub async fn run_stats(config: &Config) -> Result<()> {
    let store = Store::connect(config).await?;

    let totals = store.totals().await?;
    let courts = store.court_stats().await?;
    let cycles = store.recent_cycles(5).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("DJEN Extractor — Database Stats");
    println!("===============================");
    println!();
    println!("  Database:  {}", config.db.path.display());
    println!("  Size:      {}", format_bytes(db_size));
    println!();
    println!("  Records:   {}", totals.records);
    println!("  Courts:    {}", totals.courts);

    if !courts.is_empty() {
        println!();
        println!("  By court:");
        println!("  {:<16} {:>8}", "COURT", "RECORDS");
        println!("  {}", "-".repeat(26));
        for c in &courts {
            println!("  {:<16} {:>8}", c.court, c.total);
        }
    }

    if !cycles.is_empty() {
        println!();
        println!("  Recent cycles:");
        println!(
            "  {:<22} {:<10} {:>6} {:>5} {:>5} {:>5}",
            "STARTED", "STATUS", "FOUND", "NEW", "DUP", "ERR"
        );
        println!("  {}", "-".repeat(60));
        for c in &cycles {
            println!(
                "  {:<22} {:<10} {:>6} {:>5} {:>5} {:>5}",
                c.started_at, c.status, c.found, c.inserted, c.duplicates, c.errors
            );
        }
    }

    println!();
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
