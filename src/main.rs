//! # DJEN Extractor CLI (`djen`)
//!
//! The `djen` binary is the primary interface for the extractor. It
//! provides commands for database initialization, component self-tests,
//! running extraction cycles, inspecting stored records and cycle logs,
//! and starting the HTTP server with the daily scheduler.
//!
//! ## Usage
//!
//! ```bash
//! djen --config ./config/djen.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `djen init` | Create the SQLite database and run schema migrations |
//! | `djen selftest` | Check source API, store, and normalizer health |
//! | `djen run` | Run one extraction cycle (optionally `--from`/`--to`) |
//! | `djen backfill --days N` | Run one cycle over the last N days |
//! | `djen records` | List stored records |
//! | `djen logs` | List recent cycle logs |
//! | `djen stats` | Print database summary |
//! | `djen serve` | Start the HTTP server (and scheduler, if enabled) |

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use djen_extractor::{config, extractor::Extractor, logging, migrate, scheduler, server, stats};

/// DJEN Extractor CLI — polls the DJEN judicial-notifications API,
/// deduplicates and cleans the results, and persists them to SQLite.
#[derive(Parser)]
#[command(
    name = "djen",
    about = "DJEN Extractor — judicial notification polling and storage",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/djen.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and both tables (notifications,
    /// cycle_logs). Idempotent — running it multiple times is safe.
    Init,

    /// Run the component self-test.
    ///
    /// Checks connectivity to the source API and the store, and exercises
    /// the text normalizer. Exits non-zero if any component fails.
    Selftest,

    /// Run one extraction cycle.
    ///
    /// Defaults to the configured lookback window (yesterday through
    /// today) when no explicit range is given.
    Run {
        /// Start of the search window (YYYY-MM-DD).
        #[arg(long)]
        from: Option<String>,

        /// End of the search window (YYYY-MM-DD).
        #[arg(long)]
        to: Option<String>,
    },

    /// Run one cycle over an extended period ending today.
    ///
    /// Useful for recovering data after downtime.
    Backfill {
        /// Number of days to look back.
        #[arg(long, default_value_t = 7)]
        days: i64,
    },

    /// List stored records.
    Records {
        /// Maximum number of records to show.
        #[arg(long, default_value_t = 10)]
        limit: i64,

        /// Filter by publication date (YYYY-MM-DD).
        #[arg(long)]
        date: Option<String>,

        /// Only records where the tracked lawyer is the sole attorney.
        #[arg(long)]
        sole_attorney: bool,
    },

    /// List recent cycle logs.
    Logs {
        /// Maximum number of entries to show.
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },

    /// Print a database summary.
    Stats,

    /// Start the HTTP server.
    ///
    /// Also starts the daily scheduler when `[scheduler].enabled` is set.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Selftest => {
            let extractor = Extractor::from_config(&cfg).await?;
            let health = extractor.self_test().await;
            println!("source_api: {}", status_word(health.source_api));
            println!("store:      {}", status_word(health.store));
            println!("normalizer: {}", status_word(health.normalizer));
            if !health.all_ok() {
                std::process::exit(1);
            }
        }
        Commands::Run { from, to } => {
            let extractor = Extractor::from_config(&cfg).await?;
            let report = extractor.run_cycle(from, to).await;
            print_report(&report);
        }
        Commands::Backfill { days } => {
            let extractor = Extractor::from_config(&cfg).await?;
            let report = extractor.backfill(days).await;
            print_report(&report);
        }
        Commands::Records {
            limit,
            date,
            sole_attorney,
        } => {
            let extractor = Extractor::from_config(&cfg).await?;
            let mut records = extractor
                .store()
                .list_records(limit, date.as_deref())
                .await?;
            if sole_attorney {
                let tracked = extractor.tracked_name().to_string();
                records.retain(|r| {
                    djen_extractor::record::is_sole_tracked_attorney(&r.body, &tracked)
                });
            }
            for r in &records {
                println!(
                    "{}  {:<8} {:<12} {}",
                    r.published_at.as_deref().unwrap_or("----------"),
                    r.court.as_deref().unwrap_or("-"),
                    r.source_id,
                    r.process_number.as_deref().unwrap_or("-")
                );
            }
            println!("{} record(s)", records.len());
        }
        Commands::Logs { limit } => {
            let extractor = Extractor::from_config(&cfg).await?;
            let logs = extractor.store().recent_cycles(limit).await?;
            for l in &logs {
                println!(
                    "{}  {:<10} found={} new={} dup={} err={} ({}s)",
                    l.started_at, l.status, l.found, l.inserted, l.duplicates, l.errors,
                    l.elapsed_secs
                );
            }
            println!("{} entr(ies)", logs.len());
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            let extractor = Arc::new(Extractor::from_config(&cfg).await?);

            if cfg.scheduler.enabled {
                let sched_extractor = extractor.clone();
                let time = cfg.scheduler.time.clone();
                tokio::spawn(async move {
                    if let Err(err) = scheduler::run_scheduler(sched_extractor, &time).await {
                        eprintln!("scheduler error: {}", err);
                    }
                });
            }

            server::run_server(&cfg, extractor).await?;
        }
    }

    Ok(())
}

fn status_word(ok: bool) -> &'static str {
    if ok {
        "OK"
    } else {
        "FAIL"
    }
}

fn print_report(report: &djen_extractor::models::CycleReport) {
    println!("cycle finished");
    println!("  status:     {}", report.status.as_str());
    println!("  found:      {}", report.found);
    println!("  inserted:   {}", report.inserted);
    println!("  duplicates: {}", report.duplicates);
    println!("  errors:     {}", report.errors);
    println!("  elapsed:    {}s", report.elapsed_secs);
    if let Some(ref err) = report.error {
        println!("  error:      {}", err);
    }
    for detail in &report.error_details {
        println!("    - {}", detail);
    }
}
