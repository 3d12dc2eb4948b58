//! # DJEN Extractor
//!
//! A polling extraction and monitoring service for DJEN (Diário de Justiça
//! Eletrônico Nacional) judicial notifications.
//!
//! The extractor periodically queries the public DJEN API for a tracked
//! lawyer, by name and by each registered bar license, deduplicates and
//! cleans the retrieved notifications, and persists them to SQLite with an
//! idempotent store contract. A small HTTP surface exposes status, manual
//! triggering, and stored-record queries.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────┐
//! │ Source API   │──▶│   Pipeline    │──▶│  SQLite    │
//! │ name + OABs  │   │ clean+build  │   │ dedup keys │
//! └──────────────┘   └──────────────┘   └─────┬─────┘
//!                                             │
//!                         ┌───────────────────┤
//!                         ▼                   ▼
//!                    ┌──────────┐       ┌──────────┐
//!                    │   CLI    │       │   HTTP   │
//!                    │  (djen)  │       │  (axum)  │
//!                    └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! djen init                     # create database
//! djen selftest                 # check API, store, and normalizer
//! djen run                      # run one extraction cycle
//! djen backfill --days 7        # recover an extended period
//! djen serve                    # start HTTP server (+ daily scheduler)
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`normalize`] | HTML-to-text normalization + metadata extraction |
//! | [`aggregate`] | In-cycle identifier dedup |
//! | [`client`] | DJEN source API query client |
//! | [`record`] | Canonical record builder and validation |
//! | [`store`] | Store gateway with idempotent batch writes |
//! | [`extractor`] | Cycle orchestration and self-test |
//! | [`scheduler`] | Daily trigger loop |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod aggregate;
pub mod client;
pub mod config;
pub mod db;
pub mod extractor;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod record;
pub mod scheduler;
pub mod server;
pub mod stats;
pub mod store;
