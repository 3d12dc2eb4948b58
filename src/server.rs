//! HTTP surface over the extractor.
//!
//! Exposes status, self-test, a fire-and-forget manual cycle trigger, and
//! the stored-record query surface as a JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Liveness probe (returns version) |
//! | `GET`  | `/status` | Component health + store totals + last cycle |
//! | `GET`  | `/selftest` | Per-component self-test booleans |
//! | `POST` | `/extract` | Trigger a cycle in the background |
//! | `GET`  | `/records` | Paginated records, optional date / sole-attorney filters |
//! | `GET`  | `/stats/courts` | Record counts per court |
//! | `GET`  | `/logs` | Recent cycle log entries |
//!
//! # Error Contract
//!
//! All error responses use the envelope:
//!
//! ```json
//! { "error": { "code": "internal", "message": "store query failed" } }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the monitoring panel
//! and webhook integrations can call from anywhere.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::config::Config;
use crate::extractor::Extractor;
use crate::models::{ComponentHealth, CourtCount, CycleLogEntry, StoredRecord};
use crate::record;
use crate::store::StoreError;

#[derive(Clone)]
struct AppState {
    extractor: Arc<Extractor>,
}

/// Starts the HTTP server on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(config: &Config, extractor: Arc<Extractor>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState { extractor };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/status", get(handle_status))
        .route("/selftest", get(handle_selftest))
        .route("/extract", post(handle_extract))
        .route("/records", get(handle_records))
        .route("/stats/courts", get(handle_court_stats))
        .route("/logs", get(handle_logs))
        .layer(cors)
        .with_state(state);

    println!("API server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout(_) => AppError {
                status: StatusCode::REQUEST_TIMEOUT,
                code: "timeout".to_string(),
                message: err.to_string(),
            },
            StoreError::Backend(_) => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "internal".to_string(),
                message: err.to_string(),
            },
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /status ============

async fn handle_status(State(state): State<AppState>) -> Json<crate::extractor::StatusReport> {
    Json(state.extractor.status_report().await)
}

// ============ GET /selftest ============

#[derive(Serialize)]
struct SelftestResponse {
    #[serde(flatten)]
    components: ComponentHealth,
    functional: bool,
}

async fn handle_selftest(State(state): State<AppState>) -> Json<SelftestResponse> {
    let components = state.extractor.self_test().await;
    Json(SelftestResponse {
        components,
        functional: components.all_ok(),
    })
}

// ============ POST /extract ============

#[derive(Serialize)]
struct ExtractResponse {
    status: String,
    message: String,
}

/// Fire-and-forget manual trigger: the cycle runs in a background task and
/// its outcome lands in the cycle logs.
async fn handle_extract(State(state): State<AppState>) -> Json<ExtractResponse> {
    let extractor = state.extractor.clone();
    tokio::spawn(async move {
        info!("manual extraction triggered via API");
        let report = extractor.run_cycle(None, None).await;
        if report.status == crate::models::CycleStatus::Error {
            error!(error = ?report.error, "manual extraction failed");
        }
    });

    Json(ExtractResponse {
        status: "accepted".to_string(),
        message: "extraction started in background".to_string(),
    })
}

// ============ GET /records ============

#[derive(Deserialize)]
struct RecordsParams {
    limit: Option<i64>,
    date: Option<String>,
    sole_attorney: Option<bool>,
}

/// List stored records. The sole-attorney filter is computed on demand
/// from each record's text; it is never persisted.
async fn handle_records(
    State(state): State<AppState>,
    Query(params): Query<RecordsParams>,
) -> Result<Json<Vec<StoredRecord>>, AppError> {
    let limit = params.limit.unwrap_or(10).clamp(1, 500);
    let mut records = state
        .extractor
        .store()
        .list_records(limit, params.date.as_deref())
        .await?;

    if params.sole_attorney.unwrap_or(false) {
        let tracked = state.extractor.tracked_name().to_string();
        records.retain(|r| record::is_sole_tracked_attorney(&r.body, &tracked));
    }

    Ok(Json(records))
}

// ============ GET /stats/courts ============

async fn handle_court_stats(
    State(state): State<AppState>,
) -> Result<Json<Vec<CourtCount>>, AppError> {
    let stats = state.extractor.store().court_stats().await?;
    Ok(Json(stats))
}

// ============ GET /logs ============

#[derive(Deserialize)]
struct LogsParams {
    limit: Option<i64>,
}

async fn handle_logs(
    State(state): State<AppState>,
    Query(params): Query<LogsParams>,
) -> Result<Json<Vec<CycleLogEntry>>, AppError> {
    let limit = params.limit.unwrap_or(10).clamp(1, 100);
    let logs = state.extractor.store().recent_cycles(limit).await?;
    Ok(Json(logs))
}
