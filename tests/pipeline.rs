//! End-to-end pipeline tests over a mock source API and a temporary
//! SQLite database: query → aggregate → build → validate → store.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::{
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tempfile::TempDir;

use djen_extractor::config::{
    Config, DbConfig, LawyerConfig, RegistrationConfig, SchedulerConfig, ServerConfig,
    SourceConfig,
};
use djen_extractor::extractor::Extractor;
use djen_extractor::migrate;
use djen_extractor::models::CycleStatus;

fn notification(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "hash": format!("hash-{}", id),
        "texto": "<p>Fica intimado o advogado EDUARDO KOETZ do inteiro teor da decisão \
                  proferida nos autos do processo em epígrafe.</p>",
        "siglaTribunal": "TJRS",
        "nomeOrgao": "1ª Vara Cível",
        "tipoComunicacao": "Intimação",
        "data_disponibilizacao": "2024-03-15T10:00:00Z"
    })
}

fn page(items: Vec<serde_json::Value>) -> Response {
    Json(json!({
        "status": "success",
        "count": items.len(),
        "items": items,
    }))
    .into_response()
}

/// Mock DJEN API: name query returns [A, B]; registration 73409 returns
/// [B, C]; registration 42934 fails with a server error.
async fn mock_api(Query(params): Query<HashMap<String, String>>) -> Response {
    if params.contains_key("nomeAdvogado") {
        return page(vec![notification("A"), notification("B")]);
    }
    match params.get("numeroOab").map(String::as_str) {
        Some("73409") => page(vec![notification("B"), notification("C")]),
        Some("42934") => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => page(Vec::new()),
    }
}

/// Mock where the name query itself fails.
async fn mock_api_name_down(Query(params): Query<HashMap<String, String>>) -> Response {
    if params.contains_key("nomeAdvogado") {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    page(vec![notification("A")])
}

async fn serve_router(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn spawn_mock() -> SocketAddr {
    serve_router(Router::new().route("/", get(mock_api))).await
}

async fn spawn_mock_name_down() -> SocketAddr {
    serve_router(Router::new().route("/", get(mock_api_name_down))).await
}

fn test_config(dir: &TempDir, api_addr: SocketAddr, registrations: Vec<(&str, &str)>) -> Config {
    Config {
        db: DbConfig {
            path: dir.path().join("djen.sqlite"),
            timeout_secs: 5,
        },
        source: SourceConfig {
            base_url: format!("http://{}", api_addr),
            timeout_secs: 5,
            page_size: 100,
            lookback_days: 1,
        },
        lawyer: LawyerConfig {
            name: "Eduardo Koetz".to_string(),
            registrations: registrations
                .into_iter()
                .map(|(number, state)| RegistrationConfig {
                    number: number.to_string(),
                    state: state.to_string(),
                })
                .collect(),
        },
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
        },
        scheduler: SchedulerConfig::default(),
    }
}

#[tokio::test]
async fn full_cycle_dedups_and_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let addr = spawn_mock().await;

    // Only the healthy registration; the cycle must succeed.
    let cfg = test_config(&dir, addr, vec![("73409", "RS")]);
    migrate::run_migrations(&cfg).await.unwrap();

    let extractor = Extractor::from_config(&cfg).await.unwrap();

    // Sub-queries return [A, B] and [B, C]; B is deduplicated in-cycle.
    let report = extractor.run_cycle(None, None).await;
    assert_eq!(report.status, CycleStatus::Success);
    assert_eq!(report.found, 3);
    assert_eq!(report.inserted, 3);
    assert_eq!(report.duplicates, 0);
    assert_eq!(report.errors, 0);

    // Re-running the same window converges to zero new inserts.
    let rerun = extractor.run_cycle(None, None).await;
    assert_eq!(rerun.status, CycleStatus::Success);
    assert_eq!(rerun.found, 3);
    assert_eq!(rerun.inserted, 0);
    assert_eq!(rerun.duplicates, 3);
    assert_eq!(rerun.errors, 0);

    let totals = extractor.store().totals().await.unwrap();
    assert_eq!(totals.records, 3);

    // Both cycles left a log entry.
    let cycles = extractor.store().recent_cycles(10).await.unwrap();
    assert_eq!(cycles.len(), 2);
    assert!(cycles.iter().all(|c| c.status == "success"));
}

#[tokio::test]
async fn failed_subquery_aborts_cycle_without_storing() {
    let dir = TempDir::new().unwrap();
    let addr = spawn_mock_name_down().await;

    let cfg = test_config(&dir, addr, vec![("73409", "RS")]);
    migrate::run_migrations(&cfg).await.unwrap();

    let extractor = Extractor::from_config(&cfg).await.unwrap();
    let report = extractor.run_cycle(None, None).await;

    assert_eq!(report.status, CycleStatus::Error);
    assert!(report.error.is_some());
    assert_eq!(report.inserted, 0);

    // Nothing reached the store, but the failed cycle was still logged.
    let totals = extractor.store().totals().await.unwrap();
    assert_eq!(totals.records, 0);
    let cycles = extractor.store().recent_cycles(10).await.unwrap();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].status, "error");
}

#[tokio::test]
async fn partial_subquery_failure_aborts_before_store() {
    let dir = TempDir::new().unwrap();
    let addr = spawn_mock().await;

    // 42934 always fails in the mock; the name query and 73409 succeed.
    let cfg = test_config(&dir, addr, vec![("73409", "RS"), ("42934", "SC")]);
    migrate::run_migrations(&cfg).await.unwrap();

    let extractor = Extractor::from_config(&cfg).await.unwrap();
    let report = extractor.run_cycle(None, None).await;

    // Overall success is the AND of sub-query successes, so the cycle
    // aborts as an error before the store step.
    assert_eq!(report.status, CycleStatus::Error);
    let totals = extractor.store().totals().await.unwrap();
    assert_eq!(totals.records, 0);
}

#[tokio::test]
async fn selftest_reports_component_health() {
    let dir = TempDir::new().unwrap();
    let addr = spawn_mock().await;

    let cfg = test_config(&dir, addr, vec![("73409", "RS")]);
    migrate::run_migrations(&cfg).await.unwrap();

    let extractor = Extractor::from_config(&cfg).await.unwrap();
    let health = extractor.self_test().await;
    assert!(health.source_api);
    assert!(health.store);
    assert!(health.normalizer);
    assert!(health.all_ok());
}
