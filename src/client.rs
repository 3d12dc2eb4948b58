//! DJEN source API query client.
//!
//! Issues parameterized GET queries against the public notifications API,
//! by lawyer name or by bar registration, and aggregates the results of
//! all registered queries for one cycle with first-seen-wins identifier
//! dedup. Transport failures and non-success envelopes surface as
//! [`TransportError`]; `query_all_registered` folds them into its overall
//! success flag so one failed sub-query never aborts the others.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Local};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{info, warn};

use crate::aggregate::extend_unique;
use crate::config::{LawyerConfig, SourceConfig};
use crate::models::{QueryPage, RawItem};

const USER_AGENT: &str = concat!("djen-extractor/", env!("CARGO_PKG_VERSION"));

/// Failure talking to the source API. Callers fold these into cycle
/// counters; they are never propagated as unhandled faults.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to source API failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("source API returned HTTP {0}")]
    Status(StatusCode),
    #[error("source API reported status {status:?}")]
    Envelope { status: Option<String> },
}

/// One registered bar license queried each cycle.
#[derive(Debug, Clone)]
pub struct Registration {
    pub number: String,
    pub state: String,
}

pub struct SourceClient {
    http: reqwest::Client,
    base_url: String,
    page_size: u32,
    lookback_days: i64,
    lawyer_name: String,
    registrations: Vec<Registration>,
}

impl SourceClient {
    pub fn new(source: &SourceConfig, lawyer: &LawyerConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(source.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            base_url: source.base_url.clone(),
            page_size: source.page_size,
            lookback_days: source.lookback_days,
            lawyer_name: lawyer.name.clone(),
            registrations: lawyer
                .registrations
                .iter()
                .map(|r| Registration {
                    number: r.number.clone(),
                    state: r.state.clone(),
                })
                .collect(),
        })
    }

    /// Default search window: lookback_days before today, through today.
    fn default_range(&self) -> (String, String) {
        let today = Local::now().date_naive();
        let from = today - ChronoDuration::days(self.lookback_days);
        (
            from.format("%Y-%m-%d").to_string(),
            today.format("%Y-%m-%d").to_string(),
        )
    }

    fn resolve_range(&self, from: Option<&str>, to: Option<&str>) -> (String, String) {
        match (from, to) {
            (Some(f), Some(t)) => (f.to_string(), t.to_string()),
            _ => self.default_range(),
        }
    }

    async fn fetch(&self, params: &[(&str, String)]) -> Result<QueryPage, TransportError> {
        info!(params = ?params, "querying source API");

        let response = self
            .http
            .get(&self.base_url)
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "source API request rejected");
            return Err(TransportError::Status(status));
        }

        let page: QueryPage = response.json().await?;
        if page.status.as_deref() != Some("success") {
            warn!(envelope_status = ?page.status, "source API envelope not successful");
            return Err(TransportError::Envelope { status: page.status });
        }

        info!(count = page.count.unwrap_or(0), "source API query succeeded");
        Ok(page)
    }

    /// Query notifications by lawyer name.
    pub async fn query_by_name(
        &self,
        name: &str,
        date_from: Option<&str>,
        date_to: Option<&str>,
        page: u32,
    ) -> Result<QueryPage, TransportError> {
        let (from, to) = self.resolve_range(date_from, date_to);
        let params = [
            ("nomeAdvogado", name.to_string()),
            ("dataDisponibilizacaoInicio", from),
            ("dataDisponibilizacaoFim", to),
            ("itensPorPagina", self.page_size.to_string()),
            ("meio", "D".to_string()),
            ("pagina", page.to_string()),
        ];
        self.fetch(&params).await
    }

    /// Query notifications by bar registration number and state.
    pub async fn query_by_registration(
        &self,
        number: &str,
        state: &str,
        date_from: Option<&str>,
        date_to: Option<&str>,
        page: u32,
    ) -> Result<QueryPage, TransportError> {
        let (from, to) = self.resolve_range(date_from, date_to);
        let params = [
            ("numeroOab", number.to_string()),
            ("ufOab", state.to_string()),
            ("dataDisponibilizacaoInicio", from),
            ("dataDisponibilizacaoFim", to),
            ("itensPorPagina", self.page_size.to_string()),
            ("meio", "D".to_string()),
            ("pagina", page.to_string()),
        ];
        self.fetch(&params).await
    }

    /// Run the name query plus one query per registered license and merge
    /// the results, keeping the first item seen for each identifier.
    ///
    /// The returned flag is the AND of all sub-query successes; a failed
    /// sub-query is logged and skipped, and partial results are still
    /// aggregated in fixed order (name first, then registrations in
    /// registration order).
    pub async fn query_all_registered(
        &self,
        date_from: Option<&str>,
        date_to: Option<&str>,
    ) -> (bool, Vec<RawItem>) {
        let mut items: Vec<RawItem> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut ok_overall = true;

        info!(
            registrations = self.registrations.len(),
            "querying all registered licenses"
        );

        match self
            .query_by_name(&self.lawyer_name, date_from, date_to, 1)
            .await
        {
            Ok(page) => {
                let found = page.items.len();
                let added = extend_unique(&mut items, &mut seen, page.items);
                info!(found, added, "name query merged");
            }
            Err(err) => {
                ok_overall = false;
                warn!(error = %err, "name query failed");
            }
        }

        for registration in &self.registrations {
            match self
                .query_by_registration(
                    &registration.number,
                    &registration.state,
                    date_from,
                    date_to,
                    1,
                )
                .await
            {
                Ok(page) => {
                    let found = page.items.len();
                    let added = extend_unique(&mut items, &mut seen, page.items);
                    info!(
                        number = %registration.number,
                        state = %registration.state,
                        found,
                        added,
                        "registration query merged"
                    );
                }
                Err(err) => {
                    ok_overall = false;
                    warn!(
                        number = %registration.number,
                        state = %registration.state,
                        error = %err,
                        "registration query failed"
                    );
                }
            }
        }

        info!(unique = items.len(), ok_overall, "aggregation finished");
        (ok_overall, items)
    }

    /// Lightweight connectivity probe: a default-window name query.
    pub async fn check_connectivity(&self) -> bool {
        match self
            .query_by_name(&self.lawyer_name, None, None, 1)
            .await
        {
            Ok(_) => {
                info!("source API connectivity check passed");
                true
            }
            Err(err) => {
                warn!(error = %err, "source API connectivity check failed");
                false
            }
        }
    }
}
