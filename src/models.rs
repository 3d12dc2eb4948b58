//! Core data models used throughout the extractor.
//!
//! These types represent the notification items, canonical records, and
//! cycle reports that flow through the query, processing, and storage
//! pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw notification item as returned by the DJEN source API.
///
/// The wire format carries Portuguese field names; they are mapped here but
/// preserved verbatim on re-serialization so the original payload can be
/// stored untouched. Anything the API sends beyond the named fields
/// (recipients, linked lawyers, status flags) lands in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawItem {
    /// Opaque upstream identifier. Numeric in the wire format.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    /// Upstream-provided fingerprint of the notification content.
    #[serde(default)]
    pub hash: Option<String>,
    /// Free-text body, possibly HTML.
    #[serde(default, rename = "texto")]
    pub body: Option<String>,
    #[serde(default, rename = "numero_processo")]
    pub process_number: Option<String>,
    #[serde(default, rename = "numeroprocessocommascara")]
    pub process_number_masked: Option<String>,
    #[serde(default, rename = "siglaTribunal")]
    pub court: Option<String>,
    #[serde(default, rename = "nomeOrgao")]
    pub organ: Option<String>,
    #[serde(default, rename = "tipoComunicacao")]
    pub communication_type: Option<String>,
    #[serde(default, rename = "tipoDocumento")]
    pub document_type: Option<String>,
    /// Publication date string in one of several upstream formats.
    #[serde(default, rename = "data_disponibilizacao")]
    pub available_at: Option<String>,
    /// Variable bag of secondary attributes.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RawItem {
    /// String form of the upstream identifier. Empty when the item has none.
    pub fn identifier(&self) -> String {
        match &self.id {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

/// One page of the source API's response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryPage {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub items: Vec<RawItem>,
}

/// Document classes recognized by the text metadata extractor, in match
/// priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Despacho,
    #[serde(rename = "Sentença")]
    Sentenca,
    #[serde(rename = "Decisão")]
    Decisao,
    #[serde(rename = "Acórdão")]
    Acordao,
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DocumentKind::Despacho => "Despacho",
            DocumentKind::Sentenca => "Sentença",
            DocumentKind::Decisao => "Decisão",
            DocumentKind::Acordao => "Acórdão",
        };
        f.write_str(name)
    }
}

/// A `prazo de N (unit) dias` mention found in notification text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineMention {
    pub quantity: String,
    pub unit: String,
}

/// Heuristic signals extracted from normalized notification text.
///
/// Purely advisory; every field may be absent or empty without that being
/// an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_kind: Option<DocumentKind>,
    pub has_electronic_signature: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub deadlines: Vec<DeadlineMention>,
    pub mentions_tracked_name: bool,
    pub lines: usize,
    pub chars: usize,
}

/// Outcome tag attached to every built record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Extracted,
    ProcessingError,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Extracted => "extracted",
            ProcessingStatus::ProcessingError => "processing_error",
        }
    }
}

/// Canonical persisted shape of one notification.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    /// Upstream identifier — the primary dedup key.
    pub source_id: String,
    /// Upstream content fingerprint — the secondary dedup key.
    pub content_hash: Option<String>,
    pub process_number: Option<String>,
    pub court: Option<String>,
    pub organ: Option<String>,
    pub communication_type: Option<String>,
    /// Publication date normalized to `YYYY-MM-DD`, or `None` if unparseable.
    pub published_at: Option<String>,
    /// Cleaned plain text.
    pub body: String,
    /// The original upstream item, serialized verbatim.
    pub raw_json: String,
    /// Extracted metadata and secondary fields as a structured blob.
    pub metadata_json: String,
    pub status: ProcessingStatus,
    pub extracted_at: DateTime<Utc>,
}

/// A notification row read back from the store.
#[derive(Debug, Clone, Serialize)]
pub struct StoredRecord {
    pub id: String,
    pub source_id: String,
    pub content_hash: Option<String>,
    pub process_number: Option<String>,
    pub court: Option<String>,
    pub organ: Option<String>,
    pub communication_type: Option<String>,
    pub published_at: Option<String>,
    pub body: String,
    pub metadata: serde_json::Value,
    pub status: String,
    pub extracted_at: String, // ISO8601
}

/// Counters produced by one `process_batch` call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchStats {
    pub total: u64,
    pub inserted: u64,
    pub duplicates: u64,
    pub errors: u64,
    pub error_details: Vec<String>,
}

/// Execution status of one extraction cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    InProgress,
    Success,
    Error,
}

impl CycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStatus::InProgress => "in_progress",
            CycleStatus::Success => "success",
            CycleStatus::Error => "error",
        }
    }
}

/// Outcome of one extraction cycle. Created at cycle start, mutated
/// throughout, persisted as a cycle log entry at the end regardless of
/// outcome.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: CycleStatus,
    pub found: u64,
    pub inserted: u64,
    pub duplicates: u64,
    pub errors: u64,
    pub elapsed_secs: u64,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub error_details: Vec<String>,
}

impl CycleReport {
    pub fn begin(date_from: Option<String>, date_to: Option<String>) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            status: CycleStatus::InProgress,
            found: 0,
            inserted: 0,
            duplicates: 0,
            errors: 0,
            elapsed_secs: 0,
            date_from,
            date_to,
            error: None,
            error_details: Vec::new(),
        }
    }

    pub fn succeed(&mut self, started: std::time::Instant) {
        self.status = CycleStatus::Success;
        self.elapsed_secs = started.elapsed().as_secs();
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, message: impl Into<String>, started: std::time::Instant) {
        self.status = CycleStatus::Error;
        self.error = Some(message.into());
        self.elapsed_secs = started.elapsed().as_secs();
        self.finished_at = Some(Utc::now());
    }
}

/// One persisted cycle log row.
#[derive(Debug, Clone, Serialize)]
pub struct CycleLogEntry {
    pub id: String,
    pub started_at: String, // ISO8601
    pub finished_at: Option<String>,
    pub status: String,
    pub found: i64,
    pub inserted: i64,
    pub duplicates: i64,
    pub errors: i64,
    pub elapsed_secs: i64,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub error: Option<String>,
    pub error_details: Vec<String>,
}

/// Per-court record count used by the aggregate stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CourtCount {
    pub court: String,
    pub total: i64,
}

/// Store-wide totals.
#[derive(Debug, Clone, Serialize)]
pub struct StoreTotals {
    pub records: i64,
    pub courts: i64,
}

/// Per-component self-test outcome.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ComponentHealth {
    pub source_api: bool,
    pub store: bool,
    pub normalizer: bool,
}

impl ComponentHealth {
    pub fn all_ok(&self) -> bool {
        self.source_api && self.store && self.normalizer
    }
}
