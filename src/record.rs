//! Canonical record construction and validation.
//!
//! [`build`] turns one raw upstream item into the persisted record shape.
//! It never fails: any internal error degrades to a minimal record tagged
//! `processing_error`, which downstream validation then judges on its own
//! merits. Also home to publication-date normalization and the
//! sole-attorney heuristic used by the query surface.

use anyhow::Result;
use chrono::Utc;
use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::warn;

use crate::models::{ProcessingStatus, RawItem, Record};
use crate::normalize;

/// Records with cleaned text shorter than this fail validation.
pub const MIN_BODY_CHARS: usize = 50;

/// Connective words dropped from attorney name candidates.
const NAME_CONNECTIVES: [&str; 6] = ["E", "DA", "DE", "DO", "DOS", "DAS"];

fn re(cell: &'static OnceCell<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap())
}

/// Build the canonical record for one raw item.
///
/// On any internal failure the result is a degraded record carrying the
/// best-effort identifier, hash, and raw text, tagged `processing_error`
/// with the error noted in its metadata blob.
pub fn build(raw: &RawItem, tracked_name: &str) -> Record {
    match try_build(raw, tracked_name) {
        Ok(record) => record,
        Err(err) => {
            warn!(id = %raw.identifier(), error = %err, "record build failed, producing degraded record");
            degraded(raw, &err)
        }
    }
}

fn try_build(raw: &RawItem, tracked_name: &str) -> Result<Record> {
    let body = normalize::normalize(raw.body.as_deref().unwrap_or(""));
    let text_meta = normalize::extract_metadata(&body, tracked_name);

    let metadata = serde_json::json!({
        "numero_comunicacao": raw.extra.get("numeroComunicacao"),
        "classe": raw.extra.get("nomeClasse"),
        "codigo_classe": raw.extra.get("codigoClasse"),
        "link": raw.extra.get("link"),
        "meio_completo": raw.extra.get("meiocompleto"),
        "status": raw.extra.get("status"),
        "ativo": raw.extra.get("ativo"),
        "destinatarios": raw.extra.get("destinatarios").cloned().unwrap_or_else(|| serde_json::json!([])),
        "advogados_destinatarios": raw.extra.get("destinatarioadvogados").cloned().unwrap_or_else(|| serde_json::json!([])),
        "tipo_documento": raw.document_type,
        "metadados_texto": text_meta,
    });

    Ok(Record {
        source_id: raw.identifier(),
        content_hash: raw.hash.clone(),
        process_number: raw
            .process_number
            .clone()
            .or_else(|| raw.process_number_masked.clone()),
        court: raw.court.clone(),
        organ: raw.organ.clone(),
        communication_type: raw.communication_type.clone(),
        published_at: normalize_date(raw.available_at.as_deref()),
        body,
        raw_json: serde_json::to_string(raw)?,
        metadata_json: serde_json::to_string(&metadata)?,
        status: ProcessingStatus::Extracted,
        extracted_at: Utc::now(),
    })
}

fn degraded(raw: &RawItem, err: &anyhow::Error) -> Record {
    Record {
        source_id: raw.identifier(),
        content_hash: raw.hash.clone(),
        process_number: None,
        court: None,
        organ: None,
        communication_type: None,
        published_at: None,
        body: raw.body.clone().unwrap_or_default(),
        raw_json: serde_json::to_string(raw).unwrap_or_else(|_| "{}".to_string()),
        metadata_json: serde_json::json!({ "build_error": err.to_string() }).to_string(),
        status: ProcessingStatus::ProcessingError,
        extracted_at: Utc::now(),
    }
}

/// Normalize an upstream publication-date string to `YYYY-MM-DD`.
///
/// Accepts ISO dates with an optional trailing time component and the
/// Brazilian `DD/MM/YYYY` form. Anything else yields `None`.
pub fn normalize_date(input: Option<&str>) -> Option<String> {
    static ISO: OnceCell<Regex> = OnceCell::new();
    static BR: OnceCell<Regex> = OnceCell::new();

    let value = input?;

    if re(&ISO, r"^\d{4}-\d{2}-\d{2}").is_match(value) {
        return value.split('T').next().map(|d| d.to_string());
    }

    if re(&BR, r"^\d{2}/\d{2}/\d{4}").is_match(value) {
        let mut parts = value.split('/');
        let day = parts.next()?;
        let month = parts.next()?;
        let year = parts.next()?;
        return Some(format!("{}-{:0>2}-{:0>2}", year, month, day));
    }

    warn!(value, "unrecognized publication date format");
    None
}

/// Minimum-content gate applied before a record reaches the store.
pub fn validate(record: &Record) -> bool {
    if record.source_id.is_empty() {
        warn!("record rejected: missing identifier");
        return false;
    }
    if record.body.is_empty() {
        warn!(id = %record.source_id, "record rejected: no text");
        return false;
    }
    if record.body.chars().count() < MIN_BODY_CHARS {
        warn!(id = %record.source_id, "record rejected: text below minimum length");
        return false;
    }
    true
}

/// Whether the tracked lawyer is the only attorney the notification names.
///
/// Returns `false` when the tracked name is absent. When no attorney-list
/// pattern (`ADV: name, name, …`) is found, the tracked lawyer is
/// conservatively assumed sole. Otherwise the captured list is split on
/// commas, license annotations and connective words are stripped, and any
/// surviving candidate that does not carry both parts of the tracked name
/// counts as another attorney.
pub fn is_sole_tracked_attorney(text: &str, tracked_name: &str) -> bool {
    static ADV_LIST: OnceCell<Regex> = OnceCell::new();
    static PAREN: OnceCell<Regex> = OnceCell::new();
    static OAB: OnceCell<Regex> = OnceCell::new();

    let upper = text.to_uppercase();
    let tracked = tracked_name.to_uppercase();
    if tracked.is_empty() || !upper.contains(&tracked) {
        return false;
    }

    let captures = re(&ADV_LIST, r"ADV(?:OGAD[OA]?)?\s*(?:\([^)]*\))?\s*:\s*([^\n]+)")
        .captures(&upper);
    let list = match captures {
        Some(caps) => caps[1].to_string(),
        None => return true,
    };

    let tracked_parts: Vec<&str> = tracked.split_whitespace().collect();
    let mut others = 0usize;

    for candidate in list.split(',') {
        let no_paren = re(&PAREN, r"\([^)]*\)").replace_all(candidate, "");
        let cleaned = re(&OAB, r"OAB\s*[^\s,]+").replace_all(&no_paren, "");
        let cleaned = cleaned.trim();
        if cleaned.chars().count() <= 5 {
            continue;
        }
        let words: Vec<&str> = cleaned
            .split_whitespace()
            .filter(|w| !NAME_CONNECTIVES.contains(w))
            .collect();
        if words.len() < 2 {
            continue;
        }
        let is_tracked = tracked_parts.iter().all(|part| words.contains(part));
        if !is_tracked {
            others += 1;
        }
    }

    others == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(value: serde_json::Value) -> RawItem {
        serde_json::from_value(value).unwrap()
    }

    const LONG_TEXT: &str =
        "<p>Fica intimado o advogado EDUARDO KOETZ do inteiro teor da decisão proferida nos autos.</p>";

    #[test]
    fn builds_full_record() {
        let item = raw(serde_json::json!({
            "id": 101,
            "hash": "deadbeef",
            "texto": LONG_TEXT,
            "siglaTribunal": "TJRS",
            "nomeOrgao": "1ª Vara Cível",
            "tipoComunicacao": "Intimação",
            "data_disponibilizacao": "2024-03-15T10:00:00Z",
            "numeroComunicacao": 555,
        }));
        let record = build(&item, "Eduardo Koetz");

        assert_eq!(record.source_id, "101");
        assert_eq!(record.content_hash.as_deref(), Some("deadbeef"));
        assert_eq!(record.court.as_deref(), Some("TJRS"));
        assert_eq!(record.published_at.as_deref(), Some("2024-03-15"));
        assert_eq!(record.status, ProcessingStatus::Extracted);
        assert!(!record.body.contains('<'));

        let meta: serde_json::Value = serde_json::from_str(&record.metadata_json).unwrap();
        assert_eq!(meta["numero_comunicacao"], 555);
        assert_eq!(meta["metadados_texto"]["mentions_tracked_name"], true);

        let round: serde_json::Value = serde_json::from_str(&record.raw_json).unwrap();
        assert_eq!(round["id"], 101);
        assert_eq!(round["texto"], LONG_TEXT);
    }

    #[test]
    fn masked_process_number_is_fallback() {
        let item = raw(serde_json::json!({
            "id": 1,
            "texto": LONG_TEXT,
            "numeroprocessocommascara": "1234567-89.2024.8.26.0100",
        }));
        let record = build(&item, "Eduardo Koetz");
        assert_eq!(record.process_number.as_deref(), Some("1234567-89.2024.8.26.0100"));
    }

    #[test]
    fn normalize_date_iso_truncates_time() {
        assert_eq!(normalize_date(Some("2024-03-15T10:00:00Z")).as_deref(), Some("2024-03-15"));
        assert_eq!(normalize_date(Some("2024-03-15")).as_deref(), Some("2024-03-15"));
    }

    #[test]
    fn normalize_date_brazilian_form() {
        assert_eq!(normalize_date(Some("15/03/2024")).as_deref(), Some("2024-03-15"));
        assert_eq!(normalize_date(Some("05/01/2023")).as_deref(), Some("2023-01-05"));
    }

    #[test]
    fn normalize_date_rejects_garbage() {
        assert_eq!(normalize_date(Some("not-a-date")), None);
        assert_eq!(normalize_date(Some("2024/03/15")), None);
        assert_eq!(normalize_date(None), None);
    }

    #[test]
    fn validate_requires_identifier_and_text() {
        let item = raw(serde_json::json!({ "id": 1, "texto": LONG_TEXT }));
        let mut record = build(&item, "");
        assert!(validate(&record));

        record.source_id = String::new();
        assert!(!validate(&record));

        let empty = build(&raw(serde_json::json!({ "id": 2 })), "");
        assert!(!validate(&empty));
    }

    #[test]
    fn validate_length_boundary() {
        let item = raw(serde_json::json!({ "id": 3, "texto": "x".repeat(49) }));
        assert!(!validate(&build(&item, "")));

        let item = raw(serde_json::json!({ "id": 4, "texto": "x".repeat(50) }));
        assert!(validate(&build(&item, "")));
    }

    #[test]
    fn sole_attorney_without_list_pattern() {
        assert!(is_sole_tracked_attorney(
            "Fica intimado EDUARDO KOETZ da sentença",
            "Eduardo Koetz"
        ));
    }

    #[test]
    fn sole_attorney_false_with_other_names() {
        assert!(!is_sole_tracked_attorney(
            "ADV: EDUARDO KOETZ, JOAO SILVA",
            "Eduardo Koetz"
        ));
    }

    #[test]
    fn sole_attorney_true_when_list_only_tracked() {
        assert!(is_sole_tracked_attorney(
            "ADV: EDUARDO KOETZ (OAB 73409/RS)",
            "Eduardo Koetz"
        ));
    }

    #[test]
    fn sole_attorney_false_without_tracked_name() {
        assert!(!is_sole_tracked_attorney(
            "ADV: JOAO SILVA, MARIA SOUZA",
            "Eduardo Koetz"
        ));
    }

    #[test]
    fn sole_attorney_ignores_connectives_and_short_fragments() {
        // "DE" and the license annotation strip away; "SA" is too short to count.
        assert!(is_sole_tracked_attorney(
            "ADVOGADO(A): EDUARDO DE KOETZ (OAB 73409/RS), SA",
            "Eduardo Koetz"
        ));
    }
}
