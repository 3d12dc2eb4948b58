//! HTML-to-plain-text normalization and heuristic metadata extraction.
//!
//! Notification bodies arrive as loosely structured HTML. [`normalize`]
//! renders them to clean plain text while preserving paragraph structure;
//! [`extract_metadata`] scans the cleaned text for a small set of advisory
//! signals (process number, document class, deadline mentions).
//!
//! Both functions are total: any input string, including empty, pure
//! whitespace, or unbalanced markup, produces a result without error.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::models::{DeadlineMention, DocumentKind, TextMetadata};

fn re(cell: &'static OnceCell<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap())
}

/// Convert notification HTML into clean, readable plain text.
///
/// Tag handling preserves structure: `<br>` becomes a newline, `</p>` a
/// blank line, `<div>` a newline; everything else is stripped. Entities are
/// decoded, line endings normalized, and whitespace collapsed. Empty input
/// yields an empty string.
pub fn normalize(text: &str) -> String {
    static BR: OnceCell<Regex> = OnceCell::new();
    static P_CLOSE: OnceCell<Regex> = OnceCell::new();
    static P_OPEN: OnceCell<Regex> = OnceCell::new();
    static DIV_OPEN: OnceCell<Regex> = OnceCell::new();
    static DIV_CLOSE: OnceCell<Regex> = OnceCell::new();
    static ANY_TAG: OnceCell<Regex> = OnceCell::new();
    static HSPACE: OnceCell<Regex> = OnceCell::new();
    static LINE_LEAD: OnceCell<Regex> = OnceCell::new();
    static LINE_TRAIL: OnceCell<Regex> = OnceCell::new();
    static MULTI_NL: OnceCell<Regex> = OnceCell::new();

    if text.is_empty() {
        return String::new();
    }

    let mut clean = re(&BR, r"(?i)<br\s*/?>").replace_all(text, "\n").into_owned();
    clean = re(&P_CLOSE, r"(?i)</p>").replace_all(&clean, "\n\n").into_owned();
    clean = re(&P_OPEN, r"(?i)<p[^>]*>").replace_all(&clean, "").into_owned();
    clean = re(&DIV_OPEN, r"(?i)<div[^>]*>").replace_all(&clean, "\n").into_owned();
    clean = re(&DIV_CLOSE, r"(?i)</div>").replace_all(&clean, "").into_owned();
    clean = re(&ANY_TAG, r"<[^>]*>").replace_all(&clean, "").into_owned();

    clean = html_escape::decode_html_entities(&clean).into_owned();
    clean = clean.replace("&nbsp;", " ");
    clean = clean.replace("&amp;", "&");
    clean = clean.replace("&lt;", "<");
    clean = clean.replace("&gt;", ">");
    clean = clean.replace("&quot;", "\"");
    clean = clean.replace("&#39;", "'");

    clean = clean.replace("\r\n", "\n");
    clean = clean.replace('\r', "\n");

    clean = re(&HSPACE, r"[ \t]+").replace_all(&clean, " ").into_owned();
    clean = re(&LINE_LEAD, r"\n[ \t]+").replace_all(&clean, "\n").into_owned();
    clean = re(&LINE_TRAIL, r"[ \t]+\n").replace_all(&clean, "\n").into_owned();
    clean = re(&MULTI_NL, r"\n{3,}").replace_all(&clean, "\n\n").into_owned();

    clean.trim().to_string()
}

/// Scan normalized text for advisory metadata.
///
/// Document class matching runs in fixed priority order (Despacho,
/// Sentença, Decisão, Acórdão) and the first hit wins. All matching is
/// best-effort; a field that matches nothing is simply absent.
pub fn extract_metadata(text: &str, tracked_name: &str) -> TextMetadata {
    static PROCESS: OnceCell<Regex> = OnceCell::new();
    static SIGNATURE: OnceCell<Regex> = OnceCell::new();
    static DESPACHO: OnceCell<Regex> = OnceCell::new();
    static SENTENCA: OnceCell<Regex> = OnceCell::new();
    static DECISAO: OnceCell<Regex> = OnceCell::new();
    static ACORDAO: OnceCell<Regex> = OnceCell::new();
    static DEADLINE: OnceCell<Regex> = OnceCell::new();

    let mut meta = TextMetadata::default();

    meta.process_number = re(&PROCESS, r"(\d{7}-\d{2}\.\d{4}\.\d\.\d{2}\.\d{4})")
        .captures(text)
        .map(|caps| caps[1].to_string());

    meta.has_electronic_signature = re(&SIGNATURE, r"(?i)data da assinatura eletrônica\.?")
        .is_match(text);

    let kinds: [(&'static OnceCell<Regex>, &str, DocumentKind); 4] = [
        (&DESPACHO, r"(?i)\bDESPACHO\b", DocumentKind::Despacho),
        (&SENTENCA, r"(?i)\bSENTENÇA\b", DocumentKind::Sentenca),
        (&DECISAO, r"(?i)\bDECISÃO\b", DocumentKind::Decisao),
        (&ACORDAO, r"(?i)\bACÓRDÃO\b", DocumentKind::Acordao),
    ];
    for (cell, pattern, kind) in kinds {
        if re(cell, pattern).is_match(text) {
            meta.document_kind = Some(kind);
            break;
        }
    }

    meta.deadlines = re(&DEADLINE, r"(?i)prazo de (\d+) \(([^)]+)\) dias?")
        .captures_iter(text)
        .map(|caps| DeadlineMention {
            quantity: caps[1].to_string(),
            unit: caps[2].to_string(),
        })
        .collect();

    meta.mentions_tracked_name = !tracked_name.is_empty()
        && text.to_uppercase().contains(&tracked_name.to_uppercase());

    meta.lines = text.split('\n').count();
    meta.chars = text.chars().count();

    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_preserves_structure() {
        let out = normalize("<p>Primeiro parágrafo</p><p>Segundo<br>linha</p>");
        assert_eq!(out, "Primeiro parágrafo\n\nSegundo\nlinha");
    }

    #[test]
    fn decodes_entities() {
        let out = normalize("A &amp; B &lt;tag&gt; &quot;x&quot; &#39;y&#39;");
        assert_eq!(out, "A & B <tag> \"x\" 'y'");
        // Named nbsp decodes to U+00A0, which survives as-is.
        assert_eq!(normalize("A&nbsp;B"), "A\u{a0}B");
    }

    #[test]
    fn collapses_whitespace_and_blank_lines() {
        let out = normalize("a  \t b\n\n\n\n\nc\n   d   \n");
        assert_eq!(out, "a b\n\nc\nd");
    }

    #[test]
    fn normalizes_line_endings() {
        assert_eq!(normalize("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn empty_and_whitespace_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\t  "), "");
    }

    #[test]
    fn tolerates_unbalanced_markup() {
        let out = normalize("<div><p>aberto <b>sem fechar");
        assert_eq!(out, "aberto sem fechar");
    }

    #[test]
    fn idempotent_on_typical_inputs() {
        let samples = [
            "<p>INTIMAÇÃO</p><div>Processo nº 1234567-89.2024.8.26.0100<br>Prazo</div>",
            "texto simples já limpo",
            "  espaços   e\r\nquebras\r mistas  ",
            "<broken <markup>> sobrando",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "input: {:?}", s);
        }
    }

    #[test]
    fn extracts_process_number() {
        let meta = extract_metadata("Processo 1234567-89.2024.8.26.0100 em andamento", "");
        assert_eq!(meta.process_number.as_deref(), Some("1234567-89.2024.8.26.0100"));
    }

    #[test]
    fn document_kind_priority_order() {
        let meta = extract_metadata("ACÓRDÃO publicado após o DESPACHO do juiz", "");
        assert_eq!(meta.document_kind, Some(DocumentKind::Despacho));

        let meta = extract_metadata("Publicada a SENTENÇA e lavrado o ACÓRDÃO", "");
        assert_eq!(meta.document_kind, Some(DocumentKind::Sentenca));

        let meta = extract_metadata("nada relevante aqui", "");
        assert_eq!(meta.document_kind, None);
    }

    #[test]
    fn word_boundary_respected_for_document_kind() {
        let meta = extract_metadata("DESPACHOS diversos", "");
        assert_eq!(meta.document_kind, None);
    }

    #[test]
    fn collects_all_deadline_mentions() {
        let text = "no prazo de 15 (quinze) dias, e após no prazo de 5 (cinco) dias";
        let meta = extract_metadata(text, "");
        assert_eq!(
            meta.deadlines,
            vec![
                DeadlineMention { quantity: "15".into(), unit: "quinze".into() },
                DeadlineMention { quantity: "5".into(), unit: "cinco".into() },
            ]
        );
    }

    #[test]
    fn detects_signature_and_tracked_name() {
        let text = "intimado EDUARDO KOETZ, na data da assinatura eletrônica.";
        let meta = extract_metadata(text, "Eduardo Koetz");
        assert!(meta.has_electronic_signature);
        assert!(meta.mentions_tracked_name);

        let meta = extract_metadata("outro advogado qualquer", "Eduardo Koetz");
        assert!(!meta.mentions_tracked_name);
    }

    #[test]
    fn counts_lines_and_chars() {
        let meta = extract_metadata("uma\nduas\ntrês", "");
        assert_eq!(meta.lines, 3);
        assert_eq!(meta.chars, 13);
    }
}
