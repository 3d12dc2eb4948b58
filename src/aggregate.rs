//! In-cycle result aggregation.
//!
//! Within one extraction cycle two items are duplicates iff they share the
//! same upstream identifier; the first one seen wins and later ones are
//! discarded silently. Content hashes play no part here; they are a
//! store-time concern.

use std::collections::HashSet;

use crate::models::RawItem;

/// Append the items of one sub-query result whose identifier has not been
/// seen yet, preserving order. Returns how many items were appended.
pub fn extend_unique(
    into: &mut Vec<RawItem>,
    seen: &mut HashSet<String>,
    page: Vec<RawItem>,
) -> usize {
    let mut appended = 0;
    for item in page {
        let id = item.identifier();
        if seen.insert(id) {
            into.push(item);
            appended += 1;
        }
    }
    appended
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> RawItem {
        serde_json::from_value(serde_json::json!({ "id": id })).unwrap()
    }

    #[test]
    fn first_seen_wins_across_pages() {
        let mut acc = Vec::new();
        let mut seen = HashSet::new();

        let added = extend_unique(&mut acc, &mut seen, vec![item("A"), item("B")]);
        assert_eq!(added, 2);

        let added = extend_unique(&mut acc, &mut seen, vec![item("B"), item("C")]);
        assert_eq!(added, 1);

        let ids: Vec<String> = acc.iter().map(|i| i.identifier()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn dedups_within_a_single_page() {
        let mut acc = Vec::new();
        let mut seen = HashSet::new();

        let added = extend_unique(&mut acc, &mut seen, vec![item("X"), item("X"), item("Y")]);
        assert_eq!(added, 2);
        assert_eq!(acc.len(), 2);
    }

    #[test]
    fn empty_page_is_a_noop() {
        let mut acc = vec![item("A")];
        let mut seen: HashSet<String> = acc.iter().map(|i| i.identifier()).collect();
        assert_eq!(extend_unique(&mut acc, &mut seen, Vec::new()), 0);
        assert_eq!(acc.len(), 1);
    }
}
