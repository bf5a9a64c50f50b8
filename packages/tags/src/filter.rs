//! Flat key/value deny-lists.
//!
//! A deny-list is a list of maps. A map matches when every one of its
//! key/value pairs is present in the tags; an entity that matches any map
//! in the list is rejected.

use std::collections::BTreeMap;

use osm_import_document_models::Tags;

/// One deny rule: all pairs must match for the rule to fire.
pub type DenyFilter = BTreeMap<String, String>;

/// Returns `false` if any filter in `filters` fully matches `tags`.
#[must_use]
pub fn passes_filter(tags: &Tags, filters: &[DenyFilter]) -> bool {
    !filters.iter().any(|filter| {
        filter
            .iter()
            .all(|(key, value)| tags.get(key).is_some_and(|v| v == value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn passes_without_filters() {
        assert!(passes_filter(&map(&[("amenity", "bench")]), &[]));
    }

    #[test]
    fn rejects_when_all_pairs_match() {
        let filters = vec![map(&[("amenity", "parking"), ("access", "private")])];
        assert!(!passes_filter(
            &map(&[("amenity", "parking"), ("access", "private"), ("name", "P1")]),
            &filters
        ));
    }

    #[test]
    fn partial_match_passes() {
        let filters = vec![map(&[("amenity", "parking"), ("access", "private")])];
        assert!(passes_filter(&map(&[("amenity", "parking")]), &filters));
    }

    #[test]
    fn any_filter_in_list_rejects() {
        let filters = vec![map(&[("shop", "vacant")]), map(&[("disused", "yes")])];
        assert!(!passes_filter(&map(&[("disused", "yes")]), &filters));
        assert!(passes_filter(&map(&[("shop", "bakery")]), &filters));
    }
}
