//! Popularity scoring.
//!
//! Every document starts from [`DEFAULT_POPULARITY`]. The first matching
//! rule below replaces it, then tag coefficients scale the result:
//!
//! 1. per-id override from the import config
//! 2. minor buildings, waterways and landuse
//! 3. the `place` table
//!
//! Address records use this baseline. The primary record additionally
//! keeps a preset popularity (airports, set during tag mapping) unless an
//! override exists; see [`primary_popularity`].
//!
//! Fixed popularities for derived records (entrances, buildings, streets,
//! stations) are applied by the splitter and bypass this computation.

use std::collections::BTreeMap;

use osm_import_document_models::{Document, Tags};

pub const DEFAULT_POPULARITY: u64 = 10;
pub const MINOR_FEATURE_POPULARITY: u64 = 5;
pub const AIRPORT_POPULARITY: u64 = 10_000;
pub const BUILDING_POPULARITY: u64 = 7;
pub const STREET_POPULARITY: u64 = 11;

/// Matches the popularity of stations imported from transit feeds.
pub const STATION_POPULARITY: u64 = 1_000_000;

pub const GATE_POPULARITY: u64 = 13;
pub const MAIN_ENTRANCE_POPULARITY: u64 = 12;
pub const ENTRANCE_POPULARITY: u64 = 11;

const MINOR_BUILDINGS: &[&str] = &["barn", "cabin", "shed", "garage", "hut", "carbage_shed"];

/// `(key, value, factor)`; the product is rounded up.
const COEFFICIENTS: &[(&str, &str, f64)] = &[("amenity", "toilets", 0.2)];

/// Popularity of a `place=<kind>` feature.
#[must_use]
pub fn place_popularity(kind: &str) -> u64 {
    match kind {
        "district" | "city" => 30,
        "town" | "municipality" => 20,
        "county" => 15,
        "village" | "suburb" => 8,
        "hamlet" => 7,
        "square" => 6,
        "neighbourhood" | "allotments" => 5,
        "quarter" => 4,
        "city_block" => 3,
        "locality" | "isolated_dwelling" | "farm" | "island" => 2,
        "plot" | "islet" => 1,
        _ => DEFAULT_POPULARITY,
    }
}

fn is_minor_feature(tags: &Tags) -> bool {
    tags.get("building")
        .is_some_and(|b| MINOR_BUILDINGS.contains(&b.as_str()))
        || tags.contains_key("waterway")
        || tags.contains_key("landuse")
}

/// Computed popularity of `doc` from its tags and the per-id overrides.
///
/// Ignores any preset already stored on the document.
#[must_use]
pub fn base_popularity(doc: &Document, overrides: &BTreeMap<String, u64>) -> u64 {
    let base = if let Some(&popularity) = overrides.get(&doc.id) {
        popularity
    } else if is_minor_feature(&doc.tags) {
        MINOR_FEATURE_POPULARITY
    } else if let Some(kind) = doc.tag("place") {
        place_popularity(kind)
    } else {
        DEFAULT_POPULARITY
    };

    apply_coefficients(&doc.tags, base)
}

/// Popularity of the primary record: an override wins, then the preset
/// on the document, then [`base_popularity`].
#[must_use]
pub fn primary_popularity(doc: &Document, overrides: &BTreeMap<String, u64>) -> u64 {
    match doc.popularity {
        Some(preset) if !overrides.contains_key(&doc.id) => preset,
        _ => base_popularity(doc, overrides),
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn apply_coefficients(tags: &Tags, mut popularity: u64) -> u64 {
    for (key, value, factor) in COEFFICIENTS {
        if tags.get(*key).is_some_and(|v| v == value) {
            popularity = (factor * popularity as f64).ceil() as u64;
        }
    }
    popularity
}

/// Fixed popularity of address points at gates and entrances.
#[must_use]
pub fn entrance_popularity(tags: &Tags) -> Option<u64> {
    let tag = |key: &str| tags.get(key).map(String::as_str);

    if tag("barrier") == Some("gate") {
        Some(GATE_POPULARITY)
    } else if tag("entrance") == Some("main") || tag("_centroidType") == Some("mainEntrance") {
        Some(MAIN_ENTRANCE_POPULARITY)
    } else if tag("entrance") == Some("yes") || tag("_centroidType") == Some("entrance") {
        Some(ENTRANCE_POPULARITY)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use osm_import_document_models::{Layer, SOURCE_OPENSTREETMAP};

    use super::*;

    fn doc(pairs: &[(&str, &str)]) -> Document {
        let mut doc = Document::new(SOURCE_OPENSTREETMAP, Layer::Venue, "node:1");
        doc.tags = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        doc
    }

    #[test]
    fn default_is_ten() {
        assert_eq!(
            base_popularity(&doc(&[("shop", "bakery")]), &BTreeMap::new()),
            10
        );
    }

    #[test]
    fn place_table() {
        let none = BTreeMap::new();
        assert_eq!(base_popularity(&doc(&[("place", "city")]), &none), 30);
        assert_eq!(base_popularity(&doc(&[("place", "hamlet")]), &none), 7);
        assert_eq!(base_popularity(&doc(&[("place", "islet")]), &none), 1);
        assert_eq!(base_popularity(&doc(&[("place", "spaceport")]), &none), 10);
    }

    #[test]
    fn minor_features_beat_place() {
        let none = BTreeMap::new();
        assert_eq!(base_popularity(&doc(&[("building", "shed")]), &none), 5);
        assert_eq!(base_popularity(&doc(&[("building", "house")]), &none), 10);
        assert_eq!(
            base_popularity(&doc(&[("waterway", "stream"), ("place", "city")]), &none),
            5
        );
        assert_eq!(base_popularity(&doc(&[("landuse", "forest")]), &none), 5);
    }

    #[test]
    fn override_wins_over_preset() {
        let overrides = BTreeMap::from([("node:1".to_string(), 42)]);
        let mut airport = doc(&[("aeroway", "aerodrome")]);
        airport.popularity = Some(AIRPORT_POPULARITY);

        assert_eq!(primary_popularity(&airport, &overrides), 42);
        assert_eq!(
            primary_popularity(&airport, &BTreeMap::new()),
            AIRPORT_POPULARITY
        );
    }

    #[test]
    fn baseline_ignores_preset() {
        let mut airport = doc(&[("aeroway", "aerodrome")]);
        airport.popularity = Some(AIRPORT_POPULARITY);

        assert_eq!(
            base_popularity(&airport, &BTreeMap::new()),
            DEFAULT_POPULARITY
        );
    }

    #[test]
    fn coefficients_apply_last_and_round_up() {
        let none = BTreeMap::new();
        assert_eq!(base_popularity(&doc(&[("amenity", "toilets")]), &none), 2);
        assert_eq!(
            base_popularity(&doc(&[("amenity", "toilets"), ("landuse", "park")]), &none),
            1
        );
        let overrides = BTreeMap::from([("node:1".to_string(), 100)]);
        assert_eq!(
            base_popularity(&doc(&[("amenity", "toilets")]), &overrides),
            20
        );
    }

    #[test]
    fn entrances() {
        let tags = |pairs: &[(&str, &str)]| doc(pairs).tags;
        assert_eq!(
            entrance_popularity(&tags(&[("barrier", "gate"), ("entrance", "main")])),
            Some(13)
        );
        assert_eq!(
            entrance_popularity(&tags(&[("entrance", "main")])),
            Some(12)
        );
        assert_eq!(
            entrance_popularity(&tags(&[("_centroidType", "mainEntrance")])),
            Some(12)
        );
        assert_eq!(entrance_popularity(&tags(&[("entrance", "yes")])), Some(11));
        assert_eq!(
            entrance_popularity(&tags(&[("_centroidType", "entrance")])),
            Some(11)
        );
        assert_eq!(entrance_popularity(&tags(&[("entrance", "service")])), None);
    }
}
