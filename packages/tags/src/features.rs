//! Feature expressions shared by the importer.
//!
//! These decide which raw entities are worth importing at all
//! ([`address_expression`], [`venue_expression`]) and how a forwarded
//! venue is reclassified ([`station_expression`], [`street_expression`]).

use std::sync::LazyLock;

use crate::expression::TagExpression;
use crate::schema;

/// Highway types that turn a named way into a street document.
pub const HIGHWAYS: &[&str] = &[
    "motorway",
    "trunk",
    "primary",
    "secondary",
    "tertiary",
    "unclassified",
    "track",
    "service",
    "residential",
    "pedestrian",
    "footway",
    "living_street",
    "cycleway",
    "road",
];

/// Amenities imported even without a name.
const UNNAMED_AMENITIES: &[&str] = &[
    "library",
    "fire_station",
    "university",
    "bus_station",
    "hospital",
    "police",
    "townhall",
];

/// Category keys that make a named entity a venue.
const VENUE_KEYS: &[&str] = &[
    "place", "amenity", "building", "shop", "office", "cuisine", "sport", "natural", "tourism",
    "leisure", "historic", "man_made", "landuse", "waterway", "aerialway", "craft", "military",
];

const AEROWAYS: &[&str] = &[
    "terminal",
    "aerodrome",
    "helipad",
    "airstrip",
    "heliport",
    "areodrome",
    "spaceport",
    "landing_strip",
    "airfield",
    "airport",
];

const ADDRESS_FEATURE: &str = "addr:housenumber§addr:street";
const STATION_FEATURE: &str = "public_transport~station!amenity~bus_station";
const AIRPORT_FEATURE: &str = "aerodrome!aeroway";

fn compile(name: &str, text: &str) -> TagExpression {
    TagExpression::parse(text)
        .unwrap_or_else(|e| panic!("Built-in feature expression '{name}' is invalid: {e}"))
}

/// Builds the venue feature clauses from the name schema.
#[must_use]
pub fn venue_clauses() -> Vec<String> {
    let names = schema::name_schema()
        .iter()
        .map(|n| n.key.as_str())
        .collect::<Vec<_>>()
        .join("|");

    let categories = format!(
        "{}!aeroway~{}!highway~{}",
        VENUE_KEYS.join("!"),
        AEROWAYS.join(";"),
        HIGHWAYS.join(";"),
    );

    vec![
        "addr:housename".to_string(),
        format!("amenity~{}", UNNAMED_AMENITIES.join(";")),
        format!("{categories}§#({names})(:[a-z]{{2}})?"),
    ]
}

static ADDRESS: LazyLock<TagExpression> = LazyLock::new(|| compile("address", ADDRESS_FEATURE));

static VENUE: LazyLock<TagExpression> = LazyLock::new(|| {
    let clauses = venue_clauses();
    TagExpression::from_clauses(clauses.iter().map(String::as_str))
        .unwrap_or_else(|e| panic!("Built-in feature expression 'venue' is invalid: {e}"))
});

static STATION: LazyLock<TagExpression> = LazyLock::new(|| compile("station", STATION_FEATURE));

static STREET: LazyLock<TagExpression> =
    LazyLock::new(|| compile("street", &format!("highway~{}", HIGHWAYS.join(";"))));

static AIRPORT: LazyLock<TagExpression> = LazyLock::new(|| compile("airport", AIRPORT_FEATURE));

/// Entities carrying a complete street address.
#[must_use]
pub fn address_expression() -> &'static TagExpression {
    &ADDRESS
}

/// Entities that are points of interest in their own right.
#[must_use]
pub fn venue_expression() -> &'static TagExpression {
    &VENUE
}

/// Public transport stations and bus stations.
#[must_use]
pub fn station_expression() -> &'static TagExpression {
    &STATION
}

/// Roads of a type listed in [`HIGHWAYS`].
#[must_use]
pub fn street_expression() -> &'static TagExpression {
    &STREET
}

/// Aerodromes and aeroways.
#[must_use]
pub fn airport_expression() -> &'static TagExpression {
    &AIRPORT
}

#[cfg(test)]
mod tests {
    use osm_import_document_models::Tags;

    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn built_in_expressions_compile() {
        let _ = address_expression();
        let _ = venue_expression();
        let _ = station_expression();
        let _ = street_expression();
        let _ = airport_expression();
    }

    #[test]
    fn named_shop_is_a_venue() {
        assert!(venue_expression().matches(&tags(&[("shop", "bakery"), ("name", "Fazer")])));
        assert!(venue_expression().matches(&tags(&[("shop", "bakery"), ("name:fi", "Fazer")])));
    }

    #[test]
    fn unnamed_shop_is_not_a_venue() {
        assert!(!venue_expression().matches(&tags(&[("shop", "bakery")])));
    }

    #[test]
    fn unnamed_library_is_a_venue() {
        assert!(venue_expression().matches(&tags(&[("amenity", "library")])));
    }

    #[test]
    fn only_listed_highways_are_venues() {
        assert!(venue_expression().matches(&tags(&[("highway", "residential"), ("name", "A")])));
        assert!(!venue_expression().matches(&tags(&[("highway", "bus_stop"), ("name", "A")])));
    }

    #[test]
    fn detects_streets_and_stations() {
        assert!(street_expression().matches(&tags(&[("highway", "living_street")])));
        assert!(!street_expression().matches(&tags(&[("highway", "platform")])));
        assert!(station_expression().matches(&tags(&[("amenity", "bus_station")])));
        assert!(station_expression().matches(&tags(&[("public_transport", "station")])));
        assert!(!station_expression().matches(&tags(&[("public_transport", "platform")])));
    }

    #[test]
    fn address_needs_number_and_street() {
        assert!(address_expression().matches(&tags(&[
            ("addr:housenumber", "1"),
            ("addr:street", "Main St"),
        ])));
        assert!(!address_expression().matches(&tags(&[("addr:street", "Main St")])));
    }
}
