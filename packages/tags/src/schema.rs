//! Compile-time tag schemas.
//!
//! The name schema, address schema and localized language keys are TOML
//! files under `schema/`, embedded with `include_str!` and parsed once on
//! first use. They are read-only for the lifetime of the process.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use osm_import_document_models::AddressField;
use serde::Deserialize;

const NAME_SCHEMA_TOML: &str = include_str!("../schema/name_osm.toml");
const ADDRESS_SCHEMA_TOML: &str = include_str!("../schema/address_osm.toml");
const LOCALIZED_KEYS_TOML: &str = include_str!("../schema/localized_name_keys.toml");

const NAME_PREFIX: &str = "name:";
const STREET_PREFIX: &str = "addr:street:";

/// An OSM name key and the document name slot it fills.
#[derive(Debug, Clone, Deserialize)]
pub struct NameKey {
    /// OSM tag key, e.g. `official_name`.
    pub key: String,
    /// Name slot, e.g. `default`.
    pub slot: String,
}

#[derive(Deserialize)]
struct NameSchemaFile {
    names: Vec<NameKey>,
}

#[derive(Deserialize)]
struct AddressSchemaFile {
    fields: BTreeMap<String, AddressField>,
}

#[derive(Deserialize)]
struct LocalizedKeysFile {
    codes: BTreeSet<String>,
}

fn parse_embedded<T: serde::de::DeserializeOwned>(name: &str, toml_str: &str) -> T {
    toml::de::from_str(toml_str)
        .unwrap_or_else(|e| panic!("Failed to parse embedded schema '{name}': {e}"))
}

static NAME_SCHEMA: LazyLock<Vec<NameKey>> = LazyLock::new(|| {
    parse_embedded::<NameSchemaFile>("name_osm", NAME_SCHEMA_TOML).names
});

static ADDRESS_SCHEMA: LazyLock<BTreeMap<String, AddressField>> = LazyLock::new(|| {
    parse_embedded::<AddressSchemaFile>("address_osm", ADDRESS_SCHEMA_TOML).fields
});

static LOCALIZED_KEYS: LazyLock<BTreeSet<String>> = LazyLock::new(|| {
    parse_embedded::<LocalizedKeysFile>("localized_name_keys", LOCALIZED_KEYS_TOML).codes
});

/// Returns the name schema in priority order.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed. The file is a compile-time
/// constant, so this is caught by the registry tests.
#[must_use]
pub fn name_schema() -> &'static [NameKey] {
    &NAME_SCHEMA
}

/// Returns the name slot for an exact name-schema key.
#[must_use]
pub fn name_slot(key: &str) -> Option<&'static str> {
    NAME_SCHEMA
        .iter()
        .find(|n| n.key == key)
        .map(|n| n.slot.as_str())
}

/// Returns the address field for an address-schema key.
#[must_use]
pub fn address_field(key: &str) -> Option<AddressField> {
    ADDRESS_SCHEMA.get(key).copied()
}

/// Returns `true` if `lang` is an accepted `name:<lang>` suffix.
#[must_use]
pub fn is_localized_key(lang: &str) -> bool {
    LOCALIZED_KEYS.contains(lang)
}

/// Extracts the language of a `name:<lang>` tag, e.g. `name:EN` -> `en`.
///
/// Returns `None` for other keys and for unknown languages.
#[must_use]
pub fn name_suffix(tag: &str) -> Option<String> {
    if tag.len() < 6 {
        return None;
    }
    let suffix = tag.strip_prefix(NAME_PREFIX)?.to_lowercase();
    is_localized_key(&suffix).then_some(suffix)
}

/// Extracts the language of a lower-priority localized name tag such as
/// `official_name:fi`.
#[must_use]
pub fn localized_name_suffix(tag: &str) -> Option<String> {
    let (prefix, suffix) = tag.split_once(':')?;
    if prefix == "name" || !NAME_SCHEMA.iter().any(|n| n.key == prefix) {
        return None;
    }
    let suffix = suffix.to_lowercase();
    is_localized_key(&suffix).then_some(suffix)
}

/// Extracts the normalized suffix of an `addr:street:<suffix>` tag.
///
/// Suffixes that are themselves name-schema keys are mapped to their
/// slot.
#[must_use]
pub fn street_suffix(tag: &str) -> Option<String> {
    let suffix = tag.strip_prefix(STREET_PREFIX)?.to_lowercase();
    if suffix.is_empty() {
        return None;
    }
    Some(name_slot(&suffix).map_or(suffix, str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_name_schema_with_name_first() {
        let schema = name_schema();
        assert!(!schema.is_empty());
        assert_eq!(schema[0].key, "name");
        assert_eq!(schema[0].slot, "default");
    }

    #[test]
    fn name_keys_are_unique() {
        let mut seen = BTreeSet::new();
        for key in name_schema() {
            assert!(seen.insert(&key.key), "Duplicate name key: {}", key.key);
        }
    }

    #[test]
    fn loads_address_schema() {
        assert_eq!(
            address_field("addr:housenumber"),
            Some(AddressField::Number)
        );
        assert_eq!(address_field("addr:street"), Some(AddressField::Street));
        assert_eq!(address_field("addr:postcode"), Some(AddressField::Zip));
        assert_eq!(address_field("addr:housename"), Some(AddressField::Name));
        assert_eq!(address_field("addr:unit"), Some(AddressField::Unit));
        assert_eq!(address_field("name"), None);
    }

    #[test]
    fn localized_keys_are_two_letter_codes() {
        for code in LOCALIZED_KEYS.iter() {
            assert_eq!(code.len(), 2, "Unexpected language code: {code}");
        }
        assert!(is_localized_key("fi"));
        assert!(is_localized_key("sv"));
        assert!(!is_localized_key("xx"));
    }

    #[test]
    fn extracts_name_suffix() {
        assert_eq!(name_suffix("name:EN").as_deref(), Some("en"));
        assert_eq!(name_suffix("name:fi").as_deref(), Some("fi"));
        assert_eq!(name_suffix("name:xx"), None);
        assert_eq!(name_suffix("name"), None);
        assert_eq!(name_suffix("alt_name:fi"), None);
    }

    #[test]
    fn extracts_localized_name_suffix() {
        assert_eq!(
            localized_name_suffix("official_name:sv").as_deref(),
            Some("sv")
        );
        assert_eq!(localized_name_suffix("name:sv"), None);
        assert_eq!(localized_name_suffix("old_name:sv"), None);
        assert_eq!(localized_name_suffix("alt_name:zz"), None);
    }

    #[test]
    fn extracts_street_suffix() {
        assert_eq!(street_suffix("addr:street:SV").as_deref(), Some("sv"));
        assert_eq!(
            street_suffix("addr:street:name").as_deref(),
            Some("default")
        );
        assert_eq!(street_suffix("addr:street"), None);
        assert_eq!(street_suffix("addr:street:"), None);
    }
}
