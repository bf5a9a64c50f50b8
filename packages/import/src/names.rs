//! Tag mapping: names, aliases and address fields.
//!
//! Name candidates are collected in three passes so that the outcome does
//! not depend on tag order:
//!
//! 1. exact name-schema keys (`name`, `official_name`, ...) in schema order
//! 2. `name:<lang>` tags
//! 3. other localized schema keys (`official_name:fi`, ...), which only
//!    fill slots that are still empty
//!
//! Every value is split on `;`. The first unseen string fills its slot and
//! later strings become aliases of that slot. A string is recorded at most
//! once across all slots.

use std::collections::{BTreeMap, HashSet};

use osm_import_document_models::{AddressField, DEFAULT_NAME, Document, Tags};
use osm_import_tags::{features, schema};

use crate::popularity::AIRPORT_POPULARITY;

/// Characters stripped from both ends of every mapped value.
const JUNK_CHARS: &str = "#$%^*<>-=_{};:\",./?\t\n' ";

/// Errors from tag mapping. The document is forwarded unmodified.
#[derive(Debug, thiserror::Error)]
pub enum TagMappingError {
    /// A tag with an empty key.
    #[error("Document {id} has a tag with an empty key")]
    EmptyKey {
        /// Canonical id of the document.
        id: String,
    },
}

/// Strips leading and trailing junk characters.
#[must_use]
pub fn trim_junk(value: &str) -> &str {
    value.trim_matches(|c| JUNK_CHARS.contains(c))
}

/// Maps tags to names, aliases and address fields.
#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    languages: Vec<String>,
}

impl NameResolver {
    /// Creates a resolver. An empty `languages` list accepts every
    /// localized name; otherwise only the listed languages are kept, and
    /// their order decides the fallback default name.
    #[must_use]
    pub const fn new(languages: Vec<String>) -> Self {
        Self { languages }
    }

    fn accepts(&self, lang: &str) -> bool {
        self.languages.is_empty() || self.languages.iter().any(|l| l == lang)
    }

    /// Populates names, aliases, address fields and airport aliases of
    /// `doc` from its tags.
    ///
    /// On a mapping error the error and the document are logged and `doc`
    /// is left unmodified.
    pub fn resolve(&self, doc: &mut Document) {
        if doc.tags.is_empty() {
            return;
        }
        match self.map_tags(&doc.id, &doc.tags) {
            Ok(mapping) => mapping.apply(doc),
            Err(e) => {
                log::error!("Tag mapping error: {e}");
                match serde_json::to_string_pretty(doc) {
                    Ok(json) => log::error!("{json}"),
                    Err(e) => log::error!("Failed to serialize document {}: {e}", doc.id),
                }
            }
        }
    }

    fn map_tags(&self, id: &str, tags: &Tags) -> Result<TagMapping, TagMappingError> {
        if tags.keys().any(String::is_empty) {
            return Err(TagMappingError::EmptyKey { id: id.to_string() });
        }

        let mut mapping = TagMapping::default();

        for name_key in schema::name_schema() {
            if let Some(value) = tags.get(&name_key.key) {
                mapping.store(&name_key.slot, value);
            }
        }

        for (key, value) in tags {
            if let Some(lang) = schema::name_suffix(key)
                && self.accepts(&lang)
            {
                mapping.store(&lang, value);
            }
        }

        for (key, value) in tags {
            if let Some(lang) = schema::localized_name_suffix(key)
                && self.accepts(&lang)
                && !mapping.names.contains_key(&lang)
            {
                mapping.store(&lang, value);
            }
        }

        for (key, value) in tags {
            if let Some(field) = schema::address_field(key) {
                let value = trim_junk(value);
                if !value.is_empty() {
                    mapping
                        .address
                        .entry(field)
                        .or_insert_with(|| value.to_string());
                }
            }
        }

        mapping.default = mapping
            .names
            .get(DEFAULT_NAME)
            .or_else(|| self.languages.iter().find_map(|l| mapping.names.get(l)))
            .or(mapping.first_alias.as_ref())
            .cloned();
        mapping.promote_finnish();

        if features::airport_expression().matches(tags)
            && let Some(code) = tags.get("iata").map(String::as_str).map(trim_junk)
            && !code.is_empty()
        {
            mapping.airport_code = Some(code.to_string());
        }

        Ok(mapping)
    }
}

/// Staged result of [`NameResolver::map_tags`], applied only on success.
#[derive(Debug, Default)]
struct TagMapping {
    names: BTreeMap<String, String>,
    aliases: BTreeMap<String, Vec<String>>,
    first_alias: Option<String>,
    seen: HashSet<String>,
    default: Option<String>,
    address: BTreeMap<AddressField, String>,
    airport_code: Option<String>,
}

impl TagMapping {
    fn store(&mut self, slot: &str, value: &str) {
        let value = trim_junk(value);
        if value.is_empty() {
            return;
        }
        for name in value.split(';').map(str::trim).filter(|n| !n.is_empty()) {
            if !self.seen.insert(name.to_string()) {
                continue;
            }
            if self.names.contains_key(slot) {
                self.aliases
                    .entry(slot.to_string())
                    .or_default()
                    .push(name.to_string());
                if self.first_alias.is_none() {
                    self.first_alias = Some(name.to_string());
                }
            } else {
                self.names.insert(slot.to_string(), name.to_string());
            }
        }
    }

    /// Prefers the Finnish name when the default is the Swedish one.
    fn promote_finnish(&mut self) {
        let (Some(default), Some(fi), Some(sv)) = (
            self.default.as_deref(),
            self.names.get("fi"),
            self.names.get("sv"),
        ) else {
            return;
        };
        if sv == default && fi != default {
            self.default = Some(fi.clone());
        }
    }

    fn apply(self, doc: &mut Document) {
        let default = self.default.as_deref();

        if let Some(default) = default {
            doc.set_name(DEFAULT_NAME, default);
        }
        for (slot, name) in &self.names {
            if Some(name.as_str()) != default {
                doc.set_name(slot.as_str(), name.as_str());
            }
        }
        for (slot, aliases) in &self.aliases {
            for alias in aliases {
                if Some(alias.as_str()) != default {
                    doc.add_name_alias(slot, alias.as_str());
                }
            }
        }

        for (field, value) in self.address {
            doc.address_parts.set(field, value);
        }

        if let Some(code) = self.airport_code {
            doc.add_name_alias(DEFAULT_NAME, code.as_str());
            doc.add_name_alias(DEFAULT_NAME, format!("{code} Airport"));
            doc.popularity = Some(AIRPORT_POPULARITY);
        }
    }
}

/// Applies the Finnish-over-Swedish default rule to a finished document.
pub fn promote_finnish_default(doc: &mut Document) {
    let (Some(default), Some(fi), Some(sv)) = (doc.default_name(), doc.name("fi"), doc.name("sv"))
    else {
        return;
    };
    if sv == default && fi != default {
        let fi = fi.to_string();
        doc.set_name(DEFAULT_NAME, fi);
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

    fn resolve(pairs: &[(&str, &str)]) -> Document {
        let mut d = doc(pairs);
        NameResolver::default().resolve(&mut d);
        d
    }

    #[test]
    fn trims_junk_characters() {
        assert_eq!(trim_junk("  -Main St.;"), "Main St");
        assert_eq!(trim_junk("#12\n"), "12");
        assert_eq!(trim_junk("__"), "");
    }

    #[test]
    fn splits_names_into_slot_and_aliases() {
        let d = resolve(&[("name", "Kamppi;Kampen;Kamppi")]);
        assert_eq!(d.default_name(), Some("Kamppi"));
        assert_eq!(d.aliases(DEFAULT_NAME), ["Kampen"]);
    }

    #[test]
    fn alt_names_become_default_aliases() {
        let d = resolve(&[("name", "Ateneum"), ("alt_name", "Ateneum Art Museum")]);
        assert_eq!(d.default_name(), Some("Ateneum"));
        assert_eq!(d.aliases(DEFAULT_NAME), ["Ateneum Art Museum"]);
    }

    #[test]
    fn localized_names_equal_to_default_are_not_repeated() {
        let d = resolve(&[
            ("name", "Helsinki"),
            ("name:fi", "Helsinki"),
            ("name:sv", "Helsingfors"),
        ]);
        assert_eq!(d.default_name(), Some("Helsinki"));
        assert_eq!(d.name("sv"), Some("Helsingfors"));
        assert_eq!(d.name("fi"), None);
    }

    #[test]
    fn swedish_default_is_replaced_by_finnish() {
        let mut d = doc(&[("name:fi", "Turku"), ("name:sv", "Åbo")]);
        NameResolver::new(vec!["sv".to_string(), "fi".to_string()]).resolve(&mut d);
        assert_eq!(d.default_name(), Some("Turku"));
        assert_eq!(d.name("sv"), Some("Åbo"));
    }

    #[test]
    fn language_whitelist_filters_and_orders() {
        let mut d = doc(&[("name:de", "Helsinki"), ("name:en", "Helsinki city")]);
        NameResolver::new(vec!["fi".to_string(), "en".to_string()]).resolve(&mut d);
        assert_eq!(d.default_name(), Some("Helsinki city"));
        assert_eq!(d.name("de"), None);
    }

    #[test]
    fn lower_priority_names_fill_only_empty_slots() {
        let d = resolve(&[
            ("name:fi", "Rautatieasema"),
            ("official_name:fi", "Helsingin päärautatieasema"),
            ("official_name:sv", "Helsingfors centralstation"),
        ]);
        assert_eq!(d.name("sv"), Some("Helsingfors centralstation"));
        assert!(d.aliases("fi").is_empty());
    }

    #[test]
    fn first_alias_is_last_resort_default() {
        let mut mapping = TagMapping::default();
        mapping.store("fi", "A;B");
        assert_eq!(mapping.first_alias.as_deref(), Some("B"));
    }

    #[test]
    fn maps_address_fields_first_match_wins() {
        let d = resolve(&[
            ("addr:housenumber", " 12;14 "),
            ("addr:street", "Main St"),
            ("addr:postcode", "00100"),
            ("postal_code", "00200"),
            ("addr:unit", "--"),
        ]);
        assert_eq!(d.address_parts.number.as_deref(), Some("12;14"));
        assert_eq!(d.address_parts.street.as_deref(), Some("Main St"));
        assert_eq!(d.address_parts.zip.as_deref(), Some("00100"));
        assert!(d.address_parts.unit.is_none());
        assert!(d.default_name().is_none());
    }

    #[test]
    fn airport_codes_become_aliases() {
        let d = resolve(&[
            ("aeroway", "aerodrome"),
            ("name", "Helsinki Airport"),
            ("iata", " HEL "),
        ]);
        assert_eq!(d.aliases(DEFAULT_NAME), ["HEL", "HEL Airport"]);
        assert_eq!(d.popularity, Some(AIRPORT_POPULARITY));

        let no_code = resolve(&[("aeroway", "aerodrome"), ("iata", "  ")]);
        assert!(no_code.popularity.is_none());

        let not_airport = resolve(&[("iata", "HEL")]);
        assert!(not_airport.aliases(DEFAULT_NAME).is_empty());
    }

    #[test]
    fn empty_key_leaves_document_unmodified() {
        let mut d = doc(&[("", "x"), ("name", "Kamppi")]);
        let before = d.clone();
        NameResolver::default().resolve(&mut d);
        assert_eq!(d, before);
    }

    #[test]
    fn promote_finnish_on_document() {
        let mut d = doc(&[]);
        d.set_name(DEFAULT_NAME, "Åbo 1");
        d.set_name("sv", "Åbo 1");
        d.set_name("fi", "Turku 1");
        promote_finnish_default(&mut d);
        assert_eq!(d.default_name(), Some("Turku 1"));
    }
}
