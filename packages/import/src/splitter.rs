//! One-to-many document splitting.
//!
//! A mapped document yields, in this order:
//!
//! * one address document per house number variant, if it has a number
//!   and a street
//! * one building document, if it has a house name that is not also its
//!   display name and no building of that name was emitted nearby
//! * the document itself, reclassified as station, street or venue, if it
//!   is named and its name was not already used by an address

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use osm_import_document_models::{
    AddressField, DEFAULT_NAME, Document, Layer, SOURCE_OPENSTREETMAP,
};
use osm_import_tags::{DenyFilter, features, passes_filter, schema};
use regex::Regex;

use crate::config::ImportConfig;
use crate::dedupe::BuildingIndex;
use crate::names::promote_finnish_default;
use crate::popularity::{
    BUILDING_POPULARITY, STATION_POPULARITY, STREET_POPULARITY, base_popularity,
    entrance_popularity, primary_popularity,
};

static HOUSE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z]{3,}").expect("valid regex"));

/// Errors while deriving an address or building document. Only the
/// derived document is dropped.
#[derive(Debug, thiserror::Error)]
pub enum DerivationError {
    /// The source document has no centroid to copy.
    #[error("Document {id} has no centroid")]
    MissingCentroid {
        /// Canonical id of the source document.
        id: String,
    },

    /// A `;`-separated house number list contains an empty entry.
    #[error("Document {id} has an empty house number at position {index}")]
    EmptyHouseNumber {
        /// Canonical id of the source document.
        id: String,
        /// Zero-based position in the number list.
        index: usize,
    },
}

/// Returns `true` if `doc` has a non-empty house number and street.
#[must_use]
pub fn has_valid_address(doc: &Document) -> bool {
    let parts = &doc.address_parts;
    parts.number.as_deref().is_some_and(|n| !n.is_empty())
        && parts.street.as_deref().is_some_and(|s| !s.is_empty())
}

/// Returns `true` if `doc` has a name in one of `languages`, or a default
/// name when `languages` is empty.
#[must_use]
pub fn has_valid_name(doc: &Document, languages: &[String]) -> bool {
    if languages.is_empty() {
        doc.default_name().is_some_and(|n| !n.is_empty())
    } else {
        languages
            .iter()
            .any(|lang| doc.name(lang).is_some_and(|n| !n.is_empty()))
    }
}

/// Returns the house name if it contains at least three consecutive ASCII
/// letters.
#[must_use]
pub fn house_name(doc: &Document) -> Option<&str> {
    doc.address_parts
        .name
        .as_deref()
        .filter(|name| HOUSE_NAME_RE.is_match(name))
}

/// Splits mapped documents into address, building and primary records.
#[derive(Debug, Default)]
pub struct AddressSplitter {
    languages: Vec<String>,
    overrides: BTreeMap<String, u64>,
    venue_filters: Vec<DenyFilter>,
    address_filters: Vec<DenyFilter>,
    houses: BuildingIndex,
}

impl AddressSplitter {
    #[must_use]
    pub fn new(config: &ImportConfig) -> Self {
        Self {
            languages: config.languages.clone(),
            overrides: config.popularity_overrides.clone(),
            venue_filters: config.venue_filters.clone(),
            address_filters: config.address_filters.clone(),
            houses: BuildingIndex::default(),
        }
    }

    /// Splits `doc` into zero or more output documents.
    pub fn split(&mut self, mut doc: Document) -> Vec<Document> {
        let is_named = has_valid_name(&doc, &self.languages);
        let mut out = Vec::new();
        let mut address_names = HashSet::new();

        if has_valid_address(&doc) && passes_filter(&doc.tags, &self.address_filters) {
            let address_popularity = entrance_popularity(&doc.tags)
                .unwrap_or_else(|| base_popularity(&doc, &self.overrides));
            for (index, number) in house_numbers(&doc).into_iter().enumerate() {
                match self.address_record(&doc, index, &number, address_popularity) {
                    Ok(record) => {
                        address_names.extend(record.default_name().map(String::from));
                        out.push(record);
                    }
                    Err(e) => log_derivation_error(&e, &doc),
                }
            }
        }

        if let Some(house) = house_name(&doc)
            && doc.default_name() != Some(house)
        {
            match self.building_record(&doc, house) {
                Ok(Some(record)) => out.push(record),
                Ok(None) => log::trace!("Skipping duplicate building {house} of {}", doc.id),
                Err(e) => log_derivation_error(&e, &doc),
            }
        }

        let name_consumed = doc
            .default_name()
            .is_some_and(|name| address_names.contains(name));
        if is_named && !name_consumed && passes_filter(&doc.tags, &self.venue_filters) {
            let computed = primary_popularity(&doc, &self.overrides);
            let popularity = if features::station_expression().matches(&doc.tags) {
                doc.layer = Layer::Station;
                if doc.tag("usage") == Some("tourism") {
                    computed
                } else {
                    STATION_POPULARITY
                }
            } else if features::street_expression().matches(&doc.tags) {
                doc.layer = Layer::Street;
                STREET_POPULARITY
            } else {
                computed
            };
            doc.popularity = Some(popularity);
            out.push(doc);
        }

        out
    }

    fn accepts(&self, lang: &str) -> bool {
        self.languages.is_empty() || self.languages.iter().any(|l| l == lang)
    }

    fn address_record(
        &self,
        doc: &Document,
        index: usize,
        number: &str,
        popularity: u64,
    ) -> Result<Document, DerivationError> {
        if number.trim().is_empty() {
            return Err(DerivationError::EmptyHouseNumber {
                id: doc.id.clone(),
                index,
            });
        }
        let centroid = doc.centroid.ok_or_else(|| DerivationError::MissingCentroid {
            id: doc.id.clone(),
        })?;
        let street = doc.address_parts.street.as_deref().unwrap_or_default();

        let id = if index == 0 {
            doc.id.clone()
        } else {
            format!("{}:{number}", doc.id)
        };
        let mut record = Document::new(SOURCE_OPENSTREETMAP, Layer::Address, id);
        record.set_name(DEFAULT_NAME, format!("{street} {number}"));
        record.centroid = Some(centroid);
        record.tags = doc.tags.clone();
        record.popularity = Some(popularity);
        copy_address(&mut record, doc);
        record.address_parts.set(AddressField::Number, number);

        for (key, value) in &doc.tags {
            if let Some(lang) = schema::street_suffix(key)
                && lang != DEFAULT_NAME
                && self.accepts(&lang)
                && value != street
            {
                record.set_name(lang, format!("{value} {number}"));
            }
        }
        promote_finnish_default(&mut record);

        Ok(record)
    }

    fn building_record(
        &mut self,
        doc: &Document,
        house: &str,
    ) -> Result<Option<Document>, DerivationError> {
        let centroid = doc.centroid.ok_or_else(|| DerivationError::MissingCentroid {
            id: doc.id.clone(),
        })?;
        if self.houses.is_duplicate(house, centroid) {
            return Ok(None);
        }

        let mut record = Document::new(SOURCE_OPENSTREETMAP, Layer::Venue, format!("{}:B", doc.id));
        record.set_name(DEFAULT_NAME, house);
        record.centroid = Some(centroid);
        record.tags = doc.tags.clone();
        record.popularity = Some(BUILDING_POPULARITY);
        copy_address(&mut record, doc);

        Ok(Some(record))
    }
}

/// House number variants with the unit appended, e.g. `12 A`.
fn house_numbers(doc: &Document) -> Vec<String> {
    let unit = doc
        .tag("addr:unit")
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(|u| format!(" {}", u.to_uppercase()));

    doc.address_parts
        .number
        .as_deref()
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .map(|number| match (&unit, number.is_empty()) {
            (Some(unit), false) => format!("{number}{unit}"),
            _ => number.to_string(),
        })
        .collect()
}

/// Copies the house name, street and zip; the zip also becomes the postal
/// code parent.
fn copy_address(record: &mut Document, doc: &Document) {
    for field in [AddressField::Name, AddressField::Street, AddressField::Zip] {
        if let Some(value) = doc.address_parts.get(field).filter(|v| !v.is_empty()) {
            record.address_parts.set(field, value);
            if field == AddressField::Zip {
                record.parents.postalcode = Some(value.to_string());
            }
        }
    }
}

fn log_derivation_error(e: &DerivationError, doc: &Document) {
    log::error!("Address derivation error: {e}");
    match serde_json::to_string_pretty(doc) {
        Ok(json) => log::error!("{json}"),
        Err(e) => log::error!("Failed to serialize document {}: {e}", doc.id),
    }
}
