#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoder document and raw OSM entity types.
//!
//! This crate contains only data types and simple accessors. It has no
//! heavyweight dependencies (no regex, no I/O, no async runtime) so that
//! every other package in the workspace can share it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Source tag written on every document produced by the importer.
pub const SOURCE_OPENSTREETMAP: &str = "openstreetmap";

/// The name slot used as the primary display name.
pub const DEFAULT_NAME: &str = "default";

/// Free-form OSM tags, ordered by key for deterministic iteration.
pub type Tags = BTreeMap<String, String>;

/// Output document category.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Layer {
    /// A point of interest (the default for every constructed document).
    Venue,
    /// A single house number on a street.
    Address,
    /// A named road.
    Street,
    /// A public transport or bus station.
    Station,
}

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl Centroid {
    /// Creates a coordinate.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Returns `true` when both components are finite and in range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Axis-aligned bounding box of a way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    /// Corner built from the entity's `BBoxMin`.
    pub upper_left: Centroid,
    /// Corner built from the entity's `BBoxMax`.
    pub lower_right: Centroid,
}

/// Address component a schema key maps to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AddressField {
    /// House name (`addr:housename`).
    Name,
    /// House number, possibly `;`-separated.
    Number,
    /// Street name.
    Street,
    /// Postal code.
    Zip,
    /// Unit / staircase designator.
    Unit,
}

/// Structured address of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressParts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl AddressParts {
    /// Returns the value stored for `field`.
    #[must_use]
    pub fn get(&self, field: AddressField) -> Option<&str> {
        match field {
            AddressField::Name => self.name.as_deref(),
            AddressField::Number => self.number.as_deref(),
            AddressField::Street => self.street.as_deref(),
            AddressField::Zip => self.zip.as_deref(),
            AddressField::Unit => self.unit.as_deref(),
        }
    }

    /// Overwrites the value stored for `field`.
    pub fn set(&mut self, field: AddressField, value: impl Into<String>) {
        let slot = match field {
            AddressField::Name => &mut self.name,
            AddressField::Number => &mut self.number,
            AddressField::Street => &mut self.street,
            AddressField::Zip => &mut self.zip,
            AddressField::Unit => &mut self.unit,
        };
        *slot = Some(value.into());
    }
}

/// Parent relations of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parents {
    /// Postal code the document belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postalcode: Option<String>,
}

/// Administrative areas attached by hierarchy enrichment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminFields {
    /// Country.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin0: Option<String>,
    /// Region / state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin1: Option<String>,
    /// Locality-level area.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin2: Option<String>,
}

impl AdminFields {
    /// Returns `true` when all three levels are populated.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.admin0.is_some() && self.admin1.is_some() && self.admin2.is_some()
    }

    /// Returns `true` when no level is populated.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.admin0.is_none() && self.admin1.is_none() && self.admin2.is_none()
    }
}

/// A geocoder index document.
///
/// Created once per raw entity by the document builder and then passed by
/// value through every pipeline stage. Derived address and building
/// documents are independent clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub source: String,
    pub layer: Layer,
    pub id: String,
    #[serde(default)]
    pub names: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub name_aliases: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centroid: Option<Centroid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default)]
    pub address_parts: AddressParts,
    #[serde(default)]
    pub parents: Parents,
    #[serde(default, skip_serializing_if = "AdminFields::is_empty")]
    pub admin: AdminFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<u64>,
    #[serde(default)]
    pub tags: Tags,
}

impl Document {
    /// Creates an empty document shell.
    #[must_use]
    pub fn new(source: impl Into<String>, layer: Layer, id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            layer,
            id: id.into(),
            names: BTreeMap::new(),
            name_aliases: BTreeMap::new(),
            centroid: None,
            bounding_box: None,
            address_parts: AddressParts::default(),
            parents: Parents::default(),
            admin: AdminFields::default(),
            popularity: None,
            tags: Tags::new(),
        }
    }

    /// Global id in the form `source:layer:id`.
    #[must_use]
    pub fn gid(&self) -> String {
        format!("{}:{}:{}", self.source, self.layer, self.id)
    }

    /// Returns the name stored in the `lang` slot.
    #[must_use]
    pub fn name(&self, lang: &str) -> Option<&str> {
        self.names.get(lang).map(String::as_str)
    }

    /// Returns the default display name.
    #[must_use]
    pub fn default_name(&self) -> Option<&str> {
        self.name(DEFAULT_NAME)
    }

    /// Sets the name in the `lang` slot.
    pub fn set_name(&mut self, lang: impl Into<String>, name: impl Into<String>) {
        self.names.insert(lang.into(), name.into());
    }

    /// Appends an alias to the `lang` slot, ignoring exact repeats.
    pub fn add_name_alias(&mut self, lang: &str, alias: impl Into<String>) {
        let alias = alias.into();
        let aliases = self.name_aliases.entry(lang.to_string()).or_default();
        if !aliases.contains(&alias) {
            aliases.push(alias);
        }
    }

    /// Returns the aliases of the `lang` slot.
    #[must_use]
    pub fn aliases(&self, lang: &str) -> &[String] {
        self.name_aliases
            .get(lang)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns a tag value.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// Identifier of a raw entity; upstream parsers emit either numbers or
/// strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Corner of a precomputed way bounding box (`{Lat, Lon}`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBoxCorner {
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Lon")]
    pub lon: f64,
}

/// Precomputed way centroid. Either component may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawCentroid {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

/// A tagged node or way as delivered by the upstream map-data parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEntity {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub centroid: Option<RawCentroid>,
    #[serde(default, rename = "BBoxMin")]
    pub bbox_min: Option<BBoxCorner>,
    #[serde(default, rename = "BBoxMax")]
    pub bbox_max: Option<BBoxCorner>,
    #[serde(default)]
    pub tags: Tags,
}

impl RawEntity {
    /// Creates a node entity at a point.
    #[must_use]
    pub fn node(id: i64, lat: f64, lon: f64, tags: Tags) -> Self {
        Self {
            id: Some(EntityId::Number(id)),
            kind: Some("node".to_string()),
            lat: Some(lat),
            lon: Some(lon),
            tags,
            ..Self::default()
        }
    }
}
