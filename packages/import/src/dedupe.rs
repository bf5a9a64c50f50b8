//! Proximity and key based deduplication.

use std::collections::{BTreeMap, HashMap};

use geo::{Distance, Haversine, Point};
use osm_import_document_models::{Centroid, Document, Layer};

use crate::stations::StationSeed;

/// Points closer than this to an earlier point are duplicates.
pub const DUPLICATE_RADIUS_METERS: f64 = 1000.0;

/// Great-circle distance between two coordinates.
#[must_use]
pub fn distance_meters(a: Centroid, b: Centroid) -> f64 {
    Haversine.distance(Point::new(a.lon, a.lat), Point::new(b.lon, b.lat))
}

/// Centroids of every building emitted so far, per house name.
#[derive(Debug, Default)]
pub struct BuildingIndex {
    houses: BTreeMap<String, Vec<Centroid>>,
}

impl BuildingIndex {
    /// Returns `true` if a building with `name` was already emitted within
    /// [`DUPLICATE_RADIUS_METERS`] of `point`. Otherwise records the point
    /// and returns `false`.
    pub fn is_duplicate(&mut self, name: &str, point: Centroid) -> bool {
        let points = self.houses.entry(name.to_string()).or_default();
        if points
            .iter()
            .any(|p| distance_meters(*p, point) < DUPLICATE_RADIUS_METERS)
        {
            return true;
        }
        points.push(point);
        false
    }
}

/// Keeps the most popular address per `(street, number, postalcode)`.
///
/// Records that were already forwarded are never retracted, so a less
/// popular duplicate may still reach the sink if it arrived first.
#[derive(Debug, Default)]
pub struct AddressDeduplicator {
    best: HashMap<(String, String, String), u64>,
    dropped: u64,
}

impl AddressDeduplicator {
    /// Returns `true` if `doc` should be forwarded.
    pub fn accept(&mut self, doc: &Document) -> bool {
        if doc.layer != Layer::Address {
            return true;
        }
        let Some(postal) = &doc.parents.postalcode else {
            return true;
        };

        let key = (
            doc.address_parts.street.clone().unwrap_or_default(),
            doc.address_parts.number.clone().unwrap_or_default(),
            postal.clone(),
        );
        let popularity = doc.popularity.unwrap_or_default();

        match self.best.get(&key) {
            Some(&stored) if popularity <= stored => {
                log::trace!("Dropping duplicate address {}", doc.gid());
                self.dropped += 1;
                false
            }
            _ => {
                self.best.insert(key, popularity);
                true
            }
        }
    }

    /// Number of dropped records.
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Logs the drop count.
    pub fn finish(&self) {
        log::info!("Deduped addresses: {}", self.dropped);
    }
}

/// Drops stations that already exist in the target index.
///
/// The postal code comes from the postal code parent, or from the zip
/// when no parent is set.
#[derive(Debug, Default)]
pub struct StationDeduplicator {
    seed: StationSeed,
    dropped: u64,
}

impl StationDeduplicator {
    #[must_use]
    pub const fn new(seed: StationSeed) -> Self {
        Self { seed, dropped: 0 }
    }

    /// Returns `true` if `doc` should be forwarded.
    pub fn accept(&mut self, doc: &Document) -> bool {
        if doc.layer != Layer::Station || self.seed.is_empty() {
            return true;
        }
        let postal = doc
            .parents
            .postalcode
            .as_deref()
            .or(doc.address_parts.zip.as_deref());
        let (Some(name), Some(postal), Some(point)) = (doc.default_name(), postal, doc.centroid)
        else {
            return true;
        };

        let key = StationSeed::key(name, postal);
        if self.seed.has_nearby(&key, point, DUPLICATE_RADIUS_METERS) {
            log::debug!("Station {} already indexed", doc.gid());
            self.dropped += 1;
            return false;
        }
        true
    }

    /// Number of dropped records.
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Logs the drop count.
    pub fn finish(&self) {
        log::info!("Deduped stations: {}", self.dropped);
    }
}
