//! Raw entity to document shell.

use std::collections::BTreeSet;

use osm_import_document_models::{
    BoundingBox, Centroid, Document, Layer, RawCentroid, RawEntity, SOURCE_OPENSTREETMAP,
};

/// Malformed input records.
#[derive(Debug, thiserror::Error)]
pub enum DocumentBuildError {
    /// The record has no `id`.
    #[error("Input record has no id")]
    MissingId,

    /// The record has no `type`.
    #[error("Input record {id} has no type")]
    MissingType {
        /// Raw id of the record.
        id: String,
    },

    /// The coordinates are out of range or not finite.
    #[error("Input record {id} has invalid coordinates ({lat}, {lon})")]
    InvalidCoordinates {
        /// Canonical id of the record.
        id: String,
        /// Latitude as given.
        lat: f64,
        /// Longitude as given.
        lon: f64,
    },
}

/// Builds the initial venue document of every raw entity.
#[derive(Debug, Clone, Default)]
pub struct DocumentBuilder {
    blacklist: BTreeSet<String>,
}

impl DocumentBuilder {
    /// Creates a builder that drops the given canonical ids.
    #[must_use]
    pub const fn new(blacklist: BTreeSet<String>) -> Self {
        Self { blacklist }
    }

    /// Converts `entity` into a document.
    ///
    /// Returns `Ok(None)` for blacklisted ids.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentBuildError`] if the id or type is missing or the
    /// coordinates are invalid.
    pub fn build(&self, entity: RawEntity) -> Result<Option<Document>, DocumentBuildError> {
        let raw_id = entity.id.ok_or(DocumentBuildError::MissingId)?;
        let kind = entity
            .kind
            .filter(|k| !k.is_empty())
            .ok_or_else(|| DocumentBuildError::MissingType {
                id: raw_id.to_string(),
            })?;

        let id = format!("{kind}:{raw_id}");
        if self.blacklist.contains(&id) {
            log::trace!("Dropping blacklisted entity {id}");
            return Ok(None);
        }

        let centroid = match (entity.lat, entity.lon, entity.centroid) {
            (Some(lat), Some(lon), _) => Some(Centroid::new(lat, lon)),
            (_, _, Some(RawCentroid {
                lat: Some(lat),
                lon: Some(lon),
            })) => Some(Centroid::new(lat, lon)),
            _ => None,
        };
        if let Some(point) = centroid
            && !point.is_valid()
        {
            return Err(DocumentBuildError::InvalidCoordinates {
                id,
                lat: point.lat,
                lon: point.lon,
            });
        }

        let mut doc = Document::new(SOURCE_OPENSTREETMAP, Layer::Venue, id);
        doc.centroid = centroid;
        doc.bounding_box = entity
            .bbox_min
            .zip(entity.bbox_max)
            .map(|(min, max)| BoundingBox {
                upper_left: Centroid::new(min.lat, min.lon),
                lower_right: Centroid::new(max.lat, max.lon),
            });
        doc.tags = entity.tags;

        Ok(Some(doc))
    }
}

#[cfg(test)]
mod tests {
    use osm_import_document_models::{BBoxCorner, EntityId, Tags};

    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn builds_node_document() {
        let entity = RawEntity::node(42, 60.17, 24.94, tags(&[("name", "Ateneum")]));
        let doc = DocumentBuilder::default().build(entity).unwrap().unwrap();

        assert_eq!(doc.id, "node:42");
        assert_eq!(doc.layer, Layer::Venue);
        assert_eq!(doc.source, SOURCE_OPENSTREETMAP);
        assert_eq!(doc.centroid, Some(Centroid::new(60.17, 24.94)));
        assert!(doc.bounding_box.is_none());
        assert_eq!(doc.tag("name"), Some("Ateneum"));
        assert!(doc.names.is_empty());
    }

    #[test]
    fn builds_way_with_centroid_and_bbox() {
        let entity = RawEntity {
            id: Some(EntityId::Text("7".to_string())),
            kind: Some("way".to_string()),
            centroid: Some(RawCentroid {
                lat: Some(60.1),
                lon: Some(24.9),
            }),
            bbox_min: Some(BBoxCorner { lat: 60.0, lon: 24.8 }),
            bbox_max: Some(BBoxCorner { lat: 60.2, lon: 25.0 }),
            ..RawEntity::default()
        };
        let doc = DocumentBuilder::default().build(entity).unwrap().unwrap();

        assert_eq!(doc.id, "way:7");
        assert_eq!(doc.centroid, Some(Centroid::new(60.1, 24.9)));
        let bbox = doc.bounding_box.unwrap();
        assert_eq!(bbox.upper_left, Centroid::new(60.0, 24.8));
        assert_eq!(bbox.lower_right, Centroid::new(60.2, 25.0));
    }

    #[test]
    fn missing_id_or_type_is_malformed() {
        let builder = DocumentBuilder::default();
        let no_id = RawEntity {
            kind: Some("node".to_string()),
            ..RawEntity::default()
        };
        assert!(matches!(builder.build(no_id), Err(DocumentBuildError::MissingId)));

        let no_type = RawEntity {
            id: Some(EntityId::Number(1)),
            ..RawEntity::default()
        };
        assert!(matches!(
            builder.build(no_type),
            Err(DocumentBuildError::MissingType { .. })
        ));
    }

    #[test]
    fn invalid_coordinates_are_malformed() {
        let entity = RawEntity::node(1, 120.0, 24.0, Tags::new());
        assert!(matches!(
            DocumentBuilder::default().build(entity),
            Err(DocumentBuildError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn blacklisted_ids_are_dropped() {
        let builder = DocumentBuilder::new(["node:13".to_string()].into_iter().collect());
        let entity = RawEntity::node(13, 60.0, 24.0, Tags::new());
        assert!(builder.build(entity).unwrap().is_none());

        let other = RawEntity::node(14, 60.0, 24.0, Tags::new());
        assert!(builder.build(other).unwrap().is_some());
    }
}
