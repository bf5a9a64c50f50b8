//! In-memory admin polygon index.
//!
//! Admin boundaries are bulk-loaded into an R-tree. A lookup collects every
//! polygon containing the point and, per admin level, keeps the smallest
//! one (levels may overlap, e.g. nested neighbourhoods).

use std::collections::BTreeMap;

use async_trait::async_trait;
use geo::{Area, BoundingRect, Contains, MultiPolygon};
use geojson::GeoJson;
use osm_import_document_models::{AdminFields, Centroid};
use rstar::{AABB, RTree, RTreeObject};
use serde::Deserialize;

use crate::{FallbackHierarchyBackend, HierarchyBackend, HierarchyError, HierarchyResult};

/// Admin level of a boundary polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminLevel {
    Country,
    Region,
    County,
    LocalAdmin,
    Locality,
    Neighborhood,
}

/// A named admin polygon.
#[derive(Debug, Clone)]
pub struct AdminBoundary {
    pub level: AdminLevel,
    pub name: String,
    pub polygon: MultiPolygon<f64>,
}

/// A boundary polygon stored in the R-tree with its metadata.
struct BoundaryEntry {
    level: AdminLevel,
    name: String,
    area: f64,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Point-in-polygon hierarchy backend.
pub struct SpatialHierarchy {
    boundaries: RTree<BoundaryEntry>,
}

impl SpatialHierarchy {
    /// Builds the index from already-loaded boundaries.
    #[must_use]
    pub fn new(boundaries: Vec<AdminBoundary>) -> Self {
        let entries = boundaries
            .into_iter()
            .map(|b| BoundaryEntry {
                level: b.level,
                area: b.polygon.unsigned_area(),
                envelope: compute_envelope(&b.polygon),
                name: b.name,
                polygon: b.polygon,
            })
            .collect();

        Self {
            boundaries: RTree::bulk_load(entries),
        }
    }

    /// Builds the index from a `GeoJSON` `FeatureCollection` whose
    /// features carry `name` and `level` properties.
    ///
    /// Features with a missing name, unknown level or non-polygonal
    /// geometry are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Parse`] if the text is not a
    /// `FeatureCollection`.
    pub fn from_geojson(text: &str) -> Result<Self, HierarchyError> {
        let geojson: GeoJson = text.parse().map_err(|e| HierarchyError::Parse {
            message: format!("Invalid admin boundary GeoJSON: {e}"),
        })?;
        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(HierarchyError::Parse {
                message: "Admin boundaries must be a FeatureCollection".to_string(),
            });
        };

        let mut boundaries = Vec::with_capacity(collection.features.len());
        for feature in collection.features {
            let name = feature
                .property("name")
                .and_then(serde_json::Value::as_str)
                .map(String::from);
            let level = feature
                .property("level")
                .cloned()
                .and_then(|v| serde_json::from_value::<AdminLevel>(v).ok());
            let (Some(name), Some(level)) = (name, level) else {
                log::warn!("Skipping admin boundary without a valid name/level");
                continue;
            };
            let Some(polygon) = feature.geometry.and_then(to_multipolygon) else {
                log::warn!("Skipping admin boundary {name}: geometry is not a polygon");
                continue;
            };
            boundaries.push(AdminBoundary {
                level,
                name,
                polygon,
            });
        }

        log::info!("Loaded {} admin boundaries", boundaries.len());
        Ok(Self::new(boundaries))
    }

    /// Returns the number of indexed boundaries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boundaries.size()
    }

    /// Returns `true` if no boundaries are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boundaries.size() == 0
    }

    /// Smallest containing boundary name per admin level.
    #[must_use]
    pub fn containing(&self, point: Centroid) -> BTreeMap<AdminLevel, &str> {
        let geo_point = geo::Point::new(point.lon, point.lat);
        let query_env = AABB::from_point([point.lon, point.lat]);

        let mut best: BTreeMap<AdminLevel, &BoundaryEntry> = BTreeMap::new();
        for entry in self.boundaries.locate_in_envelope_intersecting(&query_env) {
            if !entry.polygon.contains(&geo_point) {
                continue;
            }
            match best.get(&entry.level) {
                Some(current) if current.area <= entry.area => {}
                _ => {
                    best.insert(entry.level, entry);
                }
            }
        }

        best.into_iter()
            .map(|(level, entry)| (level, entry.name.as_str()))
            .collect()
    }

    fn resolve(&self, point: Centroid) -> HierarchyResult {
        let found = self.containing(point);
        let get = |level| found.get(&level).map(|s| (*s).to_string());
        HierarchyResult {
            admin0: get(AdminLevel::Country),
            admin1: get(AdminLevel::Region),
            admin2: get(AdminLevel::County),
            locality: get(AdminLevel::Locality),
            neighborhood: get(AdminLevel::Neighborhood),
            local_admin: get(AdminLevel::LocalAdmin),
        }
    }
}

#[async_trait]
impl HierarchyBackend for SpatialHierarchy {
    async fn lookup(
        &self,
        point: Centroid,
        _language: Option<&str>,
    ) -> Result<Option<HierarchyResult>, HierarchyError> {
        let result = self.resolve(point);
        Ok((!result.is_empty()).then_some(result))
    }
}

#[async_trait]
impl FallbackHierarchyBackend for SpatialHierarchy {
    async fn find_hierarchy(
        &self,
        point: Centroid,
        _language: Option<&str>,
    ) -> Result<Vec<AdminFields>, HierarchyError> {
        let result = self.resolve(point);
        let admin = AdminFields {
            admin0: result.admin0,
            admin1: result.admin1,
            admin2: result.admin2,
        };
        Ok(if admin.is_empty() { vec![] } else { vec![admin] })
    }
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#[cfg(test)]
mod tests {
    use geo::{LineString, Polygon};

    use super::*;

    fn square(level: AdminLevel, name: &str, min: (f64, f64), max: (f64, f64)) -> AdminBoundary {
        let ring = LineString::from(vec![
            (min.0, min.1),
            (max.0, min.1),
            (max.0, max.1),
            (min.0, max.1),
            (min.0, min.1),
        ]);
        AdminBoundary {
            level,
            name: name.to_string(),
            polygon: MultiPolygon(vec![Polygon::new(ring, vec![])]),
        }
    }

    fn index() -> SpatialHierarchy {
        SpatialHierarchy::new(vec![
            square(AdminLevel::Country, "Finland", (20.0, 59.0), (32.0, 70.0)),
            square(AdminLevel::Region, "Uusimaa", (23.0, 59.5), (26.5, 61.0)),
            square(AdminLevel::Locality, "Helsinki", (24.8, 60.1), (25.3, 60.3)),
            square(
                AdminLevel::Neighborhood,
                "Big area",
                (24.9, 60.15),
                (25.0, 60.2),
            ),
            square(
                AdminLevel::Neighborhood,
                "Kluuvi",
                (24.93, 60.16),
                (24.96, 60.18),
            ),
        ])
    }

    #[tokio::test]
    async fn resolves_nested_levels_with_smallest_area() {
        let result = index()
            .lookup(Centroid::new(60.17, 24.94), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.admin0.as_deref(), Some("Finland"));
        assert_eq!(result.admin1.as_deref(), Some("Uusimaa"));
        assert_eq!(result.locality.as_deref(), Some("Helsinki"));
        assert_eq!(result.neighborhood.as_deref(), Some("Kluuvi"));
        assert!(result.admin2.is_none());
    }

    #[tokio::test]
    async fn outside_every_polygon_is_empty() {
        let hierarchy = index();
        let point = Centroid::new(0.0, 0.0);
        assert!(hierarchy.lookup(point, None).await.unwrap().is_none());
        assert!(hierarchy.find_hierarchy(point, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fallback_returns_admin_levels_only() {
        let matches = index()
            .find_hierarchy(Centroid::new(65.0, 25.0), None)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].admin0.as_deref(), Some("Finland"));
        assert!(matches[0].admin1.is_none());
    }

    #[test]
    fn loads_feature_collection() {
        let text = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "name": "Finland", "level": "country" },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[
                            [20.0, 59.0], [32.0, 59.0], [32.0, 70.0], [20.0, 70.0], [20.0, 59.0]
                        ]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": { "name": "Nowhere", "level": "planet" },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": { "name": "A point", "level": "locality" },
                    "geometry": { "type": "Point", "coordinates": [24.9, 60.1] }
                }
            ]
        })
        .to_string();

        let hierarchy = SpatialHierarchy::from_geojson(&text).unwrap();
        assert_eq!(hierarchy.len(), 1);
        let levels = hierarchy.containing(Centroid::new(61.0, 25.0));
        assert_eq!(levels.get(&AdminLevel::Country), Some(&"Finland"));
    }

    #[test]
    fn rejects_non_collections() {
        let text = r#"{"type": "Point", "coordinates": [1.0, 2.0]}"#;
        assert!(SpatialHierarchy::from_geojson(text).is_err());
    }
}
