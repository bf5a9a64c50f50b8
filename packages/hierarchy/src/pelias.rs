//! Pelias-compatible reverse geocoding backend.
//!
//! Issues `GET {base_url}/v1/reverse?point.lat=..&point.lon=..` and reads
//! the admin properties of the returned `GeoJSON` features:
//!
//! | Pelias property | Hierarchy field |
//! |-----------------|-----------------|
//! | `country`       | `admin0`        |
//! | `region`        | `admin1`        |
//! | `county`        | `admin2`        |
//! | `locality`      | `locality`      |
//! | `neighbourhood` | `neighborhood`  |
//! | `localadmin`    | `local_admin`   |
//!
//! See <https://github.com/pelias/documentation/blob/master/reverse.md>

use async_trait::async_trait;
use osm_import_document_models::{AdminFields, Centroid};

use crate::{FallbackHierarchyBackend, HierarchyBackend, HierarchyError, HierarchyResult};

/// Number of candidates requested for fallback lookups.
const FALLBACK_SIZE: &str = "5";

/// Reverse-geocoding client for a Pelias instance.
#[derive(Debug, Clone)]
pub struct PeliasHierarchy {
    client: reqwest::Client,
    base_url: String,
}

impl PeliasHierarchy {
    /// Creates a client for `base_url` (e.g. `http://localhost:4000`).
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn reverse(
        &self,
        point: Centroid,
        language: Option<&str>,
        size: &str,
    ) -> Result<serde_json::Value, HierarchyError> {
        let url = format!("{}/v1/reverse", self.base_url);
        let lat = point.lat.to_string();
        let lon = point.lon.to_string();

        let mut req = self.client.get(&url).query(&[
            ("point.lat", lat.as_str()),
            ("point.lon", lon.as_str()),
            ("size", size),
        ]);
        if let Some(lang) = language {
            req = req.query(&[("lang", lang)]);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(HierarchyError::Parse {
                message: format!("Pelias returned status {}", resp.status()),
            });
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl HierarchyBackend for PeliasHierarchy {
    async fn lookup(
        &self,
        point: Centroid,
        language: Option<&str>,
    ) -> Result<Option<HierarchyResult>, HierarchyError> {
        let body = self.reverse(point, language, "1").await?;
        Ok(parse_features(&body)?.into_iter().next())
    }
}

#[async_trait]
impl FallbackHierarchyBackend for PeliasHierarchy {
    async fn find_hierarchy(
        &self,
        point: Centroid,
        language: Option<&str>,
    ) -> Result<Vec<AdminFields>, HierarchyError> {
        let body = self.reverse(point, language, FALLBACK_SIZE).await?;
        Ok(parse_features(&body)?
            .into_iter()
            .map(|r| AdminFields {
                admin0: r.admin0,
                admin1: r.admin1,
                admin2: r.admin2,
            })
            .collect())
    }
}

/// Parses a Pelias `GeoJSON` `FeatureCollection` into hierarchy results.
fn parse_features(body: &serde_json::Value) -> Result<Vec<HierarchyResult>, HierarchyError> {
    let features = body
        .get("features")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| HierarchyError::Parse {
            message: "Pelias response missing 'features' array".to_string(),
        })?;

    Ok(features
        .iter()
        .filter_map(|f| f.get("properties"))
        .map(|props| {
            let field = |key: &str| {
                props
                    .get(key)
                    .and_then(serde_json::Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
            };
            HierarchyResult {
                admin0: field("country"),
                admin1: field("region"),
                admin2: field("county"),
                locality: field("locality"),
                neighborhood: field("neighbourhood"),
                local_admin: field("localadmin"),
            }
        })
        .filter(|r| !r.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reverse_feature() {
        let body = serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [24.94, 60.17] },
                "properties": {
                    "country": "Finland",
                    "region": "Uusimaa",
                    "county": "Helsinki",
                    "localadmin": "Helsinki",
                    "locality": "Helsinki",
                    "neighbourhood": "Kluuvi"
                }
            }]
        });
        let results = parse_features(&body).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].admin0.as_deref(), Some("Finland"));
        assert_eq!(results[0].admin1.as_deref(), Some("Uusimaa"));
        assert_eq!(results[0].neighborhood.as_deref(), Some("Kluuvi"));
        assert_eq!(results[0].most_specific_area(), Some("Kluuvi"));
    }

    #[test]
    fn parses_empty_collection() {
        let body = serde_json::json!({ "type": "FeatureCollection", "features": [] });
        assert!(parse_features(&body).unwrap().is_empty());
    }

    #[test]
    fn skips_features_without_admin_properties() {
        let body = serde_json::json!({
            "features": [
                { "properties": { "name": "Somewhere", "country": "" } },
                { "properties": { "country": "Sweden" } }
            ]
        });
        let results = parse_features(&body).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].admin0.as_deref(), Some("Sweden"));
    }

    #[test]
    fn rejects_missing_features() {
        let body = serde_json::json!({ "error": "nope" });
        assert!(matches!(parse_features(&body), Err(HierarchyError::Parse { .. })));
    }

    #[test]
    fn trims_trailing_slash() {
        let backend = PeliasHierarchy::new(reqwest::Client::new(), "http://localhost:4000/");
        assert_eq!(backend.base_url, "http://localhost:4000");
    }
}
