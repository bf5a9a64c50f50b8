//! Warm-start station seed.
//!
//! Before an import starts, every station already present in the target
//! index is read into memory so that stations imported earlier from
//! another source are not emitted a second time. The scan pages through
//! the index with the Elasticsearch scroll API until a page comes back
//! empty.

use std::collections::BTreeMap;

use async_trait::async_trait;
use osm_import_document_models::Centroid;
use serde_json::Value;

use crate::dedupe::distance_meters;

/// Scroll keep-alive passed on every page request.
pub const SCROLL_KEEP_ALIVE: &str = "30s";

/// Hits requested per page.
pub const PAGE_SIZE: u32 = 10_000;

/// Errors from the warm-start scan. These abort the run before the
/// pipeline starts.
#[derive(Debug, thiserror::Error)]
pub enum StationSeedError {
    /// Transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The index answered with a non-success status.
    #[error("Index returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The response did not have the expected shape.
    #[error("Unexpected scroll response: {message}")]
    Parse {
        /// What was missing.
        message: String,
    },
}

/// An existing station in the target index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeededStation {
    /// Popularity stored in the index, if any.
    pub popularity: Option<u64>,
    /// Station location.
    pub point: Centroid,
}

/// Existing stations keyed by `name + postalcode + "station"`.
#[derive(Debug, Clone, Default)]
pub struct StationSeed {
    stations: BTreeMap<String, Vec<SeededStation>>,
    count: usize,
}

impl StationSeed {
    /// Builds the lookup key of a station.
    #[must_use]
    pub fn key(name: &str, postalcode: &str) -> String {
        format!("{name}{postalcode}station")
    }

    /// Records a station.
    pub fn insert(&mut self, name: &str, postalcode: &str, station: SeededStation) {
        self.stations
            .entry(Self::key(name, postalcode))
            .or_default()
            .push(station);
        self.count += 1;
    }

    /// Records the station described by a search hit.
    ///
    /// Hits without `name.default`, `parent.postalcode` or a valid
    /// `center_point` are ignored. Returns `true` if the hit was recorded.
    pub fn add_hit(&mut self, hit: &Value) -> bool {
        let Some(source) = hit.get("_source") else {
            return false;
        };
        let name = source
            .pointer("/name/default")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());
        let postal = source.pointer("/parent/postalcode").and_then(postal_text);
        let point = source.get("center_point").and_then(|p| {
            Some(Centroid::new(p.get("lat")?.as_f64()?, p.get("lon")?.as_f64()?))
        });

        let (Some(name), Some(postal), Some(point)) = (name, postal, point) else {
            return false;
        };
        let popularity = source.get("popularity").and_then(Value::as_u64);
        self.insert(name, &postal, SeededStation { popularity, point });
        true
    }

    /// Returns `true` if a station stored under `key` lies within
    /// `radius_meters` of `point`.
    #[must_use]
    pub fn has_nearby(&self, key: &str, point: Centroid, radius_meters: f64) -> bool {
        self.stations.get(key).is_some_and(|stations| {
            stations
                .iter()
                .any(|s| distance_meters(s.point, point) < radius_meters)
        })
    }

    /// Number of recorded stations.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if no station is recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Postal codes are stored either as a string or as an array of strings;
/// arrays are joined with `,`.
fn postal_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(","),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// A paginated source of station hits.
#[async_trait]
pub trait StationScanner: Send {
    /// Fetches the next page of hits. An empty page ends the scan.
    ///
    /// # Errors
    ///
    /// Returns [`StationSeedError`] if the page cannot be fetched.
    async fn next_page(&mut self) -> Result<Vec<Value>, StationSeedError>;
}

/// Scroll-API scanner over the `station` layer of an Elasticsearch index.
#[derive(Debug, Clone)]
pub struct ElasticsearchScanner {
    client: reqwest::Client,
    base_url: String,
    index: String,
    scroll_id: Option<String>,
}

impl ElasticsearchScanner {
    /// Creates a scanner for `index` at `base_url` (e.g.
    /// `http://localhost:9200`).
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        index: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            index: index.into(),
            scroll_id: None,
        }
    }

    fn initial_body() -> Value {
        serde_json::json!({
            "size": PAGE_SIZE,
            "query": {
                "term": {
                    "layer": { "value": "station", "boost": 1.0 }
                }
            }
        })
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<Value, StationSeedError> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StationSeedError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }

    /// Releases the scroll context. Failures are only logged since the
    /// context expires after [`SCROLL_KEEP_ALIVE`] anyway.
    async fn clear_scroll(&self, scroll_id: &str) {
        let result = self
            .client
            .delete(format!("{}/_search/scroll", self.base_url))
            .json(&serde_json::json!({ "scroll_id": scroll_id }))
            .send()
            .await;
        match result {
            Ok(resp) if !resp.status().is_success() => {
                log::warn!("Clearing station scroll returned {}", resp.status());
            }
            Ok(_) => {}
            Err(e) => log::warn!("Failed to clear station scroll: {e}"),
        }
    }
}

#[async_trait]
impl StationScanner for ElasticsearchScanner {
    async fn next_page(&mut self) -> Result<Vec<Value>, StationSeedError> {
        let req = match &self.scroll_id {
            None => self
                .client
                .post(format!("{}/{}/_search", self.base_url, self.index))
                .query(&[("scroll", SCROLL_KEEP_ALIVE)])
                .json(&Self::initial_body()),
            Some(scroll_id) => self
                .client
                .post(format!("{}/_search/scroll", self.base_url))
                .json(&serde_json::json!({
                    "scroll": SCROLL_KEEP_ALIVE,
                    "scroll_id": scroll_id,
                })),
        };

        let body = self.send(req).await?;
        let (scroll_id, hits) = parse_scroll_page(body)?;
        if hits.is_empty() {
            if let Some(scroll_id) = scroll_id.or_else(|| self.scroll_id.take()) {
                self.clear_scroll(&scroll_id).await;
            }
            self.scroll_id = None;
        } else {
            self.scroll_id = scroll_id;
        }
        Ok(hits)
    }
}

/// Splits a search/scroll response into its scroll id and hits. A page
/// with hits must carry a scroll id to continue from.
fn parse_scroll_page(mut body: Value) -> Result<(Option<String>, Vec<Value>), StationSeedError> {
    let scroll_id = body
        .get("_scroll_id")
        .and_then(Value::as_str)
        .map(String::from);
    let hits = match body.pointer_mut("/hits/hits").map(Value::take) {
        Some(Value::Array(hits)) => hits,
        _ => {
            return Err(StationSeedError::Parse {
                message: "missing 'hits.hits' array".to_string(),
            });
        }
    };
    if scroll_id.is_none() && !hits.is_empty() {
        return Err(StationSeedError::Parse {
            message: "page with hits has no '_scroll_id'".to_string(),
        });
    }
    Ok((scroll_id, hits))
}

/// Drains `scanner` into a [`StationSeed`].
///
/// # Errors
///
/// Returns the first [`StationSeedError`] raised by the scanner.
pub async fn load_station_seed(
    scanner: &mut dyn StationScanner,
) -> Result<StationSeed, StationSeedError> {
    log::info!("Reading existing stations for deduping");

    let mut seed = StationSeed::default();
    loop {
        let hits = scanner.next_page().await?;
        if hits.is_empty() {
            break;
        }
        let recorded = hits.iter().filter(|hit| seed.add_hit(hit)).count();
        log::debug!("Station page: {} hits, {recorded} recorded", hits.len());
    }

    log::info!("Extracted {} existing stations for deduping", seed.len());
    Ok(seed)
}
