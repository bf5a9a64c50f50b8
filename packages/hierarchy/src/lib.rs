#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Administrative hierarchy enrichment.
//!
//! Documents that lack country/region/locality information are looked up
//! against a primary backend, with a fallback backend filling whatever the
//! primary could not resolve:
//!
//! 1. [`HierarchyBackend`] returns a single, detailed hierarchy for a
//!    point (admin levels plus locality, neighborhood and local admin).
//! 2. [`FallbackHierarchyBackend`] returns a ranked list of plain
//!    admin0/1/2 matches.
//!
//! Two implementations are provided: [`pelias::PeliasHierarchy`] talks to a
//! Pelias-compatible `/v1/reverse` endpoint, and
//! [`spatial::SpatialHierarchy`] answers from in-memory admin polygons.

pub mod enricher;
pub mod pelias;
pub mod spatial;

use async_trait::async_trait;
use osm_import_document_models::{AdminFields, Centroid};

pub use enricher::HierarchyEnricher;

/// Errors from hierarchy backends.
#[derive(Debug, thiserror::Error)]
pub enum HierarchyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// The lookup did not finish within the configured timeout.
    #[error("Hierarchy lookup timed out after {millis} ms")]
    Timeout {
        /// Configured timeout.
        millis: u128,
    },
}

/// Detailed hierarchy returned by a primary backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyResult {
    pub admin0: Option<String>,
    pub admin1: Option<String>,
    pub admin2: Option<String>,
    pub locality: Option<String>,
    pub neighborhood: Option<String>,
    pub local_admin: Option<String>,
}

impl HierarchyResult {
    /// Returns `true` when no field is populated.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.admin0.is_none()
            && self.admin1.is_none()
            && self.admin2.is_none()
            && self.locality.is_none()
            && self.neighborhood.is_none()
            && self.local_admin.is_none()
    }

    /// The most specific area name, used as a document's `admin2`.
    ///
    /// Priority: neighborhood, locality, local admin, admin2.
    #[must_use]
    pub fn most_specific_area(&self) -> Option<&str> {
        self.neighborhood
            .as_deref()
            .or(self.locality.as_deref())
            .or(self.local_admin.as_deref())
            .or(self.admin2.as_deref())
    }
}

/// Primary hierarchy lookup.
#[async_trait]
pub trait HierarchyBackend: Send + Sync {
    /// Looks up the hierarchy containing `point`.
    ///
    /// Returns `Ok(None)` when nothing contains the point.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError`] if the backend cannot be queried.
    async fn lookup(
        &self,
        point: Centroid,
        language: Option<&str>,
    ) -> Result<Option<HierarchyResult>, HierarchyError>;
}

/// Fallback hierarchy lookup returning ranked admin matches.
#[async_trait]
pub trait FallbackHierarchyBackend: Send + Sync {
    /// Finds admin hierarchies around `point`, best match first.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError`] if the backend cannot be queried.
    async fn find_hierarchy(
        &self,
        point: Centroid,
        language: Option<&str>,
    ) -> Result<Vec<AdminFields>, HierarchyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_specific_area_prefers_neighborhood() {
        let result = HierarchyResult {
            admin2: Some("Uusimaa county".to_string()),
            locality: Some("Helsinki".to_string()),
            neighborhood: Some("Kallio".to_string()),
            local_admin: Some("Helsinki LAU".to_string()),
            ..HierarchyResult::default()
        };
        assert_eq!(result.most_specific_area(), Some("Kallio"));
    }

    #[test]
    fn most_specific_area_falls_back_in_order() {
        let result = HierarchyResult {
            admin2: Some("County".to_string()),
            local_admin: Some("Local".to_string()),
            ..HierarchyResult::default()
        };
        assert_eq!(result.most_specific_area(), Some("Local"));

        let result = HierarchyResult {
            admin2: Some("County".to_string()),
            ..HierarchyResult::default()
        };
        assert_eq!(result.most_specific_area(), Some("County"));
        assert!(HierarchyResult::default().most_specific_area().is_none());
    }
}
