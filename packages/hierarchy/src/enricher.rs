//! Fills missing admin fields on documents.
//!
//! The enricher awaits each lookup before returning, so a pipeline that
//! drives it sequentially never has more than one lookup in flight.
//! Lookup failures are logged and the document passes through unchanged;
//! nothing is retried.

use std::time::Duration;

use osm_import_document_models::{AdminFields, Centroid, Document};

use crate::{FallbackHierarchyBackend, HierarchyBackend, HierarchyError, HierarchyResult};

/// Default per-lookup timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Enrichment stage backed by a primary and an optional fallback backend.
pub struct HierarchyEnricher {
    primary: Box<dyn HierarchyBackend>,
    fallback: Option<Box<dyn FallbackHierarchyBackend>>,
    language: Option<String>,
    timeout: Duration,
}

impl HierarchyEnricher {
    /// Creates an enricher with the [`DEFAULT_TIMEOUT`] and no fallback.
    #[must_use]
    pub fn new(primary: Box<dyn HierarchyBackend>) -> Self {
        Self {
            primary,
            fallback: None,
            language: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the backend used when the primary leaves fields unset.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Box<dyn FallbackHierarchyBackend>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Sets the language passed to the primary backend.
    #[must_use]
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    /// Sets the per-lookup timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enriches `doc` in place.
    pub async fn enrich(&self, doc: &mut Document) {
        if doc.default_name().is_none_or(str::is_empty) {
            return;
        }
        if doc.admin.is_complete() {
            return;
        }
        let Some(point) = doc.centroid else {
            log::debug!("Skipping hierarchy lookup for {}: no centroid", doc.gid());
            return;
        };

        let result = match self.lookup_primary(point).await {
            Ok(Some(result)) if !result.is_empty() => result,
            Ok(_) => {
                log::warn!("Hierarchy lookup returned 0 results for {}", doc.gid());
                return;
            }
            Err(e) => {
                log::error!("Hierarchy lookup error for {}: {e}", doc.gid());
                return;
            }
        };

        apply_primary(&mut doc.admin, &result);

        if doc.admin.is_complete() {
            return;
        }
        let Some(fallback) = &self.fallback else {
            return;
        };

        match self.with_deadline(fallback.find_hierarchy(point, None)).await {
            Ok(matches) => {
                if let Some(best) = matches.first() {
                    apply_fallback(&mut doc.admin, best);
                }
            }
            Err(e) => log::error!("Fallback hierarchy lookup error for {}: {e}", doc.gid()),
        }
    }

    async fn lookup_primary(
        &self,
        point: Centroid,
    ) -> Result<Option<HierarchyResult>, HierarchyError> {
        self.with_deadline(self.primary.lookup(point, self.language.as_deref()))
            .await
    }

    async fn with_deadline<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, HierarchyError>>,
    ) -> Result<T, HierarchyError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(HierarchyError::Timeout {
                    millis: self.timeout.as_millis(),
                })
            })
    }
}

fn apply_primary(admin: &mut AdminFields, result: &HierarchyResult) {
    if let Some(admin0) = &result.admin0 {
        admin.admin0 = Some(admin0.clone());
    }
    if let Some(admin1) = &result.admin1 {
        admin.admin1 = Some(admin1.clone());
    }
    if let Some(area) = result.most_specific_area() {
        admin.admin2 = Some(area.to_string());
    }
}

fn apply_fallback(admin: &mut AdminFields, best: &AdminFields) {
    if admin.admin0.is_none() {
        admin.admin0.clone_from(&best.admin0);
    }
    if admin.admin1.is_none() {
        admin.admin1.clone_from(&best.admin1);
    }
    if admin.admin2.is_none() {
        admin.admin2.clone_from(&best.admin2);
    }
}
