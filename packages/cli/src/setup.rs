//! Builds pipeline collaborators from the import config.

use std::path::Path;
use std::time::Duration;

use osm_import::config::{HierarchyConfig, StationSeedConfig};
use osm_import::stations::{ElasticsearchScanner, StationSeed, load_station_seed};
use osm_import::{ConfigError, ImportConfig};
use osm_import_hierarchy::pelias::PeliasHierarchy;
use osm_import_hierarchy::spatial::SpatialHierarchy;
use osm_import_hierarchy::{HierarchyBackend, HierarchyEnricher};

/// Loads `path`, or the embedded defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<ImportConfig, ConfigError> {
    match path {
        Some(path) => ImportConfig::load(path),
        None => {
            log::info!("No --config given, using built-in defaults");
            Ok(ImportConfig::embedded_default())
        }
    }
}

/// Scans the existing index for stations.
pub async fn station_seed(
    client: &reqwest::Client,
    config: &StationSeedConfig,
) -> Result<StationSeed, Box<dyn std::error::Error>> {
    let mut scanner = ElasticsearchScanner::new(client.clone(), &config.url, &config.index);
    Ok(load_station_seed(&mut scanner).await?)
}

/// Builds the enricher, or `None` when no primary backend is configured.
pub fn enricher(
    client: &reqwest::Client,
    config: &HierarchyConfig,
) -> Result<Option<HierarchyEnricher>, Box<dyn std::error::Error>> {
    let primary: Box<dyn HierarchyBackend> = if let Some(url) = &config.primary_url {
        log::info!("Hierarchy lookups via {url}");
        Box::new(PeliasHierarchy::new(client.clone(), url))
    } else if let Some(path) = &config.boundaries_path {
        let text = std::fs::read_to_string(path)?;
        let index = SpatialHierarchy::from_geojson(&text)?;
        log::info!(
            "Hierarchy lookups via {} boundaries from {}",
            index.len(),
            path.display()
        );
        Box::new(index)
    } else {
        log::warn!("[hierarchy] has neither primary_url nor boundaries_path, enrichment disabled");
        return Ok(None);
    };

    let mut enricher = HierarchyEnricher::new(primary)
        .with_language(config.language.clone())
        .with_timeout(Duration::from_millis(config.timeout_ms));
    if let Some(url) = &config.fallback_url {
        log::info!("Fallback hierarchy lookups via {url}");
        enricher = enricher.with_fallback(Box::new(PeliasHierarchy::new(client.clone(), url)));
    }

    Ok(Some(enricher))
}
