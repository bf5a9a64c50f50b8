//! Import configuration.
//!
//! Loaded from a TOML file, or from the defaults embedded at compile time
//! from `config/default.toml`. The core pipeline treats every value as
//! opaque, read-only data.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use osm_import_tags::DenyFilter;
use serde::Deserialize;

const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path of the config file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`ImportConfig`].
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Top-level import configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportConfig {
    /// Supported languages in default-name preference order. Empty means
    /// no restriction.
    #[serde(default)]
    pub languages: Vec<String>,

    /// Popularity overrides keyed by canonical id (`node:123`).
    #[serde(default)]
    pub popularity_overrides: BTreeMap<String, u64>,

    /// Extra deny-filters for the venue layer.
    #[serde(default)]
    pub venue_filters: Vec<DenyFilter>,

    /// Extra deny-filters for the address layer.
    #[serde(default)]
    pub address_filters: Vec<DenyFilter>,

    /// Canonical ids that are never imported.
    #[serde(default)]
    pub blacklist: BTreeSet<String>,

    /// Admin hierarchy enrichment settings.
    #[serde(default)]
    pub hierarchy: Option<HierarchyConfig>,

    /// Warm-start station dedup settings.
    #[serde(default)]
    pub station_seed: Option<StationSeedConfig>,
}

/// Admin hierarchy backends.
#[derive(Debug, Clone, Deserialize)]
pub struct HierarchyConfig {
    /// Pelias-compatible reverse endpoint used as the primary backend.
    #[serde(default)]
    pub primary_url: Option<String>,

    /// Admin boundary `GeoJSON` used as the primary backend when no
    /// `primary_url` is set.
    #[serde(default)]
    pub boundaries_path: Option<PathBuf>,

    /// Pelias-compatible reverse endpoint used as the fallback backend.
    #[serde(default)]
    pub fallback_url: Option<String>,

    /// Language passed to the primary backend.
    #[serde(default)]
    pub language: Option<String>,

    /// Per-lookup timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Existing index scanned for stations before the import starts.
#[derive(Debug, Clone, Deserialize)]
pub struct StationSeedConfig {
    /// Elasticsearch base URL.
    pub url: String,

    /// Index name.
    #[serde(default = "default_index")]
    pub index: String,
}

const fn default_timeout_ms() -> u64 {
    10_000
}

fn default_index() -> String {
    "pelias".to_string()
}

impl ImportConfig {
    /// Parses a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the text is not a valid config.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::de::from_str(text)?)
    }

    /// Loads a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded import config from {}", path.display());
        Ok(config)
    }

    /// Returns the embedded default configuration.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed. The file is a
    /// compile-time constant, so this is caught by the tests.
    #[must_use]
    pub fn embedded_default() -> Self {
        Self::from_toml_str(DEFAULT_CONFIG_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded default config: {e}"))
    }

    /// The language whitelist, or `None` when unrestricted.
    #[must_use]
    pub fn supported_languages(&self) -> Option<&[String]> {
        (!self.languages.is_empty()).then_some(self.languages.as_slice())
    }
}
