#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! OSM entity to geocoder document import.
//!
//! Turns raw tagged nodes and ways into normalized, deduplicated,
//! popularity-ranked documents:
//!
//! 1. [`builder`] builds a venue document shell per entity
//! 2. [`names`] maps tags to names, aliases and address fields
//! 3. [`splitter`] derives address and building documents and
//!    reclassifies the entity as station, street or venue
//! 4. [`dedupe`] drops duplicate addresses and already indexed stations
//! 5. [`osm_import_hierarchy::HierarchyEnricher`] fills admin areas
//!
//! [`pipeline::Pipeline`] wires the stages together; [`reader`] and
//! [`sink`] provide NDJSON and PBF I/O.

pub mod builder;
pub mod config;
pub mod dedupe;
pub mod names;
pub mod pipeline;
pub mod popularity;
pub mod progress;
pub mod reader;
pub mod sink;
pub mod splitter;
pub mod stations;

pub use config::{ConfigError, ImportConfig};
pub use pipeline::{Pipeline, PipelineError, PipelineStats};
