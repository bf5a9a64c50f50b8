//! The import pipeline.
//!
//! ```text
//! raw entity -> feature filter -> builder -> name resolver -> splitter
//!            -> dedupe (address, station) -> hierarchy enricher -> sink
//! ```
//!
//! Records are processed one at a time. Every stage is owned by the
//! pipeline, so dedup state needs no locking, and the enricher finishes
//! its lookup before the next record is read.

use osm_import_document_models::{Document, RawEntity, Tags};
use osm_import_hierarchy::HierarchyEnricher;
use osm_import_tags::features;

use crate::builder::DocumentBuilder;
use crate::config::ImportConfig;
use crate::dedupe::{AddressDeduplicator, StationDeduplicator};
use crate::names::NameResolver;
use crate::progress::ProgressCallback;
use crate::reader::ReaderError;
use crate::sink::{DocumentSink, SinkError};
use crate::splitter::AddressSplitter;
use crate::stations::StationSeed;

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input stream failed.
    #[error(transparent)]
    Reader(#[from] ReaderError),

    /// The output sink failed.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Counters of a pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Input records seen, including unreadable ones.
    pub read: u64,
    /// Records without an address or venue feature.
    pub filtered: u64,
    /// Records skipped as malformed.
    pub malformed: u64,
    /// Records dropped by the blacklist.
    pub blacklisted: u64,
    /// Documents emitted.
    pub emitted: u64,
    /// Addresses dropped by the address deduplicator.
    pub deduped_addresses: u64,
    /// Stations dropped as already indexed.
    pub deduped_stations: u64,
}

/// Returns `true` if `tags` carry an address or venue feature.
#[must_use]
pub fn is_importable(tags: &Tags) -> bool {
    features::address_expression().matches(tags) || features::venue_expression().matches(tags)
}

/// A configured import pipeline.
pub struct Pipeline {
    feature_filter: bool,
    dedupe: bool,
    builder: DocumentBuilder,
    names: NameResolver,
    splitter: AddressSplitter,
    addresses: AddressDeduplicator,
    stations: StationDeduplicator,
    enricher: Option<HierarchyEnricher>,
    stats: PipelineStats,
}

impl Pipeline {
    /// Creates a pipeline with feature filtering and dedup enabled and no
    /// hierarchy enrichment.
    #[must_use]
    pub fn new(config: &ImportConfig) -> Self {
        Self {
            feature_filter: true,
            dedupe: true,
            builder: DocumentBuilder::new(config.blacklist.clone()),
            names: NameResolver::new(config.languages.clone()),
            splitter: AddressSplitter::new(config),
            addresses: AddressDeduplicator::default(),
            stations: StationDeduplicator::default(),
            enricher: None,
            stats: PipelineStats::default(),
        }
    }

    /// Drops stations already present in `seed`.
    #[must_use]
    pub fn with_station_seed(mut self, seed: StationSeed) -> Self {
        self.stations = StationDeduplicator::new(seed);
        self
    }

    /// Enables admin hierarchy enrichment.
    #[must_use]
    pub fn with_enricher(mut self, enricher: HierarchyEnricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Disables address and station dedup.
    #[must_use]
    pub const fn without_dedupe(mut self) -> Self {
        self.dedupe = false;
        self
    }

    /// Imports every well-formed entity regardless of its tags.
    #[must_use]
    pub const fn without_feature_filter(mut self) -> Self {
        self.feature_filter = false;
        self
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Runs one entity through every stage and returns the documents to
    /// write.
    pub async fn process(&mut self, entity: RawEntity) -> Vec<Document> {
        self.stats.read += 1;

        if self.feature_filter && !is_importable(&entity.tags) {
            self.stats.filtered += 1;
            return Vec::new();
        }

        let mut doc = match self.builder.build(entity) {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                self.stats.blacklisted += 1;
                return Vec::new();
            }
            Err(e) => {
                log::error!("Skipping malformed input record: {e}");
                self.stats.malformed += 1;
                return Vec::new();
            }
        };

        self.names.resolve(&mut doc);

        let mut out = Vec::new();
        for mut doc in self.splitter.split(doc) {
            if self.dedupe && !(self.addresses.accept(&doc) && self.stations.accept(&doc)) {
                continue;
            }
            if let Some(enricher) = &self.enricher {
                enricher.enrich(&mut doc).await;
            }
            out.push(doc);
        }

        self.stats.emitted += out.len() as u64;
        out
    }

    /// Drains `entities` into `sink`.
    ///
    /// Unparseable records are logged and skipped. Reader and sink I/O
    /// errors abort the run.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] on a fatal reader or sink error.
    pub async fn run<I>(
        &mut self,
        entities: I,
        sink: &mut dyn DocumentSink,
        progress: &dyn ProgressCallback,
    ) -> Result<PipelineStats, PipelineError>
    where
        I: IntoIterator<Item = Result<RawEntity, ReaderError>>,
    {
        for entity in entities {
            progress.inc(1);
            let entity = match entity {
                Ok(entity) => entity,
                Err(e) if e.is_record_error() => {
                    log::warn!("{e}");
                    self.stats.read += 1;
                    self.stats.malformed += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            for doc in self.process(entity).await {
                sink.write(&doc)?;
            }
        }
        sink.flush()?;

        let stats = self.finish();
        progress.finish(format!("Imported {} documents", stats.emitted));
        Ok(stats)
    }

    /// Logs the dedup counters and a run summary.
    pub fn finish(&mut self) -> PipelineStats {
        if self.dedupe {
            self.addresses.finish();
            self.stations.finish();
        }
        self.stats.deduped_addresses = self.addresses.dropped();
        self.stats.deduped_stations = self.stations.dropped();

        let s = self.stats;
        log::info!(
            "Import finished: {} read, {} filtered, {} malformed, {} blacklisted, {} emitted",
            s.read,
            s.filtered,
            s.malformed,
            s.blacklisted,
            s.emitted,
        );
        s
    }
}
