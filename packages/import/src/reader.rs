//! Raw entity readers.
//!
//! Two input formats are supported: newline-delimited JSON records as
//! produced by an upstream way/node parser, and tagged nodes read
//! directly from an OpenStreetMap PBF extract.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use osm_import_document_models::{RawEntity, Tags};
use osmpbf::{BlobDecode, BlobReader, Element};

/// Errors from reading input.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// Input file not found.
    #[error("Input file not found: {0}")]
    FileNotFound(String),

    /// I/O error while reading. Fatal for the run.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// Path or stream name.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A line that is not a valid entity record. The line is skipped.
    #[error("Invalid record on line {line}: {source}")]
    Json {
        /// One-based line number.
        line: usize,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// PBF decoding error.
    #[error("OSM PBF parse error in {path}: {message}")]
    Pbf {
        /// Path of the PBF file.
        path: String,
        /// Decoder message.
        message: String,
    },
}

impl ReaderError {
    /// Returns `true` if only the current record is affected.
    #[must_use]
    pub const fn is_record_error(&self) -> bool {
        matches!(self, Self::Json { .. })
    }
}

/// Iterator over newline-delimited JSON entity records. Blank lines are
/// ignored.
pub struct NdjsonReader<R> {
    name: String,
    lines: std::io::Lines<R>,
    line: usize,
}

impl<R: BufRead> NdjsonReader<R> {
    /// Wraps a buffered reader. `name` identifies the stream in errors.
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl NdjsonReader<BufReader<File>> {
    /// Opens an NDJSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError`] if the file does not exist or cannot be
    /// opened.
    pub fn open(path: &Path) -> Result<Self, ReaderError> {
        if !path.exists() {
            return Err(ReaderError::FileNotFound(path.display().to_string()));
        }
        let file = File::open(path).map_err(|source| ReaderError::Io {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("Reading entities from {}", path.display());
        Ok(Self::new(path.display().to_string(), BufReader::new(file)))
    }
}

impl<R: BufRead> Iterator for NdjsonReader<R> {
    type Item = Result<RawEntity, ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(source) => {
                    return Some(Err(ReaderError::Io {
                        path: self.name.clone(),
                        source,
                    }));
                }
            };
            self.line += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str(&line).map_err(|source| ReaderError::Json {
                    line: self.line,
                    source,
                }),
            );
        }
    }
}

/// Streams tagged nodes from an OSM PBF file, keeping those accepted by
/// `keep`.
///
/// Blobs are decoded one at a time in file order, so entities arrive in
/// the same order on every run and only one block is held in memory.
/// Ways and relations are skipped because their coordinates need a second
/// pass over the node table; feed them through the NDJSON reader with
/// precomputed centroids instead.
pub struct PbfReader<F> {
    path: String,
    blobs: BlobReader<BufReader<File>>,
    pending: VecDeque<RawEntity>,
    keep: F,
    nodes: usize,
}

impl<F: Fn(&Tags) -> bool> PbfReader<F> {
    /// Opens a PBF file.
    ///
    /// # Errors
    ///
    /// Returns [`ReaderError`] if the file does not exist or cannot be
    /// opened.
    pub fn open(path: &Path, keep: F) -> Result<Self, ReaderError> {
        if !path.exists() {
            return Err(ReaderError::FileNotFound(path.display().to_string()));
        }
        let blobs = BlobReader::from_path(path).map_err(|e| ReaderError::Pbf {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        log::info!("Parsing OSM PBF: {}", path.display());

        Ok(Self {
            path: path.display().to_string(),
            blobs,
            pending: VecDeque::new(),
            keep,
            nodes: 0,
        })
    }

    fn pbf_error(&self, e: &osmpbf::Error) -> ReaderError {
        ReaderError::Pbf {
            path: self.path.clone(),
            message: e.to_string(),
        }
    }
}

impl<F: Fn(&Tags) -> bool> Iterator for PbfReader<F> {
    type Item = Result<RawEntity, ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entity) = self.pending.pop_front() {
                self.nodes += 1;
                return Some(Ok(entity));
            }

            let Some(blob) = self.blobs.next() else {
                log::info!("Extracted {} tagged nodes from {}", self.nodes, self.path);
                return None;
            };
            let blob = match blob {
                Ok(blob) => blob,
                Err(e) => return Some(Err(self.pbf_error(&e))),
            };
            match blob.decode() {
                Ok(BlobDecode::OsmData(block)) => {
                    let (pending, keep) = (&mut self.pending, &self.keep);
                    block.for_each_element(|element| {
                        let entity = match element {
                            Element::Node(node) => {
                                node_entity(node.id(), node.lat(), node.lon(), node.tags(), keep)
                            }
                            Element::DenseNode(node) => {
                                node_entity(node.id(), node.lat(), node.lon(), node.tags(), keep)
                            }
                            Element::Way(_) | Element::Relation(_) => None,
                        };
                        pending.extend(entity);
                    });
                }
                Ok(BlobDecode::OsmHeader(_) | BlobDecode::Unknown(_)) => {}
                Err(e) => return Some(Err(self.pbf_error(&e))),
            }
        }
    }
}

fn node_entity<'a>(
    id: i64,
    lat: f64,
    lon: f64,
    tags: impl Iterator<Item = (&'a str, &'a str)>,
    keep: &impl Fn(&Tags) -> bool,
) -> Option<RawEntity> {
    let tags: Tags = tags.map(|(k, v)| (k.to_string(), v.to_string())).collect();
    if tags.is_empty() || !keep(&tags) {
        return None;
    }
    Some(RawEntity::node(id, lat, lon, tags))
}
