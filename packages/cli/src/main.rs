#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the OSM geocoder document importer.
//!
//! Reads raw entities (NDJSON or an OSM PBF extract), runs them through
//! the import pipeline and writes one document per line.
//!
//! Uses `indicatif-log-bridge` (via [`osm_import_cli_utils::init_logger`])
//! so that log lines and the progress bar do not overwrite each other.

mod setup;

use std::fs::File;
use std::io::{BufWriter, IsTerminal};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use osm_import::Pipeline;
use osm_import::pipeline::is_importable;
use osm_import::reader::{NdjsonReader, PbfReader};
use osm_import::sink::{DocumentSink, NdjsonSink};
use osm_import_cli_utils::IndicatifProgress;

#[derive(Parser)]
#[command(name = "osm_import", about = "OSM to geocoder document importer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import entities and write geocoder documents as NDJSON
    Import {
        /// NDJSON entity records, one per line (`-` for stdin)
        #[arg(long, required_unless_present = "pbf", conflicts_with = "pbf")]
        input: Option<PathBuf>,
        /// OSM PBF extract (tagged nodes only)
        #[arg(long)]
        pbf: Option<PathBuf>,
        /// Output file (defaults to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Import config TOML (defaults to the built-in config)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Disable address and station dedup
        #[arg(long)]
        no_dedupe: bool,
        /// Skip admin hierarchy enrichment even if configured
        #[arg(long)]
        no_hierarchy: bool,
        /// Import every entity, not only those with an address or venue
        /// feature
        #[arg(long)]
        no_feature_filter: bool,
    },
    /// Scan the configured index and report how many stations would seed
    /// station dedup
    Stations {
        /// Import config TOML with a `[station_seed]` section
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = osm_import_cli_utils::init_logger();
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Import {
            input,
            pbf,
            output,
            config,
            no_dedupe,
            no_hierarchy,
            no_feature_filter,
        } => {
            let config = setup::load_config(config.as_deref())?;
            if let Some(languages) = config.supported_languages() {
                log::info!("Keeping names in: {}", languages.join(", "));
            }
            let mut pipeline = Pipeline::new(&config);

            if no_dedupe {
                pipeline = pipeline.without_dedupe();
            } else if let Some(seed_config) = &config.station_seed {
                let seed = setup::station_seed(&client, seed_config).await?;
                pipeline = pipeline.with_station_seed(seed);
            }
            if no_feature_filter {
                pipeline = pipeline.without_feature_filter();
            }
            if !no_hierarchy
                && let Some(hierarchy) = &config.hierarchy
                && let Some(enricher) = setup::enricher(&client, hierarchy)?
            {
                pipeline = pipeline.with_enricher(enricher);
            }

            let mut sink: Box<dyn DocumentSink> = match &output {
                Some(path) => Box::new(NdjsonSink::new(BufWriter::new(File::create(path)?))),
                None => Box::new(NdjsonSink::new(BufWriter::new(std::io::stdout().lock()))),
            };
            let progress = IndicatifProgress::records_bar(&multi, "Importing");

            log::info!("Starting OSM import");
            let stats = if let Some(pbf) = pbf {
                let reader = PbfReader::open(&pbf, is_importable)?;
                pipeline
                    .run(reader, sink.as_mut(), progress.as_ref())
                    .await?
            } else if let Some(path) = input.filter(|p| p.as_os_str() != "-") {
                let reader = NdjsonReader::open(&path)?;
                pipeline
                    .run(reader, sink.as_mut(), progress.as_ref())
                    .await?
            } else {
                let stdin = std::io::stdin();
                if stdin.is_terminal() {
                    log::warn!("Reading entities from a terminal, end input with Ctrl-D");
                }
                let reader = NdjsonReader::new("stdin", stdin.lock());
                pipeline
                    .run(reader, sink.as_mut(), progress.as_ref())
                    .await?
            };

            log::info!(
                "Wrote {} documents ({} addresses and {} stations deduped)",
                stats.emitted,
                stats.deduped_addresses,
                stats.deduped_stations,
            );
        }
        Commands::Stations { config } => {
            let config = setup::load_config(config.as_deref())?;
            let Some(seed_config) = &config.station_seed else {
                return Err("config has no [station_seed] section".into());
            };
            let seed = setup::station_seed(&client, seed_config).await?;
            println!("{} existing stations in {}", seed.len(), seed_config.index);
        }
    }

    Ok(())
}
