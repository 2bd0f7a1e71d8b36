//! Pondwatch CLI - pond water-transition detection

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use geo_types::{Point, Polygon};
use pondwatch_catalog::{
    Capture, StacCatalog, StacClientBlocking, StacClientOptions, StacSearchParams, REQUIRED_BANDS,
};
use pondwatch_core::io::{read_band_clipped, sample_class_code};
use pondwatch_core::raster::Raster;
use pondwatch_core::{Parcel, ParcelSet};
use pondwatch_engine::{
    detect_parcel, BandReader, CaptureSource, ClassSampler, DetectionOptions, EngineError,
    EpochTable, LabelTable, ParcelReport,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "pondwatch")]
#[command(author, version, about = "Detect when ponds first filled with water", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a pond parcel file
    Info {
        /// GeoJSON FeatureCollection of pond polygons (WGS84)
        ponds: PathBuf,
    },
    /// Detect the first water year for every pond and the prior land use
    Detect {
        /// GeoJSON FeatureCollection of pond polygons (WGS84)
        ponds: PathBuf,
        /// JSON object of classification epochs: {"1999": "lulc_1999.tif", ...}
        #[arg(long)]
        epochs: PathBuf,
        /// JSON object of class labels: {"4": "Agricultural Land", ...}
        #[arg(long)]
        labels: PathBuf,
        /// Output JSON file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Acquisition window as start/end
        #[arg(long, default_value = "1999-05-01/2024-12-31")]
        date_range: String,
        /// STAC collections to search, comma separated
        #[arg(long, default_value = "landsat-c2-l2,sentinel-2-l2a")]
        collections: String,
        /// Maximum cloud cover percentage
        #[arg(long, default_value = "20")]
        cloud_ceiling: f64,
        /// Captures kept per year
        #[arg(long, default_value = "5")]
        max_per_year: usize,
        /// Yearly median threshold marking the transition
        #[arg(long, default_value = "1.0")]
        threshold: f64,
        /// Root URL of a custom STAC API (Planetary Computer when omitted)
        #[arg(long)]
        stac_url: Option<String>,
        /// Items requested per search page
        #[arg(long, default_value = "250")]
        page_size: u32,
    },
}

// ─── Collaborators ──────────────────────────────────────────────────────

/// Capture source backed by a blocking STAC client.
struct CatalogSource {
    client: StacClientBlocking,
    page_size: u32,
}

impl CaptureSource for CatalogSource {
    fn search(
        &self,
        parcel_geometry: &Polygon<f64>,
        date_range: &str,
        collections: &[String],
    ) -> pondwatch_engine::Result<Vec<Capture>> {
        let params = StacSearchParams::new()
            .intersects_polygon(parcel_geometry)
            .datetime(date_range)
            .collections(collections)
            .limit(self.page_size);

        let mut captures = self.client.search_captures(&params).map_err(EngineError::from)?;

        // Sign the band hrefs up front; reads happen much later
        for capture in &mut captures {
            for band in REQUIRED_BANDS {
                if let Some(href) = capture.bands.get_mut(band) {
                    *href = self
                        .client
                        .sign_asset_href(href)
                        .map_err(EngineError::from)?;
                }
            }
        }
        Ok(captures)
    }
}

/// Band reader going through GDAL (local paths or /vsicurl/ COGs).
struct GdalBandReader;

impl BandReader for GdalBandReader {
    fn read_band(
        &self,
        capture: &Capture,
        band: &str,
        parcel: &Parcel,
    ) -> pondwatch_engine::Result<Raster<f64>> {
        let href = capture
            .band_href(band)
            .ok_or_else(|| EngineError::BandRead {
                capture_id: capture.id.clone(),
                band: band.to_string(),
                reason: "asset missing".to_string(),
            })?;
        Ok(read_band_clipped(href, &parcel.geometry)?)
    }
}

/// Classification sampler going through GDAL.
struct GdalClassSampler;

impl ClassSampler for GdalClassSampler {
    fn sample(&self, raster_ref: &str, point: Point<f64>) -> pondwatch_engine::Result<Option<i32>> {
        Ok(sample_class_code(raster_ref, point)?)
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn load_parcels(path: &PathBuf) -> Result<ParcelSet> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let set = ParcelSet::from_geojson(&text).context("Failed to parse pond polygons")?;
    info!("Loaded {} pond parcels", set.len());
    Ok(set)
}

fn load_epochs(path: &PathBuf) -> Result<EpochTable> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let raw: std::collections::HashMap<String, String> =
        serde_json::from_str(&text).context("Epochs file must be a JSON object")?;

    let mut table = EpochTable::new();
    for (year, raster) in raw {
        let year: i32 = year
            .parse()
            .with_context(|| format!("Epoch key is not a year: {year}"))?;
        table.insert(year, raster);
    }
    if table.is_empty() {
        anyhow::bail!("Epochs file contains no entries");
    }
    Ok(table)
}

fn load_labels(path: &PathBuf) -> Result<LabelTable> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    LabelTable::from_json(&text).context("Labels file must be a JSON object of code → name")
}

fn progress(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );
    pb
}

fn write_reports(reports: &[ParcelReport], output: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(reports)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Results saved to: {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Info { ponds } => {
            let set = load_parcels(&ponds)?;
            println!("File: {}", ponds.display());
            println!("Parcels: {}", set.len());
            for parcel in set.iter() {
                let c = parcel.representative_point();
                println!(
                    "  {}: centroid ({:.6}, {:.6}), area {:.8}",
                    parcel.id,
                    c.x(),
                    c.y(),
                    parcel.area()
                );
            }
        }

        Commands::Detect {
            ponds,
            epochs,
            labels,
            output,
            date_range,
            collections,
            cloud_ceiling,
            max_per_year,
            threshold,
            stac_url,
            page_size,
        } => {
            let set = load_parcels(&ponds)?;
            let epochs = load_epochs(&epochs)?;
            let labels = load_labels(&labels)?;

            let catalog = match stac_url {
                Some(url) => StacCatalog::Custom(url),
                None => StacCatalog::PlanetaryComputer,
            };
            let client = StacClientBlocking::new(catalog, StacClientOptions::default())
                .context("Failed to create STAC client")?;
            let source = CatalogSource { client, page_size };
            let reader = GdalBandReader;
            let sampler = GdalClassSampler;

            let options = DetectionOptions {
                date_range,
                collections: collections.split(',').map(|s| s.trim().to_string()).collect(),
                cloud_ceiling,
                max_per_year,
                threshold,
                ..DetectionOptions::default()
            };

            let start = Instant::now();
            let pb = progress(set.len() as u64);
            let mut reports = Vec::with_capacity(set.len());
            let mut failures = 0usize;

            for parcel in set.iter() {
                pb.set_message(parcel.id.clone());
                match detect_parcel(
                    parcel, &source, &reader, &sampler, &epochs, &labels, &options,
                ) {
                    Ok(report) => reports.push(report),
                    Err(e) => {
                        failures += 1;
                        warn!(parcel = %parcel.id, error = %e, "detection failed");
                    }
                }
                pb.inc(1);
            }
            pb.finish_and_clear();

            write_reports(&reports, output.as_ref())?;
            println!(
                "  {} parcels processed, {} failed, in {:.2?}",
                reports.len(),
                failures,
                start.elapsed()
            );
            if failures > 0 {
                anyhow::bail!("{failures} parcels failed; see log for details");
            }
        }
    }

    Ok(())
}
