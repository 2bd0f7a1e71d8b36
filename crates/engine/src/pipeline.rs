//! Per-parcel orchestration
//!
//! Wires the catalog, the selector, the index, the temporal scan and the
//! resolver into one detection run. I/O goes through collaborator traits so
//! the pipeline itself stays testable without a network or raster files.

use std::collections::BTreeMap;

use geo_types::Polygon;
use pondwatch_catalog::{Capture, REQUIRED_BANDS};
use pondwatch_core::raster::Raster;
use pondwatch_core::Parcel;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::index::water_index;
use crate::maybe_rayon::*;
use crate::resolver::{resolve_previous_class, ClassSampler, EpochTable, LabelTable};
use crate::selector::select_captures;
use crate::temporal::{find_transition, TransitionRecord};

/// Label reported when no pre-transition class could be resolved.
pub const NO_DATA_LABEL: &str = "no data";

/// Supplies candidate captures for a parcel.
pub trait CaptureSource {
    /// All captures intersecting `parcel_geometry` within `date_range`
    /// (a `start/end` interval string) across `collections`. Candidates
    /// only: containment and cloud filtering happen in the selector.
    fn search(
        &self,
        parcel_geometry: &Polygon<f64>,
        date_range: &str,
        collections: &[String],
    ) -> Result<Vec<Capture>>;
}

/// Reads one band of one capture as a parcel-clipped raster.
///
/// Implementations mask pixels outside the parcel as nodata; the pipeline
/// pools whatever valid pixels remain.
pub trait BandReader {
    fn read_band(&self, capture: &Capture, band: &str, parcel: &Parcel) -> Result<Raster<f64>>;
}

/// Tunable knobs of a detection run.
#[derive(Debug, Clone)]
pub struct DetectionOptions {
    /// Closed acquisition interval, `YYYY-MM-DD/YYYY-MM-DD`.
    pub date_range: String,
    /// STAC collections searched.
    pub collections: Vec<String>,
    /// Maximum admissible cloud cover percentage.
    pub cloud_ceiling: f64,
    /// Captures kept per calendar year after cloud sorting.
    pub max_per_year: usize,
    /// Yearly median at or above this marks the transition.
    pub threshold: f64,
    /// Additional attempts per band read before the capture is dropped.
    pub read_retries: usize,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            date_range: "1999-05-01/2024-12-31".to_string(),
            collections: vec!["landsat-c2-l2".to_string(), "sentinel-2-l2a".to_string()],
            cloud_ceiling: 20.0,
            max_per_year: 5,
            threshold: 1.0,
            read_retries: 2,
        }
    }
}

/// The reported outcome for one parcel.
#[derive(Debug, Clone, Serialize)]
pub struct ParcelReport {
    pub parcel_id: String,
    /// First year the water index median met the threshold, `null` when
    /// the parcel never transitioned inside the window.
    pub transition_year: Option<i32>,
    /// Pre-transition land-use class name; [`NO_DATA_LABEL`] when no class
    /// could be resolved.
    pub previous_class_label: String,
    /// Classification epoch the label was sampled from, when resolved.
    pub epoch_year: Option<i32>,
    /// Year → median water index over pooled valid pixels.
    pub yearly_medians: BTreeMap<i32, f64>,
}

impl ParcelReport {
    fn from_parts(record: TransitionRecord, resolution: Option<crate::resolver::Resolution>) -> Self {
        let (previous_class_label, epoch_year) = match resolution {
            Some(r) => (r.label, Some(r.epoch_year)),
            None => (NO_DATA_LABEL.to_string(), None),
        };
        Self {
            parcel_id: record.parcel_id,
            transition_year: record.first_year,
            previous_class_label,
            epoch_year,
            yearly_medians: record.yearly_medians,
        }
    }
}

/// Run the full detection for one parcel.
///
/// Search, select, read bands, compute the index, pool valid pixels per
/// year, scan for the first threshold crossing, then resolve the class
/// before the transition. A capture whose bands cannot be read after
/// retries is dropped from evidence with a warning; the run continues on
/// the remaining captures. Only the catalog search itself is fatal.
pub fn detect_parcel(
    parcel: &Parcel,
    source: &dyn CaptureSource,
    reader: &dyn BandReader,
    sampler: &dyn ClassSampler,
    epochs: &EpochTable,
    labels: &LabelTable,
    options: &DetectionOptions,
) -> Result<ParcelReport> {
    let candidates = source.search(&parcel.geometry, &options.date_range, &options.collections)?;
    debug!(
        parcel = %parcel.id,
        candidates = candidates.len(),
        "catalog search complete"
    );

    let selected = select_captures(
        candidates,
        &parcel.geometry,
        options.cloud_ceiling,
        options.max_per_year,
    );

    let mut yearly_values: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for (year, captures) in &selected {
        let pooled = yearly_values.entry(*year).or_default();
        for capture in captures {
            if !capture.has_required_bands() {
                debug!(parcel = %parcel.id, capture = %capture.id, "missing index bands, skipped");
                continue;
            }
            match read_index(capture, parcel, reader, options.read_retries) {
                Ok(index) => pooled.extend(index.valid_values()),
                Err(e) => {
                    warn!(
                        parcel = %parcel.id,
                        capture = %capture.id,
                        error = %e,
                        "capture dropped from evidence"
                    );
                }
            }
        }
    }

    let record = find_transition(&parcel.id, &yearly_values, options.threshold);

    // A failed class lookup degrades the report, not the detection
    let resolution = match resolve_previous_class(
        parcel.representative_point(),
        record.first_year,
        epochs,
        labels,
        sampler,
    ) {
        Ok(r) => r,
        Err(e) => {
            warn!(parcel = %parcel.id, error = %e, "class resolution failed");
            None
        }
    };

    let report = ParcelReport::from_parts(record, resolution);
    info!(
        parcel = %report.parcel_id,
        transition_year = ?report.transition_year,
        previous_class = %report.previous_class_label,
        "parcel detection complete"
    );
    Ok(report)
}

/// Run detection over a set of parcels, in parallel when the `parallel`
/// feature is enabled. Reports come back in input order regardless.
pub fn detect_transitions<S, B, C>(
    parcels: &[Parcel],
    source: &S,
    reader: &B,
    sampler: &C,
    epochs: &EpochTable,
    labels: &LabelTable,
    options: &DetectionOptions,
) -> Vec<Result<ParcelReport>>
where
    S: CaptureSource + Sync,
    B: BandReader + Sync,
    C: ClassSampler + Sync,
{
    parcels
        .into_par_iter()
        .map(|parcel| detect_parcel(parcel, source, reader, sampler, epochs, labels, options))
        .collect()
}

/// Read the four index bands of one capture and compute the water index,
/// retrying each band read up to `retries` extra times.
fn read_index(
    capture: &Capture,
    parcel: &Parcel,
    reader: &dyn BandReader,
    retries: usize,
) -> Result<Raster<f64>> {
    let mut bands = Vec::with_capacity(REQUIRED_BANDS.len());
    for band in REQUIRED_BANDS {
        bands.push(read_band_with_retry(capture, band, parcel, reader, retries)?);
    }
    let [blue, nir, swir1, swir2] = [&bands[0], &bands[1], &bands[2], &bands[3]];
    Ok(water_index(blue, nir, swir1, swir2)?)
}

fn read_band_with_retry(
    capture: &Capture,
    band: &str,
    parcel: &Parcel,
    reader: &dyn BandReader,
    retries: usize,
) -> Result<Raster<f64>> {
    let mut last_err = None;
    for attempt in 0..=retries {
        match reader.read_band(capture, band, parcel) {
            Ok(raster) => return Ok(raster),
            Err(e) => {
                debug!(
                    capture = %capture.id,
                    band,
                    attempt,
                    error = %e,
                    "band read attempt failed"
                );
                last_err = Some(e);
            }
        }
    }
    // retries >= 0 means the loop ran at least once
    Err(last_err.unwrap_or(crate::error::EngineError::BandRead {
        capture_id: capture.id.to_string(),
        band: band.to_string(),
        reason: "no read attempt made".to_string(),
    }))
}
