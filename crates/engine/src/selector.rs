//! Capture selection
//!
//! Decides which captures are admissible evidence for each calendar year:
//! only scenes whose footprint fully contains the parcel, under the
//! cloud-cover ceiling, keeping the lowest-cloud subset per year.

use std::collections::BTreeMap;

use geo::Contains;
use geo_types::Polygon;
use pondwatch_catalog::Capture;
use tracing::debug;

/// Select admissible captures per year.
///
/// 1. Retain only captures whose footprint geometrically **contains** the
///    parcel — partial coverage is rejected outright, never used as
///    partial evidence.
/// 2. Group survivors by calendar year of acquisition.
/// 3. Within each year, drop captures with cloud cover above `cloud_ceiling`.
/// 4. Sort ascending by cloud cover (stable: first appearance wins ties)
///    and keep at most `max_per_year`.
///
/// Years with no qualifying capture are absent from the result; an empty
/// input yields an empty mapping. The returned map iterates years in
/// increasing order, which the transition scan relies on.
pub fn select_captures(
    captures: Vec<Capture>,
    parcel_geometry: &Polygon<f64>,
    cloud_ceiling: f64,
    max_per_year: usize,
) -> BTreeMap<i32, Vec<Capture>> {
    let mut by_year: BTreeMap<i32, Vec<Capture>> = BTreeMap::new();

    for capture in captures {
        if !capture.footprint.contains(parcel_geometry) {
            continue;
        }
        by_year.entry(capture.year()).or_default().push(capture);
    }

    let mut selected: BTreeMap<i32, Vec<Capture>> = BTreeMap::new();
    for (year, mut candidates) in by_year {
        candidates.retain(|c| c.cloud_cover <= cloud_ceiling);
        if candidates.is_empty() {
            continue;
        }

        // Stable sort keeps first-appearance order for equal cloud cover
        candidates.sort_by(|a, b| {
            a.cloud_cover
                .partial_cmp(&b.cloud_cover)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(max_per_year);

        debug!(year, count = candidates.len(), "selected captures");
        selected.insert(year, candidates);
    }

    selected
}
