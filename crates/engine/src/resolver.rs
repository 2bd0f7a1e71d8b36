//! Pre-transition land-use resolution
//!
//! Once a transition year is known, looks up what the land was before the
//! water appeared: picks the most recent classification epoch strictly
//! before the transition, point-samples its raster at the parcel's
//! representative point, and maps the raw code to a label.

use std::collections::{BTreeMap, HashMap};

use geo_types::Point;
use serde::Deserialize;

use crate::error::{EngineError, Result};

/// Label used for class codes present in the raster but absent from the
/// label table.
pub const UNKNOWN_CLASS: &str = "Unknown Class";

/// Samples a classification raster at a point.
///
/// Implementations return `Ok(None)` for no-data samples (point outside the
/// raster, or the raster's no-data code); that is a valid outcome, not an
/// error.
pub trait ClassSampler {
    fn sample(&self, raster_ref: &str, point: Point<f64>) -> Result<Option<i32>>;
}

/// Injected epoch configuration: reference year → classification raster.
///
/// Read-only once built; adding epochs is configuration, not a code change.
/// Ordered so "latest epoch strictly before year Y" is a range query.
#[derive(Debug, Clone, Default)]
pub struct EpochTable {
    epochs: BTreeMap<i32, String>,
}

impl EpochTable {
    pub fn new() -> Self {
        Self {
            epochs: BTreeMap::new(),
        }
    }

    /// Build from `(year, raster_ref)` pairs.
    pub fn from_entries(entries: impl IntoIterator<Item = (i32, String)>) -> Self {
        Self {
            epochs: entries.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, year: i32, raster_ref: impl Into<String>) {
        self.epochs.insert(year, raster_ref.into());
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    /// The most recent epoch strictly before `year`, if any.
    pub fn preceding(&self, year: i32) -> Option<(i32, &str)> {
        self.epochs
            .range(..year)
            .next_back()
            .map(|(y, r)| (*y, r.as_str()))
    }
}

/// Static class-code → class-name table, loaded once per run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct LabelTable {
    labels: HashMap<String, String>,
}

impl LabelTable {
    /// Parse a JSON object of `{"code": "label"}` entries.
    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            labels: entries.into_iter().collect(),
        }
    }

    /// Label for a class code; unrecognized codes get [`UNKNOWN_CLASS`].
    pub fn label_for(&self, code: i32) -> String {
        self.labels
            .get(&code.to_string())
            .cloned()
            .unwrap_or_else(|| UNKNOWN_CLASS.to_string())
    }
}

/// The resolved pre-transition class for one parcel.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Raw class code sampled from the epoch raster.
    pub code: i32,
    /// Human-readable class name.
    pub label: String,
    /// Epoch year the class was sampled from.
    pub epoch_year: i32,
}

/// Resolve the land-use class immediately before a transition.
///
/// Absent when:
/// - `transition_year` is absent (no raster read is attempted),
/// - no epoch precedes the transition year,
/// - the raster sample is no-data.
///
/// Epochs at or after the transition year are never consulted.
pub fn resolve_previous_class(
    parcel_point: Point<f64>,
    transition_year: Option<i32>,
    epochs: &EpochTable,
    labels: &LabelTable,
    sampler: &dyn ClassSampler,
) -> Result<Option<Resolution>> {
    let Some(year) = transition_year else {
        return Ok(None);
    };

    let Some((epoch_year, raster_ref)) = epochs.preceding(year) else {
        return Ok(None);
    };

    let sample = sampler
        .sample(raster_ref, parcel_point)
        .map_err(|e| EngineError::ClassSample {
            epoch_year,
            reason: e.to_string(),
        })?;
    let Some(code) = sample else {
        return Ok(None);
    };

    Ok(Some(Resolution {
        code,
        label: labels.label_for(code),
        epoch_year,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Sampler returning a fixed code, counting invocations.
    struct FixedSampler {
        code: Option<i32>,
        calls: Cell<usize>,
    }

    impl FixedSampler {
        fn new(code: Option<i32>) -> Self {
            Self {
                code,
                calls: Cell::new(0),
            }
        }
    }

    impl ClassSampler for FixedSampler {
        fn sample(&self, _raster_ref: &str, _point: Point<f64>) -> Result<Option<i32>> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.code)
        }
    }

    fn point() -> Point<f64> {
        Point::new(77.0, 13.0)
    }

    fn labels() -> LabelTable {
        LabelTable::from_json(r#"{"4": "Agricultural Land", "7": "Scrub Forest"}"#).unwrap()
    }

    #[test]
    fn test_preceding_epoch() {
        let epochs = EpochTable::from_entries([
            (1999, "lulc_1999.tif".to_string()),
            (2005, "lulc_2005.tif".to_string()),
            (2016, "lulc_2016.tif".to_string()),
        ]);

        assert_eq!(epochs.preceding(2016), Some((2005, "lulc_2005.tif")));
        assert_eq!(epochs.preceding(2000), Some((1999, "lulc_1999.tif")));
        assert_eq!(epochs.preceding(1999), None);
    }

    #[test]
    fn test_resolve_known_class() {
        // Scenario: transition 2016, single epoch 1999, code 4
        let epochs = EpochTable::from_entries([(1999, "lulc_1999.tif".to_string())]);
        let sampler = FixedSampler::new(Some(4));

        let result =
            resolve_previous_class(point(), Some(2016), &epochs, &labels(), &sampler).unwrap();

        assert_eq!(
            result,
            Some(Resolution {
                code: 4,
                label: "Agricultural Land".to_string(),
                epoch_year: 1999,
            })
        );
    }

    #[test]
    fn test_absent_transition_skips_sampling() {
        let epochs = EpochTable::from_entries([(1999, "lulc_1999.tif".to_string())]);
        let sampler = FixedSampler::new(Some(4));

        let result = resolve_previous_class(point(), None, &epochs, &labels(), &sampler).unwrap();

        assert!(result.is_none());
        assert_eq!(sampler.calls.get(), 0, "no raster read must be attempted");
    }

    #[test]
    fn test_no_preceding_epoch() {
        // All epochs at or after the transition year are never selected
        let epochs = EpochTable::from_entries([
            (2016, "lulc_2016.tif".to_string()),
            (2020, "lulc_2020.tif".to_string()),
        ]);
        let sampler = FixedSampler::new(Some(4));

        let result =
            resolve_previous_class(point(), Some(2016), &epochs, &labels(), &sampler).unwrap();
        assert!(result.is_none());
        assert_eq!(sampler.calls.get(), 0);
    }

    #[test]
    fn test_nodata_sample_is_absent_not_unknown() {
        let epochs = EpochTable::from_entries([(1999, "lulc_1999.tif".to_string())]);
        let sampler = FixedSampler::new(None);

        let result =
            resolve_previous_class(point(), Some(2016), &epochs, &labels(), &sampler).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_sampler_failure_carries_epoch_context() {
        struct BrokenSampler;

        impl ClassSampler for BrokenSampler {
            fn sample(&self, _raster_ref: &str, _point: Point<f64>) -> Result<Option<i32>> {
                Err(pondwatch_core::Error::Other("raster unreadable".to_string()).into())
            }
        }

        let epochs = EpochTable::from_entries([(1999, "lulc_1999.tif".to_string())]);
        let err = resolve_previous_class(point(), Some(2016), &epochs, &labels(), &BrokenSampler)
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::ClassSample { epoch_year: 1999, .. }
        ));
        assert!(err.to_string().contains("raster unreadable"));
    }

    #[test]
    fn test_unrecognized_code_gets_sentinel_label() {
        let epochs = EpochTable::from_entries([(1999, "lulc_1999.tif".to_string())]);
        let sampler = FixedSampler::new(Some(99));

        let result = resolve_previous_class(point(), Some(2016), &epochs, &labels(), &sampler)
            .unwrap()
            .unwrap();
        assert_eq!(result.label, UNKNOWN_CLASS);
        assert_eq!(result.code, 99);
    }
}
