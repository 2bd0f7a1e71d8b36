//! Temporal aggregation
//!
//! Collapses each year's pooled pixel evidence into a single median value
//! and scans years in increasing order for the first threshold crossing.
//! The median is deliberate: robust to outlier pixels (cloud fringes,
//! sensor noise) without a separate masking step.

use std::collections::BTreeMap;

/// The per-parcel outcome of the temporal scan.
///
/// Created once per parcel per run; immutable afterwards. The full median
/// mapping is kept for diagnostics even when a transition is found early.
#[derive(Debug, Clone)]
pub struct TransitionRecord {
    /// Parcel this record belongs to.
    pub parcel_id: String,
    /// First year whose median meets the threshold, if any.
    pub first_year: Option<i32>,
    /// Year → median of pooled valid pixel values. Years with zero valid
    /// pixels are absent, not zero.
    pub yearly_medians: BTreeMap<i32, f64>,
}

/// Find the first year the aggregated water index crosses `threshold`.
///
/// For each year with at least one valid (finite) pooled value, computes
/// the median. Scanning years in strictly increasing order, the first year
/// whose median is `>= threshold` becomes the transition year; later years
/// are not inspected for selection, though their medians are still
/// computed and returned.
///
/// No year meeting the threshold is a legitimate "no detected change"
/// outcome, not an error.
pub fn find_transition(
    parcel_id: &str,
    yearly_values: &BTreeMap<i32, Vec<f64>>,
    threshold: f64,
) -> TransitionRecord {
    let mut yearly_medians = BTreeMap::new();
    let mut first_year = None;

    for (&year, values) in yearly_values {
        let Some(med) = median(values) else {
            continue; // No valid evidence: the year is absent, not zero
        };
        yearly_medians.insert(year, med);

        if first_year.is_none() && med >= threshold {
            first_year = Some(year);
        }
    }

    TransitionRecord {
        parcel_id: parcel_id.to_string(),
        first_year,
        yearly_medians,
    }
}

/// Median of the finite values in `values`; `None` when no finite value
/// remains.
fn median(values: &[f64]) -> Option<f64> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }

    finite.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = finite.len();
    let med = if n % 2 == 0 {
        (finite[n / 2 - 1] + finite[n / 2]) / 2.0
    } else {
        finite[n / 2]
    };
    Some(med)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn evidence(entries: &[(i32, &[f64])]) -> BTreeMap<i32, Vec<f64>> {
        entries
            .iter()
            .map(|(year, vals)| (*year, vals.to_vec()))
            .collect()
    }

    #[test]
    fn test_median_odd_even() {
        assert_relative_eq!(median(&[3.0, 1.0, 2.0]).unwrap(), 2.0);
        assert_relative_eq!(median(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);
        assert!(median(&[]).is_none());
        assert!(median(&[f64::NAN, f64::NAN]).is_none());
    }

    #[test]
    fn test_first_crossing() {
        // Scenario: medians {2001: 0.2, 2007: 0.6, 2016: 1.3, 2020: 1.8}
        let values = evidence(&[
            (2001, &[0.2, 0.2, 0.2]),
            (2007, &[0.6, 0.6]),
            (2016, &[1.3]),
            (2020, &[1.8, 1.8]),
        ]);

        let record = find_transition("pond-1", &values, 1.0);
        assert_eq!(record.first_year, Some(2016));

        // The full mapping survives for diagnostics
        assert_eq!(record.yearly_medians.len(), 4);
        assert_relative_eq!(record.yearly_medians[&2020], 1.8);
    }

    #[test]
    fn test_earlier_years_below_threshold() {
        let values = evidence(&[(2005, &[0.9]), (2010, &[1.0]), (2015, &[2.0])]);
        let record = find_transition("pond-2", &values, 1.0);

        // Exactly meeting the threshold counts
        assert_eq!(record.first_year, Some(2010));
        for (&year, &med) in &record.yearly_medians {
            if year < 2010 {
                assert!(med < 1.0);
            }
        }
    }

    #[test]
    fn test_no_transition() {
        let values = evidence(&[(2001, &[0.1]), (2014, &[0.3])]);
        let record = find_transition("pond-3", &values, 1.0);
        assert_eq!(record.first_year, None);
        assert_eq!(record.yearly_medians.len(), 2);
    }

    #[test]
    fn test_year_without_valid_pixels_omitted() {
        let values = evidence(&[
            (2003, &[f64::NAN, f64::NAN]),
            (2008, &[1.2]),
        ]);
        let record = find_transition("pond-4", &values, 1.0);

        assert!(!record.yearly_medians.contains_key(&2003));
        assert_eq!(record.first_year, Some(2008));
    }

    #[test]
    fn test_empty_input() {
        let record = find_transition("pond-5", &BTreeMap::new(), 1.0);
        assert_eq!(record.first_year, None);
        assert!(record.yearly_medians.is_empty());
    }

    #[test]
    fn test_median_robust_to_outliers() {
        // One hot pixel must not flip a dry year
        let values = evidence(&[(2012, &[0.1, 0.15, 0.12, 0.09, 95.0])]);
        let record = find_transition("pond-6", &values, 1.0);
        assert_eq!(record.first_year, None);
        assert_relative_eq!(record.yearly_medians[&2012], 0.12);
    }
}
