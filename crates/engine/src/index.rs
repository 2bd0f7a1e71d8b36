//! Normalized water index
//!
//! The spectral index that drives transition detection, computed per pixel
//! from four co-registered bands. A pure array transform: no awareness of
//! parcels or years.

use crate::maybe_rayon::*;
use ndarray::Array2;
use pondwatch_core::raster::Raster;
use pondwatch_core::{Error, Result};

/// Normalized Water Index
///
/// `NWI = (Blue − (NIR + SWIR1 + SWIR2)) / (Blue + (NIR + SWIR1 + SWIR2))`
///
/// Water absorbs strongly in the infrared, so open water pushes the index
/// up while vegetation and bare soil pull it down.
///
/// Pixels where any input is nodata, or where the denominator is exactly
/// zero, are set to NaN — considered but invalid, never coerced to zero.
/// For non-negative reflectance inputs all valid outputs lie in [-1, 1].
///
/// # Arguments
/// * `blue` - Blue band
/// * `nir` - Near-infrared band
/// * `swir1` - Shortwave infrared band (1.6 µm)
/// * `swir2` - Shortwave infrared band (2.2 µm)
pub fn water_index(
    blue: &Raster<f64>,
    nir: &Raster<f64>,
    swir1: &Raster<f64>,
    swir2: &Raster<f64>,
) -> Result<Raster<f64>> {
    check_dimensions(blue, nir)?;
    check_dimensions(blue, swir1)?;
    check_dimensions(blue, swir2)?;

    let (rows, cols) = blue.shape();
    let nd_blue = blue.nodata();
    let nd_nir = nir.nodata();
    let nd_swir1 = swir1.nodata();
    let nd_swir2 = swir2.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let b = unsafe { blue.get_unchecked(row, col) };
                let n = unsafe { nir.get_unchecked(row, col) };
                let s1 = unsafe { swir1.get_unchecked(row, col) };
                let s2 = unsafe { swir2.get_unchecked(row, col) };

                if is_nodata(b, nd_blue)
                    || is_nodata(n, nd_nir)
                    || is_nodata(s1, nd_swir1)
                    || is_nodata(s2, nd_swir2)
                {
                    continue;
                }

                let infrared = n + s1 + s2;
                let denom = b + infrared;
                if denom == 0.0 {
                    continue; // Degenerate pixel: invalid, not zero
                }

                row_data[col] = (b - infrared) / denom;
            }
            row_data
        })
        .collect();

    let mut output = blue.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

fn is_nodata(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return true;
    }
    match nodata {
        Some(nd) => (value - nd).abs() < f64::EPSILON,
        None => false,
    }
}

fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::ShapeMismatch {
            expected: a.shape(),
            found: b.shape(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pondwatch_core::GeoTransform;

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    #[test]
    fn test_water_index_basic() {
        let blue = make_band(5, 5, 0.6);
        let nir = make_band(5, 5, 0.1);
        let swir1 = make_band(5, 5, 0.05);
        let swir2 = make_band(5, 5, 0.05);

        let result = water_index(&blue, &nir, &swir1, &swir2).unwrap();
        let val = result.get(2, 2).unwrap();

        // (0.6 - 0.2) / (0.6 + 0.2) = 0.5
        assert!((val - 0.5).abs() < 1e-10, "Expected 0.5, got {}", val);
    }

    #[test]
    fn test_water_index_dry_land_negative() {
        // Bare soil: infrared dominates blue
        let blue = make_band(5, 5, 0.1);
        let nir = make_band(5, 5, 0.4);
        let swir1 = make_band(5, 5, 0.3);
        let swir2 = make_band(5, 5, 0.2);

        let result = water_index(&blue, &nir, &swir1, &swir2).unwrap();
        let val = result.get(2, 2).unwrap();

        assert!(val < 0.0, "Dry land should have negative index, got {}", val);
    }

    #[test]
    fn test_zero_denominator_marked_invalid() {
        let blue = make_band(5, 5, 0.0);
        let nir = make_band(5, 5, 0.0);
        let swir1 = make_band(5, 5, 0.0);
        let swir2 = make_band(5, 5, 0.0);

        let result = water_index(&blue, &nir, &swir1, &swir2).unwrap();
        for row in 0..5 {
            for col in 0..5 {
                assert!(result.get(row, col).unwrap().is_nan());
            }
        }
        assert_eq!(result.valid_count(), 0);
    }

    #[test]
    fn test_range_for_nonnegative_inputs() {
        // Gradient inputs: all valid outputs must lie in [-1, 1]
        let mut blue = make_band(10, 10, 0.0);
        let mut nir = make_band(10, 10, 0.0);
        for row in 0..10 {
            for col in 0..10 {
                blue.set(row, col, (row * 10 + col) as f64 * 0.01).unwrap();
                nir.set(row, col, (99 - (row * 10 + col)) as f64 * 0.005)
                    .unwrap();
            }
        }
        let swir1 = make_band(10, 10, 0.02);
        let swir2 = make_band(10, 10, 0.01);

        let result = water_index(&blue, &nir, &swir1, &swir2).unwrap();
        for row in 0..10 {
            for col in 0..10 {
                let val = result.get(row, col).unwrap();
                if !val.is_nan() {
                    assert!(
                        (-1.0..=1.0).contains(&val),
                        "index out of range: {} at ({}, {})",
                        val,
                        row,
                        col
                    );
                }
            }
        }
    }

    #[test]
    fn test_nodata_propagates() {
        let mut blue = make_band(5, 5, 0.5);
        blue.set_nodata(Some(-9999.0));
        blue.set(2, 2, -9999.0).unwrap();

        let nir = make_band(5, 5, 0.1);
        let swir1 = make_band(5, 5, 0.1);
        let swir2 = make_band(5, 5, 0.1);

        let result = water_index(&blue, &nir, &swir1, &swir2).unwrap();
        assert!(result.get(2, 2).unwrap().is_nan());
        assert_eq!(result.valid_count(), 24);
    }

    #[test]
    fn test_dimension_mismatch() {
        let blue = make_band(5, 5, 0.5);
        let nir = make_band(5, 10, 0.1);
        let swir1 = make_band(5, 5, 0.1);
        let swir2 = make_band(5, 5, 0.1);

        assert!(water_index(&blue, &nir, &swir1, &swir2).is_err());
    }

    #[test]
    fn test_never_panics_on_extremes() {
        let blue = make_band(3, 3, f64::MAX / 4.0);
        let nir = make_band(3, 3, 0.0);
        let swir1 = make_band(3, 3, 0.0);
        let swir2 = make_band(3, 3, 0.0);

        let result = water_index(&blue, &nir, &swir1, &swir2).unwrap();
        assert!((result.get(1, 1).unwrap() - 1.0).abs() < 1e-10);
    }
}
