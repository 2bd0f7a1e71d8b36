//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Types storable in a raster cell.
///
/// Reflectance bands come in as floats; classification rasters as integer
/// codes. The no-data test is the one place the two differ: floats treat
/// NaN as no-data unconditionally, integers only match an explicit code.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Whether this value is no-data under the given sentinel.
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Lossy view of the cell value as f64, for pooling.
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! impl_element_int {
    ($($t:ty),+) => {$(
        impl RasterElement for $t {
            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }
        }
    )+};
}

macro_rules! impl_element_float {
    ($($t:ty),+) => {$(
        impl RasterElement for $t {
            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) => (self - nd).abs() < <$t>::EPSILON * 100.0,
                    None => false,
                }
            }
        }
    )+};
}

impl_element_int!(i16, i32, i64, u8, u16, u32);
impl_element_float!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_nan_is_always_nodata() {
        assert!(f64::NAN.is_nodata(None));
        assert!(f64::NAN.is_nodata(Some(-9999.0)));
        assert!(!0.0f64.is_nodata(None));
    }

    #[test]
    fn test_integer_needs_explicit_sentinel() {
        assert!(!0i32.is_nodata(None));
        assert!(0i32.is_nodata(Some(0)));
        assert!(!4i32.is_nodata(Some(0)));
    }

    #[test]
    fn test_to_f64() {
        assert_eq!(7u8.to_f64(), Some(7.0));
        assert_eq!((-3i32).to_f64(), Some(-3.0));
    }
}
