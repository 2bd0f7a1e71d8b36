//! Affine georeferencing for band windows

use serde::{Deserialize, Serialize};

/// Affine transform tying pixel indices to geographic coordinates.
///
/// Every band window read for a parcel carries one of these, so index
/// pixels can be masked against the parcel polygon and classification
/// rasters can be sampled at a point:
///
/// ```text
/// x = origin_x + col * pixel_width  + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// Scene rasters are north-up in practice: rotations zero, `pixel_height`
/// negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X of the upper-left corner of pixel (0, 0)
    pub origin_x: f64,
    /// Y of the upper-left corner of pixel (0, 0)
    pub origin_y: f64,
    /// Cell size along X
    pub pixel_width: f64,
    /// Cell size along Y, negative for north-up
    pub pixel_height: f64,
    /// Row rotation term, zero for north-up
    pub row_rotation: f64,
    /// Column rotation term, zero for north-up
    pub col_rotation: f64,
}

impl GeoTransform {
    /// North-up transform without rotation terms.
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// From a GDAL coefficient array
    /// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        Self {
            origin_x: coeffs[0],
            pixel_width: coeffs[1],
            row_rotation: coeffs[2],
            origin_y: coeffs[3],
            col_rotation: coeffs[4],
            pixel_height: coeffs[5],
        }
    }

    /// Geographic coordinates of a pixel's upper-left corner.
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.offset_to_geo(col as f64, row as f64)
    }

    /// Geographic coordinates of a pixel's center.
    ///
    /// Containment masking uses pixel centers: a pixel belongs to a parcel
    /// iff its center lies inside the polygon.
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.offset_to_geo(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Fractional pixel indices for a geographic coordinate.
    ///
    /// Use `.floor()` for the containing pixel. A degenerate transform
    /// yields NaN indices, which downstream bounds checks reject.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det.abs() < 1e-10 {
            return (f64::NAN, f64::NAN);
        }

        let dx = x - self.origin_x;
        let dy = y - self.origin_y;

        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;
        (col, row)
    }

    fn offset_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
