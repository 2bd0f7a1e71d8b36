//! # pondwatch core
//!
//! Core types for the pondwatch water-transition detector.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced grid type used for band imagery
//!   and classification rasters
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `CRS`: Coordinate Reference System handling
//! - `Parcel`: A pond polygon with identity and representative point
//! - GeoTIFF reading and point sampling (behind the `gdal` feature)

pub mod crs;
pub mod error;
#[cfg(feature = "gdal")]
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use vector::{Parcel, ParcelSet};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::vector::{Parcel, ParcelSet};
}
