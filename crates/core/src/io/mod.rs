//! Parcel-clipped band reads and point sampling (GDAL-backed)

mod gdal_io;

pub use gdal_io::{read_band_clipped, sample_class_code};
