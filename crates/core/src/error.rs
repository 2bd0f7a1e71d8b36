//! Error types shared across the workspace crates.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("grid data does not fit {rows} rows x {cols} cols")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("cell ({row}, {col}) outside grid of {rows}x{cols}")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("band shapes differ: {expected:?} vs {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("parcel '{id}' rejected: {reason}")]
    InvalidParcel { id: String, reason: String },

    #[error("GeoJSON error: {0}")]
    GeoJson(String),

    #[error("GDAL error: {0}")]
    #[cfg(feature = "gdal")]
    Gdal(String),

    #[error("bad value for {name} ({value}): {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "gdal")]
impl From<gdal::errors::GdalError> for Error {
    fn from(e: gdal::errors::GdalError) -> Self {
        Error::Gdal(e.to_string())
    }
}

impl From<geojson::Error> for Error {
    fn from(e: geojson::Error) -> Self {
        Error::GeoJson(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
