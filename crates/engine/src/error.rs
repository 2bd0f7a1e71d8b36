//! Error types for the detection engine.

use thiserror::Error;

/// Errors produced by the detection engine.
///
/// Missing-data outcomes (no transition, no preceding epoch, no-data class
/// sample) are not errors; they are `None` values in the respective results.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("catalog error: {0}")]
    Catalog(#[from] pondwatch_catalog::CatalogError),

    #[error("core error: {0}")]
    Core(#[from] pondwatch_core::Error),

    #[error("band read failed for capture '{capture_id}' band '{band}': {reason}")]
    BandRead {
        capture_id: String,
        band: String,
        reason: String,
    },

    #[error("classification sample failed at epoch {epoch_year}: {reason}")]
    ClassSample { epoch_year: i32, reason: String },
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
