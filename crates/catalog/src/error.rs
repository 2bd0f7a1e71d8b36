//! Error types for the catalog client.

use thiserror::Error;

/// Errors produced by STAC catalog access.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("malformed capture '{id}': {reason}")]
    MalformedCapture { id: String, reason: String },
}

/// Result alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
