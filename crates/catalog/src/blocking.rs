//! Blocking (synchronous) API for native callers.
//!
//! Wraps the async [`StacClient`](crate::StacClient) with a Tokio runtime so
//! the per-parcel detection loop doesn't need to manage its own async
//! runtime.

use crate::capture::Capture;
use crate::error::{CatalogError, Result};
use crate::stac_client::{StacCatalog, StacClient, StacClientOptions};
use crate::stac_models::{StacItem, StacItemCollection, StacSearchParams};

/// Blocking wrapper around [`StacClient`].
///
/// Uses an internal single-threaded Tokio runtime.
pub struct StacClientBlocking {
    rt: tokio::runtime::Runtime,
    inner: StacClient,
}

impl StacClientBlocking {
    /// Create a new blocking STAC client.
    pub fn new(catalog: StacCatalog, options: StacClientOptions) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let inner = StacClient::new(catalog, options)?;

        Ok(Self { rt, inner })
    }

    /// Execute a single search request (blocking).
    pub fn search(&self, params: &StacSearchParams) -> Result<StacItemCollection> {
        self.rt.block_on(self.inner.search(params))
    }

    /// Paginated search (blocking).
    pub fn search_all(&self, params: &StacSearchParams) -> Result<Vec<StacItem>> {
        self.rt.block_on(self.inner.search_all(params))
    }

    /// Paginated search converted straight to capture records (blocking).
    ///
    /// Unusable items (no datetime, no cloud cover, no footprint) are
    /// dropped here; the selector applies the admissibility filters proper.
    pub fn search_captures(&self, params: &StacSearchParams) -> Result<Vec<Capture>> {
        let items = self.search_all(params)?;
        Ok(Capture::from_items(&items))
    }

    /// Sign an asset href if the catalog requires it (blocking).
    pub fn sign_asset_href(&self, href: &str) -> Result<String> {
        self.rt.block_on(self.inner.sign_asset_href(href))
    }
}
