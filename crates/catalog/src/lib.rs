//! # pondwatch catalog
//!
//! STAC (SpatioTemporal Asset Catalog) access for pondwatch.
//!
//! Searches Planetary Computer (default) or any STAC API endpoint for
//! captures intersecting a parcel, with bounded retries and SAS href
//! signing, and converts STAC items into [`Capture`] records that the
//! detection engine consumes.

pub mod blocking;
pub mod capture;
pub mod error;
pub mod stac_client;
pub mod stac_models;

pub use blocking::StacClientBlocking;
pub use capture::{Capture, BAND_BLUE, BAND_NIR, BAND_SWIR1, BAND_SWIR2, REQUIRED_BANDS};
pub use error::{CatalogError, Result};
pub use stac_client::{StacCatalog, StacClient, StacClientOptions};
pub use stac_models::{StacItem, StacItemCollection, StacSearchParams};
