//! Capture records derived from STAC items.
//!
//! A capture is one satellite scene with the metadata the detection engine
//! needs: acquisition time, cloud cover, footprint geometry and band hrefs.
//! Items missing any of these are not usable evidence and are dropped at
//! conversion time.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Utc};
use geo_types::Geometry;

use crate::error::{CatalogError, Result};
use crate::stac_models::StacItem;

/// Asset key of the blue band.
pub const BAND_BLUE: &str = "blue";
/// Asset key of the near-infrared band.
pub const BAND_NIR: &str = "nir08";
/// Asset key of the 1.6 µm shortwave-infrared band.
pub const BAND_SWIR1: &str = "swir16";
/// Asset key of the 2.2 µm shortwave-infrared band.
pub const BAND_SWIR2: &str = "swir22";

/// The four bands the water index needs. A capture lacking any of them is
/// excluded from evidence, not partially used.
pub const REQUIRED_BANDS: [&str; 4] = [BAND_BLUE, BAND_NIR, BAND_SWIR1, BAND_SWIR2];

/// One satellite capture usable as evidence for a parcel.
#[derive(Debug, Clone)]
pub struct Capture {
    /// STAC item id.
    pub id: String,
    /// Acquisition timestamp.
    pub datetime: DateTime<Utc>,
    /// Cloud cover percentage, 0–100.
    pub cloud_cover: f64,
    /// Scene footprint in WGS84.
    pub footprint: Geometry<f64>,
    /// Band asset key → href.
    pub bands: HashMap<String, String>,
}

impl Capture {
    /// Calendar year of acquisition.
    pub fn year(&self) -> i32 {
        self.datetime.year()
    }

    /// Href for a band asset, if present.
    pub fn band_href(&self, band: &str) -> Option<&str> {
        self.bands.get(band).map(String::as_str)
    }

    /// Whether all four index bands are present.
    pub fn has_required_bands(&self) -> bool {
        REQUIRED_BANDS.iter().all(|b| self.bands.contains_key(*b))
    }

    /// Convert one STAC item into a capture.
    ///
    /// Fails when the item lacks a parseable datetime, cloud-cover metadata
    /// or a footprint geometry — all three are preconditions for admissible
    /// evidence.
    pub fn from_item(item: &StacItem) -> Result<Self> {
        let malformed = |reason: &str| CatalogError::MalformedCapture {
            id: item.id.clone(),
            reason: reason.to_string(),
        };

        let datetime_str = item
            .properties
            .datetime
            .as_deref()
            .ok_or_else(|| malformed("missing datetime"))?;
        let datetime = DateTime::parse_from_rfc3339(datetime_str)
            .map_err(|e| malformed(&format!("unparseable datetime: {e}")))?
            .with_timezone(&Utc);

        let cloud_cover = item
            .properties
            .eo_cloud_cover
            .ok_or_else(|| malformed("missing eo:cloud_cover"))?;

        let geometry_value = item
            .geometry
            .clone()
            .ok_or_else(|| malformed("missing footprint geometry"))?;
        let geojson_geom: geojson::Geometry = serde_json::from_value(geometry_value)
            .map_err(|e| malformed(&format!("invalid footprint GeoJSON: {e}")))?;
        let footprint: Geometry<f64> = geojson_geom
            .try_into()
            .map_err(|e: geojson::Error| malformed(&format!("invalid footprint: {e}")))?;

        let bands = item
            .assets
            .iter()
            .map(|(key, asset)| (key.clone(), asset.href.clone()))
            .collect();

        Ok(Self {
            id: item.id.clone(),
            datetime,
            cloud_cover,
            footprint,
            bands,
        })
    }

    /// Convert a batch of STAC items, silently dropping unusable ones.
    pub fn from_items(items: &[StacItem]) -> Vec<Self> {
        items.iter().filter_map(|i| Self::from_item(i).ok()).collect()
    }
}
