//! Coordinate reference system tags

use serde::{Deserialize, Serialize};
use std::fmt;

/// A coordinate reference system, identified by EPSG code or WKT.
///
/// Parcels arrive in WGS84 by convention; scene rasters carry their own
/// CRS (UTM zones for Landsat and Sentinel-2). This type only tags data
/// with its reference — reprojection is the raster reader's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    wkt: Option<String>,
    epsg: Option<u32>,
}

impl CRS {
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
        }
    }

    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
        }
    }

    /// Geographic WGS84 (EPSG:4326), the parcel input convention.
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    pub fn is_wgs84(&self) -> bool {
        self.epsg == Some(4326)
    }

    /// Short display identifier, `EPSG:nnnn` when the code is known.
    pub fn identifier(&self) -> String {
        match (&self.epsg, &self.wkt) {
            (Some(code), _) => format!("EPSG:{code}"),
            (None, Some(wkt)) => format!("WKT:{}", &wkt[..wkt.len().min(50)]),
            (None, None) => "Unknown".to_string(),
        }
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}
