//! serde models for STAC Item Search.
//!
//! Covers the subset of the STAC API that capture selection needs:
//! `intersects` geometry filtering, datetime ranges, collections,
//! pagination links, and band asset hrefs. Everything else rides along in
//! `extra` maps so round-tripping a page for POST pagination is lossless.

use geo_types::Polygon;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Body for `POST /search` (STAC API Item Search).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StacSearchParams {
    /// GeoJSON geometry the captures must intersect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intersects: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Pagination token for the next page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl StacSearchParams {
    pub fn new() -> Self {
        Self {
            intersects: None,
            datetime: None,
            collections: None,
            limit: None,
            token: None,
        }
    }

    /// Filter to captures intersecting a parcel polygon (WGS84).
    pub fn intersects_polygon(mut self, polygon: &Polygon<f64>) -> Self {
        let geometry = geojson::Geometry::from(polygon);
        self.intersects = serde_json::to_value(&geometry).ok();
        self
    }

    /// Datetime instant or `start/end` range, e.g. `"1999-05-01/2024-12-31"`.
    pub fn datetime(mut self, dt: &str) -> Self {
        self.datetime = Some(dt.to_string());
        self
    }

    pub fn collections(mut self, cols: &[String]) -> Self {
        self.collections = Some(cols.to_vec());
        self
    }

    /// Items per page.
    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }
}

impl Default for StacSearchParams {
    fn default() -> Self {
        Self::new()
    }
}

/// One page of search results (a GeoJSON FeatureCollection of items).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemCollection {
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<StacItem>,

    #[serde(default)]
    pub links: Vec<StacLink>,

    #[serde(rename = "numberMatched", skip_serializing_if = "Option::is_none")]
    pub number_matched: Option<u64>,

    #[serde(rename = "numberReturned", skip_serializing_if = "Option::is_none")]
    pub number_returned: Option<u64>,
}

impl StacItemCollection {
    /// The `rel="next"` pagination link, when more pages exist.
    pub fn next_link(&self) -> Option<&StacLink> {
        self.links.iter().find(|l| l.rel == "next")
    }

    pub fn has_next(&self) -> bool {
        self.next_link().is_some()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A single STAC Item: one satellite scene.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItem {
    #[serde(rename = "type")]
    pub type_: String,

    pub id: String,

    /// Scene footprint as raw GeoJSON geometry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<serde_json::Value>,

    /// `[west, south, east, north]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    pub properties: StacItemProperties,

    pub assets: HashMap<String, StacAsset>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    #[serde(default)]
    pub links: Vec<StacLink>,
}

impl StacItem {
    pub fn asset(&self, key: &str) -> Option<&StacAsset> {
        self.assets.get(key)
    }
}

/// Item properties the selector cares about; the rest is kept raw.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemProperties {
    /// ISO 8601 acquisition datetime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    /// Cloud cover percentage from the EO extension.
    #[serde(rename = "eo:cloud_cover", skip_serializing_if = "Option::is_none")]
    pub eo_cloud_cover: Option<f64>,

    /// Platform, e.g. "landsat-8" or "sentinel-2a".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A STAC asset: one band file reference.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacAsset {
    pub href: String,

    /// Media type.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// `["data"]`, `["thumbnail"]`, ...
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A STAC link, used here for pagination.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacLink {
    /// `"self"`, `"next"`, `"prev"`, ...
    pub rel: String,

    pub href: String,

    /// HTTP method; `"next"` links are commonly POST.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Request body for POST pagination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,

    /// When true, overlay `body` on the previous request body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    const FIXTURE: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "id": "LC08_L2SP_144051_20160710_02_T1",
      "geometry": {
        "type": "Polygon",
        "coordinates": [[[76.2, 12.1], [78.4, 12.1], [78.4, 14.2], [76.2, 14.2], [76.2, 12.1]]]
      },
      "bbox": [76.2, 12.1, 78.4, 14.2],
      "properties": {
        "datetime": "2016-07-10T05:06:21.123456Z",
        "eo:cloud_cover": 4.8,
        "platform": "landsat-8",
        "proj:epsg": 32644
      },
      "assets": {
        "blue": {
          "href": "https://example.com/B02.tif",
          "type": "image/tiff; application=geotiff; profile=cloud-optimized",
          "roles": ["data"]
        },
        "nir08": {
          "href": "https://example.com/B05.tif",
          "type": "image/tiff; application=geotiff; profile=cloud-optimized",
          "roles": ["data"]
        },
        "swir16": {
          "href": "https://example.com/B06.tif",
          "roles": ["data"]
        },
        "swir22": {
          "href": "https://example.com/B07.tif",
          "roles": ["data"]
        }
      },
      "collection": "landsat-c2-l2",
      "links": []
    }
  ],
  "links": [
    {
      "rel": "next",
      "href": "https://planetarycomputer.microsoft.com/api/stac/v1/search",
      "method": "POST",
      "body": {"token": "next:abc123"},
      "merge": true
    }
  ],
  "numberMatched": 17,
  "numberReturned": 1
}"#;

    #[test]
    fn deserializes_search_page() {
        let col: StacItemCollection = serde_json::from_str(FIXTURE).unwrap();
        assert_eq!(col.type_, "FeatureCollection");
        assert_eq!(col.len(), 1);
        assert_eq!(col.number_matched, Some(17));
    }

    #[test]
    fn scene_properties_with_extension_fields() {
        let col: StacItemCollection = serde_json::from_str(FIXTURE).unwrap();
        let props = &col.features[0].properties;
        assert_eq!(props.datetime.as_deref(), Some("2016-07-10T05:06:21.123456Z"));
        assert!((props.eo_cloud_cover.unwrap() - 4.8).abs() < f64::EPSILON);
        assert_eq!(props.platform.as_deref(), Some("landsat-8"));
        assert!(props.extra.contains_key("proj:epsg"));
    }

    #[test]
    fn band_asset_lookup() {
        let col: StacItemCollection = serde_json::from_str(FIXTURE).unwrap();
        let item = &col.features[0];

        for band in ["blue", "nir08", "swir16", "swir22"] {
            assert!(item.asset(band).is_some(), "missing band asset {band}");
        }
        assert!(item.asset("thermal").is_none());
        assert_eq!(item.asset("blue").unwrap().href, "https://example.com/B02.tif");
    }

    #[test]
    fn next_page_link() {
        let col: StacItemCollection = serde_json::from_str(FIXTURE).unwrap();
        assert!(col.has_next());

        let next = col.next_link().unwrap();
        assert_eq!(next.method.as_deref(), Some("POST"));
        assert_eq!(next.merge, Some(true));
    }

    #[test]
    fn builder_serializes_intersects() {
        let pond = polygon![
            (x: 77.0, y: 13.0),
            (x: 77.01, y: 13.0),
            (x: 77.01, y: 13.01),
            (x: 77.0, y: 13.01),
            (x: 77.0, y: 13.0),
        ];

        let params = StacSearchParams::new()
            .intersects_polygon(&pond)
            .datetime("1999-05-01/2024-12-31")
            .collections(&["landsat-c2-l2".to_string(), "sentinel-2-l2a".to_string()])
            .limit(100);

        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["intersects"]["type"], "Polygon");
        assert_eq!(json["datetime"], "1999-05-01/2024-12-31");
        assert_eq!(
            json["collections"],
            serde_json::json!(["landsat-c2-l2", "sentinel-2-l2a"])
        );
        assert_eq!(json["limit"], 100);
        assert!(json.get("token").is_none());
    }

    #[test]
    fn empty_params_serialize_to_empty_object() {
        let json = serde_json::to_value(StacSearchParams::new()).unwrap();
        assert!(json.as_object().unwrap().is_empty());
    }
}
