//! Parcel types
//!
//! A parcel is one pond-shaped polygon of interest. Parcels are the only
//! long-lived entity in a detection run: the same geometry feeds capture
//! selection, band masking and classification sampling.

use geo::{Area, Centroid};
use geo_types::{Geometry, Point, Polygon};

use crate::crs::CRS;
use crate::error::{Error, Result};

/// A pond parcel: identity plus polygon geometry in a known CRS.
#[derive(Debug, Clone)]
pub struct Parcel {
    /// Unique parcel identifier
    pub id: String,
    /// Polygon geometry
    pub geometry: Polygon<f64>,
    /// Coordinate reference system of the geometry
    pub crs: CRS,
}

impl Parcel {
    /// Create a parcel, validating that the geometry is non-empty.
    pub fn new(id: impl Into<String>, geometry: Polygon<f64>, crs: CRS) -> Result<Self> {
        let id = id.into();
        if geometry.exterior().0.len() < 4 {
            return Err(Error::InvalidParcel {
                id,
                reason: "polygon exterior has fewer than 4 coordinates".to_string(),
            });
        }
        Ok(Self { id, geometry, crs })
    }

    /// Representative point for point-sampling: the polygon centroid.
    ///
    /// Centroid sampling is deliberately point-based, not an areal majority
    /// vote; accuracy degrades for large or irregular parcels.
    pub fn representative_point(&self) -> Point<f64> {
        self.geometry
            .centroid()
            .unwrap_or_else(|| Point::new(f64::NAN, f64::NAN))
    }

    /// Planar area in CRS units (squared degrees for WGS84 input).
    pub fn area(&self) -> f64 {
        self.geometry.unsigned_area()
    }
}

/// An ordered collection of parcels loaded from one input file.
#[derive(Debug, Clone, Default)]
pub struct ParcelSet {
    pub parcels: Vec<Parcel>,
}

impl ParcelSet {
    pub fn new() -> Self {
        Self {
            parcels: Vec::new(),
        }
    }

    pub fn push(&mut self, parcel: Parcel) {
        self.parcels.push(parcel);
    }

    pub fn len(&self) -> usize {
        self.parcels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parcel> {
        self.parcels.iter()
    }

    /// Parse a GeoJSON FeatureCollection of pond polygons.
    ///
    /// Each feature must carry a polygon geometry; the parcel id is taken
    /// from the `pond_id` property, falling back to the feature id, falling
    /// back to the feature's position in the collection. Features with
    /// non-polygon or missing geometry are rejected, not silently dropped.
    pub fn from_geojson(s: &str) -> Result<Self> {
        let geojson: geojson::GeoJson = s
            .parse()
            .map_err(|e: geojson::Error| Error::GeoJson(e.to_string()))?;

        let collection = match geojson {
            geojson::GeoJson::FeatureCollection(fc) => fc,
            _ => {
                return Err(Error::GeoJson(
                    "expected a FeatureCollection of pond polygons".to_string(),
                ))
            }
        };

        let mut set = ParcelSet::new();
        for (idx, feature) in collection.features.into_iter().enumerate() {
            let id = feature
                .property("pond_id")
                .map(property_to_string)
                .or_else(|| feature.id.as_ref().map(feature_id_to_string))
                .unwrap_or_else(|| idx.to_string());

            let geometry = feature.geometry.ok_or_else(|| Error::InvalidParcel {
                id: id.clone(),
                reason: "feature has no geometry".to_string(),
            })?;

            let geom: Geometry<f64> = geometry.try_into()?;
            let polygon = match geom {
                Geometry::Polygon(p) => p,
                other => {
                    return Err(Error::InvalidParcel {
                        id,
                        reason: format!("expected Polygon, got {:?}", kind_of(&other)),
                    })
                }
            };

            set.push(Parcel::new(id, polygon, CRS::wgs84())?);
        }

        Ok(set)
    }
}

impl IntoIterator for ParcelSet {
    type Item = Parcel;
    type IntoIter = std::vec::IntoIter<Parcel>;

    fn into_iter(self) -> Self::IntoIter {
        self.parcels.into_iter()
    }
}

fn property_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn feature_id_to_string(id: &geojson::feature::Id) -> String {
    match id {
        geojson::feature::Id::String(s) => s.clone(),
        geojson::feature::Id::Number(n) => n.to_string(),
    }
}

fn kind_of(g: &Geometry<f64>) -> &'static str {
    match g {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{polygon, Coord, LineString};

    fn square(x0: f64, y0: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]
    }

    #[test]
    fn test_centroid() {
        let parcel = Parcel::new("p1", square(0.0, 0.0, 2.0), CRS::wgs84()).unwrap();
        let c = parcel.representative_point();
        assert!((c.x() - 1.0).abs() < 1e-12);
        assert!((c.y() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_polygon_rejected() {
        let open = Polygon::new(
            LineString(vec![
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 1.0, y: 0.0 },
            ]),
            vec![],
        );
        assert!(Parcel::new("bad", open, CRS::wgs84()).is_err());
    }

    #[test]
    fn test_from_geojson() {
        let gj = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"pond_id": "P-42"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[77.0, 13.0], [77.01, 13.0], [77.01, 13.01], [77.0, 13.01], [77.0, 13.0]]]
                }
            }]
        }"#;

        let set = ParcelSet::from_geojson(gj).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.parcels[0].id, "P-42");
        assert!(set.parcels[0].crs.is_wgs84());
    }

    #[test]
    fn test_from_geojson_rejects_points() {
        let gj = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"pond_id": "P-1"},
                "geometry": {"type": "Point", "coordinates": [77.0, 13.0]}
            }]
        }"#;
        assert!(ParcelSet::from_geojson(gj).is_err());
    }
}
