//! GeoTIFF reading and point sampling using GDAL
//!
//! Band hrefs may be local paths or remote URLs; remote COGs are read
//! through GDAL's `/vsicurl/` virtual filesystem.

use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use gdal::Dataset;
use geo::Contains;
use geo_types::{Coord, LineString, Point, Polygon};

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};

/// Read one band clipped to a parcel polygon.
///
/// The polygon is given in WGS84 and reprojected into the raster's own CRS
/// before masking. The returned raster covers the polygon's pixel window;
/// pixels whose centers fall outside the polygon are NaN, never zero.
pub fn read_band_clipped(href: &str, parcel_wgs84: &Polygon<f64>) -> Result<Raster<f64>> {
    let dataset = Dataset::open(vsi_path(href))?;
    let rasterband = dataset.rasterband(1)?;

    let gt = GeoTransform::from_gdal(
        dataset
            .geo_transform()
            .map_err(|e| Error::Gdal(e.to_string()))?,
    );

    let polygon = reproject_polygon(parcel_wgs84, &dataset)?;

    // Pixel window covering the polygon bounds
    let (min_x, min_y, max_x, max_y) = polygon_bounds(&polygon);
    let (c0, r0) = gt.geo_to_pixel(min_x, max_y);
    let (c1, r1) = gt.geo_to_pixel(max_x, min_y);

    let (total_cols, total_rows) = dataset.raster_size();
    let col_off = c0.floor().max(0.0) as usize;
    let row_off = r0.floor().max(0.0) as usize;
    let col_end = (c1.ceil() as isize).clamp(0, total_cols as isize) as usize;
    let row_end = (r1.ceil() as isize).clamp(0, total_rows as isize) as usize;

    if col_end <= col_off || row_end <= row_off {
        return Err(Error::InvalidParameter {
            name: "parcel",
            value: format!("({min_x}, {min_y}, {max_x}, {max_y})"),
            reason: "polygon does not intersect the raster extent".to_string(),
        });
    }

    let win_cols = col_end - col_off;
    let win_rows = row_end - row_off;

    let buffer = rasterband.read_as::<f64>(
        (col_off as isize, row_off as isize),
        (win_cols, win_rows),
        (win_cols, win_rows),
        None,
    )?;

    let source_nodata: Option<f64> = rasterband.no_data_value();

    // Window geotransform: shift the origin by the window offset
    let (origin_x, origin_y) = gt.pixel_to_geo_corner(col_off, row_off);
    let mut window_gt = gt;
    window_gt.origin_x = origin_x;
    window_gt.origin_y = origin_y;

    let mut raster = Raster::from_vec(buffer.data().to_vec(), win_rows, win_cols)?;
    raster.set_transform(window_gt);
    raster.set_crs(dataset_crs(&dataset));
    raster.set_nodata(Some(f64::NAN));

    // Mask: pixels outside the parcel are undefined, not zero
    for row in 0..win_rows {
        for col in 0..win_cols {
            let v = unsafe { raster.get_unchecked(row, col) };
            let is_source_nodata = match source_nodata {
                Some(nd) => v.is_nan() || (v - nd).abs() < f64::EPSILON,
                None => v.is_nan(),
            };
            let (x, y) = window_gt.pixel_to_geo(col, row);
            if is_source_nodata || !polygon.contains(&Point::new(x, y)) {
                raster.set(row, col, f64::NAN)?;
            }
        }
    }

    Ok(raster)
}

/// Sample a classification raster at a single WGS84 point.
///
/// Returns `None` when the point falls outside the raster or hits the
/// no-data code (0 by the classification rasters' convention).
pub fn sample_class_code(path: &str, point: Point<f64>) -> Result<Option<i32>> {
    let dataset = Dataset::open(vsi_path(path))?;
    let rasterband = dataset.rasterband(1)?;

    let gt = GeoTransform::from_gdal(
        dataset
            .geo_transform()
            .map_err(|e| Error::Gdal(e.to_string()))?,
    );

    let (x, y) = reproject_point(point, &dataset)?;
    let (col_f, row_f) = gt.geo_to_pixel(x, y);
    let (total_cols, total_rows) = dataset.raster_size();

    if col_f < 0.0 || row_f < 0.0 {
        return Ok(None);
    }
    let (col, row) = (col_f.floor() as usize, row_f.floor() as usize);
    if col >= total_cols || row >= total_rows {
        return Ok(None);
    }

    let buffer = rasterband.read_as::<i32>((col as isize, row as isize), (1, 1), (1, 1), None)?;
    let code = buffer.data()[0];

    let nodata = rasterband.no_data_value().map(|nd| nd as i32).unwrap_or(0);
    if code == nodata {
        return Ok(None);
    }
    Ok(Some(code))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn vsi_path(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        format!("/vsicurl/{}", href)
    } else {
        href.to_string()
    }
}

fn dataset_crs(dataset: &Dataset) -> Option<CRS> {
    let srs = dataset.spatial_ref().ok()?;
    if let Ok(code) = srs.auth_code() {
        return Some(CRS::from_epsg(code as u32));
    }
    srs.to_wkt().ok().map(CRS::from_wkt)
}

fn wgs84_to_dataset_transform(dataset: &Dataset) -> Result<CoordTransform> {
    let mut src = SpatialRef::from_epsg(4326)?;
    src.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    let mut dst = dataset.spatial_ref()?;
    dst.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    Ok(CoordTransform::new(&src, &dst)?)
}

fn reproject_polygon(polygon: &Polygon<f64>, dataset: &Dataset) -> Result<Polygon<f64>> {
    let transform = wgs84_to_dataset_transform(dataset)?;

    let exterior = &polygon.exterior().0;
    let mut xs: Vec<f64> = exterior.iter().map(|c| c.x).collect();
    let mut ys: Vec<f64> = exterior.iter().map(|c| c.y).collect();
    let mut zs = vec![0.0; xs.len()];
    transform.transform_coords(&mut xs, &mut ys, &mut zs)?;

    let coords: Vec<Coord<f64>> = xs
        .into_iter()
        .zip(ys)
        .map(|(x, y)| Coord { x, y })
        .collect();

    Ok(Polygon::new(LineString(coords), vec![]))
}

fn reproject_point(point: Point<f64>, dataset: &Dataset) -> Result<(f64, f64)> {
    let srs = dataset.spatial_ref()?;
    if let Ok(code) = srs.auth_code() {
        if code == 4326 {
            return Ok((point.x(), point.y()));
        }
    }
    let transform = wgs84_to_dataset_transform(dataset)?;
    let mut xs = [point.x()];
    let mut ys = [point.y()];
    let mut zs = [0.0];
    transform.transform_coords(&mut xs, &mut ys, &mut zs)?;
    Ok((xs[0], ys[0]))
}

fn polygon_bounds(polygon: &Polygon<f64>) -> (f64, f64, f64, f64) {
    let mut min_x = f64::MAX;
    let mut min_y = f64::MAX;
    let mut max_x = f64::MIN;
    let mut max_y = f64::MIN;
    for c in &polygon.exterior().0 {
        min_x = min_x.min(c.x);
        min_y = min_y.min(c.y);
        max_x = max_x.max(c.x);
        max_y = max_y.max(c.y);
    }
    (min_x, min_y, max_x, max_y)
}
