//! Parsers for the geometry encodings that show up in source feeds.
//!
//! Feeds are inconsistent about shape types: the city land inventory mixes
//! `POLYGON` and `MULTIPOLYGON` in the same column, and bus corridors mix
//! `LINESTRING` and `MULTILINESTRING`. The shape-specific parsers here
//! normalize to the multi variant so downstream code handles one type.

use geo::{Geometry, MultiLineString, MultiPolygon, Point, Polygon};
use wkt::TryFromWkt;

use crate::GeometryError;

/// Parses any WKT geometry.
///
/// # Errors
///
/// * If the text is not valid WKT.
pub fn parse_wkt(raw: &str) -> Result<Geometry<f64>, GeometryError> {
    Geometry::try_from_wkt_str(raw.trim()).map_err(|e| GeometryError::Wkt(e.to_string()))
}

/// Parses a WKT `POLYGON` or `MULTIPOLYGON`, normalizing to `MultiPolygon`.
///
/// # Errors
///
/// * If the text is not valid WKT.
/// * If the WKT is a non-areal shape.
pub fn parse_wkt_multi_polygon(raw: &str) -> Result<MultiPolygon<f64>, GeometryError> {
    match parse_wkt(raw)? {
        Geometry::Polygon(polygon) => Ok(MultiPolygon::new(vec![polygon])),
        Geometry::MultiPolygon(multi) => Ok(multi),
        other => Err(GeometryError::UnexpectedShape {
            expected: "POLYGON or MULTIPOLYGON",
            found: shape_name(&other),
        }),
    }
}

/// Parses a WKT `LINESTRING` or `MULTILINESTRING`, normalizing to
/// `MultiLineString`.
///
/// # Errors
///
/// * If the text is not valid WKT.
/// * If the WKT is not a line shape.
pub fn parse_wkt_multi_line(raw: &str) -> Result<MultiLineString<f64>, GeometryError> {
    match parse_wkt(raw)? {
        Geometry::LineString(line) => Ok(MultiLineString::new(vec![line])),
        Geometry::MultiLineString(multi) => Ok(multi),
        other => Err(GeometryError::UnexpectedShape {
            expected: "LINESTRING or MULTILINESTRING",
            found: shape_name(&other),
        }),
    }
}

/// Parses a WKT `POINT`.
///
/// # Errors
///
/// * If the text is not valid WKT.
/// * If the WKT is not a point.
pub fn parse_wkt_point(raw: &str) -> Result<Point<f64>, GeometryError> {
    match parse_wkt(raw)? {
        Geometry::Point(point) => Ok(point),
        other => Err(GeometryError::UnexpectedShape {
            expected: "POINT",
            found: shape_name(&other),
        }),
    }
}

/// Parses a `"(lat, lon)"` tuple as published in the transit stop feeds.
///
/// Note the feed order: latitude first. The returned point is `(lon, lat)`
/// like every other geometry in the pipeline.
///
/// # Errors
///
/// * If the tuple is missing either component or a component is not a
///   number.
pub fn parse_location_tuple(raw: &str) -> Result<Point<f64>, GeometryError> {
    let inner = raw
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| GeometryError::CoordinateTuple(raw.to_string()))?;

    let mut parts = inner.splitn(2, ',');
    let lat = parse_component(parts.next(), raw)?;
    let lon = parse_component(parts.next(), raw)?;

    Ok(Point::new(lon, lat))
}

fn parse_component(part: Option<&str>, raw: &str) -> Result<f64, GeometryError> {
    part.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeometryError::CoordinateTuple(raw.to_string()))
}

/// Builds a point from separate longitude/latitude columns.
///
/// Returns `None` when either component is absent or zero. A coordinate of
/// exactly zero in a Chicago feed is a placeholder for missing data, not a
/// real location.
#[must_use]
pub fn point_from_lon_lat(lon: Option<f64>, lat: Option<f64>) -> Option<Point<f64>> {
    let lon = lon.filter(|x| *x != 0.0)?;
    let lat = lat.filter(|y| *y != 0.0)?;
    Some(Point::new(lon, lat))
}

/// Collapses a polygon into the pipeline's canonical `MultiPolygon`.
#[must_use]
pub fn into_multi_polygon(polygon: Polygon<f64>) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon])
}

const fn shape_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "POINT",
        Geometry::Line(_) | Geometry::LineString(_) => "LINESTRING",
        Geometry::Polygon(_) => "POLYGON",
        Geometry::MultiPoint(_) => "MULTIPOINT",
        Geometry::MultiLineString(_) => "MULTILINESTRING",
        Geometry::MultiPolygon(_) => "MULTIPOLYGON",
        Geometry::GeometryCollection(_) => "GEOMETRYCOLLECTION",
        Geometry::Rect(_) => "RECT",
        Geometry::Triangle(_) => "TRIANGLE",
    }
}
