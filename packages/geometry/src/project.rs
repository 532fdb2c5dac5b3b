//! Spherical Web Mercator projection (EPSG:3857).
//!
//! Buffer radii and lot areas are specified in meters, so eligibility math
//! runs in Web Mercator and only the export step converts back to WGS84.
//! The sphere radius matches the EPSG:3857 definition; the projection is
//! undefined at the poles, which never matters for municipal data.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use geo::{Coord, MapCoords};

/// Sphere radius used by EPSG:3857, in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Projects a WGS84 coordinate (degrees) into Web Mercator (meters).
#[must_use]
pub fn forward(coord: Coord<f64>) -> Coord<f64> {
    Coord {
        x: EARTH_RADIUS_M * coord.x.to_radians(),
        y: EARTH_RADIUS_M * (FRAC_PI_4 + coord.y.to_radians() / 2.0).tan().ln(),
    }
}

/// Projects a Web Mercator coordinate (meters) back into WGS84 (degrees).
#[must_use]
pub fn inverse(coord: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (coord.x / EARTH_RADIUS_M).to_degrees(),
        y: (2.0_f64.mul_add((coord.y / EARTH_RADIUS_M).exp().atan(), -FRAC_PI_2)).to_degrees(),
    }
}

/// Reprojects every coordinate of a geometry into Web Mercator.
pub fn to_mercator<G>(geometry: &G) -> G
where
    G: MapCoords<f64, f64, Output = G>,
{
    geometry.map_coords(forward)
}

/// Reprojects every coordinate of a geometry back into WGS84.
pub fn to_wgs84<G>(geometry: &G) -> G
where
    G: MapCoords<f64, f64, Output = G>,
{
    geometry.map_coords(inverse)
}
