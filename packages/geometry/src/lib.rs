#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Geometry normalization for the ETOD map pipeline.
//!
//! Every upstream feed encodes location differently: WKT columns, GeoJSON
//! geometries, `"(lat, lon)"` tuples, or bare lon/lat column pairs. This
//! crate parses each of those into `geo` types, tags them with the CRS they
//! are expressed in, and reprojects between WGS84 and Web Mercator so that
//! buffering and area math always happen in meters.

use geo::MapCoords;
use thiserror::Error;

pub mod parse;
pub mod project;

/// Coordinate reference systems the pipeline moves geometries between.
///
/// Source feeds arrive in [`Crs::Wgs84`]. Buffer and area operations are
/// only valid in [`Crs::WebMercator`], where coordinate units are meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    /// EPSG:4326, coordinates in decimal degrees.
    Wgs84,
    /// EPSG:3857, spherical Mercator, coordinates in meters.
    WebMercator,
}

impl Crs {
    #[must_use]
    pub const fn epsg(self) -> u32 {
        match self {
            Self::Wgs84 => 4326,
            Self::WebMercator => 3857,
        }
    }
}

/// A geometry paired with the CRS its coordinates are expressed in.
///
/// Keeping the tag next to the geometry makes it impossible to buffer in
/// degrees by accident: [`CrsGeometry::to_mercator`] is a no-op when the
/// geometry is already projected.
#[derive(Debug, Clone, PartialEq)]
pub struct CrsGeometry<G> {
    pub crs: Crs,
    pub geometry: G,
}

impl<G> CrsGeometry<G>
where
    G: MapCoords<f64, f64, Output = G> + Clone,
{
    pub const fn wgs84(geometry: G) -> Self {
        Self {
            crs: Crs::Wgs84,
            geometry,
        }
    }

    pub const fn web_mercator(geometry: G) -> Self {
        Self {
            crs: Crs::WebMercator,
            geometry,
        }
    }

    /// Reprojects into Web Mercator if not already there.
    #[must_use]
    pub fn to_mercator(&self) -> Self {
        match self.crs {
            Crs::WebMercator => self.clone(),
            Crs::Wgs84 => Self {
                crs: Crs::WebMercator,
                geometry: project::to_mercator(&self.geometry),
            },
        }
    }

    /// Reprojects back into WGS84 if not already there.
    #[must_use]
    pub fn to_wgs84(&self) -> Self {
        match self.crs {
            Crs::Wgs84 => self.clone(),
            Crs::WebMercator => Self {
                crs: Crs::Wgs84,
                geometry: project::to_wgs84(&self.geometry),
            },
        }
    }
}

/// Errors raised while normalizing source geometries.
///
/// These are row-level errors: the pipeline counts and skips the offending
/// record rather than aborting the run.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// The WKT text failed to parse at all.
    #[error("invalid WKT: {0}")]
    Wkt(String),
    /// The WKT parsed, but into a shape the caller cannot use.
    #[error("expected {expected} geometry, found {found}")]
    UnexpectedShape {
        expected: &'static str,
        found: &'static str,
    },
    /// A `"(lat, lon)"` tuple was missing, truncated, or non-numeric.
    #[error("malformed coordinate tuple: {0:?}")]
    CoordinateTuple(String),
}
