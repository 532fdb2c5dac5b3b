#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Record types shared across the ETOD map pipeline.
//!
//! A [`SiteRecord`] is one candidate development site: a city-owned parcel
//! in the land variant, a vacant or for-sale building in the rehab variant.
//! Transit features and the immutable reference layers (TIF districts,
//! zoning districts, neighborhood boundaries, ADU areas) live here too so
//! that every stage of the pipeline speaks the same types.
//!
//! All stored geometry is WGS84 (EPSG:4326). Stages that need metric math
//! reproject internally and convert back before handing records on.

use etod_map_zoning_models::ZoneCategory;
use geo::{Centroid, MultiLineString, MultiPolygon, Point};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Transit service type a site can be eligible through.
///
/// Variants are declared in precedence order: when a site falls inside
/// buffers of several channels, the earliest variant wins, so sorting
/// ascending puts rail first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransitChannel {
    /// City rapid-transit ('L') stops, half-mile buffers.
    Rail,
    /// Commuter-rail stations, half-mile buffers.
    Metra,
    /// High-frequency bus corridors, quarter-mile buffers.
    Bus,
}

/// Estimated housing units for a site.
///
/// Never negative and never fractional. `Unknown` means the model could not
/// produce an estimate even after imputation; it is reported as such, never
/// collapsed to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnitCount {
    /// A resolved estimate.
    Units(u32),
    /// No estimate could be made.
    #[default]
    Unknown,
}

impl UnitCount {
    #[must_use]
    pub const fn units(self) -> Option<u32> {
        match self {
            Self::Units(n) => Some(n),
            Self::Unknown => None,
        }
    }

    #[must_use]
    pub const fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl From<u32> for UnitCount {
    fn from(units: u32) -> Self {
        Self::Units(units)
    }
}

impl std::fmt::Display for UnitCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Units(n) => write!(f, "{n}"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Location of a candidate site.
///
/// Source feeds publish sites as points; the parcel variant exists for
/// feeds that carry full footprints.
#[derive(Debug, Clone, PartialEq)]
pub enum SiteGeometry {
    Point(Point<f64>),
    Parcel(MultiPolygon<f64>),
}

impl SiteGeometry {
    /// The point used for containment tests: the location itself, or the
    /// parcel centroid. `None` only for an empty parcel geometry.
    #[must_use]
    pub fn representative_point(&self) -> Option<Point<f64>> {
        match self {
            Self::Point(point) => Some(*point),
            Self::Parcel(parcel) => parcel.centroid(),
        }
    }
}

/// One candidate development site, carried through every pipeline stage.
///
/// Ingest fills the identity and raw attributes; the spatial, zoning, and
/// yield stages fill the derived ones. Stages copy records forward rather
/// than mutating shared state, so a populated field is always final.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteRecord {
    /// Dedup key: parcel ID for land, uppercased street address for
    /// buildings.
    pub key: String,
    pub address: Option<String>,
    /// Property or listing status as published (e.g. `"Sold"`).
    pub status: Option<String>,
    /// Site location, WGS84.
    pub geometry: SiteGeometry,
    /// Zoning code as observed in the source or joined from the zoning
    /// district layer.
    pub zoning_code: Option<String>,
    /// Zoning code after re-zoning substitution; equals `zoning_code` when
    /// no substitution applies. Rule lookups use this one.
    pub effective_zoning: Option<String>,
    pub zone_category: ZoneCategory,
    /// Code carries the single-family marker.
    pub single_family: bool,
    /// Single-family code was substituted with the two/three-flat code.
    pub rezoned_for_adu: bool,
    /// Channel that made the site transit-eligible, highest precedence
    /// first. `None` means not eligible.
    pub eligible_channel: Option<TransitChannel>,
    /// Site falls inside an area where accessory dwelling units are
    /// permitted.
    pub adu_eligible: bool,
    /// Containing TIF district, if any. No assignment is a valid state.
    pub tif_name: Option<String>,
    pub neighborhood: Option<String>,
    /// Resolved usable square footage. `None` until resolution, and after
    /// it only if no source field and no fallback covered the code.
    pub square_footage: Option<f64>,
    /// Floor area judged available for residential use by the yield model.
    pub residential_square_footage: Option<f64>,
    /// Square footage came from a fallback constant, not an observed value.
    pub footage_imputed: bool,
    pub estimated_units: UnitCount,
}

impl SiteRecord {
    /// A fresh record with identity and location only; every derived
    /// attribute starts empty.
    #[must_use]
    pub fn new(key: impl Into<String>, geometry: SiteGeometry) -> Self {
        Self {
            key: key.into(),
            address: None,
            status: None,
            geometry,
            zoning_code: None,
            effective_zoning: None,
            zone_category: ZoneCategory::Unknown,
            single_family: false,
            rezoned_for_adu: false,
            eligible_channel: None,
            adu_eligible: false,
            tif_name: None,
            neighborhood: None,
            square_footage: None,
            residential_square_footage: None,
            footage_imputed: false,
            estimated_units: UnitCount::Unknown,
        }
    }
}

/// Geometry of a transit feature: a station point or a route line.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitGeometry {
    Stop(Point<f64>),
    Corridor(MultiLineString<f64>),
}

/// One rail stop, metra station, or bus corridor.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitFeature {
    pub channel: TransitChannel,
    /// Station name or route identifier.
    pub name: String,
    /// Feature geometry, WGS84.
    pub geometry: TransitGeometry,
    /// Only metra stations carry one; used for the municipal filter.
    pub municipality: Option<String>,
    /// Walkable buffer around the feature, WGS84. Filled by the spatial
    /// stage at the channel's radius.
    pub buffer: Option<MultiPolygon<f64>>,
    /// TIF district the feature's buffer intersects, if any.
    pub tif_name: Option<String>,
}

impl TransitFeature {
    #[must_use]
    pub const fn new(channel: TransitChannel, name: String, geometry: TransitGeometry) -> Self {
        Self {
            channel,
            name,
            geometry,
            municipality: None,
            buffer: None,
            tif_name: None,
        }
    }
}

/// Tax-increment-financing district polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct TifDistrict {
    pub name: String,
    pub use_category: Option<String>,
    /// District boundary, WGS84.
    pub boundary: MultiPolygon<f64>,
}

/// Zoning district polygon with its zone class code.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoningDistrict {
    pub zone_class: String,
    pub boundary: MultiPolygon<f64>,
}

/// Named neighborhood boundary polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborhoodBoundary {
    pub primary: String,
    pub secondary: Option<String>,
    pub boundary: MultiPolygon<f64>,
}

/// Area where accessory dwelling units are permitted.
#[derive(Debug, Clone, PartialEq)]
pub struct AduArea {
    pub name: Option<String>,
    pub boundary: MultiPolygon<f64>,
}

/// One assessed-value snapshot row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessedValue {
    pub neighborhood: String,
    pub year: u16,
    pub assessed_total: f64,
}

/// Per-neighborhood output row: market-change signal plus buildable
/// square-footage rollup. Either signal may be absent for a neighborhood.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborhoodSummary {
    pub name: String,
    /// Percent change in mean assessed value between the two snapshot
    /// years. Absent when the neighborhood appears in only one snapshot.
    pub percent_change: Option<f64>,
    /// Sum of resolved square footage across the neighborhood's sites.
    pub total_square_footage: Option<f64>,
    /// Boundary polygon, WGS84, when the name matched the boundary layer.
    pub boundary: Option<MultiPolygon<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sort_order_is_precedence_order() {
        let mut channels = vec![
            TransitChannel::Bus,
            TransitChannel::Rail,
            TransitChannel::Metra,
        ];
        channels.sort();

        assert_eq!(
            channels,
            vec![
                TransitChannel::Rail,
                TransitChannel::Metra,
                TransitChannel::Bus,
            ]
        );
    }

    #[test]
    fn channel_round_trips_through_strings() {
        use std::str::FromStr;

        assert_eq!(TransitChannel::Rail.to_string(), "rail");
        assert_eq!(
            TransitChannel::from_str("metra").unwrap(),
            TransitChannel::Metra
        );
    }

    #[test]
    fn unit_count_display() {
        assert_eq!(UnitCount::Units(4).to_string(), "4");
        assert_eq!(UnitCount::Unknown.to_string(), "unknown");
        assert_eq!(UnitCount::from(2).units(), Some(2));
        assert!(UnitCount::Unknown.is_unknown());
    }

    #[test]
    fn parcel_representative_point_is_the_centroid() {
        use geo::polygon;

        let parcel = SiteGeometry::Parcel(MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ]]));

        let point = parcel.representative_point().expect("non-empty parcel");
        assert!((point.x() - 1.0).abs() < 1e-12);
        assert!((point.y() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn new_record_has_no_derived_attributes() {
        let record = SiteRecord::new("ABC-123", SiteGeometry::Point(Point::new(-87.6, 41.9)));

        assert_eq!(record.key, "ABC-123");
        assert!(record.eligible_channel.is_none());
        assert!(record.tif_name.is_none());
        assert!(!record.footage_imputed);
        assert!(record.estimated_units.is_unknown());
    }
}
