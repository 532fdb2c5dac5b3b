#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Zoning category taxonomy and zoning rule types.
//!
//! Zoning codes are short strings like `RS-3`, `B1-3`, or `PD 1380`. This
//! crate defines the coarse category every code collapses into and the
//! per-code rule entry (floor area ratio, minimum lot area per unit) used by
//! the unit yield model.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Coarse zoning category derived from a zoning code prefix.
///
/// Prefixes are tested in declaration order and the first match wins, so
/// `PD` must be checked before a bare `P` would be. Codes matching no prefix
/// fall through to [`ZoneCategory::Unknown`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum ZoneCategory {
    /// `B` codes: neighborhood business districts.
    Business,
    /// `C` codes: commercial districts.
    Commercial,
    /// `D` codes: downtown districts.
    Downtown,
    /// `PD` codes: negotiated planned developments.
    #[serde(rename = "Planned Development")]
    #[strum(serialize = "Planned Development")]
    PlannedDevelopment,
    /// `R` codes: residential districts.
    Residential,
    /// Anything that matched no known prefix.
    #[default]
    Unknown,
}

impl ZoneCategory {
    /// Whether the ground floor of this category is assumed non-residential.
    ///
    /// Business and commercial districts reserve street level for retail, so
    /// the yield model deducts it from the residential floor area.
    #[must_use]
    pub const fn deducts_ground_floor(self) -> bool {
        matches!(self, Self::Business | Self::Commercial)
    }
}

/// Density parameters for one zoning code.
///
/// Either field may be absent: the published rule table does not cover every
/// code, and a missing value is a valid state the yield model fills with its
/// own defaults rather than an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoningRule {
    /// Floor area ratio: buildable floor area per square foot of lot.
    pub far: Option<f64>,
    /// Minimum lot area required per dwelling unit, in square feet.
    pub lot_area_per_unit: Option<f64>,
}
