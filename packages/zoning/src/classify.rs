//! Pure string classification of zoning codes.

use etod_map_zoning_models::ZoneCategory;
use serde::{Deserialize, Serialize};

/// Marker substring identifying single-family codes (`RS-1` through `RS-3`).
pub const SINGLE_FAMILY_MARKER: &str = "RS-";

/// Prefixes tried in order; first match wins.
const CATEGORY_PREFIXES: &[(&str, ZoneCategory)] = &[
    ("B", ZoneCategory::Business),
    ("C", ZoneCategory::Commercial),
    ("D", ZoneCategory::Downtown),
    ("PD", ZoneCategory::PlannedDevelopment),
    ("R", ZoneCategory::Residential),
];

/// Collapses a zoning code into its coarse category.
///
/// Unmatched codes (manufacturing, open space, transportation) come back as
/// [`ZoneCategory::Unknown`].
#[must_use]
pub fn categorize(code: &str) -> ZoneCategory {
    let code = code.trim();
    CATEGORY_PREFIXES
        .iter()
        .find(|(prefix, _)| code.starts_with(prefix))
        .map_or(ZoneCategory::Unknown, |(_, category)| *category)
}

/// Whether a code permits residential development at all.
///
/// The exclusion markers are matched by substring containment because
/// sub-codes embed their base code (`PMD 4` contains `PMD`, `C3-2` contains
/// `C3`).
#[must_use]
pub fn is_buildable(code: &str, exclusions: &[String]) -> bool {
    let code = code.trim();
    !exclusions.iter().any(|marker| code.contains(marker.as_str()))
}

/// Whether a code carries the single-family marker.
#[must_use]
pub fn is_single_family(code: &str) -> bool {
    code.contains(SINGLE_FAMILY_MARKER)
}

/// Re-zoning substitutions applied before rule lookup in the
/// building-rehab variant.
///
/// Planned developments have negotiated, per-site density that the rule
/// table cannot express, so they are treated as a standard business code.
/// Single-family codes on transit-eligible sites are treated as the
/// two/three-flat code the ADU ordinance would permit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RezoningRules {
    /// Replacement code for planned developments.
    pub planned_development_to: String,
    /// Codes eligible for the single-family substitution.
    pub single_family_codes: Vec<String>,
    /// Replacement code for those, applied only on transit-eligible sites.
    pub single_family_to: String,
}

/// Outcome of a substitution: the code rule lookups should use, and
/// whether the single-family re-zoning path was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub effective: String,
    pub rezoned_for_adu: bool,
}

impl RezoningRules {
    /// Applies the substitutions to one code.
    #[must_use]
    pub fn substitute(&self, code: &str, transit_eligible: bool) -> Substitution {
        let code = code.trim();
        if categorize(code) == ZoneCategory::PlannedDevelopment {
            return Substitution {
                effective: self.planned_development_to.clone(),
                rezoned_for_adu: false,
            };
        }
        if transit_eligible && self.single_family_codes.iter().any(|c| c == code) {
            return Substitution {
                effective: self.single_family_to.clone(),
                rezoned_for_adu: true,
            };
        }
        Substitution {
            effective: code.to_string(),
            rezoned_for_adu: false,
        }
    }
}
