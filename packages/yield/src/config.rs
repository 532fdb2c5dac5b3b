//! Yield model parameters.
//!
//! Everything here is run configuration, deserialized from the preset or
//! config TOML. The constants embedded in the defaults are the ordinance
//! revision the model was calibrated against; presets override them where
//! the two run variants differ.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Which footage semantics the run uses.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum YieldVariant {
    /// Footage is lot area: apply the rentable ratio, then always scale by
    /// FAR.
    Land,
    /// Footage is building floor area: used directly when observed, scaled
    /// by FAR only when it came from a fallback constant.
    Building,
}

/// One square-footage fallback rule: codes it covers and the substituted
/// value.
///
/// A rule matches by exact code or by code prefix; the first matching rule
/// in the list wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootageFallback {
    #[serde(default)]
    pub codes: Vec<String>,
    #[serde(default)]
    pub prefixes: Vec<String>,
    pub square_footage: f64,
}

impl FootageFallback {
    fn matches(&self, code: &str) -> bool {
        self.codes.iter().any(|c| c == code)
            || self.prefixes.iter().any(|p| code.starts_with(p.as_str()))
    }
}

/// FAR forced to a fixed value for a set of codes, superseding the rule
/// table. Used for the Connected Communities sub-codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarOverride {
    pub codes: Vec<String>,
    pub far: f64,
}

/// Full parameter set for one run of the yield model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldConfig {
    pub variant: YieldVariant,
    /// Share of a raw land parcel treated as rentable.
    #[serde(default = "default_rentable_ratio")]
    pub rentable_ratio: f64,
    /// Footage multiplier for single-family sites inside an ADU area
    /// (building variant only).
    #[serde(default = "default_adu_bonus")]
    pub adu_bonus: f64,
    /// Residential share of floor area in business/commercial districts
    /// (building variant only).
    #[serde(default = "default_building_residential_ratio")]
    pub building_residential_ratio: f64,
    #[serde(default)]
    pub far_override: Option<FarOverride>,
    #[serde(default)]
    pub fallbacks: Vec<FootageFallback>,
    /// Floor on the average unit size used for the division.
    #[serde(default = "default_min_unit_size")]
    pub min_unit_size: f64,
    /// Remove sites that yield zero units from the output set.
    #[serde(default = "default_drop_zero_yield")]
    pub drop_zero_yield: bool,
    /// Unit cap for single-family sites re-zoned to the two/three-flat
    /// code.
    #[serde(default = "default_adu_unit_cap")]
    pub adu_unit_cap: u32,
}

impl YieldConfig {
    /// Fallback square footage for a code, if any rule covers it.
    #[must_use]
    pub fn fallback_for(&self, code: &str) -> Option<f64> {
        self.fallbacks
            .iter()
            .find(|rule| rule.matches(code))
            .map(|rule| rule.square_footage)
    }

    /// FAR for a code: the override when the code is in its set, else the
    /// table value passed in.
    #[must_use]
    pub fn far_for(&self, code: &str, table_far: Option<f64>) -> Option<f64> {
        if let Some(over) = &self.far_override
            && over.codes.iter().any(|c| c == code)
        {
            return Some(over.far);
        }
        table_far
    }
}

const fn default_rentable_ratio() -> f64 {
    0.8
}

const fn default_adu_bonus() -> f64 {
    1.2
}

const fn default_building_residential_ratio() -> f64 {
    0.75
}

const fn default_min_unit_size() -> f64 {
    720.0
}

const fn default_drop_zero_yield() -> bool {
    true
}

const fn default_adu_unit_cap() -> u32 {
    4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_matches_exact_codes_and_prefixes() {
        let config = YieldConfig {
            variant: YieldVariant::Land,
            rentable_ratio: 0.8,
            adu_bonus: 1.2,
            building_residential_ratio: 0.75,
            far_override: None,
            fallbacks: vec![
                FootageFallback {
                    codes: vec!["RS-1".to_string()],
                    prefixes: Vec::new(),
                    square_footage: 5000.0,
                },
                FootageFallback {
                    codes: Vec::new(),
                    prefixes: vec!["RT".to_string(), "RM".to_string()],
                    square_footage: 1321.0,
                },
            ],
            min_unit_size: 720.0,
            drop_zero_yield: true,
            adu_unit_cap: 4,
        };

        assert_eq!(config.fallback_for("RS-1"), Some(5000.0));
        assert_eq!(config.fallback_for("RT-4"), Some(1321.0));
        assert_eq!(config.fallback_for("RM-5.5"), Some(1321.0));
        assert_eq!(config.fallback_for("B3-2"), None);
    }

    #[test]
    fn far_override_supersedes_the_table() {
        let config = YieldConfig {
            variant: YieldVariant::Building,
            rentable_ratio: 0.8,
            adu_bonus: 1.2,
            building_residential_ratio: 0.75,
            far_override: Some(FarOverride {
                codes: vec!["B1-3".to_string(), "C1-3".to_string()],
                far: 4.0,
            }),
            fallbacks: Vec::new(),
            min_unit_size: 720.0,
            drop_zero_yield: true,
            adu_unit_cap: 4,
        };

        assert_eq!(config.far_for("B1-3", Some(3.0)), Some(4.0));
        assert_eq!(config.far_for("B2-2", Some(2.2)), Some(2.2));
        assert_eq!(config.far_for("B2-2", None), None);
    }

    #[test]
    fn variant_round_trips_through_strings() {
        use std::str::FromStr;

        assert_eq!(YieldVariant::Land.to_string(), "land");
        assert_eq!(
            YieldVariant::from_str("building").unwrap(),
            YieldVariant::Building
        );
    }
}
