//! Run configuration and the embedded presets.
//!
//! A preset is a complete run description: which transit channels confer
//! eligibility, which input files feed each stage, and the parameters of
//! the yield model. The two shipped presets cover the city-land and
//! building-rehab variants; a TOML file in the same shape loads through
//! [`PipelineConfig::from_path`] for everything else.

use std::path::Path;

use etod_map_site_models::TransitChannel;
use etod_map_yield::YieldConfig;
use etod_map_zoning::RezoningRules;
use serde::{Deserialize, Serialize};

use crate::PipelineError;

/// Run configurations embedded at compile time.
const PRESET_TOMLS: &[(&str, &str)] = &[
    ("city-land", include_str!("../presets/city_land.toml")),
    ("building-rehab", include_str!("../presets/building_rehab.toml")),
];

/// Buffer radii in meters, by channel. Buffering happens in Web Mercator,
/// where these distances are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferRadii {
    #[serde(default = "default_station_radius")]
    pub rail: f64,
    #[serde(default = "default_station_radius")]
    pub metra: f64,
    #[serde(default = "default_corridor_radius")]
    pub bus: f64,
}

impl BufferRadii {
    /// Radius for one channel.
    #[must_use]
    pub const fn for_channel(&self, channel: TransitChannel) -> f64 {
        match channel {
            TransitChannel::Rail => self.rail,
            TransitChannel::Metra => self.metra,
            TransitChannel::Bus => self.bus,
        }
    }
}

impl Default for BufferRadii {
    fn default() -> Self {
        Self {
            rail: default_station_radius(),
            metra: default_station_radius(),
            bus: default_corridor_radius(),
        }
    }
}

/// Zoning codes barred from residential development.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buildability {
    /// Substring markers; a site whose code contains any marker is
    /// dropped. An empty list disables the filter.
    #[serde(default)]
    pub exclusions: Vec<String>,
}

/// Input filenames, resolved against the run's data directory.
///
/// Every entry is optional; a preset names the files its stages need and
/// [`PipelineConfig::validate`] checks that the combination is coherent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFiles {
    pub tif_districts: Option<String>,
    pub city_land: Option<String>,
    pub vacant_buildings: Option<String>,
    pub sale_listings: Option<String>,
    pub rail_stops: Option<String>,
    pub metra_stations: Option<String>,
    pub bus_routes: Option<String>,
    pub zoning_districts: Option<String>,
    pub neighborhoods: Option<String>,
    pub adu_areas: Option<String>,
    pub assessed_values: Option<String>,
    pub address_footage: Option<String>,
    pub manual_footage: Option<String>,
    pub zoning_rules: Option<String>,
}

impl InputFiles {
    /// The filename feeding one transit channel, if configured.
    #[must_use]
    pub fn for_channel(&self, channel: TransitChannel) -> Option<&str> {
        match channel {
            TransitChannel::Rail => self.rail_stops.as_deref(),
            TransitChannel::Metra => self.metra_stations.as_deref(),
            TransitChannel::Bus => self.bus_routes.as_deref(),
        }
    }
}

/// Full description of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Human-readable summary, logged at run start.
    #[serde(default)]
    pub description: String,
    /// Transit channels that confer eligibility.
    pub modes: Vec<TransitChannel>,
    /// Keep only commuter-rail stations published with this municipality.
    /// Stations with a blank cell are dropped; the other feeds never carry
    /// the attribute and are not filtered.
    #[serde(default)]
    pub municipality: Option<String>,
    /// Bus routes that confer eligibility. Empty keeps every route.
    #[serde(default)]
    pub corridor_allow_list: Vec<String>,
    /// Transit eligibility additionally requires the site inside a TIF
    /// district.
    #[serde(default = "default_require_tif")]
    pub require_tif: bool,
    /// Sites inside an ADU area are eligible regardless of transit.
    #[serde(default)]
    pub adu_area_eligibility: bool,
    /// Drop sites whose published status matches one of these exactly.
    #[serde(default)]
    pub terminal_statuses: Vec<String>,
    /// Embedded zoning-rule revision, used unless `inputs.zoning_rules`
    /// names a tabular rules file.
    #[serde(default = "default_rules_revision")]
    pub rules_revision: String,
    /// Earlier and later assessed-value snapshot years for the
    /// market-change signal.
    #[serde(default)]
    pub snapshot_years: Option<(u16, u16)>,
    #[serde(default)]
    pub radii: BufferRadii,
    #[serde(default)]
    pub buildability: Buildability,
    /// Code substitutions applied before rule lookup; absent means codes
    /// are looked up as observed.
    #[serde(default)]
    pub rezoning: Option<RezoningRules>,
    pub inputs: InputFiles,
    #[serde(rename = "yield")]
    pub estimator: YieldConfig,
}

impl PipelineConfig {
    /// Loads an embedded preset by name.
    ///
    /// # Errors
    ///
    /// * `PipelineError::UnknownPreset` if no preset has that name.
    /// * Whatever [`Self::from_toml_str`] raises for the preset text (a
    ///   packaging defect, caught by the preset tests).
    pub fn preset(name: &str) -> Result<Self, PipelineError> {
        let (_, raw) = PRESET_TOMLS
            .iter()
            .find(|(preset, _)| *preset == name)
            .ok_or_else(|| PipelineError::UnknownPreset(name.to_string()))?;

        Self::from_toml_str(raw)
    }

    /// Names of all embedded presets.
    #[must_use]
    pub fn preset_names() -> Vec<&'static str> {
        PRESET_TOMLS.iter().map(|(name, _)| *name).collect()
    }

    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// * `PipelineError::Parse` if the text is not a valid config.
    /// * `PipelineError::Config` if the pieces do not fit together.
    pub fn from_toml_str(raw: &str) -> Result<Self, PipelineError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a TOML file on disk.
    ///
    /// # Errors
    ///
    /// * If the file cannot be read, parsed, or validated.
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?;
        log::info!("run config from {}", path.display());
        Ok(config)
    }

    /// Checks that every enabled stage has the inputs it needs.
    ///
    /// # Errors
    ///
    /// * `PipelineError::Config` naming the first inconsistency found.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.modes.is_empty() {
            return Err(PipelineError::Config(
                "at least one transit mode is required".to_string(),
            ));
        }
        let mut channels = self.modes.clone();
        channels.sort_unstable();
        channels.dedup();
        if channels.len() != self.modes.len() {
            return Err(PipelineError::Config(
                "transit modes must not repeat".to_string(),
            ));
        }
        for channel in &self.modes {
            if self.inputs.for_channel(*channel).is_none() {
                return Err(PipelineError::Config(format!(
                    "mode {channel} is enabled but no input file is named for it"
                )));
            }
        }
        if self.inputs.city_land.is_none()
            && self.inputs.vacant_buildings.is_none()
            && self.inputs.sale_listings.is_none()
        {
            return Err(PipelineError::Config(
                "no site input file is named".to_string(),
            ));
        }
        if self.require_tif && self.inputs.tif_districts.is_none() {
            return Err(PipelineError::Config(
                "require_tif is set but no TIF district file is named".to_string(),
            ));
        }
        if self.adu_area_eligibility && self.inputs.adu_areas.is_none() {
            return Err(PipelineError::Config(
                "adu_area_eligibility is set but no ADU area file is named".to_string(),
            ));
        }
        if let Some((earlier, later)) = self.snapshot_years {
            if self.inputs.assessed_values.is_none() {
                return Err(PipelineError::Config(
                    "snapshot_years is set but no assessed-value file is named".to_string(),
                ));
            }
            if earlier >= later {
                return Err(PipelineError::Config(format!(
                    "snapshot years must be ascending, got {earlier} and {later}"
                )));
            }
        }
        Ok(())
    }
}

const fn default_require_tif() -> bool {
    true
}

fn default_rules_revision() -> String {
    "chicago-2025".to_string()
}

/// Half mile in meters.
const fn default_station_radius() -> f64 {
    804.67
}

/// Quarter mile in meters.
const fn default_corridor_radius() -> f64 {
    402.335
}
