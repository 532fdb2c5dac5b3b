//! Stage orchestration for one pipeline run.
//!
//! `run` executes the fixed stage order: zoning rules, reference layers,
//! transit buffers, base sites, attribute joins, transit eligibility,
//! classification, yield estimation, neighborhood rollups. Stages
//! communicate only through the record types, so each one can be fed a
//! constructed input in tests.

use std::{
    collections::{BTreeMap, HashSet},
    fs::File,
    path::Path,
};

use etod_map_ingest::{LoadReport, assessed, layers, rules, sites, transit};
use etod_map_merge::{dedup_by_key, filter_status, union_eligible};
use etod_map_neighborhood::{footage_rollup, market_change, summarize};
use etod_map_site_models::{
    NeighborhoodBoundary, NeighborhoodSummary, SiteRecord, TransitChannel, TransitFeature,
    TransitGeometry,
};
use etod_map_spatial::{
    BufferLayer, PolygonLayer, buffer_transit_feature, filter_corridors, filter_municipality,
};
use etod_map_yield::YieldEstimator;
use etod_map_zoning::{RuleRegistry, categorize, is_buildable, is_single_family};

use crate::{PipelineConfig, PipelineError};

/// Everything a run produces, ready for export.
pub struct RunArtifacts {
    /// Eligible sites with their yield estimates.
    pub sites: Vec<SiteRecord>,
    /// Buffered transit features with TIF attribution.
    pub transit: Vec<TransitFeature>,
    /// Neighborhood signals; empty unless the run configures snapshots.
    pub neighborhoods: Vec<NeighborhoodSummary>,
    /// Load accounting for every table read.
    pub reports: Vec<LoadReport>,
}

/// Runs the full pipeline for one configuration against a directory of
/// input files.
///
/// # Errors
///
/// * `PipelineError::Config` if the configuration is inconsistent.
/// * `PipelineError::Ingest` / `Io` if an input file is missing or
///   malformed at the schema level.
/// * `PipelineError::Zoning` if the rule registry cannot be loaded.
pub fn run(config: &PipelineConfig, data_dir: &Path) -> Result<RunArtifacts, PipelineError> {
    config.validate()?;
    if !config.description.is_empty() {
        log::info!("run: {}", config.description);
    }

    let mut reports = Vec::new();

    let registry = load_registry(config, data_dir, &mut reports)?;
    let layers = load_reference_layers(config, data_dir, &mut reports)?;
    let transit = load_transit(config, data_dir, &layers.tif, &mut reports)?;
    let mut sites = load_sites(config, data_dir, &mut reports)?;

    annotate_sites(config, &layers, &mut sites);

    if !config.buildability.exclusions.is_empty() {
        let before = sites.len();
        sites.retain(|record| {
            record
                .zoning_code
                .as_deref()
                .is_none_or(|code| is_buildable(code, &config.buildability.exclusions))
        });
        log::info!(
            "buildability filter: {} of {before} sites remain",
            sites.len()
        );
    }

    // The rollup covers every candidate, not just the eligible ones, so a
    // neighborhood's total footage is independent of this run's transit
    // configuration.
    let footage_by_neighborhood = footage_rollup(&sites);

    let eligible = select_eligible(config, &transit, &sites);
    let mut eligible = filter_status(eligible, &config.terminal_statuses);

    classify_sites(config, &mut eligible);

    let estimator = YieldEstimator::new(&config.estimator, &registry);
    let eligible = estimator.run(eligible);

    let neighborhoods = summarize_neighborhoods(
        config,
        data_dir,
        &footage_by_neighborhood,
        &layers.neighborhood_boundaries,
        &mut reports,
    )?;

    log::info!(
        "run complete: {} eligible sites, {} transit features, {} neighborhood rows",
        eligible.len(),
        transit.len(),
        neighborhoods.len()
    );

    Ok(RunArtifacts {
        sites: eligible,
        transit,
        neighborhoods,
        reports,
    })
}

fn open_input(data_dir: &Path, name: &str) -> Result<File, PipelineError> {
    let path = data_dir.join(name);
    log::info!("reading {}", path.display());
    Ok(File::open(path)?)
}

/// Zoning rules from the tabular CSV when the run names one, otherwise
/// the embedded revision.
fn load_registry(
    config: &PipelineConfig,
    data_dir: &Path,
    reports: &mut Vec<LoadReport>,
) -> Result<RuleRegistry, PipelineError> {
    match &config.inputs.zoning_rules {
        Some(name) => {
            let loaded = rules::read_zoning_rules(open_input(data_dir, name)?)?;
            reports.push(loaded.report);
            let revision = Path::new(name)
                .file_stem()
                .map_or_else(|| name.clone(), |stem| stem.to_string_lossy().to_string());
            Ok(RuleRegistry::from_rules(&revision, loaded.records))
        }
        None => Ok(RuleRegistry::embedded(&config.rules_revision)?),
    }
}

/// The polygon reference layers a run joins against. Absent inputs build
/// as absent layers, and the joins that would use them are skipped.
struct ReferenceLayers {
    tif: PolygonLayer<String>,
    zoning: Option<PolygonLayer<String>>,
    neighborhoods: Option<PolygonLayer<String>>,
    neighborhood_boundaries: Vec<NeighborhoodBoundary>,
    adu: Option<PolygonLayer<String>>,
}

fn load_reference_layers(
    config: &PipelineConfig,
    data_dir: &Path,
    reports: &mut Vec<LoadReport>,
) -> Result<ReferenceLayers, PipelineError> {
    let tif = match &config.inputs.tif_districts {
        Some(name) => {
            let loaded = layers::read_tif_districts(open_input(data_dir, name)?)?;
            reports.push(loaded.report);
            PolygonLayer::build(
                loaded
                    .records
                    .into_iter()
                    .map(|district| (district.name, district.boundary)),
            )
        }
        None => PolygonLayer::build([]),
    };

    let zoning = match &config.inputs.zoning_districts {
        Some(name) => {
            let loaded = layers::read_zoning_districts(open_input(data_dir, name)?)?;
            reports.push(loaded.report);
            Some(PolygonLayer::build(
                loaded
                    .records
                    .into_iter()
                    .map(|district| (district.zone_class, district.boundary)),
            ))
        }
        None => None,
    };

    let (neighborhood_boundaries, neighborhoods) = match &config.inputs.neighborhoods {
        Some(name) => {
            let loaded = layers::read_neighborhoods(open_input(data_dir, name)?)?;
            reports.push(loaded.report);
            let layer = PolygonLayer::build(
                loaded
                    .records
                    .iter()
                    .map(|boundary| (boundary.primary.clone(), boundary.boundary.clone())),
            );
            (loaded.records, Some(layer))
        }
        None => (Vec::new(), None),
    };

    let adu = match &config.inputs.adu_areas {
        Some(name) => {
            let loaded = layers::read_adu_areas(open_input(data_dir, name)?)?;
            reports.push(loaded.report);
            Some(PolygonLayer::build(
                loaded
                    .records
                    .into_iter()
                    .map(|area| (area.name.unwrap_or_default(), area.boundary)),
            ))
        }
        None => None,
    };

    Ok(ReferenceLayers {
        tif,
        zoning,
        neighborhoods,
        neighborhood_boundaries,
        adu,
    })
}

/// Loads, filters, and buffers the transit features for every enabled
/// channel, attributing each to the TIF district it serves.
///
/// Stops join to a district by containment; corridors by intersection, so
/// a route crossing a district boundary still counts.
fn load_transit(
    config: &PipelineConfig,
    data_dir: &Path,
    tif: &PolygonLayer<String>,
    reports: &mut Vec<LoadReport>,
) -> Result<Vec<TransitFeature>, PipelineError> {
    let mut all = Vec::new();

    for channel in &config.modes {
        let Some(name) = config.inputs.for_channel(*channel) else {
            continue;
        };
        let loaded = match channel {
            TransitChannel::Rail => transit::read_rail_stops(open_input(data_dir, name)?)?,
            TransitChannel::Metra => transit::read_metra_stations(open_input(data_dir, name)?)?,
            TransitChannel::Bus => transit::read_bus_routes(open_input(data_dir, name)?)?,
        };
        reports.push(loaded.report);

        let mut features = loaded.records;
        if *channel == TransitChannel::Metra
            && let Some(municipality) = &config.municipality
        {
            features = filter_municipality(features, municipality);
        }
        if *channel == TransitChannel::Bus && !config.corridor_allow_list.is_empty() {
            features = filter_corridors(features, &config.corridor_allow_list);
        }

        let radius = config.radii.for_channel(*channel);
        for feature in &mut features {
            feature.buffer = Some(buffer_transit_feature(feature, radius));
            feature.tif_name = match &feature.geometry {
                TransitGeometry::Stop(point) => tif.locate(*point).cloned(),
                TransitGeometry::Corridor(lines) => tif.first_crossing(lines).cloned(),
            };
        }
        all.extend(features);
    }

    Ok(all)
}

/// Loads every configured site feed into one deduplicated candidate set.
fn load_sites(
    config: &PipelineConfig,
    data_dir: &Path,
    reports: &mut Vec<LoadReport>,
) -> Result<Vec<SiteRecord>, PipelineError> {
    let mut all = Vec::new();

    if let Some(name) = &config.inputs.city_land {
        let loaded = sites::read_city_land(open_input(data_dir, name)?)?;
        reports.push(loaded.report);
        all.extend(loaded.records);
    }
    if let Some(name) = &config.inputs.vacant_buildings {
        let loaded = sites::read_vacant_buildings(open_input(data_dir, name)?)?;
        reports.push(loaded.report);
        let mut records = loaded.records;
        apply_footage_supplements(config, data_dir, &mut records, reports)?;
        all.extend(records);
    }
    if let Some(name) = &config.inputs.sale_listings {
        let loaded = sites::read_sale_listings(open_input(data_dir, name)?)?;
        reports.push(loaded.report);
        all.extend(loaded.records);
    }

    Ok(dedup_by_key(all))
}

/// Fills missing footage on the vacant-building records: the assessor
/// rollup first, then the hand-collected supplement, which overrides the
/// rollup where both cover an address.
fn apply_footage_supplements(
    config: &PipelineConfig,
    data_dir: &Path,
    records: &mut [SiteRecord],
    reports: &mut Vec<LoadReport>,
) -> Result<(), PipelineError> {
    if let Some(name) = &config.inputs.address_footage {
        let (rollup, report) = sites::read_address_footage(open_input(data_dir, name)?)?;
        reports.push(report);
        let mut filled = 0usize;
        for record in records.iter_mut() {
            if record.square_footage.is_none()
                && let Some(footage) = rollup.get(&record.key)
            {
                record.square_footage = Some(*footage);
                filled += 1;
            }
        }
        log::info!("assessor rollup filled footage for {filled} sites");
    }

    if let Some(name) = &config.inputs.manual_footage {
        let (manual, report) = sites::read_manual_footage(open_input(data_dir, name)?)?;
        reports.push(report);
        let mut applied = 0usize;
        for record in records.iter_mut() {
            if let Some(entry) = manual.get(&record.key) {
                record.square_footage = Some(entry.square_footage);
                record.footage_imputed = entry.calculated;
                applied += 1;
            }
        }
        log::info!("hand-collected footage applied to {applied} sites");
    }

    Ok(())
}

/// Joins the reference layers onto every candidate site.
///
/// Zoning-district geometry is authoritative over any code the feed
/// carried; neighborhood names from the feed are kept and only filled
/// when absent. Sites that fall in no district keep `None` — a valid
/// state, not an error.
fn annotate_sites(config: &PipelineConfig, layers: &ReferenceLayers, records: &mut [SiteRecord]) {
    for record in records.iter_mut() {
        let Some(point) = record.geometry.representative_point() else {
            continue;
        };
        if let Some(zoning) = &layers.zoning
            && let Some(code) = zoning.locate(point)
        {
            record.zoning_code = Some(code.clone());
        }
        if record.neighborhood.is_none()
            && let Some(neighborhoods) = &layers.neighborhoods
            && let Some(name) = neighborhoods.locate(point)
        {
            record.neighborhood = Some(name.clone());
        }
        if config.adu_area_eligibility
            && let Some(adu) = &layers.adu
        {
            record.adu_eligible = adu.locate(point).is_some();
        }
        record.tif_name = layers.tif.locate(point).cloned();
    }
}

/// Selects the eligible set: sites inside a buffer of any enabled
/// channel, gated by TIF containment when the run requires it, plus sites
/// inside ADU areas when the run admits them regardless of transit.
fn select_eligible(
    config: &PipelineConfig,
    transit: &[TransitFeature],
    records: &[SiteRecord],
) -> Vec<SiteRecord> {
    let mut per_channel = Vec::new();
    for channel in &config.modes {
        let buffers = BufferLayer::build(*channel, transit);
        let hits: Vec<SiteRecord> = records
            .iter()
            .filter(|record| {
                record
                    .geometry
                    .representative_point()
                    .is_some_and(|point| buffers.contains(point))
            })
            .cloned()
            .map(|mut record| {
                record.eligible_channel = Some(*channel);
                record
            })
            .collect();
        log::info!("channel {channel}: {} sites inside buffers", hits.len());
        per_channel.push((*channel, hits));
    }

    let mut eligible = union_eligible(per_channel);

    if config.require_tif {
        let before = eligible.len();
        eligible.retain(|record| record.tif_name.is_some());
        log::info!(
            "TIF intersection: {} of {before} transit-eligible sites remain",
            eligible.len()
        );
    }

    if config.adu_area_eligibility {
        let present: HashSet<String> = eligible
            .iter()
            .map(|record| record.key.clone())
            .collect();
        let rescued: Vec<SiteRecord> = records
            .iter()
            .filter(|record| record.adu_eligible && !present.contains(&record.key))
            .cloned()
            .collect();
        if !rescued.is_empty() {
            log::info!("{} sites eligible through ADU areas alone", rescued.len());
        }
        eligible.extend(rescued);
    }

    eligible
}

/// Classifies each eligible record: single-family marker from the
/// observed code, re-zoning substitution where configured, then category
/// and the effective code the rule lookups will use.
fn classify_sites(config: &PipelineConfig, records: &mut [SiteRecord]) {
    for record in records.iter_mut() {
        let Some(code) = record.zoning_code.clone() else {
            continue;
        };
        record.single_family = is_single_family(&code);

        let effective = match &config.rezoning {
            Some(rezoning) => {
                let substitution =
                    rezoning.substitute(&code, record.eligible_channel.is_some());
                record.rezoned_for_adu = substitution.rezoned_for_adu;
                substitution.effective
            }
            None => code,
        };
        record.zone_category = categorize(&effective);
        record.effective_zoning = Some(effective);
    }
}

/// Builds the neighborhood table when the run configures assessed-value
/// snapshots. The footage rollup joins in whether or not a neighborhood
/// has a market-change entry.
fn summarize_neighborhoods(
    config: &PipelineConfig,
    data_dir: &Path,
    footage: &BTreeMap<String, f64>,
    boundaries: &[NeighborhoodBoundary],
    reports: &mut Vec<LoadReport>,
) -> Result<Vec<NeighborhoodSummary>, PipelineError> {
    let Some((earlier, later)) = config.snapshot_years else {
        return Ok(Vec::new());
    };
    let Some(name) = &config.inputs.assessed_values else {
        return Ok(Vec::new());
    };

    let loaded = assessed::read_assessed_values(open_input(data_dir, name)?)?;
    reports.push(loaded.report);
    let changes = market_change(&loaded.records, earlier, later);

    Ok(summarize(&changes, footage, boundaries))
}
