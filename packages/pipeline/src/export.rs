//! Artifact export.
//!
//! A run produces map overlay layers (GeoJSON) and flat tables (CSV):
//! the eligible sites both ways, one walkshed layer per transit channel,
//! and the neighborhood table when the run built one. Neighborhood rows
//! without a matched boundary stay in the CSV but are left out of the
//! GeoJSON, which only carries renderable features.
//!
//! Every file is staged under a `.tmp` name and renamed into place only
//! after all of them have been written, so an interrupted export never
//! leaves a partial layer set behind.

use std::path::Path;

use etod_map_site_models::{
    NeighborhoodSummary, SiteGeometry, SiteRecord, TransitChannel, TransitFeature,
};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde::Serialize;

use crate::{PipelineError, stages::RunArtifacts};

const CHANNEL_ORDER: [TransitChannel; 3] = [
    TransitChannel::Rail,
    TransitChannel::Metra,
    TransitChannel::Bus,
];

/// Writes every artifact of a run into `output_dir`, creating it if
/// needed.
///
/// # Errors
///
/// * `PipelineError::Io` if a file cannot be staged or renamed.
/// * `PipelineError::Json` / `Csv` if serialization fails.
pub fn write_outputs(artifacts: &RunArtifacts, output_dir: &Path) -> Result<(), PipelineError> {
    std::fs::create_dir_all(output_dir)?;

    let mut files: Vec<(String, Vec<u8>)> = Vec::new();

    files.push((
        "sites.geojson".to_string(),
        serde_json::to_vec(&sites_collection(&artifacts.sites))?,
    ));
    files.push(("sites.csv".to_string(), sites_csv(&artifacts.sites)?));

    for channel in CHANNEL_ORDER {
        let collection = transit_collection(channel, &artifacts.transit);
        if collection.features.is_empty() {
            continue;
        }
        files.push((
            format!("transit_{channel}.geojson"),
            serde_json::to_vec(&collection)?,
        ));
    }

    if !artifacts.neighborhoods.is_empty() {
        files.push((
            "neighborhoods.geojson".to_string(),
            serde_json::to_vec(&neighborhood_collection(&artifacts.neighborhoods))?,
        ));
        files.push((
            "neighborhoods.csv".to_string(),
            neighborhoods_csv(&artifacts.neighborhoods)?,
        ));
    }

    for (name, contents) in &files {
        let tmp = output_dir.join(format!("{name}.tmp"));
        std::fs::write(&tmp, contents)?;
    }
    for (name, _) in &files {
        let tmp = output_dir.join(format!("{name}.tmp"));
        let path = output_dir.join(name);
        std::fs::rename(&tmp, &path)?;
        log::info!("wrote {}", path.display());
    }

    Ok(())
}

fn text(value: Option<&str>) -> serde_json::Value {
    value.map_or(serde_json::Value::Null, Into::into)
}

fn number(value: Option<f64>) -> serde_json::Value {
    value.map_or(serde_json::Value::Null, serde_json::Value::from)
}

fn sites_collection(records: &[SiteRecord]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: records.iter().map(site_feature).collect(),
        foreign_members: None,
    }
}

fn site_feature(record: &SiteRecord) -> Feature {
    let geometry = match &record.geometry {
        SiteGeometry::Point(point) => Geometry::new(geojson::Value::from(point)),
        SiteGeometry::Parcel(parcel) => Geometry::new(geojson::Value::from(parcel)),
    };

    let mut properties = JsonObject::new();
    properties.insert("key".to_string(), record.key.as_str().into());
    properties.insert("address".to_string(), text(record.address.as_deref()));
    properties.insert("status".to_string(), text(record.status.as_deref()));
    properties.insert(
        "zoningCode".to_string(),
        text(record.zoning_code.as_deref()),
    );
    properties.insert(
        "effectiveZoning".to_string(),
        text(record.effective_zoning.as_deref()),
    );
    properties.insert(
        "zoneCategory".to_string(),
        record.zone_category.to_string().into(),
    );
    properties.insert("singleFamily".to_string(), record.single_family.into());
    properties.insert("rezonedForAdu".to_string(), record.rezoned_for_adu.into());
    properties.insert(
        "eligibleChannel".to_string(),
        record
            .eligible_channel
            .map_or(serde_json::Value::Null, |channel| {
                channel.to_string().into()
            }),
    );
    properties.insert("aduEligible".to_string(), record.adu_eligible.into());
    properties.insert("tifName".to_string(), text(record.tif_name.as_deref()));
    properties.insert(
        "neighborhood".to_string(),
        text(record.neighborhood.as_deref()),
    );
    properties.insert(
        "squareFootage".to_string(),
        number(record.square_footage),
    );
    properties.insert(
        "residentialSquareFootage".to_string(),
        number(record.residential_square_footage),
    );
    properties.insert("footageImputed".to_string(), record.footage_imputed.into());
    properties.insert(
        "estimatedUnits".to_string(),
        record
            .estimated_units
            .units()
            .map_or(serde_json::Value::Null, serde_json::Value::from),
    );

    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: Some(geojson::feature::Id::String(record.key.clone())),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Walkshed layer for one channel: each feature is the buffer polygon,
/// tagged with the stop or route it came from.
fn transit_collection(channel: TransitChannel, features: &[TransitFeature]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: features
            .iter()
            .filter(|feature| feature.channel == channel)
            .filter_map(transit_feature)
            .collect(),
        foreign_members: None,
    }
}

fn transit_feature(feature: &TransitFeature) -> Option<Feature> {
    let buffer = feature.buffer.as_ref()?;

    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), feature.name.as_str().into());
    properties.insert("channel".to_string(), feature.channel.to_string().into());
    properties.insert(
        "municipality".to_string(),
        text(feature.municipality.as_deref()),
    );
    properties.insert("tifName".to_string(), text(feature.tif_name.as_deref()));

    Some(Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(buffer))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

fn neighborhood_collection(summaries: &[NeighborhoodSummary]) -> FeatureCollection {
    let features = summaries
        .iter()
        .filter_map(|summary| {
            let boundary = summary.boundary.as_ref()?;

            let mut properties = JsonObject::new();
            properties.insert("name".to_string(), summary.name.as_str().into());
            properties.insert("percentChange".to_string(), number(summary.percent_change));
            properties.insert(
                "totalSquareFootage".to_string(),
                number(summary.total_square_footage),
            );

            Some(Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::from(boundary))),
                id: Some(geojson::feature::Id::String(summary.name.clone())),
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[derive(Serialize)]
struct SiteRow<'a> {
    key: &'a str,
    address: Option<&'a str>,
    status: Option<&'a str>,
    zoning_code: Option<&'a str>,
    effective_zoning: Option<&'a str>,
    zone_category: String,
    single_family: bool,
    rezoned_for_adu: bool,
    eligible_channel: Option<String>,
    adu_eligible: bool,
    tif_name: Option<&'a str>,
    neighborhood: Option<&'a str>,
    square_footage: Option<f64>,
    residential_square_footage: Option<f64>,
    footage_imputed: bool,
    /// Unit count, or the literal `unknown` sentinel — never an empty cell.
    estimated_units: String,
}

impl<'a> From<&'a SiteRecord> for SiteRow<'a> {
    fn from(record: &'a SiteRecord) -> Self {
        Self {
            key: &record.key,
            address: record.address.as_deref(),
            status: record.status.as_deref(),
            zoning_code: record.zoning_code.as_deref(),
            effective_zoning: record.effective_zoning.as_deref(),
            zone_category: record.zone_category.to_string(),
            single_family: record.single_family,
            rezoned_for_adu: record.rezoned_for_adu,
            eligible_channel: record.eligible_channel.map(|channel| channel.to_string()),
            adu_eligible: record.adu_eligible,
            tif_name: record.tif_name.as_deref(),
            neighborhood: record.neighborhood.as_deref(),
            square_footage: record.square_footage,
            residential_square_footage: record.residential_square_footage,
            footage_imputed: record.footage_imputed,
            estimated_units: record.estimated_units.to_string(),
        }
    }
}

fn sites_csv(records: &[SiteRecord]) -> Result<Vec<u8>, PipelineError> {
    let mut buffer = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buffer);
        for record in records {
            writer.serialize(SiteRow::from(record))?;
        }
        writer.flush()?;
    }
    Ok(buffer)
}

#[derive(Serialize)]
struct NeighborhoodRow<'a> {
    neighborhood: &'a str,
    percent_change: Option<f64>,
    total_square_footage: Option<f64>,
}

fn neighborhoods_csv(summaries: &[NeighborhoodSummary]) -> Result<Vec<u8>, PipelineError> {
    let mut buffer = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buffer);
        for summary in summaries {
            writer.serialize(NeighborhoodRow {
                neighborhood: &summary.name,
                percent_change: summary.percent_change,
                total_square_footage: summary.total_square_footage,
            })?;
        }
        writer.flush()?;
    }
    Ok(buffer)
}
