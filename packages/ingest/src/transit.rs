//! Readers for the transit feature feeds: rail stops, commuter-rail
//! stations, and bus corridors.
//!
//! The rail feed carries one row per platform with its own `STOP_ID`;
//! repeated stop ids are collapsed keeping the first row, matching how the
//! station feeds are deduplicated upstream. Coordinates arrive in two
//! shapes: the rail feed serializes a `"(lat, lon)"` tuple while the metra
//! and bus feeds use WKT.

use std::{collections::HashSet, io::Read};

use etod_map_geometry::parse::{parse_location_tuple, parse_wkt_multi_line, parse_wkt_point};
use etod_map_site_models::{TransitChannel, TransitFeature, TransitGeometry};
use serde::Deserialize;

use crate::{IngestError, LoadReport, Loaded, csv_reader, non_empty, require_columns};

#[derive(Debug, Deserialize)]
struct RailRow {
    #[serde(rename = "STOP_ID", default)]
    stop_id: String,
    #[serde(rename = "STATION_DESCRIPTIVE_NAME", default)]
    name: String,
    #[serde(rename = "Location", default)]
    location: String,
}

/// Reads the rail (L) stop list.
///
/// # Errors
///
/// * `IngestError::SchemaMismatch` if the header is missing a column.
/// * `IngestError::Csv` / `IngestError::Io` on unreadable input.
pub fn read_rail_stops<R: Read>(input: R) -> Result<Loaded<TransitFeature>, IngestError> {
    const TABLE: &str = "rail-stops";

    let mut reader = csv_reader(input);
    require_columns(
        TABLE,
        reader.headers()?,
        &["STOP_ID", "STATION_DESCRIPTIVE_NAME", "Location"],
    )?;

    let mut report = LoadReport::new(TABLE);
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for result in reader.deserialize() {
        report.read += 1;
        let row: RailRow = result?;
        let Some(name) = non_empty(&row.name) else {
            report.reject(report.read, "empty STATION_DESCRIPTIVE_NAME");
            continue;
        };
        if let Some(stop_id) = non_empty(&row.stop_id)
            && !seen.insert(stop_id.to_owned())
        {
            // repeated STOP_ID, keep the first row
            continue;
        }
        match parse_location_tuple(&row.location) {
            Ok(point) => {
                records.push(TransitFeature::new(
                    TransitChannel::Rail,
                    name.to_owned(),
                    TransitGeometry::Stop(point),
                ));
                report.loaded += 1;
            }
            Err(err) => report.reject(report.read, &err.to_string()),
        }
    }

    report.finish();
    Ok(Loaded { records, report })
}

#[derive(Debug, Deserialize)]
struct MetraRow {
    #[serde(rename = "STATION_ID", default)]
    station_id: String,
    #[serde(rename = "NAME", default)]
    name: String,
    #[serde(rename = "MUNICIPALITY", default)]
    municipality: String,
    #[serde(rename = "the_geom", default)]
    geom: String,
}

/// Reads the commuter-rail (metra) station list.
///
/// The municipality attribute is carried through so the pipeline can
/// restrict stations to the target city before buffering.
///
/// # Errors
///
/// * `IngestError::SchemaMismatch` if the header is missing a column.
/// * `IngestError::Csv` / `IngestError::Io` on unreadable input.
pub fn read_metra_stations<R: Read>(input: R) -> Result<Loaded<TransitFeature>, IngestError> {
    const TABLE: &str = "metra-stations";

    let mut reader = csv_reader(input);
    require_columns(
        TABLE,
        reader.headers()?,
        &["STATION_ID", "NAME", "MUNICIPALITY", "the_geom"],
    )?;

    let mut report = LoadReport::new(TABLE);
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for result in reader.deserialize() {
        report.read += 1;
        let row: MetraRow = result?;
        let Some(name) = non_empty(&row.name) else {
            report.reject(report.read, "empty NAME");
            continue;
        };
        if let Some(station_id) = non_empty(&row.station_id)
            && !seen.insert(station_id.to_owned())
        {
            continue;
        }
        match parse_wkt_point(&row.geom) {
            Ok(point) => {
                let mut feature = TransitFeature::new(
                    TransitChannel::Metra,
                    name.to_owned(),
                    TransitGeometry::Stop(point),
                );
                feature.municipality = non_empty(&row.municipality).map(str::to_owned);
                records.push(feature);
                report.loaded += 1;
            }
            Err(err) => report.reject(report.read, &err.to_string()),
        }
    }

    report.finish();
    Ok(Loaded { records, report })
}

#[derive(Debug, Deserialize)]
struct BusRouteRow {
    #[serde(default)]
    route: String,
    #[serde(rename = "the_geom", default)]
    geom: String,
}

/// Reads the bus route geometries.
///
/// A route may span several rows (one per shape segment); each becomes its
/// own corridor feature and the allow-list filter applies to all of them.
///
/// # Errors
///
/// * `IngestError::SchemaMismatch` if the header is missing a column.
/// * `IngestError::Csv` / `IngestError::Io` on unreadable input.
pub fn read_bus_routes<R: Read>(input: R) -> Result<Loaded<TransitFeature>, IngestError> {
    const TABLE: &str = "bus-routes";

    let mut reader = csv_reader(input);
    require_columns(TABLE, reader.headers()?, &["route", "the_geom"])?;

    let mut report = LoadReport::new(TABLE);
    let mut records = Vec::new();

    for result in reader.deserialize() {
        report.read += 1;
        let row: BusRouteRow = result?;
        let Some(route) = non_empty(&row.route) else {
            report.reject(report.read, "empty route");
            continue;
        };
        match parse_wkt_multi_line(&row.geom) {
            Ok(corridor) => {
                records.push(TransitFeature::new(
                    TransitChannel::Bus,
                    route.to_owned(),
                    TransitGeometry::Corridor(corridor),
                ));
                report.loaded += 1;
            }
            Err(err) => report.reject(report.read, &err.to_string()),
        }
    }

    report.finish();
    Ok(Loaded { records, report })
}
