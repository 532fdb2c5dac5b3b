//! Readers for the polygon reference layers: TIF districts, zoning
//! districts, neighborhood boundaries, and ADU areas.
//!
//! All four feeds encode their boundary as a WKT `POLYGON`/`MULTIPOLYGON`
//! in a `the_geom` column. Rows with unparseable geometry are rejected and
//! counted; rows missing their identifying name are rejected as well, since
//! an anonymous district cannot be joined to anything downstream.

use std::io::Read;

use etod_map_geometry::parse::parse_wkt_multi_polygon;
use etod_map_site_models::{AduArea, NeighborhoodBoundary, TifDistrict, ZoningDistrict};
use serde::Deserialize;

use crate::{IngestError, LoadReport, Loaded, csv_reader, non_empty, require_columns};

#[derive(Debug, Deserialize)]
struct TifRow {
    #[serde(rename = "the_geom", default)]
    geom: String,
    #[serde(rename = "NAME", default)]
    name: String,
    #[serde(rename = "USE", default)]
    use_category: String,
}

/// Reads the TIF district layer.
///
/// # Errors
///
/// * `IngestError::SchemaMismatch` if the header is missing a column.
/// * `IngestError::Csv` / `IngestError::Io` on unreadable input.
pub fn read_tif_districts<R: Read>(input: R) -> Result<Loaded<TifDistrict>, IngestError> {
    const TABLE: &str = "tif-districts";

    let mut reader = csv_reader(input);
    require_columns(TABLE, reader.headers()?, &["the_geom", "NAME", "USE"])?;

    let mut report = LoadReport::new(TABLE);
    let mut records = Vec::new();

    for result in reader.deserialize() {
        report.read += 1;
        let row: TifRow = result?;
        let Some(name) = non_empty(&row.name) else {
            report.reject(report.read, "empty NAME");
            continue;
        };
        match parse_wkt_multi_polygon(&row.geom) {
            Ok(boundary) => {
                records.push(TifDistrict {
                    name: name.to_owned(),
                    use_category: non_empty(&row.use_category).map(str::to_owned),
                    boundary,
                });
                report.loaded += 1;
            }
            Err(err) => report.reject(report.read, &err.to_string()),
        }
    }

    report.finish();
    Ok(Loaded { records, report })
}

#[derive(Debug, Deserialize)]
struct ZoningDistrictRow {
    #[serde(rename = "the_geom", default)]
    geom: String,
    #[serde(rename = "ZONE_CLASS", default)]
    zone_class: String,
}

/// Reads the zoning district layer.
///
/// # Errors
///
/// * `IngestError::SchemaMismatch` if the header is missing a column.
/// * `IngestError::Csv` / `IngestError::Io` on unreadable input.
pub fn read_zoning_districts<R: Read>(input: R) -> Result<Loaded<ZoningDistrict>, IngestError> {
    const TABLE: &str = "zoning-districts";

    let mut reader = csv_reader(input);
    require_columns(TABLE, reader.headers()?, &["the_geom", "ZONE_CLASS"])?;

    let mut report = LoadReport::new(TABLE);
    let mut records = Vec::new();

    for result in reader.deserialize() {
        report.read += 1;
        let row: ZoningDistrictRow = result?;
        let Some(zone_class) = non_empty(&row.zone_class) else {
            report.reject(report.read, "empty ZONE_CLASS");
            continue;
        };
        match parse_wkt_multi_polygon(&row.geom) {
            Ok(boundary) => {
                records.push(ZoningDistrict {
                    zone_class: zone_class.to_owned(),
                    boundary,
                });
                report.loaded += 1;
            }
            Err(err) => report.reject(report.read, &err.to_string()),
        }
    }

    report.finish();
    Ok(Loaded { records, report })
}

#[derive(Debug, Deserialize)]
struct NeighborhoodRow {
    #[serde(rename = "the_geom", default)]
    geom: String,
    #[serde(rename = "PRI_NEIGH", default)]
    primary: String,
    #[serde(rename = "SEC_NEIGH", default)]
    secondary: String,
}

/// Reads the neighborhood boundary layer.
///
/// # Errors
///
/// * `IngestError::SchemaMismatch` if the header is missing a column.
/// * `IngestError::Csv` / `IngestError::Io` on unreadable input.
pub fn read_neighborhoods<R: Read>(input: R) -> Result<Loaded<NeighborhoodBoundary>, IngestError> {
    const TABLE: &str = "neighborhoods";

    let mut reader = csv_reader(input);
    require_columns(TABLE, reader.headers()?, &["the_geom", "PRI_NEIGH", "SEC_NEIGH"])?;

    let mut report = LoadReport::new(TABLE);
    let mut records = Vec::new();

    for result in reader.deserialize() {
        report.read += 1;
        let row: NeighborhoodRow = result?;
        let Some(primary) = non_empty(&row.primary) else {
            report.reject(report.read, "empty PRI_NEIGH");
            continue;
        };
        match parse_wkt_multi_polygon(&row.geom) {
            Ok(boundary) => {
                records.push(NeighborhoodBoundary {
                    primary: primary.to_owned(),
                    secondary: non_empty(&row.secondary).map(str::to_owned),
                    boundary,
                });
                report.loaded += 1;
            }
            Err(err) => report.reject(report.read, &err.to_string()),
        }
    }

    report.finish();
    Ok(Loaded { records, report })
}

#[derive(Debug, Deserialize)]
struct AduAreaRow {
    #[serde(rename = "the_geom", default)]
    geom: String,
    #[serde(rename = "AREA_NAME", default)]
    name: String,
}

/// Reads the ADU (accessory dwelling unit) pilot-area layer.
///
/// # Errors
///
/// * `IngestError::SchemaMismatch` if the header is missing a column.
/// * `IngestError::Csv` / `IngestError::Io` on unreadable input.
pub fn read_adu_areas<R: Read>(input: R) -> Result<Loaded<AduArea>, IngestError> {
    const TABLE: &str = "adu-areas";

    let mut reader = csv_reader(input);
    require_columns(TABLE, reader.headers()?, &["the_geom", "AREA_NAME"])?;

    let mut report = LoadReport::new(TABLE);
    let mut records = Vec::new();

    for result in reader.deserialize() {
        report.read += 1;
        let row: AduAreaRow = result?;
        match parse_wkt_multi_polygon(&row.geom) {
            Ok(boundary) => {
                records.push(AduArea {
                    name: non_empty(&row.name).map(str::to_owned),
                    boundary,
                });
                report.loaded += 1;
            }
            Err(err) => report.reject(report.read, &err.to_string()),
        }
    }

    report.finish();
    Ok(Loaded { records, report })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = "MULTIPOLYGON (((-87.70 41.90, -87.60 41.90, -87.60 42.00, -87.70 42.00, -87.70 41.90)))";

    #[test]
    fn tif_reader_loads_and_counts_bad_geometry() {
        let csv = format!(
            "the_geom,NAME,USE\n\"{SQUARE}\",Kinzie,Industrial\nnot wkt,Midway,\n\"{SQUARE}\",Englewood,\n",
        );
        let loaded = read_tif_districts(csv.as_bytes()).unwrap();

        assert_eq!(loaded.report.read, 3);
        assert_eq!(loaded.report.loaded, 2);
        assert_eq!(loaded.report.rejected, 1);
        assert_eq!(loaded.records[0].name, "Kinzie");
        assert_eq!(loaded.records[0].use_category.as_deref(), Some("Industrial"));
        assert_eq!(loaded.records[1].name, "Englewood");
        assert_eq!(loaded.records[1].use_category, None);
    }

    #[test]
    fn tif_reader_rejects_missing_column_before_reading_rows() {
        let csv = format!("the_geom,NAME\n\"{SQUARE}\",Kinzie\n");
        let err = read_tif_districts(csv.as_bytes()).unwrap_err();
        match err {
            IngestError::SchemaMismatch { table, missing } => {
                assert_eq!(table, "tif-districts");
                assert_eq!(missing, "USE");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zoning_district_reader_accepts_plain_polygon_wkt() {
        let csv = "the_geom,ZONE_CLASS\n\"POLYGON ((-87.70 41.90, -87.60 41.90, -87.60 42.00, -87.70 41.90))\",RS-3\n";
        let loaded = read_zoning_districts(csv.as_bytes()).unwrap();

        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records[0].zone_class, "RS-3");
    }

    #[test]
    fn neighborhood_reader_keeps_optional_secondary_name() {
        let csv = format!(
            "the_geom,PRI_NEIGH,SEC_NEIGH\n\"{SQUARE}\",Logan Square,\n\"{SQUARE}\",Douglas,Bronzeville\n",
        );
        let loaded = read_neighborhoods(csv.as_bytes()).unwrap();

        assert_eq!(loaded.records[0].secondary, None);
        assert_eq!(loaded.records[1].secondary.as_deref(), Some("Bronzeville"));
    }

    #[test]
    fn adu_area_reader_tolerates_missing_name() {
        let csv = format!("the_geom,AREA_NAME\n\"{SQUARE}\",\n");
        let loaded = read_adu_areas(csv.as_bytes()).unwrap();

        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records[0].name, None);
    }
}
