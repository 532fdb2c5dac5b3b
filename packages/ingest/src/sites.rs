//! Readers for the feeds that become site records: the city-owned land
//! inventory, vacant-building service requests, and for-sale building
//! listings — plus the two address-keyed square-footage supplements that
//! backfill building footage.
//!
//! Building records are keyed by uppercased street address; land parcels by
//! their inventory `ID`. Rows the upstream process would drop (flagged
//! duplicates, listings that are not whole-building sales) are filtered
//! without counting as rejections.

use std::{
    collections::{BTreeMap, HashSet},
    io::Read,
};

use etod_map_geometry::parse::{parse_location_tuple, point_from_lon_lat};
use etod_map_site_models::{SiteGeometry, SiteRecord};
use serde::Deserialize;

use crate::{
    IngestError, LoadReport, Loaded, csv_reader, non_empty, parse_flag, parse_number,
    require_columns,
};

/// Filters out zero and negative footage, which the feeds use as filler.
fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

#[derive(Debug, Deserialize)]
struct LandRow {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "Longitude", default)]
    longitude: String,
    #[serde(rename = "Latitude", default)]
    latitude: String,
    #[serde(rename = "Property Status", default)]
    status: String,
    #[serde(rename = "Zoning Classification", default)]
    zoning: String,
    #[serde(rename = "Square Footage", default)]
    square_footage: String,
    #[serde(rename = "Sq Ft - Alternate", default)]
    square_footage_alternate: String,
    #[serde(rename = "Community Area Name", default)]
    community_area: String,
}

/// Reads the city-owned land inventory.
///
/// Square footage resolves to the first positive value of the two source
/// fields. Rows without usable coordinates are rejected and counted — a
/// parcel that cannot be placed cannot be joined to anything.
///
/// # Errors
///
/// * `IngestError::SchemaMismatch` if the header is missing a column.
/// * `IngestError::Csv` / `IngestError::Io` on unreadable input.
pub fn read_city_land<R: Read>(input: R) -> Result<Loaded<SiteRecord>, IngestError> {
    const TABLE: &str = "city-land";

    let mut reader = csv_reader(input);
    require_columns(
        TABLE,
        reader.headers()?,
        &[
            "ID",
            "Address",
            "Longitude",
            "Latitude",
            "Property Status",
            "Zoning Classification",
            "Square Footage",
            "Sq Ft - Alternate",
            "Community Area Name",
        ],
    )?;

    let mut report = LoadReport::new(TABLE);
    let mut records = Vec::new();

    for result in reader.deserialize() {
        report.read += 1;
        let row: LandRow = result?;
        let Some(id) = non_empty(&row.id) else {
            report.reject(report.read, "empty ID");
            continue;
        };
        let Some(point) =
            point_from_lon_lat(parse_number(&row.longitude), parse_number(&row.latitude))
        else {
            report.reject(report.read, "missing coordinates");
            continue;
        };

        let mut record = SiteRecord::new(id, SiteGeometry::Point(point));
        record.address = non_empty(&row.address).map(str::to_owned);
        record.status = non_empty(&row.status).map(str::to_owned);
        record.zoning_code = non_empty(&row.zoning).map(str::to_owned);
        record.neighborhood = non_empty(&row.community_area).map(str::to_owned);
        record.square_footage = positive(parse_number(&row.square_footage))
            .or_else(|| positive(parse_number(&row.square_footage_alternate)));
        records.push(record);
        report.loaded += 1;
    }

    report.finish();
    Ok(Loaded { records, report })
}

#[derive(Debug, Deserialize)]
struct VacantRow {
    #[serde(rename = "STREET_ADDRESS", default)]
    address: String,
    #[serde(rename = "LATITUDE", default)]
    latitude: String,
    #[serde(rename = "LONGITUDE", default)]
    longitude: String,
    #[serde(rename = "DUPLICATE", default)]
    duplicate: String,
    #[serde(rename = "LOCATION", default)]
    location: String,
}

/// Reads the vacant-building service requests.
///
/// Rows flagged `DUPLICATE` are filtered, then the survivors are
/// deduplicated by uppercased address and by the raw `LOCATION` string,
/// keeping the first loaded row of each. Coordinates come from the
/// `LATITUDE`/`LONGITUDE` columns, falling back to the `LOCATION` tuple.
///
/// # Errors
///
/// * `IngestError::SchemaMismatch` if the header is missing a column.
/// * `IngestError::Csv` / `IngestError::Io` on unreadable input.
pub fn read_vacant_buildings<R: Read>(input: R) -> Result<Loaded<SiteRecord>, IngestError> {
    const TABLE: &str = "vacant-buildings";

    let mut reader = csv_reader(input);
    require_columns(
        TABLE,
        reader.headers()?,
        &[
            "SR_NUMBER",
            "STREET_ADDRESS",
            "LATITUDE",
            "LONGITUDE",
            "DUPLICATE",
            "LOCATION",
        ],
    )?;

    let mut report = LoadReport::new(TABLE);
    let mut seen_addresses = HashSet::new();
    let mut seen_locations = HashSet::new();
    let mut records = Vec::new();

    for result in reader.deserialize() {
        report.read += 1;
        let row: VacantRow = result?;
        if parse_flag(&row.duplicate) {
            continue;
        }
        let Some(address) = non_empty(&row.address) else {
            report.reject(report.read, "empty STREET_ADDRESS");
            continue;
        };
        let key = address.to_ascii_uppercase();
        if seen_addresses.contains(&key) {
            continue;
        }
        if let Some(location) = non_empty(&row.location)
            && seen_locations.contains(location)
        {
            continue;
        }
        let Some(point) =
            point_from_lon_lat(parse_number(&row.longitude), parse_number(&row.latitude))
                .or_else(|| parse_location_tuple(&row.location).ok())
        else {
            report.reject(report.read, "no usable coordinates");
            continue;
        };

        seen_addresses.insert(key.clone());
        if let Some(location) = non_empty(&row.location) {
            seen_locations.insert(location.to_owned());
        }

        let mut record = SiteRecord::new(key.clone(), SiteGeometry::Point(point));
        record.address = Some(key);
        records.push(record);
        report.loaded += 1;
    }

    report.finish();
    Ok(Loaded { records, report })
}

#[derive(Debug, Deserialize)]
struct SaleRow {
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "Latitude", default)]
    latitude: String,
    #[serde(rename = "Longitude", default)]
    longitude: String,
    #[serde(rename = "Purchase Entire Building?", default)]
    whole_building: String,
    #[serde(rename = "Zoning", default)]
    zoning: String,
    #[serde(rename = "SqFt", default)]
    square_footage: String,
}

/// Reads the for-sale building listings.
///
/// Only whole-building sales (`Purchase Entire Building?` = `Y`) are kept;
/// partial offerings are filtered, not rejected. The listing's own zoning
/// string seeds the record and is replaced if the zoning-district join
/// finds the parcel in a district.
///
/// # Errors
///
/// * `IngestError::SchemaMismatch` if the header is missing a column.
/// * `IngestError::Csv` / `IngestError::Io` on unreadable input.
pub fn read_sale_listings<R: Read>(input: R) -> Result<Loaded<SiteRecord>, IngestError> {
    const TABLE: &str = "sale-listings";

    let mut reader = csv_reader(input);
    require_columns(
        TABLE,
        reader.headers()?,
        &[
            "Property Name",
            "Address",
            "Latitude",
            "Longitude",
            "Purchase Entire Building?",
            "Zoning",
            "Asking Price",
            "SqFt",
        ],
    )?;

    let mut report = LoadReport::new(TABLE);
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for result in reader.deserialize() {
        report.read += 1;
        let row: SaleRow = result?;
        if row.whole_building.trim() != "Y" {
            continue;
        }
        let Some(address) = non_empty(&row.address) else {
            report.reject(report.read, "empty Address");
            continue;
        };
        let key = address.to_ascii_uppercase();
        if seen.contains(&key) {
            continue;
        }
        let Some(point) =
            point_from_lon_lat(parse_number(&row.longitude), parse_number(&row.latitude))
        else {
            report.reject(report.read, "missing coordinates");
            continue;
        };

        seen.insert(key.clone());
        let mut record = SiteRecord::new(key.clone(), SiteGeometry::Point(point));
        record.address = Some(key);
        record.zoning_code = non_empty(&row.zoning).map(str::to_owned);
        record.square_footage = positive(parse_number(&row.square_footage));
        records.push(record);
        report.loaded += 1;
    }

    report.finish();
    Ok(Loaded { records, report })
}

#[derive(Debug, Deserialize)]
struct AddressFootageRow {
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "SqFt", default)]
    square_footage: String,
}

/// Reads the parcel-assessor square-footage rollup, keyed by uppercased
/// address. Repeated addresses are summed, mirroring how the rollup
/// handles multiple structures on one parcel.
///
/// # Errors
///
/// * `IngestError::SchemaMismatch` if the header is missing a column.
/// * `IngestError::Csv` / `IngestError::Io` on unreadable input.
pub fn read_address_footage<R: Read>(
    input: R,
) -> Result<(BTreeMap<String, f64>, LoadReport), IngestError> {
    const TABLE: &str = "address-footage";

    let mut reader = csv_reader(input);
    require_columns(TABLE, reader.headers()?, &["Address", "SqFt"])?;

    let mut report = LoadReport::new(TABLE);
    let mut by_address: BTreeMap<String, f64> = BTreeMap::new();

    for result in reader.deserialize() {
        report.read += 1;
        let row: AddressFootageRow = result?;
        let Some(address) = non_empty(&row.address) else {
            report.reject(report.read, "empty Address");
            continue;
        };
        let Some(square_footage) = positive(parse_number(&row.square_footage)) else {
            report.reject(report.read, "no usable SqFt");
            continue;
        };
        *by_address.entry(address.to_ascii_uppercase()).or_default() += square_footage;
        report.loaded += 1;
    }

    report.finish();
    Ok((by_address, report))
}

/// One manually collected square-footage entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManualFootage {
    pub square_footage: f64,
    /// Whether the value was calculated rather than measured. Calculated
    /// values mark the record's footage as imputed downstream.
    pub calculated: bool,
}

#[derive(Debug, Deserialize)]
struct ManualFootageRow {
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "SqFt", default)]
    square_footage: String,
    #[serde(rename = "Calc_Flg", default)]
    calculated: String,
}

/// Reads the hand-collected square-footage supplement. First entry per
/// address wins. Supplement values take precedence over the assessor
/// rollup when both exist for an address.
///
/// # Errors
///
/// * `IngestError::SchemaMismatch` if the header is missing a column.
/// * `IngestError::Csv` / `IngestError::Io` on unreadable input.
pub fn read_manual_footage<R: Read>(
    input: R,
) -> Result<(BTreeMap<String, ManualFootage>, LoadReport), IngestError> {
    const TABLE: &str = "manual-footage";

    let mut reader = csv_reader(input);
    require_columns(TABLE, reader.headers()?, &["Address", "SqFt", "Calc_Flg"])?;

    let mut report = LoadReport::new(TABLE);
    let mut by_address: BTreeMap<String, ManualFootage> = BTreeMap::new();

    for result in reader.deserialize() {
        report.read += 1;
        let row: ManualFootageRow = result?;
        let Some(address) = non_empty(&row.address) else {
            report.reject(report.read, "empty Address");
            continue;
        };
        let Some(square_footage) = positive(parse_number(&row.square_footage)) else {
            report.reject(report.read, "no usable SqFt");
            continue;
        };
        let key = address.to_ascii_uppercase();
        if by_address.contains_key(&key) {
            continue;
        }
        by_address.insert(
            key,
            ManualFootage {
                square_footage,
                calculated: parse_flag(&row.calculated),
            },
        );
        report.loaded += 1;
    }

    report.finish();
    Ok((by_address, report))
}
