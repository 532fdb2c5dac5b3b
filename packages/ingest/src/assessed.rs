//! Reader for the assessed-value snapshots that drive the neighborhood
//! market-change signal.

use std::io::Read;

use etod_map_site_models::AssessedValue;
use serde::Deserialize;

use crate::{IngestError, LoadReport, Loaded, csv_reader, non_empty, parse_number, require_columns};

#[derive(Debug, Deserialize)]
struct AssessedRow {
    #[serde(rename = "pri_neigh", default)]
    neighborhood: String,
    #[serde(default)]
    year: String,
    #[serde(rename = "certified_tot", default)]
    assessed_total: String,
}

/// Reads the assessed-value records.
///
/// Unparseable assessed totals are coerced to 0 rather than rejected,
/// matching how the source data treats them; they still pull the snapshot
/// mean down, which is the established behavior of this signal. Rows
/// without a parseable year cannot be assigned to a snapshot and are
/// rejected.
///
/// # Errors
///
/// * `IngestError::SchemaMismatch` if the header is missing a column.
/// * `IngestError::Csv` / `IngestError::Io` on unreadable input.
pub fn read_assessed_values<R: Read>(input: R) -> Result<Loaded<AssessedValue>, IngestError> {
    const TABLE: &str = "assessed-values";

    let mut reader = csv_reader(input);
    require_columns(TABLE, reader.headers()?, &["pri_neigh", "year", "certified_tot"])?;

    let mut report = LoadReport::new(TABLE);
    let mut records = Vec::new();

    for result in reader.deserialize() {
        report.read += 1;
        let row: AssessedRow = result?;
        let Some(neighborhood) = non_empty(&row.neighborhood) else {
            report.reject(report.read, "empty pri_neigh");
            continue;
        };
        let Some(year) = row.year.trim().parse::<u16>().ok() else {
            report.reject(report.read, "unparseable year");
            continue;
        };

        records.push(AssessedValue {
            neighborhood: neighborhood.to_owned(),
            year,
            assessed_total: parse_number(&row.assessed_total).unwrap_or(0.0),
        });
        report.loaded += 1;
    }

    report.finish();
    Ok(Loaded { records, report })
}
