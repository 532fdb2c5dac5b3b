//! Reader for the tabular zoning-rule file, the CSV alternative to the
//! embedded TOML rule registry.

use std::io::Read;

use etod_map_zoning_models::ZoningRule;
use serde::Deserialize;

use crate::{IngestError, LoadReport, Loaded, csv_reader, non_empty, parse_number, require_columns};

#[derive(Debug, Deserialize)]
struct RuleRow {
    #[serde(default)]
    zoning: String,
    #[serde(rename = "FAR", default)]
    far: String,
    #[serde(default)]
    lot_area_per_unit: String,
}

/// Reads the zoning-code → { FAR, minimum lot area per unit } table.
///
/// Either value may be absent for a code; that is a valid state the
/// downstream defaults handle, not an error. Repeated codes keep the first
/// row.
///
/// # Errors
///
/// * `IngestError::SchemaMismatch` if the header is missing a column.
/// * `IngestError::Csv` / `IngestError::Io` on unreadable input.
pub fn read_zoning_rules<R: Read>(input: R) -> Result<Loaded<(String, ZoningRule)>, IngestError> {
    const TABLE: &str = "zoning-rules";

    let mut reader = csv_reader(input);
    require_columns(TABLE, reader.headers()?, &["zoning", "FAR", "lot_area_per_unit"])?;

    let mut report = LoadReport::new(TABLE);
    let mut records: Vec<(String, ZoningRule)> = Vec::new();

    for result in reader.deserialize() {
        report.read += 1;
        let row: RuleRow = result?;
        let Some(code) = non_empty(&row.zoning) else {
            report.reject(report.read, "empty zoning code");
            continue;
        };
        if records.iter().any(|(existing, _)| existing == code) {
            continue;
        }

        records.push((
            code.to_owned(),
            ZoningRule {
                far: parse_number(&row.far).filter(|v| *v > 0.0),
                lot_area_per_unit: parse_number(&row.lot_area_per_unit).filter(|v| *v > 0.0),
            },
        ));
        report.loaded += 1;
    }

    report.finish();
    Ok(Loaded { records, report })
}
