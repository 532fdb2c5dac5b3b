#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! CSV readers for the public datasets feeding the ETOD map.
//!
//! Every reader validates the header row against the columns it consumes
//! before touching any data rows, so a renamed or dropped column fails the
//! whole load instead of producing a silently empty layer. Row-level
//! problems (bad coordinates, unparseable geometry) are counted in a
//! [`LoadReport`] and logged rather than aborting the load.

pub mod assessed;
pub mod layers;
pub mod rules;
pub mod sites;
pub mod transit;

/// Errors raised while loading an input table.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// IO failure opening or reading a file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// CSV-level failure (malformed quoting, uneven rows, etc).
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// The header row is missing columns the reader consumes.
    #[error("{table}: missing required column(s): {missing}")]
    SchemaMismatch {
        table: &'static str,
        missing: String,
    },
}

/// Per-table load accounting.
///
/// `read` counts data rows seen, `loaded` the records produced, and
/// `rejected` the rows dropped for row-level problems. Filtered rows
/// (duplicates, out-of-scope listings) count in neither `loaded` nor
/// `rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub table: &'static str,
    pub read: usize,
    pub loaded: usize,
    pub rejected: usize,
}

impl LoadReport {
    #[must_use]
    pub const fn new(table: &'static str) -> Self {
        Self {
            table,
            read: 0,
            loaded: 0,
            rejected: 0,
        }
    }

    pub(crate) fn reject(&mut self, row: usize, reason: &str) {
        self.rejected += 1;
        log::warn!("{}: skipping row {row}: {reason}", self.table);
    }

    pub(crate) fn finish(&self) {
        log::info!(
            "{}: loaded {} of {} rows ({} rejected)",
            self.table,
            self.loaded,
            self.read,
            self.rejected,
        );
    }
}

/// A loaded table: the records plus the accounting for how they got there.
#[derive(Debug)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub report: LoadReport,
}

/// Validates that every column the reader consumes appears in the header
/// row before any data row is deserialized.
///
/// Header cells are compared trimmed, since exports from the data portal
/// occasionally pad column names with whitespace.
///
/// # Errors
///
/// * `IngestError::SchemaMismatch` if any required column is absent; the
///   error names every missing column, not just the first.
pub(crate) fn require_columns(
    table: &'static str,
    headers: &csv::StringRecord,
    required: &[&str],
) -> Result<(), IngestError> {
    let present: Vec<&str> = headers.iter().map(str::trim).collect();
    let missing: Vec<&str> = required
        .iter()
        .filter(|column| !present.contains(*column))
        .copied()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(IngestError::SchemaMismatch {
            table,
            missing: missing.join(", "),
        })
    }
}

/// Builds the CSV reader every table loader uses.
///
/// `flexible` tolerates ragged rows, which the portal exports produce when
/// trailing columns are empty.
pub(crate) fn csv_reader<R: std::io::Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(input)
}

/// Parses a numeric cell, tolerating thousands separators and currency
/// prefixes. Empty and unparseable cells both resolve to `None`.
pub(crate) fn parse_number(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// Interprets a boolean-ish cell the way the portal encodes flags.
pub(crate) fn parse_flag(cell: &str) -> bool {
    matches!(
        cell.trim().to_ascii_lowercase().as_str(),
        "true" | "t" | "yes" | "y" | "1"
    )
}

/// Returns the trimmed cell, or `None` when it is empty.
pub(crate) fn non_empty(cell: &str) -> Option<&str> {
    let trimmed = cell.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
