#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Neighborhood-level aggregation.
//!
//! Two signals come out of this crate: the market-change percentage
//! between two assessed-value snapshots, and the total resolved square
//! footage of candidate sites per neighborhood. Both group by the
//! neighborhood name as published in the assessment feed.

use std::collections::BTreeMap;

use etod_map_site_models::{
    AssessedValue, NeighborhoodBoundary, NeighborhoodSummary, SiteRecord,
};

/// Mean assessed value per neighborhood for one snapshot year.
fn snapshot_means(values: &[AssessedValue], year: u16) -> BTreeMap<&str, f64> {
    let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for value in values.iter().filter(|v| v.year == year) {
        let entry = sums.entry(value.neighborhood.as_str()).or_insert((0.0, 0));
        entry.0 += value.assessed_total;
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|(name, (sum, count))| {
            #[allow(clippy::cast_precision_loss)]
            let mean = sum / count as f64;
            (name, mean)
        })
        .collect()
}

/// Percent change in mean assessed value between two snapshot years.
///
/// Inner join: neighborhoods present in only one snapshot produce no
/// entry. A zero mean in the earlier snapshot would divide by zero, so
/// those neighborhoods are skipped with a warning.
#[must_use]
pub fn market_change(
    values: &[AssessedValue],
    earlier_year: u16,
    later_year: u16,
) -> BTreeMap<String, f64> {
    let earlier = snapshot_means(values, earlier_year);
    let later = snapshot_means(values, later_year);

    let mut changes = BTreeMap::new();
    for (name, earlier_mean) in &earlier {
        let Some(later_mean) = later.get(name) else {
            continue;
        };
        if *earlier_mean == 0.0 {
            log::warn!("zero assessed mean for {name} in {earlier_year}, skipping");
            continue;
        }
        let percent = (later_mean - earlier_mean).abs() / earlier_mean.abs() * 100.0;
        changes.insert((*name).to_string(), percent);
    }

    log::info!(
        "market change for {} neighborhoods ({earlier_year} to {later_year})",
        changes.len()
    );
    changes
}

/// Total resolved square footage per neighborhood.
///
/// Records with no resolved footage or no neighborhood are left out of
/// the sums entirely, not counted as zero.
#[must_use]
pub fn footage_rollup(records: &[SiteRecord]) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for record in records {
        if let Some(neighborhood) = &record.neighborhood
            && let Some(footage) = record.square_footage
        {
            *totals.entry(neighborhood.clone()).or_insert(0.0) += footage;
        }
    }
    totals
}

/// Joins both signals and the boundary layer into one output table,
/// sorted by neighborhood name.
///
/// Every neighborhood with at least one signal appears; the other signal
/// is left absent rather than zeroed.
#[must_use]
pub fn summarize(
    changes: &BTreeMap<String, f64>,
    footage: &BTreeMap<String, f64>,
    boundaries: &[NeighborhoodBoundary],
) -> Vec<NeighborhoodSummary> {
    let mut names: Vec<&String> = changes.keys().chain(footage.keys()).collect();
    names.sort();
    names.dedup();

    names
        .into_iter()
        .map(|name| NeighborhoodSummary {
            name: name.clone(),
            percent_change: changes.get(name).copied(),
            total_square_footage: footage.get(name).copied(),
            boundary: boundaries
                .iter()
                .find(|b| &b.primary == name)
                .map(|b| b.boundary.clone()),
        })
        .collect()
}
