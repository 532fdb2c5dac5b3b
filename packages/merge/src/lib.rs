#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Channel union, key deduplication, and status filtering.
//!
//! Spatial joins are one-to-many: a site can sit in several buffers across
//! several channels, and a feed can list the same site twice. Everything
//! downstream assumes one record per key, so this crate is where that
//! invariant is established. Precedence between channels is rail over
//! metra over bus; within a channel, first occurrence wins.

use std::collections::HashSet;

use etod_map_site_models::{SiteRecord, TransitChannel};

/// Concatenates per-channel eligible sets in precedence order and keeps
/// the first record seen for each key.
///
/// A site inside both a rail buffer and a bus buffer comes out once, with
/// the rail channel on it.
#[must_use]
pub fn union_eligible(channels: Vec<(TransitChannel, Vec<SiteRecord>)>) -> Vec<SiteRecord> {
    let mut channels = channels;
    channels.sort_by_key(|(channel, _)| *channel);

    let concatenated: Vec<SiteRecord> = channels
        .into_iter()
        .flat_map(|(_, records)| records)
        .collect();

    let before = concatenated.len();
    let unioned = dedup_by_key(concatenated);
    log::info!(
        "channel union: {} records from {before} channel rows",
        unioned.len()
    );

    unioned
}

/// Keeps the first record for each key, preserving order otherwise.
#[must_use]
pub fn dedup_by_key(records: Vec<SiteRecord>) -> Vec<SiteRecord> {
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.key.clone()))
        .collect()
}

/// Removes records whose status is in the terminal set (already sold,
/// off the market).
#[must_use]
pub fn filter_status(records: Vec<SiteRecord>, terminal: &[String]) -> Vec<SiteRecord> {
    let before = records.len();
    let kept: Vec<SiteRecord> = records
        .into_iter()
        .filter(|record| {
            record
                .status
                .as_deref()
                .is_none_or(|status| !terminal.iter().any(|t| t == status))
        })
        .collect();

    if kept.len() < before {
        log::info!(
            "dropped {} records with terminal status, {} remain",
            before - kept.len(),
            kept.len()
        );
    }
    kept
}

#[cfg(test)]
mod tests {
    use etod_map_site_models::SiteGeometry;
    use geo::Point;

    use super::*;

    fn record(key: &str, channel: Option<TransitChannel>) -> SiteRecord {
        let mut record = SiteRecord::new(key, SiteGeometry::Point(Point::new(-87.6, 41.9)));
        record.eligible_channel = channel;
        record
    }

    #[test]
    fn rail_wins_over_bus_for_the_same_key() {
        let unioned = union_eligible(vec![
            (
                TransitChannel::Bus,
                vec![record("shared", Some(TransitChannel::Bus))],
            ),
            (
                TransitChannel::Rail,
                vec![record("shared", Some(TransitChannel::Rail))],
            ),
        ]);

        assert_eq!(unioned.len(), 1);
        assert_eq!(unioned[0].eligible_channel, Some(TransitChannel::Rail));
    }

    #[test]
    fn union_preserves_distinct_keys_from_every_channel() {
        let unioned = union_eligible(vec![
            (
                TransitChannel::Metra,
                vec![record("m1", Some(TransitChannel::Metra))],
            ),
            (
                TransitChannel::Rail,
                vec![
                    record("r1", Some(TransitChannel::Rail)),
                    record("r2", Some(TransitChannel::Rail)),
                ],
            ),
        ]);

        let keys: Vec<&str> = unioned.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["r1", "r2", "m1"]);
    }

    #[test]
    fn union_output_keys_are_unique() {
        let unioned = union_eligible(vec![
            (
                TransitChannel::Rail,
                vec![
                    record("a", Some(TransitChannel::Rail)),
                    record("a", Some(TransitChannel::Rail)),
                    record("b", Some(TransitChannel::Rail)),
                ],
            ),
            (
                TransitChannel::Bus,
                vec![
                    record("b", Some(TransitChannel::Bus)),
                    record("c", Some(TransitChannel::Bus)),
                ],
            ),
        ]);

        let mut keys: Vec<&str> = unioned.iter().map(|r| r.key.as_str()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), unioned.len());
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut first = record("dup", None);
        first.address = Some("original".to_string());
        let mut second = record("dup", None);
        second.address = Some("duplicate".to_string());

        let deduped = dedup_by_key(vec![first, second]);

        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].address.as_deref(), Some("original"));
    }

    #[test]
    fn status_filter_is_exact() {
        let mut sold = record("sold", None);
        sold.status = Some("Sold".to_string());
        let mut pending = record("pending", None);
        pending.status = Some("Sale Pending".to_string());
        let untagged = record("untagged", None);

        let kept = filter_status(vec![sold, pending, untagged], &["Sold".to_string()]);

        let keys: Vec<&str> = kept.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["pending", "untagged"]);
    }
}
