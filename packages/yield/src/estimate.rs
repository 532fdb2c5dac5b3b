//! The estimation pass.
//!
//! Stage order is fixed and mirrors the published methodology: footage
//! fallbacks before the ADU bonus, FAR math on the substituted code, the
//! ground-floor deduction, then the unit division with its overrides.
//! Imputation runs last over the whole table so group means see every
//! resolved record.

use std::collections::BTreeMap;

use etod_map_site_models::{SiteRecord, UnitCount};
use etod_map_zoning::RuleRegistry;

use crate::config::{YieldConfig, YieldVariant};

/// Runs the yield model for one configuration and rule revision.
pub struct YieldEstimator<'a> {
    config: &'a YieldConfig,
    rules: &'a RuleRegistry,
}

impl<'a> YieldEstimator<'a> {
    #[must_use]
    pub const fn new(config: &'a YieldConfig, rules: &'a RuleRegistry) -> Self {
        Self { config, rules }
    }

    /// Estimates units for every record, imputes what it could not
    /// estimate, and drops zero-yield sites when the run asks for it.
    #[must_use]
    pub fn run(&self, mut records: Vec<SiteRecord>) -> Vec<SiteRecord> {
        for record in &mut records {
            self.estimate_record(record);
        }
        self.impute(&mut records);

        if self.config.drop_zero_yield {
            let before = records.len();
            records.retain(|record| record.estimated_units != UnitCount::Units(0));
            log::info!(
                "dropped {} zero-yield sites, {} remain",
                before - records.len(),
                records.len()
            );
        }

        let unknown = records
            .iter()
            .filter(|record| record.estimated_units.is_unknown())
            .count();
        log::info!(
            "unit estimates: {} sites, {unknown} unknown after imputation",
            records.len()
        );

        records
    }

    fn estimate_record(&self, record: &mut SiteRecord) {
        let Some(code) = effective_code(record).map(String::from) else {
            return;
        };

        // Zero footage is a placeholder for missing, never a real lot.
        let observed = record.square_footage.filter(|sq| *sq > 0.0);
        let mut footage = match observed {
            Some(sq) => sq,
            None => match self.config.fallback_for(&code) {
                Some(fallback) => {
                    record.footage_imputed = true;
                    fallback
                }
                None => {
                    record.square_footage = None;
                    return;
                }
            },
        };

        if self.config.variant == YieldVariant::Building
            && record.single_family
            && record.adu_eligible
        {
            footage *= self.config.adu_bonus;
        }
        record.square_footage = Some(footage);

        let far = self.config.far_for(&code, self.rules.far(&code));

        // Land footage is lot area, so FAR always applies to the rentable
        // share. Observed building footage already is floor area; only a
        // fallback constant (which stands in for lot area) gets scaled.
        let (ground_floor, floor_area) = match self.config.variant {
            YieldVariant::Land => {
                let rentable = footage * self.config.rentable_ratio;
                (rentable, far.map(|f| rentable * f))
            }
            YieldVariant::Building => {
                if record.footage_imputed {
                    (footage, far.map(|f| footage * f))
                } else {
                    (footage, Some(footage))
                }
            }
        };

        let residential = floor_area.map(|floor| {
            if record.zone_category.deducts_ground_floor() {
                match self.config.variant {
                    // A FAR below 1.0 puts the footprint above the floor
                    // total; what remains is zero, not a negative area.
                    YieldVariant::Land => (floor - ground_floor).max(0.0),
                    YieldVariant::Building => floor * self.config.building_residential_ratio,
                }
            } else {
                floor
            }
        });
        record.residential_square_footage = residential;

        let Some(residential) = residential else {
            return;
        };

        let average_unit = self
            .rules
            .lot_area_per_unit(&code)
            .map_or(self.config.min_unit_size, |lot_area| {
                lot_area.max(self.config.min_unit_size)
            });

        let computed = if residential < average_unit {
            0
        } else {
            floor_units(residential / average_unit)
        };

        let units = if record.rezoned_for_adu {
            computed.min(self.config.adu_unit_cap)
        } else if record.single_family {
            1
        } else {
            computed
        };

        record.estimated_units = UnitCount::Units(units);
    }

    /// Fills unknown counts with the floored mean of resolved counts that
    /// share the same effective zoning code. Codes with no resolved record
    /// stay unknown.
    fn impute(&self, records: &mut [SiteRecord]) {
        let mut groups: BTreeMap<String, (u64, u64)> = BTreeMap::new();
        for record in records.iter() {
            if let Some(code) = effective_code(record)
                && let Some(units) = record.estimated_units.units()
            {
                let entry = groups.entry(code.to_string()).or_insert((0, 0));
                entry.0 += u64::from(units);
                entry.1 += 1;
            }
        }

        let mut filled = 0usize;
        for record in records.iter_mut() {
            if !record.estimated_units.is_unknown() {
                continue;
            }
            if let Some(code) = effective_code(record)
                && let Some((sum, count)) = groups.get(code)
            {
                // Integer division floors the mean.
                let mean = sum / count;
                record.estimated_units = UnitCount::Units(clamp_units(mean));
                filled += 1;
            }
        }

        if filled > 0 {
            log::info!("imputed unit counts for {filled} sites from code-group means");
        }
    }
}

fn effective_code(record: &SiteRecord) -> Option<&str> {
    record
        .effective_zoning
        .as_deref()
        .or(record.zoning_code.as_deref())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn floor_units(ratio: f64) -> u32 {
    ratio.floor().clamp(0.0, f64::from(u32::MAX)) as u32
}

#[allow(clippy::cast_possible_truncation)]
fn clamp_units(mean: u64) -> u32 {
    mean.min(u64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use etod_map_site_models::SiteGeometry;
    use etod_map_zoning::{categorize, is_single_family};
    use geo::Point;

    use super::*;
    use crate::config::{FarOverride, FootageFallback, YieldConfig};

    fn rules() -> RuleRegistry {
        RuleRegistry::embedded("chicago-2025").unwrap()
    }

    fn land_config() -> YieldConfig {
        YieldConfig {
            variant: YieldVariant::Land,
            rentable_ratio: 0.8,
            adu_bonus: 1.2,
            building_residential_ratio: 0.75,
            far_override: None,
            fallbacks: vec![
                FootageFallback {
                    codes: vec!["RS-1".to_string()],
                    prefixes: Vec::new(),
                    square_footage: 5000.0,
                },
                FootageFallback {
                    codes: vec!["RS-2".to_string()],
                    prefixes: Vec::new(),
                    square_footage: 4000.0,
                },
                FootageFallback {
                    codes: vec!["RS-3".to_string()],
                    prefixes: Vec::new(),
                    square_footage: 2001.0,
                },
                FootageFallback {
                    codes: Vec::new(),
                    prefixes: vec!["RT".to_string(), "RM".to_string()],
                    square_footage: 1321.0,
                },
            ],
            min_unit_size: 720.0,
            drop_zero_yield: true,
            adu_unit_cap: 4,
        }
    }

    fn building_config() -> YieldConfig {
        YieldConfig {
            variant: YieldVariant::Building,
            rentable_ratio: 0.8,
            adu_bonus: 1.2,
            building_residential_ratio: 0.75,
            far_override: Some(FarOverride {
                codes: ["B1-3", "B2-3", "B3-3", "C1-3", "C2-3", "C3-3"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                far: 4.0,
            }),
            fallbacks: vec![
                FootageFallback {
                    codes: ["RS-1", "RS-2", "RS-3"].into_iter().map(String::from).collect(),
                    prefixes: Vec::new(),
                    square_footage: 1200.0,
                },
                FootageFallback {
                    codes: ["RT-4", "RT-3.5", "RT-4A", "RM-5", "RM-6"]
                        .into_iter()
                        .map(String::from)
                        .collect(),
                    prefixes: Vec::new(),
                    square_footage: 1321.0,
                },
            ],
            min_unit_size: 720.0,
            drop_zero_yield: false,
            adu_unit_cap: 4,
        }
    }

    fn site(key: &str, code: &str, footage: Option<f64>) -> SiteRecord {
        let mut record = SiteRecord::new(key, SiteGeometry::Point(Point::new(-87.63, 41.88)));
        record.zoning_code = Some(code.to_string());
        record.effective_zoning = Some(code.to_string());
        record.zone_category = categorize(code);
        record.single_family = is_single_family(code);
        record.square_footage = footage;
        record
    }

    fn units_of(records: &[SiteRecord], key: &str) -> UnitCount {
        records
            .iter()
            .find(|r| r.key == key)
            .map(|r| r.estimated_units)
            .unwrap()
    }

    #[test]
    fn division_truncates_toward_zero() {
        // 1500 observed building square feet in a district with no lot
        // area rule: average unit size floors at 720, 1500 / 720 = 2.08.
        let config = building_config();
        let rules = RuleRegistry::from_toml_str("test", "[rules]").unwrap();
        let estimator = YieldEstimator::new(&config, &rules);

        let out = estimator.run(vec![site("a", "RM-7", Some(1500.0))]);

        assert_eq!(units_of(&out, "a"), UnitCount::Units(2));
    }

    #[test]
    fn below_one_average_unit_yields_zero() {
        let mut config = building_config();
        config.drop_zero_yield = false;
        let rules = RuleRegistry::from_toml_str("test", "[rules]").unwrap();
        let estimator = YieldEstimator::new(&config, &rules);

        let out = estimator.run(vec![site("a", "RM-7", Some(500.0))]);

        assert_eq!(units_of(&out, "a"), UnitCount::Units(0));
    }

    #[test]
    fn zero_yield_sites_are_dropped_when_configured() {
        let mut config = building_config();
        config.drop_zero_yield = true;
        let rules = RuleRegistry::from_toml_str("test", "[rules]").unwrap();
        let estimator = YieldEstimator::new(&config, &rules);

        let out = estimator.run(vec![
            site("small", "RM-7", Some(500.0)),
            site("big", "RM-7", Some(1500.0)),
        ]);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, "big");
    }

    #[test]
    fn single_family_site_always_yields_one() {
        let rules = rules();
        let config = land_config();
        let estimator = YieldEstimator::new(&config, &rules);

        // Plenty of land; without the override RS-3 rules would allow
        // more than one unit.
        let out = estimator.run(vec![site("a", "RS-3", Some(50_000.0))]);

        assert_eq!(units_of(&out, "a"), UnitCount::Units(1));
    }

    #[test]
    fn land_applies_rentable_ratio_and_ground_floor_deduction() {
        let rules = rules();
        let config = land_config();
        let estimator = YieldEstimator::new(&config, &rules);

        // B3-2: FAR 2.2, lot area per unit 1000.
        // 10000 sq ft lot -> 8000 rentable -> 17600 floor -> minus the
        // 8000 ground footprint -> 9600 residential -> 9 units.
        let out = estimator.run(vec![site("a", "B3-2", Some(10_000.0))]);

        let record = &out[0];
        assert_eq!(record.estimated_units, UnitCount::Units(9));
        assert!((record.residential_square_footage.unwrap() - 9600.0).abs() < 1e-9);
        assert!(!record.footage_imputed);
    }

    #[test]
    fn ground_floor_deduction_clamps_at_zero() {
        // A rules override with FAR 0.5 for a commercial code: the 8000
        // sq ft ground footprint exceeds the 4000 sq ft floor total.
        let rules = RuleRegistry::from_toml_str(
            "test",
            r#"
                [rules."C1-1"]
                far = 0.5
                lot_area_per_unit = 1000
            "#,
        )
        .unwrap();
        let mut config = land_config();
        config.drop_zero_yield = false;
        let estimator = YieldEstimator::new(&config, &rules);

        let out = estimator.run(vec![site("a", "C1-1", Some(10_000.0))]);

        let record = &out[0];
        assert_eq!(record.residential_square_footage, Some(0.0));
        assert_eq!(record.estimated_units, UnitCount::Units(0));
    }

    #[test]
    fn building_keeps_observed_floor_area_unscaled() {
        let rules = rules();
        let config = building_config();
        let estimator = YieldEstimator::new(&config, &rules);

        // Observed 4400 sq ft building in RT-4 (FAR 1.2, lot area 1000):
        // floor area stays 4400, not 4400 * 1.2.
        let out = estimator.run(vec![site("a", "RT-4", Some(4400.0))]);

        let record = &out[0];
        assert_eq!(record.estimated_units, UnitCount::Units(4));
        assert!((record.residential_square_footage.unwrap() - 4400.0).abs() < 1e-9);
    }

    #[test]
    fn building_fallback_footage_is_scaled_by_far() {
        let rules = rules();
        let config = building_config();
        let estimator = YieldEstimator::new(&config, &rules);

        // Missing footage in RT-4: fallback 1321, scaled by FAR 1.2 =
        // 1585.2, one unit at lot area 1000.
        let out = estimator.run(vec![site("a", "RT-4", None)]);

        let record = &out[0];
        assert!(record.footage_imputed);
        assert!((record.square_footage.unwrap() - 1321.0).abs() < 1e-9);
        assert!((record.residential_square_footage.unwrap() - 1585.2).abs() < 1e-9);
        assert_eq!(record.estimated_units, UnitCount::Units(1));
    }

    #[test]
    fn zero_footage_counts_as_missing() {
        let rules = rules();
        let config = building_config();
        let estimator = YieldEstimator::new(&config, &rules);

        let out = estimator.run(vec![site("a", "RT-4", Some(0.0))]);

        assert!(out[0].footage_imputed);
        assert!((out[0].square_footage.unwrap() - 1321.0).abs() < 1e-9);
    }

    #[test]
    fn adu_bonus_applies_to_single_family_in_adu_areas() {
        let rules = rules();
        let config = building_config();
        let estimator = YieldEstimator::new(&config, &rules);

        let mut eligible = site("a", "RS-2", Some(2000.0));
        eligible.adu_eligible = true;
        let ineligible = site("b", "RS-2", Some(2000.0));

        let out = estimator.run(vec![eligible, ineligible]);

        let bonused = out.iter().find(|r| r.key == "a").unwrap();
        let plain = out.iter().find(|r| r.key == "b").unwrap();
        assert!((bonused.square_footage.unwrap() - 2400.0).abs() < 1e-9);
        assert!((plain.square_footage.unwrap() - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn rezoned_single_family_is_capped_not_pinned() {
        let rules = rules();
        let config = building_config();
        let estimator = YieldEstimator::new(&config, &rules);

        // Re-zoned RS-2 -> RT-4 with a big observed building: uncapped
        // division would give 10 units at lot area 1000.
        let mut rezoned = site("a", "RS-2", Some(10_000.0));
        rezoned.effective_zoning = Some("RT-4".to_string());
        rezoned.zone_category = categorize("RT-4");
        rezoned.rezoned_for_adu = true;

        let out = estimator.run(vec![rezoned]);

        assert_eq!(units_of(&out, "a"), UnitCount::Units(4));
    }

    #[test]
    fn far_override_supersedes_the_rule_table() {
        let rules = rules();
        // Imputed footage in B1-3: override FAR 4 beats the table's 3.
        let mut config = building_config();
        config.fallbacks.push(FootageFallback {
            codes: vec!["B1-3".to_string()],
            prefixes: Vec::new(),
            square_footage: 1000.0,
        });
        let estimator = YieldEstimator::new(&config, &rules);

        let out = estimator.run(vec![site("a", "B1-3", None)]);

        // 1000 * 4.0 = 4000 floor, 75% residential = 3000, average unit
        // max(720, 400) = 720 -> 4 units.
        let record = &out[0];
        assert!((record.residential_square_footage.unwrap() - 3000.0).abs() < 1e-9);
        assert_eq!(record.estimated_units, UnitCount::Units(4));
    }

    #[test]
    fn imputation_uses_floored_group_mean() {
        let rules = rules();
        let mut config = building_config();
        config.drop_zero_yield = false;
        // No fallbacks: the unresolved record must go through imputation,
        // not footage substitution.
        config.fallbacks.clear();
        let estimator = YieldEstimator::new(&config, &rules);

        // Three resolved RM-5 records at 2, 3, and 4 units, one record
        // with no footage and no fallback coverage.
        let mut records = vec![
            site("two", "RM-5", Some(1600.0)),
            site("three", "RM-5", Some(2200.0)),
            site("four", "RM-5", Some(2950.0)),
            site("missing", "RM-5.5", None),
        ];
        // RM-5 lot area per unit is 400 -> average unit 720.
        // 1600/720 = 2, 2200/720 = 3, 2950/720 = 4.
        records[3].effective_zoning = Some("RM-5".to_string());
        records[3].zoning_code = Some("RM-5".to_string());

        let out = estimator.run(records);

        assert_eq!(units_of(&out, "two"), UnitCount::Units(2));
        assert_eq!(units_of(&out, "three"), UnitCount::Units(3));
        assert_eq!(units_of(&out, "four"), UnitCount::Units(4));
        assert_eq!(units_of(&out, "missing"), UnitCount::Units(3));
    }

    #[test]
    fn no_group_mean_stays_unknown() {
        let rules = rules();
        let mut config = building_config();
        config.fallbacks.clear();
        let estimator = YieldEstimator::new(&config, &rules);

        let out = estimator.run(vec![site("a", "RM-6.5", None)]);

        assert!(units_of(&out, "a").is_unknown());
        assert!(out[0].square_footage.is_none());
    }

    #[test]
    fn estimation_is_idempotent() {
        let rules = rules();
        let config = land_config();
        let estimator = YieldEstimator::new(&config, &rules);

        let input = vec![
            site("a", "B3-2", Some(10_000.0)),
            site("b", "RS-3", None),
            site("c", "RM-5", Some(4000.0)),
        ];

        let first = estimator.run(input.clone());
        let second = estimator.run(input);

        assert_eq!(first, second);
    }
}
