//! Versioned zoning rule tables, embedded at compile time.
//!
//! Each `.toml` file under `packages/zoning/rules/` is one ordinance
//! snapshot baked into the binary via [`include_str!`]. Runs pin a revision
//! by name so that a rerun against the same inputs and revision reproduces
//! the same output even after the ordinance moves on. A file-path override
//! exists for rule tables that are not checked in.

use std::collections::BTreeMap;
use std::path::Path;

use etod_map_zoning_models::ZoningRule;
use serde::Deserialize;

use crate::ZoningError;

/// Ordinance snapshots embedded at compile time.
const RULE_TOMLS: &[(&str, &str)] = &[("chicago-2025", include_str!("../rules/chicago_2025.toml"))];

#[derive(Debug, Deserialize)]
struct RuleFile {
    rules: BTreeMap<String, ZoningRule>,
}

/// Lookup table from zoning code to density parameters.
///
/// Codes absent from the table are a valid state: the yield model falls
/// back to its own defaults rather than treating the miss as an error.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    revision: String,
    rules: BTreeMap<String, ZoningRule>,
}

impl RuleRegistry {
    /// Loads an embedded revision by name.
    ///
    /// # Errors
    ///
    /// * If no embedded revision has that name.
    /// * If the embedded TOML is malformed (a packaging defect, caught by
    ///   the registry tests).
    pub fn embedded(revision: &str) -> Result<Self, ZoningError> {
        let (name, raw) = RULE_TOMLS
            .iter()
            .find(|(name, _)| *name == revision)
            .ok_or_else(|| ZoningError::UnknownRevision(revision.to_string()))?;

        Self::from_toml_str(name, raw)
    }

    /// Parses a rule table from TOML text.
    ///
    /// # Errors
    ///
    /// * If the text is not a valid rules file.
    pub fn from_toml_str(revision: &str, raw: &str) -> Result<Self, ZoningError> {
        let file: RuleFile = toml::from_str(raw)?;
        log::debug!(
            "loaded zoning rules revision {revision}: {} codes",
            file.rules.len()
        );

        Ok(Self {
            revision: revision.to_string(),
            rules: file.rules,
        })
    }

    /// Builds a registry from already-parsed rules, e.g. the tabular CSV
    /// form of the rule file. Repeated codes keep the first entry.
    pub fn from_rules(
        revision: &str,
        rules: impl IntoIterator<Item = (String, ZoningRule)>,
    ) -> Self {
        let mut table: BTreeMap<String, ZoningRule> = BTreeMap::new();
        for (code, rule) in rules {
            table.entry(code).or_insert(rule);
        }

        Self {
            revision: revision.to_string(),
            rules: table,
        }
    }

    /// Loads a rule table from a file on disk. The revision name is the
    /// file stem.
    ///
    /// # Errors
    ///
    /// * If the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, ZoningError> {
        let raw = std::fs::read_to_string(path)?;
        let revision = path
            .file_stem()
            .map_or_else(|| "custom".to_string(), |s| s.to_string_lossy().to_string());

        let registry = Self::from_toml_str(&revision, &raw)?;
        log::info!(
            "zoning rules override: {} codes from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Names of all embedded revisions.
    #[must_use]
    pub fn embedded_revisions() -> Vec<&'static str> {
        RULE_TOMLS.iter().map(|(name, _)| *name).collect()
    }

    #[must_use]
    pub fn revision(&self) -> &str {
        &self.revision
    }

    #[must_use]
    pub fn get(&self, code: &str) -> Option<&ZoningRule> {
        self.rules.get(code.trim())
    }

    /// Floor area ratio for a code, if the table covers it.
    #[must_use]
    pub fn far(&self, code: &str) -> Option<f64> {
        self.get(code).and_then(|rule| rule.far)
    }

    /// Minimum lot area per unit for a code, if the table covers it.
    #[must_use]
    pub fn lot_area_per_unit(&self, code: &str) -> Option<f64> {
        self.get(code).and_then(|rule| rule.lot_area_per_unit)
    }

    /// Codes and rules in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ZoningRule)> {
        self.rules.iter().map(|(code, rule)| (code.as_str(), rule))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_every_embedded_revision() {
        for name in RuleRegistry::embedded_revisions() {
            let registry = RuleRegistry::embedded(name)
                .unwrap_or_else(|e| panic!("revision {name} failed to load: {e}"));
            assert!(!registry.is_empty(), "revision {name} is empty");
        }
    }

    #[test]
    fn unknown_revision_is_an_error() {
        assert!(matches!(
            RuleRegistry::embedded("chicago-1923"),
            Err(ZoningError::UnknownRevision(_))
        ));
    }

    #[test]
    fn chicago_2025_covers_the_residential_ladder() {
        let registry = RuleRegistry::embedded("chicago-2025").unwrap();

        for code in ["RS-1", "RS-2", "RS-3", "RT-3.5", "RT-4", "RM-5", "RM-6"] {
            assert!(registry.get(code).is_some(), "missing {code}");
        }

        assert!((registry.far("RT-4").unwrap() - 1.2).abs() < f64::EPSILON);
        assert!((registry.lot_area_per_unit("RT-4").unwrap() - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn every_rule_has_a_positive_far() {
        let registry = RuleRegistry::embedded("chicago-2025").unwrap();

        for (code, rule) in registry.iter() {
            let far = rule.far.unwrap_or_else(|| panic!("{code} has no FAR"));
            assert!(far > 0.0, "{code} FAR not positive");
            if let Some(lot_area) = rule.lot_area_per_unit {
                assert!(lot_area > 0.0, "{code} lot area not positive");
            }
        }
    }

    #[test]
    fn missing_codes_resolve_to_none() {
        let registry = RuleRegistry::embedded("chicago-2025").unwrap();

        assert!(registry.get("PMD 4").is_none());
        assert!(registry.far("POS-1").is_none());
    }

    #[test]
    fn from_rules_keeps_first_of_repeated_codes() {
        let registry = RuleRegistry::from_rules(
            "tabular",
            [
                (
                    "RT-4".to_string(),
                    ZoningRule {
                        far: Some(1.2),
                        lot_area_per_unit: Some(1000.0),
                    },
                ),
                (
                    "RT-4".to_string(),
                    ZoningRule {
                        far: Some(9.9),
                        lot_area_per_unit: None,
                    },
                ),
            ],
        );

        assert_eq!(registry.len(), 1);
        assert!((registry.far("RT-4").unwrap() - 1.2).abs() < f64::EPSILON);
    }

    #[test]
    fn lot_area_may_be_absent_while_far_is_present() {
        let registry = RuleRegistry::from_toml_str(
            "test",
            r#"
                [rules."M1-1"]
                far = 1.2
            "#,
        )
        .unwrap();

        assert!((registry.far("M1-1").unwrap() - 1.2).abs() < f64::EPSILON);
        assert!(registry.lot_area_per_unit("M1-1").is_none());
    }
}
