#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Zoning code classification and the versioned zoning rule registry.
//!
//! Classification is pure string logic over the code itself: coarse
//! category by prefix, buildability by exclusion substring, single-family
//! by marker. Density parameters (FAR, minimum lot area per unit) come from
//! the [`registry::RuleRegistry`], loaded from embedded, versioned TOML
//! snapshots of the zoning ordinance.

pub mod classify;
pub mod registry;

pub use classify::{RezoningRules, Substitution, categorize, is_buildable, is_single_family};
pub use registry::RuleRegistry;

/// Errors raised while loading a zoning rule table.
#[derive(Debug, thiserror::Error)]
pub enum ZoningError {
    /// Rules TOML failed to parse.
    #[error("rules parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The named embedded revision does not exist.
    #[error("unknown rules revision: {0}")]
    UnknownRevision(String),

    /// A rules file override could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
