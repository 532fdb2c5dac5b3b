#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Housing unit yield model.
//!
//! Converts a site's resolved square footage, zoning code, and category
//! into an estimated unit count through a fixed sequence: footage
//! resolution and fallbacks, rentable/floor-area math via FAR, the
//! ground-floor deduction for business and commercial districts, unit-size
//! division, per-code overrides, then group-mean imputation for whatever
//! could not be estimated directly.
//!
//! All parameters live in [`YieldConfig`] so the land and building-rehab
//! run variants are the same code with different numbers.

pub mod config;
pub mod estimate;

pub use config::{FarOverride, FootageFallback, YieldConfig, YieldVariant};
pub use estimate::YieldEstimator;
