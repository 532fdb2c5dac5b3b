#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! The assembled pipeline: run configuration, stage orchestration, and
//! export.
//!
//! A run applies one configuration — an embedded preset or a TOML file in
//! the same shape — to a directory of input CSVs. Stages execute in a
//! fixed order: reference layers, transit buffers, base sites, transit
//! eligibility, zoning classification, unit yield, neighborhood rollups.
//! Results land as GeoJSON and CSV files written atomically into an
//! output directory.

pub mod config;
pub mod export;
pub mod stages;

pub use config::{Buildability, BufferRadii, InputFiles, PipelineConfig};
pub use export::write_outputs;
pub use stages::{RunArtifacts, run};

/// Errors surfaced by configuration loading, pipeline stages, or export.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// An input or output file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A CSV feed failed to load.
    #[error(transparent)]
    Ingest(#[from] etod_map_ingest::IngestError),

    /// The zoning rule registry failed to load.
    #[error(transparent)]
    Zoning(#[from] etod_map_zoning::ZoningError),

    /// Run configuration TOML failed to parse.
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A CSV output could not be written.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// A GeoJSON output could not be serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The named embedded preset does not exist.
    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    /// The configuration parsed but its pieces do not fit together.
    #[error("invalid config: {0}")]
    Config(String),
}
