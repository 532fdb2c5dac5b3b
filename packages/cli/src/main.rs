#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! CLI entry point for the ETOD map pipeline.
//!
//! Runs an eligibility analysis from an embedded preset or a config file,
//! and lists what is embedded. Input CSVs are read from a data directory;
//! the GeoJSON and CSV output layers land in an output directory.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use etod_map_pipeline::{PipelineConfig, run, write_outputs};
use etod_map_zoning::RuleRegistry;

#[derive(Parser)]
#[command(name = "etod_map_cli", about = "ETOD eligibility and yield tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an analysis from a preset or a config file
    Run {
        /// Embedded preset name (see `presets`)
        preset: Option<String>,
        /// Path to a run configuration TOML, instead of a preset
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory containing the input files the run names
        #[arg(long, default_value = "data/raw")]
        data_dir: PathBuf,
        /// Directory the output layers are written into
        #[arg(long, default_value = "data/generated")]
        output_dir: PathBuf,
    },
    /// List the embedded run presets
    Presets,
    /// List the embedded zoning rule revisions
    Rules,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            preset,
            config,
            data_dir,
            output_dir,
        } => {
            let config = match (preset, config) {
                (Some(_), Some(_)) => {
                    return Err("pass a preset name or --config, not both".into());
                }
                (Some(name), None) => PipelineConfig::preset(&name)?,
                (None, Some(path)) => PipelineConfig::from_path(&path)?,
                (None, None) => {
                    return Err(format!(
                        "missing preset; available: {}",
                        PipelineConfig::preset_names().join(", ")
                    )
                    .into());
                }
            };

            let start = Instant::now();
            let artifacts = run(&config, &data_dir)?;
            write_outputs(&artifacts, &output_dir)?;

            for report in &artifacts.reports {
                if report.rejected > 0 {
                    log::warn!(
                        "{}: {} of {} rows rejected",
                        report.table,
                        report.rejected,
                        report.read
                    );
                }
            }

            let elapsed = start.elapsed();
            log::info!(
                "{} eligible sites, {} transit features in {:.1}s",
                artifacts.sites.len(),
                artifacts.transit.len(),
                elapsed.as_secs_f64()
            );
        }
        Commands::Presets => {
            println!("{:<16} DESCRIPTION", "NAME");
            println!("{}", "-".repeat(70));
            for name in PipelineConfig::preset_names() {
                let config = PipelineConfig::preset(name)?;
                println!("{name:<16} {}", config.description);
            }
        }
        Commands::Rules => {
            for revision in RuleRegistry::embedded_revisions() {
                println!("{revision}");
            }
        }
    }

    Ok(())
}
