//! # imd2csv
//!
//! Converts gridded meteorological datasets into per-location CSV time
//! series with daily, monthly, annual and seasonal aggregation.
//!
//! ## Pipelines
//!
//! - **Point extraction**: for every location in an input table, ensures the
//!   IMD yearwise grid files (rain/tmax/tmin) are present locally, fetching
//!   them from the IMD Pune portal if absent, then extracts the nearest-cell
//!   time series, merges the three variables on date and writes four summary
//!   tables per location.
//! - **Grid export**: writes the time series at every exact grid point of a
//!   NetCDF dataset to its own CSV table.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imd2csv::{run_extraction_job, config::ExtractConfig};
//!
//! let config = ExtractConfig::from_file("job.json").expect("Failed to load config");
//! run_extraction_job(&config).expect("Failed to run extraction");
//! ```

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod grid;
pub mod info;
pub mod locations;
pub mod merge;
pub mod output;

#[cfg(test)]
mod tests;

use std::fs;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use crate::config::ExtractConfig;
use crate::error::{PipelineError, Result};
use crate::export::ExportOutcome;
use crate::fetch::GridFetcher;
use crate::grid::Variable;
use crate::locations::Location;

/// Runs the point-extraction pipeline for every location in the input table.
///
/// The pipeline is strictly sequential:
/// 1. Loads the location table
/// 2. Per location, extracts every variable/year into a scratch directory,
///    fetching missing grid files on demand
/// 3. Merges the per-year series and derives the summary tables
/// 4. Writes `{name}_daily.csv`, `{name}_annual.csv`, `{name}_monthly.csv`
///    and `{name}_seasonal.csv`
///
/// # Errors
///
/// Any failure aborts the remaining pipeline: there is no retry and no
/// per-location isolation.
pub fn run_extraction_job(config: &ExtractConfig) -> Result<()> {
    if config.start_year > config.end_year {
        return Err(PipelineError::YearRange {
            start: config.start_year,
            end: config.end_year,
        });
    }

    let locations = locations::load_locations(&config.input_csv)?;
    info!(
        "loaded {} locations from {:?}",
        locations.len(),
        config.input_csv
    );
    fs::create_dir_all(&config.output_dir)?;

    let fetcher = GridFetcher::new(&config.data_dir);
    let years = (config.end_year - config.start_year + 1) as u64;
    let progress = ProgressBar::new(locations.len() as u64 * Variable::ALL.len() as u64 * years);
    progress.set_style(
        ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap()
            .progress_chars("=> "),
    );

    for location in &locations {
        progress.set_message(location.name.clone());
        process_location(config, &fetcher, location, &progress)?;
    }

    progress.finish_and_clear();
    Ok(())
}

/// Processes a single location end to end.
///
/// Per-year scratch tables live in a temporary directory scoped to this
/// call; it is removed when the handle drops, on success or failure.
fn process_location(
    config: &ExtractConfig,
    fetcher: &GridFetcher,
    location: &Location,
    progress: &ProgressBar,
) -> Result<()> {
    let scratch = tempfile::tempdir()?;

    for variable in Variable::ALL {
        for year in config.start_year..=config.end_year {
            fetcher.extract_year(variable, year, location, scratch.path())?;
            progress.inc(1);
        }
    }

    let daily = merge::merge_location_series(scratch.path(), config.start_year, config.end_year)?;
    let annual = aggregate::annual_summary(&daily)?;
    let monthly = aggregate::monthly_summary(&daily)?;
    let seasonal = aggregate::seasonal_summary(&daily)?;

    let out = config.output_dir.as_path();
    let name = location.name.as_str();
    output::write_csv_with_bom(
        &daily.select(["Date", "RF", "TMAX", "TMIN"])?,
        &output::summary_path(out, name, "daily"),
    )?;
    output::write_csv_with_bom(&annual, &output::summary_path(out, name, "annual"))?;
    output::write_csv_with_bom(&monthly, &output::summary_path(out, name, "monthly"))?;
    output::write_csv_with_bom(&seasonal, &output::summary_path(out, name, "seasonal"))?;

    info!(
        "created files: {0}_daily.csv, {0}_annual.csv, {0}_monthly.csv, {0}_seasonal.csv",
        name
    );
    Ok(())
}

/// Runs the grid-to-point export pipeline.
///
/// See [`export::export_grid_points`] for the selection and collision
/// handling rules.
pub fn run_export_job(
    nc_path: &Path,
    variable: Option<&str>,
    output_dir: &Path,
) -> Result<ExportOutcome> {
    export::export_grid_points(nc_path, variable, output_dir)
}
