//! # Grid-to-Point Export
//!
//! Opens a NetCDF dataset, selects one data variable laid out over
//! `time`/`lat`/`lon`, and writes the time series at every exact grid point
//! to its own CSV table named by the truncated coordinate
//! (`{lat:.1}_{lon:.1}.csv`).
//!
//! Coordinates are matched exactly against the grid axes: no interpolation
//! or nearest-point lookup. Two distinct axis values can truncate to the same
//! one-decimal filename; instead of silently overwriting, the colliding point
//! falls back to a full-precision filename and the collision is logged.

use std::collections::HashSet;
use std::fs::{self, File};
use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use indicatif::ProgressBar;
use log::{info, warn};
use polars::prelude::*;

use crate::error::{PipelineError, Result};

/// Dimensions every exported variable must carry.
pub const REQUIRED_DIMS: [&str; 3] = ["time", "lat", "lon"];

/// Summary of one export run.
#[derive(Debug, Clone, Copy)]
pub struct ExportOutcome {
    pub files_written: usize,
    pub collisions: usize,
}

/// Exports the time series at every grid point of the dataset.
///
/// When `variable` is `None`, the first data variable carrying all of the
/// required dimensions is selected.
///
/// # Errors
///
/// Fails if the file cannot be opened, the variable is missing or is not
/// laid out over exactly `time`/`lat`/`lon`, or any output table cannot be
/// written.
pub fn export_grid_points(
    nc_path: &Path,
    variable: Option<&str>,
    output_dir: &Path,
) -> Result<ExportOutcome> {
    let file = netcdf::open(nc_path)?;

    let var_name = match variable {
        Some(name) => {
            if file.variable(name).is_none() {
                return Err(PipelineError::VariableNotFound(name.to_string()));
            }
            name.to_string()
        }
        None => first_grid_variable(&file)?,
    };
    let var = file
        .variable(&var_name)
        .ok_or_else(|| PipelineError::VariableNotFound(var_name.clone()))?;

    let dims: Vec<String> = var
        .dimensions()
        .iter()
        .map(|d| d.name().to_string())
        .collect();
    for required in REQUIRED_DIMS {
        if !dims.iter().any(|d| d == required) {
            return Err(PipelineError::MissingDimension(required.to_string()));
        }
    }
    if dims.len() != REQUIRED_DIMS.len() {
        return Err(PipelineError::UnsupportedLayout(var_name.clone()));
    }
    let time_pos = dim_position(&dims, "time");
    let lat_pos = dim_position(&dims, "lat");
    let lon_pos = dim_position(&dims, "lon");

    let lats = coordinate_values(&file, "lat")?;
    let lons = coordinate_values(&file, "lon")?;
    let times = time_labels(&file)?;

    fs::create_dir_all(output_dir)?;

    let progress = ProgressBar::new((lats.len() * lons.len()) as u64);
    let mut used: HashSet<String> = HashSet::new();
    let mut collisions = 0;
    let mut files_written = 0;

    for (lat_idx, &lat) in lats.iter().enumerate() {
        for (lon_idx, &lon) in lons.iter().enumerate() {
            let values = point_values(&var, (time_pos, lat_pos, lon_pos), lat_idx, lon_idx)?;

            let truncated = format!("{:.1}_{:.1}.csv", lat, lon);
            let filename = if used.insert(truncated.clone()) {
                truncated
            } else {
                collisions += 1;
                warn!(
                    "{} already written for another grid point, using full-precision name",
                    truncated
                );
                format!("{}_{}.csv", lat, lon)
            };

            let mut df = DataFrame::new(vec![
                Series::new("time".into(), times.clone()).into(),
                Series::new(var_name.as_str().into(), values).into(),
            ])?;
            let out = output_dir.join(&filename);
            CsvWriter::new(File::create(&out)?)
                .include_header(true)
                .finish(&mut df)?;

            files_written += 1;
            progress.inc(1);
        }
    }

    progress.finish_and_clear();
    file.close()?;
    info!(
        "exported {} grid point tables to {:?} ({} collisions disambiguated)",
        files_written, output_dir, collisions
    );
    Ok(ExportOutcome {
        files_written,
        collisions,
    })
}

/// First data variable carrying all required dimensions, skipping the
/// coordinate variables themselves.
fn first_grid_variable(file: &netcdf::File) -> Result<String> {
    for var in file.variables() {
        let name = var.name().to_string();
        if REQUIRED_DIMS.contains(&name.as_str()) {
            continue;
        }
        let dims: Vec<String> = var
            .dimensions()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        if REQUIRED_DIMS.iter().all(|r| dims.iter().any(|d| d == r)) {
            return Ok(name);
        }
    }
    Err(PipelineError::NoSuitableVariable)
}

fn dim_position(dims: &[String], name: &str) -> usize {
    dims.iter().position(|d| d == name).unwrap_or(0)
}

fn coordinate_values(file: &netcdf::File, name: &str) -> Result<Vec<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| PipelineError::MissingDimension(name.to_string()))?;
    Ok(var.get_values::<f64, _>(..)?)
}

/// Reads the full series at one grid cell, whatever the dimension order.
fn point_values(
    var: &netcdf::Variable,
    positions: (usize, usize, usize),
    lat_idx: usize,
    lon_idx: usize,
) -> Result<Vec<f64>> {
    let values = match positions {
        (0, 1, 2) => var.get_values::<f64, _>((.., lat_idx, lon_idx))?,
        (0, 2, 1) => var.get_values::<f64, _>((.., lon_idx, lat_idx))?,
        (1, 0, 2) => var.get_values::<f64, _>((lat_idx, .., lon_idx))?,
        (1, 2, 0) => var.get_values::<f64, _>((lon_idx, .., lat_idx))?,
        (2, 0, 1) => var.get_values::<f64, _>((lat_idx, lon_idx, ..))?,
        (2, 1, 0) => var.get_values::<f64, _>((lon_idx, lat_idx, ..))?,
        _ => return Err(PipelineError::UnsupportedLayout(var.name().to_string())),
    };
    Ok(values)
}

/// Formats the time axis for output. Numeric axes with a CF-style
/// `"<unit> since <epoch>"` attribute are decoded to ISO timestamps;
/// anything else is written as the raw numeric value.
fn time_labels(file: &netcdf::File) -> Result<Vec<String>> {
    let var = file
        .variable("time")
        .ok_or_else(|| PipelineError::MissingDimension("time".to_string()))?;
    let values = var.get_values::<f64, _>(..)?;

    let units = var
        .attribute("units")
        .and_then(|a| a.value().ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Str(s) => Some(s),
            _ => None,
        });

    if let Some(units) = units
        && let Some((seconds_per_unit, epoch)) = parse_cf_units(&units)
    {
        return Ok(values
            .iter()
            .map(|v| {
                let offset = (v * seconds_per_unit as f64).round() as i64;
                format_timestamp(epoch + Duration::seconds(offset))
            })
            .collect());
    }

    Ok(values.iter().map(|v| v.to_string()).collect())
}

/// Parses a CF time unit string such as `"days since 1991-01-01"` into the
/// number of seconds per unit and the epoch.
fn parse_cf_units(units: &str) -> Option<(i64, NaiveDateTime)> {
    let mut parts = units.splitn(2, " since ");
    let unit = parts.next()?.trim().to_lowercase();
    let epoch = parts.next()?.trim();

    let seconds_per_unit = match unit.as_str() {
        "days" | "day" => 86_400,
        "hours" | "hour" => 3_600,
        "minutes" | "minute" => 60,
        "seconds" | "second" => 1,
        _ => return None,
    };

    let epoch = NaiveDateTime::parse_from_str(epoch, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(epoch, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(epoch, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })?;

    Some((seconds_per_unit, epoch))
}

fn format_timestamp(ts: NaiveDateTime) -> String {
    if ts.time() == NaiveTime::MIN {
        ts.format("%Y-%m-%d").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
