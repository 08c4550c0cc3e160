//! # Location Table
//!
//! Loads the input table of named coordinates driving the point-extraction
//! pipeline. The header is case-sensitive: `Name,lat,lon`. No deduplication
//! and no geographic-range validation is performed.

use std::path::Path;

use polars::prelude::*;

use crate::error::{PipelineError, Result};

/// A named coordinate; the name prefixes every output file for the location.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Reads the location table, preserving row order.
///
/// # Errors
///
/// Fails if the file cannot be read, a required column is absent, or the
/// `lat`/`lon` columns contain values that do not parse as decimal numbers.
pub fn load_locations(path: &Path) -> Result<Vec<Location>> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let names = string_column(&df, path, "Name")?;
    let latitudes = numeric_column(&df, path, "lat")?;
    let longitudes = numeric_column(&df, path, "lon")?;

    Ok(names
        .into_iter()
        .zip(latitudes)
        .zip(longitudes)
        .map(|((name, latitude), longitude)| Location {
            name,
            latitude,
            longitude,
        })
        .collect())
}

fn numeric_column(df: &DataFrame, path: &Path, name: &str) -> Result<Vec<f64>> {
    let column = df.column(name).map_err(|_| PipelineError::MissingColumn {
        path: path.to_path_buf(),
        column: name.to_string(),
    })?;
    let invalid = || PipelineError::LocationColumn {
        path: path.to_path_buf(),
        column: name.to_string(),
    };

    // A malformed numeric cell makes polars infer the whole column as string;
    // the non-strict cast then turns that cell into a null, which we reject.
    let casted = column.cast(&DataType::Float64).map_err(|_| invalid())?;
    casted
        .as_materialized_series()
        .f64()?
        .into_iter()
        .map(|value| value.ok_or_else(invalid))
        .collect()
}

fn string_column(df: &DataFrame, path: &Path, name: &str) -> Result<Vec<String>> {
    let column = df.column(name).map_err(|_| PipelineError::MissingColumn {
        path: path.to_path_buf(),
        column: name.to_string(),
    })?;
    let invalid = || PipelineError::LocationColumn {
        path: path.to_path_buf(),
        column: name.to_string(),
    };

    let casted = column.cast(&DataType::String).map_err(|_| invalid())?;
    casted
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string).ok_or_else(invalid))
        .collect()
}
