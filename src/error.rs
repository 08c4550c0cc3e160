//! # Error Types
//!
//! Crate-wide error taxonomy. Every failure is fatal to the run: there is no
//! retry and no per-location isolation, so errors carry enough context (urls,
//! paths, column names) to diagnose the aborted pipeline from the message alone.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while converting gridded data to CSV time series.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("request to {url} failed: {source}")]
    Download {
        url: String,
        source: reqwest::Error,
    },

    #[error("server returned {status} for {url}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("location table {path:?}: missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("location table {path:?}: column '{column}' has missing or non-numeric values")]
    LocationColumn { path: PathBuf, column: String },

    #[error("grid file {path:?} holds {found} values, expected {expected} ({days} days)")]
    GridShape {
        path: PathBuf,
        expected: usize,
        found: usize,
        days: usize,
    },

    #[error("year {0} is outside the supported calendar range")]
    YearOutOfRange(i32),

    #[error("invalid year range: start {start} is after end {end}")]
    YearRange { start: i32, end: i32 },

    #[error("NetCDF file must contain 'time', 'lat' and 'lon' dimensions (missing '{0}')")]
    MissingDimension(String),

    #[error("variable '{0}' not found in NetCDF file")]
    VariableNotFound(String),

    #[error("no data variable with time/lat/lon dimensions found")]
    NoSuitableVariable,

    #[error("variable '{0}' must be laid out over exactly the time/lat/lon dimensions")]
    UnsupportedLayout(String),

    #[error("cannot parse date '{0}'")]
    DateParse(String),

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
