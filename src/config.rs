//! # Job Configuration
//!
//! Parameters for the point-extraction pipeline, either assembled from
//! command-line arguments or loaded from a JSON job file:
//!
//! ```json
//! {
//!   "input_csv": "input-file.csv",
//!   "start_year": 1991,
//!   "end_year": 2020,
//!   "data_dir": ".",
//!   "output_dir": "."
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;

/// Configuration of one extraction job.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    /// Location table with `Name,lat,lon` columns
    pub input_csv: PathBuf,
    /// First year to process
    pub start_year: i32,
    /// Last year to process (IMD publishes yearwise grids up to 2024)
    pub end_year: i32,
    /// Directory holding (or receiving) the downloaded grid files
    #[serde(default = "default_dir")]
    pub data_dir: PathBuf,
    /// Directory receiving the summary tables
    #[serde(default = "default_dir")]
    pub output_dir: PathBuf,
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

impl ExtractConfig {
    /// Loads a job configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Loads a job configuration from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        let config: ExtractConfig = serde_json::from_str(json_str)?;
        Ok(config)
    }
}
