//! # Grid Fetcher
//!
//! Guarantees that the IMD grid file for a variable/year is present on disk,
//! downloading it from the Pune data portal when absent, and extracts the
//! point time series for one location into a per-year scratch table.
//!
//! Presence on disk is the only cache. There is no retry and no timeout
//! beyond the HTTP client defaults: a failed download aborts the run.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use polars::prelude::*;
use reqwest::blocking::Client;

use crate::error::{PipelineError, Result};
use crate::grid::{Variable, YearGrid};
use crate::locations::Location;

pub struct GridFetcher {
    data_dir: PathBuf,
    client: Client,
}

impl GridFetcher {
    pub fn new(data_dir: &Path) -> GridFetcher {
        GridFetcher {
            data_dir: data_dir.to_path_buf(),
            client: Client::new(),
        }
    }

    /// Conventional path of the grid file for one variable/year:
    /// `{data_dir}/{variable}/{year}.GRD`.
    pub fn grid_path(&self, variable: Variable, year: i32) -> PathBuf {
        self.data_dir
            .join(variable.id())
            .join(format!("{}.GRD", year))
    }

    /// Ensures a local grid file exists for the variable/year, fetching it
    /// from the IMD portal if absent, and returns its path.
    ///
    /// # Errors
    ///
    /// Propagates transport and HTTP status errors from the download, and IO
    /// errors from writing the file.
    pub fn ensure_grid(&self, variable: Variable, year: i32) -> Result<PathBuf> {
        let path = self.grid_path(variable, year);
        if path.exists() {
            debug!("grid file {:?} already present", path);
            return Ok(path);
        }

        warn!("grid file {:?} doesn't exist, downloading", path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let url = variable.endpoint();
        let response = self
            .client
            .post(url)
            .form(&[(variable.form_field(), year.to_string())])
            .send()
            .map_err(|e| PipelineError::Download {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        let bytes = response.bytes().map_err(|e| PipelineError::Download {
            url: url.to_string(),
            source: e,
        })?;
        fs::write(&path, &bytes)?;
        info!(
            "downloaded {} bytes for {} {} to {:?}",
            bytes.len(),
            variable,
            year,
            path
        );
        Ok(path)
    }

    /// Extracts the point series of one variable/year for a location and
    /// writes it as `{variable}-{year}.csv` into the scratch directory.
    ///
    /// The table has two columns: `DateTime` (ISO dates) and the variable
    /// identifier. Returns the path of the written table.
    pub fn extract_year(
        &self,
        variable: Variable,
        year: i32,
        location: &Location,
        scratch: &Path,
    ) -> Result<PathBuf> {
        let grid_path = self.ensure_grid(variable, year)?;
        let grid = YearGrid::decode(variable, year, &grid_path)?;
        let series = grid.point_series(location.latitude, location.longitude);

        let dates: Vec<String> = series
            .iter()
            .map(|(date, _)| date.format("%Y-%m-%d").to_string())
            .collect();
        let values: Vec<f64> = series.iter().map(|(_, value)| *value as f64).collect();

        let mut df = DataFrame::new(vec![
            Series::new("DateTime".into(), dates).into(),
            Series::new(variable.id().into(), values).into(),
        ])?;

        let out = year_table_path(scratch, variable, year);
        let file = File::create(&out)?;
        CsvWriter::new(file).include_header(true).finish(&mut df)?;
        debug!("extracted {} {} for '{}' to {:?}", variable, year, location.name, out);
        Ok(out)
    }
}

/// Scratch path of the per-year table for one variable.
pub fn year_table_path(scratch: &Path, variable: Variable, year: i32) -> PathBuf {
    scratch.join(format!("{}-{}.csv", variable.id(), year))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn grid_path_follows_the_yearwise_convention() {
        let fetcher = GridFetcher::new(Path::new("/data"));
        assert_eq!(
            fetcher.grid_path(Variable::Rain, 2020),
            PathBuf::from("/data/rain/2020.GRD")
        );
        assert_eq!(
            fetcher.grid_path(Variable::Tmin, 1999),
            PathBuf::from("/data/tmin/1999.GRD")
        );
    }

    #[test]
    fn ensure_grid_skips_download_when_file_exists() {
        let dir = tempdir().unwrap();
        let fetcher = GridFetcher::new(dir.path());
        let path = fetcher.grid_path(Variable::Tmax, 2001);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not a real grid").unwrap();

        // Would hit the network if presence on disk were not honoured.
        let resolved = fetcher.ensure_grid(Variable::Tmax, 2001).unwrap();
        assert_eq!(resolved, path);
        assert_eq!(fs::read(&resolved).unwrap(), b"not a real grid");
    }
}
