//! # IMD Grid Model
//!
//! Geometry and binary decoding for the yearwise gridded datasets published
//! by the India Meteorological Department (IMD), Pune.
//!
//! A `.GRD` file is a raw little-endian `f32` array of shape
//! `(days, nlat, nlon)`, one 2-D field per day of the year. The grid layout
//! differs per variable: rainfall is published on a 0.25° grid, the
//! temperature products on a 1° grid. Fill values are passed through
//! unmasked, exactly as they appear in the source file.

use std::fmt;
use std::path::Path;

use chrono::{Duration, NaiveDate};

use crate::error::{PipelineError, Result};

/// One of the gridded climate variables published by IMD Pune.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    Rain,
    Tmax,
    Tmin,
}

impl Variable {
    /// All variables of the point-extraction pipeline, in merge order.
    pub const ALL: [Variable; 3] = [Variable::Rain, Variable::Tmax, Variable::Tmin];

    /// Identifier used for grid directories and scratch-file prefixes.
    pub fn id(&self) -> &'static str {
        match self {
            Variable::Rain => "rain",
            Variable::Tmax => "tmax",
            Variable::Tmin => "tmin",
        }
    }

    /// Column name this variable carries in the merged daily schema.
    pub fn column(&self) -> &'static str {
        match self {
            Variable::Rain => "RF",
            Variable::Tmax => "TMAX",
            Variable::Tmin => "TMIN",
        }
    }

    /// Download endpoint at the IMD Pune data portal.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Variable::Rain => "https://www.imdpune.gov.in/cmpg/Griddata/RF25.php",
            Variable::Tmax => "https://www.imdpune.gov.in/cmpg/Griddata/maxT.php",
            Variable::Tmin => "https://www.imdpune.gov.in/cmpg/Griddata/minT.php",
        }
    }

    /// Form field carrying the requested year in the download request.
    pub fn form_field(&self) -> &'static str {
        match self {
            Variable::Rain => "RF25",
            Variable::Tmax => "maxT",
            Variable::Tmin => "minT",
        }
    }

    /// Spatial layout of this variable's grid.
    pub fn geometry(&self) -> GridGeometry {
        match self {
            Variable::Rain => GridGeometry {
                first_lat: 6.5,
                first_lon: 66.5,
                step: 0.25,
                nlat: 129,
                nlon: 135,
                fill: -999.0,
            },
            Variable::Tmax | Variable::Tmin => GridGeometry {
                first_lat: 7.5,
                first_lon: 67.5,
                step: 1.0,
                nlat: 31,
                nlon: 31,
                fill: 99.9,
            },
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Regular spatial layout of one variable's grid.
#[derive(Debug, Clone, Copy)]
pub struct GridGeometry {
    pub first_lat: f64,
    pub first_lon: f64,
    pub step: f64,
    pub nlat: usize,
    pub nlon: usize,
    pub fill: f64,
}

impl GridGeometry {
    /// Latitude axis values, south to north.
    pub fn lat_values(&self) -> Vec<f64> {
        (0..self.nlat)
            .map(|i| self.first_lat + i as f64 * self.step)
            .collect()
    }

    /// Longitude axis values, west to east.
    pub fn lon_values(&self) -> Vec<f64> {
        (0..self.nlon)
            .map(|i| self.first_lon + i as f64 * self.step)
            .collect()
    }

    /// Indices of the grid cell nearest to the given coordinate.
    pub fn nearest_cell(&self, lat: f64, lon: f64) -> (usize, usize) {
        (
            nearest_index(&self.lat_values(), lat),
            nearest_index(&self.lon_values(), lon),
        )
    }
}

fn nearest_index(axis: &[f64], target: f64) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, value) in axis.iter().enumerate() {
        let distance = (value - target).abs();
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}

/// A decoded yearwise grid file: one 2-D field per day of the year.
#[derive(Debug)]
pub struct YearGrid {
    variable: Variable,
    start_date: NaiveDate,
    days: usize,
    values: Vec<f32>,
}

impl YearGrid {
    /// Decodes a raw `.GRD` file for one variable and year.
    ///
    /// The byte length must equal `days_in_year * nlat * nlon * 4`; anything
    /// else is rejected with a [`PipelineError::GridShape`] error rather than
    /// silently misaligning the day planes.
    pub fn decode(variable: Variable, year: i32, path: &Path) -> Result<Self> {
        let start_date = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or(PipelineError::YearOutOfRange(year))?;
        let days = days_in_year(year);
        let geometry = variable.geometry();
        let expected = days * geometry.nlat * geometry.nlon;

        let bytes = std::fs::read(path)?;
        if bytes.len() != expected * 4 {
            return Err(PipelineError::GridShape {
                path: path.to_path_buf(),
                expected,
                found: bytes.len() / 4,
                days,
            });
        }

        let values = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(YearGrid {
            variable,
            start_date,
            days,
            values,
        })
    }

    /// Scalar time series at the grid cell nearest to `(lat, lon)`.
    ///
    /// Returns one `(date, value)` pair per day of the year, in calendar
    /// order. Fill values are not masked.
    pub fn point_series(&self, lat: f64, lon: f64) -> Vec<(NaiveDate, f32)> {
        let geometry = self.variable.geometry();
        let (lat_idx, lon_idx) = geometry.nearest_cell(lat, lon);
        let plane = geometry.nlat * geometry.nlon;

        (0..self.days)
            .map(|day| {
                let date = self.start_date + Duration::days(day as i64);
                let value = self.values[day * plane + lat_idx * geometry.nlon + lon_idx];
                (date, value)
            })
            .collect()
    }
}

/// Number of calendar days in the given year.
pub fn days_in_year(year: i32) -> usize {
    let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
    if leap { 366 } else { 365 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_in_year_handles_leap_rules() {
        assert_eq!(days_in_year(2023), 365);
        assert_eq!(days_in_year(2024), 366);
        assert_eq!(days_in_year(1900), 365);
        assert_eq!(days_in_year(2000), 366);
    }

    #[test]
    fn nearest_cell_picks_closest_axis_values() {
        let geometry = Variable::Tmax.geometry();
        // 10.2 is closer to 10.5 than to 9.5 on the 1 degree axis starting at 7.5.
        assert_eq!(geometry.nearest_cell(10.2, 78.4), (3, 11));
        // Exact grid values map to themselves.
        assert_eq!(geometry.nearest_cell(7.5, 67.5), (0, 0));
    }

    #[test]
    fn rain_geometry_spans_the_imd_domain() {
        let geometry = Variable::Rain.geometry();
        let lats = geometry.lat_values();
        let lons = geometry.lon_values();
        assert_eq!(lats.len(), 129);
        assert_eq!(lons.len(), 135);
        assert!((lats[128] - 38.5).abs() < 1e-9);
        assert!((lons[134] - 100.0).abs() < 1e-9);
    }
}
