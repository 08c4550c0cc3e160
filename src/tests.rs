use std::fs;
use std::path::Path;

use crate::fetch::year_table_path;
use crate::grid::Variable;

/// Writes a per-year scratch table by hand, bypassing the fetcher.
fn write_year_table(scratch: &Path, variable: Variable, year: i32, rows: &[(&str, f64)]) {
    let mut body = format!("DateTime,{}\n", variable.id());
    for (date, value) in rows {
        body.push_str(&format!("{},{}\n", date, value));
    }
    fs::write(year_table_path(scratch, variable, year), body).unwrap();
}

/// Writes a synthetic `.GRD` file with the correct shape for the variable and
/// year, filled by `value_at(day, lat_idx, lon_idx)`.
fn write_grid_file(path: &Path, variable: Variable, year: i32, value_at: impl Fn(usize, usize, usize) -> f32) {
    let geometry = variable.geometry();
    let days = crate::grid::days_in_year(year);
    let mut bytes = Vec::with_capacity(days * geometry.nlat * geometry.nlon * 4);
    for day in 0..days {
        for i in 0..geometry.nlat {
            for j in 0..geometry.nlon {
                bytes.extend_from_slice(&value_at(day, i, j).to_le_bytes());
            }
        }
    }
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

/// Creates a NetCDF fixture with time/lat/lon axes and one data variable,
/// filled by `value_at(time_idx, lat_idx, lon_idx)`.
fn create_grid_nc(
    path: &Path,
    var_name: &str,
    lats: &[f64],
    lons: &[f64],
    steps: usize,
    value_at: impl Fn(usize, usize, usize) -> f64,
) {
    let mut file = netcdf::create(path).unwrap();
    file.add_dimension("time", steps).unwrap();
    file.add_dimension("lat", lats.len()).unwrap();
    file.add_dimension("lon", lons.len()).unwrap();

    let mut time_var = file.add_variable::<f64>("time", &["time"]).unwrap();
    time_var.put_attribute("units", "days since 2023-01-01").unwrap();
    let time_data: Vec<f64> = (0..steps).map(|t| t as f64).collect();
    time_var.put_values(&time_data, ..).unwrap();

    let mut lat_var = file.add_variable::<f64>("lat", &["lat"]).unwrap();
    lat_var.put_values(lats, ..).unwrap();
    let mut lon_var = file.add_variable::<f64>("lon", &["lon"]).unwrap();
    lon_var.put_values(lons, ..).unwrap();

    let mut data_var = file
        .add_variable::<f64>(var_name, &["time", "lat", "lon"])
        .unwrap();
    let mut data = Vec::with_capacity(steps * lats.len() * lons.len());
    for t in 0..steps {
        for i in 0..lats.len() {
            for j in 0..lons.len() {
                data.push(value_at(t, i, j));
            }
        }
    }
    data_var.put_values(&data, ..).unwrap();
}

#[cfg(test)]
mod grid_decode_tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::grid::YearGrid;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[test]
    fn decode_reads_the_nearest_cell_series_in_calendar_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("2005.GRD");
        // Day index at the cell nearest to (10.2, 78.4), zero elsewhere.
        write_grid_file(&path, Variable::Tmax, 2005, |day, i, j| {
            if (i, j) == (3, 11) { day as f32 } else { 0.0 }
        });

        let grid = YearGrid::decode(Variable::Tmax, 2005, &path).unwrap();
        let series = grid.point_series(10.2, 78.4);

        assert_eq!(series.len(), 365);
        assert_eq!(series[0].0, NaiveDate::from_ymd_opt(2005, 1, 1).unwrap());
        assert_eq!(series[364].0, NaiveDate::from_ymd_opt(2005, 12, 31).unwrap());
        assert_eq!(series[0].1, 0.0);
        assert_eq!(series[100].1, 100.0);
    }

    #[test]
    fn decode_rejects_mismatched_byte_lengths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("2005.GRD");
        fs::write(&path, [0u8; 40]).unwrap();

        let err = YearGrid::decode(Variable::Rain, 2005, &path).unwrap_err();
        assert!(matches!(err, PipelineError::GridShape { found: 10, .. }));
    }

    #[test]
    fn leap_years_carry_366_day_planes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("2004.GRD");
        write_grid_file(&path, Variable::Tmin, 2004, |_, _, _| 21.5);

        let grid = YearGrid::decode(Variable::Tmin, 2004, &path).unwrap();
        assert_eq!(grid.point_series(10.5, 78.5).len(), 366);
    }
}

#[cfg(test)]
mod locations_tests {
    use crate::error::PipelineError;
    use crate::locations::load_locations;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn loads_locations_in_row_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input-file.csv");
        fs::write(&path, "Name,lat,lon\nMadurai,9.93,78.12\nChennai,13.08,80.27\n").unwrap();

        let locations = load_locations(&path).unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].name, "Madurai");
        assert_eq!(locations[0].latitude, 9.93);
        assert_eq!(locations[1].longitude, 80.27);
    }

    #[test]
    fn missing_column_is_reported_by_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input-file.csv");
        fs::write(&path, "Name,latitude,lon\nMadurai,9.93,78.12\n").unwrap();

        let err = load_locations(&path).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { column, .. } if column == "lat"));
    }

    #[test]
    fn non_numeric_coordinates_are_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input-file.csv");
        fs::write(&path, "Name,lat,lon\nMadurai,nine,78.12\n").unwrap();

        let err = load_locations(&path).unwrap_err();
        assert!(matches!(err, PipelineError::LocationColumn { column, .. } if column == "lat"));
    }
}

#[cfg(test)]
mod merge_tests {
    use super::*;
    use crate::merge::merge_location_series;
    use tempfile::tempdir;

    #[test]
    fn merged_rows_are_the_dates_present_in_all_three_series() {
        let scratch = tempdir().unwrap();
        let rain = [("2001-01-01", 1.0), ("2001-01-02", 2.0), ("2001-01-03", 3.0)];
        let tmax = [("2001-01-01", 30.0), ("2001-01-03", 31.0)];
        let tmin = [("2001-01-01", 20.0), ("2001-01-02", 21.0), ("2001-01-03", 22.0)];
        write_year_table(scratch.path(), Variable::Rain, 2001, &rain);
        write_year_table(scratch.path(), Variable::Tmax, 2001, &tmax);
        write_year_table(scratch.path(), Variable::Tmin, 2001, &tmin);

        let merged = merge_location_series(scratch.path(), 2001, 2001).unwrap();
        // Inner join on date: 2001-01-02 is missing from tmax and is dropped.
        assert_eq!(merged.height(), 2);
        let dates: Vec<String> = merged
            .column("Date")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap().to_string())
            .collect();
        assert_eq!(dates, ["2001-01-01", "2001-01-03"]);
    }

    #[test]
    fn empty_table_for_one_variable_yields_zero_merged_rows() {
        let scratch = tempdir().unwrap();
        write_year_table(scratch.path(), Variable::Rain, 2001, &[]);
        write_year_table(scratch.path(), Variable::Tmax, 2001, &[("2001-01-01", 30.0)]);
        write_year_table(scratch.path(), Variable::Tmin, 2001, &[("2001-01-01", 20.0)]);

        let merged = merge_location_series(scratch.path(), 2001, 2001).unwrap();
        assert_eq!(merged.height(), 0);
    }

    #[test]
    fn years_concatenate_in_ascending_order_and_values_are_rounded() {
        let scratch = tempdir().unwrap();
        for (year, date) in [(2002, "2002-07-01"), (2001, "2001-02-01")] {
            write_year_table(scratch.path(), Variable::Rain, year, &[(date, 1.24)]);
            write_year_table(scratch.path(), Variable::Tmax, year, &[(date, 30.06)]);
            write_year_table(scratch.path(), Variable::Tmin, year, &[(date, 20.0)]);
        }

        let merged = merge_location_series(scratch.path(), 2001, 2002).unwrap();
        assert_eq!(merged.height(), 2);

        let years: Vec<i32> = merged
            .column("Year")
            .unwrap()
            .as_materialized_series()
            .i32()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap())
            .collect();
        assert_eq!(years, [2001, 2002]);

        let seasons: Vec<String> = merged
            .column("Season")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap().to_string())
            .collect();
        assert_eq!(seasons, ["Winter", "SWM"]);

        let rf = merged.column("RF").unwrap().as_materialized_series().f64().unwrap().get(0).unwrap();
        let tmax = merged.column("TMAX").unwrap().as_materialized_series().f64().unwrap().get(0).unwrap();
        assert_eq!(rf, 1.2);
        assert_eq!(tmax, 30.1);
    }
}

#[cfg(test)]
mod aggregate_tests {
    use crate::aggregate::{annual_summary, monthly_summary, seasonal_summary};
    use polars::prelude::*;

    fn sample_daily() -> DataFrame {
        df! {
            "Date" => ["2001-06-01", "2001-06-02", "2001-11-05", "2002-06-01"],
            "RF" => [1.0_f64, 2.0, 4.0, 8.0],
            "TMAX" => [30.0_f64, 32.0, 28.0, 33.0],
            "TMIN" => [20.0_f64, 22.0, 18.0, 23.0],
            "Year" => [2001_i32, 2001, 2001, 2002],
            "Month" => [6_i32, 6, 11, 6],
            "Season" => ["SWM", "SWM", "NEM", "SWM"],
        }
        .unwrap()
    }

    fn f64_at(df: &DataFrame, column: &str, row: usize) -> f64 {
        df.column(column)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .get(row)
            .unwrap()
    }

    #[test]
    fn annual_rainfall_is_the_sum_of_daily_values() {
        let annual = annual_summary(&sample_daily()).unwrap();
        assert_eq!(annual.height(), 2);
        // 2001: RF 1+2+4, TMAX mean of [30,32,28].
        assert_eq!(f64_at(&annual, "RF", 0), 7.0);
        assert_eq!(f64_at(&annual, "TMAX", 0), 30.0);
        assert_eq!(f64_at(&annual, "TMIN", 0), 20.0);
        assert_eq!(f64_at(&annual, "RF", 1), 8.0);
    }

    #[test]
    fn two_june_days_of_1_05_and_2_05_sum_to_3_1() {
        let daily = df! {
            "Date" => ["2001-06-01", "2001-06-02"],
            "RF" => [1.05_f64, 2.05],
            "TMAX" => [30.0_f64, 31.0],
            "TMIN" => [20.0_f64, 21.0],
            "Year" => [2001_i32, 2001],
            "Month" => [6_i32, 6],
            "Season" => ["SWM", "SWM"],
        }
        .unwrap();

        let annual = annual_summary(&daily).unwrap();
        assert_eq!(f64_at(&annual, "RF", 0), 3.1);
    }

    #[test]
    fn monthly_groups_by_year_and_month() {
        let monthly = monthly_summary(&sample_daily()).unwrap();
        assert_eq!(monthly.height(), 3);
        assert_eq!(
            monthly.get_column_names()
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>(),
            ["Year", "Month", "RF", "TMAX", "TMIN"]
        );
        // (2001, 6) comes first under the ascending sort.
        assert_eq!(f64_at(&monthly, "RF", 0), 3.0);
    }

    #[test]
    fn seasonal_groups_by_year_and_season() {
        let seasonal = seasonal_summary(&sample_daily()).unwrap();
        assert_eq!(seasonal.height(), 3);
        // 2001 NEM sorts before 2001 SWM.
        assert_eq!(f64_at(&seasonal, "RF", 0), 4.0);
        assert_eq!(f64_at(&seasonal, "RF", 1), 3.0);
    }
}

#[cfg(test)]
mod extraction_pipeline_tests {
    use super::*;
    use crate::config::ExtractConfig;
    use crate::fetch::GridFetcher;
    use crate::run_extraction_job;
    use tempfile::tempdir;

    /// End-to-end run over synthetic grid files already present on disk, so
    /// no network fetch happens.
    #[test]
    fn extraction_writes_the_four_summary_tables() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let output_dir = dir.path().join("out");
        let input_csv = dir.path().join("input-file.csv");
        fs::write(&input_csv, "Name,lat,lon\nTestTown,10.5,78.5\n").unwrap();

        let fetcher = GridFetcher::new(&data_dir);
        // (10.5, 78.5) lies exactly on both the 0.25 and the 1 degree grids.
        write_grid_file(&fetcher.grid_path(Variable::Rain, 2005), Variable::Rain, 2005, |_, _, _| 1.0);
        write_grid_file(&fetcher.grid_path(Variable::Tmax, 2005), Variable::Tmax, 2005, |_, _, _| 30.0);
        write_grid_file(&fetcher.grid_path(Variable::Tmin, 2005), Variable::Tmin, 2005, |_, _, _| 20.0);

        let config = ExtractConfig {
            input_csv,
            start_year: 2005,
            end_year: 2005,
            data_dir,
            output_dir: output_dir.clone(),
        };
        run_extraction_job(&config).unwrap();

        for kind in ["daily", "annual", "monthly", "seasonal"] {
            assert!(
                output_dir.join(format!("TestTown_{}.csv", kind)).exists(),
                "missing {} table",
                kind
            );
        }

        let daily = fs::read(output_dir.join("TestTown_daily.csv")).unwrap();
        assert_eq!(&daily[..3], b"\xef\xbb\xbf");
        let daily = String::from_utf8_lossy(&daily[3..]).to_string();
        assert!(daily.starts_with("Date,RF,TMAX,TMIN\n"));
        assert!(daily.contains("2005-01-01,1.0,30.0,20.0"));
        assert_eq!(daily.lines().count(), 366); // header + 365 days

        let annual = fs::read_to_string(output_dir.join("TestTown_annual.csv")).unwrap();
        assert!(annual.contains("2005,365.0,30.0,20.0"));
    }

    #[test]
    fn inverted_year_range_is_rejected_before_any_work() {
        let dir = tempdir().unwrap();
        let input_csv = dir.path().join("input-file.csv");
        fs::write(&input_csv, "Name,lat,lon\nTestTown,10.5,78.5\n").unwrap();

        let config = ExtractConfig {
            input_csv,
            start_year: 2010,
            end_year: 2005,
            data_dir: dir.path().to_path_buf(),
            output_dir: dir.path().to_path_buf(),
        };
        assert!(matches!(
            run_extraction_job(&config).unwrap_err(),
            crate::error::PipelineError::YearRange { start: 2010, end: 2005 }
        ));
    }
}

#[cfg(test)]
mod export_tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::export::export_grid_points;
    use tempfile::tempdir;

    #[test]
    fn exports_one_table_per_exact_grid_point() {
        let dir = tempdir().unwrap();
        let nc_path = dir.path().join("grid.nc");
        create_grid_nc(&nc_path, "pcp", &[10.0, 10.5], &[78.0, 78.5], 3, |t, i, j| {
            (t * 100 + i * 10 + j) as f64
        });

        let out = dir.path().join("output_csvs");
        let outcome = export_grid_points(&nc_path, Some("pcp"), &out).unwrap();
        assert_eq!(outcome.files_written, 4);
        assert_eq!(outcome.collisions, 0);

        for name in ["10.0_78.0.csv", "10.0_78.5.csv", "10.5_78.0.csv", "10.5_78.5.csv"] {
            assert!(out.join(name).exists(), "missing {}", name);
        }

        let table = fs::read_to_string(out.join("10.0_78.0.csv")).unwrap();
        assert!(table.starts_with("time,pcp\n"));
        assert!(table.contains("2023-01-01,0.0"));
        assert!(table.contains("2023-01-02,100.0"));
        assert!(table.contains("2023-01-03,200.0"));
    }

    #[test]
    fn export_disambiguates_truncated_filename_collision() {
        let dir = tempdir().unwrap();
        let nc_path = dir.path().join("grid.nc");
        // 10.0 and 10.04 both truncate to "10.0" at one decimal place.
        create_grid_nc(&nc_path, "pcp", &[10.0, 10.04], &[78.0], 2, |t, i, _| {
            (t + i * 1000) as f64
        });

        let out = dir.path().join("output_csvs");
        let outcome = export_grid_points(&nc_path, Some("pcp"), &out).unwrap();
        assert_eq!(outcome.files_written, 2);
        assert_eq!(outcome.collisions, 1);

        // First point keeps the truncated name, second gets full precision.
        let first = fs::read_to_string(out.join("10.0_78.0.csv")).unwrap();
        assert!(first.contains("2023-01-01,0.0"));
        let second = fs::read_to_string(out.join("10.04_78.csv")).unwrap();
        assert!(second.contains("2023-01-01,1000.0"));
    }

    #[test]
    fn variable_defaults_to_the_first_one_with_grid_dimensions() {
        let dir = tempdir().unwrap();
        let nc_path = dir.path().join("grid.nc");
        create_grid_nc(&nc_path, "tmean", &[10.0], &[78.0], 2, |t, _, _| t as f64);

        let out = dir.path().join("output_csvs");
        export_grid_points(&nc_path, None, &out).unwrap();
        let table = fs::read_to_string(out.join("10.0_78.0.csv")).unwrap();
        assert!(table.starts_with("time,tmean\n"));
    }

    #[test]
    fn unknown_variable_is_reported_by_name() {
        let dir = tempdir().unwrap();
        let nc_path = dir.path().join("grid.nc");
        create_grid_nc(&nc_path, "pcp", &[10.0], &[78.0], 1, |_, _, _| 0.0);

        let err = export_grid_points(&nc_path, Some("rainfall"), dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::VariableNotFound(name) if name == "rainfall"));
    }

    #[test]
    fn missing_grid_dimension_is_a_validation_error() {
        let dir = tempdir().unwrap();
        let nc_path = dir.path().join("flat.nc");
        {
            let mut file = netcdf::create(&nc_path).unwrap();
            file.add_dimension("time", 2).unwrap();
            file.add_dimension("lat", 2).unwrap();
            let mut var = file.add_variable::<f64>("pcp", &["time", "lat"]).unwrap();
            var.put_values(&[0.0, 1.0, 2.0, 3.0], ..).unwrap();
        }

        let err = export_grid_points(&nc_path, Some("pcp"), dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::MissingDimension(dim) if dim == "lon"));
    }
}

#[cfg(test)]
mod config_tests {
    use crate::config::ExtractConfig;
    use std::path::PathBuf;

    #[test]
    fn job_files_default_the_directories() {
        let json = r#"
        {
            "input_csv": "input-file.csv",
            "start_year": 1991,
            "end_year": 2020
        }"#;

        let config = ExtractConfig::from_json(json).unwrap();
        assert_eq!(config.input_csv, PathBuf::from("input-file.csv"));
        assert_eq!(config.start_year, 1991);
        assert_eq!(config.end_year, 2020);
        assert_eq!(config.data_dir, PathBuf::from("."));
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn malformed_job_files_fail_to_parse() {
        assert!(ExtractConfig::from_json("{\"start_year\": 1991}").is_err());
    }
}
