//! # Series Merger
//!
//! Combines the per-year scratch tables of one location into a single daily
//! table with the fixed schema `Date,RF,TMAX,TMIN` plus derived calendar
//! columns.
//!
//! ## Key steps
//!
//! - Per-variable concatenation in explicit ascending-year order (never
//!   directory discovery order)
//! - Inner join of the three variables on date: dates missing from any one
//!   series are silently dropped
//! - One-decimal rounding of all measured values
//! - `Year`, `Month` and `Season` derivation from the date

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use log::debug;
use polars::prelude::*;

use crate::error::{PipelineError, Result};
use crate::fetch::year_table_path;
use crate::grid::Variable;

/// Aggregation season, per the convention used for Indian climate summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Winter,
    Summer,
    SouthWestMonsoon,
    NorthEastMonsoon,
}

impl Season {
    /// Maps a calendar month (1-12) to its season. The mapping is total:
    /// every month belongs to exactly one season.
    pub fn from_month(month: u32) -> Season {
        match month {
            6..=9 => Season::SouthWestMonsoon,
            10..=12 => Season::NorthEastMonsoon,
            1..=3 => Season::Winter,
            _ => Season::Summer,
        }
    }

    /// Label used in the seasonal summary tables.
    pub fn label(&self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Summer => "Summer",
            Season::SouthWestMonsoon => "SWM",
            Season::NorthEastMonsoon => "NEM",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rounds a value to one decimal place, half away from zero.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Rounds every value of the named `f64` columns to one decimal place.
pub fn round_one_decimal(df: &mut DataFrame, columns: &[&str]) -> Result<()> {
    for name in columns {
        let rounded = df
            .column(name)?
            .as_materialized_series()
            .f64()?
            .apply_values(round1)
            .into_series();
        df.replace(name, rounded)?;
    }
    Ok(())
}

/// Merges the per-year scratch tables of one location into the daily schema.
///
/// Reads `{variable}-{year}.csv` for every variable and every year of the
/// requested range, concatenates each variable's years in ascending order,
/// inner-joins the three series on date, renames to `Date,RF,TMAX,TMIN`,
/// sorts by date, rounds to one decimal and appends `Year`, `Month` and
/// `Season` columns.
///
/// # Errors
///
/// Fails if the range is inverted, a scratch table is missing or unreadable,
/// or a date value cannot be parsed.
pub fn merge_location_series(scratch: &Path, start_year: i32, end_year: i32) -> Result<DataFrame> {
    if start_year > end_year {
        return Err(PipelineError::YearRange {
            start: start_year,
            end: end_year,
        });
    }

    let rain = concat_variable_years(scratch, Variable::Rain, start_year, end_year)?;
    let tmax = concat_variable_years(scratch, Variable::Tmax, start_year, end_year)?;
    let tmin = concat_variable_years(scratch, Variable::Tmin, start_year, end_year)?;

    let mut merged = rain
        .lazy()
        .join(
            tmax.lazy(),
            [col("DateTime")],
            [col("DateTime")],
            JoinArgs::new(JoinType::Inner),
        )
        .join(
            tmin.lazy(),
            [col("DateTime")],
            [col("DateTime")],
            JoinArgs::new(JoinType::Inner),
        )
        .collect()?;

    merged.rename("DateTime", "Date".into())?;
    merged.rename(Variable::Rain.id(), Variable::Rain.column().into())?;
    merged.rename(Variable::Tmax.id(), Variable::Tmax.column().into())?;
    merged.rename(Variable::Tmin.id(), Variable::Tmin.column().into())?;

    // ISO dates sort chronologically as strings.
    let mut merged = merged.sort(["Date"], SortMultipleOptions::default())?;
    round_one_decimal(&mut merged, &["RF", "TMAX", "TMIN"])?;
    append_calendar_columns(&mut merged)?;

    debug!(
        "merged {} daily rows spanning {}-{}",
        merged.height(),
        start_year,
        end_year
    );
    Ok(merged)
}

/// Concatenates one variable's per-year tables in ascending year order.
fn concat_variable_years(
    scratch: &Path,
    variable: Variable,
    start_year: i32,
    end_year: i32,
) -> Result<DataFrame> {
    let mut combined: Option<DataFrame> = None;
    for year in start_year..=end_year {
        let df = read_year_table(scratch, variable, year)?;
        combined = Some(match combined {
            None => df,
            Some(acc) => acc.vstack(&df)?,
        });
    }
    combined.ok_or(PipelineError::YearRange {
        start: start_year,
        end: end_year,
    })
}

fn read_year_table(scratch: &Path, variable: Variable, year: i32) -> Result<DataFrame> {
    // Fixed schema so that an empty table still concatenates with filled ones.
    let schema = Schema::from_iter([
        Field::new("DateTime".into(), DataType::String),
        Field::new(variable.id().into(), DataType::Float64),
    ]);
    let path = year_table_path(scratch, variable, year);
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_schema(Some(Arc::new(schema)))
        .try_into_reader_with_file_path(Some(path))?
        .finish()?;
    Ok(df)
}

/// Derives `Year`, `Month` and `Season` columns from the ISO `Date` column.
fn append_calendar_columns(df: &mut DataFrame) -> Result<()> {
    let mut years = Vec::with_capacity(df.height());
    let mut months = Vec::with_capacity(df.height());
    let mut seasons = Vec::with_capacity(df.height());

    for value in df.column("Date")?.as_materialized_series().str()? {
        let raw = value.ok_or_else(|| PipelineError::DateParse(String::new()))?;
        let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| PipelineError::DateParse(raw.to_string()))?;
        years.push(date.year());
        months.push(date.month() as i32);
        seasons.push(Season::from_month(date.month()).label());
    }

    df.with_column(Series::new("Year".into(), years))?;
    df.with_column(Series::new("Month".into(), months))?;
    df.with_column(Series::new("Season".into(), seasons))?;
    Ok(())
}
