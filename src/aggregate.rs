//! # Temporal Aggregation
//!
//! Independent reductions over the merged daily table: annual, monthly and
//! seasonal summaries. All three use the same reduction functions (rainfall
//! is summed, temperatures are averaged) and round the results to one
//! decimal place. Sums and means cover only the rows that are present; there
//! is no interpolation or gap filling for missing days.

use polars::prelude::*;

use crate::error::Result;
use crate::merge::round_one_decimal;

/// Annual summary: one row per `Year`.
pub fn annual_summary(daily: &DataFrame) -> Result<DataFrame> {
    grouped_summary(daily, &["Year"])
}

/// Monthly summary: one row per `(Year, Month)`.
pub fn monthly_summary(daily: &DataFrame) -> Result<DataFrame> {
    grouped_summary(daily, &["Year", "Month"])
}

/// Seasonal summary: one row per `(Year, Season)`.
pub fn seasonal_summary(daily: &DataFrame) -> Result<DataFrame> {
    grouped_summary(daily, &["Year", "Season"])
}

fn grouped_summary(daily: &DataFrame, keys: &[&str]) -> Result<DataFrame> {
    let key_exprs: Vec<Expr> = keys.iter().map(|key| col(*key)).collect();
    let key_names: Vec<PlSmallStr> = keys.iter().map(|key| (*key).into()).collect();
    let mut summary = daily
        .clone()
        .lazy()
        .group_by(key_exprs)
        .agg([col("RF").sum(), col("TMAX").mean(), col("TMIN").mean()])
        .sort(key_names, SortMultipleOptions::default())
        .collect()?;
    round_one_decimal(&mut summary, &["RF", "TMAX", "TMIN"])?;
    Ok(summary)
}
