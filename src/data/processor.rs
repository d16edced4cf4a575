//! Data Processor Module
//! Builds the yearly and regional aggregate tables.

use crate::config::{COL_CI, COL_COUNTRY, COL_REGION, COL_YEAR, YEARLY_METRICS};
use polars::prelude::*;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Country {0:?} has no entry in the region map")]
    UnmappedCountry(String),
}

/// Normal quantile for a two-sided 95% interval.
const CI_Z: f64 = 1.96;

/// Handles grouping and aggregation of the observation table.
pub struct DataProcessor;

impl DataProcessor {
    /// Per-(year, country) means of the four yearly metrics.
    ///
    /// Output columns: [year, country, Exports, GDP Per Capita (USD),
    /// co2 emissions, Access to electricity], sorted by year then country.
    /// A group whose metric is null in every row gets a null mean.
    pub fn yearly_means(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let yearly = Self::group_means(df, &[COL_YEAR, COL_COUNTRY], &YEARLY_METRICS)?;
        debug!(groups = yearly.height(), "yearly means");
        Ok(yearly)
    }

    /// Mean of each metric per distinct combination of `keys`, sorted by
    /// `keys`. Metrics are cast to Float64 and nulls are ignored.
    pub fn group_means(
        df: &DataFrame,
        keys: &[&str],
        metrics: &[&str],
    ) -> Result<DataFrame, ProcessorError> {
        let aggs: Vec<Expr> = metrics
            .iter()
            .map(|metric| col(*metric).cast(DataType::Float64).mean())
            .collect();

        let grouped = df
            .clone()
            .lazy()
            .group_by(keys.iter().map(|key| col(*key)).collect::<Vec<_>>())
            .agg(aggs)
            .sort(keys.to_vec(), SortMultipleOptions::default())
            .collect()?;
        Ok(grouped)
    }

    /// Per-(year, country) mean of one metric with its 95% confidence
    /// half-width.
    ///
    /// Output columns: [year, country, <metric>, ci95], sorted by year then
    /// country. The half-width is `1.96 * sd / sqrt(n)` over the non-null
    /// values of the group, and null when the group has fewer than two.
    pub fn yearly_spread(df: &DataFrame, metric: &str) -> Result<DataFrame, ProcessorError> {
        let value = col(metric).cast(DataType::Float64);

        let grouped = df
            .clone()
            .lazy()
            .group_by([col(COL_YEAR), col(COL_COUNTRY)])
            .agg([
                value.clone().mean().alias(metric),
                value.clone().std(1).alias("sd"),
                value.count().alias("n"),
            ])
            .sort([COL_YEAR, COL_COUNTRY], SortMultipleOptions::default())
            .collect()?;

        let sd = grouped.column("sd")?.f64()?;
        let n = grouped.column("n")?.cast(&DataType::Float64)?;
        let ci: Vec<Option<f64>> = sd
            .into_iter()
            .zip(n.f64()?.into_iter())
            .map(|(sd, n)| match (sd, n) {
                (Some(sd), Some(n)) if n >= 2.0 && sd.is_finite() => Some(CI_Z * sd / n.sqrt()),
                _ => None,
            })
            .collect();

        let mut spread = grouped.select([COL_YEAR, COL_COUNTRY, metric])?;
        spread.with_column(Column::new(COL_CI.into(), ci))?;

        debug!(groups = spread.height(), metric, "yearly spread");
        Ok(spread)
    }

    /// Per-region means of every numeric column.
    ///
    /// Each row is assigned a region by looking its country up in
    /// `region_map`. A country missing from the map is an error; rows are
    /// never skipped. Output columns: [region, <numeric columns in source
    /// order>], sorted by region.
    pub fn regional_means(
        df: &DataFrame,
        region_map: &[(&str, &str)],
    ) -> Result<DataFrame, ProcessorError> {
        let countries = df.column(COL_COUNTRY)?.cast(&DataType::String)?;
        let countries = countries.str()?;

        let mut regions: Vec<&str> = Vec::with_capacity(df.height());
        for country in countries.into_iter() {
            let code = country.unwrap_or_default();
            let region = region_map
                .iter()
                .find(|(key, _)| *key == code)
                .map(|(_, region)| *region)
                .ok_or_else(|| ProcessorError::UnmappedCountry(code.to_string()))?;
            regions.push(region);
        }

        let numeric = Self::numeric_columns(df);
        let metrics: Vec<&str> = numeric.iter().map(String::as_str).collect();

        let mut with_region = df.clone();
        with_region.with_column(Column::new(COL_REGION.into(), regions))?;

        let regional = Self::group_means(&with_region, &[COL_REGION], &metrics)?;

        debug!(regions = regional.height(), "regional means");
        Ok(regional)
    }

    /// Names of numeric columns, in source order.
    pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
        df.get_columns()
            .iter()
            .filter(|col| {
                matches!(
                    col.dtype(),
                    DataType::Float32
                        | DataType::Float64
                        | DataType::Int8
                        | DataType::Int16
                        | DataType::Int32
                        | DataType::Int64
                        | DataType::UInt8
                        | DataType::UInt16
                        | DataType::UInt32
                        | DataType::UInt64
                )
            })
            .map(|col| col.name().to_string())
            .collect()
    }
}
