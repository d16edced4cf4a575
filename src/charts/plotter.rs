//! Chart Plotter Module
//! Resolves panel descriptors against the data tables into plotted content.
//!
//! Nothing here touches a drawing backend, so the exact series, slices and
//! bars of every panel can be inspected before anything is rendered.

use crate::charts::layout::{ChartKind, DataSource, PanelSpec, PANELS};
use crate::config::{COL_CI, COUNTRY_CODES};
use polars::prelude::*;
use plotters::style::RGBColor;
use thiserror::Error;
use tracing::{debug, warn};

/// Colour cycle for countries
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(238, 102, 102), // Red
    RGBColor(60, 189, 45),   // Green
    RGBColor(71, 245, 236),  // Cyan
    RGBColor(238, 204, 85),  // Sand
    RGBColor(212, 47, 173),  // Magenta
    RGBColor(204, 116, 247), // Lilac
    RGBColor(128, 145, 133), // Grey Green
    RGBColor(245, 168, 2),   // Orange
    RGBColor(229, 2, 245),   // Violet
    RGBColor(64, 38, 51),    // Aubergine
];

/// Smallest and largest scatter marker area, in square pixels.
pub const MARKER_AREA: (f64, f64) = (20.0, 200.0);

#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Panel {panel:?} needs column {column:?}, which the table does not have")]
    MetricMissing { panel: &'static str, column: String },
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// The tables panels draw from.
pub struct DashboardTables {
    pub observations: DataFrame,
    pub yearly: DataFrame,
    /// Mean and interval of the bar panel metric per (year, country)
    pub spread: DataFrame,
    pub regional: DataFrame,
}

impl DashboardTables {
    pub fn source(&self, source: DataSource) -> &DataFrame {
        match source {
            DataSource::Observations => &self.observations,
            DataSource::Yearly => &self.yearly,
            DataSource::YearlySpread => &self.spread,
            DataSource::Regional => &self.regional,
        }
    }
}

/// A named series and its slot in the colour cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesKey {
    pub label: String,
    pub color: usize,
}

impl SeriesKey {
    pub fn rgb(&self) -> RGBColor {
        PALETTE[self.color % PALETTE.len()]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineData {
    pub key: SeriesKey,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    /// Index into the panel's series keys
    pub series: usize,
    pub area: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlotContent {
    Lines(Vec<LineData>),
    Pie(Vec<(String, f64)>),
    Scatter {
        keys: Vec<SeriesKey>,
        points: Vec<ScatterPoint>,
    },
    Bars {
        categories: Vec<i64>,
        keys: Vec<SeriesKey>,
        /// `values[category][key]`
        values: Vec<Vec<Option<f64>>>,
        /// Error bar half-widths, same shape as `values`
        errors: Vec<Vec<Option<f64>>>,
    },
}

/// Resolved content of one panel.
#[derive(Debug, Clone)]
pub struct ChartData {
    pub spec: PanelSpec,
    pub content: PlotContent,
}

impl ChartData {
    /// Series shown in the panel legend.
    pub fn legend_keys(&self) -> Vec<SeriesKey> {
        match &self.content {
            PlotContent::Lines(series) => series.iter().map(|s| s.key.clone()).collect(),
            PlotContent::Scatter { keys, .. } | PlotContent::Bars { keys, .. } => keys.clone(),
            PlotContent::Pie(_) => Vec::new(),
        }
    }
}

/// Builds [`ChartData`] for every panel.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Resolve all dashboard panels, in layout order.
    pub fn plan(tables: &DashboardTables) -> Result<Vec<ChartData>, PlotError> {
        PANELS
            .iter()
            .map(|spec| Self::build(spec, tables.source(spec.source)))
            .collect()
    }

    /// Resolve one panel against its table.
    pub fn build(spec: &PanelSpec, df: &DataFrame) -> Result<ChartData, PlotError> {
        let content = match spec.kind {
            ChartKind::Line => Self::lines(spec, df)?,
            ChartKind::Pie => Self::pie(spec, df)?,
            ChartKind::Scatter => Self::scatter(spec, df)?,
            ChartKind::GroupedBar => Self::bars(spec, df)?,
        };
        debug!(panel = spec.title, "planned");

        Ok(ChartData {
            spec: *spec,
            content,
        })
    }

    /// One line per country of the fixed country list, points sorted by x.
    fn lines(spec: &PanelSpec, df: &DataFrame) -> Result<PlotContent, PlotError> {
        let xs = Self::f64_values(spec, df, spec.x)?;
        let ys = Self::f64_values(spec, df, spec.y)?;
        let labels = Self::str_values(spec, df, spec.series)?;

        let mut series = Vec::new();
        for (color, code) in COUNTRY_CODES.iter().enumerate() {
            let mut points: Vec<(f64, f64)> = labels
                .iter()
                .zip(xs.iter().zip(ys.iter()))
                .filter(|(label, _)| label.as_deref() == Some(*code))
                .filter_map(|(_, (x, y))| Some(((*x)?, (*y)?)))
                .collect();
            if points.is_empty() {
                continue;
            }
            points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            series.push(LineData {
                key: SeriesKey {
                    label: code.to_string(),
                    color,
                },
                points,
            });
        }

        Ok(PlotContent::Lines(series))
    }

    /// One slice per row. Slices that cannot be drawn as a wedge are dropped.
    fn pie(spec: &PanelSpec, df: &DataFrame) -> Result<PlotContent, PlotError> {
        let labels = Self::str_values(spec, df, spec.series)?;
        let values = Self::f64_values(spec, df, spec.y)?;

        let mut slices = Vec::new();
        for (label, value) in labels.into_iter().zip(values) {
            let label = label.unwrap_or_default();
            match value {
                Some(v) if v.is_finite() && v >= 0.0 => slices.push((label, v)),
                other => warn!(
                    panel = spec.title,
                    "skipping slice {:?} with value {:?}", label, other
                ),
            }
        }

        Ok(PlotContent::Pie(slices))
    }

    /// Points coloured by series, marker area scaled linearly from the y
    /// value into [`MARKER_AREA`].
    fn scatter(spec: &PanelSpec, df: &DataFrame) -> Result<PlotContent, PlotError> {
        let xs = Self::f64_values(spec, df, spec.x)?;
        let ys = Self::f64_values(spec, df, spec.y)?;
        let labels = Self::str_values(spec, df, spec.series)?;
        let keys = Self::series_keys(&labels);

        let (min, max) = ys
            .iter()
            .flatten()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let (small, large) = MARKER_AREA;

        let points = labels
            .iter()
            .zip(xs.iter().zip(ys.iter()))
            .filter_map(|(label, (x, y))| {
                let label = label.as_deref()?;
                let (x, y) = ((*x)?, (*y)?);
                let series = keys.iter().position(|k| k.label == label)?;
                let area = if max > min {
                    small + (y - min) / (max - min) * (large - small)
                } else {
                    (small + large) / 2.0
                };
                Some(ScatterPoint { x, y, series, area })
            })
            .collect();

        Ok(PlotContent::Scatter { keys, points })
    }

    /// Lays an aggregated table (one row per x category and series) out as
    /// a category x series grid, categories sorted ascending. Error bars are
    /// read from the interval column when the table carries one.
    fn bars(spec: &PanelSpec, df: &DataFrame) -> Result<PlotContent, PlotError> {
        let xs = Self::f64_values(spec, df, spec.x)?;
        let ys = Self::f64_values(spec, df, spec.y)?;
        let labels = Self::str_values(spec, df, spec.series)?;
        let spreads = Self::optional_f64_values(df, COL_CI)?;
        let keys = Self::series_keys(&labels);

        let mut categories: Vec<i64> = xs.iter().flatten().map(|x| x.round() as i64).collect();
        categories.sort_unstable();
        categories.dedup();

        let mut values = vec![vec![None; keys.len()]; categories.len()];
        let mut errors = values.clone();

        for (row, (label, x)) in labels.iter().zip(xs.iter()).enumerate() {
            let (Some(label), Some(x)) = (label.as_deref(), x) else {
                continue;
            };
            let Ok(c) = categories.binary_search(&(x.round() as i64)) else {
                continue;
            };
            let Some(k) = keys.iter().position(|key| key.label == label) else {
                continue;
            };
            values[c][k] = ys[row];
            errors[c][k] = spreads.get(row).copied().flatten();
        }

        Ok(PlotContent::Bars {
            categories,
            keys,
            values,
            errors,
        })
    }

    /// Distinct series labels: fixed-list countries first in list order,
    /// then any others in order of appearance.
    pub fn series_keys(labels: &[Option<String>]) -> Vec<SeriesKey> {
        let present = |code: &str| labels.iter().any(|l| l.as_deref() == Some(code));

        let mut keys: Vec<SeriesKey> = COUNTRY_CODES
            .iter()
            .enumerate()
            .filter(|(_, code)| present(code))
            .map(|(color, code)| SeriesKey {
                label: code.to_string(),
                color,
            })
            .collect();

        let mut extra = COUNTRY_CODES.len();
        for label in labels.iter().flatten() {
            if !keys.iter().any(|k| &k.label == label) {
                keys.push(SeriesKey {
                    label: label.clone(),
                    color: extra,
                });
                extra += 1;
            }
        }

        keys
    }

    fn column<'a>(
        spec: &PanelSpec,
        df: &'a DataFrame,
        name: &str,
    ) -> Result<&'a Column, PlotError> {
        df.column(name).map_err(|_| PlotError::MetricMissing {
            panel: spec.title,
            column: name.to_string(),
        })
    }

    fn f64_values(
        spec: &PanelSpec,
        df: &DataFrame,
        name: &str,
    ) -> Result<Vec<Option<f64>>, PlotError> {
        let column = Self::column(spec, df, name)?.cast(&DataType::Float64)?;
        Ok(column.f64()?.into_iter().collect())
    }

    /// Values of a column the table may lack; absent columns read as all null.
    fn optional_f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, PlotError> {
        let Ok(column) = df.column(name) else {
            return Ok(vec![None; df.height()]);
        };
        let column = column.cast(&DataType::Float64)?;
        Ok(column.f64()?.into_iter().collect())
    }

    fn str_values(
        spec: &PanelSpec,
        df: &DataFrame,
        name: &str,
    ) -> Result<Vec<Option<String>>, PlotError> {
        let column = Self::column(spec, df, name)?.cast(&DataType::String)?;
        Ok(column
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        COL_CO2, COL_COUNTRY, COL_ELECTRICITY, COL_ENERGY_USE, COL_EXPORTS, COL_GDP_GROWTH,
        COL_GDP_PER_CAPITA, COL_INFLATION, COL_YEAR, REGION_MAP,
    };
    use crate::data::DataProcessor;

    fn observations() -> DataFrame {
        df!(
            COL_YEAR => [2012i64, 2013, 2012, 2013],
            COL_COUNTRY => ["USA", "USA", "NGA", "NGA"],
            COL_EXPORTS => [13.0, 14.0, 20.0, 18.0],
            COL_GDP_PER_CAPITA => [100.0, 110.0, 2.5, 2.9],
            COL_CO2 => [16.0, 15.5, 0.5, 0.6],
            COL_ELECTRICITY => [100.0, 100.0, 53.0, 55.0],
            COL_INFLATION => [2.0, 1.0, 12.0, 8.0],
            COL_GDP_GROWTH => [2.2, 1.8, 4.3, 5.4],
            COL_ENERGY_USE => [6.9, 6.8, 0.7, 0.8]
        )
        .unwrap()
    }

    fn tables(observations: DataFrame) -> DashboardTables {
        let yearly = DataProcessor::yearly_means(&observations).unwrap();
        let spread = DataProcessor::yearly_spread(&observations, COL_GDP_GROWTH).unwrap();
        let regional = DataProcessor::regional_means(&observations, &REGION_MAP).unwrap();
        DashboardTables {
            observations,
            yearly,
            spread,
            regional,
        }
    }

    #[test]
    fn gdp_panel_plots_usa_points() {
        let charts = ChartPlotter::plan(&tables(observations())).unwrap();
        assert_eq!(charts.len(), 8);

        let PlotContent::Lines(series) = &charts[0].content else {
            panic!("first panel is not a line chart");
        };
        let usa = series.iter().find(|s| s.key.label == "USA").unwrap();
        assert_eq!(usa.points, vec![(2012.0, 100.0), (2013.0, 110.0)]);
        assert_eq!(usa.key.color, 4);
    }

    #[test]
    fn line_series_follow_country_list_order() {
        let charts = ChartPlotter::plan(&tables(observations())).unwrap();
        let labels: Vec<String> = charts[1]
            .legend_keys()
            .into_iter()
            .map(|k| k.label)
            .collect();
        // NGA precedes USA in the fixed list
        assert_eq!(labels, vec!["NGA", "USA"]);
    }

    #[test]
    fn pies_slice_by_region() {
        let charts = ChartPlotter::plan(&tables(observations())).unwrap();
        let PlotContent::Pie(slices) = &charts[4].content else {
            panic!("fifth panel is not a pie");
        };
        assert_eq!(charts[4].spec.y, COL_INFLATION);
        assert_eq!(
            slices,
            &vec![
                ("Africa".to_string(), 10.0),
                ("North America".to_string(), 1.5)
            ]
        );
    }

    #[test]
    fn negative_slices_are_dropped() {
        let df = df!(
            "region" => ["Africa", "Asia"],
            COL_INFLATION => [-0.5, 3.0]
        )
        .unwrap();
        let spec = PANELS[4];
        let chart = ChartPlotter::build(&spec, &df).unwrap();
        assert_eq!(
            chart.content,
            PlotContent::Pie(vec![("Asia".to_string(), 3.0)])
        );
    }

    #[test]
    fn scatter_sizes_follow_inflation() {
        let charts = ChartPlotter::plan(&tables(observations())).unwrap();
        let PlotContent::Scatter { keys, points } = &charts[6].content else {
            panic!("seventh panel is not a scatter");
        };
        assert_eq!(keys.len(), 2);
        assert_eq!(points.len(), 4);

        let smallest = points.iter().find(|p| p.y == 1.0).unwrap();
        let largest = points.iter().find(|p| p.y == 12.0).unwrap();
        assert_eq!(smallest.area, MARKER_AREA.0);
        assert_eq!(largest.area, MARKER_AREA.1);
    }

    #[test]
    fn bars_lay_out_aggregated_means() {
        let df = df!(
            COL_YEAR => [2013i64, 2012, 2012, 2013],
            COL_COUNTRY => ["KEN", "KEN", "KEN", "GHA"],
            COL_GDP_GROWTH => [5.0, 4.0, 6.0, 7.0]
        )
        .unwrap();
        let spread = DataProcessor::yearly_spread(&df, COL_GDP_GROWTH).unwrap();
        let chart = ChartPlotter::build(&PANELS[7], &spread).unwrap();

        let PlotContent::Bars {
            categories,
            keys,
            values,
            errors,
        } = chart.content
        else {
            panic!("last panel is not a bar chart");
        };
        assert_eq!(categories, vec![2012, 2013]);
        let labels: Vec<&str> = keys.iter().map(|k| k.label.as_str()).collect();
        assert_eq!(labels, vec!["GHA", "KEN"]);
        assert_eq!(values[0], vec![None, Some(5.0)]);
        assert_eq!(values[1], vec![Some(7.0), Some(5.0)]);

        assert_eq!(errors[0][0], None);
        assert!((errors[0][1].unwrap() - 1.96).abs() < 1e-9);
        assert_eq!(errors[1], vec![None, None]);
    }

    #[test]
    fn bars_without_interval_column_have_no_error_bars() {
        let df = df!(
            COL_YEAR => [2012i64, 2012],
            COL_COUNTRY => ["USA", "NGA"],
            COL_GDP_GROWTH => [2.2, 4.3]
        )
        .unwrap();
        let chart = ChartPlotter::build(&PANELS[7], &df).unwrap();

        let PlotContent::Bars { values, errors, .. } = chart.content else {
            panic!("last panel is not a bar chart");
        };
        assert_eq!(values, vec![vec![Some(4.3), Some(2.2)]]);
        assert_eq!(errors, vec![vec![None, None]]);
    }

    #[test]
    fn bar_panel_reads_spread_table() {
        let charts = ChartPlotter::plan(&tables(observations())).unwrap();
        assert_eq!(charts[7].spec.source, DataSource::YearlySpread);
        let PlotContent::Bars { values, .. } = &charts[7].content else {
            panic!("last panel is not a bar chart");
        };
        // NGA then USA, 2012 row
        assert_eq!(values[0], vec![Some(4.3), Some(2.2)]);
    }

    #[test]
    fn missing_metric_is_reported() {
        let df = observations().drop(COL_INFLATION).unwrap();
        let err = ChartPlotter::build(&PANELS[6], &df).unwrap_err();
        match err {
            PlotError::MetricMissing { column, .. } => assert_eq!(column, COL_INFLATION),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_countries_get_later_colours() {
        let labels = vec![
            Some("ZZZ".to_string()),
            Some("USA".to_string()),
            None,
            Some("ZZZ".to_string()),
        ];
        let keys = ChartPlotter::series_keys(&labels);
        assert_eq!(
            keys,
            vec![
                SeriesKey {
                    label: "USA".to_string(),
                    color: 4
                },
                SeriesKey {
                    label: "ZZZ".to_string(),
                    color: 10
                },
            ]
        );
    }
}
