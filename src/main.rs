//! Indicator Dashboard - CSV to multi-panel PNG
//!
//! Loads per-country yearly indicators, aggregates them by year and by
//! region, and renders a fixed eight-panel dashboard image.

mod charts;
mod config;
mod data;

use anyhow::{Context, Result};
use charts::{ChartPlotter, DashboardTables, StaticChartRenderer};
use config::{DashboardConfig, COL_GDP_GROWTH, REGION_MAP};
use data::{DataLoader, DataProcessor};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let config = DashboardConfig::default();
    run(&config)
}

/// Load, aggregate, plan and render. Every stage runs to completion before
/// the next starts; any error aborts before the image is written.
fn run(config: &DashboardConfig) -> Result<()> {
    debug!(settings = %serde_json::to_string(config)?, "configuration");

    let observations = DataLoader::load_csv(&config.input_path)
        .with_context(|| format!("loading {}", config.input_path.display()))?;

    let yearly =
        DataProcessor::yearly_means(&observations).context("computing yearly means")?;
    let spread = DataProcessor::yearly_spread(&observations, COL_GDP_GROWTH)
        .context("computing GDP growth spread")?;
    let regional = DataProcessor::regional_means(&observations, &REGION_MAP)
        .context("computing regional means")?;
    info!(
        yearly_rows = yearly.height(),
        regions = regional.height(),
        "aggregated"
    );

    let tables = DashboardTables {
        observations,
        yearly,
        spread,
        regional,
    };
    let charts = ChartPlotter::plan(&tables).context("resolving dashboard panels")?;

    StaticChartRenderer::render_dashboard(config, &charts).context("rendering dashboard")?;
    info!("saved {}", config.output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn config_in(dir: &std::path::Path) -> DashboardConfig {
        DashboardConfig {
            input_path: dir.join("countries_data.csv"),
            output_path: dir.join("dashboard.png"),
            ..DashboardConfig::default()
        }
    }

    #[test]
    fn missing_inflation_column_writes_nothing() {
        let tmp = tempdir().unwrap();
        let config = config_in(tmp.path());
        fs::write(
            &config.input_path,
            "year,country,Exports,GDP Per Capita (USD),co2 emissions,Access to electricity,GDP Growth(Annual),Energy use per capita\n\
             2012,USA,13.5,100,16.3,100,2.3,6.9\n\
             2013,USA,13.6,110,16.0,100,1.8,6.9\n",
        )
        .unwrap();

        let err = run(&config).unwrap_err();
        assert!(format!("{err:#}").contains("Inflation"));
        assert!(!config.output_path.exists());
    }

    #[test]
    fn unmapped_country_writes_nothing() {
        let tmp = tempdir().unwrap();
        let config = config_in(tmp.path());
        fs::write(
            &config.input_path,
            "year,country,Exports,GDP Per Capita (USD),co2 emissions,Access to electricity,Inflation,GDP Growth(Annual),Energy use per capita\n\
             2012,USA,13.5,100,16.3,100,2.1,2.3,6.9\n\
             2012,FRA,30.1,40000,4.6,100,2.0,0.3,3.7\n",
        )
        .unwrap();

        let err = run(&config).unwrap_err();
        assert!(format!("{err:#}").contains("FRA"));
        assert!(!config.output_path.exists());
    }

    #[test]
    fn missing_input_writes_nothing() {
        let tmp = tempdir().unwrap();
        let config = config_in(tmp.path());

        assert!(run(&config).is_err());
        assert!(!config.output_path.exists());
    }
}
