//! Dashboard Configuration
//! Fixed dataset schema, country/region tables and output settings.

use serde::Serialize;
use std::path::PathBuf;

// Column names of the input schema
pub const COL_YEAR: &str = "year";
pub const COL_COUNTRY: &str = "country";
pub const COL_EXPORTS: &str = "Exports";
pub const COL_GDP_PER_CAPITA: &str = "GDP Per Capita (USD)";
pub const COL_CO2: &str = "co2 emissions";
pub const COL_ELECTRICITY: &str = "Access to electricity";
pub const COL_INFLATION: &str = "Inflation";
pub const COL_GDP_GROWTH: &str = "GDP Growth(Annual)";
pub const COL_ENERGY_USE: &str = "Energy use per capita";

/// Name of the region column in the regional aggregate.
pub const COL_REGION: &str = "region";

/// Half-width of the 95% confidence interval in the spread table.
pub const COL_CI: &str = "ci95";

/// Every column the loader requires.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    COL_YEAR,
    COL_COUNTRY,
    COL_EXPORTS,
    COL_GDP_PER_CAPITA,
    COL_CO2,
    COL_ELECTRICITY,
    COL_INFLATION,
    COL_GDP_GROWTH,
    COL_ENERGY_USE,
];

/// Metrics averaged per (year, country).
pub const YEARLY_METRICS: [&str; 4] = [COL_EXPORTS, COL_GDP_PER_CAPITA, COL_CO2, COL_ELECTRICITY];

/// Countries charted, in legend and colour order.
pub const COUNTRY_CODES: [&str; 10] = [
    "JPN", "NGA", "PAK", "CHN", "USA", "IND", "CAN", "GHA", "KEN", "BGD",
];

/// Country code -> region name.
pub const REGION_MAP: [(&str, &str); 10] = [
    ("JPN", "Asia"),
    ("PAK", "South Asia"),
    ("IND", "South Asia"),
    ("CHN", "Asia"),
    ("USA", "North America"),
    ("NGA", "Africa"),
    ("CAN", "North America"),
    ("GHA", "Africa"),
    ("KEN", "Africa"),
    ("BGD", "South Asia"),
];

/// Run settings. All values are fixed; `Default` is the only constructor used
/// by the binary.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub subtitle: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("countries_data.csv"),
            output_path: PathBuf::from("Dashboard_With_Matplotlib.png"),
            // 18 x 20 inches at 100 DPI
            width: 1800,
            height: 2000,
            title: "Dashboard Showing Different Indicators for Countries (2012–2020)".to_string(),
            subtitle: "This dashboard is made with a GridSpec-style 6 x 4 panel layout.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_country_has_a_region() {
        for code in COUNTRY_CODES {
            assert!(
                REGION_MAP.iter().any(|(key, _)| *key == code),
                "{} has no region",
                code
            );
        }
    }

    #[test]
    fn subtitle_names_the_gridspec_layout() {
        let config = DashboardConfig::default();
        assert!(config.subtitle.contains("GridSpec"));
        assert!(config.title.contains("2012–2020"));
    }

    #[test]
    fn four_distinct_regions() {
        let mut regions: Vec<&str> = REGION_MAP.iter().map(|(_, r)| *r).collect();
        regions.sort();
        regions.dedup();
        assert_eq!(regions, vec!["Africa", "Asia", "North America", "South Asia"]);
    }
}
