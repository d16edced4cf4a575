//! CSV Data Loader Module
//! Reads the indicator table with Polars and checks it against the fixed schema.

use crate::config::REQUIRED_COLUMNS;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("No data loaded")]
    NoData,
}

/// Loads the observation table.
pub struct DataLoader;

impl DataLoader {
    /// Load a CSV file using Polars.
    ///
    /// A leading positional-index column left over from an earlier export is
    /// dropped, then every column in [`REQUIRED_COLUMNS`] must be present.
    pub fn load_csv(file_path: &Path) -> Result<DataFrame, LoaderError> {
        if !file_path.is_file() {
            return Err(LoaderError::NotFound(file_path.to_path_buf()));
        }

        let df = LazyCsvReader::new(file_path)
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .finish()?
            .collect()?;

        let df = Self::drop_index_column(df)?;
        Self::check_columns(&df)?;

        if df.height() == 0 {
            return Err(LoaderError::NoData);
        }

        info!(
            rows = df.height(),
            columns = df.width(),
            "loaded {}",
            file_path.display()
        );
        Ok(df)
    }

    /// Remove the first column when it is a serialized row index.
    fn drop_index_column(df: DataFrame) -> Result<DataFrame, LoaderError> {
        let first = df.get_column_names().first().map(|s| s.to_string());

        match first {
            Some(name) if Self::is_index_name(&name) => {
                debug!("dropping index column {:?}", name);
                Ok(df.drop(&name)?)
            }
            _ => Ok(df),
        }
    }

    /// Names a leading index column can carry. A blank header field is
    /// inferred by Polars as `column_1` when it is the first column.
    fn is_index_name(name: &str) -> bool {
        let trimmed = name.trim();
        trimmed.is_empty()
            || trimmed == "column_1"
            || trimmed.starts_with("Unnamed:")
            || trimmed == "index"
    }

    fn check_columns(df: &DataFrame) -> Result<(), LoaderError> {
        let present: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|required| !present.iter().any(|p| p == *required))
            .map(|s| s.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(LoaderError::MissingColumns(missing))
        }
    }
}
