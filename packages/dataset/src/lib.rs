#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Training dataset loading.
//!
//! Reads historical incidents from a CSV file with at least `latitude`,
//! `longitude`, `hour`, and `day_of_week` columns. Missing required
//! columns abort before any row is parsed; individual rows that fail to
//! parse are skipped with a warning rather than failing the whole load.

use std::path::Path;

use hotspot_map_density_models::Incident;
use serde::Deserialize;
use thiserror::Error;

/// Columns that must be present in the training CSV.
pub const REQUIRED_COLUMNS: [&str; 4] = ["latitude", "longitude", "hour", "day_of_week"];

/// Errors from dataset loading.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Filesystem operation failed.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path being read.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// CSV could not be read at all (e.g. no header row).
    #[error("CSV error at {path}: {source}")]
    Csv {
        /// Path being read.
        path: String,
        /// Underlying error.
        source: csv::Error,
    },

    /// One or more required columns are absent from the header.
    #[error("missing required columns: {}", columns.join(", "))]
    MissingColumns {
        /// The absent column names.
        columns: Vec<String>,
    },
}

/// Raw CSV row. Optional columns may be absent from the file entirely.
#[derive(Debug, Deserialize)]
struct Row {
    latitude: f64,
    longitude: f64,
    hour: u8,
    day_of_week: u8,
    /// 0/1 flag, as the upstream export writes it.
    is_weekend: Option<u8>,
    comuna: Option<u32>,
    barrio: Option<u32>,
}

impl From<Row> for Incident {
    fn from(row: Row) -> Self {
        Self {
            latitude: row.latitude,
            longitude: row.longitude,
            hour: row.hour,
            day_of_week: row.day_of_week,
            is_weekend: row.is_weekend.map(|flag| flag != 0),
            comuna: row.comuna,
            barrio: row.barrio,
        }
    }
}

/// Loads incidents from the CSV at `path`.
///
/// The header is validated against [`REQUIRED_COLUMNS`] before any row is
/// parsed. Rows that fail to parse (bad numbers, wrong field counts) are
/// skipped with a warning.
///
/// # Errors
///
/// * [`DatasetError::Io`] if the file cannot be opened.
/// * [`DatasetError::Csv`] if the header cannot be read.
/// * [`DatasetError::MissingColumns`] if a required column is absent.
pub fn load_incidents(path: &Path) -> Result<Vec<Incident>, DatasetError> {
    let file = std::fs::File::open(path).map_err(|e| DatasetError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut reader = csv::Reader::from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| DatasetError::Csv {
            path: path.display().to_string(),
            source: e,
        })?
        .clone();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|header| header == **column))
        .map(ToString::to_string)
        .collect();

    if !missing.is_empty() {
        return Err(DatasetError::MissingColumns { columns: missing });
    }

    let mut incidents = Vec::new();
    let mut skipped = 0usize;

    for (line, result) in reader.deserialize::<Row>().enumerate() {
        match result {
            Ok(row) => incidents.push(Incident::from(row)),
            Err(err) => {
                skipped += 1;
                log::warn!("Skipping row {} of {}: {err}", line + 2, path.display());
            }
        }
    }

    log::info!(
        "Loaded {} incidents from {} ({skipped} skipped)",
        incidents.len(),
        path.display()
    );

    Ok(incidents)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn write_temp_csv(name: &str, contents: &str) -> std::path::PathBuf {
        let path =
            std::env::temp_dir().join(format!("hotspot_map_{name}_{}.csv", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_rows_with_all_columns() {
        let path = write_temp_csv(
            "full",
            "latitude,longitude,hour,day_of_week,is_weekend,comuna,barrio\n\
             6.20,-75.60,22,5,1,10,1012\n\
             6.21,-75.61,9,2,0,,\n",
        );

        let incidents = load_incidents(&path).unwrap();
        assert_eq!(incidents.len(), 2);
        assert_eq!(incidents[0].is_weekend, Some(true));
        assert_eq!(incidents[0].comuna, Some(10));
        assert_eq!(incidents[1].is_weekend, Some(false));
        assert_eq!(incidents[1].comuna, None);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn optional_columns_may_be_absent() {
        let path = write_temp_csv(
            "minimal",
            "latitude,longitude,hour,day_of_week\n6.20,-75.60,22,5\n",
        );

        let incidents = load_incidents(&path).unwrap();
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].is_weekend, None);
        assert!(incidents[0].on_weekend());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let path = write_temp_csv("missing", "latitude,longitude,hour\n6.20,-75.60,22\n");

        let result = load_incidents(&path);
        match result {
            Err(DatasetError::MissingColumns { columns }) => {
                assert_eq!(columns, ["day_of_week"]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn unparseable_rows_are_skipped() {
        let path = write_temp_csv(
            "bad_rows",
            "latitude,longitude,hour,day_of_week\n\
             6.20,-75.60,22,5\n\
             not,a,number,row\n\
             6.21,-75.61,9,2\n",
        );

        let incidents = load_incidents(&path).unwrap();
        assert_eq!(incidents.len(), 2);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = load_incidents(Path::new("/nonexistent/data.csv"));
        assert!(matches!(result, Err(DatasetError::Io { .. })));
    }
}
