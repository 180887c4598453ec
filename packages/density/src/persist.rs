//! Artifact save/load for the trained model.
//!
//! The whole model persists as one JSON document ([`ModelArtifact`]). The
//! artifact is written atomically (temp file, then rename) so an
//! interrupted save never leaves a corrupt file, and a companion
//! `<name>.stats.json` with just the summary statistics is written next
//! to it for dashboards and quick inspection.

use std::path::Path;

use hotspot_map_density_models::ModelArtifact;
use thiserror::Error;

use crate::train::HotspotModel;

/// Errors from artifact persistence.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// No artifact exists at the given path.
    #[error("model artifact not found: {0}")]
    NotFound(String),

    /// Filesystem operation failed.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path the operation was acting on.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The artifact exists but cannot be deserialized.
    #[error("malformed model artifact at {path}: {source}")]
    Malformed {
        /// Path of the unreadable artifact.
        path: String,
        /// Underlying error.
        source: serde_json::Error,
    },
}

/// Saves the model's artifact document to `path`, plus the stats
/// side-file.
///
/// # Errors
///
/// Returns an [`ArtifactError::Io`] if the files cannot be written.
pub fn save(model: &HotspotModel, path: &Path) -> Result<(), ArtifactError> {
    let artifact = model.to_artifact();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| ArtifactError::Io {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }

    write_json_atomic(path, &artifact)?;
    log::info!("Model artifact saved to {}", path.display());

    let stats_path = path.with_extension("stats.json");
    write_json_atomic(&stats_path, &artifact.stats)?;
    log::info!("Model stats saved to {}", stats_path.display());

    Ok(())
}

/// Loads a model from the artifact at `path`.
///
/// # Errors
///
/// * [`ArtifactError::NotFound`] if no file exists at `path`.
/// * [`ArtifactError::Io`] if the file cannot be read.
/// * [`ArtifactError::Malformed`] if the document does not parse.
pub fn load(path: &Path) -> Result<HotspotModel, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::NotFound(path.display().to_string()));
    }

    let contents = std::fs::read(path).map_err(|e| ArtifactError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let artifact: ModelArtifact =
        serde_json::from_slice(&contents).map_err(|e| ArtifactError::Malformed {
            path: path.display().to_string(),
            source: e,
        })?;

    let model = HotspotModel::from_artifact(artifact);
    log::info!(
        "Model loaded from {}: {} surfaces, {} grid points",
        path.display(),
        model.surface_count(),
        model.grid_size()
    );

    Ok(model)
}

/// Serializes `value` as JSON to `path` via a temp file and rename.
fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    let json = serde_json::to_vec(value).map_err(|e| ArtifactError::Malformed {
        path: path.display().to_string(),
        source: e,
    })?;

    let tmp_path = path.with_extension("json.tmp");

    std::fs::write(&tmp_path, json).map_err(|e| ArtifactError::Io {
        path: tmp_path.display().to_string(),
        source: e,
    })?;

    std::fs::rename(&tmp_path, path).map_err(|e| ArtifactError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use hotspot_map_density_models::Bandwidth;

    use super::*;
    use crate::score::QueryContext;
    use crate::test_support::weekend_evening_cluster;

    fn temp_artifact_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("hotspot_map_{name}_{}.json", std::process::id()))
    }

    #[test]
    fn load_missing_artifact_is_not_found() {
        let result = load(Path::new("/nonexistent/model.json"));
        assert!(matches!(result, Err(ArtifactError::NotFound(_))));
    }

    #[test]
    fn load_malformed_artifact_is_reported() {
        let path = temp_artifact_path("malformed");
        std::fs::write(&path, b"not json").unwrap();

        let result = load(&path);
        assert!(matches!(result, Err(ArtifactError::Malformed { .. })));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn round_trip_reproduces_scores() {
        let model =
            HotspotModel::fit(&weekend_evening_cluster(300), 0.0045, Bandwidth::Scott).unwrap();

        let path = temp_artifact_path("round_trip");
        save(&model, &path).unwrap();
        let loaded = load(&path).unwrap();

        for (lat, lon) in [(6.20, -75.60), (6.21, -75.59), (50.0, 10.0)] {
            for context in [QueryContext::default(), QueryContext::at(22, 5)] {
                let before = model.score(lat, lon, &context);
                let after = loaded.score(lat, lon, &context);
                assert!(
                    (before - after).abs() < 1e-12,
                    "score drifted: {before} vs {after}"
                );
            }
        }

        let stats_path = path.with_extension("stats.json");
        assert!(stats_path.exists());

        std::fs::remove_file(&path).ok();
        std::fs::remove_file(&stats_path).ok();
    }
}
