//! Training orchestration for the hotspot density model.
//!
//! A single batch pass over the historical incidents: derive the bounding
//! box, build the grid, estimate one surface per populated period bucket
//! plus the global surface, and capture summary statistics. The resulting
//! [`HotspotModel`] is immutable; serving reads it without synchronization.

use std::collections::BTreeMap;

use hotspot_map_density_models::{
    Bandwidth, BoundingBox, Incident, ModelArtifact, ModelStats, PeriodStats,
};
use thiserror::Error;

use crate::estimator::DensityEstimator;
use crate::grid::Grid;
use crate::segment::PeriodKey;

/// Reserved surface key covering all incidents regardless of period.
pub const GLOBAL_KEY: &str = "global";

/// Errors raised before any surface computation starts.
#[derive(Debug, Error)]
pub enum TrainError {
    /// No incidents were supplied, so no bounding box can be derived.
    #[error("training set is empty")]
    EmptyTrainingSet,
}

/// A trained set of density surfaces bound to the grid that produced them.
#[derive(Debug, Clone)]
pub struct HotspotModel {
    pub(crate) grid: Grid,
    pub(crate) bounds: BoundingBox,
    pub(crate) resolution: f64,
    pub(crate) bandwidth: Bandwidth,
    pub(crate) heatmaps: BTreeMap<String, Vec<f64>>,
    pub(crate) stats: ModelStats,
    /// Maximum density across every stored surface, fixed at build time.
    pub(crate) max_density: f64,
}

impl HotspotModel {
    /// Trains a model over `incidents` at the given grid resolution.
    ///
    /// Builds a surface for each of the eight fixed period buckets that
    /// has at least one incident, plus the `"global"` surface over the
    /// full set. Empty buckets are skipped, not stored.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::EmptyTrainingSet`] if `incidents` is empty.
    pub fn fit(
        incidents: &[Incident],
        resolution: f64,
        bandwidth: Bandwidth,
    ) -> Result<Self, TrainError> {
        let bounds = data_bounds(incidents).ok_or(TrainError::EmptyTrainingSet)?;

        log::info!(
            "Training density model over {} incidents, lat [{:.4}, {:.4}], lon [{:.4}, {:.4}]",
            incidents.len(),
            bounds.lat_min,
            bounds.lat_max,
            bounds.lon_min,
            bounds.lon_max
        );

        let grid = Grid::build(&bounds, resolution);
        log::info!(
            "Grid built: {} points at {resolution} degree resolution",
            grid.len()
        );

        let estimator = DensityEstimator::new(bandwidth);
        let mut heatmaps = BTreeMap::new();
        let mut periods = Vec::new();

        for key in PeriodKey::training_keys() {
            let bucket: Vec<[f64; 2]> = incidents
                .iter()
                .filter(|incident| {
                    PeriodKey::new(incident.hour, incident.day_of_week, incident.is_weekend)
                        == key
                })
                .map(|incident| [incident.latitude, incident.longitude])
                .collect();

            if bucket.is_empty() {
                log::debug!("{key}: no incidents, skipping");
                continue;
            }

            log::info!("{key}: {} incidents", bucket.len());
            let surface = estimator.estimate(&bucket, &grid);

            periods.push(PeriodStats {
                period: key.to_string(),
                count: bucket.len(),
                max_density: surface_max(&surface),
                mean_density: surface_mean(&surface),
            });
            heatmaps.insert(key.to_string(), surface);
        }

        let all_points: Vec<[f64; 2]> = incidents
            .iter()
            .map(|incident| [incident.latitude, incident.longitude])
            .collect();
        let global = estimator.estimate(&all_points, &grid);

        let stats = ModelStats {
            total_records: incidents.len(),
            grid_resolution: resolution,
            grid_size: grid.len(),
            periods,
            global_max_density: surface_max(&global),
            global_mean_density: surface_mean(&global),
        };
        heatmaps.insert(GLOBAL_KEY.to_string(), global);

        log::info!(
            "Training complete: {} surfaces over {} grid points",
            heatmaps.len(),
            grid.len()
        );

        let max_density = overall_max(&heatmaps);

        Ok(Self {
            grid,
            bounds,
            resolution,
            bandwidth,
            heatmaps,
            stats,
            max_density,
        })
    }

    /// Packages the model into its persistable artifact document.
    #[must_use]
    pub fn to_artifact(&self) -> ModelArtifact {
        ModelArtifact {
            heatmaps: self.heatmaps.clone(),
            grid_points: self.grid.points.clone(),
            lat_range: self.grid.lat_range.clone(),
            lon_range: self.grid.lon_range.clone(),
            grid_bounds: self.bounds,
            grid_resolution: self.resolution,
            bandwidth: self.bandwidth,
            stats: self.stats.clone(),
        }
    }

    /// Rebuilds a model from a loaded artifact.
    ///
    /// The grid is taken verbatim from the artifact so indices line up
    /// exactly with the surfaces that were trained on it.
    #[must_use]
    pub fn from_artifact(artifact: ModelArtifact) -> Self {
        let max_density = overall_max(&artifact.heatmaps);

        Self {
            grid: Grid::from_parts(
                artifact.grid_points,
                artifact.lat_range,
                artifact.lon_range,
            ),
            bounds: artifact.grid_bounds,
            resolution: artifact.grid_resolution,
            bandwidth: artifact.bandwidth,
            heatmaps: artifact.heatmaps,
            stats: artifact.stats,
            max_density,
        }
    }

    /// Grid spacing in degrees.
    #[must_use]
    pub const fn grid_resolution(&self) -> f64 {
        self.resolution
    }

    /// Number of grid sample points.
    #[must_use]
    pub fn grid_size(&self) -> usize {
        self.grid.len()
    }

    /// Number of stored surfaces, including `"global"`.
    #[must_use]
    pub fn surface_count(&self) -> usize {
        self.heatmaps.len()
    }

    /// Keys of the stored surfaces, in sorted order.
    pub fn surface_keys(&self) -> impl Iterator<Item = &str> {
        self.heatmaps.keys().map(String::as_str)
    }

    /// Bounding box the grid was built over.
    #[must_use]
    pub const fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// Training summary statistics.
    #[must_use]
    pub const fn stats(&self) -> &ModelStats {
        &self.stats
    }

    /// Bandwidth policy the surfaces were estimated with.
    #[must_use]
    pub const fn bandwidth(&self) -> Bandwidth {
        self.bandwidth
    }
}

/// Bounding box of the incident coordinates; `None` for an empty slice.
fn data_bounds(incidents: &[Incident]) -> Option<BoundingBox> {
    let first = incidents.first()?;
    let mut bounds = BoundingBox {
        lat_min: first.latitude,
        lat_max: first.latitude,
        lon_min: first.longitude,
        lon_max: first.longitude,
    };

    for incident in incidents {
        bounds.lat_min = bounds.lat_min.min(incident.latitude);
        bounds.lat_max = bounds.lat_max.max(incident.latitude);
        bounds.lon_min = bounds.lon_min.min(incident.longitude);
        bounds.lon_max = bounds.lon_max.max(incident.longitude);
    }

    Some(bounds)
}

fn surface_max(surface: &[f64]) -> f64 {
    surface.iter().copied().fold(0.0, f64::max)
}

fn surface_mean(surface: &[f64]) -> f64 {
    if surface.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let len = surface.len() as f64;
    surface.iter().sum::<f64>() / len
}

/// Maximum density value across every stored surface.
fn overall_max(heatmaps: &BTreeMap<String, Vec<f64>>) -> f64 {
    heatmaps
        .values()
        .flat_map(|surface| surface.iter().copied())
        .fold(0.0, f64::max)
}
