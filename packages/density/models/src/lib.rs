#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared data types for the risk density model.
//!
//! Defines the training input record, the geographic bounding box, the
//! bandwidth policy, and the persisted artifact document that round-trips
//! between training and serving.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single historical incident used as training input.
///
/// Immutable once loaded; owned by the training pipeline only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Hour of day, 0-23.
    pub hour: u8,
    /// Day of week, 0 = Monday .. 6 = Sunday.
    pub day_of_week: u8,
    /// Weekend flag. Derived from `day_of_week >= 5` when absent.
    pub is_weekend: Option<bool>,
    /// Administrative district (comuna) code, if known.
    pub comuna: Option<u32>,
    /// Neighborhood (barrio) code, if known.
    pub barrio: Option<u32>,
}

impl Incident {
    /// Whether this incident occurred on a weekend, deriving the flag
    /// from `day_of_week` when it was not supplied.
    #[must_use]
    pub fn on_weekend(&self) -> bool {
        self.is_weekend.unwrap_or(self.day_of_week >= 5)
    }
}

/// Geographic extent of the training data, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern edge.
    pub lat_min: f64,
    /// Northern edge.
    pub lat_max: f64,
    /// Western edge.
    pub lon_min: f64,
    /// Eastern edge.
    pub lon_max: f64,
}

/// Bandwidth policy for the kernel density estimator.
///
/// The data-driven rules compute a scale factor from the sample count;
/// `Factor` pins it to a fixed value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bandwidth {
    /// Scott's rule: `n^(-1/(d+4))`.
    Scott,
    /// Silverman's rule: `(n * (d + 2) / 4)^(-1/(d+4))`.
    Silverman,
    /// Fixed bandwidth factor.
    Factor(f64),
}

impl Default for Bandwidth {
    fn default() -> Self {
        Self::Scott
    }
}

/// Coarse risk classification of a score, matching the thresholds the
/// serving layer reports to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Score above 0.7.
    High,
    /// Score in [0.4, 0.7].
    Medium,
    /// Score below 0.4.
    Low,
}

impl RiskLevel {
    /// Classifies a normalized score into a risk level.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score > 0.7 {
            Self::High
        } else if score >= 0.4 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Per-period summary recorded during training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodStats {
    /// Period key this surface was built for.
    pub period: String,
    /// Number of incidents that fell into the period.
    pub count: usize,
    /// Maximum density value on the surface.
    pub max_density: f64,
    /// Mean density value on the surface.
    pub mean_density: f64,
}

/// Summary statistics for a trained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStats {
    /// Total incidents in the training set.
    pub total_records: usize,
    /// Grid spacing in degrees.
    pub grid_resolution: f64,
    /// Number of grid sample points.
    pub grid_size: usize,
    /// One entry per period surface that was built.
    pub periods: Vec<PeriodStats>,
    /// Maximum of the global surface.
    pub global_max_density: f64,
    /// Mean of the global surface.
    pub global_mean_density: f64,
}

/// The persisted artifact document.
///
/// This is the single serialized object written at training time and
/// loaded wholesale at serving start. Field layout must stay stable:
/// one density value per grid index, keyed by period (plus `"global"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Density surface per period key, one value per grid index.
    pub heatmaps: BTreeMap<String, Vec<f64>>,
    /// Flattened `(lat, lon)` grid points in latitude-major order.
    pub grid_points: Vec<[f64; 2]>,
    /// Latitude axis coordinates.
    pub lat_range: Vec<f64>,
    /// Longitude axis coordinates.
    pub lon_range: Vec<f64>,
    /// Bounding box the grid was built over.
    pub grid_bounds: BoundingBox,
    /// Grid spacing in degrees.
    pub grid_resolution: f64,
    /// Bandwidth policy the surfaces were estimated with.
    pub bandwidth: Bandwidth,
    /// Training summary statistics.
    pub stats: ModelStats,
}
