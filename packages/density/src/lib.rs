#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial-temporal risk density engine.
//!
//! Estimates per-period kernel density surfaces over a regular lattice
//! covering the training data's bounding box, and answers normalized
//! point/route risk queries against the trained surfaces. Training is a
//! one-shot batch pass; the resulting [`HotspotModel`] is immutable and
//! safe to share across concurrent readers.

pub mod estimator;
pub mod grid;
pub mod persist;
pub mod score;
pub mod segment;
pub mod train;

pub use estimator::DensityEstimator;
pub use grid::Grid;
pub use persist::ArtifactError;
pub use score::{PointRisk, QueryContext, RouteAssessment, ScoreError};
pub use segment::{DayKind, PeriodKey, TimePeriod};
pub use train::{GLOBAL_KEY, HotspotModel, TrainError};

/// Default grid spacing in degrees, roughly 500 m at the equator.
pub const DEFAULT_GRID_RESOLUTION: f64 = 0.0045;
