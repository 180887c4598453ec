//! Kernel density estimation over the sample grid.
//!
//! Fits a 2-D Gaussian KDE on event coordinates and evaluates it at every
//! grid point. Numerical degeneracies never escape: a singular covariance
//! or non-finite evaluation falls back to an inverse nearest-event-distance
//! density, and fewer than two events yields a flat near-zero surface.
//! Every returned surface is normalized to sum 1.

use hotspot_map_density_models::Bandwidth;
use thiserror::Error;

use crate::grid::Grid;

/// Flat density assigned when a bucket is too sparse to shape a surface.
const SPARSE_UNIFORM_DENSITY: f64 = 1e-6;

/// Additive smoothing for the inverse-distance fallback.
const DISTANCE_EPSILON: f64 = 0.001;

/// Denominator guard for surface normalization.
const NORMALIZE_EPSILON: f64 = 1e-10;

/// Smallest total KDE mass that still normalizes to ~1 against
/// [`NORMALIZE_EPSILON`]. Anything below it means the kernels underflowed
/// at every grid point (near-singular covariance) and the surface cannot
/// be renormalized.
const MIN_KDE_MASS: f64 = 1e-6;

/// Internal KDE failure modes. Always absorbed by the fallback path.
#[derive(Debug, Error)]
enum EstimatorError {
    /// Sample covariance matrix is singular or not positive definite.
    #[error("singular covariance matrix (det = {det})")]
    SingularCovariance {
        /// Determinant of the bandwidth-scaled covariance.
        det: f64,
    },

    /// Evaluation produced a non-finite density value.
    #[error("non-finite density at grid index {index}")]
    NonFinite {
        /// Grid index of the first offending value.
        index: usize,
    },

    /// Every kernel underflowed; the surface carries no mass to
    /// normalize. Happens when the covariance is degenerate without
    /// being exactly singular.
    #[error("density mass vanished (sum = {sum})")]
    VanishingMass {
        /// Total unnormalized density over the grid.
        sum: f64,
    },
}

/// Segmented density estimator with a fixed bandwidth policy.
#[derive(Debug, Clone, Copy)]
pub struct DensityEstimator {
    bandwidth: Bandwidth,
}

impl DensityEstimator {
    /// Creates an estimator with the given bandwidth policy.
    #[must_use]
    pub const fn new(bandwidth: Bandwidth) -> Self {
        Self { bandwidth }
    }

    /// Estimates a normalized density surface for `events` over `grid`.
    ///
    /// Total: sparse input yields the uniform near-zero surface and KDE
    /// failures fall back to inverse-distance density, so a value is
    /// produced for every grid point in all cases. The result sums to 1.
    #[must_use]
    pub fn estimate(&self, events: &[[f64; 2]], grid: &Grid) -> Vec<f64> {
        let mut density = if events.len() < 2 {
            vec![SPARSE_UNIFORM_DENSITY; grid.len()]
        } else {
            match self.gaussian_kde(events, grid) {
                Ok(density) => density,
                Err(err) => {
                    log::warn!("KDE failed ({err}), using inverse-distance density");
                    inverse_distance_density(events, grid)
                }
            }
        };

        normalize(&mut density);
        density
    }

    /// Bandwidth scale factor for `n` samples in 2 dimensions.
    fn factor(&self, n: f64) -> f64 {
        match self.bandwidth {
            // Scott's rule, n^(-1/(d+4)) with d = 2.
            Bandwidth::Scott => n.powf(-1.0 / 6.0),
            // Silverman's rule, (n * (d + 2) / 4)^(-1/(d+4)); coincides
            // with Scott for d = 2 but kept distinct for clarity.
            Bandwidth::Silverman => (n * (2.0 + 2.0) / 4.0).powf(-1.0 / 6.0),
            Bandwidth::Factor(value) => value,
        }
    }

    /// Full-covariance Gaussian KDE evaluated at every grid point.
    fn gaussian_kde(&self, events: &[[f64; 2]], grid: &Grid) -> Result<Vec<f64>, EstimatorError> {
        #[allow(clippy::cast_precision_loss)]
        let n = events.len() as f64;

        let (mean_lat, mean_lon) = sample_mean(events);

        // Unbiased 2x2 sample covariance, scaled by the squared
        // bandwidth factor (scipy's gaussian_kde convention).
        let mut c_ll = 0.0;
        let mut c_lo = 0.0;
        let mut c_oo = 0.0;
        for event in events {
            let d_lat = event[0] - mean_lat;
            let d_lon = event[1] - mean_lon;
            c_ll += d_lat * d_lat;
            c_lo += d_lat * d_lon;
            c_oo += d_lon * d_lon;
        }
        let denom = n - 1.0;
        let factor_sq = self.factor(n).powi(2);
        c_ll = c_ll / denom * factor_sq;
        c_lo = c_lo / denom * factor_sq;
        c_oo = c_oo / denom * factor_sq;

        let det = c_ll * c_oo - c_lo * c_lo;
        if !(det.is_finite() && det > 0.0) {
            return Err(EstimatorError::SingularCovariance { det });
        }

        // Inverse of the 2x2 covariance.
        let inv_ll = c_oo / det;
        let inv_lo = -c_lo / det;
        let inv_oo = c_ll / det;

        let norm = n * std::f64::consts::TAU * det.sqrt();

        let mut density = Vec::with_capacity(grid.len());
        for (index, point) in grid.points.iter().enumerate() {
            let mut sum = 0.0;
            for event in events {
                let d_lat = point[0] - event[0];
                let d_lon = point[1] - event[1];
                let quad = inv_ll * d_lat * d_lat
                    + 2.0 * inv_lo * d_lat * d_lon
                    + inv_oo * d_lon * d_lon;
                sum += (-0.5 * quad).exp();
            }
            let value = sum / norm;
            if !value.is_finite() {
                return Err(EstimatorError::NonFinite { index });
            }
            density.push(value);
        }

        let mass: f64 = density.iter().sum();
        if mass < MIN_KDE_MASS {
            return Err(EstimatorError::VanishingMass { sum: mass });
        }

        Ok(density)
    }
}

/// Mean latitude and longitude of the event coordinates.
fn sample_mean(events: &[[f64; 2]]) -> (f64, f64) {
    let mut sum_lat = 0.0;
    let mut sum_lon = 0.0;
    for event in events {
        sum_lat += event[0];
        sum_lon += event[1];
    }
    #[allow(clippy::cast_precision_loss)]
    let n = events.len() as f64;
    (sum_lat / n, sum_lon / n)
}

/// Inverse nearest-event-distance density, the fallback when KDE cannot
/// be fit. Smoothed so a grid point sitting exactly on an event stays
/// finite.
fn inverse_distance_density(events: &[[f64; 2]], grid: &Grid) -> Vec<f64> {
    grid.points
        .iter()
        .map(|point| {
            let nearest_sq = events
                .iter()
                .map(|event| {
                    let d_lat = point[0] - event[0];
                    let d_lon = point[1] - event[1];
                    d_lat * d_lat + d_lon * d_lon
                })
                .fold(f64::INFINITY, f64::min);
            1.0 / (nearest_sq.sqrt() + DISTANCE_EPSILON)
        })
        .collect()
}

/// Scales `density` in place so it sums to 1, guarding an all-zero vector.
fn normalize(density: &mut [f64]) {
    let sum: f64 = density.iter().sum();
    let denom = sum + NORMALIZE_EPSILON;
    for value in density {
        *value /= denom;
    }
}

#[cfg(test)]
mod tests {
    use hotspot_map_density_models::BoundingBox;

    use super::*;

    fn test_grid() -> Grid {
        Grid::build(
            &BoundingBox {
                lat_min: 6.15,
                lat_max: 6.30,
                lon_min: -75.71,
                lon_max: -75.55,
            },
            0.0045,
        )
    }

    fn assert_sums_to_one(density: &[f64]) {
        let sum: f64 = density.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6, "surface sum was {sum}");
    }

    #[test]
    fn clustered_events_peak_near_cluster() {
        let grid = test_grid();
        let events: Vec<[f64; 2]> = (0..200)
            .map(|i| {
                let lat_jitter = f64::from(i % 20) * 1e-4;
                let lon_jitter = f64::from(i % 17) * 1e-4;
                [6.20 + lat_jitter, -75.60 - lon_jitter]
            })
            .collect();

        let estimator = DensityEstimator::new(Bandwidth::Scott);
        let density = estimator.estimate(&events, &grid);

        assert_eq!(density.len(), grid.len());
        assert_sums_to_one(&density);
        assert!(density.iter().all(|v| *v >= 0.0 && v.is_finite()));

        let peak_idx = density
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
            .unwrap();
        let peak = grid.points[peak_idx];
        assert!((peak[0] - 6.20).abs() < 0.01);
        assert!((peak[1] - -75.60).abs() < 0.01);
    }

    #[test]
    fn single_event_yields_uniform_surface() {
        let grid = test_grid();
        let estimator = DensityEstimator::new(Bandwidth::Scott);
        let density = estimator.estimate(&[[6.20, -75.60]], &grid);

        assert_eq!(density.len(), grid.len());
        assert_sums_to_one(&density);
        let first = density[0];
        assert!(density.iter().all(|v| (*v - first).abs() < 1e-12));
    }

    #[test]
    fn empty_bucket_yields_uniform_surface() {
        let grid = test_grid();
        let estimator = DensityEstimator::new(Bandwidth::Scott);
        let density = estimator.estimate(&[], &grid);

        assert_eq!(density.len(), grid.len());
        assert_sums_to_one(&density);
    }

    #[test]
    fn collinear_events_fall_back_without_failing() {
        let grid = test_grid();
        // All events on one meridian. The longitude variance is only
        // floating-point residue, so the covariance is degenerate even
        // though its determinant can stay marginally positive; every
        // kernel underflows and the inverse-distance fallback must take
        // over.
        let events: Vec<[f64; 2]> = (0..50)
            .map(|i| [6.16 + f64::from(i) * 1e-3, -75.60])
            .collect();

        let estimator = DensityEstimator::new(Bandwidth::Scott);
        let density = estimator.estimate(&events, &grid);

        assert_eq!(density.len(), grid.len());
        assert_sums_to_one(&density);
        assert!(density.iter().all(|v| v.is_finite() && *v >= 0.0));

        // The fallback surface peaks on the meridian the events lie on.
        let peak_idx = density
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
            .unwrap();
        let peak = grid.points[peak_idx];
        assert!((peak[1] - -75.60).abs() < 0.0045, "peak lon was {}", peak[1]);
        assert!(
            (6.16 - 0.0045..=6.209 + 0.0045).contains(&peak[0]),
            "peak lat was {}",
            peak[0]
        );
    }

    #[test]
    fn duplicate_events_fall_back_without_failing() {
        let grid = test_grid();
        let events = vec![[6.20, -75.60]; 10];

        let estimator = DensityEstimator::new(Bandwidth::Scott);
        let density = estimator.estimate(&events, &grid);

        assert_sums_to_one(&density);
        // Fallback peaks at the event location.
        let peak_idx = density
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
            .unwrap();
        assert_eq!(peak_idx, grid.nearest_index(6.20, -75.60).unwrap());
    }

    #[test]
    fn sample_mean_averages_both_axes() {
        let (mean_lat, mean_lon) =
            sample_mean(&[[6.20, -75.60], [6.22, -75.58], [6.24, -75.56]]);
        assert!((mean_lat - 6.22).abs() < 1e-12);
        assert!((mean_lon - -75.58).abs() < 1e-12);
    }

    #[test]
    fn fixed_bandwidth_factor_is_used_verbatim() {
        let estimator = DensityEstimator::new(Bandwidth::Factor(0.25));
        assert!((estimator.factor(1000.0) - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn scott_and_silverman_coincide_in_two_dimensions() {
        let scott = DensityEstimator::new(Bandwidth::Scott);
        let silverman = DensityEstimator::new(Bandwidth::Silverman);
        assert!((scott.factor(500.0) - silverman.factor(500.0)).abs() < f64::EPSILON);
    }
}
