//! Regular sample lattice over the training bounding box.
//!
//! The grid is the model's index space: surfaces store one density value
//! per grid point, addressed by position, so point order must be identical
//! between training and serving.

use hotspot_map_density_models::BoundingBox;

/// Guard against a phantom trailing step when the extent is an exact
/// multiple of the resolution.
const STEP_EPSILON: f64 = 1e-9;

/// A flattened lattice of `(lat, lon)` sample points plus the per-axis
/// coordinate arrays it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Sample points in latitude-major order.
    pub points: Vec<[f64; 2]>,
    /// Latitude axis coordinates, ascending.
    pub lat_range: Vec<f64>,
    /// Longitude axis coordinates, ascending.
    pub lon_range: Vec<f64>,
}

impl Grid {
    /// Builds the lattice covering `bounds` at `resolution` degrees.
    ///
    /// Axis coordinates run from `min` to `max + resolution` exclusive in
    /// steps of `resolution`, so the last partial step past `max` is
    /// included. The flattened product is latitude-major: all longitudes
    /// for the first latitude, then the next latitude, and so on.
    /// Deterministic for identical inputs; a degenerate zero-extent box
    /// yields a single point.
    #[must_use]
    pub fn build(bounds: &BoundingBox, resolution: f64) -> Self {
        let lat_range = axis_steps(bounds.lat_min, bounds.lat_max, resolution);
        let lon_range = axis_steps(bounds.lon_min, bounds.lon_max, resolution);

        let mut points = Vec::with_capacity(lat_range.len() * lon_range.len());
        for &lat in &lat_range {
            for &lon in &lon_range {
                points.push([lat, lon]);
            }
        }

        Self {
            points,
            lat_range,
            lon_range,
        }
    }

    /// Reconstructs a grid from persisted axis/point arrays.
    #[must_use]
    pub const fn from_parts(
        points: Vec<[f64; 2]>,
        lat_range: Vec<f64>,
        lon_range: Vec<f64>,
    ) -> Self {
        Self {
            points,
            lat_range,
            lon_range,
        }
    }

    /// Number of sample points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the grid has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of the grid point nearest to `(lat, lon)` by Euclidean
    /// degree distance. Ties resolve to the first occurrence in grid
    /// order. Returns `None` only for an empty grid.
    #[must_use]
    pub fn nearest_index(&self, lat: f64, lon: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;

        for (idx, point) in self.points.iter().enumerate() {
            let d_lat = point[0] - lat;
            let d_lon = point[1] - lon;
            let dist_sq = d_lat * d_lat + d_lon * d_lon;

            match best {
                Some((_, best_sq)) if dist_sq >= best_sq => {}
                _ => best = Some((idx, dist_sq)),
            }
        }

        best.map(|(idx, _)| idx)
    }
}

/// Evenly spaced coordinates from `min` to `max + step` exclusive.
/// A non-positive or non-finite step anchors to the axis minimum.
fn axis_steps(min: f64, max: f64, step: f64) -> Vec<f64> {
    if !(step.is_finite() && step > 0.0) {
        return vec![min];
    }

    let stop = max + step;
    let mut coords = Vec::new();
    let mut k = 0usize;

    loop {
        let value = step.mul_add(index_to_f64(k), min);
        if value >= stop - STEP_EPSILON {
            break;
        }
        coords.push(value);
        k += 1;
    }

    if coords.is_empty() {
        coords.push(min);
    }

    coords
}

#[allow(clippy::cast_precision_loss)]
const fn index_to_f64(k: usize) -> f64 {
    k as f64
}
