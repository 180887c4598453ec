//! Serving-time risk scoring against a trained model.
//!
//! Stateless reads over the immutable [`HotspotModel`]: each query finds
//! the nearest grid point, picks the best-matching surface (falling back
//! to `"global"`), and rescales the density to [0, 1]. Queries never fail
//! for any coordinate or temporal context; only an empty route is a
//! caller error.

use hotspot_map_density_models::RiskLevel;
use serde::Serialize;
use thiserror::Error;

use crate::segment::PeriodKey;
use crate::train::{GLOBAL_KEY, HotspotModel};

/// Errors from route scoring.
#[derive(Debug, Error)]
pub enum ScoreError {
    /// A route must contain at least one point.
    #[error("route contains no points")]
    EmptyRoute,
}

/// Optional temporal/spatial context for a query.
///
/// With both `hour` and `day_of_week` set, the matching period surface is
/// used (weekend flag derived when absent); otherwise scoring uses the
/// global surface. Zone qualifiers narrow the key further; a key with no
/// trained surface falls back to `"global"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryContext {
    /// Hour of day. Out-of-range values bucket as night.
    pub hour: Option<u8>,
    /// Day of week, 0 = Monday .. 6 = Sunday.
    pub day_of_week: Option<u8>,
    /// Weekend flag override.
    pub is_weekend: Option<bool>,
    /// Comuna qualifier.
    pub comuna: Option<u32>,
    /// Barrio qualifier.
    pub barrio: Option<u32>,
}

impl QueryContext {
    /// Context carrying only an hour and day of week.
    #[must_use]
    pub const fn at(hour: u8, day_of_week: u8) -> Self {
        Self {
            hour: Some(hour),
            day_of_week: Some(day_of_week),
            is_weekend: None,
            comuna: None,
            barrio: None,
        }
    }
}

/// Scored point on a route.
#[derive(Debug, Clone, Serialize)]
pub struct PointRisk {
    /// Query latitude.
    pub latitude: f64,
    /// Query longitude.
    pub longitude: f64,
    /// Normalized risk score in [0, 1].
    pub score: f64,
    /// Coarse classification of the score.
    pub level: RiskLevel,
}

/// Aggregated risk over a route's points.
#[derive(Debug, Clone, Serialize)]
pub struct RouteAssessment {
    /// Per-point scores in route order.
    pub points: Vec<PointRisk>,
    /// Mean score over the route.
    pub mean_score: f64,
    /// Points classified high risk.
    pub high_count: usize,
    /// Points classified medium risk.
    pub medium_count: usize,
    /// Points classified low risk.
    pub low_count: usize,
}

impl HotspotModel {
    /// Scores a coordinate against the best-matching surface.
    ///
    /// Always returns a finite value in [0, 1]. Coordinates outside the
    /// training bounding box resolve to the nearest grid edge point, and
    /// an unknown period key degrades to the global surface, so no input
    /// is rejected.
    ///
    /// The rescaling divides by the maximum density across *all* stored
    /// surfaces, not just the selected one, so sparse periods score
    /// systematically lower than dense ones. Consumers depend on the
    /// resulting scale, so the divisor must stay global.
    #[must_use]
    pub fn score(&self, lat: f64, lon: f64, context: &QueryContext) -> f64 {
        let Some(index) = self.grid.nearest_index(lat, lon) else {
            return 0.0;
        };

        let surface = self.select_surface(context);
        let density = surface
            .and_then(|values| values.get(index))
            .copied()
            .unwrap_or(0.0);

        if self.max_density > 0.0 {
            (density / self.max_density).min(1.0)
        } else {
            0.0
        }
    }

    /// Scores every point of a route under one shared context and
    /// aggregates per-level counts and the mean score.
    ///
    /// # Errors
    ///
    /// Returns [`ScoreError::EmptyRoute`] if `points` is empty.
    pub fn score_route(
        &self,
        points: &[[f64; 2]],
        context: &QueryContext,
    ) -> Result<RouteAssessment, ScoreError> {
        if points.is_empty() {
            return Err(ScoreError::EmptyRoute);
        }

        let mut scored = Vec::with_capacity(points.len());
        let mut total = 0.0;
        let mut high_count = 0;
        let mut medium_count = 0;
        let mut low_count = 0;

        for point in points {
            let score = self.score(point[0], point[1], context);
            total += score;

            let level = RiskLevel::from_score(score);
            match level {
                RiskLevel::High => high_count += 1,
                RiskLevel::Medium => medium_count += 1,
                RiskLevel::Low => low_count += 1,
            }

            scored.push(PointRisk {
                latitude: point[0],
                longitude: point[1],
                score,
                level,
            });
        }

        #[allow(clippy::cast_precision_loss)]
        let mean_score = total / points.len() as f64;

        Ok(RouteAssessment {
            points: scored,
            mean_score,
            high_count,
            medium_count,
            low_count,
        })
    }

    /// Picks the surface for a context: the period surface when full
    /// temporal context is present and trained, otherwise `"global"`.
    fn select_surface(&self, context: &QueryContext) -> Option<&Vec<f64>> {
        if let (Some(hour), Some(day_of_week)) = (context.hour, context.day_of_week) {
            let key = PeriodKey::new(hour, day_of_week, context.is_weekend)
                .with_zone(context.comuna, context.barrio);

            if let Some(surface) = self.heatmaps.get(&key.to_string()) {
                return Some(surface);
            }
        }

        self.heatmaps.get(GLOBAL_KEY)
    }
}

#[cfg(test)]
mod tests {
    use hotspot_map_density_models::Bandwidth;

    use super::*;
    use crate::test_support::weekend_evening_cluster;

    fn trained_model() -> HotspotModel {
        HotspotModel::fit(&weekend_evening_cluster(1000), 0.0045, Bandwidth::Scott).unwrap()
    }

    /// A weekend-evening cluster at (6.20, -75.60) plus diffuse weekday
    /// night incidents pinning the bounding box to lat [6.15, 6.30],
    /// lon [-75.71, -75.55].
    fn mixed_model() -> HotspotModel {
        let mut incidents = weekend_evening_cluster(600);

        for i in 0..400usize {
            #[allow(clippy::cast_precision_loss)]
            let lat = 6.15 + (i * 37 % 400) as f64 / 400.0 * 0.15;
            #[allow(clippy::cast_precision_loss)]
            let lon = -75.71 + (i * 59 % 400) as f64 / 400.0 * 0.16;
            incidents.push(crate::test_support::incident_at(lat, lon, 3, 1));
        }
        // Pin the corners so the grid spans the full box.
        incidents.push(crate::test_support::incident_at(6.15, -75.71, 3, 1));
        incidents.push(crate::test_support::incident_at(6.30, -75.55, 3, 1));

        HotspotModel::fit(&incidents, 0.0045, Bandwidth::Scott).unwrap()
    }

    #[test]
    fn cluster_center_scores_near_one_in_its_period() {
        let model = trained_model();
        let score = model.score(6.20, -75.60, &QueryContext::at(22, 5));
        assert!(score > 0.9, "score was {score}");
    }

    #[test]
    fn unpopulated_period_falls_back_to_global() {
        let model = trained_model();
        // Weekday morning has no trained surface.
        let fallback = model.score(6.20, -75.60, &QueryContext::at(9, 2));
        let direct = model.score(6.20, -75.60, &QueryContext::default());
        assert!((fallback - direct).abs() < f64::EPSILON);
        assert!(fallback.is_finite());
    }

    #[test]
    fn missing_temporal_context_uses_global() {
        let model = trained_model();
        let score = model.score(6.20, -75.60, &QueryContext::default());
        assert!(score > 0.0);
        assert!(score <= 1.0);
    }

    #[test]
    fn scores_stay_in_unit_interval() {
        let model = trained_model();
        for (lat, lon) in [
            (6.20, -75.60),
            (6.15, -75.71),
            (0.0, 0.0),
            (90.0, 180.0),
            (-90.0, -180.0),
        ] {
            for context in [QueryContext::default(), QueryContext::at(22, 5)] {
                let score = model.score(lat, lon, &context);
                assert!(score.is_finite());
                assert!((0.0..=1.0).contains(&score), "score was {score}");
            }
        }
    }

    #[test]
    fn far_outside_bounding_box_still_scores() {
        let model = trained_model();
        let score = model.score(50.0, 10.0, &QueryContext::at(22, 5));
        assert!(score.is_finite());
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn zone_qualified_query_degrades_to_global() {
        let model = trained_model();
        let context = QueryContext {
            comuna: Some(10),
            barrio: Some(1012),
            ..QueryContext::at(22, 5)
        };
        // No zone-qualified surfaces are ever trained, so this matches
        // the global score rather than the weekend_evening one.
        let zoned = model.score(6.20, -75.60, &context);
        let global = model.score(6.20, -75.60, &QueryContext::default());
        assert!((zoned - global).abs() < f64::EPSILON);
    }

    #[test]
    fn route_scoring_aggregates_levels() {
        let model = trained_model();
        let route = [[6.20, -75.60], [6.25, -75.65], [6.30, -75.71]];
        let assessment = model.score_route(&route, &QueryContext::at(22, 5)).unwrap();

        assert_eq!(assessment.points.len(), 3);
        assert_eq!(
            assessment.high_count + assessment.medium_count + assessment.low_count,
            3
        );
        assert!((0.0..=1.0).contains(&assessment.mean_score));

        let expected_mean: f64 =
            assessment.points.iter().map(|p| p.score).sum::<f64>() / 3.0;
        assert!((assessment.mean_score - expected_mean).abs() < 1e-12);
    }

    #[test]
    fn hotspot_period_scores_high_and_fallback_scores_lower() {
        let model = mixed_model();

        // Weekend evening at the cluster center hits the densest surface.
        let peak = model.score(6.20, -75.60, &QueryContext::at(22, 6));
        assert!(peak > 0.9, "peak score was {peak}");

        // Weekday morning has no trained surface; the query degrades to
        // the global surface, whose mass is diluted by the diffuse
        // weekday-night incidents.
        let fallback = model.score(6.20, -75.60, &QueryContext::at(9, 2));
        assert!(fallback.is_finite());
        assert!(fallback < peak * 0.5, "fallback score was {fallback}");
    }

    #[test]
    fn empty_route_is_rejected() {
        let model = trained_model();
        let result = model.score_route(&[], &QueryContext::default());
        assert!(matches!(result, Err(ScoreError::EmptyRoute)));
    }
}
