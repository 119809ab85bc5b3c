//! ETA calculus for waypoints and POIs.
//!
//! PRE_DEPARTURE answers with the plan (ANTICIPATED); in flight the answer
//! blends plan and dead reckoning (`α·d/v + (1−α)·(plan − now)`); without
//! timing data it is pure dead reckoning with a speed floor. POI queries are
//! memoized in a bounded LRU keyed on route/adjustment versions, phase, and
//! a 5-second time bucket.

use std::num::NonZeroUsize;

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;

use route_model::{
    haversine_m, initial_bearing_deg, GeoPosition, RouteError, RouteProjector, KNOTS_TO_MPS,
};

use crate::phase::{EtaMode, FlightPhase};
use crate::poi::{CourseStatus, Poi, PoiWithEta};
use crate::Result;

const REACHED_RADIUS_M: f64 = 100.0;

#[derive(Debug, Clone, Copy)]
pub struct EtaConfig {
    pub blending_alpha: f64,
    pub on_route_tolerance_m: f64,
    pub speed_floor_mps: f64,
    pub cache_size: usize,
    pub cache_bucket_s: i64,
}

impl Default for EtaConfig {
    fn default() -> Self {
        Self {
            blending_alpha: 0.5,
            on_route_tolerance_m: 5_000.0,
            speed_floor_mps: 1.0,
            cache_size: 100,
            cache_bucket_s: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaypointEta {
    pub eta_seconds: f64,
    pub eta_time: DateTime<Utc>,
    pub eta_mode: EtaMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    route_version: u64,
    adjustment_version: u64,
    poi_id: String,
    phase: FlightPhase,
    bucket: i64,
}

pub struct EtaEngine {
    config: EtaConfig,
    cache: LruCache<CacheKey, PoiWithEta>,
}

impl EtaEngine {
    pub fn new(config: EtaConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            cache: LruCache::new(capacity),
        }
    }

    /// Drop every memoized entry. Called on route switch, phase change, and
    /// adjustment change.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// ETA to the route point at `index`.
    pub fn waypoint_eta(
        &self,
        projector: &RouteProjector,
        index: usize,
        now: DateTime<Utc>,
        phase: FlightPhase,
        smoothed_speed_kn: f64,
        current: Option<&GeoPosition>,
    ) -> Result<WaypointEta> {
        let planned = projector.point_time(index);

        if phase.eta_mode() == EtaMode::Anticipated {
            if let Ok(expected) = planned {
                let eta_seconds = (expected - now).num_seconds().max(0) as f64;
                return Ok(WaypointEta {
                    eta_seconds,
                    eta_time: now + Duration::seconds(eta_seconds as i64),
                    eta_mode: EtaMode::Anticipated,
                });
            }
            // No planned time; fall through to dead reckoning.
        }

        let along_target = projector
            .cumulative_distance_m(index)
            .ok_or(RouteError::EmptyRoute)?;
        let along_current = match current {
            Some(pos) => {
                projector
                    .project_point(pos.lat_deg, pos.lon_deg)?
                    .along_track_m
            }
            None => 0.0,
        };
        let d = (along_target - along_current).max(0.0);
        let v = (smoothed_speed_kn * KNOTS_TO_MPS).max(self.config.speed_floor_mps);

        let eta_seconds = match planned {
            Ok(expected) => {
                let alpha = self.config.blending_alpha;
                let planned_remaining = (expected - now).num_seconds() as f64;
                (alpha * (d / v) + (1.0 - alpha) * planned_remaining).max(0.0)
            }
            Err(_) => d / v,
        };

        Ok(WaypointEta {
            eta_seconds,
            eta_time: now + Duration::seconds(eta_seconds.round() as i64),
            eta_mode: EtaMode::Estimated,
        })
    }

    /// Distance, bearing, ETA, and course status for one POI. Memoized.
    #[allow(clippy::too_many_arguments)]
    pub fn poi_eta(
        &mut self,
        projector: &RouteProjector,
        poi: &Poi,
        now: DateTime<Utc>,
        phase: FlightPhase,
        smoothed_speed_kn: f64,
        current: &GeoPosition,
        heading_deg: f64,
        route_version: u64,
        adjustment_version: u64,
    ) -> Result<PoiWithEta> {
        let key = CacheKey {
            route_version,
            adjustment_version,
            poi_id: poi.id.clone(),
            phase,
            bucket: now.timestamp() / self.config.cache_bucket_s.max(1),
        };
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.clone());
        }

        let distance_m = haversine_m(current.lat_deg, current.lon_deg, poi.lat_deg, poi.lon_deg);
        let bearing_deg =
            initial_bearing_deg(current.lat_deg, current.lon_deg, poi.lat_deg, poi.lon_deg);

        let projection = projector.project_point(poi.lat_deg, poi.lon_deg)?;
        let current_projection = projector.project_point(current.lat_deg, current.lon_deg)?;
        let on_route = projection.cross_track_m <= self.config.on_route_tolerance_m;

        let v = (smoothed_speed_kn * KNOTS_TO_MPS).max(self.config.speed_floor_mps);
        let result = if on_route {
            let d_along = projection.along_track_m - current_projection.along_track_m;
            let passed = d_along < 0.0;

            let eta_seconds = if passed {
                0.0
            } else if phase.eta_mode() == EtaMode::Anticipated {
                match projector.time_at_projection(&projection) {
                    Ok(expected) => (expected - now).num_seconds().max(0) as f64,
                    Err(_) => d_along / v,
                }
            } else {
                match projector.time_at_projection(&projection) {
                    Ok(expected) => {
                        let alpha = self.config.blending_alpha;
                        let planned_remaining = (expected - now).num_seconds() as f64;
                        (alpha * (d_along / v) + (1.0 - alpha) * planned_remaining).max(0.0)
                    }
                    Err(_) => d_along / v,
                }
            };

            let course_status = if distance_m <= REACHED_RADIUS_M {
                CourseStatus::Reached
            } else if passed {
                CourseStatus::Passed
            } else {
                CourseStatus::Approaching
            };

            PoiWithEta {
                poi: poi.clone(),
                distance_m,
                bearing_deg,
                eta_seconds,
                eta_time: now + Duration::seconds(eta_seconds.round() as i64),
                eta_mode: phase.eta_mode(),
                is_on_active_route: true,
                projected_waypoint_index: Some(projection.segment_index),
                projected_route_progress_pct: Some(projection.progress * 100.0),
                course_status,
            }
        } else {
            let eta_seconds = distance_m / v;
            let course_status = if distance_m <= REACHED_RADIUS_M {
                CourseStatus::Reached
            } else {
                match angle_diff_deg(heading_deg, bearing_deg) {
                    d if d <= 15.0 => CourseStatus::OnCourse,
                    d if d <= 30.0 => CourseStatus::SlightlyOff,
                    d if d <= 90.0 => CourseStatus::OffCourse,
                    _ => CourseStatus::Departing,
                }
            };

            PoiWithEta {
                poi: poi.clone(),
                distance_m,
                bearing_deg,
                eta_seconds,
                eta_time: now + Duration::seconds(eta_seconds.round() as i64),
                eta_mode: phase.eta_mode(),
                is_on_active_route: false,
                projected_waypoint_index: None,
                projected_route_progress_pct: None,
                course_status,
            }
        };

        self.cache.put(key, result.clone());
        Ok(result)
    }
}

/// Absolute angular difference in degrees, [0, 180].
fn angle_diff_deg(a: f64, b: f64) -> f64 {
    ((a - b + 180.0).rem_euclid(360.0) - 180.0).abs()
}
