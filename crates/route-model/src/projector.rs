//! Temporal projection of a route onto wall-clock time.
//!
//! The projector precomputes cumulative distances and effective per-point
//! arrival times (untimed interior points get distance-weighted times from
//! their timed neighbors). All time-based queries apply the uniform
//! departure adjustment; changing the adjustment requires no recomputation
//! because derived state is offset-independent.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use crate::geo::{
    haversine_m, initial_bearing_deg, project_onto_arc, slerp, GeoPosition, KNOTS_TO_MPS,
};
use crate::route::Route;
use crate::{Result, RouteError};

/// Result of projecting a geographic point onto the route polyline.
#[derive(Debug, Clone, Copy)]
pub struct RouteProjection {
    /// Index of the route point starting the matched segment.
    pub segment_index: usize,
    /// Foot position within the segment, [0, 1].
    pub fraction: f64,
    /// Along-route distance from the departure point to the foot, meters.
    pub along_track_m: f64,
    /// Cross-track distance from the query point to the foot, meters.
    pub cross_track_m: f64,
    /// Along-route progress of the foot, [0, 1].
    pub progress: f64,
    /// The foot itself.
    pub point: GeoPosition,
}

/// Projects positions, times, and progress over an immutable route.
pub struct RouteProjector {
    route: Arc<Route>,
    cum_dist_m: Vec<f64>,
    /// Effective arrival per point, unadjusted Unix seconds.
    eff_arrival_s: Vec<Option<i64>>,
    offset_s: i64,
    timed: bool,
}

impl RouteProjector {
    pub fn new(route: Arc<Route>) -> Result<Self> {
        if route.points.len() < 2 {
            return Err(RouteError::EmptyRoute);
        }

        let mut cum_dist_m = Vec::with_capacity(route.points.len());
        cum_dist_m.push(0.0);
        for w in route.points.windows(2) {
            let d = haversine_m(w[0].lat_deg, w[0].lon_deg, w[1].lat_deg, w[1].lon_deg);
            cum_dist_m.push(cum_dist_m.last().unwrap() + d);
        }

        let timed = route.timing().has_timing_data;
        let mut eff_arrival_s: Vec<Option<i64>> = route
            .points
            .iter()
            .map(|p| p.expected_arrival.map(|t| t.timestamp()))
            .collect();

        if timed {
            // Distance-weighted times for untimed interior points.
            let mut i = 0;
            while i < eff_arrival_s.len() {
                if eff_arrival_s[i].is_some() {
                    i += 1;
                    continue;
                }
                let prev = i - 1; // first/last are timed when `timed`
                let mut next = i + 1;
                while eff_arrival_s[next].is_none() {
                    next += 1;
                }
                let t0 = eff_arrival_s[prev].unwrap() as f64;
                let t1 = eff_arrival_s[next].unwrap() as f64;
                let d0 = cum_dist_m[prev];
                let d1 = cum_dist_m[next];
                for j in (prev + 1)..next {
                    let f = if d1 > d0 {
                        (cum_dist_m[j] - d0) / (d1 - d0)
                    } else {
                        (j - prev) as f64 / (next - prev) as f64
                    };
                    eff_arrival_s[j] = Some((t0 + f * (t1 - t0)).round() as i64);
                }
                i = next + 1;
            }
        }

        Ok(Self {
            route,
            cum_dist_m,
            eff_arrival_s,
            offset_s: 0,
            timed,
        })
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    pub fn has_timing_data(&self) -> bool {
        self.timed
    }

    /// Uniform time adjustment in seconds added to every planned arrival.
    pub fn set_time_adjustment_s(&mut self, offset_s: i64) {
        self.offset_s = offset_s;
    }

    pub fn time_adjustment_s(&self) -> i64 {
        self.offset_s
    }

    pub fn total_distance_m(&self) -> f64 {
        *self.cum_dist_m.last().unwrap()
    }

    /// Adjusted [departure, arrival] span of the timed route.
    pub fn mission_span(&self) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        if !self.timed {
            return Err(RouteError::UntimedRoute);
        }
        let start = self.eff_arrival_s.first().unwrap().unwrap() + self.offset_s;
        let end = self.eff_arrival_s.last().unwrap().unwrap() + self.offset_s;
        Ok((to_utc(start), to_utc(end)))
    }

    /// Adjusted effective arrival time at a point index.
    pub fn point_time(&self, index: usize) -> Result<DateTime<Utc>> {
        match self.eff_arrival_s.get(index) {
            Some(Some(t)) => Ok(to_utc(t + self.offset_s)),
            Some(None) => Err(RouteError::UntimedRoute),
            None => Err(RouteError::EmptyRoute),
        }
    }

    /// Along-route distance from departure to a point index, meters.
    pub fn cumulative_distance_m(&self, index: usize) -> Option<f64> {
        self.cum_dist_m.get(index).copied()
    }

    /// Adjusted arrival time at a named waypoint.
    pub fn waypoint_time(&self, name: &str) -> Result<DateTime<Utc>> {
        let wp = self.route.waypoint(name)?;
        match self.eff_arrival_s[wp.point_index] {
            Some(t) => Ok(to_utc(t + self.offset_s)),
            None => Err(RouteError::UntimedRoute),
        }
    }

    /// Interpolated position at an adjusted wall-clock time.
    pub fn position_at_time(&self, t: DateTime<Utc>) -> Result<GeoPosition> {
        let (i, f) = self.segment_at_time(t)?;
        Ok(slerp(
            &self.route.points[i].position(),
            &self.route.points[i + 1].position(),
            f,
        ))
    }

    /// Course over ground at an adjusted wall-clock time, degrees from North.
    pub fn heading_at_time(&self, t: DateTime<Utc>) -> Result<f64> {
        let (i, f) = self.segment_at_time(t)?;
        let a = self.route.points[i].position();
        let b = self.route.points[i + 1].position();
        let pos = slerp(&a, &b, f);
        if haversine_m(pos.lat_deg, pos.lon_deg, b.lat_deg, b.lon_deg) < 1.0 {
            Ok(initial_bearing_deg(a.lat_deg, a.lon_deg, b.lat_deg, b.lon_deg))
        } else {
            Ok(initial_bearing_deg(
                pos.lat_deg,
                pos.lon_deg,
                b.lat_deg,
                b.lon_deg,
            ))
        }
    }

    /// Along-route progress fraction at an adjusted wall-clock time.
    pub fn progress_at_time(&self, t: DateTime<Utc>) -> Result<f64> {
        let (i, f) = self.segment_at_time(t)?;
        let seg_len = self.cum_dist_m[i + 1] - self.cum_dist_m[i];
        let total = self.total_distance_m();
        if total <= 0.0 {
            return Ok(0.0);
        }
        Ok((self.cum_dist_m[i] + f * seg_len) / total)
    }

    /// Position at a distance-based progress fraction, `p` clamped to [0, 1].
    pub fn position_at_progress(&self, p: f64) -> Result<GeoPosition> {
        let total = self.total_distance_m();
        let target = p.clamp(0.0, 1.0) * total;
        let i = match self
            .cum_dist_m
            .partition_point(|&d| d <= target)
            .checked_sub(1)
        {
            Some(i) => i.min(self.route.points.len() - 2),
            None => 0,
        };
        let seg_len = self.cum_dist_m[i + 1] - self.cum_dist_m[i];
        let f = if seg_len > 0.0 {
            ((target - self.cum_dist_m[i]) / seg_len).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Ok(slerp(
            &self.route.points[i].position(),
            &self.route.points[i + 1].position(),
            f,
        ))
    }

    /// Distance-based fallback for untimed routes: position after `elapsed_s`
    /// seconds at a caller-supplied ground speed.
    pub fn position_at_elapsed(&self, elapsed_s: f64, speed_knots: f64) -> Result<GeoPosition> {
        let total = self.total_distance_m();
        if total <= 0.0 {
            return Ok(self.route.points[0].position());
        }
        let d = (speed_knots * KNOTS_TO_MPS * elapsed_s).max(0.0);
        self.position_at_progress(d / total)
    }

    /// Project a geographic point onto the polyline. The segment with the
    /// smallest cross-track distance wins; ties keep the earlier segment.
    pub fn project_point(&self, lat_deg: f64, lon_deg: f64) -> Result<RouteProjection> {
        let q = GeoPosition::new(lat_deg, lon_deg, 0.0);
        let mut best: Option<RouteProjection> = None;

        for i in 0..self.route.points.len() - 1 {
            let a = self.route.points[i].position();
            let b = self.route.points[i + 1].position();
            let arc = project_onto_arc(&a, &b, &q);
            if best.as_ref().map_or(true, |p| arc.cross_m < p.cross_track_m) {
                let along = self.cum_dist_m[i] + arc.along_m;
                let total = self.total_distance_m();
                best = Some(RouteProjection {
                    segment_index: i,
                    fraction: arc.fraction,
                    along_track_m: along,
                    cross_track_m: arc.cross_m,
                    progress: if total > 0.0 { along / total } else { 0.0 },
                    point: slerp(&a, &b, arc.fraction),
                });
            }
        }

        best.ok_or(RouteError::EmptyRoute)
    }

    /// Invert the timing map at a projected position (adjusted time).
    pub fn time_at_projection(&self, proj: &RouteProjection) -> Result<DateTime<Utc>> {
        if !self.timed {
            return Err(RouteError::UntimedRoute);
        }
        let i = proj.segment_index;
        let t0 = self.eff_arrival_s[i].ok_or(RouteError::UntimedRoute)? as f64;
        let t1 = self.eff_arrival_s[i + 1].ok_or(RouteError::UntimedRoute)? as f64;
        let t = t0 + proj.fraction * (t1 - t0);
        Ok(to_utc(t.round() as i64 + self.offset_s))
    }

    /// Locate the segment containing adjusted time `t` and the fraction into
    /// it. Errors: `UntimedRoute`, `OutOfRangeTime`.
    fn segment_at_time(&self, t: DateTime<Utc>) -> Result<(usize, f64)> {
        if !self.timed {
            return Err(RouteError::UntimedRoute);
        }
        let ts = t.timestamp() - self.offset_s;
        let first = self.eff_arrival_s.first().unwrap().unwrap();
        let last = self.eff_arrival_s.last().unwrap().unwrap();
        if ts < first || ts > last {
            return Err(RouteError::OutOfRangeTime(t));
        }

        // partition_point over effective arrivals (all Some on a timed route)
        let idx = self
            .eff_arrival_s
            .partition_point(|a| a.unwrap() <= ts)
            .saturating_sub(1)
            .min(self.route.points.len() - 2);

        let t0 = self.eff_arrival_s[idx].unwrap();
        let t1 = self.eff_arrival_s[idx + 1].unwrap();
        let f = if t1 > t0 {
            ((ts - t0) as f64 / (t1 - t0) as f64).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Ok((idx, f))
    }
}

fn to_utc(unix_s: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(unix_s, 0).unwrap()
}
