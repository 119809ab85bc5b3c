//! Simulated position source.
//!
//! Replays the active route against the wall clock (optionally time-scaled)
//! so the coordinator can run without a live terminal feed. Timed routes
//! follow their own schedule; untimed routes fall back to a fixed cruise
//! speed.

use chrono::{DateTime, Duration, Utc};

use route_model::{Route, RouteProjector};
use std::sync::Arc;

use crate::interfaces::{PositionFix, PositionSource};

const FALLBACK_CRUISE_KN: f64 = 450.0;

pub struct SimulatedPositionSource {
    projector: RouteProjector,
    started_wall: DateTime<Utc>,
    time_scale: f64,
    mission_span: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl SimulatedPositionSource {
    /// `time_scale` > 1 replays the mission faster than real time.
    pub fn new(route: Arc<Route>, time_scale: f64) -> route_model::Result<Self> {
        let projector = RouteProjector::new(route)?;
        let mission_span = projector.mission_span().ok();
        Ok(Self {
            projector,
            started_wall: Utc::now(),
            time_scale: if time_scale > 0.0 { time_scale } else { 1.0 },
            mission_span,
        })
    }

    fn elapsed_s(&self, now: DateTime<Utc>) -> f64 {
        (now - self.started_wall).num_milliseconds() as f64 / 1000.0 * self.time_scale
    }
}

impl PositionSource for SimulatedPositionSource {
    fn next_position(&self) -> Option<PositionFix> {
        let now = Utc::now();
        let position = match self.mission_span {
            Some((start, end)) => {
                let mut t = start + Duration::milliseconds((self.elapsed_s(now) * 1000.0) as i64);
                if t > end {
                    t = end;
                }
                self.projector.position_at_time(t).ok()?
            }
            None => self
                .projector
                .position_at_elapsed(self.elapsed_s(now), FALLBACK_CRUISE_KN)
                .ok()?,
        };
        Some(PositionFix {
            lat_deg: position.lat_deg,
            lon_deg: position.lon_deg,
            alt_m: position.alt_m,
            timestamp: now,
        })
    }
}
