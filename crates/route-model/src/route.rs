//! Route arena and timing profile.
//!
//! A route owns its points in one contiguous `Vec`; waypoints reference
//! points by index. Routes are immutable after construction and replaced
//! atomically on update.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{haversine_m, GeoPosition};
use crate::{Result, RouteError};

/// A single point on the route polyline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePoint {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub alt_m: f64,
    pub seq: u32,
    /// Planned arrival at this point, UTC. Non-monotonic values are
    /// discarded at construction (the point becomes untimed).
    pub expected_arrival: Option<DateTime<Utc>>,
    /// Planned speed over the segment leading into this point.
    pub expected_segment_speed_knots: Option<f64>,
}

impl RoutePoint {
    pub fn position(&self) -> GeoPosition {
        GeoPosition::new(self.lat_deg, self.lon_deg, self.alt_m)
    }
}

/// Role of a named waypoint on the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaypointRole {
    Departure,
    Arrival,
    Event,
}

/// A named waypoint referencing the point arena by index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    pub role: WaypointRole,
    pub point_index: usize,
    pub expected_arrival: Option<DateTime<Utc>>,
}

/// Timing summary derived from a route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingProfile {
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub total_expected_duration: Option<Duration>,
    pub has_timing_data: bool,
}

/// An immutable ordered route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub points: Vec<RoutePoint>,
    pub waypoints: Vec<Waypoint>,
}

impl Route {
    /// Validate and construct a route. Non-monotonic arrival times are
    /// dropped (those points become untimed) rather than rejected.
    pub fn new(
        id: impl Into<String>,
        mut points: Vec<RoutePoint>,
        waypoints: Vec<Waypoint>,
    ) -> Result<Self> {
        if points.len() < 2 {
            return Err(RouteError::EmptyRoute);
        }

        for (index, p) in points.iter().enumerate() {
            if !(-90.0..=90.0).contains(&p.lat_deg) || !(-180.0..=180.0).contains(&p.lon_deg) {
                return Err(RouteError::InvalidCoordinates {
                    index,
                    lat: p.lat_deg,
                    lon: p.lon_deg,
                });
            }
            if index > 0 && points[index - 1].seq >= p.seq {
                return Err(RouteError::InvalidSequence { index });
            }
        }

        for wp in &waypoints {
            if wp.point_index >= points.len() {
                return Err(RouteError::InvalidWaypoint {
                    name: wp.name.clone(),
                    index: wp.point_index,
                });
            }
        }

        // Sanitize timing: arrivals must strictly increase along the route.
        let mut last_timed: Option<DateTime<Utc>> = None;
        for p in points.iter_mut() {
            if let Some(t) = p.expected_arrival {
                match last_timed {
                    Some(prev) if t <= prev => p.expected_arrival = None,
                    _ => last_timed = Some(t),
                }
            }
        }

        Ok(Self {
            id: id.into(),
            points,
            waypoints,
        })
    }

    /// Derive the timing profile. Timing data requires both endpoints of the
    /// route to carry arrival times.
    pub fn timing(&self) -> TimingProfile {
        let departure_time = self.points.first().and_then(|p| p.expected_arrival);
        let arrival_time = self.points.last().and_then(|p| p.expected_arrival);
        let total_expected_duration = match (departure_time, arrival_time) {
            (Some(dep), Some(arr)) => Some(arr - dep),
            _ => None,
        };
        TimingProfile {
            departure_time,
            arrival_time,
            has_timing_data: total_expected_duration.is_some(),
            total_expected_duration,
        }
    }

    pub fn waypoint(&self, name: &str) -> Result<&Waypoint> {
        self.waypoints
            .iter()
            .find(|w| w.name == name)
            .ok_or_else(|| RouteError::UnknownWaypoint(name.to_string()))
    }

    /// Total polyline length in meters.
    pub fn total_distance_m(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| haversine_m(w[0].lat_deg, w[0].lon_deg, w[1].lat_deg, w[1].lon_deg))
            .sum()
    }
}
