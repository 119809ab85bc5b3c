//! Route Model & Projector
//!
//! Immutable route arena (contiguous point storage, index-based references)
//! with a great-circle projector on top:
//! - Position/heading at a wall-clock time or at a route progress fraction
//! - Projection of an arbitrary geographic point onto the route polyline
//! - Time inversion at a projected position
//! - Uniform departure-time adjustment for timeline recomputation
//!
//! All spherical math uses the WGS84 mean-radius approximation.

use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod geo;
pub mod projector;
pub mod route;

pub use geo::{
    haversine_m, initial_bearing_deg, slerp, wrap_lon_deg, GeoPosition, EARTH_RADIUS_M,
    KNOTS_TO_MPS,
};
pub use projector::{RouteProjection, RouteProjector};
pub use route::{Route, RoutePoint, TimingProfile, Waypoint, WaypointRole};

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("route has fewer than 2 points")]
    EmptyRoute,
    #[error("invalid coordinates at point {index}: lat={lat} lon={lon}")]
    InvalidCoordinates { index: usize, lat: f64, lon: f64 },
    #[error("point sequence not strictly increasing at index {index}")]
    InvalidSequence { index: usize },
    #[error("waypoint '{name}' references point index {index} out of range")]
    InvalidWaypoint { name: String, index: usize },
    #[error("unknown waypoint: {0}")]
    UnknownWaypoint(String),
    #[error("query time {0} outside the timed route span")]
    OutOfRangeTime(DateTime<Utc>),
    #[error("time-based query on a route without timing data")]
    UntimedRoute,
}

pub type Result<T> = std::result::Result<T, RouteError>;
