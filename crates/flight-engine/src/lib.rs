//! Flight Phase & ETA Engine
//!
//! Tracks the platform through PRE_DEPARTURE → IN_FLIGHT → POST_ARRIVAL,
//! smooths ground speed over a sliding window, and computes anticipated /
//! estimated / blended ETAs to waypoints and points of interest, with a
//! bounded LRU memo over the hot POI queries.

use thiserror::Error;

pub mod eta;
pub mod phase;
pub mod poi;
pub mod speed;

pub use eta::{EtaConfig, EtaEngine, WaypointEta};
pub use phase::{EtaMode, FlightPhase, PhaseConfig, PhaseEvent, PhaseMachine};
pub use poi::{CourseStatus, Poi, PoiWithEta};
pub use speed::SpeedSmoother;

use route_model::RouteError;

#[derive(Error, Debug)]
pub enum FlightError {
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error("waypoint index {0} out of range")]
    WaypointOutOfRange(usize),
}

pub type Result<T> = std::result::Result<T, FlightError>;
