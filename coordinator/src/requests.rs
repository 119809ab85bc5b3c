//! Request/response DTOs for the in-process mutation and preview surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mission_timeline::TransportPlan;

/// Preview a timeline for a leg without persisting or publishing anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewTimelineRequest {
    pub mission_id: String,
    pub leg_id: String,
    pub transports: TransportPlan,
    /// Overrides `transports.adjusted_departure_time` when set.
    #[serde(default)]
    pub adjusted_departure_time: Option<DateTime<Utc>>,
}

/// Every mutating operation answers with the resource plus non-fatal
/// warnings (dropped AAR windows, large time adjustments, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResponse<T> {
    pub resource: T,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightStatusOverride {
    Depart,
    Arrive,
    Reset,
}
