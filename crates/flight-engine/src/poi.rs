//! Points of interest and derived telemetry.

use serde::{Deserialize, Serialize};

use chrono::{DateTime, Utc};

use crate::phase::EtaMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    pub id: String,
    pub name: String,
    pub lat_deg: f64,
    pub lon_deg: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Relation between the platform's track and a POI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    OnCourse,
    SlightlyOff,
    OffCourse,
    Approaching,
    Departing,
    Reached,
    Passed,
}

/// A POI with live distance/bearing/ETA telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiWithEta {
    pub poi: Poi,
    pub distance_m: f64,
    pub bearing_deg: f64,
    pub eta_seconds: f64,
    pub eta_time: DateTime<Utc>,
    pub eta_mode: EtaMode,
    pub is_on_active_route: bool,
    pub projected_waypoint_index: Option<usize>,
    pub projected_route_progress_pct: Option<f64>,
    pub course_status: CourseStatus,
}
