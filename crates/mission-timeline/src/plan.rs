//! Per-leg transport configuration.
//!
//! A `TransportPlan` is owned by exactly one mission leg and replaced
//! atomically on update. Validation checks referential integrity (satellite
//! ids, AAR waypoint names) before any timeline work starts; sanitization on
//! route replacement drops AAR windows whose waypoints vanished and reports
//! them as warnings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use footprint_coverage::FootprintSpec;
use route_model::Route;

use crate::ephemeris::SatelliteEphemeris;
use crate::{Result, TimelineError};

pub const DEFAULT_HANDOFF_BUFFER_S: i64 = 900;

fn default_buffer_s() -> i64 {
    DEFAULT_HANDOFF_BUFFER_S
}

/// A manual X-band handoff anchored to a geographic point on the route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XTransition {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub target_satellite_id: String,
    #[serde(default = "default_buffer_s")]
    pub pre_buffer_s: i64,
    #[serde(default = "default_buffer_s")]
    pub post_buffer_s: i64,
}

/// One compass-azimuth arc `[from_deg, to_deg)`; may wrap through 0/360.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AzimuthArc {
    pub from_deg: f64,
    pub to_deg: f64,
}

impl AzimuthArc {
    pub fn contains(&self, azimuth_deg: f64) -> bool {
        let az = azimuth_deg.rem_euclid(360.0);
        let from = self.from_deg.rem_euclid(360.0);
        let to = self.to_deg.rem_euclid(360.0);
        if from <= to {
            (from..to).contains(&az)
        } else {
            // Wrapping arc, e.g. 350..010
            az >= from || az < to
        }
    }
}

/// Union of azimuth arcs in which the antenna cannot acquire the active X
/// satellite (e.g. tail shadow).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AzimuthDeadzone {
    pub arcs: Vec<AzimuthArc>,
}

impl AzimuthDeadzone {
    pub fn contains(&self, azimuth_deg: f64) -> bool {
        self.arcs.iter().any(|a| a.contains(azimuth_deg))
    }

    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }
}

/// A scheduled Ka outage window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KaOutage {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A manual Ku override window with a caller-supplied reason tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KuOverride {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub reason: String,
}

/// An AAR window identified by a pair of named waypoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AarWindow {
    pub start_waypoint: String,
    pub end_waypoint: String,
}

/// A Ka footprint entry, keyed by satellite id, configuration order
/// preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KaFootprint {
    pub sat_id: String,
    #[serde(flatten)]
    pub spec: FootprintSpec,
}

/// Transport configuration for one mission leg. All times UTC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportPlan {
    pub initial_x_satellite_id: String,
    #[serde(default)]
    pub x_transitions: Vec<XTransition>,
    #[serde(default)]
    pub x_azimuth_deadzone: AzimuthDeadzone,
    #[serde(default)]
    pub ka_initial_satellite_ids: Vec<String>,
    #[serde(default)]
    pub ka_outages: Vec<KaOutage>,
    #[serde(default)]
    pub ka_footprints: Vec<KaFootprint>,
    #[serde(default)]
    pub ku_overrides: Vec<KuOverride>,
    #[serde(default)]
    pub aar_windows: Vec<AarWindow>,
    /// When set, shifts every planned time by
    /// `adjusted - route departure_time`; geometry is unchanged.
    #[serde(default)]
    pub adjusted_departure_time: Option<DateTime<Utc>>,
}

impl TransportPlan {
    /// Referential integrity against the route and the X ephemeris.
    pub fn validate(&self, route: &Route, ephemeris: &dyn SatelliteEphemeris) -> Result<()> {
        if !ephemeris.known_satellite(&self.initial_x_satellite_id) {
            return Err(TimelineError::UnknownSatellite(
                self.initial_x_satellite_id.clone(),
            ));
        }
        for t in &self.x_transitions {
            if !ephemeris.known_satellite(&t.target_satellite_id) {
                return Err(TimelineError::UnknownSatellite(
                    t.target_satellite_id.clone(),
                ));
            }
        }
        for w in &self.aar_windows {
            for name in [&w.start_waypoint, &w.end_waypoint] {
                if route.waypoint(name).is_err() {
                    return Err(TimelineError::UnknownAarWaypoint(name.clone()));
                }
            }
        }
        Ok(())
    }

    /// Drop AAR windows whose waypoints no longer exist on `route`.
    /// Returns one warning per dropped window naming the missing waypoint.
    pub fn sanitize_aar_windows(&mut self, route: &Route) -> Vec<String> {
        let mut warnings = Vec::new();
        self.aar_windows.retain(|w| {
            let missing = [&w.start_waypoint, &w.end_waypoint]
                .into_iter()
                .find(|name| route.waypoint(name).is_err());
            match missing {
                Some(name) => {
                    warnings.push(format!(
                        "AAR window ({},{}) dropped: {} missing",
                        w.start_waypoint, w.end_waypoint, name
                    ));
                    false
                }
                None => true,
            }
        });
        warnings
    }

    /// Time shift derived from `adjusted_departure_time`, seconds.
    pub fn adjustment_s(&self, route: &Route) -> i64 {
        match (
            self.adjusted_departure_time,
            route.timing().departure_time,
        ) {
            (Some(adjusted), Some(original)) => (adjusted - original).num_seconds(),
            _ => 0,
        }
    }
}
