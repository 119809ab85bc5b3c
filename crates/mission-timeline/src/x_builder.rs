//! X-transport state builder.
//!
//! The steered point-to-point link degrades around manual handoffs and AAR
//! refueling windows, and goes offline whenever the relative azimuth to the
//! active satellite falls into the platform's dead zone. Dead-zone detection
//! samples the route at a fixed cadence; adjacent samples of identical state
//! merge into intervals expanded by half a sample on each side.

use tracing::warn;

use route_model::RouteProjector;

use crate::ephemeris::SatelliteEphemeris;
use crate::plan::TransportPlan;
use crate::series::{clamp_span, compose, Contribution, TransportSeries};
use crate::types::{reason, Transport, TransportState};
use crate::Result;

/// A transition resolved from route geometry to mission time.
#[derive(Debug, Clone)]
pub struct ResolvedTransition {
    pub time_s: i64,
    pub from_satellite: String,
    pub to_satellite: String,
    pub pre_buffer_s: i64,
    pub post_buffer_s: i64,
}

/// X builder output: the composed series plus the resolved inputs the
/// advisory generator needs.
#[derive(Debug)]
pub struct XBuildOutput {
    pub series: TransportSeries,
    pub transitions: Vec<ResolvedTransition>,
    pub aar_intervals: Vec<(i64, i64)>,
    pub conflict_intervals: Vec<(i64, i64)>,
}

pub struct XStateBuilder<'a> {
    projector: &'a RouteProjector,
    ephemeris: &'a dyn SatelliteEphemeris,
    plan: &'a TransportPlan,
    sampling_period_s: i64,
}

impl<'a> XStateBuilder<'a> {
    pub fn new(
        projector: &'a RouteProjector,
        ephemeris: &'a dyn SatelliteEphemeris,
        plan: &'a TransportPlan,
        sampling_period_s: i64,
    ) -> Self {
        Self {
            projector,
            ephemeris,
            plan,
            sampling_period_s: sampling_period_s.max(1),
        }
    }

    pub fn build(&self) -> Result<XBuildOutput> {
        let (start, end) = self.projector.mission_span()?;
        let span = (start.timestamp(), end.timestamp());

        let transitions = self.resolve_transitions(span)?;
        let mut contributions: Vec<Contribution> = Vec::new();

        for t in &transitions {
            if let Some((lo, hi)) =
                clamp_span(t.time_s - t.pre_buffer_s, t.time_s + t.post_buffer_s, span)
            {
                contributions.push(Contribution::new(
                    lo,
                    hi,
                    TransportState::Degraded,
                    reason::X_TRANSITION,
                ));
            }
        }

        let aar_intervals = self.resolve_aar_windows(span)?;
        for &(lo, hi) in &aar_intervals {
            contributions.push(Contribution::new(
                lo,
                hi,
                TransportState::Degraded,
                reason::AAR_REFUEL,
            ));
        }

        let (conflict_intervals, error_intervals) = self.sample_deadzone(span, &transitions)?;
        for &(lo, hi) in &conflict_intervals {
            contributions.push(Contribution::new(
                lo,
                hi,
                TransportState::Offline,
                reason::AZIMUTH_CONFLICT,
            ));
        }
        for &(lo, hi) in &error_intervals {
            contributions.push(Contribution::new(
                lo,
                hi,
                TransportState::Offline,
                reason::EVALUATOR_ERROR,
            ));
        }

        // Segment metadata flips to the target satellite at the start of the
        // handoff window, so one transition yields one DEGRADED segment.
        // Dead-zone sampling above uses the instant-based active satellite.
        let sat_breaks: Vec<i64> = transitions
            .iter()
            .map(|t| t.time_s - t.pre_buffer_s)
            .collect();
        let series = compose(Transport::X, span, &contributions, &sat_breaks, |t_s| {
            let sat = transitions
                .iter()
                .rev()
                .find(|t| t.time_s - t.pre_buffer_s <= t_s)
                .map(|t| t.to_satellite.clone())
                .unwrap_or_else(|| self.plan.initial_x_satellite_id.clone());
            vec![sat]
        });

        Ok(XBuildOutput {
            series,
            transitions,
            aar_intervals,
            conflict_intervals,
        })
    }

    /// Project each transition's anchor point onto the route and invert to
    /// mission time; sort by time (input order breaks ties).
    fn resolve_transitions(&self, span: (i64, i64)) -> Result<Vec<ResolvedTransition>> {
        let mut timed: Vec<(i64, usize)> = Vec::with_capacity(self.plan.x_transitions.len());
        for (idx, t) in self.plan.x_transitions.iter().enumerate() {
            let projection = self.projector.project_point(t.lat_deg, t.lon_deg)?;
            let when = self.projector.time_at_projection(&projection)?.timestamp();
            timed.push((when.clamp(span.0, span.1), idx));
        }
        timed.sort();

        let mut resolved = Vec::with_capacity(timed.len());
        let mut active = self.plan.initial_x_satellite_id.clone();
        for (time_s, idx) in timed {
            let t = &self.plan.x_transitions[idx];
            resolved.push(ResolvedTransition {
                time_s,
                from_satellite: active.clone(),
                to_satellite: t.target_satellite_id.clone(),
                pre_buffer_s: t.pre_buffer_s,
                post_buffer_s: t.post_buffer_s,
            });
            active = t.target_satellite_id.clone();
        }
        Ok(resolved)
    }

    /// Resolve AAR waypoint pairs to time intervals. Zero-length windows are
    /// discarded.
    fn resolve_aar_windows(&self, span: (i64, i64)) -> Result<Vec<(i64, i64)>> {
        let mut intervals = Vec::new();
        for w in &self.plan.aar_windows {
            let t_s = self.projector.waypoint_time(&w.start_waypoint)?.timestamp();
            let t_e = self.projector.waypoint_time(&w.end_waypoint)?.timestamp();
            if t_e <= t_s {
                warn!(
                    start = %w.start_waypoint,
                    end = %w.end_waypoint,
                    "discarding zero-length AAR window"
                );
                continue;
            }
            if let Some(clamped) = clamp_span(t_s, t_e, span) {
                intervals.push(clamped);
            }
        }
        intervals.sort();
        Ok(intervals)
    }

    /// Sample relative azimuth to the active satellite across the mission.
    /// Returns merged (conflict, evaluator-error) interval lists.
    fn sample_deadzone(
        &self,
        span: (i64, i64),
        transitions: &[ResolvedTransition],
    ) -> Result<(Vec<(i64, i64)>, Vec<(i64, i64)>)> {
        if self.plan.x_azimuth_deadzone.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        #[derive(PartialEq, Clone, Copy)]
        enum Flag {
            Clear,
            Conflict,
            Error,
        }

        let mut samples: Vec<(i64, Flag)> = Vec::new();
        let mut t_s = span.0;
        while t_s <= span.1 {
            let sat = active_satellite(transitions, &self.plan.initial_x_satellite_id, t_s);
            let flag = match chrono::DateTime::from_timestamp(t_s, 0)
                .ok_or(crate::TimelineError::ComputationFailed(
                    "sample timestamp out of range".into(),
                ))
                .and_then(|when| {
                    let pos = self.projector.position_at_time(when)?;
                    self.ephemeris
                        .azimuth_from_platform(pos.lat_deg, pos.lon_deg, &sat, when)
                }) {
                Ok(az) => {
                    if self.plan.x_azimuth_deadzone.contains(az) {
                        Flag::Conflict
                    } else {
                        Flag::Clear
                    }
                }
                Err(e) => {
                    warn!(satellite = %sat, error = %e, "azimuth sample failed");
                    Flag::Error
                }
            };
            samples.push((t_s, flag));
            if t_s == span.1 {
                break;
            }
            t_s = (t_s + self.sampling_period_s).min(span.1);
        }

        let half = self.sampling_period_s / 2;
        let merge = |want: Flag| -> Vec<(i64, i64)> {
            let mut out: Vec<(i64, i64)> = Vec::new();
            let mut run: Option<(i64, i64)> = None;
            for &(t, flag) in &samples {
                if flag == want {
                    run = Some(match run {
                        Some((lo, _)) => (lo, t),
                        None => (t, t),
                    });
                } else if let Some((lo, hi)) = run.take() {
                    if let Some(c) = clamp_span(lo - half, hi + half, span) {
                        out.push(c);
                    }
                }
            }
            if let Some((lo, hi)) = run {
                if let Some(c) = clamp_span(lo - half, hi + half, span) {
                    out.push(c);
                }
            }
            out
        };

        Ok((merge(Flag::Conflict), merge(Flag::Error)))
    }
}

/// Active X satellite at second `t_s`: the last transition at or before it.
fn active_satellite(transitions: &[ResolvedTransition], initial: &str, t_s: i64) -> String {
    transitions
        .iter()
        .rev()
        .find(|t| t.time_s <= t_s)
        .map(|t| t.to_satellite.clone())
        .unwrap_or_else(|| initial.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::{GeoSatellite, GeostationaryEphemeris};
    use crate::plan::{AarWindow, AzimuthArc, AzimuthDeadzone, XTransition};
    use chrono::{DateTime, TimeZone, Utc};
    use route_model::{Route, RoutePoint, Waypoint, WaypointRole};
    use std::sync::Arc;

    fn t(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 27, h, m, s).unwrap()
    }

    fn pt(lat: f64, lon: f64, seq: u32, arrival: Option<DateTime<Utc>>) -> RoutePoint {
        RoutePoint {
            lat_deg: lat,
            lon_deg: lon,
            alt_m: 10_000.0,
            seq,
            expected_arrival: arrival,
            expected_segment_speed_knots: None,
        }
    }

    fn route() -> Arc<Route> {
        Arc::new(
            Route::new(
                "leg-1",
                vec![
                    pt(0.0, 0.0, 0, Some(t(16, 45, 0))),
                    pt(0.0, 10.0, 1, Some(t(17, 45, 0))),
                ],
                vec![
                    Waypoint {
                        name: "DEP".into(),
                        role: WaypointRole::Departure,
                        point_index: 0,
                        expected_arrival: Some(t(16, 45, 0)),
                    },
                    Waypoint {
                        name: "ARR".into(),
                        role: WaypointRole::Arrival,
                        point_index: 1,
                        expected_arrival: Some(t(17, 45, 0)),
                    },
                ],
            )
            .unwrap(),
        )
    }

    fn ephemeris() -> GeostationaryEphemeris {
        GeostationaryEphemeris::new(vec![
            GeoSatellite {
                id: "x-east".into(),
                longitude_deg: 50.0,
            },
            GeoSatellite {
                id: "x-west".into(),
                longitude_deg: -90.0,
            },
        ])
    }

    fn base_plan() -> TransportPlan {
        TransportPlan {
            initial_x_satellite_id: "x-east".into(),
            x_transitions: vec![],
            x_azimuth_deadzone: AzimuthDeadzone::default(),
            ka_initial_satellite_ids: vec![],
            ka_outages: vec![],
            ka_footprints: vec![],
            ku_overrides: vec![],
            aar_windows: vec![],
            adjusted_departure_time: None,
        }
    }

    #[test]
    fn test_no_inputs_is_fully_available() {
        let route = route();
        let projector = RouteProjector::new(route).unwrap();
        let eph = ephemeris();
        let plan = base_plan();
        let out = XStateBuilder::new(&projector, &eph, &plan, 30).build().unwrap();
        assert_eq!(out.series.intervals.len(), 1);
        assert_eq!(out.series.intervals[0].state, TransportState::Available);
        assert_eq!(out.series.intervals[0].satellites, vec!["x-east"]);
    }

    #[test]
    fn test_single_transition_degrades_buffer_window() {
        let route = route();
        let projector = RouteProjector::new(route).unwrap();
        let eph = ephemeris();
        let mut plan = base_plan();
        plan.x_transitions.push(XTransition {
            lat_deg: 0.0,
            lon_deg: 5.0, // midpoint → 17:15:00Z
            target_satellite_id: "x-west".into(),
            pre_buffer_s: 900,
            post_buffer_s: 900,
        });

        let out = XStateBuilder::new(&projector, &eph, &plan, 30).build().unwrap();
        assert_eq!(out.transitions.len(), 1);
        assert_eq!(out.transitions[0].time_s, t(17, 15, 0).timestamp());
        assert_eq!(out.transitions[0].from_satellite, "x-east");
        assert_eq!(out.transitions[0].to_satellite, "x-west");

        // AVAILABLE / DEGRADED(+sat change inside) / AVAILABLE
        let degraded: Vec<_> = out
            .series
            .intervals
            .iter()
            .filter(|iv| iv.state == TransportState::Degraded)
            .collect();
        assert_eq!(degraded.first().unwrap().start_s, t(17, 0, 0).timestamp());
        assert_eq!(degraded.last().unwrap().end_s, t(17, 30, 0).timestamp());
        assert!(degraded
            .iter()
            .all(|iv| iv.reasons == vec![reason::X_TRANSITION]));

        // Metadata flips to the target at the window start, so the whole
        // DEGRADED window is one interval on the new satellite.
        assert_eq!(degraded.len(), 1);
        assert_eq!(
            out.series.interval_at(t(16, 55, 0).timestamp()).unwrap().satellites,
            vec!["x-east"]
        );
        assert_eq!(
            out.series.interval_at(t(17, 5, 0).timestamp()).unwrap().satellites,
            vec!["x-west"]
        );
    }

    #[test]
    fn test_aar_window_degrades() {
        let route = route();
        let projector = RouteProjector::new(route).unwrap();
        let eph = ephemeris();
        let mut plan = base_plan();
        plan.aar_windows.push(AarWindow {
            start_waypoint: "DEP".into(),
            end_waypoint: "ARR".into(),
        });

        let out = XStateBuilder::new(&projector, &eph, &plan, 30).build().unwrap();
        assert_eq!(out.aar_intervals.len(), 1);
        assert_eq!(out.series.intervals.len(), 1);
        assert_eq!(out.series.intervals[0].state, TransportState::Degraded);
        assert_eq!(out.series.intervals[0].reasons, vec![reason::AAR_REFUEL]);
    }

    #[test]
    fn test_deadzone_blocks_entire_leg() {
        let route = route();
        let projector = RouteProjector::new(route).unwrap();
        let eph = ephemeris();
        let mut plan = base_plan();
        // x-west sits due west of the whole equatorial route (azimuth ~270).
        plan.initial_x_satellite_id = "x-west".into();
        plan.x_azimuth_deadzone = AzimuthDeadzone {
            arcs: vec![AzimuthArc {
                from_deg: 260.0,
                to_deg: 280.0,
            }],
        };

        let out = XStateBuilder::new(&projector, &eph, &plan, 30).build().unwrap();
        assert_eq!(out.conflict_intervals.len(), 1);
        assert_eq!(out.series.intervals.len(), 1);
        assert_eq!(out.series.intervals[0].state, TransportState::Offline);
        assert_eq!(
            out.series.intervals[0].reasons,
            vec![reason::AZIMUTH_CONFLICT]
        );
    }

    #[test]
    fn test_deadzone_elsewhere_stays_available() {
        let route = route();
        let projector = RouteProjector::new(route).unwrap();
        let eph = ephemeris();
        let mut plan = base_plan();
        plan.x_azimuth_deadzone = AzimuthDeadzone {
            arcs: vec![AzimuthArc {
                from_deg: 0.0,
                to_deg: 20.0,
            }],
        };

        let out = XStateBuilder::new(&projector, &eph, &plan, 30).build().unwrap();
        assert!(out.conflict_intervals.is_empty());
        assert_eq!(out.series.intervals[0].state, TransportState::Available);
    }
}
