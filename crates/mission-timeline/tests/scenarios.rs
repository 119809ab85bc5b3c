//! End-to-end timeline scenarios over a short equatorial leg:
//! all-nominal, single X handoff, overlapping Ka outage, and a uniform
//! departure-time adjustment.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use geojson::{Geometry, Value};

use footprint_coverage::{CoverageEvaluator, FootprintSpec};
use mission_timeline::{
    AdvisoryEvent, BuilderConfig, GeostationaryEphemeris, KaOutage, Timeline, TimelineBuilder,
    TimelineStatus, Transport, TransportPlan, TransportState, XTransition,
};
use mission_timeline::ephemeris::GeoSatellite;
use route_model::{Route, RoutePoint, Waypoint, WaypointRole};

fn t(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 27, h, m, s).unwrap()
}

fn route() -> Arc<Route> {
    Arc::new(
        Route::new(
            "leg-1",
            vec![
                RoutePoint {
                    lat_deg: 0.0,
                    lon_deg: 0.0,
                    alt_m: 11_000.0,
                    seq: 0,
                    expected_arrival: Some(t(16, 45, 0)),
                    expected_segment_speed_knots: None,
                },
                RoutePoint {
                    lat_deg: 0.0,
                    lon_deg: 10.0,
                    alt_m: 11_000.0,
                    seq: 1,
                    expected_arrival: Some(t(17, 45, 0)),
                    expected_segment_speed_knots: None,
                },
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

fn full_coverage_evaluator() -> CoverageEvaluator {
    let footprint = FootprintSpec {
        polygon: Geometry::new(Value::Polygon(vec![vec![
            vec![-20.0, -20.0],
            vec![30.0, -20.0],
            vec![30.0, 20.0],
            vec![-20.0, 20.0],
            vec![-20.0, -20.0],
        ]])),
        valid_from: None,
        valid_until: None,
    };
    CoverageEvaluator::new(vec![("ka-1".to_string(), footprint)]).unwrap()
}

fn ephemeris() -> GeostationaryEphemeris {
    GeostationaryEphemeris::new(vec![
        GeoSatellite {
            id: "x-east".into(),
            longitude_deg: 50.0,
        },
        GeoSatellite {
            id: "x-west".into(),
            longitude_deg: -40.0,
        },
    ])
}

fn base_plan() -> TransportPlan {
    TransportPlan {
        initial_x_satellite_id: "x-east".into(),
        x_transitions: vec![],
        x_azimuth_deadzone: Default::default(),
        ka_initial_satellite_ids: vec!["ka-1".into()],
        ka_outages: vec![],
        ka_footprints: vec![],
        ku_overrides: vec![],
        aar_windows: vec![],
        adjusted_departure_time: None,
    }
}

fn build(plan: &TransportPlan) -> Timeline {
    let evaluator = full_coverage_evaluator();
    let ephemeris = ephemeris();
    let builder = TimelineBuilder::new(
        route(),
        &evaluator,
        &ephemeris,
        plan,
        BuilderConfig::default(),
    );
    builder.build("leg-1", &AtomicBool::new(false)).unwrap()
}

fn midpoint_transition() -> XTransition {
    XTransition {
        lat_deg: 0.0,
        lon_deg: 5.0,
        target_satellite_id: "x-west".into(),
        pre_buffer_s: 900,
        post_buffer_s: 900,
    }
}

#[test]
fn all_nominal_short_leg() {
    let timeline = build(&base_plan());

    assert_eq!(timeline.segments.len(), 1);
    let s = &timeline.segments[0];
    assert_eq!(s.start, t(16, 45, 0));
    assert_eq!(s.end, t(17, 45, 0));
    assert_eq!(s.status, TimelineStatus::Nominal);
    assert_eq!(s.x_state, TransportState::Available);
    assert_eq!(s.ka_state, TransportState::Available);
    assert_eq!(s.ku_state, TransportState::Available);
    assert!(s.reasons.is_empty());
    assert_eq!(s.metadata.satellites.ka, vec!["ka-1"]);
    assert!(timeline.advisories.is_empty());
}

#[test]
fn single_x_handoff() {
    let mut plan = base_plan();
    plan.x_transitions.push(midpoint_transition());
    let timeline = build(&plan);

    let expected = vec![
        (t(16, 45, 0), t(17, 0, 0), TimelineStatus::Nominal),
        (t(17, 0, 0), t(17, 30, 0), TimelineStatus::Degraded),
        (t(17, 30, 0), t(17, 45, 0), TimelineStatus::Nominal),
    ];
    let actual: Vec<_> = timeline
        .segments
        .iter()
        .map(|s| (s.start, s.end, s.status))
        .collect();
    assert_eq!(actual, expected);

    let degraded = &timeline.segments[1];
    assert_eq!(degraded.reasons, vec!["x_transition"]);
    assert_eq!(degraded.impacted_transports, vec![Transport::X]);
    assert_eq!(degraded.metadata.satellites.x.as_deref(), Some("x-west"));

    let handoff = timeline
        .advisories
        .iter()
        .find(|a| a.event_type == AdvisoryEvent::XTransition)
        .unwrap();
    assert_eq!(handoff.timestamp, t(17, 15, 0));
}

#[test]
fn overlapping_ka_outage_and_x_handoff() {
    let mut plan = base_plan();
    plan.x_transitions.push(midpoint_transition());
    plan.ka_outages.push(KaOutage {
        start: t(17, 5, 0),
        end: t(17, 10, 0),
    });
    let timeline = build(&plan);

    assert_eq!(timeline.segments.len(), 5);
    let critical = &timeline.segments[2];
    assert_eq!(critical.start, t(17, 5, 0));
    assert_eq!(critical.end, t(17, 10, 0));
    assert_eq!(critical.status, TimelineStatus::Critical);
    assert_eq!(critical.x_state, TransportState::Degraded);
    assert_eq!(critical.ka_state, TransportState::Offline);
    assert_eq!(critical.ku_state, TransportState::Available);
    assert_eq!(critical.reasons, vec!["ka_outage", "x_transition"]);
}

#[test]
fn time_adjustment_shifts_everything() {
    let mut plan = base_plan();
    plan.x_transitions.push(midpoint_transition());
    let baseline = build(&plan);

    plan.adjusted_departure_time = Some(t(16, 5, 0)); // Δ = -40 min
    let shifted = build(&plan);

    assert_eq!(baseline.segments.len(), shifted.segments.len());
    let delta = chrono::Duration::minutes(-40);
    for (b, s) in baseline.segments.iter().zip(&shifted.segments) {
        assert_eq!(b.start + delta, s.start);
        assert_eq!(b.end + delta, s.end);
        assert_eq!(b.status, s.status);
        assert_eq!(b.reasons, s.reasons);
    }

    let handoff = shifted
        .advisories
        .iter()
        .find(|a| a.event_type == AdvisoryEvent::XTransition)
        .unwrap();
    assert_eq!(handoff.timestamp, t(16, 35, 0));
}

#[test]
fn adjustment_is_idempotent() {
    let mut plan = base_plan();
    plan.x_transitions.push(midpoint_transition());
    plan.adjusted_departure_time = Some(t(16, 5, 0));
    let once = build(&plan);
    let twice = build(&plan);
    assert_eq!(once, twice);
}

#[test]
fn timeline_roundtrips_through_json() {
    let mut plan = base_plan();
    plan.x_transitions.push(midpoint_transition());
    plan.ka_outages.push(KaOutage {
        start: t(17, 5, 0),
        end: t(17, 10, 0),
    });
    let timeline = build(&plan);

    let blob = serde_json::to_string(&timeline).unwrap();
    let restored: Timeline = serde_json::from_str(&blob).unwrap();
    assert_eq!(timeline.segments, restored.segments);
    assert_eq!(timeline.advisories, restored.advisories);
}

#[test]
fn determinism_byte_identical() {
    let mut plan = base_plan();
    plan.x_transitions.push(midpoint_transition());
    plan.ka_outages.push(KaOutage {
        start: t(17, 5, 0),
        end: t(17, 10, 0),
    });
    let a = serde_json::to_vec(&build(&plan)).unwrap();
    let b = serde_json::to_vec(&build(&plan)).unwrap();
    assert_eq!(a, b);
}
