//! Coordinator operation tests: route replacement dropping AAR windows,
//! preview isolation from storage, read-your-writes on config updates,
//! version conflicts, time-adjustment warnings, and the flight-phase /
//! ETA-mode switch driven by scripted position fixes.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

use aircomm_coordinator::{
    Coordinator, CoordinatorError, FlightStatusOverride, InMemoryStorage, PlannerDefaults,
    PositionFix, PositionSource, PreviewTimelineRequest, RecordingSink, Storage,
};
use flight_engine::FlightPhase;
use mission_timeline::ephemeris::{GeoSatellite, GeostationaryEphemeris};
use mission_timeline::{AarWindow, KaOutage, TransportPlan, XTransition};
use route_model::{Route, RoutePoint, Waypoint, WaypointRole};

fn t(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 27, h, m, s).unwrap()
}

fn pt(lat: f64, lon: f64, seq: u32, arrival: DateTime<Utc>) -> RoutePoint {
    RoutePoint {
        lat_deg: lat,
        lon_deg: lon,
        alt_m: 10_000.0,
        seq,
        expected_arrival: Some(arrival),
        expected_segment_speed_knots: None,
    }
}

fn wp(name: &str, role: WaypointRole, index: usize, arrival: DateTime<Utc>) -> Waypoint {
    Waypoint {
        name: name.into(),
        role,
        point_index: index,
        expected_arrival: Some(arrival),
    }
}

/// Four-point route with an AAR pair in the middle.
fn route_with_aar() -> Arc<Route> {
    Arc::new(
        Route::new(
            "route-1",
            vec![
                pt(0.0, 0.0, 0, t(16, 45, 0)),
                pt(0.0, 3.0, 1, t(17, 0, 0)),
                pt(0.0, 6.0, 2, t(17, 15, 0)),
                pt(0.0, 10.0, 3, t(17, 45, 0)),
            ],
            vec![
                wp("DEP", WaypointRole::Departure, 0, t(16, 45, 0)),
                wp("AAR_A", WaypointRole::Event, 1, t(17, 0, 0)),
                wp("AAR_B", WaypointRole::Event, 2, t(17, 15, 0)),
                wp("ARR", WaypointRole::Arrival, 3, t(17, 45, 0)),
            ],
        )
        .unwrap(),
    )
}

/// Replacement route keeping DEP and AAR_A but dropping AAR_B.
fn route_without_aar_b() -> Arc<Route> {
    Arc::new(
        Route::new(
            "route-2",
            vec![
                pt(0.0, 0.0, 0, t(16, 45, 0)),
                pt(0.0, 3.0, 1, t(17, 0, 0)),
                pt(0.0, 10.0, 2, t(17, 45, 0)),
            ],
            vec![
                wp("DEP", WaypointRole::Departure, 0, t(16, 45, 0)),
                wp("AAR_A", WaypointRole::Event, 1, t(17, 0, 0)),
                wp("ARR", WaypointRole::Arrival, 2, t(17, 45, 0)),
            ],
        )
        .unwrap(),
    )
}

fn plan_with_aar() -> TransportPlan {
    TransportPlan {
        initial_x_satellite_id: "x-east".into(),
        x_transitions: vec![],
        x_azimuth_deadzone: Default::default(),
        ka_initial_satellite_ids: vec![],
        ka_outages: vec![],
        ka_footprints: vec![],
        ku_overrides: vec![],
        aar_windows: vec![AarWindow {
            start_waypoint: "AAR_A".into(),
            end_waypoint: "AAR_B".into(),
        }],
        adjusted_departure_time: Some(t(16, 15, 0)), // Δ = -30 min
    }
}

/// Scripted pull-model position feed.
#[derive(Default)]
struct ScriptedSource {
    fixes: Mutex<VecDeque<PositionFix>>,
}

impl ScriptedSource {
    fn push(&self, fix: PositionFix) {
        self.fixes.lock().push_back(fix);
    }
}

impl PositionSource for ScriptedSource {
    fn next_position(&self) -> Option<PositionFix> {
        self.fixes.lock().pop_front()
    }
}

struct Harness {
    coordinator: Arc<Coordinator>,
    storage: Arc<InMemoryStorage>,
    metrics: Arc<RecordingSink>,
    source: Arc<ScriptedSource>,
}

fn harness() -> Harness {
    let storage = Arc::new(InMemoryStorage::default());
    let metrics = Arc::new(RecordingSink::new());
    let source = Arc::new(ScriptedSource::default());
    let ephemeris = Arc::new(GeostationaryEphemeris::new(vec![
        GeoSatellite {
            id: "x-east".into(),
            longitude_deg: 50.0,
        },
        GeoSatellite {
            id: "x-west".into(),
            longitude_deg: -40.0,
        },
    ]));
    let coordinator = Arc::new(Coordinator::new(
        PlannerDefaults::default(),
        storage.clone(),
        metrics.clone(),
        ephemeris,
        source.clone(),
    ));
    coordinator.spawn_worker();
    Harness {
        coordinator,
        storage,
        metrics,
        source,
    }
}

#[tokio::test]
async fn route_replacement_drops_dangling_aar() {
    let h = harness();
    let activated = h
        .coordinator
        .activate_leg("leg-1", route_with_aar(), Arc::new(plan_with_aar()))
        .await
        .unwrap();
    assert!(activated.resource.timeline.is_some());

    let replaced = h
        .coordinator
        .replace_route("leg-1", route_without_aar_b())
        .await
        .unwrap();

    assert_eq!(
        replaced.warnings,
        vec!["AAR window (AAR_A,AAR_B) dropped: AAR_B missing"]
    );
    let snapshot = &replaced.resource;
    assert!(snapshot.plan.adjusted_departure_time.is_none());
    assert!(snapshot.plan.aar_windows.is_empty());
    assert_eq!(snapshot.route_version, 2);

    // Recomputed without the AAR DEGRADED interval and without the shift.
    let timeline = snapshot.timeline.as_ref().unwrap();
    assert_eq!(timeline.mission_start, t(16, 45, 0));
    assert!(timeline
        .segments
        .iter()
        .all(|s| !s.reasons.contains(&"aar_refuel".to_string())));
}

#[tokio::test]
async fn preview_never_touches_storage() {
    let h = harness();
    let mut plan = plan_with_aar();
    plan.adjusted_departure_time = None;
    h.coordinator
        .activate_leg("leg-1", route_with_aar(), Arc::new(plan.clone()))
        .await
        .unwrap();

    let saved = h.storage.load_timeline("leg-1").unwrap();
    let saved_config = h.storage.load_leg_config("leg-1").unwrap();

    // Preview with an added outage and a big adjustment.
    let mut preview_plan = plan.clone();
    preview_plan.ka_outages.push(KaOutage {
        start: t(17, 0, 0),
        end: t(17, 10, 0),
    });
    let response = h
        .coordinator
        .preview_timeline(&PreviewTimelineRequest {
            mission_id: "m-1".into(),
            leg_id: "leg-1".into(),
            transports: preview_plan,
            adjusted_departure_time: Some(t(4, 45, 0)), // Δ = -12 h
        })
        .unwrap();

    // Non-blocking warning for |Δ| > 8 h, and a computed timeline anyway.
    assert!(response
        .warnings
        .iter()
        .any(|w| w.contains("exceeds the 28800 s")));
    assert_eq!(response.resource.mission_start, t(4, 45, 0));

    // Storage unchanged.
    assert!(Arc::ptr_eq(&saved, &h.storage.load_timeline("leg-1").unwrap()));
    assert!(Arc::ptr_eq(
        &saved_config,
        &h.storage.load_leg_config("leg-1").unwrap()
    ));
}

#[tokio::test]
async fn config_update_is_read_your_writes() {
    let h = harness();
    let mut plan = plan_with_aar();
    plan.aar_windows.clear();
    plan.adjusted_departure_time = None;
    h.coordinator
        .activate_leg("leg-1", route_with_aar(), Arc::new(plan.clone()))
        .await
        .unwrap();

    plan.x_transitions.push(XTransition {
        lat_deg: 0.0,
        lon_deg: 5.0,
        target_satellite_id: "x-west".into(),
        pre_buffer_s: 900,
        post_buffer_s: 900,
    });
    let updated = h
        .coordinator
        .update_leg_config("leg-1", plan, None)
        .await
        .unwrap();

    // The returned snapshot already carries the recomputed timeline.
    let timeline = updated.resource.timeline.as_ref().unwrap();
    assert!(timeline
        .segments
        .iter()
        .any(|s| s.reasons.contains(&"x_transition".to_string())));
    assert_eq!(updated.resource.config_version, 2);

    // And it was persisted (explicit save path).
    let stored = h.storage.load_timeline("leg-1").unwrap();
    assert_eq!(stored.segments, timeline.segments);
}

#[tokio::test]
async fn stale_version_conflicts() {
    let h = harness();
    let mut plan = plan_with_aar();
    plan.aar_windows.clear();
    plan.adjusted_departure_time = None;
    h.coordinator
        .activate_leg("leg-1", route_with_aar(), Arc::new(plan.clone()))
        .await
        .unwrap();

    let result = h
        .coordinator
        .update_leg_config("leg-1", plan, Some(99))
        .await;
    assert!(matches!(
        result,
        Err(CoordinatorError::Conflict {
            expected: 99,
            current: 1
        })
    ));
}

#[tokio::test]
async fn non_monotonic_fix_rejected() {
    let h = harness();
    let fix = PositionFix {
        lat_deg: 0.0,
        lon_deg: 0.0,
        alt_m: 9_000.0,
        timestamp: t(17, 0, 0),
    };
    h.coordinator.ingest_position(fix).unwrap();
    let stale = PositionFix {
        timestamp: t(16, 59, 59),
        ..fix
    };
    assert!(matches!(
        h.coordinator.ingest_position(stale),
        Err(CoordinatorError::NonMonotonicTimestamp(_))
    ));
}

#[tokio::test]
async fn phase_and_eta_mode_switch() {
    let h = harness();
    let mut plan = plan_with_aar();
    plan.aar_windows.clear();
    plan.adjusted_departure_time = None;
    h.coordinator
        .activate_leg("leg-1", route_with_aar(), Arc::new(plan))
        .await
        .unwrap();

    assert_eq!(h.coordinator.phase(), FlightPhase::PreDeparture);

    // ~540 kn eastbound: 0.0025° of longitude per second at the equator.
    let start = t(16, 45, 0);
    for i in 0..10 {
        let now = start + Duration::seconds(i);
        h.source.push(PositionFix {
            lat_deg: 0.0,
            lon_deg: 0.0025 * i as f64,
            alt_m: 10_000.0,
            timestamp: now,
        });
        h.coordinator.tick(now);
    }
    assert_eq!(h.coordinator.phase(), FlightPhase::InFlight);
    assert_eq!(h.metrics.counter_count("flight_phase_changes_total"), 1);
    assert!(h.metrics.last_gauge("dish_speed_knots").unwrap() > 40.0);

    // Explicit reset returns to PRE_DEPARTURE (ANTICIPATED mode).
    let event = h
        .coordinator
        .flight_override(FlightStatusOverride::Reset, start + Duration::seconds(11))
        .unwrap();
    assert_eq!(event.to, FlightPhase::PreDeparture);
    assert_eq!(h.coordinator.phase(), FlightPhase::PreDeparture);
}

#[tokio::test]
async fn tick_publishes_mission_gauges() {
    let h = harness();
    let mut plan = plan_with_aar();
    plan.aar_windows.clear();
    plan.adjusted_departure_time = None;
    h.coordinator
        .activate_leg("leg-1", route_with_aar(), Arc::new(plan))
        .await
        .unwrap();

    let now = t(17, 0, 0);
    h.source.push(PositionFix {
        lat_deg: 0.0,
        lon_deg: 3.0,
        alt_m: 10_000.0,
        timestamp: now,
    });
    h.coordinator.tick(now);

    // Per-transport status: all AVAILABLE (encoded 0).
    assert_eq!(
        h.metrics.last_gauge_with_label("mission_status", "transport", "X"),
        Some(0.0)
    );
    assert_eq!(
        h.metrics.last_gauge_with_label("mission_status", "transport", "Ku"),
        Some(0.0)
    );
    // Totals: the whole hour is nominal (Ka has no satellites configured,
    // so it is offline with ka_no_coverage -> degraded overall).
    let degraded_total = h
        .metrics
        .last_gauge_with_label("mission_segment_totals_seconds", "status", "degraded")
        .unwrap();
    assert_eq!(degraded_total, 3600.0);
    assert!(h.metrics.last_gauge("dish_latitude_degrees").is_some());
    assert!(h.metrics.last_gauge("route_progress_percent").is_some());
}
