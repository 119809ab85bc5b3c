//! Coordinator service entry point.
//!
//! Wires a demo mission leg to the simulated position source, spawns the
//! recomputation worker and the NATS telemetry publisher, and drives the
//! 1 Hz tick loop.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aircomm_coordinator::{
    Coordinator, InMemoryStorage, NatsMetricsSink, PlannerDefaults, SimulatedPositionSource,
};
use flight_engine::Poi;
use mission_timeline::ephemeris::{GeoSatellite, GeostationaryEphemeris};
use mission_timeline::{TransportPlan, XTransition};
use route_model::{Route, RoutePoint, Waypoint, WaypointRole};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "aircomm_coordinator=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let defaults = PlannerDefaults::default();

    // ---- Demo leg: one-hour equatorial hop with a midpoint X handoff ----
    let departure = Utc::now() + Duration::minutes(5);
    let route = Arc::new(demo_route(departure)?);
    let plan = Arc::new(demo_plan());
    tracing::info!(
        "demo leg: {} points, departs {}",
        route.points.len(),
        departure
    );

    let ephemeris = Arc::new(GeostationaryEphemeris::new(vec![
        GeoSatellite {
            id: "x-east".into(),
            longitude_deg: 48.0,
        },
        GeoSatellite {
            id: "x-west".into(),
            longitude_deg: -42.0,
        },
    ]));

    let storage = Arc::new(InMemoryStorage::new(
        defaults.route_cache_size,
        defaults.timeline_cache_size,
    ));

    let (metrics, publisher) = NatsMetricsSink::connect().await;
    tokio::spawn(publisher.run());

    let simulator = Arc::new(SimulatedPositionSource::new(route.clone(), 1.0)?);

    let coordinator = Arc::new(Coordinator::new(
        defaults,
        storage,
        Arc::new(metrics),
        ephemeris,
        simulator,
    ));
    coordinator.spawn_worker();

    coordinator.set_pois(vec![Poi {
        id: "poi-gib".into(),
        name: "GIBRALTAR".into(),
        lat_deg: 36.14,
        lon_deg: -5.35,
        category: Some("landmark".into()),
        icon: None,
    }]);

    let activation = coordinator
        .activate_leg("leg-demo", route, plan)
        .await
        .map_err(|e| anyhow::anyhow!("leg activation failed: {}", e))?;
    for w in &activation.warnings {
        tracing::warn!("activation warning: {}", w);
    }
    if let Some(timeline) = &activation.resource.timeline {
        tracing::info!(
            "initial timeline: {} segments, {} advisories",
            timeline.segments.len(),
            timeline.advisories.len()
        );
    }

    coordinator.run().await;
    Ok(())
}

fn demo_route(departure: chrono::DateTime<Utc>) -> Result<Route> {
    let arrival = departure + Duration::hours(1);
    let route = Route::new(
        "route-demo",
        vec![
            RoutePoint {
                lat_deg: 10.0,
                lon_deg: 0.0,
                alt_m: 10_500.0,
                seq: 0,
                expected_arrival: Some(departure),
                expected_segment_speed_knots: None,
            },
            RoutePoint {
                lat_deg: 10.0,
                lon_deg: 5.0,
                alt_m: 11_000.0,
                seq: 1,
                expected_arrival: None,
                expected_segment_speed_knots: None,
            },
            RoutePoint {
                lat_deg: 10.0,
                lon_deg: 10.0,
                alt_m: 10_500.0,
                seq: 2,
                expected_arrival: Some(arrival),
                expected_segment_speed_knots: None,
            },
        ],
        vec![
            Waypoint {
                name: "DEP".into(),
                role: WaypointRole::Departure,
                point_index: 0,
                expected_arrival: Some(departure),
            },
            Waypoint {
                name: "ARR".into(),
                role: WaypointRole::Arrival,
                point_index: 2,
                expected_arrival: Some(arrival),
            },
        ],
    )?;
    Ok(route)
}

fn demo_plan() -> TransportPlan {
    TransportPlan {
        initial_x_satellite_id: "x-east".into(),
        x_transitions: vec![XTransition {
            lat_deg: 10.0,
            lon_deg: 5.0,
            target_satellite_id: "x-west".into(),
            pre_buffer_s: 900,
            post_buffer_s: 900,
        }],
        x_azimuth_deadzone: Default::default(),
        ka_initial_satellite_ids: vec![],
        ka_outages: vec![],
        ka_footprints: vec![],
        ku_overrides: vec![],
        aar_windows: vec![],
        adjusted_departure_time: None,
    }
}
