//! The coordinator: tick driver, snapshot writer, and mutation surface.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{info, warn};

use flight_engine::{
    EtaEngine, FlightPhase, PhaseEvent, PhaseMachine, Poi, SpeedSmoother,
};
use mission_timeline::{SatelliteEphemeris, Timeline, TimelineStatus, TransportPlan};
use route_model::{haversine_m, initial_bearing_deg, GeoPosition, Route, RouteProjector};

use crate::defaults::PlannerDefaults;
use crate::interfaces::{MetricsSink, PositionFix, PositionSource, Storage};
use crate::recompute::{compute_timeline, RecomputeQueue, RecomputeWorker};
use crate::requests::{FlightStatusOverride, MutationResponse, PreviewTimelineRequest};
use crate::snapshot::{LegSnapshot, MissionState};
use crate::{CoordinatorError, Result};

/// Live per-tick state. Guarded by one mutex, touched only by the driver
/// tick and the explicit flight-status overrides.
struct LiveState {
    last_fix: Option<PositionFix>,
    prev_fix: Option<PositionFix>,
    smoother: SpeedSmoother,
    phase: PhaseMachine,
    eta: EtaEngine,
    pois: Vec<Poi>,
    projector: Option<RouteProjector>,
    /// (route_version, adjustment_version) the projector was built against.
    projector_built_for: (u64, u64),
}

pub struct Coordinator {
    defaults: PlannerDefaults,
    state: Arc<MissionState>,
    queue: Arc<RecomputeQueue>,
    storage: Arc<dyn Storage>,
    metrics: Arc<dyn MetricsSink>,
    ephemeris: Arc<dyn SatelliteEphemeris>,
    position_source: Arc<dyn PositionSource>,
    live: Mutex<LiveState>,
}

impl Coordinator {
    pub fn new(
        defaults: PlannerDefaults,
        storage: Arc<dyn Storage>,
        metrics: Arc<dyn MetricsSink>,
        ephemeris: Arc<dyn SatelliteEphemeris>,
        position_source: Arc<dyn PositionSource>,
    ) -> Self {
        let live = LiveState {
            last_fix: None,
            prev_fix: None,
            smoother: SpeedSmoother::new(),
            phase: PhaseMachine::new(defaults.phase_config()),
            eta: EtaEngine::new(defaults.eta_config()),
            pois: Vec::new(),
            projector: None,
            projector_built_for: (0, 0),
        };
        Self {
            defaults,
            state: Arc::new(MissionState::new()),
            queue: RecomputeQueue::new(),
            storage,
            metrics,
            ephemeris,
            position_source,
            live: Mutex::new(live),
        }
    }

    pub fn mission_state(&self) -> Arc<MissionState> {
        self.state.clone()
    }

    /// Spawn the background recomputation worker.
    pub fn spawn_worker(&self) -> tokio::task::JoinHandle<()> {
        RecomputeWorker {
            queue: self.queue.clone(),
            state: self.state.clone(),
            storage: self.storage.clone(),
            ephemeris: self.ephemeris.clone(),
            config: self.defaults.builder_config(),
        }
        .spawn()
    }

    /// Drive ticks forever at the configured interval.
    pub async fn run(self: Arc<Self>) {
        let mut interval =
            tokio::time::interval(Duration::from_millis(self.defaults.tick_interval_ms.max(1)));
        loop {
            interval.tick().await;
            self.tick(Utc::now());
        }
    }

    // ------------------------------------------------------------------
    // Leg lifecycle
    // ------------------------------------------------------------------

    /// Activate a leg: validate, persist, publish, and kick off the first
    /// timeline computation (awaited so callers read their write).
    pub async fn activate_leg(
        &self,
        leg_id: &str,
        route: Arc<Route>,
        plan: Arc<TransportPlan>,
    ) -> Result<MutationResponse<Arc<LegSnapshot>>> {
        plan.validate(&route, self.ephemeris.as_ref())?;
        let warnings = self.adjustment_warnings(&route, &plan);

        self.storage.save_route(route.clone());
        self.storage.save_leg_config(leg_id, plan.clone());

        let snapshot = Arc::new(LegSnapshot {
            leg_id: leg_id.to_string(),
            route,
            plan,
            timeline: None,
            route_version: 1,
            config_version: 1,
            adjustment_version: 1,
            timeline_version: 0,
        });
        self.state.publish(snapshot.clone());

        {
            let mut live = self.live.lock();
            live.phase.reset(Utc::now());
            live.smoother.reset();
            live.eta.clear_cache();
            live.projector = None;
        }

        self.await_recompute(&snapshot, true).await?;
        Ok(MutationResponse {
            resource: self.state.snapshot().ok_or(CoordinatorError::NoActiveLeg)?,
            warnings,
        })
    }

    /// Preview a timeline. Never persists, never publishes.
    pub fn preview_timeline(
        &self,
        req: &PreviewTimelineRequest,
    ) -> Result<MutationResponse<Timeline>> {
        let snapshot = self.active_snapshot(&req.leg_id)?;

        let mut plan = req.transports.clone();
        if req.adjusted_departure_time.is_some() {
            plan.adjusted_departure_time = req.adjusted_departure_time;
        }
        plan.validate(&snapshot.route, self.ephemeris.as_ref())?;
        let warnings = self.adjustment_warnings(&snapshot.route, &plan);

        let cancel = std::sync::atomic::AtomicBool::new(false);
        let timeline = compute_timeline(
            &req.leg_id,
            snapshot.route.clone(),
            &plan,
            self.ephemeris.as_ref(),
            self.defaults.builder_config(),
            &cancel,
        )?;

        Ok(MutationResponse {
            resource: timeline,
            warnings,
        })
    }

    /// Update the leg's transport configuration: persists, publishes, and
    /// waits for the recomputed timeline (read-your-writes).
    pub async fn update_leg_config(
        &self,
        leg_id: &str,
        transports: TransportPlan,
        expected_config_version: Option<u64>,
    ) -> Result<MutationResponse<Arc<LegSnapshot>>> {
        let current = self.active_snapshot(leg_id)?;
        if let Some(expected) = expected_config_version {
            if expected != current.config_version {
                return Err(CoordinatorError::Conflict {
                    expected,
                    current: current.config_version,
                });
            }
        }

        transports.validate(&current.route, self.ephemeris.as_ref())?;
        let warnings = self.adjustment_warnings(&current.route, &transports);
        let plan = Arc::new(transports);

        self.storage.save_leg_config(leg_id, plan.clone());

        let adjustment_changed =
            plan.adjusted_departure_time != current.plan.adjusted_departure_time;
        let snapshot = Arc::new(LegSnapshot {
            leg_id: leg_id.to_string(),
            route: current.route.clone(),
            plan,
            timeline: None,
            route_version: current.route_version,
            config_version: current.config_version + 1,
            adjustment_version: current.adjustment_version + u64::from(adjustment_changed),
            timeline_version: current.timeline_version,
        });
        self.state.publish(snapshot.clone());
        if adjustment_changed {
            self.live.lock().eta.clear_cache();
        }

        self.await_recompute(&snapshot, true).await?;
        Ok(MutationResponse {
            resource: self.state.snapshot().ok_or(CoordinatorError::NoActiveLeg)?,
            warnings,
        })
    }

    /// Replace the leg's route: clears the departure adjustment, drops AAR
    /// windows whose waypoints vanished (reported as warnings), republishes,
    /// and recomputes.
    pub async fn replace_route(
        &self,
        leg_id: &str,
        route: Arc<Route>,
    ) -> Result<MutationResponse<Arc<LegSnapshot>>> {
        let current = self.active_snapshot(leg_id)?;

        let mut plan = (*current.plan).clone();
        plan.adjusted_departure_time = None;
        let mut warnings = plan.sanitize_aar_windows(&route);
        for w in &warnings {
            warn!(leg = leg_id, "{}", w);
        }
        plan.validate(&route, self.ephemeris.as_ref())?;
        warnings.extend(self.adjustment_warnings(&route, &plan));
        let plan = Arc::new(plan);

        self.storage.save_route(route.clone());
        self.storage.save_leg_config(leg_id, plan.clone());

        let snapshot = Arc::new(LegSnapshot {
            leg_id: leg_id.to_string(),
            route,
            plan,
            timeline: None,
            route_version: current.route_version + 1,
            config_version: current.config_version + 1,
            adjustment_version: current.adjustment_version + 1,
            timeline_version: current.timeline_version,
        });
        self.state.publish(snapshot.clone());
        {
            let mut live = self.live.lock();
            live.eta.clear_cache();
            live.projector = None;
        }

        self.await_recompute(&snapshot, true).await?;
        Ok(MutationResponse {
            resource: self.state.snapshot().ok_or(CoordinatorError::NoActiveLeg)?,
            warnings,
        })
    }

    /// Explicit depart/arrive/reset.
    pub fn flight_override(&self, cmd: FlightStatusOverride, now: DateTime<Utc>) -> Option<PhaseEvent> {
        let mut live = self.live.lock();
        let event = match cmd {
            FlightStatusOverride::Depart => live.phase.depart(now),
            FlightStatusOverride::Arrive => live.phase.arrive(now),
            FlightStatusOverride::Reset => live.phase.reset(now),
        };
        if event.is_some() {
            live.eta.clear_cache();
        }
        event
    }

    pub fn phase(&self) -> FlightPhase {
        self.live.lock().phase.phase()
    }

    pub fn set_pois(&self, pois: Vec<Poi>) {
        self.live.lock().pois = pois;
    }

    /// Push-model ingestion; the tick also pulls from the position source.
    /// Non-monotonic timestamps are rejected.
    pub fn ingest_position(&self, fix: PositionFix) -> Result<()> {
        let mut live = self.live.lock();
        if let Some(last) = live.last_fix {
            if fix.timestamp <= last.timestamp {
                return Err(CoordinatorError::NonMonotonicTimestamp(fix.timestamp));
            }
        }
        live.prev_fix = live.last_fix;
        live.last_fix = Some(fix);
        live.smoother
            .add_position(fix.timestamp, fix.lat_deg, fix.lon_deg);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// One driver tick: ingest, advance the phase machine, publish gauges,
    /// and trigger recomputation when the snapshot lost its timeline.
    pub fn tick(&self, now: DateTime<Utc>) {
        if let Some(fix) = self.position_source.next_position() {
            if let Err(e) = self.ingest_position(fix) {
                warn!(error = %e, "position sample rejected");
            }
        }

        let snapshot = self.state.snapshot();
        let mut live = self.live.lock();

        if let Some(snapshot) = &snapshot {
            self.refresh_projector(&mut live, snapshot);
        }

        // Phase machine.
        let speed_kn = live.smoother.smoothed_kn().unwrap_or(0.0);
        let distance_to_arrival = match (&live.last_fix, &snapshot) {
            (Some(fix), Some(snapshot)) => snapshot.route.points.last().map(|p| {
                haversine_m(fix.lat_deg, fix.lon_deg, p.lat_deg, p.lon_deg)
            }),
            _ => None,
        };
        if let Some(event) = live.phase.update(now, speed_kn, distance_to_arrival) {
            info!(from = ?event.from, to = ?event.to, "phase transition");
            live.eta.clear_cache();
            self.metrics.inc_counter("flight_phase_changes_total", &[]);
        }

        self.publish_gauges(&mut live, snapshot.as_deref(), now);
        drop(live);

        // Mutations publish with `timeline: None`; the worker fills it in.
        if let Some(snapshot) = snapshot {
            if snapshot.timeline.is_none() {
                let _ = self.queue.submit(
                    &snapshot.leg_id,
                    snapshot.route.clone(),
                    snapshot.plan.clone(),
                    false,
                );
            }
        }
        self.metrics.inc_counter("coordinator_ticks_total", &[]);
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn active_snapshot(&self, leg_id: &str) -> Result<Arc<LegSnapshot>> {
        let snapshot = self.state.snapshot().ok_or(CoordinatorError::NoActiveLeg)?;
        if snapshot.leg_id != leg_id {
            return Err(CoordinatorError::NotFound(format!("leg {}", leg_id)));
        }
        Ok(snapshot)
    }

    async fn await_recompute(&self, snapshot: &LegSnapshot, persist: bool) -> Result<()> {
        let rx = self.queue.submit(
            &snapshot.leg_id,
            snapshot.route.clone(),
            snapshot.plan.clone(),
            persist,
        );
        match rx.await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(CoordinatorError::ComputationFailed(e)),
            Err(_) => Err(CoordinatorError::ComputationFailed(
                "recompute worker dropped the job".to_string(),
            )),
        }
    }

    fn adjustment_warnings(&self, route: &Route, plan: &TransportPlan) -> Vec<String> {
        let delta_s = plan.adjustment_s(route);
        if delta_s.abs() > self.defaults.time_adjustment_warn_threshold_s {
            vec![format!(
                "time adjustment of {} s exceeds the {} s warning threshold",
                delta_s, self.defaults.time_adjustment_warn_threshold_s
            )]
        } else {
            Vec::new()
        }
    }

    fn refresh_projector(&self, live: &mut LiveState, snapshot: &LegSnapshot) {
        let wanted = (snapshot.route_version, snapshot.adjustment_version);
        if live.projector.is_some() && live.projector_built_for == wanted {
            return;
        }
        match RouteProjector::new(snapshot.route.clone()) {
            Ok(mut projector) => {
                projector.set_time_adjustment_s(snapshot.plan.adjustment_s(&snapshot.route));
                live.projector = Some(projector);
                live.projector_built_for = wanted;
                live.eta.clear_cache();
            }
            Err(e) => {
                warn!(error = %e, "projector rebuild failed");
                live.projector = None;
            }
        }
    }

    fn publish_gauges(&self, live: &mut LiveState, snapshot: Option<&LegSnapshot>, now: DateTime<Utc>) {
        let speed_kn = live.smoother.smoothed_kn().unwrap_or(0.0);

        if let Some(fix) = live.last_fix {
            self.metrics.set_gauge("dish_latitude_degrees", fix.lat_deg, &[]);
            self.metrics.set_gauge("dish_longitude_degrees", fix.lon_deg, &[]);
            self.metrics.set_gauge("dish_altitude_meters", fix.alt_m, &[]);
            self.metrics.set_gauge("dish_speed_knots", speed_kn, &[]);

            let heading = live.prev_fix.map(|prev| {
                initial_bearing_deg(prev.lat_deg, prev.lon_deg, fix.lat_deg, fix.lon_deg)
            });
            if let Some(heading) = heading {
                self.metrics.set_gauge("dish_heading_degrees", heading, &[]);
            }

            if let Some(projector) = &live.projector {
                if let Ok(projection) = projector.project_point(fix.lat_deg, fix.lon_deg) {
                    self.metrics.set_gauge(
                        "route_progress_percent",
                        projection.progress * 100.0,
                        &[],
                    );
                }
            }

            if let Some(snapshot) = snapshot {
                for wp in &snapshot.route.waypoints {
                    let p = &snapshot.route.points[wp.point_index];
                    let d = haversine_m(fix.lat_deg, fix.lon_deg, p.lat_deg, p.lon_deg);
                    let idx = wp.point_index.to_string();
                    self.metrics.set_gauge(
                        "distance_to_waypoint_meters",
                        d,
                        &[("waypoint_index", idx.as_str())],
                    );
                }
            }

            self.publish_poi_gauges(live, snapshot, now, fix, speed_kn);
        }

        if let Some(timeline) = snapshot.and_then(|s| s.timeline.as_ref()) {
            self.publish_timeline_gauges(timeline, now);
        }
        self.metrics
            .set_gauge("flight_phase", live.phase.phase().gauge_value(), &[]);
    }

    fn publish_poi_gauges(
        &self,
        live: &mut LiveState,
        snapshot: Option<&LegSnapshot>,
        now: DateTime<Utc>,
        fix: PositionFix,
        speed_kn: f64,
    ) {
        let Some(snapshot) = snapshot else { return };
        let Some(projector) = live.projector.take() else { return };

        let current = GeoPosition::new(fix.lat_deg, fix.lon_deg, fix.alt_m);
        let heading = live
            .prev_fix
            .map(|prev| initial_bearing_deg(prev.lat_deg, prev.lon_deg, fix.lat_deg, fix.lon_deg))
            .unwrap_or(0.0);
        let phase = live.phase.phase();
        let pois = live.pois.clone();

        for poi in &pois {
            match live.eta.poi_eta(
                &projector,
                poi,
                now,
                phase,
                speed_kn,
                &current,
                heading,
                snapshot.route_version,
                snapshot.adjustment_version,
            ) {
                Ok(result) => {
                    self.metrics.set_gauge(
                        "eta_poi_seconds",
                        result.eta_seconds,
                        &[("poi_id", poi.id.as_str())],
                    );
                    self.metrics.set_gauge(
                        "distance_to_poi_meters",
                        result.distance_m,
                        &[("poi_id", poi.id.as_str())],
                    );
                }
                Err(e) => warn!(poi = %poi.id, error = %e, "POI ETA failed"),
            }
        }

        live.projector = Some(projector);
    }

    fn publish_timeline_gauges(&self, timeline: &Timeline, now: DateTime<Utc>) {
        if let Some(segment) = timeline.segment_at(now) {
            for (transport, state) in [
                ("X", segment.x_state),
                ("Ka", segment.ka_state),
                ("Ku", segment.ku_state),
            ] {
                self.metrics.set_gauge(
                    "mission_status",
                    state.gauge_value(),
                    &[("transport", transport)],
                );
            }
        }

        for (status, label) in [
            (TimelineStatus::Degraded, "degraded"),
            (TimelineStatus::Critical, "critical"),
        ] {
            if let Some(seconds) = timeline.seconds_to_next_conflict(now, status) {
                self.metrics.set_gauge(
                    "mission_next_conflict_seconds",
                    seconds as f64,
                    &[("status", label)],
                );
            }
        }

        let totals = timeline.total_seconds_by_status();
        for (status, label) in [
            (TimelineStatus::Nominal, "nominal"),
            (TimelineStatus::Degraded, "degraded"),
            (TimelineStatus::Critical, "critical"),
        ] {
            let seconds = totals.get(&status).copied().unwrap_or(0);
            self.metrics.set_gauge(
                "mission_segment_totals_seconds",
                seconds as f64,
                &[("status", label)],
            );
        }
    }
}
