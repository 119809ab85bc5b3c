//! Flight phase state machine.
//!
//! PRE_DEPARTURE → IN_FLIGHT on sustained ground speed (or explicit
//! `depart`), IN_FLIGHT → POST_ARRIVAL on dwell inside the arrival radius
//! (or explicit `arrive`), POST_ARRIVAL → PRE_DEPARTURE only on `reset` or
//! route deactivation. ETA mode is derived: ANTICIPATED iff PRE_DEPARTURE.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightPhase {
    PreDeparture,
    InFlight,
    PostArrival,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EtaMode {
    Anticipated,
    Estimated,
}

impl FlightPhase {
    pub fn eta_mode(self) -> EtaMode {
        match self {
            FlightPhase::PreDeparture => EtaMode::Anticipated,
            _ => EtaMode::Estimated,
        }
    }

    /// Gauge encoding: 0=PRE_DEPARTURE, 1=IN_FLIGHT, 2=POST_ARRIVAL.
    pub fn gauge_value(self) -> f64 {
        match self {
            FlightPhase::PreDeparture => 0.0,
            FlightPhase::InFlight => 1.0,
            FlightPhase::PostArrival => 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PhaseConfig {
    pub departure_threshold_kn: f64,
    pub departure_dwell_s: i64,
    pub arrival_radius_m: f64,
    pub arrival_dwell_s: i64,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            departure_threshold_kn: 40.0,
            departure_dwell_s: 5,
            arrival_radius_m: 100.0,
            arrival_dwell_s: 60,
        }
    }
}

/// Emitted on every phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseEvent {
    pub at: DateTime<Utc>,
    pub from: FlightPhase,
    pub to: FlightPhase,
}

#[derive(Debug, Clone)]
pub struct PhaseMachine {
    phase: FlightPhase,
    config: PhaseConfig,
    speed_above_since: Option<DateTime<Utc>>,
    within_radius_since: Option<DateTime<Utc>>,
    actual_departure: Option<DateTime<Utc>>,
    actual_arrival: Option<DateTime<Utc>>,
}

impl PhaseMachine {
    pub fn new(config: PhaseConfig) -> Self {
        Self {
            phase: FlightPhase::PreDeparture,
            config,
            speed_above_since: None,
            within_radius_since: None,
            actual_departure: None,
            actual_arrival: None,
        }
    }

    pub fn phase(&self) -> FlightPhase {
        self.phase
    }

    pub fn eta_mode(&self) -> EtaMode {
        self.phase.eta_mode()
    }

    pub fn actual_departure(&self) -> Option<DateTime<Utc>> {
        self.actual_departure
    }

    pub fn actual_arrival(&self) -> Option<DateTime<Utc>> {
        self.actual_arrival
    }

    /// Feed a tick: smoothed speed plus the distance to the final waypoint
    /// when known. Returns the transition, if one fired.
    pub fn update(
        &mut self,
        now: DateTime<Utc>,
        smoothed_speed_kn: f64,
        distance_to_arrival_m: Option<f64>,
    ) -> Option<PhaseEvent> {
        match self.phase {
            FlightPhase::PreDeparture => {
                if smoothed_speed_kn > self.config.departure_threshold_kn {
                    let since = *self.speed_above_since.get_or_insert(now);
                    if (now - since).num_seconds() >= self.config.departure_dwell_s {
                        return Some(self.transition(now, FlightPhase::InFlight, true));
                    }
                } else {
                    self.speed_above_since = None;
                }
                None
            }
            FlightPhase::InFlight => {
                match distance_to_arrival_m {
                    Some(d) if d <= self.config.arrival_radius_m => {
                        let since = *self.within_radius_since.get_or_insert(now);
                        if (now - since).num_seconds() >= self.config.arrival_dwell_s {
                            return Some(self.transition(now, FlightPhase::PostArrival, true));
                        }
                    }
                    _ => self.within_radius_since = None,
                }
                None
            }
            FlightPhase::PostArrival => None,
        }
    }

    /// Explicit departure override. Stamps `actual_departure`.
    pub fn depart(&mut self, now: DateTime<Utc>) -> Option<PhaseEvent> {
        (self.phase == FlightPhase::PreDeparture)
            .then(|| self.transition(now, FlightPhase::InFlight, true))
    }

    /// Explicit arrival override. Stamps `actual_arrival`.
    pub fn arrive(&mut self, now: DateTime<Utc>) -> Option<PhaseEvent> {
        (self.phase == FlightPhase::InFlight)
            .then(|| self.transition(now, FlightPhase::PostArrival, true))
    }

    /// Back to PRE_DEPARTURE; clears both stamps.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Option<PhaseEvent> {
        self.actual_departure = None;
        self.actual_arrival = None;
        self.speed_above_since = None;
        self.within_radius_since = None;
        (self.phase != FlightPhase::PreDeparture)
            .then(|| self.transition(now, FlightPhase::PreDeparture, false))
    }

    fn transition(&mut self, now: DateTime<Utc>, to: FlightPhase, stamp: bool) -> PhaseEvent {
        let from = self.phase;
        self.phase = to;
        self.speed_above_since = None;
        self.within_radius_since = None;
        if stamp {
            match to {
                FlightPhase::InFlight => self.actual_departure = Some(now),
                FlightPhase::PostArrival => self.actual_arrival = Some(now),
                FlightPhase::PreDeparture => {}
            }
        }
        info!(?from, ?to, at = %now, "flight phase changed");
        PhaseEvent { at: now, from, to }
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new(PhaseConfig::default())
    }
}
