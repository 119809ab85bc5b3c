//! Planner tunables with their shipped defaults.

use serde::{Deserialize, Serialize};

use flight_engine::{EtaConfig, PhaseConfig};
use mission_timeline::BuilderConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerDefaults {
    pub tick_interval_ms: u64,
    pub x_handoff_pre_s: i64,
    pub x_handoff_post_s: i64,
    pub x_sampling_period_s: i64,
    pub ka_handoff_degradation_s: i64,
    pub departure_threshold_kn: f64,
    pub arrival_radius_m: f64,
    pub arrival_dwell_s: i64,
    pub eta_blending_alpha: f64,
    pub on_route_tolerance_m: f64,
    pub time_adjustment_warn_threshold_s: i64,
    pub route_cache_size: usize,
    pub timeline_cache_size: usize,
    pub eta_cache_size: usize,
    pub eta_cache_ttl_s: i64,
}

impl Default for PlannerDefaults {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            x_handoff_pre_s: 900,
            x_handoff_post_s: 900,
            x_sampling_period_s: 30,
            ka_handoff_degradation_s: 1,
            departure_threshold_kn: 40.0,
            arrival_radius_m: 100.0,
            arrival_dwell_s: 60,
            eta_blending_alpha: 0.5,
            on_route_tolerance_m: 5_000.0,
            time_adjustment_warn_threshold_s: 28_800,
            route_cache_size: 32,
            timeline_cache_size: 32,
            eta_cache_size: 100,
            eta_cache_ttl_s: 5,
        }
    }
}

impl PlannerDefaults {
    pub fn builder_config(&self) -> BuilderConfig {
        BuilderConfig {
            x_sampling_period_s: self.x_sampling_period_s,
            ka_handoff_degradation_s: self.ka_handoff_degradation_s,
        }
    }

    pub fn phase_config(&self) -> PhaseConfig {
        PhaseConfig {
            departure_threshold_kn: self.departure_threshold_kn,
            departure_dwell_s: 5,
            arrival_radius_m: self.arrival_radius_m,
            arrival_dwell_s: self.arrival_dwell_s,
        }
    }

    pub fn eta_config(&self) -> EtaConfig {
        EtaConfig {
            blending_alpha: self.eta_blending_alpha,
            on_route_tolerance_m: self.on_route_tolerance_m,
            speed_floor_mps: 1.0,
            cache_size: self.eta_cache_size,
            cache_bucket_s: self.eta_cache_ttl_s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_shipped_values() {
        let d = PlannerDefaults::default();
        assert_eq!(d.tick_interval_ms, 1000);
        assert_eq!(d.x_handoff_pre_s, 900);
        assert_eq!(d.x_sampling_period_s, 30);
        assert_eq!(d.time_adjustment_warn_threshold_s, 8 * 3600);
        assert_eq!(d.route_cache_size, 32);
    }

    #[test]
    fn test_defaults_deserialize_partial() {
        let d: PlannerDefaults = serde_json::from_str(r#"{"tick_interval_ms": 250}"#).unwrap();
        assert_eq!(d.tick_interval_ms, 250);
        assert_eq!(d.eta_cache_size, 100);
    }
}
