//! In-process collaborator interfaces: position source, storage, metrics.
//!
//! Implementations live outside the core (live terminal feed, disk-backed
//! store, scraping exporter); the coordinator only depends on these traits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use mission_timeline::{Timeline, TransportPlan};
use route_model::Route;

/// One platform position sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub alt_m: f64,
    pub timestamp: DateTime<Utc>,
}

/// Pull-model position feed. The coordinator polls once per tick;
/// non-monotonic timestamps are rejected at ingestion.
pub trait PositionSource: Send + Sync {
    fn next_position(&self) -> Option<PositionFix>;
}

/// Mission persistence. Timelines are persisted only on explicit save;
/// previews never reach storage.
pub trait Storage: Send + Sync {
    fn load_route(&self, id: &str) -> Option<Arc<Route>>;
    fn save_route(&self, route: Arc<Route>);
    fn delete_route(&self, id: &str) -> bool;

    fn load_leg_config(&self, leg_id: &str) -> Option<Arc<TransportPlan>>;
    fn save_leg_config(&self, leg_id: &str, plan: Arc<TransportPlan>);

    fn load_timeline(&self, leg_id: &str) -> Option<Arc<Timeline>>;
    fn save_timeline(&self, leg_id: &str, timeline: Arc<Timeline>);
}

/// Gauge/counter fan-out. Implementations must be cheap and non-blocking;
/// the coordinator calls these on the tick path.
pub trait MetricsSink: Send + Sync {
    fn set_gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]);
    fn inc_counter(&self, name: &str, labels: &[(&str, &str)]);
}
