//! Published mission snapshots.
//!
//! A `LegSnapshot` is an immutable aggregate of route + plan + computed
//! timeline with monotonic version counters. The single writer replaces the
//! `Arc` behind a read/write lock; readers copy the pointer and never see a
//! torn state.

use std::sync::Arc;

use parking_lot::RwLock;

use mission_timeline::{Timeline, TransportPlan};
use route_model::Route;

#[derive(Debug, Clone)]
pub struct LegSnapshot {
    pub leg_id: String,
    pub route: Arc<Route>,
    pub plan: Arc<TransportPlan>,
    pub timeline: Option<Arc<Timeline>>,
    pub route_version: u64,
    pub config_version: u64,
    pub adjustment_version: u64,
    pub timeline_version: u64,
}

/// The coordinator's single mutable view, published atomically.
#[derive(Default)]
pub struct MissionState {
    snapshot: RwLock<Option<Arc<LegSnapshot>>>,
}

impl MissionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current snapshot pointer.
    pub fn snapshot(&self) -> Option<Arc<LegSnapshot>> {
        self.snapshot.read().clone()
    }

    pub fn publish(&self, snapshot: Arc<LegSnapshot>) {
        *self.snapshot.write() = Some(snapshot);
    }

    pub fn clear(&self) {
        *self.snapshot.write() = None;
    }

    /// Attach a freshly computed timeline if `leg_id` is still the active
    /// leg. Returns the published snapshot, or `None` when the leg changed
    /// while the recomputation ran.
    pub fn publish_timeline(
        &self,
        leg_id: &str,
        timeline: Arc<Timeline>,
    ) -> Option<Arc<LegSnapshot>> {
        let mut guard = self.snapshot.write();
        let current = guard.as_ref()?;
        if current.leg_id != leg_id {
            return None;
        }
        let updated = Arc::new(LegSnapshot {
            timeline: Some(timeline),
            timeline_version: current.timeline_version + 1,
            ..(**current).clone()
        });
        *guard = Some(updated.clone());
        Some(updated)
    }
}
