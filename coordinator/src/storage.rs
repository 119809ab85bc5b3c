//! In-memory storage with LRU eviction.
//!
//! Routes and timelines are referenced by id and evicted least-recently-used
//! (32 each by default). Leg configs are small and kept unbounded.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use mission_timeline::{Timeline, TransportPlan};
use route_model::Route;

use crate::interfaces::Storage;

pub struct InMemoryStorage {
    routes: Mutex<LruCache<String, Arc<Route>>>,
    timelines: Mutex<LruCache<String, Arc<Timeline>>>,
    leg_configs: Mutex<HashMap<String, Arc<TransportPlan>>>,
}

impl InMemoryStorage {
    pub fn new(route_cache_size: usize, timeline_cache_size: usize) -> Self {
        Self {
            routes: Mutex::new(LruCache::new(non_zero(route_cache_size))),
            timelines: Mutex::new(LruCache::new(non_zero(timeline_cache_size))),
            leg_configs: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new(32, 32)
    }
}

fn non_zero(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap_or(NonZeroUsize::MIN)
}

impl Storage for InMemoryStorage {
    fn load_route(&self, id: &str) -> Option<Arc<Route>> {
        self.routes.lock().get(id).cloned()
    }

    fn save_route(&self, route: Arc<Route>) {
        self.routes.lock().put(route.id.clone(), route);
    }

    fn delete_route(&self, id: &str) -> bool {
        self.routes.lock().pop(id).is_some()
    }

    fn load_leg_config(&self, leg_id: &str) -> Option<Arc<TransportPlan>> {
        self.leg_configs.lock().get(leg_id).cloned()
    }

    fn save_leg_config(&self, leg_id: &str, plan: Arc<TransportPlan>) {
        self.leg_configs.lock().insert(leg_id.to_string(), plan);
    }

    fn load_timeline(&self, leg_id: &str) -> Option<Arc<Timeline>> {
        self.timelines.lock().get(leg_id).cloned()
    }

    fn save_timeline(&self, leg_id: &str, timeline: Arc<Timeline>) {
        self.timelines.lock().put(leg_id.to_string(), timeline);
    }
}
