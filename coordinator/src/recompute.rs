//! Timeline recomputation worker.
//!
//! Jobs arrive through a latest-wins queue: a newer request for the same leg
//! collapses any queued older request and flags the in-flight one for
//! cooperative cancellation. Waiters of a superseded job are absorbed by the
//! replacing job so read-your-writes holds for every caller. A failed
//! recomputation retains the previous good snapshot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};
use tracing::{error, info};

use footprint_coverage::CoverageEvaluator;
use mission_timeline::{
    BuilderConfig, SatelliteEphemeris, Timeline, TimelineBuilder, TimelineError, TransportPlan,
};
use route_model::Route;

use crate::interfaces::Storage;
use crate::snapshot::MissionState;

pub type RecomputeResult = std::result::Result<Arc<Timeline>, String>;

pub struct RecomputeJob {
    pub id: uuid::Uuid,
    pub leg_id: String,
    pub route: Arc<Route>,
    pub plan: Arc<TransportPlan>,
    /// Persist the computed timeline (config updates do; previews go
    /// through the builder directly and never enqueue).
    pub persist: bool,
    waiters: Vec<oneshot::Sender<RecomputeResult>>,
}

/// Latest-wins job queue, one slot per leg.
#[derive(Default)]
pub struct RecomputeQueue {
    pending: Mutex<HashMap<String, RecomputeJob>>,
    running: Mutex<HashMap<String, Arc<AtomicBool>>>,
    notify: Notify,
}

impl RecomputeQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Enqueue a job; returns a receiver resolved when *a* recomputation
    /// covering this request completes (the newest one wins).
    pub fn submit(
        &self,
        leg_id: &str,
        route: Arc<Route>,
        plan: Arc<TransportPlan>,
        persist: bool,
    ) -> oneshot::Receiver<RecomputeResult> {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock();
        let job = pending.entry(leg_id.to_string()).or_insert_with(|| RecomputeJob {
            id: uuid::Uuid::new_v4(),
            leg_id: leg_id.to_string(),
            route: route.clone(),
            plan: plan.clone(),
            persist,
            waiters: Vec::new(),
        });
        // Latest wins: newer inputs replace the queued ones, waiters accrue.
        job.route = route;
        job.plan = plan;
        job.persist = job.persist || persist;
        job.waiters.push(tx);
        drop(pending);

        // Flag any in-flight computation for this leg.
        if let Some(cancel) = self.running.lock().get(leg_id) {
            cancel.store(true, Ordering::Relaxed);
        }

        self.notify.notify_one();
        rx
    }

    fn take_next(&self) -> Option<RecomputeJob> {
        let mut pending = self.pending.lock();
        let key = pending.keys().next().cloned()?;
        pending.remove(&key)
    }

    /// Hand a cancelled job's waiters (and its persist intent) to the job
    /// that replaced it.
    fn requeue_waiters(
        &self,
        leg_id: &str,
        waiters: Vec<oneshot::Sender<RecomputeResult>>,
        persist: bool,
    ) {
        let mut pending = self.pending.lock();
        match pending.get_mut(leg_id) {
            Some(job) => {
                job.waiters.extend(waiters);
                job.persist = job.persist || persist;
            }
            None => {
                for tx in waiters {
                    let _ = tx.send(Err("recomputation superseded and dropped".to_string()));
                }
            }
        }
    }
}

/// Background worker draining the queue.
pub struct RecomputeWorker {
    pub queue: Arc<RecomputeQueue>,
    pub state: Arc<MissionState>,
    pub storage: Arc<dyn Storage>,
    pub ephemeris: Arc<dyn SatelliteEphemeris>,
    pub config: BuilderConfig,
}

impl RecomputeWorker {
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        loop {
            let job = match self.queue.take_next() {
                Some(job) => job,
                None => {
                    self.queue.notify.notified().await;
                    continue;
                }
            };
            self.execute(job).await;
        }
    }

    async fn execute(&self, job: RecomputeJob) {
        let cancel = Arc::new(AtomicBool::new(false));
        self.queue
            .running
            .lock()
            .insert(job.leg_id.clone(), cancel.clone());

        let leg_id = job.leg_id.clone();
        let route = job.route.clone();
        let plan = job.plan.clone();
        let ephemeris = self.ephemeris.clone();
        let config = self.config;
        let cancel_flag = cancel.clone();

        let result = tokio::task::spawn_blocking(move || {
            compute_timeline(&leg_id, route, &plan, ephemeris.as_ref(), config, &cancel_flag)
        })
        .await;

        self.queue.running.lock().remove(&job.leg_id);

        match result {
            Ok(Ok(timeline)) => {
                let timeline = Arc::new(timeline);
                self.state.publish_timeline(&job.leg_id, timeline.clone());
                if job.persist {
                    self.storage.save_timeline(&job.leg_id, timeline.clone());
                }
                info!(
                    job = %job.id,
                    leg = %job.leg_id,
                    segments = timeline.segments.len(),
                    "timeline recomputed"
                );
                for tx in job.waiters {
                    let _ = tx.send(Ok(timeline.clone()));
                }
            }
            Ok(Err(TimelineError::Cancelled)) => {
                // Superseded: hand the waiters to the job that replaced us.
                info!(leg = %job.leg_id, "recomputation cancelled by newer request");
                self.queue
                    .requeue_waiters(&job.leg_id, job.waiters, job.persist);
            }
            Ok(Err(e)) => {
                // Previous good snapshot is retained.
                error!(leg = %job.leg_id, error = %e, "recomputation failed");
                for tx in job.waiters {
                    let _ = tx.send(Err(e.to_string()));
                }
            }
            Err(join_err) => {
                error!(leg = %job.leg_id, error = %join_err, "recomputation task panicked");
                for tx in job.waiters {
                    let _ = tx.send(Err(join_err.to_string()));
                }
            }
        }
    }
}

/// Build the coverage evaluator from the plan's footprints and run the
/// timeline builder. Shared by the worker and the preview path.
pub fn compute_timeline(
    leg_id: &str,
    route: Arc<Route>,
    plan: &TransportPlan,
    ephemeris: &dyn SatelliteEphemeris,
    config: BuilderConfig,
    cancel: &AtomicBool,
) -> std::result::Result<Timeline, TimelineError> {
    let footprints = plan
        .ka_footprints
        .iter()
        .map(|f| (f.sat_id.clone(), f.spec.clone()))
        .collect();
    let evaluator = CoverageEvaluator::new(footprints)?;
    TimelineBuilder::new(route, &evaluator, ephemeris, plan, config).build(leg_id, cancel)
}
