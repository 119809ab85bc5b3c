//! Mission Coordinator
//!
//! Owns the single mutable view of the active mission leg: route, transport
//! plan, live position/speed/phase, and the last computed timeline. Drives a
//! periodic tick that ingests position, advances the flight phase machine,
//! fans out gauges to the metrics sink, and hands timeline recomputation to
//! a background worker with latest-wins job semantics. Consumers only ever
//! see immutable snapshots swapped atomically behind a read lock.

use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod coordinator;
pub mod defaults;
pub mod interfaces;
pub mod recompute;
pub mod requests;
pub mod sim;
pub mod snapshot;
pub mod storage;
pub mod telemetry;

pub use coordinator::Coordinator;
pub use defaults::PlannerDefaults;
pub use interfaces::{MetricsSink, PositionFix, PositionSource, Storage};
pub use recompute::{RecomputeQueue, RecomputeWorker};
pub use requests::{FlightStatusOverride, MutationResponse, PreviewTimelineRequest};
pub use sim::SimulatedPositionSource;
pub use snapshot::{LegSnapshot, MissionState};
pub use storage::InMemoryStorage;
pub use telemetry::{NatsMetricsSink, RecordingSink, TracingMetricsSink};

use mission_timeline::TimelineError;
use route_model::RouteError;

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("no active mission leg")]
    NoActiveLeg,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("version conflict: expected {expected}, current {current}")]
    Conflict { expected: u64, current: u64 },
    #[error("non-monotonic position timestamp {0}")]
    NonMonotonicTimestamp(DateTime<Utc>),
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error(transparent)]
    Timeline(#[from] TimelineError),
    #[error(transparent)]
    Coverage(#[from] footprint_coverage::CoverageError),
    #[error("recomputation failed: {0}")]
    ComputationFailed(String),
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;
