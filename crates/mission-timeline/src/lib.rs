//! Mission Timeline Core
//!
//! Builds the deterministic mission timeline for one leg:
//! - Per-transport availability series from heterogeneous inputs (X manual
//!   handoffs with buffers and azimuth dead zones, Ka footprint gaps and
//!   outages, Ku overrides, AAR windows)
//! - Merged combined segments with the NOMINAL/DEGRADED/CRITICAL severity
//!   calculus and root-cause reasons
//! - Timeline advisories at every transition and severity boundary
//!
//! All interval endpoints are snapped to whole Unix seconds before
//! composition, so identical inputs produce byte-identical output.

use thiserror::Error;

pub mod advisories;
pub mod builder;
pub mod ephemeris;
pub mod ka_builder;
pub mod ku_builder;
pub mod merger;
pub mod plan;
pub mod series;
pub mod types;
pub mod x_builder;

pub use advisories::generate_advisories;
pub use builder::{BuilderConfig, TimelineBuilder};
pub use ephemeris::{GeostationaryEphemeris, SatelliteEphemeris};
pub use ka_builder::{KaBuildOutput, KaStateBuilder};
pub use ku_builder::{KuBuildOutput, KuStateBuilder};
pub use merger::merge_series;
pub use plan::{
    AarWindow, AzimuthArc, AzimuthDeadzone, KaFootprint, KaOutage, KuOverride, TransportPlan,
    XTransition,
};
pub use series::{TransportInterval, TransportSeries};
pub use types::{
    reason, AdvisoryEvent, AdvisorySeverity, SegmentMetadata, SegmentSatellites, Timeline,
    TimelineAdvisory, TimelineSegment, TimelineStatus, Transport, TransportState,
};
pub use x_builder::{ResolvedTransition, XBuildOutput, XStateBuilder};

use footprint_coverage::CoverageError;
use route_model::RouteError;

#[derive(Error, Debug)]
pub enum TimelineError {
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error(transparent)]
    Coverage(#[from] CoverageError),
    #[error("unknown satellite id: {0}")]
    UnknownSatellite(String),
    #[error("AAR window references unknown waypoint '{0}'")]
    UnknownAarWaypoint(String),
    #[error("timeline computation cancelled")]
    Cancelled,
    #[error("timeline computation failed: {0}")]
    ComputationFailed(String),
}

pub type Result<T> = std::result::Result<T, TimelineError>;
