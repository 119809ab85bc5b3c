//! Timeline domain types.
//!
//! Transport state, timeline status, flight-facing severity, and advisory
//! events are closed enumerations; the merger dispatches on the product of
//! their values, never on strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One of the three independent communication channels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Transport {
    X,
    Ka,
    Ku,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::X => "X",
            Transport::Ka => "Ka",
            Transport::Ku => "Ku",
        }
    }
}

/// Availability of a single transport. Ordered by severity so composition
/// can take the max: `Offline > Degraded > Available`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransportState {
    Available,
    Degraded,
    Offline,
}

impl TransportState {
    /// Degraded and Offline both count against the combined status.
    pub fn is_bad(self) -> bool {
        self != TransportState::Available
    }

    /// Gauge encoding: 0=AVAILABLE, 1=DEGRADED, 2=OFFLINE.
    pub fn gauge_value(self) -> f64 {
        match self {
            TransportState::Available => 0.0,
            TransportState::Degraded => 1.0,
            TransportState::Offline => 2.0,
        }
    }
}

/// Combined severity of a timeline segment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimelineStatus {
    Nominal,
    Degraded,
    Critical,
}

impl TimelineStatus {
    /// `NOMINAL` if no transport is bad, `DEGRADED` for exactly one,
    /// `CRITICAL` for two or more.
    pub fn from_bad_count(k: usize) -> Self {
        match k {
            0 => TimelineStatus::Nominal,
            1 => TimelineStatus::Degraded,
            _ => TimelineStatus::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineStatus::Nominal => "nominal",
            TimelineStatus::Degraded => "degraded",
            TimelineStatus::Critical => "critical",
        }
    }
}

/// Well-known reason tags. Ku override reasons are caller-supplied strings
/// and are not enumerated here.
pub mod reason {
    pub const X_TRANSITION: &str = "x_transition";
    pub const AAR_REFUEL: &str = "aar_refuel";
    pub const AZIMUTH_CONFLICT: &str = "azimuth_conflict";
    pub const KA_NO_COVERAGE: &str = "ka_no_coverage";
    pub const KA_OUTAGE: &str = "ka_outage";
    pub const KA_HANDOFF: &str = "ka_handoff";
    pub const EVALUATOR_ERROR: &str = "evaluator_error";
}

/// Active satellites during a segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSatellites {
    /// Active X satellite.
    pub x: Option<String>,
    /// Ka covering set, configuration order.
    pub ka: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMetadata {
    pub satellites: SegmentSatellites,
}

/// A maximal half-open interval `[start, end)` with constant transport
/// states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineSegment {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub x_state: TransportState,
    pub ka_state: TransportState,
    pub ku_state: TransportState,
    pub status: TimelineStatus,
    pub impacted_transports: Vec<Transport>,
    /// Sorted, deduplicated root-cause tags.
    pub reasons: Vec<String>,
    pub metadata: SegmentMetadata,
    /// X non-available solely from an azimuth conflict while Ka and Ku are
    /// both available. Downgrades the advisory severity only; the segment
    /// status is unchanged.
    #[serde(skip)]
    pub advisory_downgrade: bool,
}

/// Advisory severity (distinct from segment status).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AdvisorySeverity {
    Info,
    Warning,
    Critical,
}

/// Advisory event types, in their canonical sort order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryEvent {
    XTransition,
    KaHandoff,
    KaOutageBegin,
    KaOutageEnd,
    KaCoverageGapBegin,
    KaCoverageGapEnd,
    AarBegin,
    AarEnd,
    KuOverrideBegin,
    KuOverrideEnd,
    AzimuthConflictBegin,
    AzimuthConflictEnd,
    SeverityChange,
}

/// A timeline event derived from transitions and severity changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineAdvisory {
    /// Deterministic sequence id (`adv-0001`, ...).
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: AdvisoryEvent,
    /// `None` for combined-status events (`severity_change`).
    pub transport: Option<Transport>,
    pub severity: AdvisorySeverity,
    pub message: String,
    pub metadata: BTreeMap<String, String>,
}

/// The computed mission timeline for one leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub leg_id: String,
    pub mission_start: DateTime<Utc>,
    pub mission_end: DateTime<Utc>,
    pub segments: Vec<TimelineSegment>,
    pub advisories: Vec<TimelineAdvisory>,
}

impl Timeline {
    /// Segment containing `t`, if any.
    pub fn segment_at(&self, t: DateTime<Utc>) -> Option<&TimelineSegment> {
        self.segments.iter().find(|s| s.start <= t && t < s.end)
    }

    /// Total seconds spent in each status across the mission.
    pub fn total_seconds_by_status(&self) -> BTreeMap<TimelineStatus, i64> {
        let mut totals = BTreeMap::new();
        for s in &self.segments {
            *totals.entry(s.status).or_insert(0) += (s.end - s.start).num_seconds();
        }
        totals
    }

    /// Seconds from `now` until the next segment at or above `min_status`.
    /// Returns 0 when `now` already lies in such a segment.
    pub fn seconds_to_next_conflict(
        &self,
        now: DateTime<Utc>,
        min_status: TimelineStatus,
    ) -> Option<i64> {
        for s in &self.segments {
            if s.status >= min_status && s.end > now {
                return Some((s.start - now).num_seconds().max(0));
            }
        }
        None
    }
}
