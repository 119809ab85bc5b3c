//! Advisory generation.
//!
//! Advisories are derived from the resolved builder outputs and the merged
//! segment series: one event per transition instant, per interval begin/end,
//! and per combined-status boundary. Output is sorted by
//! `(timestamp, event_type, transport)` and ids are deterministic sequence
//! strings, so identical inputs produce identical advisories.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::ka_builder::KaBuildOutput;
use crate::ku_builder::KuBuildOutput;
use crate::types::{
    AdvisoryEvent, AdvisorySeverity, TimelineAdvisory, TimelineSegment, TimelineStatus, Transport,
};
use crate::x_builder::XBuildOutput;

pub fn generate_advisories(
    segments: &[TimelineSegment],
    x: &XBuildOutput,
    ka: &KaBuildOutput,
    ku: &KuBuildOutput,
) -> Vec<TimelineAdvisory> {
    let mut advisories: Vec<TimelineAdvisory> = Vec::new();
    let mut push = |timestamp_s: i64,
                    event_type: AdvisoryEvent,
                    transport: Option<Transport>,
                    severity: AdvisorySeverity,
                    message: String,
                    metadata: BTreeMap<String, String>| {
        advisories.push(TimelineAdvisory {
            id: String::new(), // assigned after sorting
            timestamp: to_utc(timestamp_s),
            event_type,
            transport,
            severity,
            message,
            metadata,
        });
    };

    for t in &x.transitions {
        let mut metadata = BTreeMap::new();
        metadata.insert("from".to_string(), t.from_satellite.clone());
        metadata.insert("to".to_string(), t.to_satellite.clone());
        push(
            t.time_s,
            AdvisoryEvent::XTransition,
            Some(Transport::X),
            AdvisorySeverity::Info,
            format!("X handoff {} to {}", t.from_satellite, t.to_satellite),
            metadata,
        );
    }

    for &(lo, hi) in &x.aar_intervals {
        push(
            lo,
            AdvisoryEvent::AarBegin,
            Some(Transport::X),
            AdvisorySeverity::Warning,
            "AAR refueling window opens; X degraded".to_string(),
            BTreeMap::new(),
        );
        push(
            hi,
            AdvisoryEvent::AarEnd,
            Some(Transport::X),
            AdvisorySeverity::Info,
            "AAR refueling window closes".to_string(),
            BTreeMap::new(),
        );
    }

    for &(lo, hi) in &x.conflict_intervals {
        // Downgraded to warning when the dead zone is the sole X reason and
        // both other transports hold (X-Ku anti-correlation).
        let severity = if segment_at(segments, lo).map_or(false, |s| s.advisory_downgrade) {
            AdvisorySeverity::Warning
        } else {
            AdvisorySeverity::Critical
        };
        push(
            lo,
            AdvisoryEvent::AzimuthConflictBegin,
            Some(Transport::X),
            severity,
            "antenna dead zone blocks the active X satellite".to_string(),
            BTreeMap::new(),
        );
        push(
            hi,
            AdvisoryEvent::AzimuthConflictEnd,
            Some(Transport::X),
            AdvisorySeverity::Info,
            "antenna clear of the X dead zone".to_string(),
            BTreeMap::new(),
        );
    }

    for &(lo, hi) in &ka.gap_intervals {
        push(
            lo,
            AdvisoryEvent::KaCoverageGapBegin,
            Some(Transport::Ka),
            AdvisorySeverity::Warning,
            "Ka coverage gap begins".to_string(),
            BTreeMap::new(),
        );
        push(
            hi,
            AdvisoryEvent::KaCoverageGapEnd,
            Some(Transport::Ka),
            AdvisorySeverity::Info,
            "Ka coverage restored".to_string(),
            BTreeMap::new(),
        );
    }

    for &(lo, hi) in &ka.outage_intervals {
        push(
            lo,
            AdvisoryEvent::KaOutageBegin,
            Some(Transport::Ka),
            AdvisorySeverity::Warning,
            "scheduled Ka outage begins".to_string(),
            BTreeMap::new(),
        );
        push(
            hi,
            AdvisoryEvent::KaOutageEnd,
            Some(Transport::Ka),
            AdvisorySeverity::Info,
            "scheduled Ka outage ends".to_string(),
            BTreeMap::new(),
        );
    }

    for &t_s in &ka.handoff_times {
        push(
            t_s,
            AdvisoryEvent::KaHandoff,
            Some(Transport::Ka),
            AdvisorySeverity::Info,
            "Ka covering set handoff".to_string(),
            BTreeMap::new(),
        );
    }

    for (lo, hi, reason) in &ku.override_intervals {
        let mut metadata = BTreeMap::new();
        metadata.insert("reason".to_string(), reason.clone());
        push(
            *lo,
            AdvisoryEvent::KuOverrideBegin,
            Some(Transport::Ku),
            AdvisorySeverity::Warning,
            format!("Ku override begins: {}", reason),
            metadata.clone(),
        );
        push(
            *hi,
            AdvisoryEvent::KuOverrideEnd,
            Some(Transport::Ku),
            AdvisorySeverity::Info,
            format!("Ku override ends: {}", reason),
            metadata,
        );
    }

    for w in segments.windows(2) {
        if w[0].status != w[1].status {
            let severity = status_severity(w[0].status.max(w[1].status));
            push(
                w[1].start.timestamp(),
                AdvisoryEvent::SeverityChange,
                None,
                severity,
                format!(
                    "mission status {} to {}",
                    w[0].status.as_str(),
                    w[1].status.as_str()
                ),
                BTreeMap::new(),
            );
        }
    }

    advisories.sort_by(|a, b| {
        (a.timestamp, a.event_type, a.transport).cmp(&(b.timestamp, b.event_type, b.transport))
    });
    for (i, adv) in advisories.iter_mut().enumerate() {
        adv.id = format!("adv-{:04}", i + 1);
    }
    advisories
}

fn segment_at(segments: &[TimelineSegment], t_s: i64) -> Option<&TimelineSegment> {
    let t = to_utc(t_s);
    segments.iter().find(|s| s.start <= t && t < s.end)
}

fn status_severity(status: TimelineStatus) -> AdvisorySeverity {
    match status {
        TimelineStatus::Nominal => AdvisorySeverity::Info,
        TimelineStatus::Degraded => AdvisorySeverity::Warning,
        TimelineStatus::Critical => AdvisorySeverity::Critical,
    }
}

fn to_utc(unix_s: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(unix_s, 0).unwrap_or_default()
}
