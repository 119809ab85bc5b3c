//! Segment merger.
//!
//! Three per-transport piecewise-constant series become one combined segment
//! series. Endpoints are the union of the input breakpoints (already whole
//! seconds), so the output is byte-identical across runs for identical
//! inputs.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::series::TransportSeries;
use crate::types::{
    reason, SegmentMetadata, SegmentSatellites, TimelineSegment, TimelineStatus, Transport,
    TransportState,
};

/// Merge the three series over `span` into combined segments.
pub fn merge_series(
    span: (i64, i64),
    x: &TransportSeries,
    ka: &TransportSeries,
    ku: &TransportSeries,
) -> Vec<TimelineSegment> {
    let mut breaks: BTreeSet<i64> = BTreeSet::new();
    breaks.insert(span.0);
    breaks.insert(span.1);
    for series in [x, ka, ku] {
        for b in series.breakpoints() {
            if b > span.0 && b < span.1 {
                breaks.insert(b);
            }
        }
    }

    let breaks: Vec<i64> = breaks.into_iter().collect();
    let mut segments: Vec<TimelineSegment> = Vec::with_capacity(breaks.len());

    for w in breaks.windows(2) {
        let (lo, hi) = (w[0], w[1]);
        let xi = x.interval_at(lo);
        let kai = ka.interval_at(lo);
        let kui = ku.interval_at(lo);

        let x_state = xi.map_or(TransportState::Available, |iv| iv.state);
        let ka_state = kai.map_or(TransportState::Available, |iv| iv.state);
        let ku_state = kui.map_or(TransportState::Available, |iv| iv.state);

        let mut reasons: BTreeSet<String> = BTreeSet::new();
        for iv in [xi, kai, kui].into_iter().flatten() {
            reasons.extend(iv.reasons.iter().cloned());
        }

        let impacted: Vec<Transport> = [
            (Transport::X, x_state),
            (Transport::Ka, ka_state),
            (Transport::Ku, ku_state),
        ]
        .into_iter()
        .filter(|(_, s)| s.is_bad())
        .map(|(t, _)| t)
        .collect();

        let status = TimelineStatus::from_bad_count(impacted.len());

        let satellites = SegmentSatellites {
            x: xi.and_then(|iv| iv.satellites.first().cloned()),
            ka: kai.map(|iv| iv.satellites.clone()).unwrap_or_default(),
        };

        // X non-available solely from the azimuth dead zone while both
        // other transports hold: advisory severity is softened, segment
        // status is not.
        let advisory_downgrade = x_state.is_bad()
            && xi.map_or(false, |iv| {
                iv.reasons.len() == 1 && iv.reasons[0] == reason::AZIMUTH_CONFLICT
            })
            && !ka_state.is_bad()
            && !ku_state.is_bad();

        let segment = TimelineSegment {
            start: to_utc(lo),
            end: to_utc(hi),
            x_state,
            ka_state,
            ku_state,
            status,
            impacted_transports: impacted,
            reasons: reasons.into_iter().collect(),
            metadata: SegmentMetadata { satellites },
            advisory_downgrade,
        };

        match segments.last_mut() {
            Some(prev)
                if prev.x_state == segment.x_state
                    && prev.ka_state == segment.ka_state
                    && prev.ku_state == segment.ku_state
                    && prev.reasons == segment.reasons
                    && prev.metadata == segment.metadata =>
            {
                prev.end = segment.end;
            }
            _ => segments.push(segment),
        }
    }

    segments
}

fn to_utc(unix_s: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(unix_s, 0).unwrap_or_default()
}
