//! Property tests for the segment merger invariants: contiguous coverage,
//! the bad-count status rule, sorted unique reasons, pointwise agreement
//! with the per-transport series, and no adjacent duplicate segments.

use proptest::prelude::*;

use mission_timeline::merger::merge_series;
use mission_timeline::series::{compose, Contribution};
use mission_timeline::{TimelineStatus, Transport, TransportState};

const SPAN: (i64, i64) = (1_000_000, 1_003_600);

fn arb_state() -> impl Strategy<Value = TransportState> {
    prop_oneof![
        Just(TransportState::Degraded),
        Just(TransportState::Offline),
    ]
}

fn arb_contributions(reasons: &'static [&'static str]) -> impl Strategy<Value = Vec<Contribution>> {
    prop::collection::vec(
        (
            SPAN.0..SPAN.1,
            1i64..1200,
            arb_state(),
            0..reasons.len(),
        )
            .prop_map(move |(start, len, state, reason_idx)| Contribution {
                start_s: start,
                end_s: (start + len).min(SPAN.1),
                state,
                reason: Some(reasons[reason_idx].to_string()),
            }),
        0..4,
    )
}

proptest! {
    #[test]
    fn merged_segments_hold_invariants(
        x_contribs in arb_contributions(&["x_transition", "aar_refuel", "azimuth_conflict"]),
        ka_contribs in arb_contributions(&["ka_outage", "ka_no_coverage", "ka_handoff"]),
        ku_contribs in arb_contributions(&["ku_maintenance", "ku_jamming"]),
    ) {
        let x = compose(Transport::X, SPAN, &x_contribs, &[], |_| vec![]);
        let ka = compose(Transport::Ka, SPAN, &ka_contribs, &[], |_| vec![]);
        let ku = compose(Transport::Ku, SPAN, &ku_contribs, &[], |_| vec![]);
        let segments = merge_series(SPAN, &x, &ka, &ku);

        // Invariant 1: cover the span contiguously without overlap.
        prop_assert!(!segments.is_empty());
        prop_assert_eq!(segments.first().unwrap().start.timestamp(), SPAN.0);
        prop_assert_eq!(segments.last().unwrap().end.timestamp(), SPAN.1);
        for w in segments.windows(2) {
            prop_assert_eq!(w[0].end, w[1].start);
        }

        for s in &segments {
            prop_assert!(s.start < s.end);

            // Invariant 2: status follows the bad-count rule.
            let k = [s.x_state, s.ka_state, s.ku_state]
                .iter()
                .filter(|st| st.is_bad())
                .count();
            let expected = match k {
                0 => TimelineStatus::Nominal,
                1 => TimelineStatus::Degraded,
                _ => TimelineStatus::Critical,
            };
            prop_assert_eq!(s.status, expected);
            prop_assert_eq!(s.impacted_transports.len(), k);

            // Invariant 3: reasons sorted and unique.
            let mut sorted = s.reasons.clone();
            sorted.sort();
            sorted.dedup();
            prop_assert_eq!(&sorted, &s.reasons);
        }

        // Invariant 5: adjacent segments differ in a labeled field.
        for w in segments.windows(2) {
            let same = w[0].x_state == w[1].x_state
                && w[0].ka_state == w[1].ka_state
                && w[0].ku_state == w[1].ku_state
                && w[0].reasons == w[1].reasons
                && w[0].metadata == w[1].metadata;
            prop_assert!(!same, "adjacent duplicate segments");
        }

        // Invariant 4: pointwise agreement with the input series.
        for t_s in (SPAN.0..SPAN.1).step_by(97) {
            let seg = segments
                .iter()
                .find(|s| s.start.timestamp() <= t_s && t_s < s.end.timestamp())
                .unwrap();
            prop_assert_eq!(seg.x_state, x.state_at(t_s));
            prop_assert_eq!(seg.ka_state, ka.state_at(t_s));
            prop_assert_eq!(seg.ku_state, ku.state_at(t_s));
        }
    }
}
