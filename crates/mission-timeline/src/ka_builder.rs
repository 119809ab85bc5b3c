//! Ka-transport state builder.
//!
//! The wide-beam commercial link is driven by footprint coverage: the route
//! is sampled at a fixed cadence, each sample's covering set comes from the
//! coverage evaluator, and runs of constant covering set become intervals.
//! Empty sets are coverage gaps, scheduled outages overlay OFFLINE, and a
//! crossing between disjoint non-empty sets earns a one-second handoff
//! micro-degradation.

use tracing::warn;

use footprint_coverage::CoverageEvaluator;
use route_model::RouteProjector;

use crate::plan::TransportPlan;
use crate::series::{clamp_span, compose, Contribution, TransportSeries};
use crate::types::{reason, Transport, TransportState};
use crate::Result;

#[derive(Debug)]
pub struct KaBuildOutput {
    pub series: TransportSeries,
    /// Crossing seconds of set handoffs.
    pub handoff_times: Vec<i64>,
    pub gap_intervals: Vec<(i64, i64)>,
    pub outage_intervals: Vec<(i64, i64)>,
}

pub struct KaStateBuilder<'a> {
    projector: &'a RouteProjector,
    evaluator: &'a CoverageEvaluator,
    plan: &'a TransportPlan,
    sampling_period_s: i64,
    handoff_degradation_s: i64,
}

/// Covering set at one sample; `Err` marks an evaluator failure.
type SampleSet = std::result::Result<Vec<String>, ()>;

impl<'a> KaStateBuilder<'a> {
    pub fn new(
        projector: &'a RouteProjector,
        evaluator: &'a CoverageEvaluator,
        plan: &'a TransportPlan,
        sampling_period_s: i64,
        handoff_degradation_s: i64,
    ) -> Self {
        Self {
            projector,
            evaluator,
            plan,
            sampling_period_s: sampling_period_s.max(1),
            handoff_degradation_s: handoff_degradation_s.max(1),
        }
    }

    pub fn build(&self) -> Result<KaBuildOutput> {
        let (start, end) = self.projector.mission_span()?;
        let span = (start.timestamp(), end.timestamp());

        let samples = self.sample_covering_sets(span);

        // Runs of constant covering set; boundaries at the midpoint between
        // neighboring samples, snapped to the whole second.
        let mut runs: Vec<(i64, i64, SampleSet)> = Vec::new();
        for (i, (t_s, set)) in samples.iter().enumerate() {
            match runs.last_mut() {
                Some((_, run_end, run_set)) if run_set == set => {
                    *run_end = span.1;
                }
                _ => {
                    let boundary = if i == 0 {
                        span.0
                    } else {
                        midpoint_s(samples[i - 1].0, *t_s)
                    };
                    if let Some((_, run_end, _)) = runs.last_mut() {
                        *run_end = boundary;
                    }
                    runs.push((boundary, span.1, set.clone()));
                }
            }
        }
        if runs.is_empty() {
            runs.push((span.0, span.1, Ok(Vec::new())));
        }

        let mut contributions: Vec<Contribution> = Vec::new();
        let mut gap_intervals = Vec::new();

        for (lo, hi, set) in &runs {
            match set {
                Err(()) => {
                    contributions.push(Contribution::new(
                        *lo,
                        *hi,
                        TransportState::Offline,
                        reason::EVALUATOR_ERROR,
                    ));
                }
                Ok(sats) if sats.is_empty() => {
                    contributions.push(Contribution::new(
                        *lo,
                        *hi,
                        TransportState::Offline,
                        reason::KA_NO_COVERAGE,
                    ));
                    gap_intervals.push((*lo, *hi));
                }
                Ok(_) => {}
            }
        }

        // Scheduled outages. Zero-length windows are discarded.
        let mut outage_intervals = Vec::new();
        for o in &self.plan.ka_outages {
            let (o_start, o_end) = (o.start.timestamp(), o.end.timestamp());
            if o_end <= o_start {
                warn!(start = %o.start, end = %o.end, "discarding zero-length Ka outage");
                continue;
            }
            if let Some((lo, hi)) = clamp_span(o_start, o_end, span) {
                contributions.push(Contribution::new(
                    lo,
                    hi,
                    TransportState::Offline,
                    reason::KA_OUTAGE,
                ));
                outage_intervals.push((lo, hi));
            }
        }
        outage_intervals.sort();

        // Handoffs: disjoint, non-empty consecutive covering sets.
        let mut handoff_times = Vec::new();
        for w in samples.windows(2) {
            if let (Ok(a), Ok(b)) = (&w[0].1, &w[1].1) {
                if !a.is_empty() && !b.is_empty() && a.iter().all(|s| !b.contains(s)) {
                    let crossing = midpoint_s(w[0].0, w[1].0);
                    if let Some((lo, hi)) =
                        clamp_span(crossing, crossing + self.handoff_degradation_s, span)
                    {
                        contributions.push(Contribution::new(
                            lo,
                            hi,
                            TransportState::Degraded,
                            reason::KA_HANDOFF,
                        ));
                        handoff_times.push(lo);
                    }
                }
            }
        }

        let run_breaks: Vec<i64> = runs.iter().map(|(lo, _, _)| *lo).collect();
        let series = compose(Transport::Ka, span, &contributions, &run_breaks, |t_s| {
            runs.iter()
                .rev()
                .find(|(lo, _, _)| *lo <= t_s)
                .and_then(|(_, _, set)| set.as_ref().ok().cloned())
                .unwrap_or_default()
        });

        Ok(KaBuildOutput {
            series,
            handoff_times,
            gap_intervals,
            outage_intervals,
        })
    }

    fn sample_covering_sets(&self, span: (i64, i64)) -> Vec<(i64, SampleSet)> {
        let mut samples = Vec::new();
        let mut t_s = span.0;
        loop {
            let set = match chrono::DateTime::from_timestamp(t_s, 0) {
                Some(when) => match self.projector.position_at_time(when) {
                    Ok(pos) => Ok(self.evaluator.covering_set(
                        &self.plan.ka_initial_satellite_ids,
                        pos.lat_deg,
                        pos.lon_deg,
                        when,
                    )),
                    Err(e) => {
                        warn!(error = %e, "route sample failed");
                        Err(())
                    }
                },
                None => Err(()),
            };
            samples.push((t_s, set));
            if t_s == span.1 {
                break;
            }
            t_s = (t_s + self.sampling_period_s).min(span.1);
        }
        samples
    }
}

fn midpoint_s(a: i64, b: i64) -> i64 {
    a + (b - a) / 2
}
