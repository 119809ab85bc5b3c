//! Timeline orchestration.
//!
//! Runs the three per-transport builders, the merger, and the advisory
//! generator for one leg. A cancellation flag is checked between stages so a
//! superseded recomputation stops at the next cooperative point. A failing
//! transport builder degrades that transport to OFFLINE (`evaluator_error`)
//! instead of failing the whole timeline; only unrecoverable inputs (no
//! timing data, empty route) abort.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::error;

use footprint_coverage::CoverageEvaluator;
use route_model::{Route, RouteProjector};

use crate::advisories::generate_advisories;
use crate::ephemeris::SatelliteEphemeris;
use crate::ka_builder::{KaBuildOutput, KaStateBuilder};
use crate::ku_builder::{KuBuildOutput, KuStateBuilder};
use crate::merger::merge_series;
use crate::plan::TransportPlan;
use crate::series::{compose, Contribution, TransportSeries};
use crate::types::{reason, Timeline, Transport, TransportState};
use crate::x_builder::{XBuildOutput, XStateBuilder};
use crate::{Result, TimelineError};

/// Sampling and micro-degradation tunables.
#[derive(Debug, Clone, Copy)]
pub struct BuilderConfig {
    pub x_sampling_period_s: i64,
    pub ka_handoff_degradation_s: i64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            x_sampling_period_s: 30,
            ka_handoff_degradation_s: 1,
        }
    }
}

pub struct TimelineBuilder<'a> {
    route: Arc<Route>,
    evaluator: &'a CoverageEvaluator,
    ephemeris: &'a dyn SatelliteEphemeris,
    plan: &'a TransportPlan,
    config: BuilderConfig,
}

impl<'a> TimelineBuilder<'a> {
    pub fn new(
        route: Arc<Route>,
        evaluator: &'a CoverageEvaluator,
        ephemeris: &'a dyn SatelliteEphemeris,
        plan: &'a TransportPlan,
        config: BuilderConfig,
    ) -> Self {
        Self {
            route,
            evaluator,
            ephemeris,
            plan,
            config,
        }
    }

    /// Compute the full timeline for `leg_id`. `cancel` is polled between
    /// the per-transport builders and again before merging.
    pub fn build(&self, leg_id: &str, cancel: &AtomicBool) -> Result<Timeline> {
        let mut projector = RouteProjector::new(self.route.clone())?;
        projector.set_time_adjustment_s(self.plan.adjustment_s(&self.route));

        let (start, end) = projector.mission_span()?;
        let span = (start.timestamp(), end.timestamp());

        check_cancel(cancel)?;
        let x_out = XStateBuilder::new(
            &projector,
            self.ephemeris,
            self.plan,
            self.config.x_sampling_period_s,
        )
        .build()
        .unwrap_or_else(|e| {
            error!(leg = leg_id, error = %e, "X builder failed; degrading transport");
            XBuildOutput {
                series: offline_series(Transport::X, span),
                transitions: vec![],
                aar_intervals: vec![],
                conflict_intervals: vec![],
            }
        });

        check_cancel(cancel)?;
        let ka_out = KaStateBuilder::new(
            &projector,
            self.evaluator,
            self.plan,
            self.config.x_sampling_period_s,
            self.config.ka_handoff_degradation_s,
        )
        .build()
        .unwrap_or_else(|e| {
            error!(leg = leg_id, error = %e, "Ka builder failed; degrading transport");
            KaBuildOutput {
                series: offline_series(Transport::Ka, span),
                handoff_times: vec![],
                gap_intervals: vec![],
                outage_intervals: vec![],
            }
        });

        check_cancel(cancel)?;
        let ku_out = KuStateBuilder::new(&projector, self.plan)
            .build()
            .unwrap_or_else(|e| {
                error!(leg = leg_id, error = %e, "Ku builder failed; degrading transport");
                KuBuildOutput {
                    series: offline_series(Transport::Ku, span),
                    override_intervals: vec![],
                }
            });

        check_cancel(cancel)?;
        let segments = merge_series(span, &x_out.series, &ka_out.series, &ku_out.series);
        let advisories = generate_advisories(&segments, &x_out, &ka_out, &ku_out);

        Ok(Timeline {
            leg_id: leg_id.to_string(),
            mission_start: start,
            mission_end: end,
            segments,
            advisories,
        })
    }
}

fn check_cancel(cancel: &AtomicBool) -> Result<()> {
    if cancel.load(Ordering::Relaxed) {
        Err(TimelineError::Cancelled)
    } else {
        Ok(())
    }
}

fn offline_series(transport: Transport, span: (i64, i64)) -> TransportSeries {
    compose(
        transport,
        span,
        &[Contribution::new(
            span.0,
            span.1,
            TransportState::Offline,
            reason::EVALUATOR_ERROR,
        )],
        &[],
        |_| Vec::new(),
    )
}
