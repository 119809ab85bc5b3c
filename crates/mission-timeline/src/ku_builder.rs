//! Ku-transport state builder.
//!
//! The LEO backup is AVAILABLE for the whole mission unless a manual
//! override window takes it OFFLINE. Yields at most `1 + 2·|overrides|`
//! intervals.

use tracing::warn;

use route_model::RouteProjector;

use crate::plan::TransportPlan;
use crate::series::{clamp_span, compose, Contribution, TransportSeries};
use crate::types::{Transport, TransportState};
use crate::Result;

#[derive(Debug)]
pub struct KuBuildOutput {
    pub series: TransportSeries,
    /// Resolved override windows with their caller-supplied reasons.
    pub override_intervals: Vec<(i64, i64, String)>,
}

pub struct KuStateBuilder<'a> {
    projector: &'a RouteProjector,
    plan: &'a TransportPlan,
}

impl<'a> KuStateBuilder<'a> {
    pub fn new(projector: &'a RouteProjector, plan: &'a TransportPlan) -> Self {
        Self { projector, plan }
    }

    pub fn build(&self) -> Result<KuBuildOutput> {
        let (start, end) = self.projector.mission_span()?;
        let span = (start.timestamp(), end.timestamp());

        let mut contributions = Vec::new();
        let mut override_intervals = Vec::new();
        for o in &self.plan.ku_overrides {
            let (o_start, o_end) = (o.start.timestamp(), o.end.timestamp());
            if o_end <= o_start {
                warn!(start = %o.start, end = %o.end, "discarding zero-length Ku override");
                continue;
            }
            if let Some((lo, hi)) = clamp_span(o_start, o_end, span) {
                contributions.push(Contribution::new(
                    lo,
                    hi,
                    TransportState::Offline,
                    &o.reason,
                ));
                override_intervals.push((lo, hi, o.reason.clone()));
            }
        }
        override_intervals.sort();

        let series = compose(Transport::Ku, span, &contributions, &[], |_| Vec::new());
        Ok(KuBuildOutput {
            series,
            override_intervals,
        })
    }
}
