//! Piecewise-constant transport series and interval composition.
//!
//! Builders express their findings as *contributions* (half-open intervals
//! carrying a state and an optional reason). Composition sweeps the sorted
//! breakpoint union, takes the maximum state at each instant, unions the
//! reasons of every covering contribution, and coalesces equal neighbors.
//! Everything is whole Unix seconds.

use std::collections::BTreeSet;

use crate::types::{Transport, TransportState};

/// A single builder finding over `[start_s, end_s)`.
#[derive(Debug, Clone)]
pub struct Contribution {
    pub start_s: i64,
    pub end_s: i64,
    pub state: TransportState,
    pub reason: Option<String>,
}

impl Contribution {
    pub fn new(start_s: i64, end_s: i64, state: TransportState, reason: &str) -> Self {
        Self {
            start_s,
            end_s,
            state,
            reason: Some(reason.to_string()),
        }
    }
}

/// One interval of the composed per-transport series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportInterval {
    pub start_s: i64,
    pub end_s: i64,
    pub state: TransportState,
    /// Sorted, deduplicated.
    pub reasons: Vec<String>,
    /// Active satellites: the single X satellite, the Ka covering set, or
    /// empty for Ku.
    pub satellites: Vec<String>,
}

/// Contiguous piecewise-constant series covering the mission span.
#[derive(Debug, Clone)]
pub struct TransportSeries {
    pub transport: Transport,
    pub intervals: Vec<TransportInterval>,
}

impl TransportSeries {
    /// Interval containing second `t_s`. The series covers the span, so a
    /// miss only happens out of range (callers clamp first).
    pub fn interval_at(&self, t_s: i64) -> Option<&TransportInterval> {
        let idx = self
            .intervals
            .partition_point(|iv| iv.start_s <= t_s)
            .checked_sub(1)?;
        let iv = &self.intervals[idx];
        (t_s < iv.end_s || idx == self.intervals.len() - 1).then_some(iv)
    }

    /// State at second `t_s`.
    pub fn state_at(&self, t_s: i64) -> TransportState {
        self.interval_at(t_s)
            .map(|iv| iv.state)
            .unwrap_or(TransportState::Available)
    }

    /// All interval start seconds (used by the merger's breakpoint union).
    pub fn breakpoints(&self) -> impl Iterator<Item = i64> + '_ {
        self.intervals.iter().map(|iv| iv.start_s)
    }
}

/// Compose contributions into a contiguous series over `span`.
///
/// `extra_breakpoints` forces interval boundaries where metadata (active
/// satellites) changes without a state change. `satellites_at` reads the
/// active satellite set at an instant.
pub fn compose(
    transport: Transport,
    span: (i64, i64),
    contributions: &[Contribution],
    extra_breakpoints: &[i64],
    satellites_at: impl Fn(i64) -> Vec<String>,
) -> TransportSeries {
    let (start, end) = span;
    let mut breaks: BTreeSet<i64> = BTreeSet::new();
    breaks.insert(start);
    breaks.insert(end);
    for c in contributions {
        for b in [c.start_s, c.end_s] {
            if b > start && b < end {
                breaks.insert(b);
            }
        }
    }
    for &b in extra_breakpoints {
        if b > start && b < end {
            breaks.insert(b);
        }
    }

    let breaks: Vec<i64> = breaks.into_iter().collect();
    let mut intervals: Vec<TransportInterval> = Vec::with_capacity(breaks.len());

    for w in breaks.windows(2) {
        let (lo, hi) = (w[0], w[1]);
        let mut state = TransportState::Available;
        let mut reasons: BTreeSet<String> = BTreeSet::new();
        for c in contributions {
            if c.start_s <= lo && lo < c.end_s {
                state = state.max(c.state);
                if let Some(r) = &c.reason {
                    reasons.insert(r.clone());
                }
            }
        }
        let interval = TransportInterval {
            start_s: lo,
            end_s: hi,
            state,
            reasons: reasons.into_iter().collect(),
            satellites: satellites_at(lo),
        };

        match intervals.last_mut() {
            Some(prev)
                if prev.state == interval.state
                    && prev.reasons == interval.reasons
                    && prev.satellites == interval.satellites =>
            {
                prev.end_s = hi;
            }
            _ => intervals.push(interval),
        }
    }

    TransportSeries {
        transport,
        intervals,
    }
}

/// Clamp a contribution interval into the span; `None` when empty.
pub fn clamp_span(start_s: i64, end_s: i64, span: (i64, i64)) -> Option<(i64, i64)> {
    let lo = start_s.max(span.0);
    let hi = end_s.min(span.1);
    (lo < hi).then_some((lo, hi))
}
