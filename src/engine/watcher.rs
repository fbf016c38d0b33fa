//! Round watcher.
//!
//! Polls a [`SnapshotSource`], tracks the lifecycle phase of the current
//! round and runs the planner exactly once per round, on the first poll
//! that lands inside the deadline window.

use anyhow::Result;
use tracing::{debug, info};

use crate::feed::SnapshotSource;
use crate::round::RoundPhase;
use crate::strategy::{AllocationPlanner, PlanReport};
use crate::types::StrategyParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RoundState {
    round_id: u64,
    phase: RoundPhase,
    planned: bool,
}

pub struct RoundWatcher<S: SnapshotSource> {
    source: S,
    params: StrategyParams,
    planner: AllocationPlanner,
    current: Option<RoundState>,
}

impl<S: SnapshotSource> RoundWatcher<S> {
    pub fn new(source: S, params: StrategyParams) -> Self {
        Self::with_planner(source, params, AllocationPlanner::default())
    }

    pub fn with_planner(source: S, params: StrategyParams, planner: AllocationPlanner) -> Self {
        Self {
            source,
            params,
            planner,
            current: None,
        }
    }

    /// Phase of the round being watched, if any poll succeeded yet.
    pub fn phase(&self) -> Option<RoundPhase> {
        self.current.map(|s| s.phase)
    }

    pub fn round_id(&self) -> Option<u64> {
        self.current.map(|s| s.round_id)
    }

    /// Fetch one snapshot and plan if this round just entered its window.
    ///
    /// Returns `Ok(None)` when nothing was planned on this poll. Feed and
    /// parameter errors are returned to the caller; a round whose planning
    /// failed is not retried.
    pub async fn poll(&mut self) -> Result<Option<PlanReport>> {
        let snapshot = self.source.fetch().await?;
        let observed = RoundPhase::classify(
            snapshot.remaining_time_units,
            self.params.deadline_threshold,
            snapshot.round_open,
        );

        let mut state = match self.current {
            Some(state) if state.round_id == snapshot.round_id => state,
            _ => {
                info!(round_id = snapshot.round_id, phase = %observed, "New round observed");
                RoundState {
                    round_id: snapshot.round_id,
                    phase: observed,
                    planned: false,
                }
            }
        };

        let previous = state.phase;
        state.phase = previous.advance(observed);
        if state.phase != previous {
            info!(
                round_id = state.round_id,
                from = %previous,
                to = %state.phase,
                "Round phase changed"
            );
        } else if observed < state.phase {
            debug!(round_id = state.round_id, observed = %observed, "Stale observation ignored");
        }

        let should_plan = state.phase.accepts_plan() && !state.planned;
        if should_plan {
            state.planned = true;
        }
        self.current = Some(state);

        if !should_plan {
            return Ok(None);
        }
        let report = self.planner.plan_with_report(&snapshot, &self.params)?;
        Ok(Some(report))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
