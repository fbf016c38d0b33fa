//! Round lifecycle phase as seen by the caller.
//!
//! The phase is a pure function of the countdown, the strategy's deadline
//! threshold and the feed's open flag. Within one round it only moves
//! forward: Open → ClosingSoon → Locked.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Too early to commit stake.
    Open,
    /// Inside the deadline window; the planner may run.
    ClosingSoon,
    /// Round no longer accepts stake.
    Locked,
}

impl RoundPhase {
    /// Classify one observation.
    ///
    /// A closed flag means `Locked` regardless of the countdown. A countdown
    /// of zero with the round still open is the last slot and counts as
    /// `ClosingSoon`.
    pub fn classify(remaining_time_units: u64, deadline_threshold: u64, round_open: bool) -> Self {
        if !round_open {
            RoundPhase::Locked
        } else if remaining_time_units <= deadline_threshold {
            RoundPhase::ClosingSoon
        } else {
            RoundPhase::Open
        }
    }

    /// Forward-only transition: a late or stale observation never moves a
    /// round back to an earlier phase.
    pub fn advance(self, observed: RoundPhase) -> Self {
        self.max(observed)
    }

    pub fn accepts_plan(&self) -> bool {
        matches!(self, RoundPhase::ClosingSoon)
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundPhase::Open => write!(f, "OPEN"),
            RoundPhase::ClosingSoon => write!(f, "CLOSING_SOON"),
            RoundPhase::Locked => write!(f, "LOCKED"),
        }
    }
}
