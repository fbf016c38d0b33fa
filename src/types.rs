//! Shared types for the GRIDSPLIT allocator.
//!
//! These types form the data model used across all modules: the planner's
//! inputs (`RoundSnapshot`, `StrategyParams`), its output (`AllocationPlan`)
//! and the typed parameter error.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::math::GRID_SIZE;

// ---------------------------------------------------------------------------
// Round snapshot
// ---------------------------------------------------------------------------

/// Immutable observation of the grid, one per poll of the round feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub round_id: u64,
    /// Amount already committed per option by other bettors.
    pub existing_stake: [u64; GRID_SIZE],
    /// Bettor count per option (informational).
    pub existing_bettors: [u64; GRID_SIZE],
    /// Protocol retention from the losers' pool, in basis points.
    pub pool_skim_bps: u64,
    /// Secondary-token reward paid pro-rata to the winning option.
    pub reward_per_round: u64,
    /// Countdown until the round locks.
    pub remaining_time_units: u64,
    /// Feed's "round is open" flag.
    pub round_open: bool,
}

impl fmt::Display for RoundSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "round #{} pool={} bettors={} remaining={} {}",
            self.round_id,
            self.total_stake(),
            self.total_bettors(),
            self.remaining_time_units,
            if self.round_open { "open" } else { "closed" },
        )
    }
}

impl RoundSnapshot {
    /// Sum of all existing stake on the grid.
    pub fn total_stake(&self) -> u128 {
        self.existing_stake.iter().map(|&s| s as u128).sum()
    }

    pub fn total_bettors(&self) -> u64 {
        self.existing_bettors.iter().fold(0u64, |acc, &b| acc.saturating_add(b))
    }

    /// Options with stake but no recorded bettors. Such pairs indicate a
    /// lagging feed; the allocator trusts the stake figures.
    pub fn inconsistent_options(&self) -> Vec<usize> {
        (0..GRID_SIZE)
            .filter(|&i| self.existing_stake[i] > 0 && self.existing_bettors[i] == 0)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Strategy parameters
// ---------------------------------------------------------------------------

/// Caller-supplied limits for one planner invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyParams {
    /// Budget for this invocation, already net of any participation fee.
    pub bankroll: u64,
    pub max_per_option: u64,
    pub min_bet: u64,
    /// Smallest stake increment.
    pub tick_size: u64,
    /// Bankroll units per secondary-token base unit.
    pub unit_value_ratio: Decimal,
    /// Plan only when `remaining_time_units <= deadline_threshold`.
    pub deadline_threshold: u64,
}

impl fmt::Display for StrategyParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bankroll={} cap={} min_bet={} tick={} ratio={} deadline<={}",
            self.bankroll,
            self.max_per_option,
            self.min_bet,
            self.tick_size,
            self.unit_value_ratio,
            self.deadline_threshold,
        )
    }
}

// ---------------------------------------------------------------------------
// Allocation plan
// ---------------------------------------------------------------------------

/// One funded option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub option_index: usize,
    pub stake_amount: u64,
}

/// Planner output: funded options in ascending index order.
///
/// Built once per planner call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationPlan {
    allocations: Vec<Allocation>,
    total_allocated: u64,
}

impl AllocationPlan {
    pub fn empty() -> Self {
        Self {
            allocations: Vec::new(),
            total_allocated: 0,
        }
    }

    /// Build a plan from per-option stakes, dropping zero entries.
    pub fn from_stakes(stakes: &[u64; GRID_SIZE]) -> Self {
        let allocations: Vec<Allocation> = stakes
            .iter()
            .enumerate()
            .filter(|(_, &stake)| stake > 0)
            .map(|(option_index, &stake_amount)| Allocation {
                option_index,
                stake_amount,
            })
            .collect();
        let total_allocated = allocations.iter().map(|a| a.stake_amount).sum();
        Self {
            allocations,
            total_allocated,
        }
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    pub fn total_allocated(&self) -> u64 {
        self.total_allocated
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    /// Stake on a given option (0 when unfunded).
    pub fn stake_for(&self, option_index: usize) -> u64 {
        self.allocations
            .iter()
            .find(|a| a.option_index == option_index)
            .map(|a| a.stake_amount)
            .unwrap_or(0)
    }
}

impl fmt::Display for AllocationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "empty plan");
        }
        let parts: Vec<String> = self
            .allocations
            .iter()
            .map(|a| format!("#{}={}", a.option_index, a.stake_amount))
            .collect();
        write!(f, "{} (total {})", parts.join(" "), self.total_allocated)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures surfaced to the planner's caller. Every other condition
/// degrades to a valid, possibly empty, plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
