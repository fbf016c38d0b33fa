//! Lambda solver.
//!
//! Binary search over the bankroll shadow price λ. At a given λ every
//! candidate takes `clip(optimal_unconstrained_x(i, λ), 0, max_per_option)`;
//! the aggregate is non-increasing in λ, so bisection finds the price at
//! which the funded options exhaust the bankroll.
//!
//! Empty options enter as fixed lumps, and options with the same entry rate
//! switch on together, so the aggregate can jump across the bankroll at one
//! price. When the bracket closes on such a jump the leftover budget goes to
//! the lumps priced above the infeasible side, best rate first.

use serde::Serialize;
use tracing::debug;

use super::value::ValueModel;
use crate::math::GRID_SIZE;

/// Enough halvings for a 64-bit fixed-point λ.
pub const MAX_SOLVER_ITERATIONS: u32 = 64;

/// Continuous (pre-snap) allocation at the chosen λ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Solution {
    pub lambda: u128,
    pub stakes: [u64; GRID_SIZE],
    pub total: u64,
    pub iterations: u32,
    /// Aggregate within one tick of the bankroll, budget not binding, or
    /// the λ bracket closed. False only when the iteration budget ran out.
    pub converged: bool,
}

impl Solution {
    pub fn empty() -> Self {
        Self {
            lambda: 0,
            stakes: [0; GRID_SIZE],
            total: 0,
            iterations: 0,
            converged: true,
        }
    }

    /// Bankroll left on the table by this solution.
    pub fn gap(&self, bankroll: u64) -> u64 {
        bankroll.saturating_sub(self.total)
    }
}

#[derive(Debug, Clone)]
pub struct LambdaSolver {
    max_iterations: u32,
}

impl Default for LambdaSolver {
    fn default() -> Self {
        Self {
            max_iterations: MAX_SOLVER_ITERATIONS,
        }
    }
}

impl LambdaSolver {
    pub fn new(max_iterations: u32) -> Self {
        Self { max_iterations }
    }

    /// Solve for the candidates' continuous allocation.
    ///
    /// The returned total never exceeds `bankroll`.
    pub fn solve(
        &self,
        model: &ValueModel,
        candidates: &[usize],
        bankroll: u64,
        max_per_option: u64,
        tick_size: u64,
    ) -> Solution {
        if candidates.is_empty() || bankroll == 0 {
            return Solution::empty();
        }

        let (stakes, total) = aggregate(model, candidates, 0, max_per_option);
        if total <= bankroll as u128 {
            debug!(total, bankroll, "Budget not binding at zero shadow price");
            return Solution {
                lambda: 0,
                stakes,
                total: total as u64,
                iterations: 0,
                converged: true,
            };
        }

        let mut lo: u128 = 0;
        let mut hi: u128 = candidates
            .iter()
            .map(|&i| model.lambda_ceiling(i))
            .max()
            .unwrap_or(1);

        let (mut best_stakes, mut best_total) = aggregate(model, candidates, hi, max_per_option);
        if best_total > bankroll as u128 {
            // The ceiling prices every candidate out; reaching this means
            // the model broke its own monotonicity.
            best_stakes = [0; GRID_SIZE];
            best_total = 0;
        }

        let tick = tick_size.max(1) as u128;
        let mut converged = (bankroll as u128) - best_total < tick;
        let mut iterations = 0;

        while !converged && iterations < self.max_iterations && hi - lo > 1 {
            iterations += 1;
            let mid = lo + (hi - lo) / 2;
            let (stakes, total) = aggregate(model, candidates, mid, max_per_option);
            if total > bankroll as u128 {
                lo = mid;
            } else {
                hi = mid;
                best_stakes = stakes;
                best_total = total;
                converged = (bankroll as u128) - total < tick;
            }
        }

        if !converged {
            let budget = bankroll as u128 - best_total;
            best_total +=
                admit_entry_lumps(model, candidates, lo, max_per_option, budget, &mut best_stakes);
            converged = (bankroll as u128) - best_total < tick || hi - lo <= 1;
        }

        debug!(
            lambda = hi,
            total = best_total,
            bankroll,
            iterations,
            converged,
            "Shadow price search finished"
        );

        Solution {
            lambda: hi,
            stakes: best_stakes,
            total: best_total as u64,
            iterations,
            converged,
        }
    }
}

/// Per-option allocations and their sum at price `lambda`.
fn aggregate(
    model: &ValueModel,
    candidates: &[usize],
    lambda: u128,
    max_per_option: u64,
) -> ([u64; GRID_SIZE], u128) {
    let mut stakes = [0u64; GRID_SIZE];
    let mut total: u128 = 0;
    for &i in candidates {
        let x = model.optimal_unconstrained_x(i, lambda).min(max_per_option);
        stakes[i] = x;
        total += x as u128;
    }
    (stakes, total)
}

/// Fund unfunded empty candidates whose entry rate beats `lo`, best rate
/// first and ties by ascending index, while a whole lump still fits in
/// `budget`. Returns the amount spent.
fn admit_entry_lumps(
    model: &ValueModel,
    candidates: &[usize],
    lo: u128,
    max_per_option: u64,
    mut budget: u128,
    stakes: &mut [u64; GRID_SIZE],
) -> u128 {
    let lump = model.entry_stake().min(max_per_option) as u128;
    if lump == 0 {
        return 0;
    }

    let mut lumps: Vec<(u128, usize)> = candidates
        .iter()
        .filter(|&&i| model.existing_stake(i) == 0 && stakes[i] == 0)
        .map(|&i| (model.entry_rate(i), i))
        .filter(|&(rate, _)| rate > lo)
        .collect();
    lumps.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let mut spent = 0;
    for (rate, i) in lumps {
        if lump > budget {
            break;
        }
        stakes[i] = lump as u64;
        budget -= lump;
        spent += lump;
        debug!(option = i, entry_rate = rate, stake = lump as u64, "Empty option admitted as entry lump");
    }
    spent
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
