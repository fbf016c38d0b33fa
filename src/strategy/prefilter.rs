//! Prefilter: drop options that cannot be EV-positive.
//!
//! An option whose marginal value at zero incremental stake is not strictly
//! positive is dominated by its existing pool share; no stake on it can add
//! value, whatever the bankroll.

use tracing::debug;

use super::value::ValueModel;
use crate::math::GRID_SIZE;

/// Indices (ascending) whose marginal value at zero stake is positive.
pub fn candidates(model: &ValueModel) -> Vec<usize> {
    (0..GRID_SIZE).filter(|&i| survives(model, i)).collect()
}

/// Narrow an existing candidate set under a re-priced model. Options never
/// re-enter once excluded.
pub fn retain_candidates(model: &ValueModel, candidates: &mut Vec<usize>) {
    candidates.retain(|&i| survives(model, i));
}

fn survives(model: &ValueModel, option: usize) -> bool {
    let marginal = model.marginal_value(option, 0);
    if marginal > 0 {
        return true;
    }
    debug!(
        option,
        existing_stake = model.existing_stake(option),
        marginal,
        "Option excluded: existing pool share dominates payout"
    );
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
