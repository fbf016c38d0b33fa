//! Constraint snapper.
//!
//! Projects the solver's allocation onto the feasible discrete set:
//! tick multiples, at least `min_bet`, at most `max_per_option`, and still
//! EV-positive. Rounding leftovers stay unspent.

use serde::Serialize;
use tracing::debug;

use super::value::ValueModel;
use crate::math::{floor_to_tick, GRID_SIZE};
use crate::types::StrategyParams;

/// Why the snapper zeroed an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SnapRejection {
    BelowMinBet,
    NonPositiveValue,
}

pub struct ConstraintSnapper<'a> {
    params: &'a StrategyParams,
}

impl<'a> ConstraintSnapper<'a> {
    pub fn new(params: &'a StrategyParams) -> Self {
        Self { params }
    }

    /// Snap every option of a continuous allocation.
    pub fn snap(&self, continuous: &[u64; GRID_SIZE], model: &ValueModel) -> [u64; GRID_SIZE] {
        let mut snapped = [0u64; GRID_SIZE];
        for (i, &x) in continuous.iter().enumerate() {
            if x == 0 {
                continue;
            }
            match self.snap_one(i, x, model) {
                Ok(stake) => snapped[i] = stake,
                Err(reason) => {
                    debug!(option = i, continuous = x, reason = ?reason, "Stake dropped while snapping");
                }
            }
        }
        snapped
    }

    fn snap_one(&self, option: usize, x: u64, model: &ValueModel) -> Result<u64, SnapRejection> {
        let cap = floor_to_tick(self.params.max_per_option, self.params.tick_size);
        let stake = floor_to_tick(x, self.params.tick_size);
        if stake < self.params.min_bet {
            return Err(SnapRejection::BelowMinBet);
        }
        let stake = stake.min(cap);
        if model.value(option, stake) <= 0 {
            return Err(SnapRejection::NonPositiveValue);
        }
        Ok(stake)
    }

    /// Zero any stake that is not EV-positive under `model`.
    /// Returns the number of options dropped.
    pub fn retain_positive_ev(&self, stakes: &mut [u64; GRID_SIZE], model: &ValueModel) -> usize {
        let mut dropped = 0;
        for (i, stake) in stakes.iter_mut().enumerate() {
            if *stake > 0 && model.value(i, *stake) <= 0 {
                debug!(option = i, stake = *stake, "Stake dropped: not EV-positive after settling");
                *stake = 0;
                dropped += 1;
            }
        }
        dropped
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
