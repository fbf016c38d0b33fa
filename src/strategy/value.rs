//! Per-option value model.
//!
//! Closed-form EV for staking `x` on one option of the grid, holding the
//! rest of the invocation's deployment fixed. With `N` options, skim `k`
//! (basis points, `c = B - k`), existing stake `s`, existing pool `G`, own
//! deployment `D` and reward value `R`:
//!
//! ```text
//! pot(x)      = (c/B)(G - s + D - x) + R
//! payout(x)   = x + x/(x+s) * pot(x)        // if this option wins
//! value(x)    = payout(x)/N - x
//! marginal(x) = [k(x+s)^2 + s(P + c*s)] / (N*B*(x+s)^2) - 1,   P = B*pot(0)
//! ```
//!
//! All results are integers; every division floors. Marginal values and λ
//! are fixed point with [`LAMBDA_SCALE`].

use serde::Serialize;

use crate::math::{isqrt, mul_div, BPS_SCALE, GRID_SIZE, LAMBDA_SCALE, MAX_POOL_AMOUNT};
use crate::types::RoundSnapshot;

const N: u128 = GRID_SIZE as u128;

/// Global pool state shared by every option's valuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolState {
    /// Sum of other bettors' stake across the grid.
    pub existing_total: u128,
    /// This invocation's own total deployment across the grid.
    pub deployment: u64,
    /// Secondary-token reward in bankroll units.
    pub reward_value: u64,
    pub skim_bps: u64,
}

impl PoolState {
    fn keep_bps(&self) -> u128 {
        BPS_SCALE - self.skim_bps as u128
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueModel {
    stakes: [u64; GRID_SIZE],
    pool: PoolState,
    /// Stake used for options nobody has entered yet.
    entry_stake: u64,
}

impl ValueModel {
    /// `snapshot.pool_skim_bps` must already be validated (<= 10 000).
    pub fn new(snapshot: &RoundSnapshot, reward_value: u64, deployment: u64, entry_stake: u64) -> Self {
        Self {
            stakes: snapshot.existing_stake,
            pool: PoolState {
                existing_total: snapshot.total_stake(),
                deployment,
                reward_value,
                skim_bps: snapshot.pool_skim_bps,
            },
            entry_stake,
        }
    }

    /// Same grid re-priced under a different own deployment.
    pub fn with_deployment(&self, deployment: u64) -> Self {
        let mut model = self.clone();
        model.pool.deployment = deployment;
        model
    }

    pub fn pool(&self) -> &PoolState {
        &self.pool
    }

    pub fn existing_stake(&self, option: usize) -> u64 {
        self.stakes[option]
    }

    pub fn entry_stake(&self) -> u64 {
        self.entry_stake
    }

    /// Winnings pot if `option` wins, before removing our own stake on it,
    /// scaled by `BPS_SCALE`.
    fn scaled_pot(&self, option: usize) -> u128 {
        let s = self.stakes[option] as u128;
        let losers = self.pool.existing_total - s + self.pool.deployment as u128;
        self.pool.keep_bps() * losers + BPS_SCALE * self.pool.reward_value as u128
    }

    /// Total EV (bankroll units) of staking `x` on `option`.
    pub fn value(&self, option: usize, x: u64) -> i128 {
        if x == 0 {
            return 0;
        }
        let x = x as u128;
        let y = x + self.stakes[option] as u128;
        let pot = self.scaled_pot(option).saturating_sub(self.pool.keep_bps() * x);

        // x*(B*y + pot) / (N*B*y) = payout / N
        let expected_payout = mul_div(x, BPS_SCALE * y + pot, N * BPS_SCALE * y);
        to_i128(expected_payout) - x as i128
    }

    /// d(value)/dx at `x`, scaled by `LAMBDA_SCALE`.
    ///
    /// For an empty option at `x == 0` the derivative is unbounded whenever
    /// the pot is positive; that case returns `i128::MAX`.
    ///
    /// Stakes beyond [`MAX_POOL_AMOUNT`] are evaluated at that bound, where
    /// the marginal has already flattened to its floor.
    pub fn marginal_value(&self, option: usize, x: u64) -> i128 {
        let s = self.stakes[option] as u128;
        let y = (x as u128).min(MAX_POOL_AMOUNT) + s;
        let k = self.pool.skim_bps as u128;
        let pot = self.scaled_pot(option);

        if y == 0 {
            if pot > 0 {
                return i128::MAX;
            }
            let floor_rate = (LAMBDA_SCALE * k) / (N * BPS_SCALE);
            return floor_rate as i128 - LAMBDA_SCALE as i128;
        }

        let y2 = y * y;
        let numerator = k * y2 + s * (pot + self.pool.keep_bps() * s);
        let scaled = mul_div(numerator, LAMBDA_SCALE, N * BPS_SCALE * y2);
        to_i128(scaled) - LAMBDA_SCALE as i128
    }

    /// Stake at which `marginal_value(option, x) == lambda`, clipped at 0.
    ///
    /// Empty options have no interior optimum; they enter at the model's
    /// entry stake when its average value per unit beats `lambda`.
    pub fn optimal_unconstrained_x(&self, option: usize, lambda: u128) -> u64 {
        let s = self.stakes[option] as u128;
        if s == 0 {
            return if self.entry_rate(option) > lambda {
                self.entry_stake
            } else {
                0
            };
        }

        let k = self.pool.skim_bps as u128;
        let a = s * (self.scaled_pot(option) + self.pool.keep_bps() * s);
        let denominator = (N * BPS_SCALE)
            .saturating_mul(LAMBDA_SCALE.saturating_add(lambda))
            - k * LAMBDA_SCALE;
        let y = isqrt(mul_div(a, LAMBDA_SCALE, denominator));
        y.saturating_sub(s).min(u64::MAX as u128) as u64
    }

    /// Average value per unit of the entry stake, scaled by `LAMBDA_SCALE`.
    /// Zero when entering is not EV-positive.
    pub fn entry_rate(&self, option: usize) -> u128 {
        if self.entry_stake == 0 {
            return 0;
        }
        let value = self.value(option, self.entry_stake);
        if value <= 0 {
            return 0;
        }
        mul_div(value as u128, LAMBDA_SCALE, self.entry_stake as u128)
    }

    /// Smallest λ at which `optimal_unconstrained_x` is zero for `option`.
    pub fn lambda_ceiling(&self, option: usize) -> u128 {
        if self.stakes[option] == 0 {
            return self.entry_rate(option).saturating_add(1);
        }
        let marginal = self.marginal_value(option, 0);
        if marginal <= 0 {
            1
        } else {
            (marginal as u128).saturating_add(1)
        }
    }
}

fn to_i128(v: u128) -> i128 {
    i128::try_from(v).unwrap_or(i128::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
