//! Allocation planner: prefilter → value model + lambda solver → snapper.
//!
//! [`plan`] is a pure function of one `RoundSnapshot` and one
//! `StrategyParams`. It never performs I/O; the only side effects are
//! `tracing` events.

pub mod prefilter;
pub mod snapper;
pub mod solver;
pub mod value;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::math::{floor_to_tick, GRID_SIZE, MAX_POOL_AMOUNT};
use crate::round::RoundPhase;
use crate::types::{AllocationPlan, PlanError, RoundSnapshot, StrategyParams};
use snapper::ConstraintSnapper;
use solver::{LambdaSolver, Solution};
use value::ValueModel;

/// Upper bound on re-pricing passes of the pool state.
pub const MAX_POOL_PASSES: u32 = 4;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Why the plan looks the way it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlanOutcome {
    /// At least one option funded.
    Allocated,
    /// Countdown still above the deadline threshold.
    TooEarly,
    RoundLocked,
    EmptyBankroll,
    /// Bankroll below the minimum bet.
    InfeasibleBudget,
    /// No option can be EV-positive.
    NoPositiveEv,
    /// The solver funded options but snapping zeroed all of them.
    RoundedAway,
}

impl PlanOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanOutcome::Allocated => "allocated",
            PlanOutcome::TooEarly => "too_early",
            PlanOutcome::RoundLocked => "round_locked",
            PlanOutcome::EmptyBankroll => "empty_bankroll",
            PlanOutcome::InfeasibleBudget => "infeasible_budget",
            PlanOutcome::NoPositiveEv => "no_positive_ev",
            PlanOutcome::RoundedAway => "rounded_away",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PlanWarning {
    /// The solver stopped before the budget was met within one tick.
    ConvergenceShortfall { iterations: u32, gap: u64 },
}

/// Plan plus the diagnostics of the run that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub round_id: u64,
    pub plan: AllocationPlan,
    pub outcome: PlanOutcome,
    pub phase: RoundPhase,
    /// Shadow price of the bankroll, fixed point.
    pub lambda: u128,
    pub solver_iterations: u32,
    pub pool_passes: u32,
    pub warnings: Vec<PlanWarning>,
    /// Σ value(i, stake) under `model`.
    pub expected_value: i128,
    pub unspent: u64,
    /// Model the final EV check ran against.
    pub model: ValueModel,
}

impl PlanReport {
    fn empty(
        snapshot: &RoundSnapshot,
        params: &StrategyParams,
        phase: RoundPhase,
        model: ValueModel,
        outcome: PlanOutcome,
    ) -> Self {
        Self {
            round_id: snapshot.round_id,
            plan: AllocationPlan::empty(),
            outcome,
            phase,
            lambda: 0,
            solver_iterations: 0,
            pool_passes: 0,
            warnings: Vec::new(),
            expected_value: 0,
            unspent: params.bankroll,
            model,
        }
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// Composes the strategy stages. Stateless between calls.
#[derive(Debug, Clone, Default)]
pub struct AllocationPlanner {
    solver: LambdaSolver,
}

impl AllocationPlanner {
    pub fn new(solver: LambdaSolver) -> Self {
        Self { solver }
    }

    pub fn plan_with_report(
        &self,
        snapshot: &RoundSnapshot,
        params: &StrategyParams,
    ) -> Result<PlanReport, PlanError> {
        let reward_value = validate(snapshot, params)?;

        let inconsistent = snapshot.inconsistent_options();
        if !inconsistent.is_empty() {
            warn!(
                round_id = snapshot.round_id,
                options = ?inconsistent,
                "Stake recorded on options without bettors"
            );
        }

        let phase = RoundPhase::classify(
            snapshot.remaining_time_units,
            params.deadline_threshold,
            snapshot.round_open,
        );
        let model = ValueModel::new(snapshot, reward_value, params.bankroll, params.min_bet);

        let guard = match phase {
            RoundPhase::Locked => Some(PlanOutcome::RoundLocked),
            RoundPhase::Open => Some(PlanOutcome::TooEarly),
            RoundPhase::ClosingSoon if params.bankroll == 0 => Some(PlanOutcome::EmptyBankroll),
            RoundPhase::ClosingSoon if params.bankroll < params.min_bet => {
                Some(PlanOutcome::InfeasibleBudget)
            }
            RoundPhase::ClosingSoon => None,
        };
        if let Some(outcome) = guard {
            info!(
                round_id = snapshot.round_id,
                phase = %phase,
                outcome = outcome.as_str(),
                "Planner skipped"
            );
            return Ok(PlanReport::empty(snapshot, params, phase, model, outcome));
        }

        let mut candidates = prefilter::candidates(&model);
        if candidates.is_empty() {
            info!(round_id = snapshot.round_id, "No EV-positive option on the grid");
            let outcome = PlanOutcome::NoPositiveEv;
            return Ok(PlanReport::empty(snapshot, params, phase, model, outcome));
        }

        // Own deployment feeds every option's pot, so it is re-priced until
        // the solved total stops moving.
        let cap = floor_to_tick(params.max_per_option, params.tick_size);
        let mut deployment = params
            .bankroll
            .min((candidates.len() as u64).saturating_mul(cap));
        let mut model = model;
        let mut solution = Solution::empty();
        let mut solver_iterations = 0;
        let mut pool_passes = 0;
        for _ in 0..MAX_POOL_PASSES {
            pool_passes += 1;
            model = model.with_deployment(deployment);
            prefilter::retain_candidates(&model, &mut candidates);
            solution = self
                .solver
                .solve(&model, &candidates, params.bankroll, cap, params.tick_size);
            solver_iterations += solution.iterations;
            if solution.total == 0 || solution.total >= deployment {
                break;
            }
            deployment = solution.total;
        }

        let mut warnings = Vec::new();
        if !solution.converged {
            let gap = solution.gap(params.bankroll);
            warn!(
                round_id = snapshot.round_id,
                iterations = solution.iterations,
                gap,
                "Shadow price did not converge to tick precision"
            );
            warnings.push(PlanWarning::ConvergenceShortfall {
                iterations: solution.iterations,
                gap,
            });
        }

        let snapper = ConstraintSnapper::new(params);
        let mut stakes = snapper.snap(&solution.stakes, &model);

        // Snapping lowers our deployment, which lowers every pot; settle
        // until the EV check passes under the deployment actually placed.
        loop {
            let total: u64 = stakes.iter().sum();
            model = model.with_deployment(total);
            if snapper.retain_positive_ev(&mut stakes, &model) == 0 {
                break;
            }
        }

        let plan = AllocationPlan::from_stakes(&stakes);
        let outcome = if solution.total == 0 {
            PlanOutcome::NoPositiveEv
        } else if plan.is_empty() {
            PlanOutcome::RoundedAway
        } else {
            PlanOutcome::Allocated
        };
        let expected_value: i128 = (0..GRID_SIZE).map(|i| model.value(i, stakes[i])).sum();

        info!(
            round_id = snapshot.round_id,
            outcome = outcome.as_str(),
            funded = plan.len(),
            total = plan.total_allocated(),
            bankroll = params.bankroll,
            lambda = solution.lambda,
            expected_value,
            "Allocation planned: {}",
            plan
        );

        Ok(PlanReport {
            round_id: snapshot.round_id,
            unspent: params.bankroll - plan.total_allocated(),
            plan,
            outcome,
            phase,
            lambda: solution.lambda,
            solver_iterations,
            pool_passes,
            warnings,
            expected_value,
            model,
        })
    }

    pub fn plan(
        &self,
        snapshot: &RoundSnapshot,
        params: &StrategyParams,
    ) -> Result<AllocationPlan, PlanError> {
        self.plan_with_report(snapshot, params).map(|report| report.plan)
    }
}

/// Plan one round with the default solver.
pub fn plan(
    snapshot: &RoundSnapshot,
    params: &StrategyParams,
) -> Result<AllocationPlan, PlanError> {
    AllocationPlanner::default().plan(snapshot, params)
}

/// [`plan`] with diagnostics.
pub fn plan_with_report(
    snapshot: &RoundSnapshot,
    params: &StrategyParams,
) -> Result<PlanReport, PlanError> {
    AllocationPlanner::default().plan_with_report(snapshot, params)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check the inputs and return the round reward in bankroll units.
pub fn validate(snapshot: &RoundSnapshot, params: &StrategyParams) -> Result<u64, PlanError> {
    let invalid = |msg: String| Err(PlanError::InvalidParameters(msg));

    if params.tick_size == 0 {
        return invalid("tick_size must be positive".into());
    }
    if params.min_bet == 0 {
        return invalid("min_bet must be positive".into());
    }
    if params.max_per_option == 0 {
        return invalid("max_per_option must be positive".into());
    }
    if params.min_bet % params.tick_size != 0 {
        return invalid(format!(
            "min_bet {} is not a multiple of tick_size {}",
            params.min_bet, params.tick_size
        ));
    }
    if params.max_per_option % params.tick_size != 0 {
        return invalid(format!(
            "max_per_option {} is not a multiple of tick_size {}",
            params.max_per_option, params.tick_size
        ));
    }
    if params.min_bet > params.max_per_option {
        return invalid(format!(
            "min_bet {} exceeds max_per_option {}",
            params.min_bet, params.max_per_option
        ));
    }
    if snapshot.pool_skim_bps > 10_000 {
        return invalid(format!("pool_skim_bps {} exceeds 10000", snapshot.pool_skim_bps));
    }
    if params.unit_value_ratio < Decimal::ZERO {
        return invalid(format!("unit_value_ratio {} is negative", params.unit_value_ratio));
    }

    let reward_value = match Decimal::from(snapshot.reward_per_round)
        .checked_mul(params.unit_value_ratio)
        .and_then(|v| v.floor().to_u64())
    {
        Some(v) => v,
        None => {
            return invalid(format!(
                "reward {} x {} is not representable",
                snapshot.reward_per_round, params.unit_value_ratio
            ))
        }
    };

    let pool = snapshot.total_stake() + params.bankroll as u128 + reward_value as u128;
    if pool > MAX_POOL_AMOUNT {
        return invalid(format!(
            "pool {pool} (stake + bankroll + reward) exceeds supported range {MAX_POOL_AMOUNT}"
        ));
    }

    Ok(reward_value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
