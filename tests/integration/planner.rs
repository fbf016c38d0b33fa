//! Planner properties: budget, granularity, EV, determinism, monotonicity,
//! degenerate inputs and the reference scenarios.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use gridsplit::math::GRID_SIZE;
use gridsplit::strategy::{plan, plan_with_report, PlanOutcome, PlanReport};
use gridsplit::{PlanError, RoundSnapshot, StrategyParams};

// ---- helpers ---------------------------------------------------------------

fn make_snapshot(stakes: [u64; GRID_SIZE]) -> RoundSnapshot {
    RoundSnapshot {
        round_id: 100,
        existing_stake: stakes,
        existing_bettors: [5; GRID_SIZE],
        pool_skim_bps: 1_000,
        reward_per_round: 0,
        remaining_time_units: 3,
        round_open: true,
    }
}

fn make_params(bankroll: u64, max_per_option: u64, min_bet: u64, tick_size: u64) -> StrategyParams {
    StrategyParams {
        bankroll,
        max_per_option,
        min_bet,
        tick_size,
        unit_value_ratio: Decimal::ZERO,
        deadline_threshold: 5,
    }
}

fn make_random_case(rng: &mut StdRng) -> (RoundSnapshot, StrategyParams) {
    let mut stakes = [0u64; GRID_SIZE];
    let mut bettors = [0u64; GRID_SIZE];
    for i in 0..GRID_SIZE {
        if rng.gen_bool(0.9) {
            stakes[i] = rng.gen_range(1_000_000..=5_000_000_000);
            bettors[i] = rng.gen_range(1..=50);
        }
    }
    let tick_size = [1u64, 100, 1_000][rng.gen_range(0..3)];
    let min_ticks = rng.gen_range(1..=100u64);
    let cap_ticks = rng.gen_range(min_ticks..=min_ticks * 1_000);

    let snapshot = RoundSnapshot {
        round_id: rng.gen(),
        existing_stake: stakes,
        existing_bettors: bettors,
        pool_skim_bps: rng.gen_range(0..=3_000),
        reward_per_round: rng.gen_range(0..=1_000_000_000_000),
        remaining_time_units: rng.gen_range(0..=5),
        round_open: true,
    };
    let params = StrategyParams {
        bankroll: rng.gen_range(0..=5_000_000_000),
        max_per_option: cap_ticks * tick_size,
        min_bet: min_ticks * tick_size,
        tick_size,
        unit_value_ratio: dec!(0.00001),
        deadline_threshold: 5,
    };
    (snapshot, params)
}

fn assert_plan_properties(report: &PlanReport, params: &StrategyParams) {
    let plan = &report.plan;
    assert!(plan.total_allocated() <= params.bankroll);
    assert_eq!(
        plan.total_allocated(),
        plan.allocations().iter().map(|a| a.stake_amount).sum::<u64>()
    );
    let mut previous: Option<usize> = None;
    for a in plan.allocations() {
        assert!(a.option_index < GRID_SIZE);
        if let Some(p) = previous {
            assert!(a.option_index > p, "indices not strictly ascending");
        }
        previous = Some(a.option_index);

        assert!(a.stake_amount > 0);
        assert_eq!(a.stake_amount % params.tick_size, 0);
        assert!(a.stake_amount >= params.min_bet);
        assert!(a.stake_amount <= params.max_per_option);
        assert!(
            report.model.value(a.option_index, a.stake_amount) > 0,
            "option {} stake {} not EV-positive",
            a.option_index,
            a.stake_amount
        );
    }
}

// ---- properties --------------------------------------------------------------

#[test]
fn test_random_rounds_respect_constraints() {
    let mut rng = StdRng::seed_from_u64(0x6e1d_5e11);
    for _ in 0..200 {
        let (snapshot, params) = make_random_case(&mut rng);
        let report = plan_with_report(&snapshot, &params).unwrap();
        assert_plan_properties(&report, &params);
        assert_eq!(report.unspent, params.bankroll - report.plan.total_allocated());
        if report.outcome == PlanOutcome::Allocated {
            assert!(!report.plan.is_empty());
        } else {
            assert!(report.plan.is_empty());
        }
    }
}

#[test]
fn test_identical_inputs_give_identical_bytes() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20 {
        let (snapshot, params) = make_random_case(&mut rng);
        let first = serde_json::to_vec(&plan(&snapshot, &params).unwrap()).unwrap();
        let second = serde_json::to_vec(&plan(&snapshot, &params).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_larger_bankroll_never_allocates_less() {
    let mut stakes = [0u64; GRID_SIZE];
    for (i, stake) in stakes.iter_mut().enumerate() {
        *stake = 100_000_000 * (1 + (i as u64 % 5));
    }
    let snapshot = make_snapshot(stakes);

    let mut previous = 0;
    for bankroll in [
        10_000_000u64,
        50_000_000,
        100_000_000,
        200_000_000,
        400_000_000,
        800_000_000,
        1_600_000_000,
        5_000_000_000,
    ] {
        let params = make_params(bankroll, 200_000_000, 100_000, 1_000);
        let total = plan(&snapshot, &params).unwrap().total_allocated();
        assert!(
            total >= previous,
            "bankroll {bankroll}: allocated {total} < previous {previous}"
        );
        previous = total;
    }
    assert!(previous > 0);
}

// ---- degenerate inputs ---------------------------------------------------------

#[test]
fn test_zero_bankroll_is_empty() {
    let snapshot = make_snapshot([100_000_000; GRID_SIZE]);
    let report = plan_with_report(&snapshot, &make_params(0, 100_000_000, 10_000, 1)).unwrap();
    assert!(report.plan.is_empty());
    assert_eq!(report.outcome, PlanOutcome::EmptyBankroll);
}

#[test]
fn test_bankroll_below_min_bet_is_empty() {
    let snapshot = make_snapshot([100_000_000; GRID_SIZE]);
    let report = plan_with_report(&snapshot, &make_params(9_999, 100_000_000, 10_000, 1)).unwrap();
    assert!(report.plan.is_empty());
    assert_eq!(report.outcome, PlanOutcome::InfeasibleBudget);
}

#[test]
fn test_over_staked_grid_is_empty() {
    let snapshot = make_snapshot([1_000_000_000; GRID_SIZE]);
    let report = plan_with_report(&snapshot, &make_params(1_000_000_000, 100_000_000, 10_000, 1)).unwrap();
    assert!(report.plan.is_empty());
    assert_eq!(report.outcome, PlanOutcome::NoPositiveEv);
}

#[test]
fn test_invalid_parameters_are_errors() {
    let snapshot = make_snapshot([100_000_000; GRID_SIZE]);
    let cases = [
        make_params(1_000, 100, 10, 0),
        make_params(1_000, 0, 0, 1),
        make_params(1_000, 105, 10, 10),
        make_params(1_000, 100, 200, 10),
    ];
    for params in cases {
        let result = plan(&snapshot, &params);
        assert!(
            matches!(result, Err(PlanError::InvalidParameters(_))),
            "accepted {params}"
        );
    }
}

#[test]
fn test_locked_round_is_empty() {
    let mut snapshot = make_snapshot([100_000_000; GRID_SIZE]);
    snapshot.round_open = false;
    snapshot.remaining_time_units = 0;
    let report = plan_with_report(&snapshot, &make_params(1_000_000_000, 100_000_000, 10_000, 1)).unwrap();
    assert!(report.plan.is_empty());
    assert_eq!(report.outcome, PlanOutcome::RoundLocked);
}

// ---- scenarios -------------------------------------------------------------------

/// Fresh round, nobody staked yet, reward worth entering for.
#[test]
fn test_symmetric_fresh_round_spreads_evenly() {
    let mut snapshot = make_snapshot([0; GRID_SIZE]);
    snapshot.existing_bettors = [0; GRID_SIZE];
    snapshot.reward_per_round = 100_000_000_000;
    let mut params = make_params(300_000_000, 100_000_000, 10_000, 1);
    params.unit_value_ratio = dec!(0.00005);

    let report = plan_with_report(&snapshot, &params).unwrap();
    assert_eq!(report.outcome, PlanOutcome::Allocated);
    assert_plan_properties(&report, &params);

    let first = report.plan.allocations()[0].stake_amount;
    for a in report.plan.allocations() {
        assert_eq!(a.stake_amount, first);
        assert!(a.stake_amount <= params.max_per_option);
    }
    assert_eq!(report.plan.len(), GRID_SIZE);
    assert_eq!(first, params.min_bet);
}

/// Fresh round with a budget too small to enter every option: as many
/// whole minimum bets as fit are placed, lowest index first.
#[test]
fn test_fresh_round_with_tight_budget_funds_what_fits() {
    let mut snapshot = make_snapshot([0; GRID_SIZE]);
    snapshot.existing_bettors = [0; GRID_SIZE];
    snapshot.reward_per_round = 100_000_000_000;

    for bankroll in [10_000u64, 100_000, 105_000, 240_000] {
        let mut params = make_params(bankroll, 100_000_000, 10_000, 1);
        params.unit_value_ratio = dec!(0.00005);

        let report = plan_with_report(&snapshot, &params).unwrap();
        assert_eq!(report.outcome, PlanOutcome::Allocated, "bankroll {bankroll}");
        assert!(report.warnings.is_empty(), "bankroll {bankroll}: {:?}", report.warnings);
        assert_plan_properties(&report, &params);

        let expected = (bankroll / params.min_bet) as usize;
        let funded: Vec<usize> = report.plan.allocations().iter().map(|a| a.option_index).collect();
        assert_eq!(funded, (0..expected).collect::<Vec<_>>());
        assert!(report.plan.allocations().iter().all(|a| a.stake_amount == params.min_bet));
    }
}

/// Deadline guard: nothing is planned before the window opens.
#[test]
fn test_deadline_guard() {
    let mut stakes = [2_000_000_000u64; GRID_SIZE];
    stakes[0] = 50_000_000;
    let mut snapshot = make_snapshot(stakes);
    snapshot.remaining_time_units = 6;

    let report = plan_with_report(&snapshot, &make_params(1_000_000_000, 100_000_000, 10_000, 1)).unwrap();
    assert!(report.plan.is_empty());
    assert_eq!(report.outcome, PlanOutcome::TooEarly);

    snapshot.remaining_time_units = 5;
    let report = plan_with_report(&snapshot, &make_params(1_000_000_000, 100_000_000, 10_000, 1)).unwrap();
    assert!(!report.plan.is_empty());
}

/// Saturation: a huge bankroll funds every EV-positive option at the cap.
#[test]
fn test_saturation_caps_every_positive_option() {
    let mut stakes = [2_000_000_000u64; GRID_SIZE];
    for stake in stakes.iter_mut().take(5) {
        *stake = 100_000_000;
    }
    let snapshot = make_snapshot(stakes);
    let bankroll = 1_000_000_000_000;
    let params = make_params(bankroll, 100_000_000, 10_000, 1);

    let report = plan_with_report(&snapshot, &params).unwrap();
    assert_plan_properties(&report, &params);
    let funded: Vec<usize> = report.plan.allocations().iter().map(|a| a.option_index).collect();
    assert_eq!(funded, vec![0, 1, 2, 3, 4]);
    for a in report.plan.allocations() {
        assert_eq!(a.stake_amount, params.max_per_option);
    }
    assert_eq!(report.unspent, bankroll - 500_000_000);
}
