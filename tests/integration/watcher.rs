//! Watcher and feed wiring: scripted rounds and the bundled fixture.

use std::path::PathBuf;

use gridsplit::config::AppConfig;
use gridsplit::engine::RoundWatcher;
use gridsplit::feed::{JsonFileSource, SnapshotSource};
use gridsplit::math::GRID_SIZE;
use gridsplit::round::RoundPhase;
use gridsplit::strategy::{plan_with_report, PlanOutcome};
use gridsplit::{RoundSnapshot, StrategyParams};
use rust_decimal::Decimal;

use crate::scripted_source::ScriptedSource;

fn make_snapshot(round_id: u64, remaining: u64) -> RoundSnapshot {
    let mut stakes = [1_500_000_000u64; GRID_SIZE];
    stakes[7] = 80_000_000;
    stakes[19] = 120_000_000;
    RoundSnapshot {
        round_id,
        existing_stake: stakes,
        existing_bettors: [10; GRID_SIZE],
        pool_skim_bps: 1_000,
        reward_per_round: 0,
        remaining_time_units: remaining,
        round_open: true,
    }
}

fn make_params() -> StrategyParams {
    StrategyParams {
        bankroll: 150_000_000,
        max_per_option: 100_000_000,
        min_bet: 10_000,
        tick_size: 1_000,
        unit_value_ratio: Decimal::ZERO,
        deadline_threshold: 3,
    }
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(name)
}

#[tokio::test]
async fn test_watcher_plans_each_round_once() {
    let source = ScriptedSource::new(vec![
        make_snapshot(1, 10),
        make_snapshot(1, 6),
        make_snapshot(1, 3),
        make_snapshot(1, 1),
        make_snapshot(2, 9),
        make_snapshot(2, 2),
    ]);
    let mut watcher = RoundWatcher::new(source.clone(), make_params());

    let mut reports = Vec::new();
    while source.remaining() > 0 {
        if let Some(report) = watcher.poll().await.unwrap() {
            reports.push(report);
        }
    }

    assert_eq!(source.fetch_count(), 6);
    let rounds: Vec<u64> = reports.iter().map(|r| r.round_id).collect();
    assert_eq!(rounds, vec![1, 2]);
    for report in &reports {
        assert_eq!(report.outcome, PlanOutcome::Allocated);
        assert_eq!(report.phase, RoundPhase::ClosingSoon);
        let funded: Vec<usize> = report.plan.allocations().iter().map(|a| a.option_index).collect();
        assert_eq!(funded, vec![7, 19]);
        assert!(report.plan.total_allocated() <= 150_000_000);
    }
}

#[tokio::test]
async fn test_watcher_survives_feed_errors() {
    let source = ScriptedSource::new(vec![make_snapshot(8, 2)]);
    let mut watcher = RoundWatcher::new(source.clone(), make_params());

    source.set_error("collector offline");
    assert!(watcher.poll().await.is_err());
    assert_eq!(watcher.round_id(), None);

    let report = watcher.poll().await.unwrap();
    assert!(report.is_some());
    assert_eq!(watcher.round_id(), Some(8));
}

#[tokio::test]
async fn test_bundled_config_and_fixture_produce_a_plan() {
    let cfg = AppConfig::load(fixture("config.toml").to_str().unwrap()).unwrap();
    let params = cfg.strategy_params();
    let source = JsonFileSource::new(fixture(&cfg.feed.snapshot_path), cfg.protocol_constants());

    let snapshot = source.fetch().await.unwrap();
    let report = plan_with_report(&snapshot, &params).unwrap();

    assert_eq!(report.outcome, PlanOutcome::Allocated);
    assert!(report.plan.total_allocated() <= params.bankroll);
    for a in report.plan.allocations() {
        assert!(snapshot.existing_stake[a.option_index] < 1_000_000_000);
        assert_eq!(a.stake_amount % params.tick_size, 0);
        assert!(report.model.value(a.option_index, a.stake_amount) > 0);
    }
}
