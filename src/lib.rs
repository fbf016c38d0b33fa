//! GRIDSPLIT: EV-maximizing stake allocation for a 25-option pari-mutuel grid.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod engine;
pub mod feed;
pub mod math;
pub mod round;
pub mod strategy;
pub mod types;

pub use strategy::{plan, plan_with_report, PlanOutcome, PlanReport};
pub use types::{AllocationPlan, PlanError, RoundSnapshot, StrategyParams};
