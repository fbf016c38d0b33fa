//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. The
//! planner never sees this type: the harness converts it into explicit
//! `StrategyParams` and `ProtocolConstants` once at startup.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;

use crate::feed::ProtocolConstants;
use crate::types::StrategyParams;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub feed: FeedConfig,
    pub protocol: ProtocolConfig,
    pub strategy: StrategyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub name: String,
    /// Delay between feed polls in `watch` mode.
    pub poll_interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    /// JSON grid observation file, rewritten by the feed collector.
    pub snapshot_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProtocolConfig {
    pub pool_skim_bps: u64,
    #[serde(default)]
    pub reward_per_round: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StrategyConfig {
    pub bankroll: u64,
    pub max_per_option: u64,
    pub min_bet: u64,
    pub tick_size: u64,
    #[serde(default)]
    pub unit_value_ratio: Decimal,
    pub deadline_threshold: u64,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    pub fn strategy_params(&self) -> StrategyParams {
        StrategyParams {
            bankroll: self.strategy.bankroll,
            max_per_option: self.strategy.max_per_option,
            min_bet: self.strategy.min_bet,
            tick_size: self.strategy.tick_size,
            unit_value_ratio: self.strategy.unit_value_ratio,
            deadline_threshold: self.strategy.deadline_threshold,
        }
    }

    pub fn protocol_constants(&self) -> ProtocolConstants {
        ProtocolConstants {
            pool_skim_bps: self.protocol.pool_skim_bps,
            reward_per_round: self.protocol.reward_per_round,
        }
    }
}
