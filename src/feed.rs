//! Round feed.
//!
//! A feed returns a [`GridObservation`]: the raw per-round view of the grid
//! as the collector scraped it. Combined with the protocol constants fixed
//! at startup it becomes the planner's [`RoundSnapshot`].

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::math::GRID_SIZE;
use crate::types::RoundSnapshot;

/// Protocol-level constants injected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConstants {
    pub pool_skim_bps: u64,
    pub reward_per_round: u64,
}

/// One poll of the round feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridObservation {
    pub round_id: u64,
    pub existing_stake: Vec<u64>,
    #[serde(default)]
    pub existing_bettors: Vec<u64>,
    pub remaining_time_units: u64,
    #[serde(default = "default_open")]
    pub round_open: bool,
}

fn default_open() -> bool {
    true
}

impl GridObservation {
    /// Normalize into the planner's input shape.
    ///
    /// `existing_stake` must cover the whole grid. Missing bettor counts
    /// (older collectors) are read as zero.
    pub fn into_snapshot(self, protocol: &ProtocolConstants) -> Result<RoundSnapshot> {
        if self.existing_stake.len() != GRID_SIZE {
            bail!(
                "round {}: expected {GRID_SIZE} stake entries, got {}",
                self.round_id,
                self.existing_stake.len()
            );
        }
        if !self.existing_bettors.is_empty() && self.existing_bettors.len() != GRID_SIZE {
            bail!(
                "round {}: expected {GRID_SIZE} bettor counts, got {}",
                self.round_id,
                self.existing_bettors.len()
            );
        }

        let mut existing_stake = [0u64; GRID_SIZE];
        existing_stake.copy_from_slice(&self.existing_stake);
        let mut existing_bettors = [0u64; GRID_SIZE];
        if !self.existing_bettors.is_empty() {
            existing_bettors.copy_from_slice(&self.existing_bettors);
        }

        Ok(RoundSnapshot {
            round_id: self.round_id,
            existing_stake,
            existing_bettors,
            pool_skim_bps: protocol.pool_skim_bps,
            reward_per_round: protocol.reward_per_round,
            remaining_time_units: self.remaining_time_units,
            round_open: self.round_open,
        })
    }
}

/// Source of round snapshots.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the latest snapshot of the current round.
    async fn fetch(&self) -> Result<RoundSnapshot>;
}

/// Reads a JSON [`GridObservation`] from disk on every fetch.
pub struct JsonFileSource {
    path: PathBuf,
    protocol: ProtocolConstants,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>, protocol: ProtocolConstants) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            protocol,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotSource for JsonFileSource {
    async fn fetch(&self) -> Result<RoundSnapshot> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read snapshot file: {}", self.path.display()))?;
        let observation: GridObservation = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse snapshot file: {}", self.path.display()))?;
        let snapshot = observation.into_snapshot(&self.protocol)?;
        debug!(snapshot = %snapshot, "Snapshot fetched");
        Ok(snapshot)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
