//! Effective reward amount and its per-term adjustment.

use crate::errors::{Result, RewardError};
use crate::settings::RewardsSettings;
use crate::voting::RewardAdjustment;
use serde::{Deserialize, Serialize};
use tracing::info;
use waves_types::{Height, Wavelets};

/// Reward in force and the height its term started.
///
/// Created at BlockReward activation and changed only at term boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardState {
    pub current_reward: Wavelets,
    pub term_start_height: Height,
}

impl RewardState {
    pub fn new(initial: Wavelets, activation: Height) -> Self {
        Self {
            current_reward: initial,
            term_start_height: activation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardAmountLedger {
    min_increment: Wavelets,
}

impl RewardAmountLedger {
    pub fn new(settings: &RewardsSettings) -> Self {
        Self {
            min_increment: settings.min_increment,
        }
    }

    /// One increment in the voted direction, floored at zero.
    pub fn next_reward(&self, current: Wavelets, adjustment: RewardAdjustment) -> Result<Wavelets> {
        match adjustment {
            RewardAdjustment::Increase => current
                .checked_add(self.min_increment)
                .ok_or(RewardError::ArithmeticOverflow("reward increase")),
            RewardAdjustment::Decrease => Ok(current.saturating_sub(self.min_increment)),
            RewardAdjustment::Hold => Ok(current),
        }
    }

    /// Apply a tally outcome at the first height of a new term.
    pub fn apply(
        &self,
        state: &mut RewardState,
        adjustment: RewardAdjustment,
        boundary: Height,
    ) -> Result<Wavelets> {
        if boundary <= state.term_start_height {
            return Err(RewardError::InconsistentState(format!(
                "term boundary {boundary} is not after term start {}",
                state.term_start_height
            )));
        }

        let previous = state.current_reward;
        let next = self.next_reward(previous, adjustment)?;
        if previous.abs_diff(next) > self.min_increment {
            return Err(RewardError::InconsistentState(format!(
                "reward moved from {previous} to {next}, more than one increment"
            )));
        }

        state.current_reward = next;
        state.term_start_height = boundary;

        if next != previous {
            info!(
                target: "rewards",
                height = boundary,
                previous,
                next,
                ?adjustment,
                "block reward changed"
            );
        }

        Ok(next)
    }
}
