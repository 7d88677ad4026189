//! Monetary policy parameters.
//!
//! Loaded once from chain settings at startup and read-only afterwards.
//! All amounts are wavelets.

use crate::errors::{Result, RewardError};
use serde::{Deserialize, Serialize};
use waves_types::{Address, Wavelets, WAVELETS_PER_WAVES};

/// Fraction of the voting interval a direction must exceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingThreshold {
    pub numer: u64,
    pub denom: u64,
}

impl Default for VotingThreshold {
    fn default() -> Self {
        // strict majority: interval / 2 + 1
        Self { numer: 1, denom: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardsSettings {
    /// Reward at the BlockReward activation height.
    pub initial: Wavelets,
    /// Step applied at a term boundary when a vote passes.
    pub min_increment: Wavelets,
    /// Term length in blocks.
    pub term: u64,
    /// Term length once CappedReward is active.
    pub term_after_capped_reward: u64,
    /// Length of the voting window at the end of each term.
    pub voting_interval: u64,
    pub voting_threshold: VotingThreshold,
    /// Blocks the XTN buy-back share survives CeaseXtnBuyback activation.
    pub min_xtn_buyback_period: u64,
    /// Per-address cap in the capped regime; also the miner floor.
    pub max_address_reward: Wavelets,
    pub boost_multiplier: u64,
    /// Blocks after BoostBlockReward activation during which the boost applies.
    pub boost_period: u64,
    pub dao_address: Option<Address>,
    pub xtn_buyback_address: Option<Address>,
    /// Total WAVES amount at genesis.
    pub initial_supply: Wavelets,
}

impl Default for RewardsSettings {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl RewardsSettings {
    pub fn mainnet() -> Self {
        Self {
            initial: 6 * WAVELETS_PER_WAVES,
            min_increment: WAVELETS_PER_WAVES / 2,
            term: 100_000,
            term_after_capped_reward: 50_000,
            voting_interval: 10_000,
            voting_threshold: VotingThreshold::default(),
            min_xtn_buyback_period: 100_000,
            max_address_reward: 2 * WAVELETS_PER_WAVES,
            boost_multiplier: 10,
            boost_period: 300_000,
            dao_address: None,
            xtn_buyback_address: None,
            initial_supply: 100_000_000 * WAVELETS_PER_WAVES,
        }
    }

    pub fn testnet() -> Self {
        Self {
            min_xtn_buyback_period: 2_000,
            boost_period: 2_000,
            ..Self::mainnet()
        }
    }

    /// Minimum number of same-direction votes for a change.
    pub fn voting_threshold_votes(&self) -> u64 {
        let scaled = (self.voting_interval as u128) * (self.voting_threshold.numer as u128)
            / (self.voting_threshold.denom.max(1) as u128);
        scaled as u64 + 1
    }

    pub fn validate(&self) -> Result<()> {
        if self.term == 0 || self.term_after_capped_reward == 0 {
            return Err(RewardError::InvalidSettings(
                "term lengths must be positive".into(),
            ));
        }

        if self.voting_interval == 0 {
            return Err(RewardError::InvalidSettings(
                "voting interval must be positive".into(),
            ));
        }

        let shortest_term = self.term.min(self.term_after_capped_reward);
        if self.voting_interval > shortest_term {
            return Err(RewardError::InvalidSettings(format!(
                "voting interval {} exceeds term {}",
                self.voting_interval, shortest_term
            )));
        }

        let VotingThreshold { numer, denom } = self.voting_threshold;
        if denom == 0 || numer >= denom {
            return Err(RewardError::InvalidSettings(format!(
                "voting threshold {numer}/{denom} must be a fraction below 1"
            )));
        }

        if self.boost_multiplier == 0 {
            return Err(RewardError::InvalidSettings(
                "boost multiplier must be at least 1".into(),
            ));
        }

        if self
            .max_address_reward
            .checked_mul(self.boost_multiplier)
            .is_none()
        {
            return Err(RewardError::InvalidSettings(
                "boosted address cap overflows".into(),
            ));
        }

        Ok(())
    }
}
