//! Read-only projection of reward state for the HTTP API.

use crate::beneficiaries::BeneficiarySelector;
use crate::errors::{Result, RewardError};
use crate::ledger::LedgerView;
use crate::term::RewardTermClock;
use crate::voting::RewardVotes;
use serde::{Deserialize, Serialize};
use waves_types::{Address, FeatureId, Height, Wavelets};

/// Reward snapshot at one height, serialized as `/blockchain/rewards`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardInfo {
    pub height: Height,
    pub total_waves_amount: Wavelets,
    pub current_reward: Wavelets,
    pub min_increment: Wavelets,
    pub term: u64,
    pub next_check: Height,
    pub voting_interval_start: Height,
    pub voting_interval: u64,
    pub voting_threshold: u64,
    pub votes: RewardVotes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dao_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xtn_buyback_address: Option<Address>,
}

pub struct RewardInfoPresenter;

impl RewardInfoPresenter {
    pub fn present<L: LedgerView + ?Sized>(ledger: &L, height: Height) -> Result<RewardInfo> {
        let current = ledger.height();
        if height > current {
            return Err(RewardError::HeightOutOfRange {
                requested: height,
                current,
            });
        }
        if height <= 1 {
            return Err(RewardError::FeatureNotActivated { height });
        }

        let settings = ledger.settings();
        let features = ledger.features();
        let activation = features
            .activation_height(FeatureId::BLOCK_REWARD)
            .filter(|&at| at <= height)
            .ok_or(RewardError::FeatureNotActivated { height })?;
        let capped = features.is_active_at_height(FeatureId::CAPPED_REWARD, height);

        let clock = RewardTermClock::new(settings);
        let next_check = clock.next_check(height, activation, capped)?;

        let current_reward = ledger.reward_at_height(height).ok_or_else(|| {
            RewardError::InconsistentState(format!("no reward recorded at height {height}"))
        })?;
        let total_waves_amount = ledger.total_waves_amount(height).ok_or_else(|| {
            RewardError::InconsistentState(format!("no supply recorded at height {height}"))
        })?;
        let votes = ledger.reward_votes(height)?;
        let (dao_address, xtn_buyback_address) =
            BeneficiarySelector::new(settings, features).treasury_addresses(height);

        Ok(RewardInfo {
            height,
            total_waves_amount,
            current_reward,
            min_increment: settings.min_increment,
            term: clock.current_term(capped),
            next_check,
            voting_interval_start: clock.voting_interval_start(next_check),
            voting_interval: clock.voting_interval(),
            voting_threshold: settings.voting_threshold_votes(),
            votes,
            dao_address,
            xtn_buyback_address,
        })
    }
}
