//! Sequential block application for the reward engine.
//!
//! [`RewardLedger`] owns the [`RewardState`] and the vote tally for the open
//! term and keeps one [`BlockRewardRecord`] per applied height. Blocks are
//! applied strictly in height order by a single writer; readers go through
//! [`LedgerView`].

use crate::amount::{RewardAmountLedger, RewardState};
use crate::beneficiaries::BeneficiarySelector;
use crate::distribution::{Distribution, RewardDistributor};
use crate::errors::{Result, RewardError};
use crate::features::{FeatureOracle, FeatureRegistry};
use crate::settings::RewardsSettings;
use crate::term::RewardTermClock;
use crate::voting::{RewardVoteTally, RewardVotes};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::{debug, error, info, trace, warn};
use waves_types::{Address, BlockHeader, FeatureId, Height, RewardVote, Wavelets};

/// Read access to reward history, as consumed by the presenter.
pub trait LedgerView {
    fn settings(&self) -> &RewardsSettings;
    fn features(&self) -> &dyn FeatureOracle;
    /// Height of the last applied block; 0 before genesis.
    fn height(&self) -> Height;
    /// Reward in force at `height`.
    fn reward_at_height(&self, height: Height) -> Option<Wavelets>;
    /// Votes counted so far in the window of the term containing `height`.
    fn reward_votes(&self, height: Height) -> Result<RewardVotes>;
    fn total_waves_amount(&self, height: Height) -> Option<Wavelets>;
}

/// What the reward engine computed for one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRewardRecord {
    pub height: Height,
    pub generator: Address,
    pub reward_vote: i64,
    /// Whether the vote entered the tally open when this block was applied.
    pub vote_counted: bool,
    /// Reward in force; `None` before BlockReward activation and at genesis.
    pub reward: Option<Wavelets>,
    /// Amount minted by this block.
    pub emission: Wavelets,
    pub distribution: Distribution,
    pub total_waves_amount: Wavelets,
}

impl BlockRewardRecord {
    pub fn vote(&self) -> RewardVote {
        RewardVote::new(self.height, self.reward_vote)
    }
}

pub struct RewardLedger {
    settings: RewardsSettings,
    features: FeatureRegistry,
    clock: RewardTermClock,
    amounts: RewardAmountLedger,
    state: Option<RewardState>,
    tally: Option<RewardVoteTally>,
    blocks: Vec<BlockRewardRecord>,
    halted: Option<String>,
}

impl RewardLedger {
    pub fn new(settings: RewardsSettings, features: FeatureRegistry) -> Result<Self> {
        settings.validate()?;

        Ok(Self {
            clock: RewardTermClock::new(&settings),
            amounts: RewardAmountLedger::new(&settings),
            settings,
            features,
            state: None,
            tally: None,
            blocks: Vec::new(),
            halted: None,
        })
    }

    pub fn state(&self) -> Option<RewardState> {
        self.state
    }

    pub fn tally(&self) -> Option<&RewardVoteTally> {
        self.tally.as_ref()
    }

    pub fn record(&self, height: Height) -> Option<&BlockRewardRecord> {
        height
            .checked_sub(1)
            .and_then(|index| self.blocks.get(index as usize))
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    /// Schedule a feature activation above the current height.
    pub fn activate_feature(&mut self, id: FeatureId, height: Height) -> Result<()> {
        if height <= self.height() {
            return Err(RewardError::InconsistentState(format!(
                "cannot activate feature {id} at {height}, chain is already at {}",
                self.height()
            )));
        }
        self.features.activate(id, height)?;
        info!(target: "rewards", feature = %id, height, "feature activation scheduled");
        Ok(())
    }

    /// Apply the next block and return the credits it produces.
    ///
    /// A fatal error halts the ledger until [`RewardLedger::rollback_to`].
    pub fn apply_block(&mut self, header: &BlockHeader) -> Result<BlockRewardRecord> {
        if let Some(reason) = &self.halted {
            return Err(RewardError::InconsistentState(format!(
                "ledger halted pending resync: {reason}"
            )));
        }

        let expected = self.height() + 1;
        if header.height != expected {
            return Err(RewardError::InconsistentState(format!(
                "expected block at height {expected}, got {}",
                header.height
            )));
        }

        match self.apply_next(header) {
            Ok(record) => Ok(record),
            Err(err) if err.is_fatal() => {
                error!(
                    target: "rewards",
                    height = header.height,
                    error = %err,
                    "reward state corrupted, halting block application"
                );
                self.halted = Some(err.to_string());
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Drop every block above `height` and restore state from history.
    pub fn rollback_to(&mut self, height: Height) -> Result<()> {
        let current = self.height();
        if height > current {
            return Err(RewardError::HeightOutOfRange {
                requested: height,
                current,
            });
        }

        self.blocks.truncate(height as usize);
        self.halted = None;
        self.state = None;
        self.tally = None;

        if let (Some(reward), Some(activation)) =
            (self.reward_at_height(height), self.active_activation(height))
        {
            let capped = self.capped_at(height);
            let end = self.clock.next_check(height, activation, capped)?;
            let term = self.clock.current_term(capped);
            self.state = Some(RewardState {
                current_reward: reward,
                term_start_height: (end + 1).saturating_sub(term).max(activation),
            });

            let window = self.clock.voting_window(height, activation, capped)?;
            self.tally = Some(self.tally_from_records(window, reward, height)?);
        }

        info!(target: "rewards", from = current, to = height, "rolled back reward state");
        Ok(())
    }

    fn apply_next(&mut self, header: &BlockHeader) -> Result<BlockRewardRecord> {
        let height = header.height;
        let reward = self.advance_reward_state(height)?;
        let vote_counted = reward.is_some() && self.record_vote(header.vote());

        let plan = BeneficiarySelector::new(&self.settings, &self.features)
            .resolve(height, vec![header.generator]);

        let (emission, distribution) = match reward {
            Some(emission) => (
                emission,
                RewardDistributor::distribute(emission, &plan.beneficiaries, plan.regime)?,
            ),
            None => (0, Distribution::default()),
        };

        let previous_total = self
            .blocks
            .last()
            .map(|b| b.total_waves_amount)
            .unwrap_or(self.settings.initial_supply);
        let total_waves_amount = previous_total
            .checked_add(emission)
            .ok_or(RewardError::ArithmeticOverflow("total waves amount"))?;

        let record = BlockRewardRecord {
            height,
            generator: header.generator,
            reward_vote: header.reward_vote,
            vote_counted,
            reward,
            emission,
            distribution,
            total_waves_amount,
        };

        debug!(
            target: "rewards",
            height,
            emission,
            miners = distribution.miners,
            dao = distribution.dao,
            xtn_buyback = distribution.xtn_buyback,
            "applied block reward"
        );

        self.blocks.push(record.clone());
        Ok(record)
    }

    /// Create, adjust or carry the reward state for `height`.
    fn advance_reward_state(&mut self, height: Height) -> Result<Option<Wavelets>> {
        if height <= 1 {
            return Ok(None);
        }

        let Some(activation) = self.active_activation(height) else {
            return Ok(None);
        };
        let capped = self.capped_at(height);

        match self.state {
            None => {
                let state = RewardState::new(self.settings.initial, activation);
                info!(
                    target: "rewards",
                    height,
                    activation,
                    reward = state.current_reward,
                    "block reward activated"
                );
                self.state = Some(state);
                self.open_tally(height, activation, capped, state.current_reward)?;
            }
            Some(_) if self.clock.is_term_boundary(height, activation, capped) => {
                let tally = self.boundary_tally(height, activation, capped)?;
                let adjustment = tally.tally();
                let state = self.state.as_mut().ok_or_else(|| {
                    RewardError::InconsistentState("reward state vanished".into())
                })?;
                let next = self.amounts.apply(state, adjustment, height)?;

                debug!(
                    target: "rewards",
                    height,
                    increase = tally.votes().increase,
                    decrease = tally.votes().decrease,
                    threshold = tally.threshold(),
                    ?adjustment,
                    "term boundary"
                );
                self.open_tally(height, activation, capped, next)?;
            }
            Some(state) => {
                let expected = self.clock.voting_window(height, activation, capped)?;
                let moved = self
                    .tally
                    .as_ref()
                    .map_or(true, |tally| *tally.window() != expected);
                if moved {
                    info!(
                        target: "rewards",
                        height,
                        start = *expected.start(),
                        end = *expected.end(),
                        "voting window moved"
                    );
                    self.tally =
                        Some(self.tally_from_records(expected, state.current_reward, height - 1)?);
                }
            }
        }

        Ok(self.state.map(|s| s.current_reward))
    }

    /// The tally that closes the term ending at `boundary - 1`.
    ///
    /// The incrementally kept tally must agree with one rebuilt from the
    /// stored votes whenever both cover the same window.
    fn boundary_tally(
        &self,
        boundary: Height,
        activation: Height,
        capped: bool,
    ) -> Result<RewardVoteTally> {
        let closing = boundary - 1;
        let reward = self
            .reward_at_height(closing)
            .ok_or_else(|| {
                RewardError::InconsistentState(format!("no reward recorded at height {closing}"))
            })?;
        let window = self.clock.voting_window(closing, activation, capped)?;
        if *window.end() != closing {
            return Err(RewardError::InconsistentState(format!(
                "voting window ends at {} but term ends at {closing}",
                window.end()
            )));
        }

        let rebuilt = self.tally_from_records(window, reward, closing)?;

        match &self.tally {
            Some(kept) if kept.window() == rebuilt.window() => {
                if kept.votes() != rebuilt.votes() {
                    return Err(RewardError::InconsistentState(format!(
                        "tally {:?} disagrees with stored votes {:?} at height {boundary}",
                        kept.votes(),
                        rebuilt.votes()
                    )));
                }
                Ok(kept.clone())
            }
            _ => Ok(rebuilt),
        }
    }

    fn open_tally(
        &mut self,
        height: Height,
        activation: Height,
        capped: bool,
        reward: Wavelets,
    ) -> Result<()> {
        let window = self.clock.voting_window(height, activation, capped)?;
        self.tally = Some(self.tally_from_records(window, reward, height - 1)?);
        Ok(())
    }

    fn record_vote(&mut self, vote: RewardVote) -> bool {
        let Some(tally) = self.tally.as_mut() else {
            return false;
        };
        if !tally.contains(vote.height) {
            trace!(
                target: "rewards",
                height = vote.height,
                start = *tally.window().start(),
                end = *tally.window().end(),
                "reward vote outside voting window"
            );
            return false;
        }
        match tally.record(vote) {
            Ok(()) => true,
            Err(err) => {
                warn!(target: "rewards", height = vote.height, error = %err, "dropped reward vote");
                false
            }
        }
    }

    /// Replay votes of `window` up to and including `upto`.
    ///
    /// Only votes counted when their block was applied are replayed.
    fn tally_from_records(
        &self,
        window: RangeInclusive<Height>,
        reward: Wavelets,
        upto: Height,
    ) -> Result<RewardVoteTally> {
        let mut tally = RewardVoteTally::new(
            window.clone(),
            reward,
            self.settings.voting_threshold_votes(),
        );

        let last = upto.min(*window.end());
        for height in *window.start()..=last {
            match self.record(height) {
                Some(record) if record.vote_counted => tally.record(record.vote())?,
                _ => {}
            }
        }

        Ok(tally)
    }

    fn active_activation(&self, height: Height) -> Option<Height> {
        self.features
            .activation_height(FeatureId::BLOCK_REWARD)
            .filter(|&at| at <= height)
    }

    fn capped_at(&self, height: Height) -> bool {
        self.features
            .is_active_at_height(FeatureId::CAPPED_REWARD, height)
    }
}

impl LedgerView for RewardLedger {
    fn settings(&self) -> &RewardsSettings {
        &self.settings
    }

    fn features(&self) -> &dyn FeatureOracle {
        &self.features
    }

    fn height(&self) -> Height {
        self.blocks.len() as Height
    }

    fn reward_at_height(&self, height: Height) -> Option<Wavelets> {
        self.record(height).and_then(|r| r.reward)
    }

    fn reward_votes(&self, height: Height) -> Result<RewardVotes> {
        let current = self.height();
        if height > current {
            return Err(RewardError::HeightOutOfRange {
                requested: height,
                current,
            });
        }

        let activation = self
            .active_activation(height)
            .ok_or(RewardError::FeatureNotActivated { height })?;
        let window = self
            .clock
            .voting_window(height, activation, self.capped_at(height))?;
        if height < *window.start() {
            return Ok(RewardVotes::default());
        }

        if height == current {
            if let Some(tally) = self.tally.as_ref().filter(|t| *t.window() == window) {
                return Ok(tally.votes());
            }
        }

        let reward = self
            .reward_at_height(height)
            .ok_or(RewardError::FeatureNotActivated { height })?;
        Ok(self.tally_from_records(window, reward, height)?.votes())
    }

    fn total_waves_amount(&self, height: Height) -> Option<Wavelets> {
        self.record(height).map(|r| r.total_waves_amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn miner() -> Address {
        Address::from_public_key(b'W', &[5u8; 32])
    }

    fn small_settings() -> RewardsSettings {
        RewardsSettings {
            initial: 600_000_000,
            min_increment: 50_000_000,
            term: 10,
            term_after_capped_reward: 5,
            voting_interval: 4,
            ..RewardsSettings::mainnet()
        }
    }

    fn ledger_with(activations: &[(FeatureId, Height)]) -> RewardLedger {
        let mut features = FeatureRegistry::new();
        for &(id, height) in activations {
            features.activate(id, height).unwrap();
        }
        RewardLedger::new(small_settings(), features).unwrap()
    }

    fn apply_range(ledger: &mut RewardLedger, heights: RangeInclusive<Height>, vote: i64) {
        for height in heights {
            ledger
                .apply_block(&BlockHeader::new(height, miner(), vote))
                .unwrap();
        }
    }

    #[test]
    fn no_reward_before_activation() {
        let mut ledger = ledger_with(&[(FeatureId::BLOCK_REWARD, 3)]);
        apply_range(&mut ledger, 1..=2, -1);

        assert_eq!(ledger.reward_at_height(2), None);
        assert_eq!(ledger.total_waves_amount(2), Some(small_settings().initial_supply));

        let record = ledger
            .apply_block(&BlockHeader::new(3, miner(), -1))
            .unwrap();
        assert_eq!(record.reward, Some(600_000_000));
        assert_eq!(record.distribution.miners, 600_000_000);
        assert_eq!(
            ledger.total_waves_amount(3),
            Some(small_settings().initial_supply + 600_000_000)
        );
    }

    #[test]
    fn reward_increases_after_majority_vote() {
        // activation 2: term covers 2..=11, window 8..=11, boundary 12
        let mut ledger = ledger_with(&[(FeatureId::BLOCK_REWARD, 2)]);
        apply_range(&mut ledger, 1..=7, -1);
        apply_range(&mut ledger, 8..=11, 700_000_000);

        assert_eq!(ledger.reward_votes(11).unwrap().increase, 4);
        assert_eq!(ledger.reward_at_height(11), Some(600_000_000));

        apply_range(&mut ledger, 12..=12, -1);
        assert_eq!(ledger.reward_at_height(12), Some(650_000_000));
        assert_eq!(ledger.state().unwrap().term_start_height, 12);
        assert_eq!(ledger.reward_votes(12).unwrap(), RewardVotes::default());
    }

    #[test]
    fn votes_outside_window_are_ignored() {
        let mut ledger = ledger_with(&[(FeatureId::BLOCK_REWARD, 2)]);
        apply_range(&mut ledger, 1..=7, 0);
        apply_range(&mut ledger, 8..=9, -1);
        apply_range(&mut ledger, 10..=12, -1);

        assert!(!ledger.record(7).unwrap().vote_counted);
        assert!(ledger.record(8).unwrap().vote_counted);
        assert_eq!(ledger.reward_at_height(12), Some(600_000_000));
    }

    #[test]
    fn out_of_order_block_rejected_without_halting() {
        let mut ledger = ledger_with(&[(FeatureId::BLOCK_REWARD, 2)]);
        apply_range(&mut ledger, 1..=3, -1);

        let err = ledger
            .apply_block(&BlockHeader::new(5, miner(), -1))
            .unwrap_err();
        assert!(matches!(err, RewardError::InconsistentState(_)));
        assert!(!ledger.is_halted());
        apply_range(&mut ledger, 4..=4, -1);
    }

    #[test]
    fn corrupted_tally_halts_until_rollback() {
        let mut ledger = ledger_with(&[(FeatureId::BLOCK_REWARD, 2)]);
        apply_range(&mut ledger, 1..=9, 700_000_000);

        // simulate a lost vote in the incremental tally
        let window = ledger.tally().unwrap().window().clone();
        ledger.tally = Some(RewardVoteTally::new(window, 600_000_000, 3));
        apply_range(&mut ledger, 10..=11, 700_000_000);

        let err = ledger
            .apply_block(&BlockHeader::new(12, miner(), -1))
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(ledger.is_halted());
        assert!(ledger
            .apply_block(&BlockHeader::new(12, miner(), -1))
            .is_err());

        ledger.rollback_to(11).unwrap();
        assert!(!ledger.is_halted());
        apply_range(&mut ledger, 12..=12, -1);
        assert_eq!(ledger.reward_at_height(12), Some(650_000_000));
    }

    #[test]
    fn rollback_restores_tally_and_supply() {
        let mut ledger = ledger_with(&[(FeatureId::BLOCK_REWARD, 2)]);
        apply_range(&mut ledger, 1..=7, -1);
        apply_range(&mut ledger, 8..=10, 700_000_000);
        let supply_at_9 = ledger.total_waves_amount(9).unwrap();

        ledger.rollback_to(9).unwrap();
        assert_eq!(ledger.height(), 9);
        assert_eq!(ledger.tally().unwrap().votes().increase, 2);
        assert_eq!(ledger.total_waves_amount(9), Some(supply_at_9));

        apply_range(&mut ledger, 10..=11, 0);
        apply_range(&mut ledger, 12..=12, -1);
        // 2 increase vs 2 decrease: below threshold 3
        assert_eq!(ledger.reward_at_height(12), Some(600_000_000));

        assert!(matches!(
            ledger.rollback_to(20),
            Err(RewardError::HeightOutOfRange { .. })
        ));
    }

    #[test]
    fn capped_rewards_shorten_the_term() {
        let mut ledger = ledger_with(&[
            (FeatureId::BLOCK_REWARD, 2),
            (FeatureId::CAPPED_REWARD, 3),
        ]);
        // term 5 from activation 2: 2..=6, window 3..=6, boundary 7
        apply_range(&mut ledger, 1..=2, -1);
        apply_range(&mut ledger, 3..=6, 0);
        apply_range(&mut ledger, 7..=7, -1);

        assert_eq!(ledger.reward_at_height(7), Some(550_000_000));
    }

    #[test]
    fn capped_activation_mid_term_ignores_earlier_votes() {
        // term 20 from activation 2: window 18..=21 until CappedReward at 11
        // moves it to 8..=11, with the boundary at 12
        let settings = RewardsSettings {
            term: 20,
            term_after_capped_reward: 10,
            ..small_settings()
        };
        let mut features = FeatureRegistry::new();
        features.activate(FeatureId::BLOCK_REWARD, 2).unwrap();
        features.activate(FeatureId::CAPPED_REWARD, 11).unwrap();
        let mut ledger = RewardLedger::new(settings, features).unwrap();

        apply_range(&mut ledger, 1..=7, -1);
        apply_range(&mut ledger, 8..=11, 700_000_000);

        assert!(!ledger.record(9).unwrap().vote_counted);
        assert!(ledger.record(11).unwrap().vote_counted);
        assert_eq!(ledger.tally().unwrap().window(), &(8..=11));
        assert_eq!(ledger.reward_votes(11).unwrap().increase, 1);

        apply_range(&mut ledger, 12..=12, -1);
        assert_eq!(ledger.reward_at_height(12), Some(600_000_000));

        ledger.rollback_to(11).unwrap();
        assert_eq!(ledger.tally().unwrap().votes().increase, 1);
        apply_range(&mut ledger, 12..=12, -1);
        assert_eq!(ledger.reward_at_height(12), Some(600_000_000));
    }

    #[test]
    fn boost_raises_cap_and_credits_sum_to_reward() {
        let settings = RewardsSettings {
            initial: 6_500_000_000,
            boost_period: 3,
            dao_address: Some(Address::from_public_key(b'W', &[1u8; 32])),
            xtn_buyback_address: Some(Address::from_public_key(b'W', &[2u8; 32])),
            ..small_settings()
        };
        let mut features = FeatureRegistry::new();
        for id in [
            FeatureId::BLOCK_REWARD,
            FeatureId::BLOCK_REWARD_DISTRIBUTION,
            FeatureId::CAPPED_REWARD,
            FeatureId::BOOST_BLOCK_REWARD,
        ] {
            features.activate(id, 2).unwrap();
        }
        let mut ledger = RewardLedger::new(settings, features).unwrap();
        apply_range(&mut ledger, 1..=6, -1);

        let boosted = ledger.record(3).unwrap();
        assert_eq!(boosted.emission, 6_500_000_000);
        assert_eq!(
            boosted.distribution,
            Distribution {
                miners: 2_500_000_000,
                dao: 2_000_000_000,
                xtn_buyback: 2_000_000_000,
            }
        );
        assert_eq!(ledger.record(5).unwrap().distribution.dao, 200_000_000);

        for height in 2..=6 {
            let record = ledger.record(height).unwrap();
            let info = crate::presenter::RewardInfoPresenter::present(&ledger, height).unwrap();
            assert_eq!(record.distribution.total(), Some(info.current_reward));
            assert_eq!(record.emission, info.current_reward);
        }
    }

    #[test]
    fn feature_activation_must_be_in_the_future() {
        let mut ledger = ledger_with(&[]);
        apply_range(&mut ledger, 1..=3, -1);

        assert!(ledger.activate_feature(FeatureId::BLOCK_REWARD, 3).is_err());
        ledger.activate_feature(FeatureId::BLOCK_REWARD, 4).unwrap();
        apply_range(&mut ledger, 4..=4, -1);
        assert_eq!(ledger.reward_at_height(4), Some(600_000_000));
    }
}
