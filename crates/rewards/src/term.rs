//! Reward term arithmetic.
//!
//! Terms are aligned to the BlockReward activation height, not to genesis.
//! With activation `A` and term `T`, term `k` covers `[A + kT, A + (k+1)T - 1]`;
//! the last height of a term is its "next check", and the voting window is the
//! final `voting_interval` heights of the term. The reward changes at the
//! first height of the following term.

use crate::errors::{Result, RewardError};
use crate::settings::RewardsSettings;
use std::ops::RangeInclusive;
use waves_types::Height;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardTermClock {
    term: u64,
    term_after_capped_reward: u64,
    voting_interval: u64,
}

impl RewardTermClock {
    pub fn new(settings: &RewardsSettings) -> Self {
        Self {
            term: settings.term.max(1),
            term_after_capped_reward: settings.term_after_capped_reward.max(1),
            voting_interval: settings.voting_interval,
        }
    }

    pub fn current_term(&self, capped_rewards_active: bool) -> u64 {
        if capped_rewards_active {
            self.term_after_capped_reward
        } else {
            self.term
        }
    }

    pub fn voting_interval(&self) -> u64 {
        self.voting_interval
    }

    /// Last height of the term containing `height`.
    ///
    /// Height 1 is genesis and never carries reward information.
    pub fn next_check(
        &self,
        height: Height,
        activation: Height,
        capped_rewards_active: bool,
    ) -> Result<Height> {
        if height <= 1 || height < activation {
            return Err(RewardError::FeatureNotActivated { height });
        }

        let term = self.current_term(capped_rewards_active);
        let elapsed = height - activation + 1;
        let terms = elapsed.div_ceil(term);

        terms
            .checked_mul(term)
            .and_then(|span| activation.checked_add(span))
            .map(|end| end - 1)
            .ok_or(RewardError::ArithmeticOverflow("next check height"))
    }

    pub fn voting_interval_start(&self, next_check: Height) -> Height {
        next_check.saturating_sub(self.voting_interval) + 1
    }

    /// Inclusive voting window of the term containing `height`.
    pub fn voting_window(
        &self,
        height: Height,
        activation: Height,
        capped_rewards_active: bool,
    ) -> Result<RangeInclusive<Height>> {
        let end = self.next_check(height, activation, capped_rewards_active)?;
        Ok(self.voting_interval_start(end)..=end)
    }

    /// True when `height` opens a new term, i.e. the reward may change here.
    pub fn is_term_boundary(
        &self,
        height: Height,
        activation: Height,
        capped_rewards_active: bool,
    ) -> bool {
        height > activation
            && (height - activation) % self.current_term(capped_rewards_active) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(term: u64, term_after: u64, voting_interval: u64) -> RewardTermClock {
        RewardTermClock::new(&RewardsSettings {
            term,
            term_after_capped_reward: term_after,
            voting_interval,
            ..RewardsSettings::mainnet()
        })
    }

    #[test]
    fn next_check_is_aligned_to_activation() {
        let clock = clock(100_000, 50_000, 10_000);

        assert_eq!(clock.next_check(1_000, 1_000, false).unwrap(), 100_999);
        assert_eq!(clock.next_check(100_999, 1_000, false).unwrap(), 100_999);
        assert_eq!(clock.next_check(101_000, 1_000, false).unwrap(), 200_999);
        assert_eq!(clock.next_check(101_000, 1_000, true).unwrap(), 150_999);
    }

    #[test]
    fn voting_window_covers_last_interval_of_term() {
        let clock = clock(10, 5, 4);
        let window = clock.voting_window(3, 2, false).unwrap();
        assert_eq!(window, 8..=11);
        assert_eq!(clock.voting_interval_start(11), 8);

        let window = clock.voting_window(12, 2, false).unwrap();
        assert_eq!(window, 18..=21);
    }

    #[test]
    fn boundary_detection() {
        let clock = clock(10, 5, 4);
        assert!(!clock.is_term_boundary(2, 2, false));
        assert!(clock.is_term_boundary(12, 2, false));
        assert!(!clock.is_term_boundary(7, 2, false));
        assert!(clock.is_term_boundary(7, 2, true));
    }

    #[test]
    fn genesis_and_pre_activation_rejected() {
        let clock = clock(10, 5, 4);
        assert_eq!(
            clock.next_check(1, 1, false),
            Err(RewardError::FeatureNotActivated { height: 1 })
        );
        assert_eq!(
            clock.next_check(5, 6, false),
            Err(RewardError::FeatureNotActivated { height: 5 })
        );
        assert_eq!(clock.next_check(2, 1, false).unwrap(), 10);
    }

    #[test]
    fn term_switches_with_capped_rewards() {
        let clock = clock(100_000, 50_000, 10_000);
        assert_eq!(clock.current_term(false), 100_000);
        assert_eq!(clock.current_term(true), 50_000);
    }
}
