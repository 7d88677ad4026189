//! Reward vote tally for a single voting window.

use crate::errors::{Result, RewardError};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::trace;
use waves_types::{Height, RewardVote};

/// Counted votes relative to the reward in force during the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardVotes {
    pub increase: u64,
    pub decrease: u64,
}

/// Outcome of a tally at a term boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardAdjustment {
    Increase,
    Decrease,
    Hold,
}

/// Accumulates one vote per block inside `[start, next_check]`.
///
/// Votes must arrive in block order; a vote at or below the last recorded
/// height is a duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardVoteTally {
    window: RangeInclusive<Height>,
    current_reward: u64,
    threshold: u64,
    last_recorded: Option<Height>,
    votes: RewardVotes,
}

impl RewardVoteTally {
    pub fn new(window: RangeInclusive<Height>, current_reward: u64, threshold: u64) -> Self {
        Self {
            window,
            current_reward,
            threshold,
            last_recorded: None,
            votes: RewardVotes::default(),
        }
    }

    pub fn window(&self) -> &RangeInclusive<Height> {
        &self.window
    }

    pub fn contains(&self, height: Height) -> bool {
        self.window.contains(&height)
    }

    pub fn current_reward(&self) -> u64 {
        self.current_reward
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn last_recorded(&self) -> Option<Height> {
        self.last_recorded
    }

    pub fn votes(&self) -> RewardVotes {
        self.votes
    }

    pub fn record(&mut self, vote: RewardVote) -> Result<()> {
        if !self.contains(vote.height) {
            return Err(RewardError::InvalidVote {
                height: vote.height,
                reason: format!(
                    "outside voting window {}..={}",
                    self.window.start(),
                    self.window.end()
                ),
            });
        }

        if let Some(last) = self.last_recorded {
            if vote.height <= last {
                return Err(RewardError::InvalidVote {
                    height: vote.height,
                    reason: format!("already recorded a vote up to height {last}"),
                });
            }
        }

        self.last_recorded = Some(vote.height);

        if vote.is_abstention() {
            return Ok(());
        }

        let desired = vote.desired_reward as u64;
        if desired > self.current_reward {
            self.votes.increase += 1;
        } else if desired < self.current_reward {
            self.votes.decrease += 1;
        }

        trace!(
            target: "rewards",
            height = vote.height,
            desired,
            increase = self.votes.increase,
            decrease = self.votes.decrease,
            "recorded reward vote"
        );

        Ok(())
    }

    /// Direction decided by the recorded votes.
    pub fn tally(&self) -> RewardAdjustment {
        let RewardVotes { increase, decrease } = self.votes;
        let increase_passes = increase >= self.threshold;
        let decrease_passes = decrease >= self.threshold;

        match (increase_passes, decrease_passes) {
            (true, false) => RewardAdjustment::Increase,
            (false, true) => RewardAdjustment::Decrease,
            (true, true) if increase > decrease => RewardAdjustment::Increase,
            (true, true) if decrease > increase => RewardAdjustment::Decrease,
            _ => RewardAdjustment::Hold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally() -> RewardVoteTally {
        // window of 5 heights, majority threshold 3
        RewardVoteTally::new(6..=10, 600, 3)
    }

    #[test]
    fn majority_increase() {
        let mut tally = tally();
        for (height, vote) in [(6, 700), (7, 650), (8, 600), (9, 800), (10, -1)] {
            tally.record(RewardVote::new(height, vote)).unwrap();
        }

        assert_eq!(
            tally.votes(),
            RewardVotes {
                increase: 3,
                decrease: 0
            }
        );
        assert_eq!(tally.tally(), RewardAdjustment::Increase);
    }

    #[test]
    fn majority_decrease() {
        let mut tally = tally();
        for height in 6..=8 {
            tally.record(RewardVote::new(height, 0)).unwrap();
        }
        assert_eq!(tally.tally(), RewardAdjustment::Decrease);
    }

    #[test]
    fn below_threshold_holds() {
        let mut tally = tally();
        tally.record(RewardVote::new(6, 700)).unwrap();
        tally.record(RewardVote::new(7, 700)).unwrap();
        tally.record(RewardVote::new(8, 500)).unwrap();
        tally.record(RewardVote::new(9, 500)).unwrap();

        assert_eq!(tally.tally(), RewardAdjustment::Hold);
        // idempotent
        assert_eq!(tally.tally(), tally.tally());
    }

    #[test]
    fn tie_above_threshold_holds() {
        let mut tally = RewardVoteTally::new(1..=10, 600, 2);
        for (height, vote) in [(1, 700), (2, 500), (3, 700), (4, 500)] {
            tally.record(RewardVote::new(height, vote)).unwrap();
        }
        assert_eq!(tally.tally(), RewardAdjustment::Hold);
    }

    #[test]
    fn out_of_window_and_duplicate_votes_rejected() {
        let mut tally = tally();
        let err = tally.record(RewardVote::new(5, 700)).unwrap_err();
        assert!(matches!(err, RewardError::InvalidVote { height: 5, .. }));

        tally.record(RewardVote::new(7, 700)).unwrap();
        let err = tally.record(RewardVote::new(7, 700)).unwrap_err();
        assert!(matches!(err, RewardError::InvalidVote { height: 7, .. }));
        let err = tally.record(RewardVote::new(6, 700)).unwrap_err();
        assert!(matches!(err, RewardError::InvalidVote { height: 6, .. }));

        assert_eq!(tally.votes().increase, 1);
    }
}
