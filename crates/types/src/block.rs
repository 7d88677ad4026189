use crate::{Address, Height};
use serde::{Deserialize, Serialize};

/// Reward vote value meaning "no preference".
pub const NO_REWARD_VOTE: i64 = -1;

/// A block producer's desired reward, carried in every block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardVote {
    pub height: Height,
    pub desired_reward: i64,
}

impl RewardVote {
    pub fn new(height: Height, desired_reward: i64) -> Self {
        Self {
            height,
            desired_reward,
        }
    }

    /// Negative values are abstentions.
    pub fn is_abstention(&self) -> bool {
        self.desired_reward < 0
    }
}

/// The subset of a block header the reward engine consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub height: Height,
    pub generator: Address,
    #[serde(default = "default_reward_vote")]
    pub reward_vote: i64,
}

fn default_reward_vote() -> i64 {
    NO_REWARD_VOTE
}

impl BlockHeader {
    pub fn new(height: Height, generator: Address, reward_vote: i64) -> Self {
        Self {
            height,
            generator,
            reward_vote,
        }
    }

    pub fn vote(&self) -> RewardVote {
        RewardVote::new(self.height, self.reward_vote)
    }
}
