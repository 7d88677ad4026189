//! Protocol feature identifiers and activation status.

use crate::Height;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric identifier of a protocol feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(pub u16);

impl FeatureId {
    /// Enables per-block emission and reward voting.
    pub const BLOCK_REWARD: FeatureId = FeatureId(14);
    /// Adds the DAO and XTN buy-back beneficiaries.
    pub const BLOCK_REWARD_DISTRIBUTION: FeatureId = FeatureId(19);
    /// Caps beneficiary shares and shortens the reward term.
    pub const CAPPED_REWARD: FeatureId = FeatureId(20);
    /// Retires the XTN buy-back beneficiary after a grace period.
    pub const CEASE_XTN_BUYBACK: FeatureId = FeatureId(21);
    /// Temporarily multiplies the per-address cap.
    pub const BOOST_BLOCK_REWARD: FeatureId = FeatureId(23);

    pub fn name(&self) -> &'static str {
        match *self {
            Self::BLOCK_REWARD => "BlockReward",
            Self::BLOCK_REWARD_DISTRIBUTION => "BlockRewardDistribution",
            Self::CAPPED_REWARD => "CappedReward",
            Self::CEASE_XTN_BUYBACK => "CeaseXtnBuyback",
            Self::BOOST_BLOCK_REWARD => "BoostBlockReward",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.name())
    }
}

/// Lifecycle of a feature on chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureStatus {
    #[default]
    Undefined,
    Voting,
    Approved,
    Activated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub status: FeatureStatus,
    pub activation_height: Option<Height>,
}

impl Feature {
    pub fn new(id: FeatureId) -> Self {
        Self {
            id,
            status: FeatureStatus::Undefined,
            activation_height: None,
        }
    }

    pub fn activated(id: FeatureId, height: Height) -> Self {
        Self {
            id,
            status: FeatureStatus::Activated,
            activation_height: Some(height),
        }
    }

    /// True once the feature is activated at or below `height`.
    pub fn is_active_at(&self, height: Height) -> bool {
        self.status == FeatureStatus::Activated
            && self.activation_height.is_some_and(|at| at <= height)
    }
}
