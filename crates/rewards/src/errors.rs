use thiserror::Error;
use waves_types::{FeatureId, Height};

/// Errors raised while computing rewards, votes, and distributions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RewardError {
    #[error("block reward feature is not activated at height {height}")]
    FeatureNotActivated { height: Height },

    #[error("requested height {requested} exceeds current height {current}")]
    HeightOutOfRange { requested: Height, current: Height },

    #[error("invalid reward vote at height {height}: {reason}")]
    InvalidVote { height: Height, reason: String },

    #[error("inconsistent reward state: {0}")]
    InconsistentState(String),

    #[error("arithmetic overflow in reward calculation: {0}")]
    ArithmeticOverflow(&'static str),

    #[error("computed share {share} is outside the block reward {total}")]
    ShareOutOfRange { share: u64, total: u64 },

    #[error("invalid rewards settings: {0}")]
    InvalidSettings(String),

    #[error("feature {id} already activated at height {existing}, cannot move to {requested}")]
    FeatureConflict {
        id: FeatureId,
        existing: Height,
        requested: Height,
    },
}

impl RewardError {
    /// Consensus-breaking errors: block application must stop until resync.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RewardError::InconsistentState(_)
                | RewardError::ArithmeticOverflow(_)
                | RewardError::ShareOutOfRange { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RewardError>;
