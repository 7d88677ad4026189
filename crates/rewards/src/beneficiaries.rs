//! Who receives a share of the block reward at a given height.

use crate::features::FeatureOracle;
use crate::settings::RewardsSettings;
use serde::{Deserialize, Serialize};
use waves_types::{Address, FeatureId, Height, Wavelets};

/// Addresses entitled to a share at one height. Recomputed on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiarySet {
    pub miners: Vec<Address>,
    pub dao: Option<Address>,
    pub xtn_buyback: Option<Address>,
}

impl BeneficiarySet {
    pub fn miners_only(miners: Vec<Address>) -> Self {
        Self {
            miners,
            dao: None,
            xtn_buyback: None,
        }
    }

    /// Number of non-miner beneficiaries (0, 1 or 2).
    pub fn treasury_count(&self) -> u64 {
        self.dao.is_some() as u64 + self.xtn_buyback.is_some() as u64
    }
}

/// Split formula in force at a height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardRegime {
    /// Even split between miners and each treasury beneficiary.
    Uncapped,
    /// Treasury shares capped at `address_cap`, miners guaranteed the cap.
    Capped { address_cap: Wavelets },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryPlan {
    pub beneficiaries: BeneficiarySet,
    pub regime: RewardRegime,
}

pub struct BeneficiarySelector<'a, F: FeatureOracle + ?Sized> {
    settings: &'a RewardsSettings,
    features: &'a F,
}

impl<'a, F: FeatureOracle + ?Sized> BeneficiarySelector<'a, F> {
    pub fn new(settings: &'a RewardsSettings, features: &'a F) -> Self {
        Self { settings, features }
    }

    pub fn resolve(&self, height: Height, miners: Vec<Address>) -> BeneficiaryPlan {
        if !self
            .features
            .is_active_at_height(FeatureId::BLOCK_REWARD_DISTRIBUTION, height)
        {
            return BeneficiaryPlan {
                beneficiaries: BeneficiarySet::miners_only(miners),
                regime: RewardRegime::Uncapped,
            };
        }

        let beneficiaries = BeneficiarySet {
            miners,
            dao: self.settings.dao_address,
            xtn_buyback: self
                .settings
                .xtn_buyback_address
                .filter(|_| self.xtn_buyback_eligible(height)),
        };

        if !self.features.is_active_at_height(FeatureId::CAPPED_REWARD, height) {
            return BeneficiaryPlan {
                beneficiaries,
                regime: RewardRegime::Uncapped,
            };
        }

        BeneficiaryPlan {
            beneficiaries,
            regime: RewardRegime::Capped {
                address_cap: self
                    .settings
                    .max_address_reward
                    .saturating_mul(self.boost_multiplier(height)),
            },
        }
    }

    /// Shorthand for the DAO and XTN addresses visible at `height`.
    pub fn treasury_addresses(&self, height: Height) -> (Option<Address>, Option<Address>) {
        let set = self.resolve(height, Vec::new()).beneficiaries;
        (set.dao, set.xtn_buyback)
    }

    fn xtn_buyback_eligible(&self, height: Height) -> bool {
        match self
            .features
            .activation_height(FeatureId::CEASE_XTN_BUYBACK)
            .filter(|&at| at <= height)
        {
            None => true,
            Some(ceased_at) => height - ceased_at < self.settings.min_xtn_buyback_period,
        }
    }

    fn boost_multiplier(&self, height: Height) -> u64 {
        let boosted = self
            .features
            .activation_height(FeatureId::BOOST_BLOCK_REWARD)
            .is_some_and(|at| at <= height && height - at < self.settings.boost_period);

        if boosted {
            self.settings.boost_multiplier
        } else {
            1
        }
    }
}
