//! Per-block split of the emission between miners and treasury addresses.

use crate::beneficiaries::{BeneficiarySet, RewardRegime};
use crate::errors::{Result, RewardError};
use serde::{Deserialize, Serialize};
use waves_types::Wavelets;

/// Amounts credited for one block. Always sums to the block emission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub miners: Wavelets,
    pub dao: Wavelets,
    pub xtn_buyback: Wavelets,
}

impl Distribution {
    pub fn total(&self) -> Option<Wavelets> {
        self.miners
            .checked_add(self.dao)?
            .checked_add(self.xtn_buyback)
    }
}

pub struct RewardDistributor;

impl RewardDistributor {
    /// Split `total` for `beneficiaries` under `regime`.
    ///
    /// Miners absorb every integer remainder. The combined miner share is
    /// split between individual miners by the caller.
    pub fn distribute(
        total: Wavelets,
        beneficiaries: &BeneficiarySet,
        regime: RewardRegime,
    ) -> Result<Distribution> {
        let k = beneficiaries.treasury_count();

        let per_beneficiary = match (k, regime) {
            (0, _) => 0,
            (_, RewardRegime::Uncapped) => total / (k + 1),
            (_, RewardRegime::Capped { address_cap }) => {
                let full_payout = (k + 1)
                    .checked_mul(address_cap)
                    .ok_or(RewardError::ArithmeticOverflow("capped payout"))?;
                if total >= full_payout {
                    address_cap
                } else {
                    // miners keep the cap; the rest is shared, never below zero
                    total.saturating_sub(address_cap) / k
                }
            }
        };

        let dao = if beneficiaries.dao.is_some() {
            per_beneficiary
        } else {
            0
        };
        let xtn_buyback = if beneficiaries.xtn_buyback.is_some() {
            per_beneficiary
        } else {
            0
        };

        let treasury = dao
            .checked_add(xtn_buyback)
            .ok_or(RewardError::ArithmeticOverflow("treasury shares"))?;
        let miners = total
            .checked_sub(treasury)
            .ok_or(RewardError::ShareOutOfRange {
                share: treasury,
                total,
            })?;

        let distribution = Distribution {
            miners,
            dao,
            xtn_buyback,
        };
        Self::check_conservation(&distribution, total)?;
        Ok(distribution)
    }

    fn check_conservation(distribution: &Distribution, total: Wavelets) -> Result<()> {
        for share in [distribution.miners, distribution.dao, distribution.xtn_buyback] {
            if share > total {
                return Err(RewardError::ShareOutOfRange { share, total });
            }
        }

        match distribution.total() {
            Some(sum) if sum == total => Ok(()),
            _ => Err(RewardError::InconsistentState(format!(
                "distribution {distribution:?} does not sum to {total}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waves_types::Address;

    const CAP: Wavelets = 200_000_000;

    fn both() -> BeneficiarySet {
        BeneficiarySet {
            miners: vec![Address::from_public_key(b'W', &[0; 32])],
            dao: Some(Address::from_public_key(b'W', &[1; 32])),
            xtn_buyback: Some(Address::from_public_key(b'W', &[2; 32])),
        }
    }

    fn capped(cap: Wavelets) -> RewardRegime {
        RewardRegime::Capped { address_cap: cap }
    }

    fn split(miners: Wavelets, dao: Wavelets, xtn_buyback: Wavelets) -> Distribution {
        Distribution {
            miners,
            dao,
            xtn_buyback,
        }
    }

    #[test]
    fn capped_full_shares() {
        let d = RewardDistributor::distribute(900_000_000, &both(), capped(CAP)).unwrap();
        assert_eq!(d, split(500_000_000, 200_000_000, 200_000_000));
    }

    #[test]
    fn capped_miner_floor() {
        let d = RewardDistributor::distribute(500_000_000, &both(), capped(CAP)).unwrap();
        assert_eq!(d, split(200_000_000, 150_000_000, 150_000_000));
    }

    #[test]
    fn capped_reward_at_cap_goes_to_miners() {
        let d = RewardDistributor::distribute(200_000_000, &both(), capped(CAP)).unwrap();
        assert_eq!(d, split(200_000_000, 0, 0));

        let d = RewardDistributor::distribute(150_000_000, &both(), capped(CAP)).unwrap();
        assert_eq!(d, split(150_000_000, 0, 0));
    }

    #[test]
    fn capped_boosted() {
        let d =
            RewardDistributor::distribute(6_000_000_000, &both(), capped(10 * CAP)).unwrap();
        assert_eq!(d, split(2_000_000_000, 2_000_000_000, 2_000_000_000));

        let d =
            RewardDistributor::distribute(7_000_000_000, &both(), capped(10 * CAP)).unwrap();
        assert_eq!(d, split(3_000_000_000, 2_000_000_000, 2_000_000_000));
    }

    #[test]
    fn capped_single_beneficiary() {
        let mut set = both();
        set.xtn_buyback = None;

        let d = RewardDistributor::distribute(600_000_000, &set, capped(CAP)).unwrap();
        assert_eq!(d, split(400_000_000, 200_000_000, 0));

        let d = RewardDistributor::distribute(300_000_000, &set, capped(CAP)).unwrap();
        assert_eq!(d, split(200_000_000, 100_000_000, 0));
    }

    #[test]
    fn capped_odd_remainder_goes_to_miners() {
        let d = RewardDistributor::distribute(500_000_001, &both(), capped(CAP)).unwrap();
        assert_eq!(d, split(200_000_001, 150_000_000, 150_000_000));
    }

    #[test]
    fn uncapped_thirds() {
        let d = RewardDistributor::distribute(600_000_000, &both(), RewardRegime::Uncapped)
            .unwrap();
        assert_eq!(d, split(200_000_000, 200_000_000, 200_000_000));

        let d = RewardDistributor::distribute(100, &both(), RewardRegime::Uncapped).unwrap();
        assert_eq!(d, split(34, 33, 33));
    }

    #[test]
    fn uncapped_halves_with_one_beneficiary() {
        let mut set = both();
        set.dao = None;

        let d = RewardDistributor::distribute(601, &set, RewardRegime::Uncapped).unwrap();
        assert_eq!(d, split(301, 0, 300));
    }

    #[test]
    fn miners_only_receive_everything() {
        let set = BeneficiarySet::miners_only(vec![]);
        for regime in [RewardRegime::Uncapped, capped(CAP)] {
            let d = RewardDistributor::distribute(600_000_000, &set, regime).unwrap();
            assert_eq!(d, split(600_000_000, 0, 0));
        }
    }

    #[test]
    fn zero_reward() {
        let d = RewardDistributor::distribute(0, &both(), capped(CAP)).unwrap();
        assert_eq!(d, Distribution::default());
    }

    #[test]
    fn cap_overflow_is_reported() {
        let err = RewardDistributor::distribute(1, &both(), capped(u64::MAX)).unwrap_err();
        assert!(err.is_fatal());
    }
}
