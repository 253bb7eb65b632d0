use crate::error::{LedgerError, Result};
use std::fmt::Debug;

/// Decides how much a miner is paid for the block at `height`.
pub trait RewardPolicy: Debug + Send + Sync {
    /// Newly minted value for the block at `height`.
    fn subsidy(&self, height: u64) -> u64;

    /// Total paid by the reward transaction: subsidy plus collected fees.
    fn reward(&self, height: u64, total_fees: u64) -> Result<u64> {
        self.subsidy(height)
            .checked_add(total_fees)
            .ok_or(LedgerError::AmountOverflow)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedReward(pub u64);

impl RewardPolicy for FixedReward {
    fn subsidy(&self, _height: u64) -> u64 {
        self.0
    }
}

/// Subsidy halves every `interval` blocks. An interval of 0 never halves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalvingReward {
    pub initial: u64,
    pub interval: u64,
}

impl RewardPolicy for HalvingReward {
    fn subsidy(&self, height: u64) -> u64 {
        if self.interval == 0 {
            return self.initial;
        }
        let halvings = height / self.interval;
        if halvings >= u64::BITS as u64 {
            0
        } else {
            self.initial >> halvings
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_reward_adds_fees() {
        let policy = FixedReward(100);
        assert_eq!(policy.reward(1, 0).unwrap(), 100);
        assert_eq!(policy.reward(42, 7).unwrap(), 107);
    }

    #[test]
    fn reward_overflow_is_an_error() {
        let policy = FixedReward(u64::MAX);
        assert!(matches!(
            policy.reward(1, 1),
            Err(LedgerError::AmountOverflow)
        ));
    }

    #[test]
    fn halving_schedule() {
        let policy = HalvingReward {
            initial: 50,
            interval: 10,
        };
        assert_eq!(policy.subsidy(1), 50);
        assert_eq!(policy.subsidy(9), 50);
        assert_eq!(policy.subsidy(10), 25);
        assert_eq!(policy.subsidy(25), 12);
        assert_eq!(policy.subsidy(10 * 64), 0);
        assert_eq!(policy.reward(10 * 64, 3).unwrap(), 3);
    }

    #[test]
    fn zero_interval_never_halves() {
        let policy = HalvingReward {
            initial: 50,
            interval: 0,
        };
        assert_eq!(policy.subsidy(1_000_000), 50);
    }
}
