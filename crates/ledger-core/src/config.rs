use crate::constants::{DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD, MAX_DIFFICULTY};
use crate::error::{LedgerError, Result};
use crate::pow::MineOptions;
use crate::reward::{FixedReward, RewardPolicy};
use std::sync::Arc;

/// Tunables for a [`crate::Ledger`].
#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// Leading zero hex digits required of the next mined block.
    pub difficulty: u32,
    pub reward_policy: Arc<dyn RewardPolicy>,
    /// Mine a reward-only block when the pending pool is empty.
    pub allow_reward_only_blocks: bool,
    /// Reject transfers the sender's replayed balance cannot cover.
    pub require_sufficient_balance: bool,
    pub mining: MineOptions,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            reward_policy: Arc::new(FixedReward(DEFAULT_MINING_REWARD)),
            allow_reward_only_blocks: false,
            require_sufficient_balance: false,
            mining: MineOptions::default(),
        }
    }
}

impl LedgerConfig {
    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_reward_policy(mut self, policy: impl RewardPolicy + 'static) -> Self {
        self.reward_policy = Arc::new(policy);
        self
    }

    pub fn with_mining_reward(self, reward: u64) -> Self {
        self.with_reward_policy(FixedReward(reward))
    }

    pub fn with_reward_only_blocks(mut self, allow: bool) -> Self {
        self.allow_reward_only_blocks = allow;
        self
    }

    pub fn with_balance_check(mut self, require: bool) -> Self {
        self.require_sufficient_balance = require;
        self
    }

    pub fn with_mining_options(mut self, mining: MineOptions) -> Self {
        self.mining = mining;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_difficulty(self.difficulty)
    }
}

pub(crate) fn check_difficulty(difficulty: u32) -> Result<()> {
    if difficulty > MAX_DIFFICULTY {
        return Err(LedgerError::InvalidDifficulty(difficulty));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reward::HalvingReward;

    #[test]
    fn defaults_match_constants() {
        let config = LedgerConfig::default();
        assert_eq!(config.difficulty, DEFAULT_DIFFICULTY);
        assert_eq!(config.reward_policy.reward(1, 0).unwrap(), DEFAULT_MINING_REWARD);
        assert!(!config.allow_reward_only_blocks);
        assert!(!config.require_sufficient_balance);
        config.validate().unwrap();
    }

    #[test]
    fn builder_overrides() {
        let config = LedgerConfig::default()
            .with_difficulty(4)
            .with_reward_policy(HalvingReward {
                initial: 64,
                interval: 2,
            })
            .with_reward_only_blocks(true)
            .with_balance_check(true);
        assert_eq!(config.difficulty, 4);
        assert_eq!(config.reward_policy.subsidy(2), 32);
        assert!(config.allow_reward_only_blocks);
        assert!(config.require_sufficient_balance);
    }

    #[test]
    fn difficulty_wider_than_hash_is_rejected() {
        let config = LedgerConfig::default().with_difficulty(MAX_DIFFICULTY + 1);
        assert!(matches!(
            config.validate(),
            Err(LedgerError::InvalidDifficulty(_))
        ));
    }
}
