#![allow(dead_code)]

use ledger_core::{Balance, Ledger, LedgerConfig, Wallet};
use rand::{rngs::StdRng, SeedableRng};

pub const TEST_REWARD: u64 = 100;

pub fn test_ledger(difficulty: u32) -> Ledger {
    let config = LedgerConfig::default()
        .with_difficulty(difficulty)
        .with_mining_reward(TEST_REWARD);
    Ledger::new(config).expect("valid test config")
}

pub fn seeded_wallets(seed: u64, count: usize) -> Vec<Wallet> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| Wallet::from_rng(&mut rng)).collect()
}

/// Sum of replayed balances over every non-system address.
pub fn circulating_supply(ledger: &Ledger) -> Balance {
    ledger
        .addresses()
        .iter()
        .filter(|address| address.as_str() != ledger_core::constants::SYSTEM_ADDRESS)
        .map(|address| ledger.balance_of(address))
        .sum()
}
