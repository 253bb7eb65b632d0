use crate::constants::GENESIS_TIMESTAMP;
use crate::error::{LedgerError, Result};
use crate::pow::{self, MineOptions, MineStats, ProgressObserver};
use crate::{sha256, Hash, Transaction, ZERO_HASH};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    #[serde(with = "crate::hex_hash")]
    pub previous_hash: Hash,
    pub nonce: u64,
    #[serde(with = "crate::hex_hash")]
    pub hash: Hash,
}

impl Block {
    /// Build an unmined block; `hash` is computed at nonce 0.
    pub fn new(
        index: u64,
        timestamp: u64,
        transactions: Vec<Transaction>,
        previous_hash: Hash,
    ) -> Self {
        let mut block = Self {
            index,
            timestamp,
            transactions,
            previous_hash,
            nonce: 0,
            hash: ZERO_HASH,
        };
        block.hash = block.compute_hash();
        block
    }

    /// The fixed root block: index 0, no transactions, zeroed previous hash.
    pub fn genesis() -> Self {
        Self::new(0, GENESIS_TIMESTAMP, vec![], ZERO_HASH)
    }

    /// Sorted-key encoding of every hashed field. Transactions are embedded
    /// through [`Transaction::canonical`] and keep their list order.
    pub fn canonical(&self) -> Value {
        let transactions: Vec<Value> = self.transactions.iter().map(Transaction::canonical).collect();
        json!({
            "index": self.index,
            "nonce": self.nonce,
            "previous_hash": hex::encode(self.previous_hash),
            "timestamp": self.timestamp,
            "transactions": transactions,
        })
    }

    pub fn compute_hash(&self) -> Hash {
        sha256(self.canonical().to_string())
    }

    pub fn mine(&mut self, difficulty: u32) -> MineStats {
        pow::mine_block(self, difficulty)
    }

    pub fn mine_with(
        &mut self,
        difficulty: u32,
        options: &MineOptions,
        observer: &dyn ProgressObserver,
    ) -> Result<MineStats> {
        pow::mine_block_with(self, difficulty, options, observer)
    }

    /// True while the stored hash still matches the block contents.
    pub fn validate(&self) -> bool {
        self.hash == self.compute_hash()
    }

    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        pow::meets_difficulty(&self.hash, difficulty)
    }

    pub fn total_fees(&self) -> Result<u64> {
        self.transactions.iter().try_fold(0u64, |acc, tx| {
            acc.checked_add(tx.fee).ok_or(LedgerError::AmountOverflow)
        })
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn previous_hash_hex(&self) -> String {
        hex::encode(self.previous_hash)
    }
}
