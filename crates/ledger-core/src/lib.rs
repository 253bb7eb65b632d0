//! Proof-of-work ledger core: transactions, blocks, mining and the chain.
pub mod block;
pub mod config;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod pow;
pub mod reward;
pub mod shared;
pub mod transaction;
pub mod wallet;

pub use block::Block;
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use ledger::{ChainStats, Ledger, MineOutcome, MinedBlock};
pub use pow::{CancelToken, MineOptions, MineStats, ProgressObserver, TracingObserver};
pub use reward::{FixedReward, HalvingReward, RewardPolicy};
pub use shared::SharedLedger;
pub use transaction::Transaction;
pub use wallet::{Signer, Wallet};

use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub type Hash = [u8; 32];

/// Signed balance: replay can drive an address below zero when the
/// balance check is disabled.
pub type Balance = i128;

pub const ZERO_HASH: Hash = [0u8; 32];

pub fn sha256(bytes: impl AsRef<[u8]>) -> Hash {
    let digest = Sha256::digest(bytes.as_ref());
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

/// Milliseconds since the unix epoch; 0 if the clock is before it.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Serde adapter storing a [`Hash`] as lowercase hex.
pub mod hex_hash {
    use super::Hash;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = hex::decode(&text).map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| D::Error::custom("expected a 32-byte hash"))
    }
}
