pub const BYTE: usize = 8;
pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const MAX_DIFFICULTY: u32 = HASH_HEX_SIZE as u32;
pub const DEFAULT_DIFFICULTY: u32 = 2;
pub const DEFAULT_MINING_REWARD: u64 = 100;
pub const PROGRESS_INTERVAL: u64 = 100_000;
pub const GENESIS_TIMESTAMP: u64 = 0;
/// Sender of every reward (coinbase) transaction.
pub const SYSTEM_ADDRESS: &str = "SYSTEM";
/// Signature marker carried by system-issued transactions.
pub const SYSTEM_SIGNATURE: &str = "SYSTEM";
