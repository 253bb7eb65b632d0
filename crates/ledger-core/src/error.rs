use crate::Hash;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Duplicate transaction id {}", hex::encode(.0))]
    DuplicateTransaction(Hash),
    #[error("Insufficient funds for {address}: required {required}, available {available}")]
    InsufficientFunds {
        address: String,
        required: u64,
        available: i128,
    },
    #[error("Amount overflows the 64-bit range")]
    AmountOverflow,
    #[error("Signer {actual} cannot sign for sender {expected}")]
    SignerMismatch { expected: String, actual: String },
    #[error("Difficulty {0} exceeds the hash width")]
    InvalidDifficulty(u32),
    #[error("Block {index} hash does not match its contents")]
    ChainHashMismatch { index: u64 },
    #[error("Block {index} does not link to the previous block hash")]
    ChainLinkageBroken { index: u64 },
    #[error("Block at position {position} carries index {index}")]
    ChainIndexMismatch { position: u64, index: u64 },
    #[error("Block {index} carries an invalid transaction: {reason}")]
    InvalidBlockTransaction { index: u64, reason: String },
    #[error("Genesis block has been altered")]
    InvalidGenesis,
    #[error("Chain is empty")]
    EmptyChain,
    #[error("Block {0} not found")]
    BlockNotFound(u64),
    #[error("Candidate block {index} was built on a tip that is no longer current")]
    StaleCandidate { index: u64 },
    #[error("Mining cancelled")]
    MiningCancelled,
    #[error("Mining aborted after {attempts} attempts")]
    MiningAborted { attempts: u64 },
    #[error("Ledger lock poisoned")]
    LockPoisoned,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LedgerError {
    pub(crate) fn invalid_tx(reason: impl Into<String>) -> Self {
        Self::InvalidTransaction(reason.into())
    }
}
