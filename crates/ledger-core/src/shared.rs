use crate::error::{LedgerError, Result};
use crate::ledger::{Candidate, ChainStats, Ledger, MineOutcome, MinedBlock};
use crate::pow::{CancelToken, MineStats, TracingObserver};
use crate::{Balance, Block, Transaction};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

/// Thread-safe handle to a [`Ledger`].
///
/// Readers share an `RwLock`. Miners are serialised by a separate mutex and
/// search for a nonce without holding the state lock, so submissions and
/// balance queries keep flowing while a block is being mined. The block is
/// appended and its transactions leave the pool under a single write lock.
#[derive(Clone, Debug)]
pub struct SharedLedger {
    state: Arc<RwLock<Ledger>>,
    mining: Arc<Mutex<()>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            state: Arc::new(RwLock::new(ledger)),
            mining: Arc::new(Mutex::new(())),
        }
    }

    fn read_guard(&self) -> Result<RwLockReadGuard<'_, Ledger>> {
        self.state.read().map_err(|_| LedgerError::LockPoisoned)
    }

    fn write_guard(&self) -> Result<RwLockWriteGuard<'_, Ledger>> {
        self.state.write().map_err(|_| LedgerError::LockPoisoned)
    }

    /// Run `f` against a consistent snapshot of the ledger.
    pub fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> Result<R> {
        Ok(f(&*self.read_guard()?))
    }

    pub fn submit(&self, tx: Transaction) -> Result<()> {
        self.write_guard()?.create_transaction(tx)
    }

    pub fn balance_of(&self, address: &str) -> Result<Balance> {
        self.read(|ledger| ledger.balance_of(address))
    }

    pub fn len(&self) -> Result<usize> {
        self.read(Ledger::len)
    }

    pub fn is_chain_valid(&self) -> Result<bool> {
        self.read(Ledger::is_chain_valid)
    }

    pub fn stats(&self) -> Result<ChainStats> {
        self.read(Ledger::stats)
    }

    pub fn set_difficulty(&self, difficulty: u32) -> Result<()> {
        self.write_guard()?.set_difficulty(difficulty)
    }

    /// Mine the current pool snapshot. Transactions submitted while the
    /// search runs stay pending for the next block.
    pub fn mine_pending_transactions(
        &self,
        reward_address: &str,
        cancel: Option<CancelToken>,
    ) -> Result<MineOutcome> {
        let _miner = self.mining.lock().map_err(|_| LedgerError::LockPoisoned)?;
        let candidate = self.read(|ledger| ledger.candidate(reward_address))??;
        let Some(candidate) = candidate else {
            info!("nothing to mine");
            return Ok(MineOutcome::NothingToMine);
        };
        self.mine_and_commit(candidate, cancel).map(MineOutcome::Mined)
    }

    /// Shared counterpart of [`Ledger::add_block`].
    pub fn add_block(&self, block: Block, cancel: Option<CancelToken>) -> Result<MinedBlock> {
        let _miner = self.mining.lock().map_err(|_| LedgerError::LockPoisoned)?;
        let candidate = self.read(|ledger| ledger.prepare_block(block))??;
        self.mine_and_commit(candidate, cancel)
    }

    fn mine_and_commit(
        &self,
        mut candidate: Candidate,
        cancel: Option<CancelToken>,
    ) -> Result<MinedBlock> {
        let mut options = self.read(|ledger| ledger.config().mining.clone())?;
        if let Some(token) = cancel {
            options.cancel = Some(token);
        }
        let stats: MineStats = candidate.mine(&options, &TracingObserver)?;
        self.write_guard()?.commit(candidate, stats)
    }
}
