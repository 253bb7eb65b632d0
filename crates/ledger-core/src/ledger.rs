use crate::config::{check_difficulty, LedgerConfig};
use crate::error::{LedgerError, Result};
use crate::pow::{MineOptions, MineStats, ProgressObserver, TracingObserver};
use crate::{unix_millis, Balance, Block, Hash, Transaction, ZERO_HASH};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, error, info, warn};

/// Append-only chain of mined blocks plus the pool of transactions waiting
/// to be mined.
#[derive(Debug)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    config: LedgerConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MineOutcome {
    /// The pending pool was empty; no block was created.
    NothingToMine,
    Mined(MinedBlock),
}

impl MineOutcome {
    pub fn mined(&self) -> Option<&MinedBlock> {
        match self {
            Self::Mined(block) => Some(block),
            Self::NothingToMine => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinedBlock {
    pub index: u64,
    pub hash: Hash,
    pub reward: u64,
    pub transactions: usize,
    pub stats: MineStats,
}

/// An unmined block and what it pays out.
#[derive(Debug)]
pub(crate) struct Candidate {
    pub(crate) block: Block,
    pub(crate) reward: u64,
    pub(crate) difficulty: u32,
}

impl Candidate {
    pub(crate) fn mine(
        &mut self,
        options: &MineOptions,
        observer: &dyn ProgressObserver,
    ) -> Result<MineStats> {
        self.block.mine_with(self.difficulty, options, observer)
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ChainStats {
    pub total_blocks: usize,
    pub is_valid: bool,
    pub latest_block_hash: String,
    pub genesis_block_hash: String,
    pub latest_block_index: u64,
    pub difficulty: u32,
    pub pending: usize,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            chain: vec![Self::genesis_block()],
            pending: Vec::new(),
            config: LedgerConfig::default(),
        }
    }
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            chain: vec![Self::genesis_block()],
            pending: Vec::new(),
            config,
        })
    }

    pub fn genesis_block() -> Block {
        Block::genesis()
    }

    pub fn latest_block(&self) -> Result<&Block> {
        self.chain.last().ok_or(LedgerError::EmptyChain)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    pub fn block_by_index(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.chain.get(i))
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always false: the genesis block is present from construction.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn difficulty(&self) -> u32 {
        self.config.difficulty
    }

    /// Applies to the next block mined; existing blocks are untouched.
    pub fn set_difficulty(&mut self, difficulty: u32) -> Result<()> {
        check_difficulty(difficulty)?;
        info!(from = self.config.difficulty, to = difficulty, "difficulty changed");
        self.config.difficulty = difficulty;
        Ok(())
    }

    /// Validate `tx` and queue it for the next block. A rejected
    /// transaction leaves the pool unchanged.
    pub fn create_transaction(&mut self, tx: Transaction) -> Result<()> {
        if let Err(err) = self.admit(&tx) {
            warn!(id = %tx.id_hex(), "rejected transaction: {err}");
            return Err(err);
        }
        debug!(
            id = %tx.id_hex(),
            sender = %tx.sender,
            receiver = %tx.receiver,
            amount = tx.amount,
            fee = tx.fee,
            "transaction queued"
        );
        self.pending.push(tx);
        Ok(())
    }

    fn admit(&self, tx: &Transaction) -> Result<()> {
        if tx.is_coinbase() {
            return Err(LedgerError::invalid_tx(
                "reward transactions are issued by the ledger",
            ));
        }
        tx.validate()?;
        if self.contains_transaction(&tx.transaction_id) {
            error!(id = %tx.id_hex(), "transaction id collision");
            return Err(LedgerError::DuplicateTransaction(tx.transaction_id));
        }
        if self.config.require_sufficient_balance {
            self.check_funds(tx, self.pending_outgoing(&tx.sender))?;
        }
        Ok(())
    }

    /// Fails when `tx.sender` cannot cover `tx` on top of `reserved`.
    fn check_funds(&self, tx: &Transaction, reserved: Balance) -> Result<()> {
        let required = tx
            .amount
            .checked_add(tx.fee)
            .ok_or(LedgerError::AmountOverflow)?;
        let available = self.balance_of(&tx.sender) - reserved;
        if available < Balance::from(required) {
            return Err(LedgerError::InsufficientFunds {
                address: tx.sender.clone(),
                required,
                available,
            });
        }
        Ok(())
    }

    fn is_mined(&self, id: &Hash) -> bool {
        self.chain
            .iter()
            .flat_map(|block| &block.transactions)
            .any(|tx| &tx.transaction_id == id)
    }

    fn contains_transaction(&self, id: &Hash) -> bool {
        self.pending.iter().any(|tx| &tx.transaction_id == id) || self.is_mined(id)
    }

    /// Amount plus fee of every pending transfer sent by `address`.
    pub fn pending_outgoing(&self, address: &str) -> Balance {
        self.pending
            .iter()
            .filter(|tx| tx.sender == address)
            .map(|tx| Balance::from(tx.amount) + Balance::from(tx.fee))
            .sum()
    }

    /// Build the next block from the pending pool without mining it.
    ///
    /// Returns `None` when there is nothing to mine and reward-only blocks
    /// are disabled. A zero reward leaves the reward transaction out.
    pub(crate) fn candidate(&self, reward_address: &str) -> Result<Option<Candidate>> {
        if reward_address.is_empty() {
            return Err(LedgerError::invalid_tx("reward address is empty"));
        }
        let height = self.chain.len() as u64;
        let total_fees = sum_fees(&self.pending)?;
        let reward = self.config.reward_policy.reward(height, total_fees)?;
        if self.pending.is_empty() && (!self.config.allow_reward_only_blocks || reward == 0) {
            return Ok(None);
        }

        let mut transactions = Vec::with_capacity(self.pending.len() + 1);
        if reward > 0 {
            transactions.push(Transaction::coinbase(reward_address, reward)?);
        } else {
            debug!(height, "zero reward, block carries no reward transaction");
        }
        transactions.extend(self.pending.iter().cloned());

        let previous_hash = self.latest_block()?.hash;
        Ok(Some(Candidate {
            block: Block::new(height, unix_millis(), transactions, previous_hash),
            reward,
            difficulty: self.config.difficulty,
        }))
    }

    /// Link a caller-built block to the tip without mining it.
    ///
    /// The block gets the same checks as a pool submission: no reward
    /// transactions, no ids already mined, and funds when the balance check
    /// is on. Nobody collects fees here, so transfers must be fee-free.
    /// Transactions that are also pending leave the pool on commit.
    pub(crate) fn prepare_block(&self, mut block: Block) -> Result<Candidate> {
        let expected = self.chain.len() as u64;
        if block.index != expected {
            return Err(LedgerError::ChainIndexMismatch {
                position: expected,
                index: block.index,
            });
        }
        if block.transactions.iter().any(Transaction::is_coinbase) {
            return Err(LedgerError::invalid_tx(
                "reward transactions are issued by the ledger",
            ));
        }
        if block.transactions.iter().any(|tx| tx.fee > 0) {
            return Err(LedgerError::invalid_tx(
                "blocks without a reward cannot collect fees",
            ));
        }
        validate_block_transactions(&block, &mut HashSet::new())?;

        if let Some(tx) = block
            .transactions
            .iter()
            .find(|tx| self.is_mined(&tx.transaction_id))
        {
            error!(id = %tx.id_hex(), "transaction id collision");
            return Err(LedgerError::DuplicateTransaction(tx.transaction_id));
        }

        if self.config.require_sufficient_balance {
            let in_block: HashSet<Hash> = block
                .transactions
                .iter()
                .map(|tx| tx.transaction_id)
                .collect();
            let mut spent: BTreeMap<&str, Balance> = BTreeMap::new();
            for tx in &block.transactions {
                let reserved = self
                    .pending
                    .iter()
                    .filter(|p| p.sender == tx.sender && !in_block.contains(&p.transaction_id))
                    .map(|p| Balance::from(p.amount) + Balance::from(p.fee))
                    .sum::<Balance>();
                let earlier = spent.entry(tx.sender.as_str()).or_insert(0);
                self.check_funds(tx, reserved + *earlier)?;
                *earlier += Balance::from(tx.amount) + Balance::from(tx.fee);
            }
        }

        block.previous_hash = self.latest_block()?.hash;
        block.nonce = 0;
        block.hash = block.compute_hash();
        Ok(Candidate {
            block,
            reward: 0,
            difficulty: self.config.difficulty,
        })
    }

    /// Append a mined candidate and drop every transaction it carries from
    /// the pool in one step.
    pub(crate) fn commit(&mut self, candidate: Candidate, stats: MineStats) -> Result<MinedBlock> {
        let Candidate {
            block,
            reward,
            difficulty,
        } = candidate;
        let tip = self.latest_block()?;
        if block.previous_hash != tip.hash || block.index != self.chain.len() as u64 {
            return Err(LedgerError::StaleCandidate { index: block.index });
        }
        if !block.validate() || !block.meets_difficulty(difficulty) {
            return Err(LedgerError::ChainHashMismatch { index: block.index });
        }

        let mined = MinedBlock {
            index: block.index,
            hash: block.hash,
            reward,
            transactions: block.transactions.len(),
            stats,
        };
        let included: HashSet<Hash> = block
            .transactions
            .iter()
            .map(|tx| tx.transaction_id)
            .collect();
        self.pending.retain(|tx| !included.contains(&tx.transaction_id));
        self.chain.push(block);
        info!(
            "Appended block {} ({} transactions, reward {}), hash {}",
            mined.index,
            mined.transactions,
            mined.reward,
            hex::encode(mined.hash)
        );
        Ok(mined)
    }

    /// Mine the pending pool into a new block paying `reward_address`.
    pub fn mine_pending_transactions(&mut self, reward_address: &str) -> Result<MineOutcome> {
        let Some(mut candidate) = self.candidate(reward_address)? else {
            info!("nothing to mine");
            return Ok(MineOutcome::NothingToMine);
        };
        let stats = candidate.mine(&self.config.mining, &TracingObserver)?;
        self.commit(candidate, stats).map(MineOutcome::Mined)
    }

    /// Legacy manual path: link, mine at the current difficulty and append
    /// `block` without paying a reward.
    pub fn add_block(&mut self, block: Block) -> Result<MinedBlock> {
        let mut candidate = self.prepare_block(block)?;
        let stats = candidate.mine(&self.config.mining, &TracingObserver)?;
        self.commit(candidate, stats)
    }

    /// Replay every mined transaction: receivers gain `amount`, senders
    /// lose `amount + fee`.
    pub fn balance_of(&self, address: &str) -> Balance {
        let mut balance: Balance = 0;
        for tx in self.chain.iter().flat_map(|block| &block.transactions) {
            if tx.receiver == address {
                balance += Balance::from(tx.amount);
            }
            if tx.sender == address {
                balance -= Balance::from(tx.amount) + Balance::from(tx.fee);
            }
        }
        balance
    }

    /// Every address that appears in a mined transaction.
    pub fn addresses(&self) -> BTreeSet<String> {
        self.chain
            .iter()
            .flat_map(|block| &block.transactions)
            .flat_map(|tx| [tx.sender.clone(), tx.receiver.clone()])
            .collect()
    }

    pub fn validate_chain(&self) -> Result<()> {
        let genesis = self.chain.first().ok_or(LedgerError::EmptyChain)?;
        if genesis.index != 0
            || genesis.previous_hash != ZERO_HASH
            || !genesis.transactions.is_empty()
            || !genesis.validate()
        {
            return Err(LedgerError::InvalidGenesis);
        }

        let mut seen = HashSet::new();
        for (position, pair) in self.chain.windows(2).enumerate() {
            let (previous, block) = (&pair[0], &pair[1]);
            let position = position as u64 + 1;
            if block.index != position {
                return Err(LedgerError::ChainIndexMismatch {
                    position,
                    index: block.index,
                });
            }
            if !block.validate() {
                return Err(LedgerError::ChainHashMismatch { index: block.index });
            }
            if block.previous_hash != previous.hash {
                return Err(LedgerError::ChainLinkageBroken { index: block.index });
            }
            validate_block_transactions(block, &mut seen)?;
        }
        Ok(())
    }

    pub fn is_chain_valid(&self) -> bool {
        match self.validate_chain() {
            Ok(()) => true,
            Err(err) => {
                debug!("chain validation failed: {err}");
                false
            }
        }
    }

    pub fn stats(&self) -> ChainStats {
        let genesis = &self.chain[0];
        let latest = &self.chain[self.chain.len() - 1];
        ChainStats {
            total_blocks: self.chain.len(),
            is_valid: self.is_chain_valid(),
            latest_block_hash: latest.hash_hex(),
            genesis_block_hash: genesis.hash_hex(),
            latest_block_index: latest.index,
            difficulty: self.config.difficulty,
            pending: self.pending.len(),
        }
    }

    /// Mutate a stored block in place without rehashing it.
    ///
    /// Exists to demonstrate and test tamper detection; any edit made here
    /// is reported by [`Ledger::validate_chain`].
    pub fn tamper_block(&mut self, index: u64, edit: impl FnOnce(&mut Block)) -> Result<()> {
        let block = usize::try_from(index)
            .ok()
            .and_then(|i| self.chain.get_mut(i))
            .ok_or(LedgerError::BlockNotFound(index))?;
        warn!(index, "tampering with stored block");
        edit(block);
        Ok(())
    }

    /// Pretty JSON dump of the chain for display.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.chain)?)
    }
}

/// Per-transaction checks for a block. `seen` carries ids from earlier
/// blocks so a transaction can be mined only once across the chain.
fn validate_block_transactions(block: &Block, seen: &mut HashSet<Hash>) -> Result<()> {
    let invalid = |reason: String| LedgerError::InvalidBlockTransaction {
        index: block.index,
        reason,
    };
    for (position, tx) in block.transactions.iter().enumerate() {
        tx.validate().map_err(|err| invalid(err.to_string()))?;
        if tx.is_coinbase() && position != 0 {
            return Err(invalid(format!("reward transaction at position {position}")));
        }
        if !seen.insert(tx.transaction_id) {
            return Err(invalid(format!("duplicate transaction id {}", tx.id_hex())));
        }
    }
    Ok(())
}

fn sum_fees(transactions: &[Transaction]) -> Result<u64> {
    transactions.iter().try_fold(0u64, |acc, tx| {
        acc.checked_add(tx.fee).ok_or(LedgerError::AmountOverflow)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::Wallet;

    fn ledger(difficulty: u32) -> Ledger {
        Ledger::new(LedgerConfig::default().with_difficulty(difficulty)).unwrap()
    }

    #[test]
    fn starts_with_genesis_only() {
        let ledger = ledger(1);
        assert_eq!(ledger.len(), 1);
        assert!(!ledger.is_empty());
        assert_eq!(ledger.latest_block().unwrap(), &Block::genesis());
        assert!(ledger.is_chain_valid());
        assert_eq!(ledger.balance_of("anyone"), 0);
    }

    #[test]
    fn empty_pool_is_a_noop() {
        let mut ledger = ledger(1);
        let outcome = ledger.mine_pending_transactions("miner").unwrap();
        assert_eq!(outcome, MineOutcome::NothingToMine);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn reward_only_blocks_when_enabled() {
        let config = LedgerConfig::default()
            .with_difficulty(1)
            .with_reward_only_blocks(true);
        let mut ledger = Ledger::new(config).unwrap();
        let outcome = ledger.mine_pending_transactions("miner").unwrap();
        let mined = outcome.mined().expect("block mined");
        assert_eq!(mined.transactions, 1);
        assert_eq!(ledger.balance_of("miner"), 100);
        assert!(ledger.is_chain_valid());
    }

    #[test]
    fn coinbase_submission_is_rejected() {
        let mut ledger = ledger(1);
        let tx = Transaction::coinbase("miner", 100).unwrap();
        let err = ledger.create_transaction(tx).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransaction(_)));
        assert!(ledger.pending().is_empty());
    }

    #[test]
    fn unsigned_submission_is_rejected() {
        let mut ledger = ledger(1);
        let tx = Transaction::create("alice", "bob", 5, 0).unwrap();
        assert!(ledger.create_transaction(tx).is_err());
        assert!(ledger.pending().is_empty());
    }

    #[test]
    fn duplicate_submission_is_rejected() {
        let mut ledger = ledger(1);
        let wallet = Wallet::from_secret([2u8; 32]);
        let tx = wallet.transfer("bob", 5, 0).unwrap();
        ledger.create_transaction(tx.clone()).unwrap();
        let err = ledger.create_transaction(tx.clone()).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateTransaction(_)));

        ledger.mine_pending_transactions("miner").unwrap();
        let err = ledger.create_transaction(tx).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateTransaction(_)));
    }

    #[test]
    fn reward_transaction_comes_first() {
        let mut ledger = ledger(1);
        let wallet = Wallet::from_secret([2u8; 32]);
        let first = wallet.send("bob", 5, 2, &mut ledger).unwrap();
        let second = wallet.send("carol", 6, 3, &mut ledger).unwrap();
        ledger.mine_pending_transactions("miner").unwrap();

        let block = ledger.latest_block().unwrap();
        assert_eq!(block.index, 1);
        assert!(block.transactions[0].is_coinbase());
        assert_eq!(block.transactions[0].amount, 105);
        assert_eq!(block.transactions[1].transaction_id, first);
        assert_eq!(block.transactions[2].transaction_id, second);
        assert!(ledger.pending().is_empty());
    }

    #[test]
    fn balance_check_counts_pending_spends() {
        let config = LedgerConfig::default()
            .with_difficulty(1)
            .with_mining_reward(50)
            .with_reward_only_blocks(true)
            .with_balance_check(true);
        let mut ledger = Ledger::new(config).unwrap();
        let alice = Wallet::from_secret([4u8; 32]);

        let err = alice.send("bob", 1, 0, &mut ledger).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

        // fund alice through a reward-only block
        ledger.mine_pending_transactions(alice.address()).unwrap();
        assert_eq!(alice.balance(&ledger), 50);

        alice.send("bob", 30, 0, &mut ledger).unwrap();
        let err = alice.send("bob", 20, 1, &mut ledger).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds {
                required: 21,
                available: 20,
                ..
            }
        ));
        alice.send("bob", 19, 1, &mut ledger).unwrap();
    }

    #[test]
    fn add_block_rejects_reward_transactions() {
        let mut ledger = ledger(1);
        let wallet = Wallet::from_secret([2u8; 32]);
        let transfer = wallet.transfer("bob", 5, 0).unwrap();

        let minted = Transaction::coinbase("mallory", 1_000_000).unwrap();
        let block = Block::new(1, unix_millis(), vec![minted], ZERO_HASH);
        assert!(matches!(
            ledger.add_block(block),
            Err(LedgerError::InvalidTransaction(_))
        ));

        let trailing = Transaction::coinbase("miner", 100).unwrap();
        let block = Block::new(1, unix_millis(), vec![transfer, trailing], ZERO_HASH);
        assert!(ledger.add_block(block).is_err());

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.balance_of("mallory"), 0);
        assert!(ledger.is_chain_valid());
    }

    #[test]
    fn add_block_rejects_repeated_ids() {
        let mut ledger = ledger(1);
        let wallet = Wallet::from_secret([2u8; 32]);
        let tx = wallet.transfer("bob", 5, 0).unwrap();

        let block = Block::new(1, unix_millis(), vec![tx.clone(), tx.clone()], ZERO_HASH);
        assert!(matches!(
            ledger.add_block(block),
            Err(LedgerError::InvalidBlockTransaction { index: 1, .. })
        ));

        ledger
            .add_block(Block::new(1, unix_millis(), vec![tx.clone()], ZERO_HASH))
            .unwrap();
        let again = Block::new(2, unix_millis(), vec![tx], ZERO_HASH);
        assert!(matches!(
            ledger.add_block(again),
            Err(LedgerError::DuplicateTransaction(_))
        ));
        assert_eq!(ledger.len(), 2);
        assert!(ledger.is_chain_valid());
    }

    #[test]
    fn add_block_takes_pending_transactions_out_of_the_pool() {
        let mut ledger = ledger(1);
        let wallet = Wallet::from_secret([2u8; 32]);
        let tx = wallet.transfer("bob", 5, 0).unwrap();
        ledger.create_transaction(tx.clone()).unwrap();

        ledger
            .add_block(Block::new(1, unix_millis(), vec![tx], ZERO_HASH))
            .unwrap();
        assert!(ledger.pending().is_empty());
        let outcome = ledger.mine_pending_transactions("miner").unwrap();
        assert_eq!(outcome, MineOutcome::NothingToMine);
        assert_eq!(ledger.balance_of("bob"), 5);
        assert!(ledger.is_chain_valid());
    }

    #[test]
    fn add_block_rejects_fees() {
        let mut ledger = ledger(1);
        let wallet = Wallet::from_secret([2u8; 32]);
        let tx = wallet.transfer("bob", 5, 1).unwrap();
        let block = Block::new(1, unix_millis(), vec![tx], ZERO_HASH);
        assert!(matches!(
            ledger.add_block(block),
            Err(LedgerError::InvalidTransaction(_))
        ));
    }

    #[test]
    fn add_block_honours_balance_check() {
        let config = LedgerConfig::default()
            .with_difficulty(1)
            .with_mining_reward(50)
            .with_reward_only_blocks(true)
            .with_balance_check(true);
        let mut ledger = Ledger::new(config).unwrap();
        let alice = Wallet::from_secret([4u8; 32]);
        ledger.mine_pending_transactions(alice.address()).unwrap();
        alice.send("carol", 20, 0, &mut ledger).unwrap();

        // 20 of alice's 50 are reserved by the pending transfer
        let over = vec![
            alice.transfer("bob", 20, 0).unwrap(),
            alice.transfer("bob", 11, 0).unwrap(),
        ];
        let err = ledger
            .add_block(Block::new(2, unix_millis(), over, ZERO_HASH))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds {
                required: 11,
                available: 10,
                ..
            }
        ));

        let fits = vec![alice.transfer("bob", 30, 0).unwrap()];
        ledger
            .add_block(Block::new(2, unix_millis(), fits, ZERO_HASH))
            .unwrap();
        assert_eq!(alice.balance(&ledger), 20);
        assert_eq!(ledger.pending().len(), 1);
    }

    #[test]
    fn zero_reward_mines_without_reward_transaction() {
        let config = LedgerConfig::default()
            .with_difficulty(1)
            .with_mining_reward(0)
            .with_reward_only_blocks(true);
        let mut ledger = Ledger::new(config).unwrap();
        assert_eq!(
            ledger.mine_pending_transactions("miner").unwrap(),
            MineOutcome::NothingToMine
        );

        let wallet = Wallet::from_secret([2u8; 32]);
        wallet.send("bob", 5, 0, &mut ledger).unwrap();
        let outcome = ledger.mine_pending_transactions("miner").unwrap();
        let mined = outcome.mined().expect("block mined");
        assert_eq!(mined.reward, 0);
        assert_eq!(mined.transactions, 1);

        let block = ledger.latest_block().unwrap();
        assert!(!block.transactions[0].is_coinbase());
        assert!(ledger.pending().is_empty());
        assert_eq!(ledger.balance_of("miner"), 0);
        assert!(ledger.is_chain_valid());
    }

    #[test]
    fn zero_reward_still_pays_fees() {
        let config = LedgerConfig::default()
            .with_difficulty(1)
            .with_mining_reward(0);
        let mut ledger = Ledger::new(config).unwrap();
        let wallet = Wallet::from_secret([2u8; 32]);
        wallet.send("bob", 5, 3, &mut ledger).unwrap();
        ledger.mine_pending_transactions("miner").unwrap();
        assert_eq!(ledger.balance_of("miner"), 3);
        assert!(ledger.latest_block().unwrap().transactions[0].is_coinbase());
    }

    #[test]
    fn fee_overflow_blocks_mining() {
        let mut ledger = ledger(1);
        let wallet = Wallet::from_secret([2u8; 32]);
        wallet.send("bob", 5, u64::MAX, &mut ledger).unwrap();
        wallet.send("carol", 5, 1, &mut ledger).unwrap();
        assert!(matches!(
            ledger.mine_pending_transactions("miner"),
            Err(LedgerError::AmountOverflow)
        ));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.pending().len(), 2);
    }

    #[test]
    fn repeated_id_across_blocks_is_reported() {
        let mut ledger = ledger(1);
        let wallet = Wallet::from_secret([2u8; 32]);
        let tx = wallet.transfer("bob", 5, 0).unwrap();
        ledger
            .add_block(Block::new(1, unix_millis(), vec![tx.clone()], ZERO_HASH))
            .unwrap();
        ledger
            .add_block(Block::new(2, unix_millis(), vec![], ZERO_HASH))
            .unwrap();
        // smuggle the mined transfer into block 2 and reseal it
        ledger
            .tamper_block(2, |block| {
                block.transactions.push(tx);
                block.hash = block.compute_hash();
            })
            .unwrap();
        assert!(matches!(
            ledger.validate_chain(),
            Err(LedgerError::InvalidBlockTransaction { index: 2, .. })
        ));
    }

    #[test]
    fn add_block_links_and_mines() {
        let mut ledger = ledger(2);
        let block = Block::new(1, unix_millis(), vec![], [9u8; 32]);
        let mined = ledger.add_block(block).unwrap();
        let stored = ledger.block_by_index(1).unwrap();
        assert_eq!(stored.previous_hash, ledger.blocks()[0].hash);
        assert!(stored.meets_difficulty(2));
        assert_eq!(mined.hash, stored.hash);
        assert!(ledger.is_chain_valid());
    }

    #[test]
    fn add_block_rejects_wrong_index() {
        let mut ledger = ledger(1);
        let block = Block::new(5, unix_millis(), vec![], ZERO_HASH);
        assert!(matches!(
            ledger.add_block(block),
            Err(LedgerError::ChainIndexMismatch { position: 1, index: 5 })
        ));
    }

    #[test]
    fn difficulty_change_is_not_retroactive() {
        let mut ledger = ledger(1);
        ledger
            .add_block(Block::new(1, unix_millis(), vec![], ZERO_HASH))
            .unwrap();
        ledger.set_difficulty(3).unwrap();
        ledger
            .add_block(Block::new(2, unix_millis(), vec![], ZERO_HASH))
            .unwrap();
        assert!(ledger.blocks()[2].meets_difficulty(3));
        assert!(ledger.is_chain_valid());
        assert!(ledger.set_difficulty(65).is_err());
    }

    #[test]
    fn linkage_break_is_reported() {
        let mut ledger = ledger(1);
        for i in 1..=2 {
            ledger
                .add_block(Block::new(i, unix_millis(), vec![], ZERO_HASH))
                .unwrap();
        }
        ledger
            .tamper_block(2, |block| {
                block.previous_hash = [1u8; 32];
                block.hash = block.compute_hash();
            })
            .unwrap();
        assert!(matches!(
            ledger.validate_chain(),
            Err(LedgerError::ChainLinkageBroken { index: 2 })
        ));
    }

    #[test]
    fn rehashed_transaction_edit_is_still_caught() {
        let mut ledger = ledger(1);
        let wallet = Wallet::from_secret([8u8; 32]);
        wallet.send("bob", 5, 0, &mut ledger).unwrap();
        ledger.mine_pending_transactions("miner").unwrap();
        // rewrite the amount and the block hash, but not the transaction hash
        ledger
            .tamper_block(1, |block| {
                block.transactions[1].amount = 5_000;
                block.hash = block.compute_hash();
            })
            .unwrap();
        assert!(matches!(
            ledger.validate_chain(),
            Err(LedgerError::InvalidBlockTransaction { index: 1, .. })
        ));
    }

    #[test]
    fn tamper_unknown_block() {
        let mut ledger = ledger(1);
        assert!(matches!(
            ledger.tamper_block(3, |_| {}),
            Err(LedgerError::BlockNotFound(3))
        ));
    }

    #[test]
    fn genesis_edit_is_reported() {
        let mut ledger = ledger(1);
        ledger.tamper_block(0, |block| block.nonce = 1).unwrap();
        assert!(matches!(
            ledger.validate_chain(),
            Err(LedgerError::InvalidGenesis)
        ));
    }

    #[test]
    fn stale_candidate_is_refused() {
        let mut ledger = ledger(1);
        let wallet = Wallet::from_secret([6u8; 32]);
        wallet.send("bob", 5, 0, &mut ledger).unwrap();
        let mut candidate = ledger.candidate("miner").unwrap().unwrap();
        let stats = candidate.mine(&MineOptions::default(), &TracingObserver).unwrap();
        ledger
            .add_block(Block::new(1, unix_millis(), vec![], ZERO_HASH))
            .unwrap();
        assert!(matches!(
            ledger.commit(candidate, stats),
            Err(LedgerError::StaleCandidate { index: 1 })
        ));
        assert_eq!(ledger.pending().len(), 1);
    }

    #[test]
    fn stats_and_lookup() {
        let mut ledger = ledger(1);
        ledger
            .add_block(Block::new(1, unix_millis(), vec![], ZERO_HASH))
            .unwrap();
        let stats = ledger.stats();
        assert_eq!(stats.total_blocks, 2);
        assert!(stats.is_valid);
        assert_eq!(stats.latest_block_index, 1);
        assert_eq!(stats.genesis_block_hash, Block::genesis().hash_hex());
        assert_eq!(stats.latest_block_hash, ledger.blocks()[1].hash_hex());
        assert!(ledger.block_by_index(1).is_some());
        assert!(ledger.block_by_index(10).is_none());
    }

    #[test]
    fn chain_json_round_trips() {
        let mut ledger = ledger(1);
        let wallet = Wallet::from_secret([1u8; 32]);
        wallet.send("bob", 5, 1, &mut ledger).unwrap();
        ledger.mine_pending_transactions("miner").unwrap();
        let json = ledger.to_json().unwrap();
        let blocks: Vec<Block> = serde_json::from_str(&json).unwrap();
        assert_eq!(blocks, ledger.blocks());
    }
}
