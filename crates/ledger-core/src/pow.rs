use crate::constants::PROGRESS_INTERVAL;
use crate::error::{LedgerError, Result};
use crate::{Block, Hash};
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub fn count_leading_zero_bits(hash: &Hash) -> u32 {
    let mut total = 0u32;
    for b in hash {
        if *b == 0 {
            total += 8;
        } else {
            total += b.leading_zeros();
            break;
        }
    }
    total
}

/// Number of leading `0` characters in the hex encoding of `hash`.
pub fn leading_zero_hex_digits(hash: &Hash) -> u32 {
    count_leading_zero_bits(hash) / 4
}

/// True when the first `difficulty` hex digits of `hash` are all `0`.
pub fn meets_difficulty(hash: &Hash, difficulty: u32) -> bool {
    leading_zero_hex_digits(hash) >= difficulty
}

/// Cooperative stop flag checked on every mining attempt.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug)]
pub struct MineOptions {
    /// Report progress every this many attempts; 0 disables reporting.
    pub progress_interval: u64,
    /// Give up with [`LedgerError::MiningAborted`] after this many attempts.
    pub max_attempts: Option<u64>,
    pub cancel: Option<CancelToken>,
}

impl Default for MineOptions {
    fn default() -> Self {
        Self {
            progress_interval: PROGRESS_INTERVAL,
            max_attempts: None,
            cancel: None,
        }
    }
}

impl MineOptions {
    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Receives periodic notifications while a nonce search runs.
pub trait ProgressObserver {
    fn on_progress(&self, index: u64, nonce: u64, attempts: u64);
}

/// Default observer: emits a `tracing` debug event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_progress(&self, index: u64, nonce: u64, attempts: u64) {
        debug!(index, nonce, attempts, "mining in progress");
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MineStats {
    pub nonce: u64,
    pub attempts: u64,
    pub elapsed: Duration,
}

/// Mine `block` in place until its hash has `difficulty` leading zero hex
/// digits. Unbounded: returns only once the target is met.
pub fn mine_block(block: &mut Block, difficulty: u32) -> MineStats {
    let unbounded = |_: u64| Ok::<(), Infallible>(());
    match search(block, difficulty, PROGRESS_INTERVAL, &TracingObserver, unbounded) {
        Ok(stats) => stats,
        Err(never) => match never {},
    }
}

/// Mine `block` honouring the attempt cap and cancellation token in `options`.
///
/// On failure the block is reset to nonce 0 so the interrupted search
/// state is never reused.
pub fn mine_block_with(
    block: &mut Block,
    difficulty: u32,
    options: &MineOptions,
    observer: &dyn ProgressObserver,
) -> Result<MineStats> {
    let outcome = search(block, difficulty, options.progress_interval, observer, |attempts| {
        if options.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(LedgerError::MiningCancelled);
        }
        match options.max_attempts {
            Some(max) if attempts >= max => Err(LedgerError::MiningAborted { attempts }),
            _ => Ok(()),
        }
    });
    if outcome.is_err() {
        block.nonce = 0;
        block.hash = block.compute_hash();
    }
    outcome
}

fn search<E>(
    block: &mut Block,
    difficulty: u32,
    progress_interval: u64,
    observer: &dyn ProgressObserver,
    mut keep_going: impl FnMut(u64) -> std::result::Result<(), E>,
) -> std::result::Result<MineStats, E> {
    let start = Instant::now();
    let mut attempts = 1u64;
    block.hash = block.compute_hash();

    while !meets_difficulty(&block.hash, difficulty) {
        keep_going(attempts)?;
        block.nonce = block.nonce.wrapping_add(1);
        block.hash = block.compute_hash();
        attempts += 1;
        if progress_interval > 0 && attempts % progress_interval == 0 {
            observer.on_progress(block.index, block.nonce, attempts);
        }
    }

    let stats = MineStats {
        nonce: block.nonce,
        attempts,
        elapsed: start.elapsed(),
    };
    info!(
        "Mined block {} with nonce {} after {} attempts in {:?}, hash {}",
        block.index,
        stats.nonce,
        stats.attempts,
        stats.elapsed,
        hex::encode(block.hash)
    );
    Ok(stats)
}
