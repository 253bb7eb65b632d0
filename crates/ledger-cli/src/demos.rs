use anyhow::{Context, Result};
use ledger_core::{
    unix_millis, Balance, Block, Ledger, LedgerConfig, MineOutcome, Transaction, Wallet, ZERO_HASH,
};
use tracing::info;

/// Fresh ledger where the first wallet mines every block and pays the
/// others from its rewards.
fn sample_ledger(config: LedgerConfig, blocks: u64) -> Result<(Ledger, Vec<Wallet>)> {
    let mut ledger = Ledger::new(config.with_reward_only_blocks(true))?;
    let wallets: Vec<Wallet> = (0..3).map(|_| Wallet::generate()).collect();
    let funder = &wallets[0];
    for round in 0..blocks {
        let amount = 10 + round;
        if round > 0 && funder.balance(&ledger) > Balance::from(amount + 1) {
            let receiver = &wallets[1 + round as usize % 2];
            funder.send(receiver.address(), amount, 1, &mut ledger)?;
        }
        ledger.mine_pending_transactions(funder.address())?;
    }
    Ok((ledger, wallets))
}

fn short(hash: &str) -> &str {
    &hash[..16.min(hash.len())]
}

pub fn difficulty(config: LedgerConfig, levels: &[u32]) -> Result<()> {
    let mut ledger = Ledger::new(config.with_reward_only_blocks(true))?;
    let alice = Wallet::generate();
    let bob = Wallet::generate();

    info!("funding alice through a reward-only block");
    ledger.mine_pending_transactions(alice.address())?;

    for (i, level) in levels.iter().enumerate() {
        ledger.set_difficulty(*level)?;
        let tx = alice.transfer(bob.address(), i as u64 + 1, 0)?;
        let block = Block::new(ledger.len() as u64, unix_millis(), vec![tx], ZERO_HASH);
        let mined = ledger
            .add_block(block)
            .with_context(|| format!("cannot add a block at difficulty {level}"))?;
        println!(
            "difficulty {level}: block {} nonce {} attempts {} in {:.2?} hash {}...",
            mined.index,
            mined.stats.nonce,
            mined.stats.attempts,
            mined.stats.elapsed,
            short(&hex::encode(mined.hash))
        );
    }

    for block in ledger.blocks() {
        println!(
            "Block {}: {}... (nonce: {})",
            block.index,
            short(&block.hash_hex()),
            block.nonce
        );
    }
    println!("chain valid: {}", ledger.is_chain_valid());
    Ok(())
}

pub fn economy(config: LedgerConfig) -> Result<()> {
    let mut ledger = Ledger::new(
        config
            .with_balance_check(true)
            .with_reward_only_blocks(true),
    )?;
    let alice = Wallet::generate();
    let bob = Wallet::generate();
    let charlie = Wallet::generate();
    let miner = Wallet::generate();
    let names = [
        ("alice", &alice),
        ("bob", &bob),
        ("charlie", &charlie),
        ("miner", &miner),
    ];

    info!("funding alice through a reward-only block");
    ledger.mine_pending_transactions(alice.address())?;

    alice.send(bob.address(), 50, 1, &mut ledger)?;
    ledger.mine_pending_transactions(miner.address())?;

    bob.send(charlie.address(), 20, 1, &mut ledger)?;
    ledger.mine_pending_transactions(miner.address())?;

    for (name, wallet) in names {
        println!("{name:>8} {} balance {}", wallet.address(), wallet.balance(&ledger));
    }

    println!("invalid transactions:");
    match charlie.send(alice.address(), 1_000, 0, &mut ledger) {
        Err(err) => println!("  overspend rejected: {err}"),
        Ok(_) => println!("  overspend unexpectedly accepted"),
    }
    let unsigned = Transaction::create(bob.address(), alice.address(), 5, 0)?;
    match ledger.create_transaction(unsigned) {
        Err(err) => println!("  unsigned rejected: {err}"),
        Ok(()) => println!("  unsigned unexpectedly accepted"),
    }
    match bob.transfer(alice.address(), 0, 0) {
        Err(err) => println!("  zero amount rejected: {err}"),
        Ok(_) => println!("  zero amount unexpectedly accepted"),
    }
    let mut forged = Transaction::create(alice.address(), bob.address(), 5, 0)?;
    match forged.sign(&bob) {
        Err(err) => println!("  foreign signer rejected: {err}"),
        Ok(()) => println!("  foreign signer unexpectedly accepted"),
    }

    if let MineOutcome::Mined(mined) = ledger.mine_pending_transactions(miner.address())? {
        println!("mined empty-pool block {} paying {}", mined.index, mined.reward);
    }
    println!("chain valid: {}", ledger.is_chain_valid());
    Ok(())
}

pub fn tamper(config: LedgerConfig, index: u64) -> Result<()> {
    let (mut ledger, _wallets) = sample_ledger(config, 3)?;
    println!("before tampering: valid = {}", ledger.is_chain_valid());

    ledger
        .tamper_block(index, |block| match block.transactions.last_mut() {
            Some(tx) => tx.amount = tx.amount.saturating_mul(10),
            None => block.nonce = block.nonce.wrapping_add(1),
        })
        .with_context(|| format!("cannot tamper with block {index}"))?;

    match ledger.validate_chain() {
        Ok(()) => println!("after tampering: chain still valid"),
        Err(err) => println!("after tampering: INVALID ({err})"),
    }
    Ok(())
}

pub fn show(config: LedgerConfig, blocks: u64) -> Result<()> {
    let (ledger, _wallets) = sample_ledger(config, blocks)?;
    println!("{}", serde_json::to_string_pretty(&ledger.stats())?);
    println!("{}", ledger.to_json()?);
    Ok(())
}
