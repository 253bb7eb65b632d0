mod demos;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ledger_core::{constants, HalvingReward, LedgerConfig};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "Demonstrations of the proof-of-work ledger")]
struct Cli {
    /// Leading zero hex digits required of mined blocks
    #[arg(long, global = true, default_value_t = constants::DEFAULT_DIFFICULTY)]
    difficulty: u32,
    /// Base mining reward
    #[arg(long, global = true, default_value_t = constants::DEFAULT_MINING_REWARD)]
    reward: u64,
    /// Halve the reward every N blocks (0 keeps it fixed)
    #[arg(long, global = true, default_value_t = 0)]
    halving_interval: u64,
    /// Mine reward-only blocks when the pool is empty
    #[arg(long, global = true)]
    reward_only_blocks: bool,
    /// Reject transfers the sender cannot cover
    #[arg(long, global = true)]
    check_balance: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine one block per difficulty level and compare the work
    Difficulty {
        /// Comma separated difficulty levels
        #[arg(long, value_delimiter = ',', default_value = "1,2,4")]
        levels: Vec<u32>,
    },
    /// Wallets, transfers, fees and rewards (always checks balances)
    Economy,
    /// Corrupt a mined block and watch validation fail
    Tamper {
        /// Block to corrupt
        #[arg(long, default_value_t = 1)]
        index: u64,
    },
    /// Print chain statistics and the chain as JSON
    Show {
        /// Blocks to mine into the sample chain
        #[arg(long, default_value_t = 3)]
        blocks: u64,
    },
}

impl Cli {
    fn config(&self) -> LedgerConfig {
        let config = LedgerConfig::default()
            .with_difficulty(self.difficulty)
            .with_reward_only_blocks(self.reward_only_blocks)
            .with_balance_check(self.check_balance);
        if self.halving_interval > 0 {
            config.with_reward_policy(HalvingReward {
                initial: self.reward,
                interval: self.halving_interval,
            })
        } else {
            config.with_mining_reward(self.reward)
        }
    }
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = cli.config();
    match cli.cmd {
        Command::Difficulty { levels } => demos::difficulty(config, &levels),
        Command::Economy => demos::economy(config),
        Command::Tamper { index } => demos::tamper(config, index),
        Command::Show { blocks } => demos::show(config, blocks),
    }
}
