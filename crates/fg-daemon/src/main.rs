//! # fgd
//!
//! Answers finality queries for an L2 chain secured by Babylon BTC staking.
//!
//! ```text
//! fgd --cfg config.toml check --height 42 --hash 0xabc... --timestamp 1700000000
//! fgd --cfg config.toml range --block 41:0x...:1699999998 --block 42:0x...:1700000000
//! fgd --cfg config.toml committee
//! fgd --cfg config.toml power --btc-height 850000
//! fgd --cfg config.toml earliest
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

use fg_daemon::cli::Cli;
use fg_daemon::config::DaemonConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = DaemonConfig::load(&cli.cfg)
        .with_context(|| format!("loading config {}", cli.cfg.display()))?;
    fg_daemon::logging::init(&config.logging)?;

    match fg_daemon::run(&config, cli.command).await {
        Ok(output) => {
            println!("{output}");
            Ok(())
        }
        Err(err) => {
            error!(error = %format!("{err:#}"), "query failed");
            Err(err)
        }
    }
}
