//! Command line interface

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use fg_finality::L2Block;

/// Babylon finality gadget daemon
#[derive(Debug, Parser)]
#[command(name = "fgd", version, about)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long = "cfg", global = true, default_value = "config.toml")]
    pub cfg: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check whether one L2 block is finalized
    Check {
        #[arg(long)]
        height: u64,
        /// Block hash, with or without 0x
        #[arg(long)]
        hash: String,
        /// Block timestamp in unix seconds
        #[arg(long)]
        timestamp: u64,
    },

    /// Latest finalized height in a run of consecutive blocks
    Range {
        /// Block as HEIGHT:HASH:TIMESTAMP, in ascending height order
        #[arg(long = "block", required = true, num_args = 1..)]
        blocks: Vec<BlockArg>,
    },

    /// List the finality providers of the consumer chain
    Committee,

    /// Voting power of the committee at a BTC height
    Power {
        #[arg(long)]
        btc_height: u64,
    },

    /// Earliest BTC height with an active delegation in the committee
    Earliest,
}

/// `HEIGHT:HASH:TIMESTAMP`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockArg(pub L2Block);

impl FromStr for BlockArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let (Some(height), Some(hash), Some(timestamp), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(format!("expected HEIGHT:HASH:TIMESTAMP, got {s:?}"));
        };

        let height = height
            .parse()
            .map_err(|e| format!("invalid height {height:?}: {e}"))?;
        let timestamp = timestamp
            .parse()
            .map_err(|e| format!("invalid timestamp {timestamp:?}: {e}"))?;
        if hash.is_empty() {
            return Err("empty block hash".to_string());
        }
        Ok(BlockArg(L2Block::new(hash, height, timestamp)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_block_arg() {
        let BlockArg(block) = "12:0xAB:1700000000".parse().unwrap();
        assert_eq!(block, L2Block::new("0xAB", 12, 1_700_000_000));

        assert!("12:0xab".parse::<BlockArg>().is_err());
        assert!("12:0xab:1:2".parse::<BlockArg>().is_err());
        assert!("x:0xab:1".parse::<BlockArg>().is_err());
        assert!("12::1".parse::<BlockArg>().is_err());
    }

    #[test]
    fn test_parse_range() {
        let cli = Cli::try_parse_from([
            "fgd",
            "--cfg",
            "/etc/fgd.toml",
            "range",
            "--block",
            "1:aa:10",
            "--block",
            "2:bb:12",
        ])
        .unwrap();
        assert_eq!(cli.cfg, PathBuf::from("/etc/fgd.toml"));
        match cli.command {
            Command::Range { blocks } => assert_eq!(blocks.len(), 2),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cfg_after_subcommand() {
        let cli = Cli::try_parse_from(["fgd", "power", "--btc-height", "800", "--cfg", "x.toml"])
            .unwrap();
        assert_eq!(cli.cfg, PathBuf::from("x.toml"));
        assert!(matches!(cli.command, Command::Power { btc_height: 800 }));
    }
}
