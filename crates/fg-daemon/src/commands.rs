//! Query command execution
//!
//! Each command runs one engine query and renders a plain-text answer.

use std::fmt::Write;

use anyhow::{Context, Result};
use fg_finality::{FinalityGadgetApi, L2Block, QueryContext};
use tracing::info;

use crate::cli::Command;

fn render_height(height: Option<u64>) -> String {
    height.map_or_else(|| "none".to_string(), |h| h.to_string())
}

/// Run `command` and return what should be printed
pub async fn execute<S>(api: &S, ctx: &QueryContext, command: Command) -> Result<String>
where
    S: FinalityGadgetApi + ?Sized,
{
    match command {
        Command::Check {
            height,
            hash,
            timestamp,
        } => {
            let block = L2Block::new(hash, height, timestamp);
            let finalized = api
                .is_block_finalized(ctx, &block)
                .await
                .with_context(|| format!("checking finality of block {height}"))?;
            info!(height, finalized, "block finality checked");
            Ok(format!("finalized: {finalized}"))
        }

        Command::Range { blocks } => {
            let blocks: Vec<L2Block> = blocks.into_iter().map(|b| b.0).collect();
            let latest = api
                .latest_finalized_height(ctx, &blocks)
                .await
                .context("scanning block range")?;
            Ok(format!("latest finalized: {}", render_height(latest)))
        }

        Command::Committee => {
            let committee = api.committee(ctx).await.context("listing committee")?;
            let mut out = format!("{} finality providers", committee.len());
            for fp in committee.iter() {
                write!(out, "\n{fp}")?;
            }
            Ok(out)
        }

        Command::Power { btc_height } => {
            let committee = api.committee(ctx).await.context("listing committee")?;
            let power = api
                .voting_power(ctx, &committee, btc_height)
                .await
                .with_context(|| format!("aggregating voting power at BTC height {btc_height}"))?;

            let mut out = String::new();
            for fp in committee.iter() {
                writeln!(out, "{fp}: {}", power.get(fp).unwrap_or(0))?;
            }
            write!(out, "total: {}", power.total_power())?;
            Ok(out)
        }

        Command::Earliest => {
            let earliest = api
                .committee_earliest_active_height(ctx)
                .await
                .context("finding earliest active delegation height")?;
            Ok(format!("earliest active height: {}", render_height(earliest)))
        }
    }
}
