//! Consecutive-range finality scan
//!
//! Blocks are checked in ascending height order and the scan stops at the
//! first block that is not finalized. This assumes finality is monotonic along
//! one fork: once a height misses quorum, later heights are not queried.

use async_trait::async_trait;
use tracing::debug;

use crate::context::QueryContext;
use crate::domain::{ensure_consecutive, L2Block};
use crate::error::FinalityResult;

/// Single-block finality decision used by the scan
#[async_trait]
pub trait BlockFinalityCheck: Send + Sync {
    async fn check_block(&self, ctx: &QueryContext, block: &L2Block) -> FinalityResult<bool>;
}

/// Height of the last block of the finalized prefix of `blocks`
///
/// Input is validated before any check runs. Any error aborts the scan and
/// discards the heights confirmed so far.
pub async fn latest_finalized<B>(
    checker: &B,
    ctx: &QueryContext,
    blocks: &[L2Block],
) -> FinalityResult<Option<u64>>
where
    B: BlockFinalityCheck + ?Sized,
{
    ensure_consecutive(blocks)?;

    let mut latest = None;
    for block in blocks {
        if !checker.check_block(ctx, block).await? {
            debug!(
                block_height = block.block_height,
                ?latest,
                "range scan stopped at non-finalized block"
            );
            break;
        }
        latest = Some(block.block_height);
    }
    Ok(latest)
}
