//! Earliest active delegation height
//!
//! Finds the lowest BTC height at which any provider of a set first had an
//! active delegation. Used to bound how far back historical scans must look.
//! Providers are queried concurrently; the minimum is taken at the single
//! reduction point of the fan-out, so completion order cannot change it.

use std::sync::Arc;

use futures::future;
use futures::stream::TryStreamExt;
use tracing::debug;

use crate::algorithms::fan_out::fan_out;
use crate::algorithms::pagination::delegations;
use crate::algorithms::power::current_view;
use crate::context::QueryContext;
use crate::domain::{FinalityProviderId, ProviderSet};
use crate::error::FinalityResult;
use crate::ports::outbound::ChainQuery;

fn earlier(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Earliest confirmation height among the active delegations of one provider
pub async fn provider_earliest_height<C>(
    chain: &C,
    ctx: &QueryContext,
    fp: &FinalityProviderId,
) -> FinalityResult<Option<u64>>
where
    C: ChainQuery + ?Sized,
{
    let view = current_view(chain, ctx).await?;
    delegations(chain, ctx, fp)
        .try_fold(None, |earliest, delegation| {
            future::ready(Ok(earlier(earliest, view.active_since(&delegation))))
        })
        .await
}

/// Earliest active delegation height across `providers`
///
/// `None` when no provider has an active delegation. The first provider
/// failure cancels the rest and is returned in place of any result.
pub async fn earliest_active_height<C>(
    chain: Arc<C>,
    ctx: &QueryContext,
    providers: &ProviderSet,
    max_in_flight: usize,
) -> FinalityResult<Option<u64>>
where
    C: ChainQuery + ?Sized + 'static,
{
    let earliest = fan_out(
        chain,
        ctx,
        providers,
        max_in_flight,
        |chain, task_ctx, fp| async move {
            provider_earliest_height(chain.as_ref(), &task_ctx, &fp).await
        },
        None,
        |earliest, _fp, height| earlier(earliest, height),
    )
    .await?;
    debug!(providers = providers.len(), ?earliest, "earliest active delegation height");
    Ok(earliest)
}
