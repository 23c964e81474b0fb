//! Voting power aggregation
//!
//! Staking params and the BTC tip are read once per aggregation, so every
//! delegation of every provider is judged against the same view. The view is
//! capped at the requested BTC height: stake confirmed after that height does
//! not count.
//!
//! Both forms are all-or-nothing: one failed provider fails the call.

use std::sync::Arc;

use futures::future;
use futures::stream::TryStreamExt;
use tracing::debug;

use crate::algorithms::fan_out::fan_out;
use crate::algorithms::pagination::delegations;
use crate::context::QueryContext;
use crate::domain::{ActivationView, FinalityProviderId, PowerMap, ProviderSet};
use crate::error::FinalityResult;
use crate::ports::outbound::ChainQuery;

/// Params and tip as currently reported by the staking chain
pub async fn current_view<C>(chain: &C, ctx: &QueryContext) -> FinalityResult<ActivationView>
where
    C: ChainQuery + ?Sized,
{
    let params = ctx.call("staking_params", chain.staking_params()).await?;
    let tip = ctx.call("btc_tip_height", chain.btc_tip_height()).await?;
    Ok(ActivationView::new(tip, params))
}

/// Current view capped at `btc_height`
pub async fn view_at_height<C>(
    chain: &C,
    ctx: &QueryContext,
    btc_height: u64,
) -> FinalityResult<ActivationView>
where
    C: ChainQuery + ?Sized,
{
    let mut view = current_view(chain, ctx).await?;
    view.latest_btc_height = view.latest_btc_height.min(btc_height);
    Ok(view)
}

/// Active stake of one provider under a fixed view
pub async fn stake_under_view<C>(
    chain: &C,
    ctx: &QueryContext,
    fp: &FinalityProviderId,
    view: &ActivationView,
) -> FinalityResult<u64>
where
    C: ChainQuery + ?Sized,
{
    delegations(chain, ctx, fp)
        .try_fold(0u64, |power, delegation| {
            future::ready(Ok(power.saturating_add(view.active_stake(&delegation))))
        })
        .await
}

/// Active stake of one provider at `btc_height`
pub async fn provider_power<C>(
    chain: &C,
    ctx: &QueryContext,
    fp: &FinalityProviderId,
    btc_height: u64,
) -> FinalityResult<u64>
where
    C: ChainQuery + ?Sized,
{
    let view = view_at_height(chain, ctx, btc_height).await?;
    stake_under_view(chain, ctx, fp, &view).await
}

/// Power of every provider, one provider after another
pub async fn power_serial<C>(
    chain: &C,
    ctx: &QueryContext,
    providers: &ProviderSet,
    btc_height: u64,
) -> FinalityResult<PowerMap>
where
    C: ChainQuery + ?Sized,
{
    let view = view_at_height(chain, ctx, btc_height).await?;
    let mut power = PowerMap::zeroed(providers);
    for fp in providers.iter() {
        let stake = stake_under_view(chain, ctx, fp, &view).await?;
        power.insert(fp.clone(), stake);
    }
    debug!(
        providers = providers.len(),
        btc_height,
        total = power.total_power(),
        "aggregated voting power"
    );
    Ok(power)
}

/// Power of every provider, queried concurrently
pub async fn power_concurrent<C>(
    chain: Arc<C>,
    ctx: &QueryContext,
    providers: &ProviderSet,
    btc_height: u64,
    max_in_flight: usize,
) -> FinalityResult<PowerMap>
where
    C: ChainQuery + ?Sized + 'static,
{
    let view = view_at_height(chain.as_ref(), ctx, btc_height).await?;
    let power = fan_out(
        chain,
        ctx,
        providers,
        max_in_flight,
        move |chain, task_ctx, fp| async move {
            stake_under_view(chain.as_ref(), &task_ctx, &fp, &view).await
        },
        PowerMap::zeroed(providers),
        |mut power, fp, stake| {
            power.insert(fp, stake);
            power
        },
    )
    .await?;
    debug!(
        providers = providers.len(),
        btc_height,
        total = power.total_power(),
        "aggregated voting power concurrently"
    );
    Ok(power)
}
