//! Driving Ports (API - Inbound)

use crate::context::QueryContext;
use crate::domain::{FinalityProviderId, L2Block, PowerMap, ProviderSet};
use crate::error::FinalityResult;
use async_trait::async_trait;

/// Primary Finality Gadget API
///
/// Every call is a stateless read against the collaborators' current view.
#[async_trait]
pub trait FinalityGadgetApi: Send + Sync {
    /// Has this block reached a two-thirds BTC-stake quorum?
    ///
    /// Always `true` while the gadget is disabled. Fails with
    /// `NoVotingPower` when the committee has no stake at the block's BTC height.
    async fn is_block_finalized(&self, ctx: &QueryContext, block: &L2Block)
        -> FinalityResult<bool>;

    /// Height of the last finalized block in a consecutive prefix of `blocks`
    ///
    /// Stops at the first block that is not finalized. Any error discards
    /// the partial answer.
    async fn latest_finalized_height(
        &self,
        ctx: &QueryContext,
        blocks: &[L2Block],
    ) -> FinalityResult<Option<u64>>;

    /// Finality providers registered for the served consumer chain
    async fn committee(&self, ctx: &QueryContext) -> FinalityResult<ProviderSet>;

    /// Active stake of each provider at a BTC height
    async fn voting_power(
        &self,
        ctx: &QueryContext,
        providers: &ProviderSet,
        btc_height: u64,
    ) -> FinalityResult<PowerMap>;

    /// Active stake of one provider at a BTC height
    async fn provider_power(
        &self,
        ctx: &QueryContext,
        fp: &FinalityProviderId,
        btc_height: u64,
    ) -> FinalityResult<u64>;

    /// Lowest BTC height at which any of `providers` had an active delegation
    async fn earliest_active_height(
        &self,
        ctx: &QueryContext,
        providers: &ProviderSet,
    ) -> FinalityResult<Option<u64>>;

    /// Same as `earliest_active_height` over the whole consumer committee
    async fn committee_earliest_active_height(
        &self,
        ctx: &QueryContext,
    ) -> FinalityResult<Option<u64>>;
}
