//! Finality Gadget Service - Core business logic
//!
//! Orchestrates one block's evaluation across the collaborators:
//!
//! 1. enabled flag (disabled gadget passes every block)
//! 2. hash normalization
//! 3. consumer ID → committee → BTC height at the block timestamp
//! 4. committee power at that height (zero power is an error)
//! 5. voters for `(height, hash)` → voted power → two-thirds rule

use crate::algorithms::{
    earliest_active_height, latest_finalized, power_concurrent, power_serial, provider_power,
    BlockFinalityCheck,
};
use crate::context::QueryContext;
use crate::domain::{evaluate, FinalityProviderId, L2Block, PowerMap, ProviderSet, QuorumOutcome};
use crate::error::{FinalityError, FinalityResult};
use crate::metrics;
use crate::ports::inbound::FinalityGadgetApi;
use crate::ports::outbound::{BitcoinTimeOracle, ChainQuery, ContractState};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How committee power is gathered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerStrategy {
    /// One provider after another
    Serial,
    /// Providers queried in parallel, bounded by `max_in_flight_queries`
    #[default]
    Concurrent,
}

/// Finality engine configuration
#[derive(Clone, Debug)]
pub struct FinalityConfig {
    /// Upper bound on concurrent per-provider queries
    pub max_in_flight_queries: usize,
    pub power_strategy: PowerStrategy,
}

impl Default for FinalityConfig {
    fn default() -> Self {
        Self {
            max_in_flight_queries: 16,
            power_strategy: PowerStrategy::Concurrent,
        }
    }
}

/// Finality Gadget Service implementation
pub struct FinalityGadgetService<C, W, O>
where
    C: ChainQuery,
    W: ContractState,
    O: BitcoinTimeOracle,
{
    config: FinalityConfig,
    chain: Arc<C>,
    contract: Arc<W>,
    oracle: Arc<O>,
}

impl<C, W, O> FinalityGadgetService<C, W, O>
where
    C: ChainQuery + 'static,
    W: ContractState,
    O: BitcoinTimeOracle,
{
    /// Create new finality gadget service
    pub fn new(config: FinalityConfig, chain: Arc<C>, contract: Arc<W>, oracle: Arc<O>) -> Self {
        Self {
            config,
            chain,
            contract,
            oracle,
        }
    }

    pub fn config(&self) -> &FinalityConfig {
        &self.config
    }

    async fn fetch_committee(&self, ctx: &QueryContext) -> FinalityResult<(String, ProviderSet)> {
        let consumer_id = ctx
            .call("consumer_id", self.contract.consumer_id())
            .await?;
        let providers: ProviderSet = ctx
            .call(
                "list_finality_providers",
                self.chain.list_finality_providers(&consumer_id),
            )
            .await?
            .into_iter()
            .collect();
        Ok((consumer_id, providers))
    }

    async fn power_at(
        &self,
        ctx: &QueryContext,
        providers: &ProviderSet,
        btc_height: u64,
    ) -> FinalityResult<PowerMap> {
        match self.config.power_strategy {
            PowerStrategy::Serial => {
                power_serial(self.chain.as_ref(), ctx, providers, btc_height).await
            }
            PowerStrategy::Concurrent => {
                power_concurrent(
                    Arc::clone(&self.chain),
                    ctx,
                    providers,
                    btc_height,
                    self.config.max_in_flight_queries,
                )
                .await
            }
        }
    }

    /// Quorum outcome for one block
    ///
    /// `NoQuorumPossible` never escapes: zero committee power is reported as
    /// `FinalityError::NoVotingPower` before votes are fetched.
    async fn evaluate_block(
        &self,
        ctx: &QueryContext,
        block: &L2Block,
    ) -> FinalityResult<QuorumOutcome> {
        let enabled = ctx.call("is_enabled", self.contract.is_enabled()).await?;
        if !enabled {
            debug!(
                block_height = block.block_height,
                "finality gadget disabled, passing block through"
            );
            return Ok(QuorumOutcome::Finalized);
        }

        let block = block.normalized();
        let (consumer_id, providers) = self.fetch_committee(ctx).await?;

        let btc_height = ctx
            .call(
                "height_at_timestamp",
                self.oracle.height_at_timestamp(block.block_timestamp),
            )
            .await?;

        let power = self.power_at(ctx, &providers, btc_height).await?;
        let total_power = power.total_power();
        if total_power == 0 {
            warn!(
                consumer_id = %consumer_id,
                block_height = block.block_height,
                btc_height,
                "no finality provider has voting power"
            );
            return Err(FinalityError::NoVotingPower { consumer_id });
        }

        let voters = ctx
            .call("voted_providers", self.contract.voted_providers(&block))
            .await?;
        let voted_power = power.voted_power(&voters);
        let outcome = evaluate(total_power, voted_power);

        debug!(
            block_height = block.block_height,
            block_hash = %block.block_hash,
            btc_height,
            total_power,
            voted_power,
            voters = voters.len(),
            outcome = outcome.as_str(),
            "evaluated block finality"
        );
        Ok(outcome)
    }
}

#[async_trait]
impl<C, W, O> BlockFinalityCheck for FinalityGadgetService<C, W, O>
where
    C: ChainQuery + 'static,
    W: ContractState + 'static,
    O: BitcoinTimeOracle + 'static,
{
    async fn check_block(&self, ctx: &QueryContext, block: &L2Block) -> FinalityResult<bool> {
        match self.evaluate_block(ctx, block).await {
            Ok(outcome) => {
                metrics::record_block_outcome(outcome.as_str());
                Ok(outcome.is_finalized())
            }
            Err(err) => {
                let label = match err {
                    FinalityError::NoVotingPower { .. } => QuorumOutcome::NoQuorumPossible.as_str(),
                    _ => "error",
                };
                metrics::record_block_outcome(label);
                Err(err)
            }
        }
    }
}

#[async_trait]
impl<C, W, O> FinalityGadgetApi for FinalityGadgetService<C, W, O>
where
    C: ChainQuery + 'static,
    W: ContractState + 'static,
    O: BitcoinTimeOracle + 'static,
{
    async fn is_block_finalized(
        &self,
        ctx: &QueryContext,
        block: &L2Block,
    ) -> FinalityResult<bool> {
        ctx.run(self.check_block(ctx, block)).await
    }

    async fn latest_finalized_height(
        &self,
        ctx: &QueryContext,
        blocks: &[L2Block],
    ) -> FinalityResult<Option<u64>> {
        let latest = ctx.run(latest_finalized(self, ctx, blocks)).await?;
        metrics::record_range_query(latest);
        info!(
            blocks = blocks.len(),
            ?latest,
            "range finality query answered"
        );
        Ok(latest)
    }

    async fn committee(&self, ctx: &QueryContext) -> FinalityResult<ProviderSet> {
        let (_, providers) = ctx.run(self.fetch_committee(ctx)).await?;
        Ok(providers)
    }

    async fn voting_power(
        &self,
        ctx: &QueryContext,
        providers: &ProviderSet,
        btc_height: u64,
    ) -> FinalityResult<PowerMap> {
        ctx.run(self.power_at(ctx, providers, btc_height)).await
    }

    async fn provider_power(
        &self,
        ctx: &QueryContext,
        fp: &FinalityProviderId,
        btc_height: u64,
    ) -> FinalityResult<u64> {
        ctx.run(provider_power(self.chain.as_ref(), ctx, fp, btc_height))
            .await
    }

    async fn earliest_active_height(
        &self,
        ctx: &QueryContext,
        providers: &ProviderSet,
    ) -> FinalityResult<Option<u64>> {
        ctx.run(earliest_active_height(
            Arc::clone(&self.chain),
            ctx,
            providers,
            self.config.max_in_flight_queries,
        ))
        .await
    }

    async fn committee_earliest_active_height(
        &self,
        ctx: &QueryContext,
    ) -> FinalityResult<Option<u64>> {
        let providers = self.committee(ctx).await?;
        self.earliest_active_height(ctx, &providers).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Delegation, StakingParams};
    use crate::error::{CollaboratorError, CollaboratorResult, ErrorKind};
    use crate::ports::outbound::{DelegationPage, PageCursor};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CONSUMER: &str = "consumer-chain-id";
    const HASH: &str = "d4e56740f876aef8c010b86a40d5f56745a118d0906a34e69aec8c0db1cb8fa3";

    // Mock implementations for testing

    /// Each provider holds one active delegation worth its power
    struct MockChain {
        powers: Mutex<HashMap<FinalityProviderId, u64>>,
        calls: AtomicUsize,
    }

    impl MockChain {
        fn new(powers: &[(&str, u64)]) -> Self {
            Self {
                powers: Mutex::new(
                    powers
                        .iter()
                        .map(|(id, p)| (FinalityProviderId::from(*id), *p))
                        .collect(),
                ),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChainQuery for MockChain {
        async fn list_finality_providers(
            &self,
            consumer_id: &str,
        ) -> CollaboratorResult<Vec<FinalityProviderId>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(consumer_id, CONSUMER);
            Ok(self.powers.lock().keys().cloned().collect())
        }

        async fn list_delegations(
            &self,
            fp: &FinalityProviderId,
            _cursor: Option<PageCursor>,
        ) -> CollaboratorResult<DelegationPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let power = self.powers.lock().get(fp).copied().unwrap_or(0);
            Ok(DelegationPage {
                delegations: vec![Delegation {
                    start_height: 1,
                    end_height: 1_000,
                    total_sat: power,
                    covenant_signature_count: 3,
                }],
                next_cursor: None,
            })
        }

        async fn staking_params(&self) -> CollaboratorResult<StakingParams> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StakingParams {
                btc_confirmation_depth: 6,
                covenant_quorum: 2,
            })
        }

        async fn btc_tip_height(&self) -> CollaboratorResult<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(500)
        }
    }

    struct MockContract {
        enabled: bool,
        votes: Vec<FinalityProviderId>,
        seen_blocks: Mutex<Vec<L2Block>>,
        fail_consumer_id: bool,
    }

    impl MockContract {
        fn voting(voters: &[&str]) -> Self {
            Self {
                enabled: true,
                votes: voters.iter().map(|v| FinalityProviderId::from(*v)).collect(),
                seen_blocks: Mutex::new(Vec::new()),
                fail_consumer_id: false,
            }
        }
    }

    #[async_trait]
    impl ContractState for MockContract {
        async fn is_enabled(&self) -> CollaboratorResult<bool> {
            Ok(self.enabled)
        }

        async fn consumer_id(&self) -> CollaboratorResult<String> {
            if self.fail_consumer_id {
                return Err(CollaboratorError::Unavailable("contract query".into()));
            }
            Ok(CONSUMER.to_string())
        }

        async fn voted_providers(
            &self,
            block: &L2Block,
        ) -> CollaboratorResult<Vec<FinalityProviderId>> {
            self.seen_blocks.lock().push(block.clone());
            Ok(self.votes.clone())
        }
    }

    struct MockOracle;

    #[async_trait]
    impl BitcoinTimeOracle for MockOracle {
        async fn height_at_timestamp(&self, _timestamp: u64) -> CollaboratorResult<u64> {
            Ok(111)
        }
    }

    fn create_test_service(
        powers: &[(&str, u64)],
        voters: &[&str],
        strategy: PowerStrategy,
    ) -> FinalityGadgetService<MockChain, MockContract, MockOracle> {
        FinalityGadgetService::new(
            FinalityConfig {
                max_in_flight_queries: 4,
                power_strategy: strategy,
            },
            Arc::new(MockChain::new(powers)),
            Arc::new(MockContract::voting(voters)),
            Arc::new(MockOracle),
        )
    }

    fn block() -> L2Block {
        L2Block::new(HASH, 123, 12_345)
    }

    #[tokio::test]
    async fn test_disabled_gadget_passes_everything() {
        let mut contract = MockContract::voting(&[]);
        contract.enabled = false;
        let chain = Arc::new(MockChain::new(&[]));
        let service = FinalityGadgetService::new(
            FinalityConfig::default(),
            Arc::clone(&chain),
            Arc::new(contract),
            Arc::new(MockOracle),
        );

        let ctx = QueryContext::new();
        assert!(service.is_block_finalized(&ctx, &block()).await.unwrap());
        assert_eq!(chain.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_quorum_table() {
        let cases: &[(&str, &[(&str, u64)], &[&str], bool)] = &[
            ("0% votes", &[("pk1", 100), ("pk2", 300)], &[], false),
            ("25% votes", &[("pk1", 100), ("pk2", 300)], &["pk1"], false),
            ("exact 2/3 votes", &[("pk1", 100), ("pk2", 100), ("pk3", 100)], &["pk1", "pk2"], true),
            ("75% votes", &[("pk1", 100), ("pk2", 300)], &["pk2"], true),
            ("100% votes", &[("pk1", 100), ("pk2", 100), ("pk3", 100)], &["pk1", "pk2", "pk3"], true),
        ];

        for strategy in [PowerStrategy::Serial, PowerStrategy::Concurrent] {
            for (name, powers, voters, expected) in cases {
                let service = create_test_service(powers, voters, strategy);
                let result = service
                    .is_block_finalized(&QueryContext::new(), &block())
                    .await
                    .unwrap();
                assert_eq!(result, *expected, "{name} ({strategy:?})");
            }
        }
    }

    #[tokio::test]
    async fn test_prefixed_hash_is_normalized() {
        let service = create_test_service(
            &[("pk1", 100), ("pk2", 100), ("pk3", 100), ("pk4", 100)],
            &["pk1", "pk2", "pk3"],
            PowerStrategy::Serial,
        );
        let ctx = QueryContext::new();

        let prefixed = L2Block::new(format!("0x{HASH}"), 123, 12_345);
        assert!(service.is_block_finalized(&ctx, &prefixed).await.unwrap());
        assert!(service.is_block_finalized(&ctx, &block()).await.unwrap());

        let seen = service.contract.seen_blocks.lock().clone();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|b| b.block_hash == HASH));
    }

    #[tokio::test]
    async fn test_zero_power_is_an_error_and_skips_votes() {
        let service = create_test_service(
            &[("pk1", 0), ("pk2", 0), ("pk3", 0)],
            &["pk1", "pk2", "pk3"],
            PowerStrategy::Concurrent,
        );

        let result = service
            .is_block_finalized(&QueryContext::new(), &block())
            .await;
        match result {
            Err(err @ FinalityError::NoVotingPower { .. }) => {
                assert_eq!(err.kind(), ErrorKind::NoQuorumPossible);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(service.contract.seen_blocks.lock().is_empty());
    }

    #[tokio::test]
    async fn test_voter_outside_committee_ignored() {
        let service = create_test_service(
            &[("pk1", 100), ("pk2", 300)],
            &["pk1", "intruder"],
            PowerStrategy::Serial,
        );
        let result = service
            .is_block_finalized(&QueryContext::new(), &block())
            .await
            .unwrap();
        assert!(!result);
    }

    #[tokio::test]
    async fn test_collaborator_failure_propagates() {
        let mut contract = MockContract::voting(&["pk1"]);
        contract.fail_consumer_id = true;
        let service = FinalityGadgetService::new(
            FinalityConfig::default(),
            Arc::new(MockChain::new(&[("pk1", 100)])),
            Arc::new(contract),
            Arc::new(MockOracle),
        );

        let result = service
            .is_block_finalized(&QueryContext::new(), &block())
            .await;
        assert!(matches!(
            result,
            Err(FinalityError::Collaborator {
                call: "consumer_id",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_cancelled_query() {
        let service = create_test_service(&[("pk1", 100)], &["pk1"], PowerStrategy::Concurrent);
        let ctx = QueryContext::new();
        ctx.cancel();
        let result = service.is_block_finalized(&ctx, &block()).await;
        assert!(matches!(result, Err(FinalityError::Cancelled)));
    }

    #[tokio::test]
    async fn test_committee_and_power_queries() {
        let service = create_test_service(
            &[("pk1", 100), ("pk2", 300)],
            &[],
            PowerStrategy::Concurrent,
        );
        let ctx = QueryContext::new();

        let committee = service.committee(&ctx).await.unwrap();
        assert_eq!(committee.len(), 2);

        let power = service.voting_power(&ctx, &committee, 111).await.unwrap();
        assert_eq!(power.total_power(), 400);

        let pk2 = FinalityProviderId::from("pk2");
        assert_eq!(service.provider_power(&ctx, &pk2, 111).await.unwrap(), 300);

        // start 1 + k 6
        let earliest = service.committee_earliest_active_height(&ctx).await.unwrap();
        assert_eq!(earliest, Some(7));
    }

    #[tokio::test]
    async fn test_range_through_service() {
        let service = create_test_service(
            &[("pk1", 100), ("pk2", 300)],
            &["pk2"],
            PowerStrategy::Serial,
        );
        let ctx = QueryContext::new();
        let blocks: Vec<_> = (10..13)
            .map(|h| L2Block::new(format!("0x{h:064x}"), h, 1_000 + h))
            .collect();

        let latest = service.latest_finalized_height(&ctx, &blocks).await.unwrap();
        assert_eq!(latest, Some(12));
    }
}
