//! Driven Ports (SPI - Outbound Dependencies)
//!
//! The engine only reads through these traits. Transport, retries and
//! connection pooling belong to the implementations.

use crate::domain::{Delegation, FinalityProviderId, L2Block, StakingParams};
use crate::error::CollaboratorResult;
use async_trait::async_trait;

/// Opaque continuation key returned by a paged query
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageCursor(pub Vec<u8>);

impl PageCursor {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One page of delegations for a finality provider
#[derive(Clone, Debug, Default)]
pub struct DelegationPage {
    pub delegations: Vec<Delegation>,
    /// `None` (or an empty cursor) when this was the last page
    pub next_cursor: Option<PageCursor>,
}

/// Staking chain queries: committee membership, delegations, parameters
#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// All finality providers registered for a consumer chain
    async fn list_finality_providers(
        &self,
        consumer_id: &str,
    ) -> CollaboratorResult<Vec<FinalityProviderId>>;

    /// One page of a provider's delegations, starting at `cursor`
    async fn list_delegations(
        &self,
        fp: &FinalityProviderId,
        cursor: Option<PageCursor>,
    ) -> CollaboratorResult<DelegationPage>;

    /// Confirmation depth and covenant quorum
    async fn staking_params(&self) -> CollaboratorResult<StakingParams>;

    /// Height of the BTC light client tip on the staking chain
    async fn btc_tip_height(&self) -> CollaboratorResult<u64>;
}

/// Finality contract state on the staking chain
#[async_trait]
pub trait ContractState: Send + Sync {
    /// Whether the finality gadget is switched on
    async fn is_enabled(&self) -> CollaboratorResult<bool>;

    /// Identifier of the consumer chain the contract serves
    async fn consumer_id(&self) -> CollaboratorResult<String>;

    /// Providers that voted for `(block_height, block_hash)`
    ///
    /// The block hash is already normalized. No votes is an empty list.
    async fn voted_providers(&self, block: &L2Block)
        -> CollaboratorResult<Vec<FinalityProviderId>>;
}

/// Maps L2 timestamps onto the Bitcoin chain
#[async_trait]
pub trait BitcoinTimeOracle: Send + Sync {
    /// Bitcoin height current at `timestamp` (unix seconds)
    async fn height_at_timestamp(&self, timestamp: u64) -> CollaboratorResult<u64>;
}
