//! # fg-finality
//!
//! Finality gadget for an L2 chain secured by Bitcoin stake through Babylon.
//!
//! ## Overview
//!
//! This crate answers, without holding any state of its own:
//! - **Block finality**: did finality providers holding at least two thirds
//!   of the committee's active BTC stake sign this `(height, hash)`?
//! - **Range finality**: how far does the finalized prefix of a run of
//!   consecutive blocks extend?
//! - **Earliest activation**: the lowest BTC height at which any provider
//!   had an active delegation
//!
//! ## Architecture
//!
//! ```text
//! caller ──L2Block──→ FinalityGadgetService
//!                         │
//!                         ├── ContractState      (enabled flag, consumer ID, votes)
//!                         ├── ChainQuery         (committee, delegations, params, BTC tip)
//!                         └── BitcoinTimeOracle  (timestamp → BTC height)
//! ```
//!
//! ## Finality Rule
//!
//! ```text
//! active(d) ⇔ latest > start + k  ∧  end > start + k  ∧  covenant_sigs > quorum
//! finalized ⇔ 3 · voted_power ≥ 2 · total_power
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use fg_finality::{FinalityConfig, FinalityGadgetService, L2Block, QueryContext};
//! use fg_finality::ports::inbound::FinalityGadgetApi;
//!
//! let service = FinalityGadgetService::new(FinalityConfig::default(), chain, contract, oracle);
//!
//! let ctx = QueryContext::new().with_timeout(Duration::from_secs(30));
//! let is_final = service.is_block_finalized(&ctx, &block).await?;
//! let latest = service.latest_finalized_height(&ctx, &blocks).await?;
//! ```

pub mod adapters;
pub mod algorithms;
pub mod context;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::{Snapshot, SnapshotCollaborators, SnapshotError};
pub use context::QueryContext;
pub use domain::{
    normalize_block_hash, ActivationView, Delegation, FinalityProviderId, L2Block, PowerMap,
    ProviderSet, QuorumOutcome, StakingParams,
};
pub use error::{CollaboratorError, CollaboratorResult, ErrorKind, FinalityError, FinalityResult};
pub use ports::inbound::FinalityGadgetApi;
pub use ports::outbound::{
    BitcoinTimeOracle, ChainQuery, ContractState, DelegationPage, PageCursor,
};
pub use service::{FinalityConfig, FinalityGadgetService, PowerStrategy};
