//! Domain module for the finality engine
//!
//! Pure types and rules. Nothing in here performs I/O.
//!
//! ## Modules
//! - block: L2 block identity, hash normalization, range validation
//! - provider: Finality provider IDs, provider sets, power maps
//! - delegation: BTC delegations and the active-delegation rule
//! - quorum: Two-thirds voting power rule

pub mod block;
pub mod delegation;
pub mod provider;
pub mod quorum;

pub use block::{ensure_consecutive, normalize_block_hash, L2Block};
pub use delegation::{ActivationView, Delegation, StakingParams};
pub use provider::{FinalityProviderId, PowerMap, ProviderSet};
pub use quorum::{evaluate, QuorumOutcome};
