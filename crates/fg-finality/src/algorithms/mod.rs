//! Query algorithms
//!
//! ```text
//! latest_finalized ──→ BlockFinalityCheck (service)
//!                            │
//!                            ├── power_serial / power_concurrent ──┐
//!                            │                                     ├── pagination::delegations
//! earliest_active_height ────┴──────────── fan_out ────────────────┘
//! ```

pub(crate) mod fan_out;
pub mod earliest_height;
pub mod pagination;
pub mod power;
pub mod range;

pub use earliest_height::{earliest_active_height, provider_earliest_height};
pub use pagination::delegations;
pub use power::{power_concurrent, power_serial, provider_power};
pub use range::{latest_finalized, BlockFinalityCheck};
