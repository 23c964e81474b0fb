//! Ports module for the finality engine

pub mod inbound;
pub mod outbound;

pub use inbound::FinalityGadgetApi;
pub use outbound::{BitcoinTimeOracle, ChainQuery, ContractState, DelegationPage, PageCursor};
