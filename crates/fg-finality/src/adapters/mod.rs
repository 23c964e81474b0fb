//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements the outbound port traits. Live Babylon and Bitcoin RPC clients
//! plug in here; the snapshot adapter serves recorded state.

mod snapshot;

pub use snapshot::{
    ProviderRecord, Snapshot, SnapshotCollaborators, SnapshotError, TimeAnchor, VoteRecord,
};
