//! Error types for the finality engine
//!
//! Every failure aborts the enclosing operation. Nothing here is retried.

use thiserror::Error;

/// Failure reported by a collaborator (chain RPC, contract state, Bitcoin oracle).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// Remote endpoint could not be reached or returned a transport error
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// Remote endpoint answered with something we cannot interpret
    #[error("invalid collaborator response: {0}")]
    InvalidResponse(String),

    /// Requested record does not exist
    #[error("not found: {0}")]
    NotFound(String),
}

/// Result type for collaborator calls
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Coarse classification of [`FinalityError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Committee holds no voting power on the consumer chain
    NoQuorumPossible,
    /// Caller input rejected before any I/O
    InvalidInput,
    /// An underlying query failed
    CollaboratorFailure,
    /// Cancelled, timed out, or a worker task died
    Aborted,
}

/// Finality engine errors
#[derive(Debug, Error)]
pub enum FinalityError {
    /// Total committee power is zero for the consumer chain
    #[error("no finality provider has voting power for consumer chain {consumer_id}")]
    NoVotingPower { consumer_id: String },

    /// Range query without blocks
    #[error("no blocks provided")]
    EmptyBlocks,

    /// Range query with a height gap or reordering
    #[error("blocks are not consecutive: block {index} has height {actual}, expected {expected}")]
    NonConsecutiveBlocks {
        index: usize,
        expected: u64,
        actual: u64,
    },

    /// A collaborator call failed
    #[error("{call} failed: {source}")]
    Collaborator {
        call: &'static str,
        #[source]
        source: CollaboratorError,
    },

    /// Caller cancelled the query
    #[error("query cancelled")]
    Cancelled,

    /// Caller deadline elapsed before the query completed
    #[error("query deadline exceeded")]
    DeadlineExceeded,

    /// A fan-out worker panicked or was aborted
    #[error("worker task failed: {reason}")]
    TaskFailed { reason: String },
}

impl FinalityError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            FinalityError::NoVotingPower { .. } => ErrorKind::NoQuorumPossible,
            FinalityError::EmptyBlocks | FinalityError::NonConsecutiveBlocks { .. } => {
                ErrorKind::InvalidInput
            }
            FinalityError::Collaborator { .. } => ErrorKind::CollaboratorFailure,
            FinalityError::Cancelled
            | FinalityError::DeadlineExceeded
            | FinalityError::TaskFailed { .. } => ErrorKind::Aborted,
        }
    }
}

/// Result type for finality operations
pub type FinalityResult<T> = Result<T, FinalityError>;
