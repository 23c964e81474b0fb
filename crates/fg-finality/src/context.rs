//! Per-query cancellation and deadline
//!
//! Every collaborator call is raced against the caller's cancellation token and
//! optional deadline. Fan-out work derives a child context so that stopping the
//! siblings of a failed task never cancels the caller's own token.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{CollaboratorResult, FinalityError, FinalityResult};
use crate::metrics;

/// Cancellation signal plus optional deadline for one query
#[derive(Clone, Debug, Default)]
pub struct QueryContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl QueryContext {
    /// Context that never expires and is only cancelled explicitly
    pub fn new() -> Self {
        Self::default()
    }

    /// Context driven by an existing token
    pub fn with_token(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Set an absolute deadline, keeping the earlier one if already set
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Set a deadline relative to now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context whose cancellation does not propagate upwards
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Resolves once the context is cancelled
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// Run a collaborator call, wrapping its failure with the call name
    pub async fn call<T, F>(&self, call: &'static str, fut: F) -> FinalityResult<T>
    where
        F: Future<Output = CollaboratorResult<T>>,
    {
        self.race(fut).await?.map_err(|source| {
            warn!(call, error = %source, "collaborator call failed");
            metrics::record_collaborator_failure(call);
            FinalityError::Collaborator { call, source }
        })
    }

    /// Run a whole operation under this context
    pub async fn run<T, F>(&self, fut: F) -> FinalityResult<T>
    where
        F: Future<Output = FinalityResult<T>>,
    {
        self.race(fut).await?
    }

    async fn race<R, F>(&self, fut: F) -> FinalityResult<R>
    where
        F: Future<Output = R>,
    {
        if self.cancel.is_cancelled() {
            return Err(FinalityError::Cancelled);
        }
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(FinalityError::Cancelled),
                _ = tokio::time::sleep_until(deadline) => Err(FinalityError::DeadlineExceeded),
                out = fut => Ok(out),
            },
            None => tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(FinalityError::Cancelled),
                out = fut => Ok(out),
            },
        }
    }
}
