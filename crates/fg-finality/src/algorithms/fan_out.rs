//! Per-provider fan-out with a single reduction point
//!
//! One task per provider, at most `max_in_flight` of them talking to the
//! collaborator at once. Tasks only send their result down a channel; the
//! calling task is the sole consumer and owns the accumulator, so the reduce
//! step needs no lock or atomic.
//!
//! The first failure cancels every sibling through a child context. Tasks that
//! have not yet acquired a permit never start their query. All spawned tasks
//! are joined before returning.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::debug;

use crate::context::QueryContext;
use crate::domain::{FinalityProviderId, ProviderSet};
use crate::error::{FinalityError, FinalityResult};
use crate::ports::outbound::ChainQuery;

pub(crate) async fn fan_out<C, T, A, F, Fut, R>(
    chain: Arc<C>,
    ctx: &QueryContext,
    providers: &ProviderSet,
    max_in_flight: usize,
    task: F,
    init: A,
    mut reduce: R,
) -> FinalityResult<A>
where
    C: ChainQuery + ?Sized + 'static,
    T: Send + 'static,
    F: Fn(Arc<C>, QueryContext, FinalityProviderId) -> Fut,
    Fut: Future<Output = FinalityResult<T>> + Send + 'static,
    R: FnMut(A, FinalityProviderId, T) -> A,
{
    if providers.is_empty() {
        return Ok(init);
    }

    let siblings = ctx.child();
    let permits = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let (tx, mut rx) = mpsc::channel(providers.len());
    let mut tasks = JoinSet::new();

    for fp in providers.iter().cloned() {
        let work = task(Arc::clone(&chain), siblings.clone(), fp.clone());
        let task_ctx = siblings.clone();
        let permits = Arc::clone(&permits);
        let tx = tx.clone();

        tasks.spawn(async move {
            let _permit = tokio::select! {
                biased;
                _ = task_ctx.cancelled() => return,
                permit = permits.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
            };
            if task_ctx.is_cancelled() {
                return;
            }
            let result = work.await;
            // receiver outlives every task
            let _ = tx.send((fp, result)).await;
        });
    }
    drop(tx);

    let mut acc = Some(init);
    let mut first_error: Option<FinalityError> = None;

    while let Some((fp, result)) = rx.recv().await {
        match result {
            Ok(value) => {
                if first_error.is_none() {
                    acc = acc.map(|current| reduce(current, fp, value));
                }
            }
            Err(err) => {
                if first_error.is_none() {
                    debug!(provider = %fp, error = %err, "provider query failed, cancelling siblings");
                    siblings.cancel();
                    first_error = Some(err);
                }
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(join_err) = joined {
            if first_error.is_none() {
                siblings.cancel();
                first_error = Some(FinalityError::TaskFailed {
                    reason: join_err.to_string(),
                });
            }
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }
    // parent cancellation makes tasks exit without reporting
    if ctx.is_cancelled() {
        return Err(FinalityError::Cancelled);
    }
    acc.ok_or_else(|| FinalityError::TaskFailed {
        reason: "reduction lost its accumulator".to_string(),
    })
}
