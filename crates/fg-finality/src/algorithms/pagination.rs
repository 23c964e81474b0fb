//! Cursor-following delegation reads
//!
//! A provider's delegations arrive in pages. [`delegations`] hides the cursor
//! behind a lazy stream that ends when the collaborator stops handing out
//! continuation keys. A failed page ends the stream with that error.

use futures::stream::{self, Stream, TryStreamExt};

use crate::context::QueryContext;
use crate::domain::{Delegation, FinalityProviderId};
use crate::error::{FinalityError, FinalityResult};
use crate::ports::outbound::{ChainQuery, PageCursor};

enum PageState {
    Start,
    Next(PageCursor),
    Exhausted,
}

/// Every delegation of `fp`, page by page
pub fn delegations<'a, C>(
    chain: &'a C,
    ctx: &'a QueryContext,
    fp: &'a FinalityProviderId,
) -> impl Stream<Item = FinalityResult<Delegation>> + Send + 'a
where
    C: ChainQuery + ?Sized,
{
    stream::try_unfold(PageState::Start, move |state| async move {
        let cursor = match state {
            PageState::Start => None,
            PageState::Next(cursor) => Some(cursor),
            PageState::Exhausted => return Ok::<_, FinalityError>(None),
        };

        let page = ctx
            .call("list_delegations", chain.list_delegations(fp, cursor))
            .await?;
        let next = match page.next_cursor {
            Some(cursor) if !cursor.is_empty() => PageState::Next(cursor),
            _ => PageState::Exhausted,
        };
        Ok(Some((page.delegations, next)))
    })
    .map_ok(|page| stream::iter(page.into_iter().map(Ok::<Delegation, FinalityError>)))
    .try_flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StakingParams;
    use crate::error::{CollaboratorError, CollaboratorResult};
    use crate::ports::outbound::DelegationPage;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Serves fixed pages; the cursor is the page index
    struct PagedChain {
        pages: Vec<Vec<Delegation>>,
        fail_on_page: Option<usize>,
        requested: Mutex<Vec<Option<PageCursor>>>,
    }

    impl PagedChain {
        fn new(pages: Vec<Vec<Delegation>>) -> Self {
            Self {
                pages,
                fail_on_page: None,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChainQuery for PagedChain {
        async fn list_finality_providers(
            &self,
            _consumer_id: &str,
        ) -> CollaboratorResult<Vec<FinalityProviderId>> {
            Ok(vec![])
        }

        async fn list_delegations(
            &self,
            _fp: &FinalityProviderId,
            cursor: Option<PageCursor>,
        ) -> CollaboratorResult<DelegationPage> {
            self.requested.lock().push(cursor.clone());
            let index = cursor.map(|c| c.0[0] as usize).unwrap_or(0);
            if self.fail_on_page == Some(index) {
                return Err(CollaboratorError::Unavailable("page lost".into()));
            }
            let next_cursor = if index + 1 < self.pages.len() {
                Some(PageCursor(vec![(index + 1) as u8]))
            } else {
                None
            };
            Ok(DelegationPage {
                delegations: self.pages.get(index).cloned().unwrap_or_default(),
                next_cursor,
            })
        }

        async fn staking_params(&self) -> CollaboratorResult<StakingParams> {
            Ok(StakingParams {
                btc_confirmation_depth: 6,
                covenant_quorum: 1,
            })
        }

        async fn btc_tip_height(&self) -> CollaboratorResult<u64> {
            Ok(1_000)
        }
    }

    async fn read_all(
        chain: &PagedChain,
        ctx: &QueryContext,
        fp: &FinalityProviderId,
    ) -> FinalityResult<Vec<Delegation>> {
        delegations(chain, ctx, fp).try_collect().await
    }

    fn del(total_sat: u64) -> Delegation {
        Delegation {
            start_height: 10,
            end_height: 500,
            total_sat,
            covenant_signature_count: 3,
        }
    }

    #[tokio::test]
    async fn test_follows_cursor_across_pages() {
        let chain = PagedChain::new(vec![vec![del(1), del(2)], vec![], vec![del(3)]]);
        let ctx = QueryContext::new();
        let fp = FinalityProviderId::from("pk1");

        let all = read_all(&chain, &ctx, &fp).await.unwrap();
        let sats: Vec<_> = all.iter().map(|d| d.total_sat).collect();
        assert_eq!(sats, vec![1, 2, 3]);

        let requested = chain.requested.lock().clone();
        assert_eq!(
            requested,
            vec![None, Some(PageCursor(vec![1])), Some(PageCursor(vec![2]))]
        );
    }

    #[tokio::test]
    async fn test_single_empty_page() {
        let chain = PagedChain::new(vec![]);
        let ctx = QueryContext::new();
        let fp = FinalityProviderId::from("pk1");
        assert!(read_all(&chain, &ctx, &fp).await.unwrap().is_empty());
        assert_eq!(chain.requested.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_page_fails_whole_read() {
        let mut chain = PagedChain::new(vec![vec![del(1)], vec![del(2)], vec![del(3)]]);
        chain.fail_on_page = Some(1);
        let ctx = QueryContext::new();
        let fp = FinalityProviderId::from("pk1");

        let result = read_all(&chain, &ctx, &fp).await;
        assert!(matches!(
            result,
            Err(FinalityError::Collaborator {
                call: "list_delegations",
                ..
            })
        ));
        // no request past the failing page
        assert_eq!(chain.requested.lock().len(), 2);
    }
}
