//! Resource source traits

use crate::batch::IdSet;
use crate::error::Result;
use crate::stream::Traversal;
use crate::types::{with_timeout, Key};
use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A single-item endpoint: "give me the item with this id"
///
/// `Ok(None)` means the server does not know the id.
#[async_trait]
pub trait ItemSource<T, K>: Send + Sync {
    /// Fetch one item
    async fn fetch_item(&self, id: K) -> Result<Option<T>>;
}

#[async_trait]
impl<T, K, F, Fut> ItemSource<T, K> for F
where
    T: Send + 'static,
    K: Send + 'static,
    F: Fn(K) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<T>>> + Send,
{
    async fn fetch_item(&self, id: K) -> Result<Option<T>> {
        (self)(id).await
    }
}

/// Request every id from the item endpoint, `concurrency` requests at a time
///
/// Pairs are keyed by the requested id and emitted in request order. Ids the
/// server does not know are skipped. A deferred id set is resolved on first
/// poll.
pub(crate) fn fan_out<T, K>(
    items: Arc<dyn ItemSource<T, K>>,
    ids: IdSet<K>,
    concurrency: usize,
    request_timeout: Option<Duration>,
) -> Traversal<(K, T)>
where
    T: Send + 'static,
    K: Key,
{
    let concurrency = concurrency.max(1);
    let chunks = stream::once(ids.resolve())
        .map_ok(move |ids| {
            debug!(ids = ids.len(), concurrency, "Fanning out item requests");
            let items = Arc::clone(&items);
            stream::iter(ids)
                .map(move |id| fetch_keyed(Arc::clone(&items), id, request_timeout))
                .buffered(concurrency)
        })
        .try_flatten();

    Traversal::new(chunks)
}

async fn fetch_keyed<T, K>(
    items: Arc<dyn ItemSource<T, K>>,
    id: K,
    request_timeout: Option<Duration>,
) -> Result<Vec<(K, T)>>
where
    T: Send + 'static,
    K: Key,
{
    let found = with_timeout(request_timeout, items.fetch_item(id.clone())).await?;
    if found.is_none() {
        debug!(id = ?id, "Item not found");
    }
    Ok(found.map(|item| (id, item)).into_iter().collect())
}
