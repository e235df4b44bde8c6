//! Batch splitter
//!
//! Fans an id set out over bounded bulk requests and merges the responses.

use super::types::{split_batches, BatchSource, IdSet};
use crate::config::AccessConfig;
use crate::error::Result;
use crate::stream::Traversal;
use crate::types::{with_timeout, IdFn, Key};
use futures::{stream, StreamExt, TryStreamExt};
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Splits id sets into batches of at most `batch_size` ids
///
/// Pairs keep the server's order within a batch. Batches are dispatched
/// `concurrency` at a time (1 by default) and their results are emitted in
/// request order.
pub struct BatchSplitter<T, K> {
    source: Arc<dyn BatchSource<T, K>>,
    id_of: IdFn<T, K>,
    batch_size: usize,
    concurrency: usize,
    request_timeout: Option<Duration>,
}

impl<T, K> BatchSplitter<T, K>
where
    T: Send + 'static,
    K: Key,
{
    /// Create a splitter sending at most `batch_size` ids per request
    pub fn new(
        source: impl BatchSource<T, K> + 'static,
        id_of: IdFn<T, K>,
        batch_size: usize,
    ) -> Self {
        Self::from_arc(Arc::new(source), id_of, batch_size)
    }

    /// Create a splitter over a shared source
    pub fn from_arc(
        source: Arc<dyn BatchSource<T, K>>,
        id_of: IdFn<T, K>,
        batch_size: usize,
    ) -> Self {
        Self {
            source,
            id_of,
            batch_size: batch_size.max(1),
            concurrency: 1,
            request_timeout: None,
        }
    }

    /// Apply batch size, concurrency and timeout from an access config
    #[must_use]
    pub fn configured(mut self, config: &AccessConfig) -> Self {
        self.batch_size = config.batch_size.max(1);
        self.concurrency = config.batch_concurrency.max(1);
        self.request_timeout = config.request_timeout();
        self
    }

    /// Allow up to `concurrency` batch requests in flight at once
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Fail any batch request that takes longer than `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Maximum ids per request
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Stream `(id, item)` pairs as batches complete
    ///
    /// A deferred id set is resolved on first poll. A failed batch ends the
    /// stream after the pairs already yielded.
    pub fn to_stream(&self, ids: impl Into<IdSet<K>>) -> Traversal<(K, T)> {
        let ids = ids.into();
        let source = Arc::clone(&self.source);
        let id_of = Arc::clone(&self.id_of);
        let batch_size = self.batch_size;
        let concurrency = self.concurrency;
        let request_timeout = self.request_timeout;

        let chunks = stream::once(ids.resolve())
            .map_ok(move |ids| {
                let batches = split_batches(&ids, batch_size);
                debug!(
                    ids = ids.len(),
                    batches = batches.len(),
                    batch_size,
                    "Split id set into batches"
                );

                let source = Arc::clone(&source);
                let id_of = Arc::clone(&id_of);
                stream::iter(batches)
                    .map(move |batch| {
                        fetch_batch(
                            Arc::clone(&source),
                            Arc::clone(&id_of),
                            batch,
                            request_timeout,
                        )
                    })
                    .buffered(concurrency)
            })
            .try_flatten();

        Traversal::new(chunks)
    }

    /// Fetch every batch and merge the results into an id-keyed map
    ///
    /// Ids the server omitted are absent. If any batch fails, the whole
    /// operation fails and nothing gathered so far is returned.
    pub async fn to_map(&self, ids: impl Into<IdSet<K>>) -> Result<IndexMap<K, T>> {
        let map: IndexMap<K, T> = self.to_stream(ids).try_collect().await?;
        debug!(found = map.len(), "Merged batch results");
        Ok(map)
    }
}

/// Issue one bulk request and key the returned items
async fn fetch_batch<T, K>(
    source: Arc<dyn BatchSource<T, K>>,
    id_of: IdFn<T, K>,
    batch: Vec<K>,
    request_timeout: Option<Duration>,
) -> Result<Vec<(K, T)>> {
    let requested = batch.len();
    let items = with_timeout(request_timeout, source.fetch_batch(batch)).await?;
    debug!(requested, returned = items.len(), "Fetched batch");

    Ok(items
        .into_iter()
        .map(|item| (id_of(&item), item))
        .collect())
}

impl<T, K> std::fmt::Debug for BatchSplitter<T, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchSplitter")
            .field("batch_size", &self.batch_size)
            .field("concurrency", &self.concurrency)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}
