//! Resource views
//!
//! Each view answers one kind of question about a [`Resource`] and falls
//! back through the available endpoints in a fixed order.

use super::adapter::Resource;
use super::types::fan_out;
use crate::batch::IdSet;
use crate::error::{Error, Result};
use crate::stream::{Streamer, Traversal};
use crate::types::{with_timeout, IdFn, Key};
use futures::{future, stream, TryStreamExt};
use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// Single
// ============================================================================

/// Lookup of one item by id
///
/// Tries the item endpoint, then the bulk endpoint with a one-id batch,
/// then scans the listing until the id turns up.
pub struct Single<'a, T, K> {
    resource: &'a Resource<T, K>,
    id: K,
}

impl<'a, T, K> Single<'a, T, K>
where
    T: Clone + Send + Sync + 'static,
    K: Key,
{
    pub(crate) fn new(resource: &'a Resource<T, K>, id: K) -> Self {
        Self { resource, id }
    }

    /// The id being looked up
    pub fn id(&self) -> &K {
        &self.id
    }

    /// Fetch the item, or `None` if the server does not know the id
    pub async fn get(&self) -> Result<Option<T>> {
        let resource = self.resource;
        let timeout = resource.config().request_timeout();

        if let Some(items) = resource.item_source() {
            debug!(id = ?self.id, "Fetching item");
            return with_timeout(timeout, items.fetch_item(self.id.clone())).await;
        }

        if let Some(batch) = resource.batch_source() {
            debug!(id = ?self.id, "Fetching item through bulk endpoint");
            let found = with_timeout(timeout, batch.fetch_batch(vec![self.id.clone()])).await?;
            return Ok(found.into_iter().find(|item| resource.id_of(item) == self.id));
        }

        if let Some(streamer) = resource.streamer() {
            debug!(id = ?self.id, "Scanning listing for item");
            let mut listing = streamer.stream();
            while let Some(item) = listing.try_next().await? {
                if resource.id_of(&item) == self.id {
                    return Ok(Some(item));
                }
            }
            return Ok(None);
        }

        Err(Error::unsupported("single"))
    }
}

// ============================================================================
// Mapped
// ============================================================================

/// Lookup of many items by id
///
/// Tries the bulk endpoint, then one item request per id, then a scan of the
/// listing that stops once every id has been seen. Results are keyed by the
/// requested id. Unknown ids are left out, and items the server returns for
/// ids nobody asked for are dropped.
pub struct Mapped<'a, T, K> {
    resource: &'a Resource<T, K>,
    ids: IdSet<K>,
}

impl<'a, T, K> Mapped<'a, T, K>
where
    T: Clone + Send + Sync + 'static,
    K: Key,
{
    pub(crate) fn new(resource: &'a Resource<T, K>, ids: IdSet<K>) -> Self {
        Self { resource, ids }
    }

    /// Fetch every known item, keyed by id
    ///
    /// Fails as a whole if any request fails.
    pub async fn get(&self) -> Result<IndexMap<K, T>> {
        let map: IndexMap<K, T> = self.stream().try_collect().await?;
        debug!(found = map.len(), "Collected mapped lookup");
        Ok(map)
    }

    /// Stream `(id, item)` pairs as they arrive
    pub fn stream(&self) -> Traversal<(K, T)> {
        let resource = self.resource;

        if let Some(splitter) = resource.splitter() {
            let chunks = stream::once(self.ids.clone().resolve())
                .map_ok(move |ids| {
                    let wanted: IndexSet<K> = ids.iter().cloned().collect();
                    splitter
                        .to_stream(ids)
                        .try_filter(move |pair: &(K, T)| {
                            future::ready(is_requested(&wanted, &pair.0))
                        })
                        .map_ok(|pair| vec![pair])
                })
                .try_flatten();
            return Traversal::new(chunks);
        }

        if let Some(items) = resource.item_source() {
            let config = resource.config();
            return fan_out(
                Arc::clone(items),
                self.ids.clone(),
                config.batch_concurrency,
                config.request_timeout(),
            );
        }

        if let Some(streamer) = resource.streamer() {
            let filter = ListingFilter {
                listing: streamer.stream(),
                id_of: resource.id_fn(),
                ids: Some(self.ids.clone()),
                wanted: IndexSet::new(),
            };
            return Traversal::new(stream::try_unfold(filter, next_match));
        }

        Traversal::failed(Error::unsupported("mapped"))
    }
}

fn is_requested<K: Key>(wanted: &IndexSet<K>, id: &K) -> bool {
    let requested = wanted.contains(id);
    if !requested {
        debug!(id = ?id, "Dropping item returned for an id that was not requested");
    }
    requested
}

/// Scan state for answering a mapped lookup from the listing
struct ListingFilter<T, K> {
    listing: Traversal<T>,
    id_of: IdFn<T, K>,
    /// Requested ids, until resolved into `wanted`
    ids: Option<IdSet<K>>,
    wanted: IndexSet<K>,
}

/// Pull listing items until the next requested id appears
async fn next_match<T, K>(
    mut filter: ListingFilter<T, K>,
) -> Result<Option<(Vec<(K, T)>, ListingFilter<T, K>)>>
where
    K: Key,
{
    if let Some(ids) = filter.ids.take() {
        filter.wanted = ids.resolve().await?.into_iter().collect();
    }

    while !filter.wanted.is_empty() {
        let Some(item) = filter.listing.try_next().await? else {
            debug!(missing = filter.wanted.len(), "Listing exhausted before all ids were found");
            return Ok(None);
        };
        let id = (filter.id_of)(&item);
        if filter.wanted.swap_remove(&id) {
            return Ok(Some((vec![(id, item)], filter)));
        }
    }

    debug!("Found every requested id, listing scan stopped");
    Ok(None)
}

// ============================================================================
// Iterated
// ============================================================================

/// Every item of the listing, in listing order
pub struct Iterated<'a, T, K> {
    resource: &'a Resource<T, K>,
}

impl<'a, T, K> Iterated<'a, T, K>
where
    T: Clone + Send + Sync + 'static,
    K: Key,
{
    pub(crate) fn new(resource: &'a Resource<T, K>) -> Self {
        Self { resource }
    }

    /// Start a new traversal yielding `(id, item)` pairs
    pub fn stream(&self) -> Traversal<(K, T)> {
        let Some(streamer) = self.resource.streamer() else {
            return Traversal::failed(Error::unsupported("iterated"));
        };
        let id_of = self.resource.id_fn();
        Traversal::new(
            streamer
                .stream()
                .map_ok(move |item| vec![(id_of(&item), item)]),
        )
    }

    /// Fetch every item, sharing the fetch with concurrent callers
    pub async fn get_all(&self) -> Result<Vec<T>> {
        match self.resource.streamer() {
            Some(streamer) => streamer.get_all().await,
            None => Err(Error::unsupported("iterated")),
        }
    }
}
