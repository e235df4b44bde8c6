//! Batch types and traits
//!
//! Id sets, the bulk request contract, and the pure splitting helpers.

use crate::error::Result;
use crate::types::Key;
use async_trait::async_trait;
use indexmap::IndexSet;
use std::future::Future;
use std::sync::Arc;

/// A bulk endpoint: "give me the items with these ids"
///
/// Ids the server does not know are simply missing from the response.
#[async_trait]
pub trait BatchSource<T, K>: Send + Sync {
    /// Fetch items for at most one batch worth of ids
    async fn fetch_batch(&self, ids: Vec<K>) -> Result<Vec<T>>;
}

#[async_trait]
impl<T, K, F, Fut> BatchSource<T, K> for F
where
    T: Send + 'static,
    K: Send + 'static,
    F: Fn(Vec<K>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<T>>> + Send,
{
    async fn fetch_batch(&self, ids: Vec<K>) -> Result<Vec<T>> {
        (self)(ids).await
    }
}

/// Supplies an id list that is expensive to compute
#[async_trait]
pub trait IdProvider<K>: Send + Sync {
    /// Compute the ids
    async fn ids(&self) -> Result<Vec<K>>;
}

#[async_trait]
impl<K, F, Fut> IdProvider<K> for F
where
    K: Send + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<K>>> + Send,
{
    async fn ids(&self) -> Result<Vec<K>> {
        (self)().await
    }
}

/// The ids an aggregate operation should cover
#[derive(Clone)]
pub enum IdSet<K> {
    /// Ids as given; duplicates are dropped before use
    List(Vec<K>),
    /// Ids already de-duplicated, in insertion order
    Set(IndexSet<K>),
    /// Ids computed on first use
    Deferred(Arc<dyn IdProvider<K>>),
}

impl<K: Key> IdSet<K> {
    /// Defer id computation until the set is consumed
    pub fn deferred(provider: impl IdProvider<K> + 'static) -> Self {
        Self::Deferred(Arc::new(provider))
    }

    /// Check if resolving the set needs a remote call
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    /// Produce the concrete, de-duplicated ids in first-seen order
    pub async fn resolve(self) -> Result<Vec<K>> {
        match self {
            Self::List(ids) => Ok(dedup_ids(ids)),
            Self::Set(ids) => Ok(ids.into_iter().collect()),
            Self::Deferred(provider) => Ok(dedup_ids(provider.ids().await?)),
        }
    }
}

impl<K> From<Vec<K>> for IdSet<K> {
    fn from(ids: Vec<K>) -> Self {
        Self::List(ids)
    }
}

impl<K: Clone> From<&[K]> for IdSet<K> {
    fn from(ids: &[K]) -> Self {
        Self::List(ids.to_vec())
    }
}

impl<K> From<IndexSet<K>> for IdSet<K> {
    fn from(ids: IndexSet<K>) -> Self {
        Self::Set(ids)
    }
}

impl<K> FromIterator<K> for IdSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self::List(iter.into_iter().collect())
    }
}

impl<K: std::fmt::Debug> std::fmt::Debug for IdSet<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::List(ids) => f.debug_tuple("List").field(ids).finish(),
            Self::Set(ids) => f.debug_tuple("Set").field(ids).finish(),
            Self::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

/// Drop repeated ids, keeping the first occurrence and the original order
pub fn dedup_ids<K: Key>(ids: impl IntoIterator<Item = K>) -> Vec<K> {
    ids.into_iter()
        .collect::<IndexSet<K>>()
        .into_iter()
        .collect()
}

/// Split ids into consecutive batches of at most `batch_size`
///
/// A `batch_size` of 0 is treated as 1.
pub fn split_batches<K: Clone>(ids: &[K], batch_size: usize) -> Vec<Vec<K>> {
    ids.chunks(batch_size.max(1)).map(<[K]>::to_vec).collect()
}
