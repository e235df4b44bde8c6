//! Pagination types and traits
//!
//! Defines the request contracts page- and cursor-driven endpoints fulfil.
//! Any async closure with the matching signature implements them.

use crate::error::Result;
use crate::types::CursorId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// One page returned by a page-numbered endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page, in server order
    #[serde(default)]
    pub items: Vec<T>,
    /// Total number of pages, when the server reports it
    #[serde(default, alias = "totalPages", skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
}

impl<T> Page<T> {
    /// Create a page without a total page count
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            total_pages: None,
        }
    }

    /// Set the total page count reported by the server
    #[must_use]
    pub fn with_total_pages(mut self, total_pages: u32) -> Self {
        self.total_pages = Some(total_pages);
        self
    }

    /// Number of items on this page
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the page carries no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> From<Vec<T>> for Page<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

/// A page-numbered endpoint: "give me page N" (N starts at 1)
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    /// Fetch a single page
    async fn fetch_page(&self, page: u32) -> Result<Page<T>>;
}

#[async_trait]
impl<T, F, Fut> PageSource<T> for F
where
    T: Send + 'static,
    F: Fn(u32) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Page<T>>> + Send,
{
    async fn fetch_page(&self, page: u32) -> Result<Page<T>> {
        (self)(page).await
    }
}

/// A max-id endpoint: "give me items older than this id", newest first
///
/// Responses must be sorted by strictly decreasing id. `None` asks for the
/// most recent items.
#[async_trait]
pub trait CursorSource<T>: Send + Sync {
    /// Fetch items whose id is strictly below `from_id`
    async fn fetch_older(&self, from_id: Option<CursorId>) -> Result<Vec<T>>;
}

#[async_trait]
impl<T, F, Fut> CursorSource<T> for F
where
    T: Send + 'static,
    F: Fn(Option<CursorId>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<T>>> + Send,
{
    async fn fetch_older(&self, from_id: Option<CursorId>) -> Result<Vec<T>> {
        (self)(from_id).await
    }
}
