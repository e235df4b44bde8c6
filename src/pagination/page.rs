//! Page-numbered streaming
//!
//! Drives a [`PageSource`] from page 1 until the server runs out of items.

use super::types::{Page, PageSource};
use crate::config::AccessConfig;
use crate::error::Result;
use crate::stream::{SingleFlight, Streamer, Traversal};
use crate::types::with_timeout;
use async_trait::async_trait;
use futures::{stream, FutureExt, TryStreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Streams every item of a page-numbered endpoint
///
/// Pages are requested one at a time: whether page N+1 exists is only known
/// once page N has arrived. A traversal stops after
/// - an empty page,
/// - the last page announced by `total_pages`, or
/// - when no total is announced, a page shorter than `page_size`.
///
/// A `page_size` of 0 disables the short-page rule.
pub struct PageStreamer<T> {
    source: Arc<dyn PageSource<T>>,
    page_size: usize,
    max_pages: Option<u32>,
    request_timeout: Option<Duration>,
    flight: SingleFlight<T>,
}

impl<T> PageStreamer<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a page streamer expecting full pages of `page_size` items
    pub fn new(source: impl PageSource<T> + 'static, page_size: usize) -> Self {
        Self::from_arc(Arc::new(source), page_size)
    }

    /// Create a page streamer over a shared source
    pub fn from_arc(source: Arc<dyn PageSource<T>>, page_size: usize) -> Self {
        Self {
            source,
            page_size,
            max_pages: None,
            request_timeout: None,
            flight: SingleFlight::new(),
        }
    }

    /// Apply page size, page cap and timeout from an access config
    #[must_use]
    pub fn configured(mut self, config: &AccessConfig) -> Self {
        self.page_size = config.page_size;
        self.max_pages = config.max_pages;
        self.request_timeout = config.request_timeout();
        self
    }

    /// Never request more than `max_pages` pages per traversal
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Fail any page request that takes longer than `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Expected number of items on a full page
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Check if a `get_all` is currently in flight
    pub fn is_fetching(&self) -> bool {
        self.flight.is_in_flight()
    }

    fn cursor(&self) -> PageCursor<T> {
        PageCursor {
            source: Arc::clone(&self.source),
            next_page: Some(1),
            page_size: self.page_size,
            max_pages: self.max_pages,
            request_timeout: self.request_timeout,
        }
    }
}

#[async_trait]
impl<T> Streamer<T> for PageStreamer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn stream(&self) -> Traversal<T> {
        Traversal::new(stream::try_unfold(self.cursor(), next_page))
    }

    /// Fetch every page, sharing one traversal between concurrent callers
    async fn get_all(&self) -> Result<Vec<T>> {
        let items = self
            .flight
            .run(|| self.stream().try_collect::<Vec<T>>().boxed())
            .await?;
        debug!(items = items.len(), "Collected all pages");
        Ok(items)
    }
}

impl<T> std::fmt::Debug for PageStreamer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageStreamer")
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

/// Fetch the page `cursor` points at and advance it
async fn next_page<T>(mut cursor: PageCursor<T>) -> Result<Option<(Vec<T>, PageCursor<T>)>> {
    let Some(page) = cursor.next_page else {
        return Ok(None);
    };

    debug!(page, "Requesting page");
    let response = with_timeout(cursor.request_timeout, cursor.source.fetch_page(page)).await?;
    cursor.next_page = cursor.next_after(page, &response);

    Ok(Some((response.items, cursor)))
}

/// Per-traversal page position
struct PageCursor<T> {
    source: Arc<dyn PageSource<T>>,
    next_page: Option<u32>,
    page_size: usize,
    max_pages: Option<u32>,
    request_timeout: Option<Duration>,
}

impl<T> PageCursor<T> {
    /// Decide which page to request after `page`, if any
    fn next_after(&self, page: u32, response: &Page<T>) -> Option<u32> {
        let count = response.len();

        if count == 0 {
            debug!(page, "Empty page, pagination complete");
            return None;
        }

        if self.max_pages.is_some_and(|max| page >= max) {
            debug!(page, "Reached maximum page limit");
            return None;
        }

        match response.total_pages {
            Some(total) if page >= total => {
                debug!(page, total, "Reached last reported page");
                None
            }
            Some(_) => Some(page + 1),
            None if self.page_size > 0 && count < self.page_size => {
                debug!(page, count, page_size = self.page_size, "Short page, pagination complete");
                None
            }
            None => Some(page + 1),
        }
    }
}
