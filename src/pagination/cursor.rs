//! Max-id cursor streaming
//!
//! Walks a "newest first" endpoint backwards by asking for items older than
//! the smallest id seen so far.

use super::types::CursorSource;
use crate::config::AccessConfig;
use crate::error::Result;
use crate::stream::{SingleFlight, Streamer, Traversal};
use crate::types::{with_timeout, CursorId, IdFn};
use async_trait::async_trait;
use futures::{stream, FutureExt, TryStreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Streams a max-id endpoint in strictly decreasing id order
///
/// The first request carries no cursor. Each following request passes the
/// minimum id of the previous response as an exclusive upper bound. The
/// traversal ends on an empty response or one shorter than `page_size`.
///
/// Ids are assumed globally unique and monotonic. Items at or above the
/// current bound are dropped, and a full response that fails to move the
/// bound ends the traversal instead of looping.
pub struct CursorStreamer<T> {
    source: Arc<dyn CursorSource<T>>,
    id_of: IdFn<T, CursorId>,
    page_size: usize,
    max_pages: Option<u32>,
    request_timeout: Option<Duration>,
    flight: SingleFlight<T>,
}

impl<T> CursorStreamer<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cursor streamer expecting full responses of `page_size` items
    pub fn new(
        source: impl CursorSource<T> + 'static,
        id_of: IdFn<T, CursorId>,
        page_size: usize,
    ) -> Self {
        Self::from_arc(Arc::new(source), id_of, page_size)
    }

    /// Create a cursor streamer over a shared source
    pub fn from_arc(
        source: Arc<dyn CursorSource<T>>,
        id_of: IdFn<T, CursorId>,
        page_size: usize,
    ) -> Self {
        Self {
            source,
            id_of,
            page_size,
            max_pages: None,
            request_timeout: None,
            flight: SingleFlight::new(),
        }
    }

    /// Apply page size, request cap and timeout from an access config
    #[must_use]
    pub fn configured(mut self, config: &AccessConfig) -> Self {
        self.page_size = config.page_size;
        self.max_pages = config.max_pages;
        self.request_timeout = config.request_timeout();
        self
    }

    /// Never issue more than `max_pages` requests per traversal
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Fail any request that takes longer than `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Expected number of items in a full response
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn window(&self) -> Window<T> {
        Window {
            source: Arc::clone(&self.source),
            id_of: Arc::clone(&self.id_of),
            upper_bound: None,
            done: false,
            requests: 0,
            page_size: self.page_size,
            max_pages: self.max_pages,
            request_timeout: self.request_timeout,
        }
    }
}

#[async_trait]
impl<T> Streamer<T> for CursorStreamer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn stream(&self) -> Traversal<T> {
        Traversal::new(stream::try_unfold(self.window(), next_window))
    }

    async fn get_all(&self) -> Result<Vec<T>> {
        self.flight
            .run(|| self.stream().try_collect::<Vec<T>>().boxed())
            .await
    }
}

impl<T> std::fmt::Debug for CursorStreamer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CursorStreamer")
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

/// Fetch the next window of older items and move the bound down
async fn next_window<T>(mut window: Window<T>) -> Result<Option<(Vec<T>, Window<T>)>> {
    if window.done {
        return Ok(None);
    }

    debug!(from_id = ?window.upper_bound, "Requesting items older than cursor");
    let mut items = with_timeout(
        window.request_timeout,
        window.source.fetch_older(window.upper_bound),
    )
    .await?;
    window.requests += 1;

    let received = items.len();
    if let Some(bound) = window.upper_bound {
        let id_of = &window.id_of;
        items.retain(|item| id_of(item) < bound);
        if items.len() < received {
            warn!(
                bound,
                dropped = received - items.len(),
                "Cursor response contained items at or above the bound"
            );
        }
    }

    window.advance(received, &items);
    Ok(Some((items, window)))
}

/// Per-traversal cursor position
struct Window<T> {
    source: Arc<dyn CursorSource<T>>,
    id_of: IdFn<T, CursorId>,
    upper_bound: Option<CursorId>,
    done: bool,
    requests: u32,
    page_size: usize,
    max_pages: Option<u32>,
    request_timeout: Option<Duration>,
}

impl<T> Window<T> {
    /// Update the bound from a response of `received` raw items, `kept` after filtering
    fn advance(&mut self, received: usize, kept: &[T]) {
        let Some(min_id) = kept.iter().map(|item| (self.id_of)(item)).min() else {
            if received > 0 {
                warn!(bound = ?self.upper_bound, "Cursor did not advance, stopping");
            } else {
                debug!("Empty response, cursor exhausted");
            }
            self.done = true;
            return;
        };

        self.upper_bound = Some(min_id);

        if self.page_size > 0 && received < self.page_size {
            debug!(received, page_size = self.page_size, "Short response, cursor exhausted");
            self.done = true;
        } else if self.max_pages.is_some_and(|max| self.requests >= max) {
            debug!(requests = self.requests, "Reached maximum page limit");
            self.done = true;
        }
    }
}
