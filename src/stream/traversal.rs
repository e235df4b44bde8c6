//! Lazy traversal over a remote collection
//!
//! A [`Traversal`] pulls chunks (pages, cursor windows, batches) from an
//! underlying chunk stream and hands out their items one at a time. It owns
//! all of its cursor state, so two traversals never interfere.

use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::stream::{BoxStream, FusedStream};
use futures::{ready, Stream, StreamExt, TryStreamExt};
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Lifecycle of a single traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalState {
    /// Created, nothing requested yet
    #[default]
    Fresh,
    /// Waiting on a remote request
    Fetching,
    /// Handing out buffered items
    Yielding,
    /// The source ran out of items
    Exhausted,
    /// A request failed; the traversal cannot be resumed
    Errored,
}

impl TraversalState {
    /// Check if no further items will be produced
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhausted | Self::Errored)
    }
}

pin_project! {
    /// One lazy pass over a remote collection
    ///
    /// Yields `Ok(item)` in source order. A failed request is yielded once as
    /// `Err` after every item fetched before it, and then the traversal ends.
    #[must_use = "streams do nothing unless polled"]
    pub struct Traversal<T> {
        #[pin]
        chunks: BoxStream<'static, Result<Vec<T>>>,
        buffer: VecDeque<T>,
        state: TraversalState,
    }
}

impl<T> Traversal<T> {
    /// Create a traversal over a stream of item chunks
    pub fn new<S>(chunks: S) -> Self
    where
        S: Stream<Item = Result<Vec<T>>> + Send + 'static,
    {
        Self {
            chunks: chunks.boxed(),
            buffer: VecDeque::new(),
            state: TraversalState::Fresh,
        }
    }

    /// A traversal that fails on first poll
    pub fn failed(err: Error) -> Self
    where
        T: Send + 'static,
    {
        Self::new(futures::stream::once(async move { Err(err) }))
    }

    /// Current lifecycle state
    pub fn state(&self) -> TraversalState {
        self.state
    }
}

impl<T> Stream for Traversal<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if let Some(item) = this.buffer.pop_front() {
                *this.state = TraversalState::Yielding;
                return Poll::Ready(Some(Ok(item)));
            }
            if this.state.is_terminal() {
                return Poll::Ready(None);
            }

            *this.state = TraversalState::Fetching;
            match ready!(this.chunks.as_mut().poll_next(cx)) {
                Some(Ok(items)) => this.buffer.extend(items),
                Some(Err(err)) => {
                    *this.state = TraversalState::Errored;
                    return Poll::Ready(Some(Err(err)));
                }
                None => {
                    *this.state = TraversalState::Exhausted;
                    return Poll::Ready(None);
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.state.is_terminal() {
            (self.buffer.len(), Some(self.buffer.len()))
        } else {
            (self.buffer.len(), None)
        }
    }
}

impl<T> FusedStream for Traversal<T> {
    fn is_terminated(&self) -> bool {
        self.state.is_terminal() && self.buffer.is_empty()
    }
}

impl<T> std::fmt::Debug for Traversal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Traversal")
            .field("state", &self.state)
            .field("buffered", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Streamer
// ============================================================================

/// Factory for independent traversals over one remote collection
///
/// Every call to [`Streamer::stream`] starts from the beginning of the
/// collection with fresh cursor state.
#[async_trait]
pub trait Streamer<T>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    /// Start a new lazy traversal
    fn stream(&self) -> Traversal<T>;

    /// Fetch every item, failing as a whole if any request fails
    async fn get_all(&self) -> Result<Vec<T>> {
        self.stream().try_collect().await
    }
}
