//! Single-flight de-duplication of aggregate fetches
//!
//! Concurrent callers asking for the same aggregate share one in-flight
//! future. Once it settles the slot is cleared so the next call fetches
//! again; nothing is cached past that point.

use crate::error::{Error, Result};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

type Outcome<T> = std::result::Result<Arc<Vec<T>>, Arc<Error>>;
type SharedFetch<T> = Shared<BoxFuture<'static, Outcome<T>>>;

struct InFlight<T> {
    generation: u64,
    fetch: SharedFetch<T>,
}

struct Slot<T> {
    next_generation: u64,
    current: Option<InFlight<T>>,
}

/// Shares one in-flight aggregate fetch between concurrent callers
pub struct SingleFlight<T> {
    slot: Mutex<Slot<T>>,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty single-flight slot
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                next_generation: 0,
                current: None,
            }),
        }
    }

    /// Check if a fetch is currently in flight
    pub fn is_in_flight(&self) -> bool {
        self.slot
            .lock()
            .current
            .as_ref()
            .is_some_and(|in_flight| in_flight.fetch.peek().is_none())
    }

    /// Join the in-flight fetch, or start one with `start` if none is running
    ///
    /// Every caller that joins the same fetch receives the same items, or an
    /// [`Error::Shared`] wrapping the same failure.
    pub async fn run<F>(&self, start: F) -> Result<Vec<T>>
    where
        F: FnOnce() -> BoxFuture<'static, Result<Vec<T>>>,
    {
        let (generation, fetch) = self.join_or_start(start);
        let outcome = fetch.await;

        {
            let mut slot = self.slot.lock();
            if slot
                .current
                .as_ref()
                .is_some_and(|in_flight| in_flight.generation == generation)
            {
                slot.current = None;
            }
        }

        match outcome {
            Ok(items) => Ok(items.as_ref().clone()),
            Err(err) => Err(Error::Shared(err)),
        }
    }

    fn join_or_start<F>(&self, start: F) -> (u64, SharedFetch<T>)
    where
        F: FnOnce() -> BoxFuture<'static, Result<Vec<T>>>,
    {
        let mut slot = self.slot.lock();

        // A settled fetch left behind by a cancelled caller is never reused
        if let Some(in_flight) = &slot.current {
            if in_flight.fetch.peek().is_none() {
                debug!(generation = in_flight.generation, "Joining in-flight fetch");
                return (in_flight.generation, in_flight.fetch.clone());
            }
        }

        let generation = slot.next_generation;
        slot.next_generation += 1;
        debug!(generation, "Starting new fetch");

        let fetch = start()
            .map(|result| result.map(Arc::new).map_err(Arc::new))
            .boxed()
            .shared();
        slot.current = Some(InFlight {
            generation,
            fetch: fetch.clone(),
        });
        (generation, fetch)
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for SingleFlight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("SingleFlight")
            .field("next_generation", &slot.next_generation)
            .field("has_current", &slot.current.is_some())
            .finish()
    }
}
