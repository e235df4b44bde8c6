//! Resource definition and builder
//!
//! A [`Resource`] bundles whatever endpoints a remote collection exposes
//! (single item, bulk, paged listing, cursor listing) together with the id
//! extractor and access settings. Views pick the cheapest endpoint that can
//! answer them.

use super::types::ItemSource;
use super::views::{Iterated, Mapped, Single};
use crate::batch::{BatchSource, BatchSplitter, IdSet};
use crate::config::AccessConfig;
use crate::error::Result;
use crate::pagination::{CursorSource, CursorStreamer, PageSource, PageStreamer};
use crate::stream::Streamer;
use crate::types::{CursorId, IdFn, Key};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::debug;

/// Builds the listing streamer once the access config is known
type ListingFactory<T> = Box<dyn Fn(&AccessConfig) -> Arc<dyn Streamer<T>> + Send + Sync>;

/// A remote collection and the endpoints that serve it
pub struct Resource<T, K> {
    id_of: IdFn<T, K>,
    item: Option<Arc<dyn ItemSource<T, K>>>,
    batch: Option<Arc<dyn BatchSource<T, K>>>,
    listing: Option<ListingFactory<T>>,
    streamer: OnceCell<Arc<dyn Streamer<T>>>,
    config: AccessConfig,
}

impl<T, K> Resource<T, K>
where
    T: Clone + Send + Sync + 'static,
    K: Key,
{
    /// Start describing a resource whose items are keyed by `id_of`
    pub fn builder(id_of: IdFn<T, K>) -> ResourceBuilder<T, K> {
        ResourceBuilder::new(id_of)
    }

    /// View answering "the item with this id"
    pub fn single(&self, id: K) -> Single<'_, T, K> {
        Single::new(self, id)
    }

    /// View answering "the items with these ids"
    pub fn mapped(&self, ids: impl Into<IdSet<K>>) -> Mapped<'_, T, K> {
        Mapped::new(self, ids.into())
    }

    /// View over every item of the listing
    pub fn iterated(&self) -> Iterated<'_, T, K> {
        Iterated::new(self)
    }

    /// Access settings applied to every streamer and splitter
    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Extract the id of an item
    pub fn id_of(&self, item: &T) -> K {
        (self.id_of)(item)
    }

    /// Check if a single-item endpoint is configured
    pub fn has_item(&self) -> bool {
        self.item.is_some()
    }

    pub fn has_batch(&self) -> bool {
        self.batch.is_some()
    }

    pub fn has_listing(&self) -> bool {
        self.listing.is_some()
    }

    /// The listing streamer, built on first use and reused afterwards
    pub fn streamer(&self) -> Option<&Arc<dyn Streamer<T>>> {
        let factory = self.listing.as_ref()?;
        Some(self.streamer.get_or_init(|| {
            debug!("Building listing streamer");
            factory(&self.config)
        }))
    }

    pub(crate) fn id_fn(&self) -> IdFn<T, K> {
        Arc::clone(&self.id_of)
    }

    pub(crate) fn item_source(&self) -> Option<&Arc<dyn ItemSource<T, K>>> {
        self.item.as_ref()
    }

    pub(crate) fn batch_source(&self) -> Option<&Arc<dyn BatchSource<T, K>>> {
        self.batch.as_ref()
    }

    /// Splitter over the bulk endpoint
    pub(crate) fn splitter(&self) -> Option<BatchSplitter<T, K>> {
        let batch = self.batch.as_ref()?;
        Some(
            BatchSplitter::from_arc(Arc::clone(batch), self.id_fn(), self.config.batch_size)
                .configured(&self.config),
        )
    }
}

impl<T, K> std::fmt::Debug for Resource<T, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("item", &self.item.is_some())
            .field("batch", &self.batch.is_some())
            .field("listing", &self.listing.is_some())
            .field("streamer_built", &self.streamer.get().is_some())
            .field("config", &self.config)
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Resource`]
pub struct ResourceBuilder<T, K> {
    id_of: IdFn<T, K>,
    item: Option<Arc<dyn ItemSource<T, K>>>,
    batch: Option<Arc<dyn BatchSource<T, K>>>,
    listing: Option<ListingFactory<T>>,
    config: AccessConfig,
}

impl<T, K> ResourceBuilder<T, K>
where
    T: Clone + Send + Sync + 'static,
    K: Key,
{
    fn new(id_of: IdFn<T, K>) -> Self {
        Self {
            id_of,
            item: None,
            batch: None,
            listing: None,
            config: AccessConfig::default(),
        }
    }

    /// Serve single lookups from a one-item endpoint
    #[must_use]
    pub fn item(mut self, source: impl ItemSource<T, K> + 'static) -> Self {
        self.item = Some(Arc::new(source));
        self
    }

    /// Serve lookups from a bulk endpoint
    #[must_use]
    pub fn batch(mut self, source: impl BatchSource<T, K> + 'static) -> Self {
        self.batch = Some(Arc::new(source));
        self
    }

    /// List the collection through a page-numbered endpoint
    ///
    /// Replaces any listing set before.
    #[must_use]
    pub fn paged(mut self, source: impl PageSource<T> + 'static) -> Self {
        let source: Arc<dyn PageSource<T>> = Arc::new(source);
        self.listing = Some(Box::new(
            move |config: &AccessConfig| -> Arc<dyn Streamer<T>> {
                Arc::new(
                    PageStreamer::from_arc(Arc::clone(&source), config.page_size)
                        .configured(config),
                )
            },
        ));
        self
    }

    /// List the collection through a max-id cursor endpoint
    ///
    /// `cursor_id` extracts the numeric id the cursor walks by. Replaces any
    /// listing set before.
    #[must_use]
    pub fn cursor(
        mut self,
        source: impl CursorSource<T> + 'static,
        cursor_id: IdFn<T, CursorId>,
    ) -> Self {
        let source: Arc<dyn CursorSource<T>> = Arc::new(source);
        self.listing = Some(Box::new(
            move |config: &AccessConfig| -> Arc<dyn Streamer<T>> {
                Arc::new(
                    CursorStreamer::from_arc(
                        Arc::clone(&source),
                        Arc::clone(&cursor_id),
                        config.page_size,
                    )
                    .configured(config),
                )
            },
        ));
        self
    }

    /// Use these access settings instead of the defaults
    #[must_use]
    pub fn config(mut self, config: &AccessConfig) -> Self {
        self.config = config.clone();
        self
    }

    /// Validate the settings and build the resource
    pub fn build(self) -> Result<Resource<T, K>> {
        self.config.validate()?;
        debug!(
            item = self.item.is_some(),
            batch = self.batch.is_some(),
            listing = self.listing.is_some(),
            "Built resource"
        );
        Ok(Resource {
            id_of: self.id_of,
            item: self.item,
            batch: self.batch,
            listing: self.listing,
            streamer: OnceCell::new(),
            config: self.config,
        })
    }
}
