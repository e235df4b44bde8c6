//! Tests for resource module

use super::*;
use crate::batch::{BatchSource, IdSet};
use crate::config::AccessConfig;
use crate::error::{Error, Result};
use crate::pagination::{CursorSource, Page, PageSource};
use crate::types::{id_fn, CursorId, Key};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use indexmap::IndexMap;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Fake Catalog
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct Track {
    id: u32,
    title: String,
}

/// Tracks 1..=count, served by every endpoint kind, logging each call
#[derive(Clone)]
struct Catalog {
    tracks: Arc<Vec<Track>>,
    page_size: usize,
    calls: Arc<Mutex<Vec<String>>>,
}

impl Catalog {
    fn new(count: u32, page_size: usize) -> Self {
        let tracks = (1..=count)
            .map(|id| Track {
                id,
                title: format!("track-{id}"),
            })
            .collect();
        Self {
            tracks: Arc::new(tracks),
            page_size,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn find(&self, id: u32) -> Option<Track> {
        self.tracks.iter().find(|t| t.id == id).cloned()
    }
}

#[async_trait]
impl ItemSource<Track, u32> for Catalog {
    async fn fetch_item(&self, id: u32) -> Result<Option<Track>> {
        self.calls.lock().push(format!("item {id}"));
        Ok(self.find(id))
    }
}

#[async_trait]
impl BatchSource<Track, u32> for Catalog {
    async fn fetch_batch(&self, ids: Vec<u32>) -> Result<Vec<Track>> {
        self.calls.lock().push(format!("batch {ids:?}"));
        Ok(ids.into_iter().filter_map(|id| self.find(id)).collect())
    }
}

#[async_trait]
impl PageSource<Track> for Catalog {
    async fn fetch_page(&self, page: u32) -> Result<Page<Track>> {
        self.calls.lock().push(format!("page {page}"));
        let items = self
            .tracks
            .chunks(self.page_size)
            .nth(page as usize - 1)
            .map(<[Track]>::to_vec)
            .unwrap_or_default();
        Ok(Page::new(items))
    }
}

#[async_trait]
impl CursorSource<Track> for Catalog {
    async fn fetch_older(&self, from_id: Option<CursorId>) -> Result<Vec<Track>> {
        self.calls.lock().push(format!("cursor {from_id:?}"));
        let bound = from_id.unwrap_or(u64::MAX);
        Ok(self
            .tracks
            .iter()
            .rev()
            .filter(|t| u64::from(t.id) < bound)
            .take(self.page_size)
            .cloned()
            .collect())
    }
}

fn track_id() -> crate::types::IdFn<Track, u32> {
    id_fn(|t: &Track| t.id)
}

fn config(page_size: usize, batch_size: usize) -> AccessConfig {
    AccessConfig::default()
        .with_page_size(page_size)
        .with_batch_size(batch_size)
}

fn ids_of(pairs: &[(u32, Track)]) -> Vec<u32> {
    pairs.iter().map(|(id, _)| *id).collect()
}

fn assert_keys_requested<K: Key, V>(map: &IndexMap<K, V>, requested: &[K]) {
    for key in map.keys() {
        assert!(requested.contains(key), "unrequested key {key:?} in result");
    }
}

// ============================================================================
// Single View
// ============================================================================

#[tokio::test]
async fn test_single_prefers_item_endpoint() {
    let catalog = Catalog::new(10, 3);
    let resource = Resource::builder(track_id())
        .item(catalog.clone())
        .batch(catalog.clone())
        .paged(catalog.clone())
        .build()
        .unwrap();

    let track = resource.single(4).get().await.unwrap();

    assert_eq!(track.map(|t| t.title), Some("track-4".to_string()));
    assert_eq!(catalog.calls(), vec!["item 4"]);
}

#[tokio::test]
async fn test_single_falls_back_to_batch() {
    let catalog = Catalog::new(10, 3);
    let resource = Resource::builder(track_id())
        .batch(catalog.clone())
        .paged(catalog.clone())
        .build()
        .unwrap();

    let single = resource.single(7);
    assert_eq!(*single.id(), 7);
    assert_eq!(single.get().await.unwrap().unwrap().id, 7);
    assert_eq!(catalog.calls(), vec!["batch [7]"]);
}

#[tokio::test]
async fn test_single_scans_listing_until_found() {
    let catalog = Catalog::new(10, 3);
    let resource = Resource::builder(track_id())
        .paged(catalog.clone())
        .config(&config(3, 100))
        .build()
        .unwrap();

    let track = resource.single(5).get().await.unwrap();

    assert_eq!(track.unwrap().id, 5);
    assert_eq!(catalog.calls(), vec!["page 1", "page 2"]);
}

#[tokio::test]
async fn test_single_unknown_id_is_none() {
    let catalog = Catalog::new(4, 3);

    let by_item = Resource::builder(track_id())
        .item(catalog.clone())
        .build()
        .unwrap();
    assert!(by_item.single(99).get().await.unwrap().is_none());

    let by_listing = Resource::builder(track_id())
        .paged(catalog.clone())
        .config(&config(3, 100))
        .build()
        .unwrap();
    assert!(by_listing.single(99).get().await.unwrap().is_none());
}

#[tokio::test]
async fn test_single_without_endpoints_is_unsupported() {
    let resource: Resource<Track, u32> = Resource::builder(track_id()).build().unwrap();

    let err = resource.single(1).get().await.unwrap_err();
    assert!(matches!(err, Error::Unsupported { ref operation } if operation == "single"));
}

// ============================================================================
// Mapped View
// ============================================================================

#[tokio::test]
async fn test_mapped_uses_bulk_endpoint() {
    let catalog = Catalog::new(10, 3);
    let resource = Resource::builder(track_id())
        .item(catalog.clone())
        .batch(catalog.clone())
        .config(&config(3, 2))
        .build()
        .unwrap();

    let map = resource.mapped(vec![3, 3, 42, 1]).get().await.unwrap();

    assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![3, 1]);
    assert_eq!(catalog.calls(), vec!["batch [3, 42]", "batch [1]"]);
}

#[tokio::test]
async fn test_mapped_fans_out_item_requests() {
    let catalog = Catalog::new(10, 3);
    let resource = Resource::builder(track_id())
        .item(catalog.clone())
        .config(&config(3, 2))
        .build()
        .unwrap();

    let map = resource.mapped(vec![2, 9, 11]).get().await.unwrap();

    assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![2, 9]);
    assert_eq!(catalog.calls(), vec!["item 2", "item 9", "item 11"]);
}

#[tokio::test]
async fn test_mapped_drops_unrequested_bulk_items() {
    let resource = Resource::builder(track_id())
        .batch(|ids: Vec<u32>| async move {
            let mut tracks: Vec<Track> = ids
                .into_iter()
                .map(|id| Track {
                    id,
                    title: format!("track-{id}"),
                })
                .collect();
            tracks.push(Track {
                id: 999,
                title: "extra".to_string(),
            });
            Ok::<_, Error>(tracks)
        })
        .config(&config(3, 1))
        .build()
        .unwrap();

    let map = resource.mapped(vec![1, 2]).get().await.unwrap();
    assert_keys_requested(&map, &[1, 2]);
    assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![1, 2]);

    let pairs: Vec<(u32, Track)> = resource.mapped(vec![2]).stream().try_collect().await.unwrap();
    assert_eq!(ids_of(&pairs), vec![2]);
}

#[tokio::test]
async fn test_mapped_fan_out_keys_by_requested_id() {
    // Item bodies carry no id field, so the extractor yields "" for all of them
    let resource = Resource::builder(id_fn(|record: &Value| {
        record["id"].as_str().unwrap_or_default().to_string()
    }))
    .item(|id: String| async move { Ok::<_, Error>(Some(json!({ "name": format!("n{id}") }))) })
    .build()
    .unwrap();

    let requested = vec!["1".to_string(), "2".to_string()];
    let map = resource.mapped(requested.clone()).get().await.unwrap();

    assert_keys_requested(&map, &requested);
    assert_eq!(map.keys().cloned().collect::<Vec<_>>(), requested);
    assert_eq!(map["2"]["name"], "n2");
}

#[tokio::test]
async fn test_mapped_fan_out_respects_concurrency() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let source_in_flight = Arc::clone(&in_flight);
    let source_peak = Arc::clone(&peak);
    let resource = Resource::builder(track_id())
        .item(move |id: u32| {
            let in_flight = Arc::clone(&source_in_flight);
            let peak = Arc::clone(&source_peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, Error>(Some(Track {
                    id,
                    title: format!("track-{id}"),
                }))
            }
        })
        .config(&AccessConfig::default().with_batch_concurrency(2))
        .build()
        .unwrap();

    let ids: Vec<u32> = (1..=6).collect();
    let map = resource.mapped(ids.clone()).get().await.unwrap();

    assert_eq!(map.keys().copied().collect::<Vec<_>>(), ids);
    assert_eq!(peak.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_mapped_scans_listing_and_stops_early() {
    let catalog = Catalog::new(20, 3);
    let resource = Resource::builder(track_id())
        .paged(catalog.clone())
        .config(&config(3, 100))
        .build()
        .unwrap();

    let map = resource.mapped(vec![5, 2]).get().await.unwrap();

    assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![2, 5]);
    assert_eq!(catalog.calls(), vec!["page 1", "page 2"]);
}

#[tokio::test]
async fn test_mapped_listing_scan_with_unknown_ids() {
    let catalog = Catalog::new(5, 3);
    let resource = Resource::builder(track_id())
        .paged(catalog.clone())
        .config(&config(3, 100))
        .build()
        .unwrap();

    let map = resource.mapped(vec![4, 50]).get().await.unwrap();

    assert_keys_requested(&map, &[4, 50]);
    assert_eq!(map.len(), 1);
    assert!(map.contains_key(&4));
    assert_eq!(catalog.calls(), vec!["page 1", "page 2"]);
}

#[tokio::test]
async fn test_mapped_empty_ids_skip_listing() {
    let catalog = Catalog::new(5, 3);
    let resource = Resource::builder(track_id())
        .paged(catalog.clone())
        .build()
        .unwrap();

    let map = resource.mapped(Vec::new()).get().await.unwrap();

    assert!(map.is_empty());
    assert!(catalog.calls().is_empty());
}

#[tokio::test]
async fn test_mapped_stream_with_deferred_ids() {
    let catalog = Catalog::new(10, 4);
    let resource = Resource::builder(track_id())
        .batch(catalog.clone())
        .build()
        .unwrap();
    let ids: IdSet<u32> = IdSet::deferred(|| async { Ok::<_, Error>(vec![8, 6]) });

    let pairs: Vec<(u32, Track)> = resource.mapped(ids).stream().try_collect().await.unwrap();

    assert_eq!(ids_of(&pairs), vec![8, 6]);
}

#[tokio::test]
async fn test_mapped_without_endpoints_is_unsupported() {
    let resource: Resource<Track, u32> = Resource::builder(track_id()).build().unwrap();

    let mut pairs = resource.mapped(vec![1]).stream();
    let err = pairs.next().await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Unsupported { .. }));
    assert!(pairs.next().await.is_none());

    assert!(resource.mapped(vec![1]).get().await.is_err());
}

// ============================================================================
// Iterated View
// ============================================================================

#[tokio::test]
async fn test_iterated_pages_in_order() {
    let catalog = Catalog::new(7, 3);
    let resource = Resource::builder(track_id())
        .paged(catalog.clone())
        .config(&config(3, 100))
        .build()
        .unwrap();

    let pairs: Vec<(u32, Track)> = resource.iterated().stream().try_collect().await.unwrap();

    assert_eq!(ids_of(&pairs), (1..=7).collect::<Vec<_>>());
    assert_eq!(pairs[0].1.title, "track-1");
    assert_eq!(catalog.calls(), vec!["page 1", "page 2", "page 3"]);
}

#[tokio::test]
async fn test_iterated_cursor_descending() {
    let catalog = Catalog::new(7, 3);
    let resource = Resource::builder(track_id())
        .cursor(catalog.clone(), id_fn(|t: &Track| u64::from(t.id)))
        .config(&config(3, 100))
        .build()
        .unwrap();

    let items = resource.iterated().get_all().await.unwrap();

    assert_eq!(
        items.iter().map(|t| t.id).collect::<Vec<_>>(),
        vec![7, 6, 5, 4, 3, 2, 1]
    );
    assert_eq!(
        catalog.calls(),
        vec!["cursor None", "cursor Some(5)", "cursor Some(2)"]
    );
}

#[tokio::test]
async fn test_iterated_twice_yields_same_sequence() {
    let catalog = Catalog::new(5, 2);
    let resource = Resource::builder(track_id())
        .paged(catalog.clone())
        .config(&config(2, 100))
        .build()
        .unwrap();

    let first: Vec<(u32, Track)> = resource.iterated().stream().try_collect().await.unwrap();
    let second: Vec<(u32, Track)> = resource.iterated().stream().try_collect().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 5);
}

#[tokio::test]
async fn test_iterated_without_listing_is_unsupported() {
    let resource = Resource::builder(track_id())
        .item(Catalog::new(3, 3))
        .build()
        .unwrap();

    assert!(matches!(
        resource.iterated().get_all().await,
        Err(Error::Unsupported { .. })
    ));
    assert!(resource.iterated().stream().next().await.unwrap().is_err());
}

// ============================================================================
// Resource
// ============================================================================

#[test]
fn test_streamer_is_built_once() {
    let catalog = Catalog::new(3, 3);
    let resource = Resource::builder(track_id())
        .paged(catalog)
        .build()
        .unwrap();

    let first = Arc::clone(resource.streamer().unwrap());
    let second = Arc::clone(resource.streamer().unwrap());
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_endpoint_flags() {
    let catalog = Catalog::new(3, 3);
    let resource = Resource::builder(track_id())
        .batch(catalog)
        .build()
        .unwrap();

    assert!(resource.has_batch());
    assert!(!resource.has_item());
    assert!(!resource.has_listing());
    assert!(resource.streamer().is_none());
    assert_eq!(resource.id_of(&Track { id: 9, title: String::new() }), 9);
}

#[test]
fn test_build_rejects_invalid_config() {
    let err = Resource::<Track, u32>::builder(track_id())
        .config(&AccessConfig::default().with_batch_size(0))
        .build()
        .unwrap_err();

    assert!(matches!(err, Error::InvalidConfigValue { .. }));
}

#[tokio::test]
async fn test_closure_endpoints() {
    let resource = Resource::builder(id_fn(|name: &String| name.len()))
        .item(|len: usize| async move {
            Ok::<_, Error>((len < 4).then(|| "x".repeat(len)))
        })
        .build()
        .unwrap();

    assert_eq!(resource.single(3).get().await.unwrap(), Some("xxx".to_string()));
    assert_eq!(resource.single(8).get().await.unwrap(), None);
    assert_eq!(resource.config().batch_size, 100);
}
