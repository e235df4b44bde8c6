//! Common types used throughout resource-pager
//!
//! This module contains shared type definitions, type aliases,
//! and small helpers used across multiple modules.

use crate::error::{Error, Result};
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Extracts the id of an item. Must be pure and must not panic.
pub type IdFn<T, K> = Arc<dyn Fn(&T) -> K + Send + Sync>;

/// Numeric id used by max-id cursor endpoints
pub type CursorId = u64;

// ============================================================================
// Keys
// ============================================================================

/// Bound satisfied by every id type the crate can key maps and batches by
pub trait Key: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<K> Key for K where K: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

/// Wrap a closure as a shareable id extractor
pub fn id_fn<T, K, F>(f: F) -> IdFn<T, K>
where
    F: Fn(&T) -> K + Send + Sync + 'static,
{
    Arc::new(f)
}

// ============================================================================
// Request Timeout
// ============================================================================

/// Await a remote fetch, failing with [`Error::Timeout`] once `timeout` elapses
pub async fn with_timeout<T, F>(timeout: Option<Duration>, fetch: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout {
        None => fetch.await,
        Some(limit) => match tokio::time::timeout(limit, fetch).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Remote request timed out after {:?}", limit);
                Err(Error::Timeout {
                    timeout_ms: limit.as_millis() as u64,
                })
            }
        },
    }
}
