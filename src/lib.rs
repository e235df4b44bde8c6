// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # resource-pager
//!
//! Uniform access to remote REST collections, whatever shape their
//! endpoints happen to have.
//!
//! ## Features
//!
//! - **Page Streaming**: Page-numbered endpoints walked lazily from page 1
//! - **Cursor Streaming**: Newest-first endpoints walked by a max-id cursor
//! - **Batch Splitting**: Id sets fanned out over bounded bulk requests
//! - **Resource Views**: `single`, `mapped` and `iterated` lookups that pick
//!   the cheapest endpoint available
//! - **Single-flight**: Concurrent `get_all` callers share one traversal
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use resource_pager::{id_fn, Page, Resource, Result};
//! use futures::TryStreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let resource = Resource::builder(id_fn(|user: &User| user.id))
//!         .paged(|page: u32| async move { fetch_users(page).await })
//!         .batch(|ids: Vec<u64>| async move { lookup_users(ids).await })
//!         .build()?;
//!
//!     // One item, through the bulk endpoint
//!     let ada = resource.single(1).get().await?;
//!
//!     // Many items, split into batches of at most 100 ids
//!     let users = resource.mapped(vec![1, 2, 3]).get().await?;
//!
//!     // Every item, one page at a time
//!     let mut all = resource.iterated().stream();
//!     while let Some((id, user)) = all.try_next().await? {
//!         // Process users
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Resource                            │
//! │   single(id) → Option<T>   mapped(ids) → IndexMap<K, T>     │
//! │   iterated() → Traversal<(K, T)>                            │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//! ┌───────────────┬─────────────┴───────┬───────────────────────┐
//! │  Pagination   │       Batch         │        Stream         │
//! ├───────────────┼─────────────────────┼───────────────────────┤
//! │ PageStreamer  │ BatchSplitter       │ Traversal             │
//! │ CursorStreamer│ IdSet               │ SingleFlight          │
//! └───────────────┴─────────────────────┴───────────────────────┘
//!                               │
//!                  ┌────────────┴────────────┐
//!                  │  HTTP (JSON sources)    │
//!                  └─────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the crate
pub mod error;

/// Common types and type aliases
pub mod types;

/// Access configuration
pub mod config;

/// Lazy traversals and single-flight fetches
pub mod stream;

/// Page-numbered and max-id cursor streamers
pub mod pagination;

/// Id set splitting over bulk endpoints
pub mod batch;

/// Resource definitions and views
pub mod resource;

/// JSON-over-HTTP sources
pub mod http;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use batch::{BatchSource, BatchSplitter, IdProvider, IdSet};
pub use config::{load_config, load_config_from_str, AccessConfig};
pub use pagination::{CursorSource, CursorStreamer, Page, PageSource, PageStreamer};
pub use resource::{ItemSource, Resource};
pub use stream::{Streamer, Traversal, TraversalState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
