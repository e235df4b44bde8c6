//! Batch module
//!
//! Splits id collections into bounded bulk requests.
//!
//! # Overview
//!
//! The batch module provides:
//! - `IdSet` - fixed list, de-duplicated set, or deferred id provider
//! - `BatchSource` - the bulk request contract
//! - `BatchSplitter` - fans an id set out over batches and merges the
//!   results into a map or a stream of `(id, item)` pairs

mod splitter;
mod types;

pub use splitter::BatchSplitter;
pub use types::{dedup_ids, split_batches, BatchSource, IdProvider, IdSet};
