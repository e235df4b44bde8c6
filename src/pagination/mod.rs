//! Pagination module
//!
//! Supports: Page number, Max-id cursor
//!
//! # Overview
//!
//! The pagination module turns a remote paginated collection into a
//! [`Streamer`](crate::stream::Streamer). Each strategy owns the rule that
//! decides when the remote side has run out of items.

mod cursor;
mod page;
mod types;

pub use cursor::CursorStreamer;
pub use page::PageStreamer;
pub use types::{CursorSource, Page, PageSource};
