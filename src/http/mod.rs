//! HTTP module
//!
//! JSON-over-HTTP implementations of the source traits, so a remote
//! collection can be described by URL and query parameter names instead of
//! hand-written closures.
//!
//! # Features
//!
//! - **HttpClient**: base URL, default headers, timeout, status mapping
//! - **Sources**: page-numbered, max-id cursor, comma-joined bulk and
//!   single-item endpoints
//! - **Record paths**: records located with dotted paths like `$.data`

mod client;
mod sources;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use sources::{
    decode_records, extract_path, JsonBatchSource, JsonCursorSource, JsonItemSource,
    JsonPageSource,
};
