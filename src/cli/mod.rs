//! CLI module
//!
//! Command-line interface for walking remote collections.
//!
//! # Commands
//!
//! - `pages` - Stream a page-numbered endpoint
//! - `cursor` - Stream a max-id cursor endpoint
//! - `batch` - Fetch records by id through a bulk endpoint
//! - `get` - Fetch a single record

mod commands;
mod runner;

pub use commands::{Cli, Commands, Endpoint, OutputFormat};
pub use runner::Runner;
