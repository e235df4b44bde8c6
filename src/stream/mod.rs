//! Traversal module
//!
//! Shared machinery behind every streamer:
//! - `Traversal` - one lazy pass with an observable lifecycle
//! - `Streamer` - factory trait producing independent traversals
//! - `SingleFlight` - de-duplicates concurrent aggregate fetches

mod flight;
mod traversal;

pub use flight::SingleFlight;
pub use traversal::{Streamer, Traversal, TraversalState};
