//! Resource module
//!
//! Adapts the endpoints a remote collection happens to expose into three
//! views:
//! - `Single` - one item by id
//! - `Mapped` - many items by id
//! - `Iterated` - the whole listing

mod adapter;
mod types;
mod views;

pub use adapter::{Resource, ResourceBuilder};
pub use types::ItemSource;
pub use views::{Iterated, Mapped, Single};

#[cfg(test)]
mod tests;
