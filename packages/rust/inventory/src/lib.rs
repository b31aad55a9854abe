//! Inventory ingestion for configforge.
//!
//! Fetches the raw device/interface/BGP inventory from the source of truth
//! and derives the per-cycle [`PrecomputedContext`] the build stages work
//! from. One source = one upstream API.

mod assets;
mod source;

pub use assets::{Assets, PrecomputedContext};
pub use source::{AssetSource, HttpAssetSource, StaticAssetSource};
