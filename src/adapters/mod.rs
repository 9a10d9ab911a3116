//! Adapters layer: Concrete implementations of ports.
//!
//! - `forest`: tree-ensemble artifact stored as JSON on disk

pub mod forest;

pub use forest::ForestModel;
