//! supportkb-vector
//!
//! Semantic retrieval over projected knowledge documents: a flat
//! inner-product index with an explicit availability state machine,
//! directory persistence and atomic rebuilds.

pub mod index;
pub mod storage;

pub use index::{IndexStats, IndexStatus, SearchOutcome, SearchResult, VectorIndex};
