//! supportkb-keyword
//!
//! Deterministic keyword-overlap scoring over a knowledge base snapshot.

pub mod scorer;

pub use scorer::{KeywordMatch, KeywordScorer};
