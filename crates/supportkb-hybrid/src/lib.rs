//! supportkb-hybrid
//!
//! The resolution engine: semantic search first, keyword scoring second,
//! a fixed generic answer last. Every query gets a [`ResolutionResult`].

pub mod engine;

pub use engine::{EngineBuilder, EngineStats, ResolutionEngine};
