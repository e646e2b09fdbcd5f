//! supportkb-core
//!
//! Shared data model, configuration and the knowledge-base side of the
//! resolution pipeline: loading entries from a tabular source and projecting
//! them into indexable documents.

pub mod config;
pub mod defaults;
pub mod error;
pub mod knowledge;
pub mod projector;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use knowledge::KnowledgeLoader;
pub use projector::project;
pub use types::{
    Document, DocumentMetadata, KnowledgeBase, KnowledgeEntry, ResolutionResult, SearchMethod,
};
