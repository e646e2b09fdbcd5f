//! supportkb-embed
//!
//! Embedding backends for the vector index: a local transformer encoder on
//! candle and a deterministic hashing embedder for tests and development.

pub mod device;
pub mod hashing;
pub mod pool;
pub mod tokenize;
pub mod transformer;

use anyhow::{anyhow, Result};
use std::path::PathBuf;
use tracing::info;

use supportkb_core::config::{fake_embeddings_requested, EmbeddingConfig, EmbeddingProvider};
use supportkb_core::traits::Embedder;

pub use hashing::{hash_model_name, HashEmbedder};
pub use pool::masked_mean_l2;
pub use transformer::TransformerEmbedder;

/// Builds the embedder described by `config`.
///
/// Respects `APP_USE_FAKE_EMBEDDINGS=1` to switch to the hashing embedder
/// regardless of the configured provider.
pub fn load_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    if uses_hashing(config) {
        info!(dim = config.hash_dim, "using hashing embedder");
        return Ok(Box::new(HashEmbedder::new(config.hash_dim)));
    }
    let dir = resolve_model_dir(config)?;
    Ok(Box::new(TransformerEmbedder::load(&dir, &config.model_name, config.max_len)?))
}

fn uses_hashing(config: &EmbeddingConfig) -> bool {
    fake_embeddings_requested() || config.provider == EmbeddingProvider::Hash
}

/// The model name [`load_embedder`] would report for `config`, known before
/// anything is loaded.
pub fn configured_model_name(config: &EmbeddingConfig) -> String {
    if uses_hashing(config) {
        hash_model_name(config.hash_dim)
    } else {
        config.model_name.clone()
    }
}

fn resolve_model_dir(config: &EmbeddingConfig) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(dir) = &config.model_dir {
        candidates.push(dir.clone());
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            candidates.push(PathBuf::from(dir));
        }
    }
    candidates.push(PathBuf::from("models").join(&config.model_name));
    candidates
        .into_iter()
        .find(|p| p.exists())
        .ok_or_else(|| anyhow!("Could not locate model directory for '{}'", config.model_name))
}
