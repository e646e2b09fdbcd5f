use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use supportkb_core::config::EmbeddingConfig;
use supportkb_core::error::Error;
use supportkb_core::traits::Embedder;
use supportkb_core::types::{Document, DocumentMetadata};

use crate::storage::{self, Sidecar};

/// Lifecycle of a [`VectorIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexStatus {
    Uninitialized,
    ModelLoading,
    Ready,
    Unavailable,
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::ModelLoading => "MODEL_LOADING",
            Self::Ready => "READY",
            Self::Unavailable => "UNAVAILABLE",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub text: String,
    pub metadata: DocumentMetadata,
    pub score: f32,
    /// Position of the document in the index.
    pub index: usize,
}

/// What a semantic search produced. Callers branch on this instead of
/// treating an empty list as every kind of failure at once.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Hit(Vec<SearchResult>),
    /// The search ran but nothing passed the threshold, or the index is empty.
    Empty,
    Unavailable,
    Error(String),
}

impl SearchOutcome {
    pub fn into_results(self) -> Vec<SearchResult> {
        match self {
            Self::Hit(results) => results,
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub total_documents: usize,
    pub index_size: usize,
    pub model_name: String,
    pub index_path: PathBuf,
    pub dimension: usize,
    pub status: IndexStatus,
    pub created_at: Option<String>,
    pub kb_fingerprint: Option<String>,
}

/// In-memory contents. Replaced wholesale on every write so readers holding
/// the previous `Arc` keep a consistent view.
#[derive(Debug, Clone, Default)]
struct IndexState {
    documents: Vec<String>,
    metadata: Vec<DocumentMetadata>,
    /// Row-major, `documents.len() * dim`.
    vectors: Vec<f32>,
    dim: usize,
    created_at: Option<String>,
    kb_fingerprint: Option<String>,
}

impl IndexState {
    fn empty(dim: usize) -> Self {
        Self { dim, ..Self::default() }
    }

    fn len(&self) -> usize {
        self.documents.len()
    }

    fn push(&mut self, doc: &Document, vector: &[f32]) {
        self.documents.push(doc.text.clone());
        self.metadata.push(doc.metadata.clone());
        self.vectors.extend_from_slice(vector);
    }

    fn top_k(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dim.max(1))
            .enumerate()
            .map(|(i, row)| (i, row.iter().zip(query).map(|(a, b)| a * b).sum()))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        scored
    }
}

struct Inner {
    status: IndexStatus,
    embedder: Option<Arc<dyn Embedder>>,
    state: Arc<IndexState>,
    reason: Option<String>,
    /// Configured name until an embedder loads, then the embedder's own.
    model_name: String,
}

/// Flat inner-product index over L2-normalised document embeddings,
/// persisted under a directory.
///
/// Reads take a snapshot of the current state; writes are serialised by a
/// single writer lock and swap in a fully built state only after it has been
/// persisted.
pub struct VectorIndex {
    path: PathBuf,
    inner: RwLock<Inner>,
    writer: Mutex<()>,
}

impl VectorIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: RwLock::new(Inner {
                status: IndexStatus::Uninitialized,
                embedder: None,
                state: Arc::new(IndexState::default()),
                reason: None,
                model_name: String::new(),
            }),
            writer: Mutex::new(()),
        }
    }

    /// Model name reported by [`stats`](Self::stats) while no embedder is loaded.
    pub fn with_model_name(self, name: impl Into<String>) -> Self {
        self.inner.write().model_name = name.into();
        self
    }

    /// Loads the configured embedder and restores any persisted index.
    pub fn open(path: impl Into<PathBuf>, config: &EmbeddingConfig) -> Self {
        let index = Self::new(path).with_model_name(supportkb_embed::configured_model_name(config));
        index.initialize(|| supportkb_embed::load_embedder(config));
        index
    }

    /// Ready index over an already constructed embedder.
    pub fn with_embedder(path: impl Into<PathBuf>, embedder: Box<dyn Embedder>) -> Self {
        let index = Self::new(path);
        index.initialize(|| Ok(embedder));
        index
    }

    /// Runs `load` as the model-loading step. Success makes the index `READY`
    /// (restoring a persisted index when one matches); failure makes it
    /// `UNAVAILABLE`.
    pub fn initialize<F>(&self, load: F) -> IndexStatus
    where
        F: FnOnce() -> Result<Box<dyn Embedder>>,
    {
        let _guard = self.writer.lock();
        self.inner.write().status = IndexStatus::ModelLoading;
        match load() {
            Ok(embedder) => {
                let embedder: Arc<dyn Embedder> = Arc::from(embedder);
                let (state, _) = self.restore(embedder.as_ref());
                let mut inner = self.inner.write();
                inner.model_name = embedder.model_name().to_string();
                inner.embedder = Some(embedder);
                inner.state = Arc::new(state);
                inner.status = IndexStatus::Ready;
                inner.reason = None;
                info!(path = %self.path.display(), documents = inner.state.len(), "vector index ready");
            }
            Err(e) => {
                warn!(error = %e, "embedding model failed to load; semantic search unavailable");
                let mut inner = self.inner.write();
                inner.status = IndexStatus::Unavailable;
                inner.reason = Some(e.to_string());
            }
        }
        self.status()
    }

    /// Re-attempts initialisation from `UNAVAILABLE`. Any other state is left as is.
    pub fn retry<F>(&self, load: F) -> IndexStatus
    where
        F: FnOnce() -> Result<Box<dyn Embedder>>,
    {
        if self.status() != IndexStatus::Unavailable {
            return self.status();
        }
        info!("retrying vector index initialisation");
        self.initialize(load)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> IndexStatus {
        self.inner.read().status
    }

    pub fn is_available(&self) -> bool {
        self.status() == IndexStatus::Ready
    }

    /// Why the index is unavailable, if it is.
    pub fn unavailable_reason(&self) -> Option<String> {
        self.inner.read().reason.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kb_fingerprint(&self) -> Option<String> {
        self.inner.read().state.kb_fingerprint.clone()
    }

    fn ready_embedder(&self) -> Option<Arc<dyn Embedder>> {
        let inner = self.inner.read();
        match inner.status {
            IndexStatus::Ready => inner.embedder.clone(),
            _ => None,
        }
    }

    /// Embeds and appends `documents`, then persists. Returns how many were
    /// added; zero when the index is not ready.
    pub fn add_documents(&self, documents: &[Document], batch_size: usize) -> Result<usize> {
        let Some(embedder) = self.ready_embedder() else {
            debug!("add_documents skipped: index not ready");
            return Ok(0);
        };
        if documents.is_empty() {
            return Ok(0);
        }
        let _guard = self.writer.lock();
        let vectors = embed_documents(embedder.as_ref(), documents, batch_size)?;
        let mut next = IndexState::clone(&self.inner.read().state);
        next.dim = embedder.dim();
        for (doc, vector) in documents.iter().zip(vectors.iter()) {
            next.push(doc, vector);
        }
        // Appended content no longer corresponds to a single snapshot.
        next.kb_fingerprint = None;
        next.created_at = Some(now());
        self.commit(next, embedder.model_name())?;
        info!(added = documents.len(), total = self.len(), "documents added to vector index");
        Ok(documents.len())
    }

    /// Replaces the index with embeddings of `documents`. The new state is
    /// built and persisted before it becomes visible; on error the previous
    /// index stays authoritative both in memory and on disk.
    pub fn rebuild(&self, documents: &[Document], batch_size: usize, kb_fingerprint: Option<&str>) -> Result<usize> {
        let Some(embedder) = self.ready_embedder() else {
            debug!("rebuild skipped: index not ready");
            return Ok(0);
        };
        let _guard = self.writer.lock();
        info!(documents = documents.len(), "rebuilding vector index");
        let vectors = embed_documents(embedder.as_ref(), documents, batch_size)?;
        let mut next = IndexState::empty(embedder.dim());
        for (doc, vector) in documents.iter().zip(vectors.iter()) {
            next.push(doc, vector);
        }
        next.kb_fingerprint = kb_fingerprint.map(str::to_string);
        next.created_at = Some(now());
        self.commit(next, embedder.model_name())?;
        info!(total = documents.len(), "vector index rebuilt");
        Ok(documents.len())
    }

    /// Persists, then swaps in. Caller holds the writer lock.
    fn commit(&self, state: IndexState, model_name: &str) -> Result<()> {
        self.write_state(&state, model_name)?;
        self.inner.write().state = Arc::new(state);
        Ok(())
    }

    fn write_state(&self, state: &IndexState, model_name: &str) -> Result<()> {
        let sidecar = Sidecar {
            documents: state.documents.clone(),
            metadata: state.metadata.clone(),
            model_name: model_name.to_string(),
            created_at: state.created_at.clone(),
            total_documents: state.len(),
            dimension: state.dim,
            vectors_file: String::new(),
            kb_fingerprint: state.kb_fingerprint.clone(),
        };
        storage::write(&self.path, sidecar, &state.vectors)?;
        debug!(path = %self.path.display(), documents = state.len(), "vector index persisted");
        Ok(())
    }

    /// Writes the current state to disk.
    pub fn persist(&self) -> Result<()> {
        let Some(embedder) = self.ready_embedder() else {
            return Ok(());
        };
        let _guard = self.writer.lock();
        let state = self.inner.read().state.clone();
        self.write_state(&state, embedder.model_name())
    }

    /// Replaces the in-memory state with what is on disk. Returns whether a
    /// persisted index was restored; a missing or incompatible one leaves
    /// the index empty.
    pub fn reload(&self) -> bool {
        let Some(embedder) = self.ready_embedder() else {
            return false;
        };
        let _guard = self.writer.lock();
        let (state, restored) = self.restore(embedder.as_ref());
        self.inner.write().state = Arc::new(state);
        restored
    }

    fn restore(&self, embedder: &dyn Embedder) -> (IndexState, bool) {
        match storage::read(&self.path) {
            Ok(Some(persisted)) => {
                let side = persisted.sidecar;
                if side.model_name != embedder.model_name() || side.dimension != embedder.dim() {
                    warn!(
                        persisted_model = %side.model_name,
                        persisted_dim = side.dimension,
                        model = embedder.model_name(),
                        dim = embedder.dim(),
                        "persisted index was built with a different model; starting empty"
                    );
                    return (IndexState::empty(embedder.dim()), false);
                }
                info!(documents = side.total_documents, path = %self.path.display(), "restored persisted vector index");
                let state = IndexState {
                    documents: side.documents,
                    metadata: side.metadata,
                    vectors: persisted.vectors,
                    dim: side.dimension,
                    created_at: side.created_at,
                    kb_fingerprint: side.kb_fingerprint,
                };
                (state, true)
            }
            Ok(None) => (IndexState::empty(embedder.dim()), false),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "persisted index unreadable; starting empty");
                (IndexState::empty(embedder.dim()), false)
            }
        }
    }

    /// Top `top_k` documents scoring at least `score_threshold`, best first.
    pub fn search_outcome(&self, query: &str, top_k: usize, score_threshold: f32) -> SearchOutcome {
        let (embedder, state) = {
            let inner = self.inner.read();
            match (inner.status, &inner.embedder) {
                (IndexStatus::Ready, Some(embedder)) => (embedder.clone(), inner.state.clone()),
                _ => return SearchOutcome::Unavailable,
            }
        };
        if state.len() == 0 || top_k == 0 {
            return SearchOutcome::Empty;
        }
        let query_vec = match embed_query(embedder.as_ref(), query, state.dim) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "query embedding failed");
                return SearchOutcome::Error(e.to_string());
            }
        };
        let results: Vec<SearchResult> = state
            .top_k(&query_vec, top_k)
            .into_iter()
            .filter(|(_, score)| *score >= score_threshold)
            .map(|(i, score)| SearchResult {
                text: state.documents[i].clone(),
                metadata: state.metadata[i].clone(),
                score,
                index: i,
            })
            .collect();
        debug!(query, hits = results.len(), "semantic search");
        if results.is_empty() {
            SearchOutcome::Empty
        } else {
            SearchOutcome::Hit(results)
        }
    }

    /// [`search_outcome`](Self::search_outcome) flattened: every non-hit is an empty list.
    pub fn search(&self, query: &str, top_k: usize, score_threshold: f32) -> Vec<SearchResult> {
        self.search_outcome(query, top_k, score_threshold).into_results()
    }

    pub fn stats(&self) -> IndexStats {
        let inner = self.inner.read();
        IndexStats {
            total_documents: inner.state.len(),
            index_size: inner.state.vectors.len() / inner.state.dim.max(1),
            model_name: inner.model_name.clone(),
            index_path: self.path.clone(),
            dimension: inner.state.dim,
            status: inner.status,
            created_at: inner.state.created_at.clone(),
            kb_fingerprint: inner.state.kb_fingerprint.clone(),
        }
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn check_vector(v: &[f32], dim: usize) -> Result<()> {
    if v.len() != dim {
        return Err(Error::Embedding(format!("embedder returned dimension {} (expected {})", v.len(), dim)).into());
    }
    if v.iter().any(|x| !x.is_finite()) {
        return Err(Error::Embedding("embedder returned non-finite values".into()).into());
    }
    Ok(())
}

fn embed_query(embedder: &dyn Embedder, query: &str, dim: usize) -> Result<Vec<f32>> {
    let mut v = embedder
        .embed_batch(&[query.to_string()])?
        .into_iter()
        .next()
        .ok_or_else(|| Error::Embedding("embedder returned no vector for query".into()))?;
    check_vector(&v, dim)?;
    normalize(&mut v);
    Ok(v)
}

fn embed_documents(embedder: &dyn Embedder, documents: &[Document], batch_size: usize) -> Result<Vec<Vec<f32>>> {
    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    let mut out = Vec::with_capacity(documents.len());
    for batch in documents.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts)?;
        if vectors.len() != texts.len() {
            pb.abandon();
            return Err(Error::Embedding(format!("embedder returned {} vectors for {} texts", vectors.len(), texts.len())).into());
        }
        for mut v in vectors {
            check_vector(&v, embedder.dim())?;
            normalize(&mut v);
            out.push(v);
        }
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();
    Ok(out)
}
