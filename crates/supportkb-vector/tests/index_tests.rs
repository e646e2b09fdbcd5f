use anyhow::anyhow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use supportkb_core::config::{EmbeddingConfig, EmbeddingProvider};
use supportkb_core::defaults::default_knowledge_base;
use supportkb_core::error::Error;
use supportkb_core::traits::Embedder;
use supportkb_core::{Document, KnowledgeBase, KnowledgeEntry};
use supportkb_embed::HashEmbedder;
use supportkb_vector::storage::SIDECAR_FILE;
use supportkb_vector::{IndexStatus, SearchOutcome, VectorIndex};

/// Hash embedder that can be switched into failing mode mid-test.
struct Flaky {
    inner: HashEmbedder,
    fail: Arc<AtomicBool>,
}

impl Embedder for Flaky {
    fn model_name(&self) -> &str { self.inner.model_name() }
    fn dim(&self) -> usize { self.inner.dim() }
    fn max_len(&self) -> usize { self.inner.max_len() }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("embedding backend went away"));
        }
        self.inner.embed_batch(texts)
    }
}

/// Claims one width and returns another.
struct Misreported;

impl Embedder for Misreported {
    fn model_name(&self) -> &str { "misreported" }
    fn dim(&self) -> usize { 8 }
    fn max_len(&self) -> usize { 32 }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0; 4]).collect())
    }
}

fn flaky(dim: usize) -> (Box<dyn Embedder>, Arc<AtomicBool>) {
    let fail = Arc::new(AtomicBool::new(false));
    (Box::new(Flaky { inner: HashEmbedder::new(dim), fail: fail.clone() }), fail)
}

fn docs() -> Vec<Document> {
    default_knowledge_base().documents()
}

#[test]
fn persist_then_reload_keeps_document_count() {
    let dir = tempfile::tempdir().unwrap();
    let index = VectorIndex::with_embedder(dir.path(), Box::new(HashEmbedder::new(128)));
    assert_eq!(index.status(), IndexStatus::Ready);
    let added = index.add_documents(&docs(), 8).unwrap();
    assert_eq!(added, 25);
    index.persist().unwrap();
    let before = index.stats();

    let fresh = VectorIndex::with_embedder(dir.path(), Box::new(HashEmbedder::new(128)));
    let after = fresh.stats();
    assert_eq!(after.total_documents, before.total_documents);
    assert_eq!(after.index_size, 25);
    assert_eq!(after.model_name, "hash:d128");
    assert_eq!(after.dimension, 128);
}

#[test]
fn search_orders_descending_and_applies_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let index = VectorIndex::with_embedder(dir.path(), Box::new(HashEmbedder::new(256)));
    index.add_documents(&docs(), 32).unwrap();

    let all = index.search("phone screen cracked unresponsive", 5, -1.0);
    assert_eq!(all.len(), 5);
    assert!(all.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(all[0].metadata.key, "phone_screen_issues");

    let top = all[0].score;
    let filtered = index.search("phone screen cracked unresponsive", 5, top);
    assert!(!filtered.is_empty());
    assert!(filtered.iter().all(|r| r.score >= top));
    assert!(index.search("phone screen cracked unresponsive", 5, 1.0 + 1e-3).is_empty());
}

#[test]
fn empty_index_searches_empty() {
    let dir = tempfile::tempdir().unwrap();
    let index = VectorIndex::with_embedder(dir.path(), Box::new(HashEmbedder::new(16)));
    assert_eq!(index.search_outcome("anything", 3, 0.0), SearchOutcome::Empty);
    assert!(index.search("anything", 3, 0.0).is_empty());
}

#[test]
fn unavailable_index_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let index = VectorIndex::new(dir.path());
    assert_eq!(index.status(), IndexStatus::Uninitialized);
    let status = index.initialize(|| Err(anyhow!("model files missing")));
    assert_eq!(status, IndexStatus::Unavailable);
    assert!(index.unavailable_reason().unwrap().contains("model files missing"));

    assert_eq!(index.add_documents(&docs(), 4).unwrap(), 0);
    assert_eq!(index.rebuild(&docs(), 4, None).unwrap(), 0);
    assert_eq!(index.search_outcome("phone", 3, 0.0), SearchOutcome::Unavailable);
    assert!(!index.reload());
    assert!(!dir.path().join(SIDECAR_FILE).exists());

    let status = index.retry(|| Ok(Box::new(HashEmbedder::new(16)) as Box<dyn Embedder>));
    assert_eq!(status, IndexStatus::Ready);
}

#[test]
fn embedding_error_surfaces_as_error_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let (embedder, fail) = flaky(64);
    let index = VectorIndex::with_embedder(dir.path(), embedder);
    index.add_documents(&docs(), 10).unwrap();
    fail.store(true, Ordering::SeqCst);
    assert!(matches!(index.search_outcome("battery drain", 3, 0.0), SearchOutcome::Error(_)));
    assert!(index.search("battery drain", 3, 0.0).is_empty());
}

#[test]
fn failed_rebuild_leaves_previous_index_authoritative() {
    let dir = tempfile::tempdir().unwrap();
    let (embedder, fail) = flaky(64);
    let index = VectorIndex::with_embedder(dir.path(), embedder);
    let kb = default_knowledge_base();
    index.rebuild(&kb.documents(), 10, Some(kb.fingerprint().as_str())).unwrap();
    let before = std::fs::read(dir.path().join(SIDECAR_FILE)).unwrap();

    let entry = KnowledgeEntry::new("Only one", ["one"], ["do it"], None).unwrap();
    let small = KnowledgeBase::new().with_entry("single", entry).unwrap();
    fail.store(true, Ordering::SeqCst);
    assert!(index.rebuild(&small.documents(), 10, Some(small.fingerprint().as_str())).is_err());

    assert_eq!(index.len(), 25);
    assert_eq!(index.kb_fingerprint(), Some(kb.fingerprint()));
    assert_eq!(std::fs::read(dir.path().join(SIDECAR_FILE)).unwrap(), before);

    fail.store(false, Ordering::SeqCst);
    assert_eq!(index.rebuild(&small.documents(), 10, Some(small.fingerprint().as_str())).unwrap(), 1);
    assert_eq!(index.len(), 1);
    let reopened = VectorIndex::with_embedder(dir.path(), Box::new(HashEmbedder::new(64)));
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.kb_fingerprint(), Some(small.fingerprint()));
}

#[test]
fn reload_rejects_index_from_another_model() {
    let dir = tempfile::tempdir().unwrap();
    let index = VectorIndex::with_embedder(dir.path(), Box::new(HashEmbedder::new(32)));
    index.add_documents(&docs(), 8).unwrap();

    let other = VectorIndex::with_embedder(dir.path(), Box::new(HashEmbedder::new(48)));
    assert_eq!(other.status(), IndexStatus::Ready);
    assert!(other.is_empty());
    assert!(!other.reload());
}

#[test]
fn corrupted_sidecar_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let index = VectorIndex::with_embedder(dir.path(), Box::new(HashEmbedder::new(32)));
    index.add_documents(&docs(), 8).unwrap();
    std::fs::write(dir.path().join(SIDECAR_FILE), b"{ not json").unwrap();

    let reopened = VectorIndex::with_embedder(dir.path(), Box::new(HashEmbedder::new(32)));
    assert_eq!(reopened.status(), IndexStatus::Ready);
    assert!(reopened.is_empty());
}

#[test]
fn appending_keeps_parallel_lengths() {
    let dir = tempfile::tempdir().unwrap();
    let index = VectorIndex::with_embedder(dir.path(), Box::new(HashEmbedder::new(32)));
    let all = docs();
    index.add_documents(&all[..10], 4).unwrap();
    index.add_documents(&all[10..], 4).unwrap();
    let stats = index.stats();
    assert_eq!(stats.total_documents, 25);
    assert_eq!(stats.index_size, 25);
    assert!(stats.kb_fingerprint.is_none());
    assert!(stats.created_at.is_some());

    let hits = index.search("api integration", 25, -1.0);
    let mut positions: Vec<usize> = hits.iter().map(|h| h.index).collect();
    positions.sort_unstable();
    assert_eq!(positions, (0..25).collect::<Vec<_>>());
}

#[test]
fn stats_report_configured_model_before_and_after_loading() {
    let dir = tempfile::tempdir().unwrap();
    let index = VectorIndex::new(dir.path()).with_model_name("all-MiniLM-L6-v2");
    assert_eq!(index.stats().model_name, "all-MiniLM-L6-v2");
    assert_eq!(index.path(), dir.path());

    index.initialize(|| Err(anyhow!("model files missing")));
    let stats = index.stats();
    assert_eq!(stats.status, IndexStatus::Unavailable);
    assert_eq!(stats.model_name, "all-MiniLM-L6-v2");

    index.retry(|| Ok(Box::new(HashEmbedder::new(16)) as Box<dyn Embedder>));
    assert_eq!(index.stats().model_name, "hash:d16");

    let config = EmbeddingConfig { provider: EmbeddingProvider::Hash, hash_dim: 48, ..Default::default() };
    let opened = VectorIndex::open(dir.path().join("opened"), &config);
    assert_eq!(opened.stats().model_name, "hash:d48");
}

#[test]
fn wrong_width_vectors_are_embedding_errors() {
    let dir = tempfile::tempdir().unwrap();
    let index = VectorIndex::with_embedder(dir.path(), Box::new(Misreported));
    let err = index.add_documents(&docs(), 4).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Embedding(_))), "{err}");
    assert!(index.is_empty());
    assert!(!dir.path().join(SIDECAR_FILE).exists());
}
