use anyhow::Result;
use parking_lot::RwLock;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use supportkb_core::config::Config;
use supportkb_core::error::Error;
use supportkb_core::types::{KnowledgeBase, ResolutionResult, SearchMethod};
use supportkb_core::KnowledgeLoader;
use supportkb_keyword::{KeywordMatch, KeywordScorer};
use supportkb_vector::{IndexStats, IndexStatus, SearchOutcome, SearchResult, VectorIndex};

/// Operator-facing status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStats {
    #[serde(flatten)]
    pub index: IndexStats,
    pub knowledge_entries: usize,
    pub semantic_enabled: bool,
    /// The index was built from a different knowledge base snapshot than the
    /// one currently loaded.
    pub stale: bool,
}

/// Owns a knowledge base snapshot and a vector index and answers queries
/// against both.
pub struct ResolutionEngine {
    config: Config,
    loader: KnowledgeLoader,
    knowledge: RwLock<Arc<KnowledgeBase>>,
    index: VectorIndex,
    scorer: KeywordScorer,
}

pub struct EngineBuilder {
    config: Config,
    knowledge: Option<KnowledgeBase>,
    index: Option<VectorIndex>,
}

impl EngineBuilder {
    /// Use `kb` instead of running the loader.
    pub fn knowledge_base(mut self, kb: KnowledgeBase) -> Self {
        self.knowledge = Some(kb);
        self
    }

    /// Use an already initialised index instead of opening one from config.
    pub fn vector_index(mut self, index: VectorIndex) -> Self {
        self.index = Some(index);
        self
    }

    pub fn build(self) -> ResolutionEngine {
        let config = self.config;
        let loader = KnowledgeLoader::from_config(&config.knowledge);
        let knowledge = self.knowledge.unwrap_or_else(|| loader.load());
        let index = match self.index {
            Some(index) => index,
            None if config.search.enabled => VectorIndex::open(&config.index.path, &config.embedding),
            None => {
                info!("semantic search disabled; vector index not loaded");
                VectorIndex::new(&config.index.path)
                    .with_model_name(supportkb_embed::configured_model_name(&config.embedding))
            }
        };
        let engine = ResolutionEngine {
            scorer: KeywordScorer::from_config(&config.keyword),
            knowledge: RwLock::new(Arc::new(knowledge)),
            config,
            loader,
            index,
        };
        engine.sync_index_on_start();
        engine
    }
}

impl ResolutionEngine {
    /// Loads the knowledge base and opens the index described by `config`.
    pub fn new(config: Config) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: Config) -> EngineBuilder {
        EngineBuilder { config, knowledge: None, index: None }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Current knowledge base snapshot.
    pub fn knowledge_base(&self) -> Arc<KnowledgeBase> {
        self.knowledge.read().clone()
    }

    /// Where the knowledge base is read from; `None` means the built-in set.
    pub fn knowledge_source(&self) -> Option<&Path> {
        self.loader.source()
    }

    /// Populates an empty index. A non-empty index that no longer matches the
    /// knowledge base is kept as is (it may hold appended documents) unless
    /// `index.rebuild_if_stale` is set.
    fn sync_index_on_start(&self) {
        if !self.index.is_available() {
            return;
        }
        let kb = self.knowledge_base();
        if self.index.is_empty() {
            info!(entries = kb.len(), path = %self.index.path().display(), "populating empty vector index");
        } else if self.is_stale() {
            if !self.config.index.rebuild_if_stale {
                warn!(
                    documents = self.index.len(),
                    "vector index does not match the knowledge base; keeping it, run a rebuild to refresh"
                );
                return;
            }
            info!("vector index is stale; rebuilding");
        } else {
            return;
        }
        if let Err(e) = self.rebuild_from(&kb) {
            warn!(error = %e, "vector index build failed; keeping previous index");
        }
    }

    fn rebuild_from(&self, kb: &KnowledgeBase) -> Result<usize> {
        let fingerprint = kb.fingerprint();
        self.index.rebuild(&kb.documents(), self.config.embedding.batch_size, Some(fingerprint.as_str()))
    }

    /// Rebuilds the vector index from the current knowledge base. Fails when
    /// the index is not ready.
    pub fn rebuild_index(&self) -> Result<usize> {
        if !self.index.is_available() {
            let reason = self.index.unavailable_reason().unwrap_or_else(|| "semantic search disabled".to_string());
            return Err(Error::Unavailable(reason).into());
        }
        let kb = self.knowledge_base();
        self.rebuild_from(&kb)
    }

    /// Retries loading the embedding model after a failed start.
    pub fn retry_semantic(&self) -> IndexStatus {
        let status = self.index.retry(|| supportkb_embed::load_embedder(&self.config.embedding));
        if status == IndexStatus::Ready {
            self.sync_index_on_start();
        }
        status
    }

    /// Re-runs the loader and swaps the snapshot in. The index is rebuilt only
    /// when `index.rebuild_on_refresh` is set; otherwise it may now be stale.
    pub fn load_knowledge_base(&self) -> Arc<KnowledgeBase> {
        let kb = self.loader.load();
        self.replace_knowledge_base(kb)
    }

    /// Swaps in `kb` with the same refresh policy as
    /// [`load_knowledge_base`](Self::load_knowledge_base).
    pub fn replace_knowledge_base(&self, kb: KnowledgeBase) -> Arc<KnowledgeBase> {
        let kb = Arc::new(kb);
        *self.knowledge.write() = kb.clone();
        info!(entries = kb.len(), "knowledge base refreshed");
        if self.config.index.rebuild_on_refresh && self.index.is_available() {
            if let Err(e) = self.rebuild_from(&kb) {
                warn!(error = %e, "rebuild after refresh failed; index is stale");
            }
        } else if self.is_stale() {
            warn!("vector index no longer matches the knowledge base; run a rebuild");
        }
        kb
    }

    fn is_stale(&self) -> bool {
        self.index.is_available()
            && self.index.kb_fingerprint().as_deref() != Some(self.knowledge_base().fingerprint().as_str())
    }

    pub fn get_stats(&self) -> EngineStats {
        EngineStats {
            index: self.index.stats(),
            knowledge_entries: self.knowledge_base().len(),
            semantic_enabled: self.config.search.enabled,
            stale: self.is_stale(),
        }
    }

    /// Resolves `query` through the semantic tier, then the keyword tier,
    /// then the generic fallback.
    pub fn resolve_query(&self, query: &str) -> ResolutionResult {
        if let Some(result) = self.semantic_tier(query) {
            return result;
        }
        let kb = self.knowledge_base();
        if let Some(result) = self.keyword_tier(query, &kb) {
            return result;
        }
        debug!(query, "no tier qualified; generic fallback");
        self.fallback()
    }

    fn semantic_tier(&self, query: &str) -> Option<ResolutionResult> {
        if !self.config.search.enabled {
            return None;
        }
        let search = &self.config.search;
        match self.index.search_outcome(query, search.top_k, search.score_threshold) {
            SearchOutcome::Hit(results) => {
                let similar = results.len();
                let top = results.into_iter().next()?;
                rag_result(top, similar)
            }
            SearchOutcome::Empty => {
                debug!(query, "semantic tier: nothing above threshold");
                None
            }
            SearchOutcome::Unavailable => None,
            SearchOutcome::Error(reason) => {
                warn!(%reason, "semantic search failed; falling back to keywords");
                None
            }
        }
    }

    fn keyword_tier(&self, query: &str, kb: &KnowledgeBase) -> Option<ResolutionResult> {
        let m = self.scorer.accepted_match(query, kb)?;
        debug!(query, key = %m.key, score = m.score, "keyword tier accepted");
        Some(ResolutionResult {
            solutions: m.entry.solutions,
            confidence: ResolutionResult::clamp_confidence(m.score),
            category: m.entry.category,
            solved: true,
            matched_keywords: m.matched_keywords,
            search_method: SearchMethod::Keywords,
            kb_key: Some(m.key),
            similar_results: 0,
        })
    }

    /// The fixed generic answer.
    pub fn fallback(&self) -> ResolutionResult {
        let f = &self.config.fallback;
        ResolutionResult {
            solutions: f.solutions.clone(),
            confidence: ResolutionResult::clamp_confidence(f.confidence),
            category: f.category.clone(),
            solved: false,
            matched_keywords: Vec::new(),
            search_method: SearchMethod::Fallback,
            kb_key: None,
            similar_results: 0,
        }
    }

    /// Up to `limit` entries sharing keywords with `query`, best first.
    pub fn similar_entries(&self, query: &str, limit: usize) -> Vec<KeywordMatch> {
        self.scorer.similar_entries(query, &self.knowledge_base(), limit)
    }
}

fn rag_result(top: SearchResult, similar_results: usize) -> Option<ResolutionResult> {
    if top.metadata.solutions.is_empty() {
        return None;
    }
    debug!(key = %top.metadata.key, score = top.score, "semantic tier accepted");
    Some(ResolutionResult {
        solutions: top.metadata.solutions,
        confidence: ResolutionResult::clamp_confidence(top.score),
        category: top.metadata.category,
        solved: true,
        matched_keywords: top.metadata.keywords,
        search_method: SearchMethod::Rag,
        kb_key: Some(top.metadata.key),
        similar_results,
    })
}
