//! Domain types shared by the loader, both retrieval tiers and the engine.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

pub type EntryKey = String;

pub const DEFAULT_CATEGORY: &str = "General";

/// One curated problem/solution pair.
///
/// - `problem`: short human description
/// - `keywords`: lowercase match terms, in source order
/// - `solutions`: ordered remediation steps, never empty
/// - `category`: label, `General` when the source leaves it blank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub problem: String,
    pub keywords: Vec<String>,
    pub solutions: Vec<String>,
    pub category: String,
}

impl KnowledgeEntry {
    /// Builds a validated entry. Keywords are trimmed and lowercased, blank
    /// keywords and solutions are dropped. Fails when no solution remains.
    pub fn new<P, K, S>(problem: P, keywords: K, solutions: S, category: Option<&str>) -> Result<Self>
    where
        P: Into<String>,
        K: IntoIterator,
        K::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        let solutions: Vec<String> = solutions
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if solutions.is_empty() {
            return Err(Error::InvalidEntry("entry has no solutions".to_string()));
        }
        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
            .to_string();
        Ok(Self { problem: problem.into().trim().to_string(), keywords, solutions, category })
    }

    /// An entry without keywords can only be reached through the semantic tier.
    pub fn has_keywords(&self) -> bool {
        !self.keywords.is_empty()
    }
}

/// An ordered snapshot of knowledge entries keyed by unique identity.
///
/// Iteration order is insertion order; the keyword tier relies on it for
/// deterministic tie-breaking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnowledgeBase {
    entries: IndexMap<EntryKey, KnowledgeEntry>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an entry. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, entry: KnowledgeEntry) -> Result<Option<KnowledgeEntry>> {
        let key = key.into().trim().to_string();
        if key.is_empty() || key.eq_ignore_ascii_case("nan") {
            return Err(Error::InvalidEntry("blank key".to_string()));
        }
        Ok(self.entries.insert(key, entry))
    }

    /// Chainable variant of [`insert`](Self::insert) used by fixtures and defaults.
    pub fn with_entry(mut self, key: impl Into<String>, entry: KnowledgeEntry) -> Result<Self> {
        self.insert(key, entry)?;
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&KnowledgeEntry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &KnowledgeEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Projects every entry, in iteration order.
    pub fn documents(&self) -> Vec<Document> {
        self.iter().map(|(key, entry)| crate::projector::project(key, entry)).collect()
    }

    /// Content hash over the projected documents. Two snapshots with the same
    /// fingerprint produce identical indexes.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for doc in self.documents() {
            hasher.update(doc.metadata.key.as_bytes());
            hasher.update(&[0]);
            hasher.update(doc.text.as_bytes());
            hasher.update(&[0]);
            hasher.update(doc.metadata.category.as_bytes());
            hasher.update(&[0xff]);
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Back-reference from an indexed document to its knowledge entry.
/// Fields are copies taken at projection time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub key: EntryKey,
    #[serde(default)]
    pub problem: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub solutions: Vec<String>,
}

/// The flattened, indexable projection of a [`KnowledgeEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// Which tier produced a [`ResolutionResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchMethod {
    #[serde(rename = "RAG")]
    Rag,
    Keywords,
    Fallback,
}

impl SearchMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rag => "RAG",
            Self::Keywords => "Keywords",
            Self::Fallback => "Fallback",
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform answer returned by the resolution engine regardless of tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub solutions: Vec<String>,
    /// Always within `[0, 1]`.
    pub confidence: f32,
    pub category: String,
    pub solved: bool,
    pub matched_keywords: Vec<String>,
    pub search_method: SearchMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kb_key: Option<EntryKey>,
    /// Number of semantic hits above threshold (semantic tier only).
    #[serde(default)]
    pub similar_results: usize,
}

impl ResolutionResult {
    /// Clamps a tier score onto the shared confidence scale.
    pub fn clamp_confidence(score: f32) -> f32 {
        if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        }
    }
}
