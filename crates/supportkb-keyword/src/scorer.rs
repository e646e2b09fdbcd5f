use serde::Serialize;
use tracing::debug;

use supportkb_core::config::KeywordConfig;
use supportkb_core::types::{KnowledgeBase, KnowledgeEntry};

/// The best-scoring entry for a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordMatch {
    pub key: String,
    pub entry: KnowledgeEntry,
    /// Raw normalised score. May exceed 1 when the context boost applies.
    pub score: f32,
    pub matched_keywords: Vec<String>,
}

/// Substring keyword scorer with a context boost.
///
/// An entry scores `(hits + boost) / keywords` where `hits` counts keywords
/// found in the lowercased query and `boost` applies when the query also
/// mentions any boost term.
#[derive(Debug, Clone)]
pub struct KeywordScorer {
    boost: f32,
    boost_terms: Vec<String>,
    acceptance_threshold: f32,
}

impl Default for KeywordScorer {
    fn default() -> Self {
        Self::from_config(&KeywordConfig::default())
    }
}

impl KeywordScorer {
    pub fn new(boost: f32, boost_terms: impl IntoIterator<Item = impl AsRef<str>>, acceptance_threshold: f32) -> Self {
        Self {
            boost,
            boost_terms: boost_terms
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            acceptance_threshold,
        }
    }

    pub fn from_config(config: &KeywordConfig) -> Self {
        Self::new(config.boost, &config.boost_terms, config.acceptance_threshold)
    }

    pub fn acceptance_threshold(&self) -> f32 {
        self.acceptance_threshold
    }

    /// Strictly greater than the acceptance threshold.
    pub fn accepts(&self, score: f32) -> bool {
        score > self.acceptance_threshold
    }

    fn boosted(&self, query_lower: &str) -> bool {
        self.boost_terms.iter().any(|t| query_lower.contains(t.as_str()))
    }

    fn matches<'e>(query_lower: &str, entry: &'e KnowledgeEntry) -> Vec<&'e str> {
        entry
            .keywords
            .iter()
            .map(String::as_str)
            .filter(|k| query_lower.contains(k))
            .collect()
    }

    fn score_lowered(&self, query_lower: &str, boosted: bool, entry: &KnowledgeEntry) -> (f32, Vec<String>) {
        if !entry.has_keywords() {
            return (0.0, Vec::new());
        }
        let matched = Self::matches(query_lower, entry);
        let mut raw = matched.len() as f32;
        if boosted {
            raw += self.boost;
        }
        let score = raw / entry.keywords.len() as f32;
        (score, matched.into_iter().map(String::from).collect())
    }

    /// Normalised score of `entry` against `query`. Zero for entries without
    /// keywords.
    pub fn score(&self, query: &str, entry: &KnowledgeEntry) -> f32 {
        let q = query.to_lowercase();
        self.score_lowered(&q, self.boosted(&q), entry).0
    }

    /// Highest-scoring entry, earliest in iteration order on ties. `None` when
    /// no entry scores above zero.
    pub fn best_match(&self, query: &str, kb: &KnowledgeBase) -> Option<KeywordMatch> {
        let q = query.to_lowercase();
        let boosted = self.boosted(&q);
        let mut best: Option<(&str, &KnowledgeEntry, f32, Vec<String>)> = None;
        for (key, entry) in kb.iter() {
            let (score, matched) = self.score_lowered(&q, boosted, entry);
            let current = best.as_ref().map_or(0.0, |b| b.2);
            if score > current {
                best = Some((key, entry, score, matched));
            }
        }
        let (key, entry, score, matched_keywords) = best?;
        debug!(key, score, boosted, "keyword best match");
        Some(KeywordMatch { key: key.to_string(), entry: entry.clone(), score, matched_keywords })
    }

    /// Best match only when it clears the acceptance threshold.
    pub fn accepted_match(&self, query: &str, kb: &KnowledgeBase) -> Option<KeywordMatch> {
        self.best_match(query, kb).filter(|m| self.accepts(m.score))
    }

    /// Entries sharing at least one keyword with `query`, ranked by unboosted
    /// overlap. Ties keep knowledge-base order.
    pub fn similar_entries(&self, query: &str, kb: &KnowledgeBase, limit: usize) -> Vec<KeywordMatch> {
        let q = query.to_lowercase();
        let mut ranked: Vec<KeywordMatch> = kb
            .iter()
            .filter_map(|(key, entry)| {
                let (score, matched) = self.score_lowered(&q, false, entry);
                (score > 0.0).then(|| KeywordMatch {
                    key: key.to_string(),
                    entry: entry.clone(),
                    score,
                    matched_keywords: matched,
                })
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(limit);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(keywords: &[&str]) -> KnowledgeEntry {
        KnowledgeEntry::new("p", keywords.iter().copied(), ["s"], None).unwrap()
    }

    #[test]
    fn counts_substring_hits() {
        let s = KeywordScorer::new(1.5, ["phone"], 0.2);
        let e = entry(&["login", "password", "account", "email"]);
        assert_eq!(s.score("I forgot my LOGIN password", &e), 0.5);
    }

    #[test]
    fn boost_is_added_before_normalising() {
        let s = KeywordScorer::new(1.5, ["phone"], 0.2);
        let e = entry(&["battery", "drain", "charge"]);
        assert!((s.score("my phone battery", &e) - 2.5 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn boost_can_exceed_one() {
        let s = KeywordScorer::default();
        let e = entry(&["screen"]);
        assert!((s.score("android screen", &e) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn boost_terms_are_substrings() {
        let s = KeywordScorer::default();
        let e = entry(&["x", "y"]);
        assert!((s.score("iphones", &e) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn entries_without_keywords_score_zero() {
        let s = KeywordScorer::default();
        let e = KnowledgeEntry::new("p", Vec::<String>::new(), ["s"], None).unwrap();
        assert_eq!(s.score("phone", &e), 0.0);
    }
}
