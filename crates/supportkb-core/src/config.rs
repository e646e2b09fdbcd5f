//! Layered configuration and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`,
//! `config.<env>.toml` (env from `RUST_ENV`) and `APP_*` environment
//! variables, where `__` separates nested keys (`APP_SEARCH__TOP_K=5`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// `.csv` or `.json` rows; the built-in set is used when absent.
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Transformer encoder loaded from `model_dir`.
    Local,
    /// Deterministic feature-hashing embedder.
    Hash,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model_name: String,
    pub model_dir: Option<PathBuf>,
    pub max_len: usize,
    pub batch_size: usize,
    pub hash_dim: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Local,
            model_name: "all-MiniLM-L6-v2".to_string(),
            model_dir: None,
            max_len: 256,
            batch_size: 32,
            hash_dim: 384,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub path: PathBuf,
    /// Rebuild synchronously whenever the knowledge base is refreshed.
    pub rebuild_on_refresh: bool,
    /// Rebuild at engine construction when the persisted index was built
    /// from a different knowledge base snapshot.
    pub rebuild_if_stale: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("data/vector_index"), rebuild_on_refresh: false, rebuild_if_stale: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub enabled: bool,
    pub top_k: usize,
    pub score_threshold: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { enabled: true, top_k: 3, score_threshold: 0.3 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub acceptance_threshold: f32,
    pub boost: f32,
    pub boost_terms: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.2,
            boost: 1.5,
            boost_terms: ["phone", "mobile", "android", "iphone", "ios", "smartphone", "device"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub category: String,
    pub confidence: f32,
    pub solutions: Vec<String>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            category: "Phone - General".to_string(),
            confidence: 0.4,
            solutions: vec![
                "Restart the phone and ensure it's updated to the latest OS.".to_string(),
                "Clear cache or reinstall the problematic app if applicable.".to_string(),
                "Check storage, battery health, and network settings.".to_string(),
                "If the issue persists, back up your data and contact service support.".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub knowledge: KnowledgeConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub search: SearchConfig,
    pub keyword: KeywordConfig,
    pub fallback: FallbackConfig,
}

impl Config {
    /// Loads from the current directory using `RUST_ENV` (default `dev`).
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(Path::new("."), &env_name)
    }

    /// Loads `config.toml` and `config.<env>.toml` from `base`, then `APP_*`
    /// variables. Relative paths resolve against `base`.
    pub fn load_for_env(base: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut config: Self = Self::figment(base, env_name)
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    pub fn figment(base: &Path, env_name: &str) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(base.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(base.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base.join("config.test.toml"))),
            _ => {}
        }
        figment.merge(Env::prefixed("APP_").split("__"))
    }

    fn resolve_paths(&mut self, base: &Path) {
        self.index.path = resolve_with_base(base, self.index.path.to_string_lossy());
        if let Some(src) = &self.knowledge.source {
            self.knowledge.source = Some(resolve_with_base(base, src.to_string_lossy()));
        }
        if let Some(dir) = &self.embedding.model_dir {
            self.embedding.model_dir = Some(resolve_with_base(base, dir.to_string_lossy()));
        }
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        let unit = |name: &str, v: f32| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!("{name} must be within [0, 1], got {v}")))
            }
        };
        unit("search.score_threshold", self.search.score_threshold)?;
        unit("keyword.acceptance_threshold", self.keyword.acceptance_threshold)?;
        unit("fallback.confidence", self.fallback.confidence)?;
        if self.search.top_k == 0 {
            return Err(Error::InvalidConfig("search.top_k must be at least 1".into()));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be at least 1".into()));
        }
        if self.embedding.hash_dim == 0 {
            return Err(Error::InvalidConfig("embedding.hash_dim must be at least 1".into()));
        }
        if self.keyword.boost < 0.0 {
            return Err(Error::InvalidConfig("keyword.boost must not be negative".into()));
        }
        if self.fallback.solutions.iter().all(|s| s.trim().is_empty()) {
            return Err(Error::InvalidConfig("fallback.solutions must contain at least one step".into()));
        }
        Ok(())
    }
}

/// True when `APP_USE_FAKE_EMBEDDINGS` is `1` or `true`.
pub fn fake_embeddings_requested() -> bool {
    env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// `${VAR}`/`$VAR` then leading `~` expansion. No canonicalisation.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Expands `p` and joins it onto `base` unless it is already absolute.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Config::default().validate().expect("defaults are valid");
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let mut c = Config::default();
        c.search.score_threshold = 1.5;
        assert!(matches!(c.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn relative_paths_join_base() {
        let p = resolve_with_base(Path::new("/srv/app"), "data/index");
        assert_eq!(p, PathBuf::from("/srv/app/data/index"));
        let abs = resolve_with_base(Path::new("/srv/app"), "/var/index");
        assert_eq!(abs, PathBuf::from("/var/index"));
    }
}
