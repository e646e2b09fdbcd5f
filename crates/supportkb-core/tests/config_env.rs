use supportkb_core::config::{Config, EmbeddingProvider};
use tempfile::TempDir;

// Runs in its own test binary: APP_* variables are process-wide.
#[test]
fn app_env_overrides_files() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("config.toml"), "[search]\ntop_k = 5\n").unwrap();
    std::env::set_var("APP_SEARCH__TOP_K", "7");
    std::env::set_var("APP_EMBEDDING__PROVIDER", "hash");

    let config = Config::load_for_env(tmp.path(), "dev").expect("load");

    assert_eq!(config.search.top_k, 7);
    assert_eq!(config.embedding.provider, EmbeddingProvider::Hash);
}
