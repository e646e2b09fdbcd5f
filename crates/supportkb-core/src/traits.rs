/// A text embedding backend.
///
/// Implementations return one vector of length `dim()` per input text, in
/// input order. Callers normalise before indexing, so backends are free to
/// return raw (unnormalised) vectors.
pub trait Embedder: Send + Sync {
    /// Identifier recorded alongside a persisted index.
    fn model_name(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}
